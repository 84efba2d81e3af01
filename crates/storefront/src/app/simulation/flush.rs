const CLAIM_KIND_ORDER: [ClaimKind; 5] = [
    ClaimKind::Register,
    ClaimKind::QueueSlot,
    ClaimKind::OverflowSlot,
    ClaimKind::BrowseSpot,
    ClaimKind::PickupSpot,
];

/// Writes a runner's live situation back onto its record. Called exactly
/// once per deactivation (or explicit save); the runner itself is left
/// untouched so a save does not disturb a still-active actor.
///
/// Movement-with-path and open transactions survive as payloads. Plain
/// moves and wait timers do not; the owning state restarts them from its
/// own `on_enter` after the next activation.
fn flush_active_to_record(runner: &ActiveRunner, record: &mut ActorRecord, services: &Services) {
    record.position = runner.position();
    record.rotation_radians = runner.rotation_radians;
    record.background_state = active_to_background(runner.state);
    record.inventory = runner.inventory.clone();
    record.task = match &runner.task {
        Some(task) if task.owner == runner.state => match &task.kind {
            ActiveTaskKind::FollowPath {
                path,
                next_waypoint,
                direction,
            } => TaskPayload::FollowPath {
                path: *path,
                next_waypoint: *next_waypoint,
                direction: *direction,
            },
            ActiveTaskKind::Checkout {
                counterparty,
                remaining_seconds,
                value_minor,
            } => TaskPayload::Transaction {
                counterparty: counterparty.clone(),
                remaining_seconds: *remaining_seconds,
                value_minor: *value_minor,
            },
            ActiveTaskKind::MoveTo { .. } | ActiveTaskKind::Wait { .. } => TaskPayload::None,
        },
        _ => TaskPayload::None,
    };
    record.claim = claim_from_pools(&record.id, services);
    debug!(
        actor = %record.id,
        state = record.background_state.name(),
        "actor_flushed"
    );
}

/// The pools are authoritative for claims; a record's cached claim is
/// whatever they say at flush time.
fn claim_from_pools(actor: &ActorId, services: &Services) -> Option<ResourceClaim> {
    for kind in CLAIM_KIND_ORDER {
        if let Some(index) = services.pool(kind).index_of(actor) {
            return Some(ResourceClaim { kind, index });
        }
    }
    None
}

/// Builds a live runner from a dormant record. The seeded state comes from
/// the inverse fidelity mapping; an in-flight payload is rebuilt as a task,
/// in which case `on_enter` is skipped so the work is not restarted.
fn activate_record_to_active(
    record: &ActorRecord,
    table: &ActiveStateTable,
    services: &mut Services,
) -> ActiveRunner {
    let state = background_to_active(record.background_state);
    let mut runner = ActiveRunner::new(
        record.id.clone(),
        record.archetype,
        record.home_position,
        record.position,
        state,
    );
    runner.rotation_radians = record.rotation_radians;
    runner.inventory = record.inventory.clone();

    if let Some(claim) = record.claim {
        let actual = services.pool(claim.kind).index_of(&record.id);
        if actual != Some(claim.index) {
            warn!(
                actor = %record.id,
                pool = claim.kind.name(),
                expected = claim.index,
                "claim_mismatch"
            );
        }
    }

    let restored_task = match &record.task {
        TaskPayload::FollowPath {
            path,
            next_waypoint,
            direction,
        } => Some(ActiveTaskKind::FollowPath {
            path: *path,
            next_waypoint: *next_waypoint,
            direction: *direction,
        }),
        TaskPayload::Transaction {
            counterparty,
            remaining_seconds,
            value_minor,
        } => Some(ActiveTaskKind::Checkout {
            counterparty: counterparty.clone(),
            remaining_seconds: *remaining_seconds,
            value_minor: *value_minor,
        }),
        TaskPayload::Wait { .. } | TaskPayload::None => None,
    };

    match restored_task {
        Some(kind) => {
            runner.task = Some(ActiveTask { owner: state, kind });
        }
        None => {
            runner.dispatch_enter(table, services);
            runner.resolve_pending(table, services);
        }
    }
    debug!(actor = %record.id, state = state.name(), "runner_rebuilt");
    runner
}
