/// Mutable view handed to `BackgroundStateDef` callbacks: the bare record
/// plus shared services. No movement provider and no polled tasks here; the
/// payload on the record is the whole story.
struct BackgroundCx<'a> {
    record: &'a mut ActorRecord,
    pending_transition: &'a mut Option<(BackgroundState, Option<RouteSeed>)>,
    queued_route: &'a mut Option<RouteSeed>,
    services: &'a mut Services,
}

impl BackgroundCx<'_> {
    fn request_transition(&mut self, target: BackgroundState) {
        *self.pending_transition = Some((target, None));
    }

    fn request_transition_with_route(&mut self, target: BackgroundState, route: Option<RouteSeed>) {
        *self.pending_transition = Some((target, route));
    }

    fn take_route(&mut self) -> Option<RouteSeed> {
        self.queued_route.take()
    }

    /// Ticks a `Wait` payload down. Returns true exactly once, on the tick
    /// the timer elapses; the payload is cleared at that point.
    fn tick_wait(&mut self, dt_seconds: f32) -> bool {
        if let TaskPayload::Wait { remaining_seconds } = &mut self.record.task {
            *remaining_seconds -= dt_seconds;
            if *remaining_seconds > 0.0 {
                return false;
            }
        } else {
            return false;
        }
        self.record.task = TaskPayload::None;
        true
    }

    /// Moves the record straight toward `target`. Returns true when the
    /// record is at the target (including already-arrived ticks).
    fn step_toward_target(&mut self, target: Vec2, dt_seconds: f32) -> bool {
        let before = self.record.position;
        let (next, arrived) = step_toward(
            before,
            target,
            WALK_SPEED_UNITS_PER_SECOND,
            dt_seconds,
            MOVE_ARRIVAL_THRESHOLD,
        );
        self.record.position = next;
        if before.distance_sq(next) > ROTATION_EPSILON_SQ {
            self.record.rotation_radians = (next.y - before.y).atan2(next.x - before.x);
        }
        arrived
    }

    /// Advances a `FollowPath` payload one step. Returns true when the path
    /// is done (or unusable), with the payload cleared.
    fn advance_path(&mut self, dt_seconds: f32) -> bool {
        let (path, mut index, direction) = match &self.record.task {
            TaskPayload::FollowPath {
                path,
                next_waypoint,
                direction,
            } => (*path, *next_waypoint, *direction),
            _ => return true,
        };
        let waypoints = match self.services.layout.path(path) {
            Some(waypoints) if !waypoints.is_empty() => waypoints.clone(),
            _ => {
                warn!(actor = %self.record.id, path = path.name(), "follow_path_missing");
                self.record.task = TaskPayload::None;
                return true;
            }
        };
        let Some(target) = path_point(&waypoints, direction, index) else {
            self.record.task = TaskPayload::None;
            return true;
        };
        if self.step_toward_target(target, dt_seconds) {
            index += 1;
            if path_point(&waypoints, direction, index).is_none() {
                self.record.task = TaskPayload::None;
                return true;
            }
        }
        self.record.task = TaskPayload::FollowPath {
            path,
            next_waypoint: index,
            direction,
        };
        false
    }

    fn acquire(&mut self, kind: ClaimKind) -> Option<usize> {
        let index = self.services.pool_mut(kind).try_acquire(&self.record.id)?;
        self.record.claim = Some(ResourceClaim { kind, index });
        Some(index)
    }

    fn release(&mut self, kind: ClaimKind) {
        if self
            .services
            .pool_mut(kind)
            .release_holder(&self.record.id)
            .is_some()
            && matches!(self.record.claim, Some(claim) if claim.kind == kind)
        {
            self.record.claim = None;
        }
    }

    fn claimed_index(&self, kind: ClaimKind) -> Option<usize> {
        self.services.pool(kind).index_of(&self.record.id)
    }

    fn bg_decide(&mut self, point: DecisionPointId, fallback: BackgroundState) {
        match self.services.decide(&self.record.id, point) {
            Some(option) => {
                let target = active_to_background(option.target);
                self.request_transition_with_route(target, option.route);
            }
            None => {
                debug!(
                    actor = %self.record.id,
                    point = point.name(),
                    fallback = fallback.name(),
                    "decision_no_valid_option"
                );
                self.request_transition(fallback);
            }
        }
    }
}

/// Advances every registered dormant actor exactly once per `tick` call,
/// in actor-id order. Work per actor is bounded; all side effects land
/// within the same tick.
#[derive(Default)]
struct BackgroundTickManager {
    registered: BTreeSet<ActorId>,
}

impl BackgroundTickManager {
    fn register(&mut self, actor_id: ActorId) {
        debug!(actor = %actor_id, "background_registered");
        self.registered.insert(actor_id);
    }

    fn unregister(&mut self, actor_id: &ActorId) {
        if self.registered.remove(actor_id) {
            debug!(actor = %actor_id, "background_unregistered");
        }
    }

    fn is_registered(&self, actor_id: &ActorId) -> bool {
        self.registered.contains(actor_id)
    }

    fn len(&self) -> usize {
        self.registered.len()
    }

    fn clear(&mut self) {
        self.registered.clear();
    }

    fn tick(
        &mut self,
        dt_seconds: f32,
        records: &mut BTreeMap<ActorId, ActorRecord>,
        table: &BackgroundStateTable,
        services: &mut Services,
    ) {
        let ids: Vec<ActorId> = self.registered.iter().cloned().collect();
        for actor_id in ids {
            let Some(record) = records.get_mut(&actor_id) else {
                warn!(actor = %actor_id, "background_record_missing");
                continue;
            };
            let mut pending: Option<(BackgroundState, Option<RouteSeed>)> = None;
            let mut queued_route: Option<RouteSeed> = None;

            for event in services.events.drain_for(&actor_id) {
                handle_background_event(record, &event, &mut pending);
            }
            resolve_background_transitions(
                record,
                &mut pending,
                &mut queued_route,
                table,
                services,
            );

            let state = record.background_state;
            match table.def(state) {
                Some(def) => {
                    let mut cx = BackgroundCx {
                        record,
                        pending_transition: &mut pending,
                        queued_route: &mut queued_route,
                        services,
                    };
                    def.on_tick(&mut cx, dt_seconds);
                }
                None => {
                    warn!(actor = %actor_id, state = state.name(), "missing_background_state_def");
                    let fallback = record.archetype.fallback_background_state();
                    if fallback != state {
                        pending = Some((fallback, None));
                    }
                }
            }
            resolve_background_transitions(
                record,
                &mut pending,
                &mut queued_route,
                table,
                services,
            );
        }
    }
}

/// Events can force dormant transitions the same way they force live ones;
/// the mapping mirrors the runner's event handling.
fn handle_background_event(
    record: &mut ActorRecord,
    event: &ShopEvent,
    pending: &mut Option<(BackgroundState, Option<RouteSeed>)>,
) {
    match event {
        ShopEvent::Attacked => {
            if record.background_state != BackgroundState::LeavingStore {
                info!(
                    actor = %record.id,
                    state = record.background_state.name(),
                    "actor_attacked"
                );
                *pending = Some((BackgroundState::LeavingStore, None));
            }
        }
        ShopEvent::CheckoutStarted { .. } => {
            if record.background_state == BackgroundState::StaffingRegister {
                *pending = Some((BackgroundState::ProcessingCheckout, None));
            }
        }
        ShopEvent::TransactionCompleted { .. } | ShopEvent::CheckoutAborted { .. } => {
            if record.background_state == BackgroundState::ProcessingCheckout {
                *pending = Some((BackgroundState::StaffingRegister, None));
            }
        }
        ShopEvent::InteractedWith => {
            if let TaskPayload::Wait { remaining_seconds } = &mut record.task {
                *remaining_seconds += INTERACTION_PAUSE_SECONDS;
            }
        }
        ShopEvent::EmoteTriggered => {
            debug!(actor = %record.id, "emote_triggered");
        }
        ShopEvent::StateChanged { .. }
        | ShopEvent::ActorDeparted { .. }
        | ShopEvent::ImpatienceExpired { .. } => {}
    }
}

fn resolve_background_transitions(
    record: &mut ActorRecord,
    pending: &mut Option<(BackgroundState, Option<RouteSeed>)>,
    queued_route: &mut Option<RouteSeed>,
    table: &BackgroundStateTable,
    services: &mut Services,
) {
    let mut hops = 0;
    while let Some((target, route)) = pending.take() {
        if target == record.background_state {
            continue;
        }
        hops += 1;
        if hops > TRANSITION_HOP_LIMIT {
            warn!(
                actor = %record.id,
                state = record.background_state.name(),
                "transition_hop_limit_reached"
            );
            break;
        }

        let from = record.background_state;
        if let Some(def) = table.def(from) {
            let mut cx = BackgroundCx {
                record,
                pending_transition: pending,
                queued_route,
                services,
            };
            def.on_exit(&mut cx);
        }

        record.background_state = target;
        *queued_route = route;
        services.events.broadcast(ShopEvent::StateChanged {
            actor: record.id.clone(),
            from: from.name(),
            to: target.name(),
        });
        debug!(
            actor = %record.id,
            from = from.name(),
            to = target.name(),
            "background_state_changed"
        );

        if let Some(def) = table.def(target) {
            let mut cx = BackgroundCx {
                record,
                pending_transition: pending,
                queued_route,
                services,
            };
            def.on_enter(&mut cx);
        } else {
            warn!(actor = %record.id, state = target.name(), "missing_background_state_def");
            let fallback = record.archetype.fallback_background_state();
            if fallback != target {
                *pending = Some((fallback, None));
            }
        }
        *queued_route = None;
    }
}
