fn active_defs() -> Vec<Box<dyn ActiveStateDef>> {
    vec![
        Box::new(IdleAtHomeActive),
        Box::new(WalkToStoreActive),
        Box::new(BrowseShelvesActive),
        Box::new(JoinQueueActive),
        Box::new(WaitOverflowActive),
        Box::new(CheckoutAtRegisterActive),
        Box::new(AwaitPrescriptionActive),
        Box::new(ExitStoreActive),
        Box::new(WalkHomeActive),
        Box::new(FleeActive),
        Box::new(StaffRegisterActive),
        Box::new(RunCheckoutActive),
        Box::new(PatrolFloorActive),
    ]
}

fn background_defs() -> Vec<Box<dyn BackgroundStateDef>> {
    vec![
        Box::new(AtHomeBackground),
        Box::new(TravelingToStoreBackground),
        Box::new(BrowsingBackground),
        Box::new(QueuedPrimaryBackground),
        Box::new(QueuedOverflowBackground),
        Box::new(PayingAtRegisterBackground),
        Box::new(AwaitingPrescriptionBackground),
        Box::new(LeavingStoreBackground),
        Box::new(TravelingHomeBackground),
        Box::new(StaffingRegisterBackground),
        Box::new(ProcessingCheckoutBackground),
        Box::new(PatrollingBackground),
    ]
}

/// Hand-authored floor plan: store around the origin, homes a street away
/// to the west, outside the activation radius.
fn demo_layout() -> StoreLayout {
    let mut paths = HashMap::new();
    paths.insert(
        PathId::HomeToStore,
        vec![
            Vec2::new(-18.0, 0.0),
            Vec2::new(-12.0, 0.0),
            Vec2::new(-6.0, 0.0),
            Vec2::new(-4.0, 0.0),
        ],
    );
    paths.insert(
        PathId::FloorLoop,
        vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(3.0, 0.0),
            Vec2::new(3.0, 3.0),
            Vec2::new(0.0, 3.0),
        ],
    );
    StoreLayout {
        entrance: Vec2::new(-4.0, 0.0),
        exit: Vec2::new(-4.0, 2.0),
        register_positions: vec![Vec2::new(2.0, -2.0), Vec2::new(2.0, -3.0)],
        queue_anchor: Vec2::new(1.0, -1.0),
        overflow_anchor: Vec2::new(4.0, 1.0),
        browse_positions: vec![
            Vec2::new(-1.0, 1.0),
            Vec2::new(0.5, 1.5),
            Vec2::new(2.0, 1.0),
            Vec2::new(-1.0, 3.0),
            Vec2::new(0.5, 3.5),
            Vec2::new(2.0, 3.0),
        ],
        pickup_counter: Vec2::new(5.0, -4.0),
        paths,
    }
}

/// Stock decision tables, plus one override: shopper-3 has a prescription
/// to collect and may head for the counter instead of the shelves.
fn demo_decisions() -> DecisionEngine {
    let mut options_by_point = HashMap::new();
    options_by_point.insert(
        DecisionPointId::LeaveHome,
        vec![DecisionOption::routed(
            ActiveState::WalkToStore,
            PathId::HomeToStore,
            PathDirection::Forward,
        )],
    );
    options_by_point.insert(
        DecisionPointId::StoreEntrance,
        vec![DecisionOption::to(ActiveState::BrowseShelves)],
    );
    options_by_point.insert(
        DecisionPointId::AisleEnd,
        vec![
            DecisionOption::to(ActiveState::BrowseShelves),
            DecisionOption::to(ActiveState::JoinQueue),
        ],
    );
    options_by_point.insert(
        DecisionPointId::AfterCheckout,
        vec![DecisionOption::to(ActiveState::ExitStore)],
    );
    options_by_point.insert(
        DecisionPointId::PickupCounter,
        vec![DecisionOption::to(ActiveState::JoinQueue)],
    );

    let mut overrides = HashMap::new();
    overrides.insert(
        (ActorId::from("shopper-3"), DecisionPointId::StoreEntrance),
        vec![DecisionOption::to(ActiveState::AwaitPrescription)],
    );

    DecisionEngine::new(options_by_point, overrides)
}

/// Builds the default world: two cashiers on the floor, six shoppers at
/// home, focus parked over the store so nearby actors run at high fidelity.
pub(crate) fn build_demo_simulation(seed: u64) -> Result<SimContext, String> {
    validate_state_mapping()?;
    let active_table = ActiveStateTable::from_defs(active_defs())?;
    let background_table = BackgroundStateTable::from_defs(background_defs())?;

    let layout = demo_layout();
    for path in PATH_ORDER {
        if layout.path(path).map_or(true, |waypoints| waypoints.is_empty()) {
            return Err(format!("layout missing path '{}'", path.name()));
        }
    }
    let decisions = demo_decisions();
    let invalid = decisions.validate_against_paths(&layout.paths);
    if invalid > 0 {
        warn!(invalid, "decision_table_has_invalid_options");
    }

    let services = Services::new(layout, decisions, seed);
    let save_path = match resolve_app_paths() {
        Ok(paths) => Some(paths.saves_dir.join(SAVE_FILE_NAME)),
        Err(err) => {
            warn!(error = %err, "save_path_unavailable");
            None
        }
    };

    let mut context = SimContext::new(services, active_table, background_table, save_path);
    for index in 0..2 {
        let record = ActorRecord::new(
            ActorId::new(format!("cashier-{index}")),
            Archetype::Cashier,
            Vec2::new(2.0 + index as f32, -4.0),
            BackgroundState::StaffingRegister,
        );
        context.register_actor(record)?;
    }
    for index in 0..6 {
        let record = ActorRecord::new(
            ActorId::new(format!("shopper-{index}")),
            Archetype::Shopper,
            Vec2::new(-18.0, -2.0 + index as f32),
            BackgroundState::AtHome,
        );
        context.register_actor(record)?;
    }
    context.set_focus(Some(Vec2::ZERO));
    // Staff are always simulated at full fidelity, wherever the focus sits.
    for index in 0..2 {
        context.summon(&ActorId::new(format!("cashier-{index}")));
    }
    for offset in 0..2 {
        let _ = context.spawn_transient(TransientActorRecord {
            position: Vec2::new(-10.0 - offset as f32 * 3.0, 5.0),
            rotation_radians: 0.0,
            state_name: TRANSIENT_DRIFT_STATE.to_string(),
            state_family: StateFamily::Background,
            queue_claim: None,
            inventory: Vec::new(),
        });
    }

    info!(
        actors = context.records.len(),
        seed, "demo_world_ready"
    );
    Ok(context)
}
