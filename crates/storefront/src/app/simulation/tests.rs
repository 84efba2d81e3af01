use super::*;

const DT: f32 = 1.0 / 30.0;

fn tables() -> (ActiveStateTable, BackgroundStateTable) {
    (
        ActiveStateTable::from_defs(active_defs()).expect("active table"),
        BackgroundStateTable::from_defs(background_defs()).expect("background table"),
    )
}

fn test_services(seed: u64) -> Services {
    Services::new(demo_layout(), demo_decisions(), seed)
}

fn test_context(records: Vec<ActorRecord>) -> SimContext {
    let (active, background) = tables();
    let mut context = SimContext::new(test_services(7), active, background, None);
    for record in records {
        context.register_actor(record).expect("register actor");
    }
    context
}

fn shopper(id: &str, home: Vec2, state: BackgroundState) -> ActorRecord {
    ActorRecord::new(ActorId::from(id), Archetype::Shopper, home, state)
}

fn cashier(id: &str, home: Vec2, state: BackgroundState) -> ActorRecord {
    ActorRecord::new(ActorId::from(id), Archetype::Cashier, home, state)
}

fn runner_at(id: &str, archetype: Archetype, position: Vec2, state: ActiveState) -> ActiveRunner {
    ActiveRunner::new(ActorId::from(id), archetype, position, position, state)
}

#[test]
fn state_mapping_is_total_and_round_trips() {
    validate_state_mapping().expect("mapping is valid");
    for state in BACKGROUND_STATE_ORDER {
        assert_eq!(active_to_background(background_to_active(state)), state);
    }
}

#[test]
fn flee_and_exit_share_a_family() {
    assert!(family_equivalent(ActiveState::Flee, ActiveState::ExitStore));
    assert!(!family_equivalent(
        ActiveState::Flee,
        ActiveState::BrowseShelves
    ));
}

#[test]
fn state_tables_reject_duplicates() {
    let mut defs = active_defs();
    defs.push(Box::new(FleeActive));
    let error = ActiveStateTable::from_defs(defs)
        .err()
        .expect("duplicate definition must be rejected");
    assert!(error.contains("duplicate"), "{error}");
}

#[test]
fn transition_broadcasts_once_and_repeat_is_noop() {
    let (table, _) = tables();
    let mut services = test_services(1);
    let mut runner = runner_at(
        "shopper-9",
        Archetype::Shopper,
        Vec2::new(-18.0, 0.0),
        ActiveState::IdleAtHome,
    );

    runner.transition_to(ActiveState::WalkToStore, &table, &mut services);
    let changes = services
        .events
        .drain_broadcasts()
        .into_iter()
        .filter(|event| matches!(event, ShopEvent::StateChanged { .. }))
        .count();
    assert_eq!(changes, 1);
    assert_eq!(runner.current_state(), ActiveState::WalkToStore);

    runner.transition_to(ActiveState::WalkToStore, &table, &mut services);
    assert!(services.events.drain_broadcasts().is_empty());
    assert_eq!(runner.current_state(), ActiveState::WalkToStore);
}

#[test]
fn attack_interrupts_walk_without_store_arrival() {
    let (table, _) = tables();
    let mut services = test_services(2);
    let mut runner = runner_at(
        "shopper-0",
        Archetype::Shopper,
        Vec2::new(-18.0, 0.0),
        ActiveState::IdleAtHome,
    );
    runner.transition_to(ActiveState::WalkToStore, &table, &mut services);

    runner.handle_event(&ShopEvent::Attacked, &table, &mut services);
    assert_eq!(runner.current_state(), ActiveState::Flee);
    let task = runner.task.clone().expect("flee movement task");
    assert_eq!(task.owner, ActiveState::Flee);
    assert!(matches!(task.kind, ActiveTaskKind::MoveTo { .. }));

    // The walk's arrival callback must never fire: the shopper heads out,
    // not onto the shop floor.
    for _ in 0..600 {
        runner.update(DT, &table, &mut services);
        assert_ne!(runner.current_state(), ActiveState::BrowseShelves);
        if runner.current_state() == ActiveState::WalkHome {
            break;
        }
    }
    assert_eq!(runner.current_state(), ActiveState::WalkHome);
}

#[test]
fn stale_task_is_dropped_without_callbacks() {
    let (table, _) = tables();
    let mut services = test_services(1);
    let mut runner = runner_at(
        "shopper-0",
        Archetype::Shopper,
        Vec2::new(-18.0, 0.0),
        ActiveState::IdleAtHome,
    );
    runner.task = Some(ActiveTask {
        owner: ActiveState::WalkToStore,
        kind: ActiveTaskKind::MoveTo {
            target: Vec2::new(5.0, 5.0),
        },
    });

    runner.poll_task(DT, &table, &mut services);
    assert!(runner.task.is_none());
    assert!(runner.is_at_destination());
    assert_eq!(runner.position(), Vec2::new(-18.0, 0.0));
    assert_eq!(runner.current_state(), ActiveState::IdleAtHome);
}

#[test]
fn requested_move_walks_to_the_target() {
    let (table, _) = tables();
    let mut services = test_services(7);
    let mut runner = runner_at(
        "shopper-0",
        Archetype::Shopper,
        Vec2::new(-18.0, 0.0),
        ActiveState::IdleAtHome,
    );

    let target = Vec2::new(-16.0, 1.0);
    runner.request_move(target);
    assert!(!runner.is_at_destination());

    for _ in 0..120 {
        runner.update(DT, &table, &mut services);
        if runner.is_at_destination() {
            break;
        }
    }
    assert!(runner.is_at_destination());
    assert!(runner.position().distance(target) <= MOVE_ARRIVAL_THRESHOLD);
}

#[test]
fn background_transaction_pays_ledger_and_frees_cashier() {
    let (_, background_table) = tables();
    let mut services = test_services(3);
    let cashier_id = ActorId::from("cashier-0");
    let shopper_id = ActorId::from("shopper-0");
    assert!(services.registers.try_acquire_index(&cashier_id, 0));
    services.active_checkouts.insert(0, shopper_id.clone());

    let register = services.layout.register_position(0);
    let mut records = BTreeMap::new();
    let mut clerk = cashier("cashier-0", register, BackgroundState::ProcessingCheckout);
    clerk.claim = Some(ResourceClaim {
        kind: ClaimKind::Register,
        index: 0,
    });
    records.insert(cashier_id.clone(), clerk);
    let mut buyer = shopper("shopper-0", register, BackgroundState::PayingAtRegister);
    buyer.task = TaskPayload::Transaction {
        counterparty: cashier_id.clone(),
        remaining_seconds: CHECKOUT_SECONDS,
        value_minor: 50,
    };
    records.insert(shopper_id.clone(), buyer);

    let mut manager = BackgroundTickManager::default();
    manager.register(cashier_id.clone());
    manager.register(shopper_id.clone());

    for _ in 0..120 {
        manager.tick(DT, &mut records, &background_table, &mut services);
        if services.ledger.balance() > 0 {
            break;
        }
    }
    assert_eq!(services.ledger.balance(), 50);
    assert!(records[&shopper_id].task.is_none());
    assert!(services.active_checkouts.is_empty());

    // The completion notice reaches the cashier on the next pass.
    manager.tick(DT, &mut records, &background_table, &mut services);
    assert_eq!(
        records[&cashier_id].background_state,
        BackgroundState::StaffingRegister
    );
}

#[test]
fn queue_impatience_sends_shopper_toward_the_exit() {
    let (_, background_table) = tables();
    // No cashier anywhere: the head of the queue can never be served.
    let mut services = test_services(4);
    let shopper_id = ActorId::from("shopper-1");
    assert!(services.queue.try_acquire_index(&shopper_id, 0));

    let slot = services.layout.queue_slot_position(0);
    let mut records = BTreeMap::new();
    let mut queued = shopper("shopper-1", slot, BackgroundState::QueuedPrimary);
    queued.claim = Some(ResourceClaim {
        kind: ClaimKind::QueueSlot,
        index: 0,
    });
    records.insert(shopper_id.clone(), queued);

    let mut manager = BackgroundTickManager::default();
    manager.register(shopper_id.clone());

    for _ in 0..450 {
        manager.tick(DT, &mut records, &background_table, &mut services);
        if records[&shopper_id].background_state != BackgroundState::QueuedPrimary {
            break;
        }
    }
    assert_eq!(
        records[&shopper_id].background_state,
        BackgroundState::LeavingStore
    );
    assert!(services.queue.index_of(&shopper_id).is_none());
    let broadcasts = services.events.drain_broadcasts();
    assert!(broadcasts
        .iter()
        .any(|event| matches!(event, ShopEvent::ImpatienceExpired { .. })));
}

#[test]
fn decision_with_zero_valid_options_returns_none() {
    let engine = DecisionEngine::new(HashMap::new(), HashMap::new());
    let paths = demo_layout().paths;
    let mut rng = StdRng::seed_from_u64(1);
    assert!(engine
        .decide(&ActorId::from("x"), DecisionPointId::AisleEnd, &paths, &mut rng)
        .is_none());
}

#[test]
fn decision_override_adds_prescription_branch() {
    let engine = demo_decisions();
    let paths = demo_layout().paths;
    let mut rng = StdRng::seed_from_u64(9);

    let mut saw_prescription = false;
    for _ in 0..64 {
        let option = engine
            .decide(
                &ActorId::from("shopper-3"),
                DecisionPointId::StoreEntrance,
                &paths,
                &mut rng,
            )
            .expect("option");
        assert!(matches!(
            option.target,
            ActiveState::BrowseShelves | ActiveState::AwaitPrescription
        ));
        if option.target == ActiveState::AwaitPrescription {
            saw_prescription = true;
        }
    }
    assert!(saw_prescription);

    let plain = engine
        .decide(
            &ActorId::from("shopper-0"),
            DecisionPointId::StoreEntrance,
            &paths,
            &mut rng,
        )
        .expect("option");
    assert_eq!(plain.target, ActiveState::BrowseShelves);
}

#[test]
fn decision_filters_options_without_usable_routes() {
    let mut options = HashMap::new();
    options.insert(
        DecisionPointId::LeaveHome,
        vec![DecisionOption::routed(
            ActiveState::WalkToStore,
            PathId::HomeToStore,
            PathDirection::Forward,
        )],
    );
    let engine = DecisionEngine::new(options, HashMap::new());
    let empty_paths: HashMap<PathId, Vec<Vec2>> = HashMap::new();
    let mut rng = StdRng::seed_from_u64(4);

    assert_eq!(engine.validate_against_paths(&empty_paths), 1);
    assert!(engine
        .decide(
            &ActorId::from("shopper-0"),
            DecisionPointId::LeaveHome,
            &empty_paths,
            &mut rng
        )
        .is_none());
}

#[test]
fn restore_spawn_order_follows_claim_priority() {
    let mut context = test_context(Vec::new());

    let mut register_holder = cashier("cashier-0", Vec2::new(2.0, -2.0), BackgroundState::StaffingRegister);
    register_holder.claim = Some(ResourceClaim {
        kind: ClaimKind::Register,
        index: 0,
    });
    let mut queued = shopper("shopper-q", Vec2::new(1.0, -1.0), BackgroundState::QueuedPrimary);
    queued.claim = Some(ResourceClaim {
        kind: ClaimKind::QueueSlot,
        index: 0,
    });
    let mut overflow = shopper("shopper-o", Vec2::new(4.0, 1.0), BackgroundState::QueuedOverflow);
    overflow.claim = Some(ResourceClaim {
        kind: ClaimKind::OverflowSlot,
        index: 0,
    });
    let idle = shopper("shopper-a", Vec2::new(-18.0, 0.0), BackgroundState::AtHome);

    let save = SaveGame {
        save_version: SAVE_VERSION,
        ledger_balance_minor: 0,
        records: vec![
            record_to_saved(&idle),
            record_to_saved(&overflow),
            record_to_saved(&queued),
            record_to_saved(&register_holder),
        ],
        transients: Vec::new(),
    };

    let stats = context.apply_save_game(save).expect("apply");
    let expected: Vec<ActorId> = ["cashier-0", "shopper-q", "shopper-o", "shopper-a"]
        .into_iter()
        .map(ActorId::from)
        .collect();
    assert_eq!(stats.spawn_order, expected);
    assert_eq!(stats.conflicts, 0);
    assert_eq!(
        context.services.registers.index_of(&ActorId::from("cashier-0")),
        Some(0)
    );
    assert_eq!(
        context.services.queue.index_of(&ActorId::from("shopper-q")),
        Some(0)
    );
}

#[test]
fn restore_duplicate_claim_falls_back() {
    let mut context = test_context(Vec::new());

    let mut first = shopper("shopper-a", Vec2::new(1.0, -1.0), BackgroundState::QueuedPrimary);
    first.claim = Some(ResourceClaim {
        kind: ClaimKind::QueueSlot,
        index: 0,
    });
    let mut second = shopper("shopper-b", Vec2::new(1.0, -1.0), BackgroundState::QueuedPrimary);
    second.claim = Some(ResourceClaim {
        kind: ClaimKind::QueueSlot,
        index: 0,
    });

    let save = SaveGame {
        save_version: SAVE_VERSION,
        ledger_balance_minor: 0,
        records: vec![record_to_saved(&first), record_to_saved(&second)],
        transients: Vec::new(),
    };

    let stats = context.apply_save_game(save).expect("apply");
    assert_eq!(stats.conflicts, 1);

    let winner = ActorId::from("shopper-a");
    assert_eq!(context.services.queue.holder(0), Some(&winner));
    let loser = &context.records[&ActorId::from("shopper-b")];
    assert_eq!(loser.background_state, BackgroundState::Browsing);
    assert!(loser.claim.is_none());
    assert!(loser.task.is_none());
}

#[test]
fn restore_rebuilds_checkout_pairing() {
    let mut context = test_context(Vec::new());
    let cashier_id = ActorId::from("cashier-0");
    let shopper_id = ActorId::from("shopper-0");

    let mut clerk = cashier("cashier-0", Vec2::new(2.0, -2.0), BackgroundState::ProcessingCheckout);
    clerk.claim = Some(ResourceClaim {
        kind: ClaimKind::Register,
        index: 0,
    });
    let mut buyer = shopper("shopper-0", Vec2::new(2.0, -2.0), BackgroundState::PayingAtRegister);
    buyer.task = TaskPayload::Transaction {
        counterparty: cashier_id.clone(),
        remaining_seconds: 1.0,
        value_minor: 25,
    };

    let save = SaveGame {
        save_version: SAVE_VERSION,
        ledger_balance_minor: 0,
        records: vec![record_to_saved(&buyer), record_to_saved(&clerk)],
        transients: Vec::new(),
    };

    let stats = context.apply_save_game(save).expect("apply");
    assert_eq!(stats.conflicts, 0);
    assert_eq!(context.services.active_checkouts.get(&0), Some(&shopper_id));
    assert!(matches!(
        context.records[&shopper_id].task,
        TaskPayload::Transaction { .. }
    ));
}

#[test]
fn restore_clears_transaction_with_missing_counterparty() {
    let mut context = test_context(Vec::new());
    let shopper_id = ActorId::from("shopper-0");

    let mut buyer = shopper("shopper-0", Vec2::new(2.0, -2.0), BackgroundState::PayingAtRegister);
    buyer.task = TaskPayload::Transaction {
        counterparty: ActorId::from("ghost-cashier"),
        remaining_seconds: 1.0,
        value_minor: 25,
    };

    let save = SaveGame {
        save_version: SAVE_VERSION,
        ledger_balance_minor: 0,
        records: vec![record_to_saved(&buyer)],
        transients: Vec::new(),
    };

    let stats = context.apply_save_game(save).expect("apply");
    assert_eq!(stats.conflicts, 1);
    assert!(context.records[&shopper_id].task.is_none());
    assert!(context.services.active_checkouts.is_empty());
}

#[test]
fn save_round_trip_preserves_population() {
    let dir = tempfile::tempdir().expect("tempdir");
    let cashier_id = ActorId::from("cashier-0");

    let mut context = test_context(vec![
        shopper("shopper-0", Vec2::new(-18.0, 0.0), BackgroundState::AtHome),
        cashier("cashier-0", Vec2::new(2.0, -2.0), BackgroundState::StaffingRegister),
    ]);
    context.save_path = Some(dir.path().join("roundtrip.save.json"));
    context.services.ledger.add(125);
    assert!(context.services.registers.try_acquire_index(&cashier_id, 0));
    context
        .records
        .get_mut(&cashier_id)
        .expect("cashier record")
        .claim = Some(ResourceClaim {
        kind: ClaimKind::Register,
        index: 0,
    });

    let path = context.save_to_disk().expect("save");
    assert!(path.exists());

    let mut restored = test_context(Vec::new());
    restored.save_path = Some(path);
    let stats = restored.load_from_disk().expect("load");
    assert_eq!(stats.restored, 2);
    assert_eq!(stats.conflicts, 0);
    assert_eq!(restored.records, context.records);
    assert_eq!(restored.services.ledger.balance(), 125);
    assert_eq!(restored.services.registers.index_of(&cashier_id), Some(0));
}

#[test]
fn save_validation_rejects_malformed_data() {
    let base = SaveGame {
        save_version: SAVE_VERSION,
        ledger_balance_minor: 0,
        records: Vec::new(),
        transients: Vec::new(),
    };
    let record = record_to_saved(&shopper("shopper-0", Vec2::ZERO, BackgroundState::AtHome));

    let mut wrong_version = base.clone();
    wrong_version.save_version = SAVE_VERSION + 1;
    assert!(SimContext::validate_save_game(&wrong_version)
        .unwrap_err()
        .contains("version"));

    let mut duplicated = base.clone();
    duplicated.records = vec![record.clone(), record.clone()];
    assert!(SimContext::validate_save_game(&duplicated)
        .unwrap_err()
        .contains("duplicate"));

    let mut not_finite = base.clone();
    let mut bad = record.clone();
    bad.position.x = f32::NAN;
    not_finite.records = vec![bad];
    assert!(SimContext::validate_save_game(&not_finite)
        .unwrap_err()
        .contains("non-finite"));

    let mut out_of_range = base.clone();
    let mut bad = record.clone();
    bad.claim = Some(SavedClaim::Register(99));
    out_of_range.records = vec![bad];
    assert!(SimContext::validate_save_game(&out_of_range)
        .unwrap_err()
        .contains("out of range"));
}

#[test]
fn focus_radius_controls_activation() {
    let mut context = test_context(vec![
        shopper("shopper-0", Vec2::new(-18.0, 0.0), BackgroundState::AtHome),
        cashier("cashier-0", Vec2::new(2.0, -2.0), BackgroundState::StaffingRegister),
    ]);
    context.set_focus(Some(Vec2::ZERO));
    context.tick(DT);

    assert!(context.runners.contains_key(&ActorId::from("cashier-0")));
    assert!(!context.runners.contains_key(&ActorId::from("shopper-0")));
    let summary = context.summary();
    assert_eq!(summary.active_actors, 1);
    assert_eq!(summary.dormant_actors, 1);
}

#[test]
fn runner_walking_out_of_focus_is_deactivated() {
    let id = ActorId::from("shopper-0");
    let mut context = test_context(vec![shopper(
        "shopper-0",
        Vec2::new(-4.0, 2.0),
        BackgroundState::LeavingStore,
    )]);
    context.set_focus(Some(Vec2::ZERO));
    context.tick(DT);
    assert!(context.runners.contains_key(&id));

    // Departing shoppers walk the street path away from the focus; the
    // activation policy must notice the live position, not the stale record.
    let mut deactivated = false;
    for _ in 0..4000 {
        context.tick(DT);
        if !context.runners.contains_key(&id) {
            deactivated = true;
            break;
        }
    }
    assert!(deactivated);
    let record = &context.records[&id];
    assert!(
        record.position.distance(Vec2::ZERO)
            > ACTIVATION_RADIUS_UNITS + DEACTIVATION_HYSTERESIS_UNITS
    );
    assert_eq!(record.background_state, BackgroundState::TravelingHome);
}

#[test]
fn decision_fallback_drives_runner_when_no_option_is_valid() {
    let (table, _) = tables();
    let mut services = Services::new(
        demo_layout(),
        DecisionEngine::new(HashMap::new(), HashMap::new()),
        3,
    );
    let mut runner = runner_at(
        "shopper-0",
        Archetype::Shopper,
        Vec2::new(-18.0, 0.0),
        ActiveState::IdleAtHome,
    );
    runner.dispatch_enter(&table, &mut services);

    for _ in 0..250 {
        runner.update(DT, &table, &mut services);
        if runner.current_state() != ActiveState::IdleAtHome {
            break;
        }
    }
    assert_eq!(runner.current_state(), ActiveState::WalkToStore);
}

#[test]
fn decision_fallback_drives_dormant_actor_when_no_option_is_valid() {
    let (_, background_table) = tables();
    let mut services = Services::new(
        demo_layout(),
        DecisionEngine::new(HashMap::new(), HashMap::new()),
        3,
    );
    let shopper_id = ActorId::from("shopper-1");
    let mut records = BTreeMap::new();
    records.insert(
        shopper_id.clone(),
        shopper("shopper-1", Vec2::new(-18.0, 1.0), BackgroundState::AtHome),
    );
    let mut manager = BackgroundTickManager::default();
    manager.register(shopper_id.clone());

    for _ in 0..250 {
        manager.tick(DT, &mut records, &background_table, &mut services);
        if records[&shopper_id].background_state != BackgroundState::AtHome {
            break;
        }
    }
    assert_eq!(
        records[&shopper_id].background_state,
        BackgroundState::TravelingToStore
    );
}

#[test]
fn fidelity_round_trip_keeps_family_and_claims() {
    let id = ActorId::from("shopper-0");
    let mut context = test_context(vec![shopper(
        "shopper-0",
        Vec2::new(-1.0, 1.0),
        BackgroundState::Browsing,
    )]);

    for _ in 0..3 {
        assert!(context.summon(&id));
        assert_eq!(
            context.runners[&id].current_state(),
            ActiveState::BrowseShelves
        );
        for _ in 0..5 {
            context.tick(DT);
        }
        assert!(context.services.browse_spots.occupied() <= 1);

        context.release_summon(&id);
        context.set_focus(None);
        context.tick(DT);
        assert!(context.runners.is_empty());

        let record = &context.records[&id];
        assert_eq!(record.background_state, BackgroundState::Browsing);
        match record.claim {
            Some(claim) => assert_eq!(
                context.services.browse_spots.index_of(&id),
                Some(claim.index)
            ),
            None => assert!(context.services.browse_spots.index_of(&id).is_none()),
        }
    }
    assert!(context.services.browse_spots.occupied() <= 1);
}

#[test]
fn activation_rebuilds_transaction_without_restarting_it() {
    let (table, _) = tables();
    let mut services = test_services(6);
    let cashier_id = ActorId::from("cashier-0");
    let shopper_id = ActorId::from("shopper-0");
    assert!(services.registers.try_acquire_index(&cashier_id, 0));
    services.active_checkouts.insert(0, shopper_id.clone());

    let mut record = shopper(
        "shopper-0",
        services.layout.register_position(0),
        BackgroundState::PayingAtRegister,
    );
    record.task = TaskPayload::Transaction {
        counterparty: cashier_id.clone(),
        remaining_seconds: 1.0,
        value_minor: 25,
    };

    let runner = activate_record_to_active(&record, &table, &mut services);
    assert_eq!(runner.current_state(), ActiveState::CheckoutAtRegister);
    let task = runner.task.expect("restored task");
    assert_eq!(task.owner, ActiveState::CheckoutAtRegister);
    assert!(matches!(task.kind, ActiveTaskKind::Checkout { .. }));
    // No fresh handshake: the cashier was already mid-checkout.
    assert_eq!(services.events.pending_addressed_len(), 0);
}

#[test]
fn transient_claim_conflict_falls_back_to_drift() {
    let mut context = test_context(Vec::new());
    let walker = TransientActorRecord {
        position: Vec2::new(1.0, -1.0),
        rotation_radians: 0.0,
        state_name: "queueing".to_string(),
        state_family: StateFamily::Background,
        queue_claim: Some(0),
        inventory: Vec::new(),
    };

    let first = context.spawn_transient(walker.clone()).expect("first slot");
    let second = context.spawn_transient(walker).expect("second slot");
    assert_ne!(first, second);

    let second_record = context
        .transients
        .iter()
        .find(|(index, _)| *index == second)
        .map(|(_, record)| record.clone())
        .expect("second transient");
    assert!(second_record.queue_claim.is_none());
    assert_eq!(second_record.state_name, TRANSIENT_DRIFT_STATE);

    let expected = transient_actor_id(first);
    assert_eq!(context.services.queue.holder(0), Some(&expected));
}

#[test]
fn transient_drifts_out_and_frees_its_slot() {
    let mut context = test_context(Vec::new());
    let _ = context.spawn_transient(TransientActorRecord {
        position: Vec2::new(20.0, 2.0),
        rotation_radians: 0.0,
        state_name: TRANSIENT_DRIFT_STATE.to_string(),
        state_family: StateFamily::Background,
        queue_claim: None,
        inventory: Vec::new(),
    });
    assert_eq!(context.transients.occupied(), 1);

    for _ in 0..400 {
        context.tick(DT);
        if context.transients.occupied() == 0 {
            break;
        }
    }
    assert_eq!(context.transients.occupied(), 0);
}

#[test]
fn external_event_reaches_dormant_actor_within_one_tick() {
    let id = ActorId::from("shopper-0");
    let mut context = test_context(vec![shopper(
        "shopper-0",
        Vec2::new(-1.0, 1.0),
        BackgroundState::Browsing,
    )]);

    context.publish_external(&id, ShopEvent::Attacked);
    context.tick(DT);
    assert_eq!(
        context.records[&id].background_state,
        BackgroundState::LeavingStore
    );
    assert!(context.services.browse_spots.index_of(&id).is_none());
}

#[test]
fn interaction_pauses_a_dormant_wait() {
    let id = ActorId::from("shopper-0");
    let mut context = test_context(vec![shopper(
        "shopper-0",
        Vec2::new(-18.0, 0.0),
        BackgroundState::AtHome,
    )]);
    let wait_remaining = |context: &SimContext| match context.records[&id].task {
        TaskPayload::Wait { remaining_seconds } => remaining_seconds,
        _ => panic!("expected a wait in flight"),
    };

    context.tick(DT);
    context.tick(DT);
    let before = wait_remaining(&context);

    context.publish_external(&id, ShopEvent::InteractedWith);
    context.tick(DT);
    let after = wait_remaining(&context);
    assert!(after > before);

    context.publish_external(&id, ShopEvent::EmoteTriggered);
    context.tick(DT);
    assert_eq!(context.records[&id].background_state, BackgroundState::AtHome);
}

#[test]
fn aborted_checkout_returns_cashier_to_register() {
    let (table, _) = tables();
    let mut services = test_services(5);
    let mut runner = runner_at(
        "cashier-0",
        Archetype::Cashier,
        Vec2::new(2.0, -2.0),
        ActiveState::RunCheckout,
    );

    runner.handle_event(
        &ShopEvent::CheckoutAborted {
            shopper: ActorId::from("shopper-0"),
        },
        &table,
        &mut services,
    );
    assert_eq!(runner.current_state(), ActiveState::StaffRegister);
    assert_eq!(services.registers.index_of(&runner.actor_id), Some(0));
}

#[test]
fn flush_keeps_durable_payloads_and_drops_ephemeral_ones() {
    let (table, _) = tables();
    let mut services = test_services(8);

    let mut walker = runner_at(
        "shopper-0",
        Archetype::Shopper,
        Vec2::new(-18.0, 0.0),
        ActiveState::IdleAtHome,
    );
    walker.transition_to(ActiveState::WalkToStore, &table, &mut services);
    let mut record = shopper("shopper-0", Vec2::new(-18.0, 0.0), BackgroundState::AtHome);
    flush_active_to_record(&walker, &mut record, &services);
    assert_eq!(record.background_state, BackgroundState::TravelingToStore);
    assert!(matches!(record.task, TaskPayload::FollowPath { .. }));

    let mut idler = runner_at(
        "shopper-1",
        Archetype::Shopper,
        Vec2::new(-18.0, 1.0),
        ActiveState::IdleAtHome,
    );
    idler.dispatch_enter(&table, &mut services);
    assert!(idler.task.is_some());
    let mut record = shopper("shopper-1", Vec2::new(-18.0, 1.0), BackgroundState::AtHome);
    flush_active_to_record(&idler, &mut record, &services);
    assert_eq!(record.background_state, BackgroundState::AtHome);
    assert!(record.task.is_none());
}

#[test]
fn demo_simulation_is_deterministic() {
    let mut first = build_demo_simulation(11).expect("first sim");
    let mut second = build_demo_simulation(11).expect("second sim");

    for _ in 0..300 {
        first.tick(DT);
        second.tick(DT);
    }

    assert_eq!(first.records, second.records);
    assert_eq!(
        first.services.ledger.balance(),
        second.services.ledger.balance()
    );
    let states_of = |context: &SimContext| -> Vec<(ActorId, ActiveState)> {
        context
            .runners
            .iter()
            .map(|(id, runner)| (id.clone(), runner.current_state()))
            .collect()
    };
    assert_eq!(states_of(&first), states_of(&second));
}
