/// Everything shared between actors, constructed explicitly at startup and
/// injected into runners and the background manager. No singletons.
struct Services {
    events: EventBus<ShopEvent>,
    ledger: EconomyLedger,
    registers: SlotPool,
    queue: SlotPool,
    overflow: SlotPool,
    browse_spots: SlotPool,
    pickup_claims: SlotPool,
    /// Register index -> shopper currently being rung up there. Keeps a
    /// second shopper from starting a checkout at a busy register.
    active_checkouts: HashMap<usize, ActorId>,
    decisions: DecisionEngine,
    layout: StoreLayout,
    rng: StdRng,
}

impl Services {
    fn new(layout: StoreLayout, decisions: DecisionEngine, seed: u64) -> Self {
        Self {
            events: EventBus::new(),
            ledger: EconomyLedger::new(),
            registers: SlotPool::new("registers", REGISTER_CAPACITY),
            queue: SlotPool::new("primary_queue", PRIMARY_QUEUE_CAPACITY),
            overflow: SlotPool::new("overflow_queue", OVERFLOW_QUEUE_CAPACITY),
            browse_spots: SlotPool::new("browse_spots", BROWSE_SPOT_CAPACITY),
            pickup_claims: SlotPool::new("pickup_counter", PICKUP_CLAIM_CAPACITY),
            active_checkouts: HashMap::new(),
            decisions,
            layout,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn pool(&self, kind: ClaimKind) -> &SlotPool {
        match kind {
            ClaimKind::Register => &self.registers,
            ClaimKind::QueueSlot => &self.queue,
            ClaimKind::OverflowSlot => &self.overflow,
            ClaimKind::BrowseSpot => &self.browse_spots,
            ClaimKind::PickupSpot => &self.pickup_claims,
        }
    }

    fn pool_mut(&mut self, kind: ClaimKind) -> &mut SlotPool {
        match kind {
            ClaimKind::Register => &mut self.registers,
            ClaimKind::QueueSlot => &mut self.queue,
            ClaimKind::OverflowSlot => &mut self.overflow,
            ClaimKind::BrowseSpot => &mut self.browse_spots,
            ClaimKind::PickupSpot => &mut self.pickup_claims,
        }
    }

    fn decide(&mut self, actor: &ActorId, point: DecisionPointId) -> Option<DecisionOption> {
        self.decisions
            .decide(actor, point, &self.layout.paths, &mut self.rng)
    }

    /// Lowest-index register that has a cashier and no checkout in flight.
    fn free_staffed_register(&self) -> Option<(usize, ActorId)> {
        self.registers
            .holders()
            .find(|(index, _)| !self.active_checkouts.contains_key(index))
            .map(|(index, cashier)| (index, cashier.clone()))
    }

    fn register_assigned_to(&self, actor: &ActorId) -> Option<usize> {
        self.active_checkouts
            .iter()
            .find_map(|(index, shopper)| (shopper == actor).then_some(*index))
    }

    fn release_all_claims_for(&mut self, actor: &ActorId) {
        self.registers.release_holder(actor);
        self.queue.release_holder(actor);
        self.overflow.release_holder(actor);
        self.browse_spots.release_holder(actor);
        self.pickup_claims.release_holder(actor);
        if let Some(register) = self.register_assigned_to(actor) {
            self.active_checkouts.remove(&register);
        }
    }

    fn reset_claims(&mut self) {
        self.registers.clear();
        self.queue.clear();
        self.overflow.clear();
        self.browse_spots.clear();
        self.pickup_claims.clear();
        self.active_checkouts.clear();
    }

    fn next_item_name(&mut self) -> String {
        let index = self.rng.random_range(0..ITEM_NAMES.len());
        ITEM_NAMES[index].to_string()
    }
}

fn transient_actor_id(slot: usize) -> ActorId {
    ActorId::new(format!("transient-{slot}"))
}

/// Fixed-size pool of walk-by pedestrians. Vacant slots cost nothing; an
/// occupied slot is ticked with trivial drift until it wanders far enough
/// to be reclaimed.
struct TransientPool {
    slots: Vec<Option<TransientActorRecord>>,
}

impl TransientPool {
    fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(|slot| slot.is_none())
    }

    fn put(&mut self, index: usize, record: TransientActorRecord) {
        if let Some(slot) = self.slots.get_mut(index) {
            *slot = Some(record);
        }
    }

    fn release(&mut self, index: usize) -> Option<TransientActorRecord> {
        self.slots.get_mut(index)?.take()
    }

    fn occupied(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    fn iter(&self) -> impl Iterator<Item = (usize, &TransientActorRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|record| (index, record)))
    }

    fn iter_mut(&mut self) -> impl Iterator<Item = (usize, &mut TransientActorRecord)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_mut().map(|record| (index, record)))
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct SimSummary {
    pub(crate) tick_index: u64,
    pub(crate) active_actors: usize,
    pub(crate) dormant_actors: usize,
    pub(crate) transients: usize,
    pub(crate) ledger_balance_minor: u64,
    pub(crate) event_counts: EventBusCounts,
    pub(crate) transitions_last_tick: u32,
}

/// Owns the whole simulation: records, the activation policy, both state
/// tables, runners for activated actors, and the background manager for
/// everyone else. Single-threaded; one `tick` call advances everything
/// exactly once.
pub(crate) struct SimContext {
    services: Services,
    active_table: ActiveStateTable,
    background_table: BackgroundStateTable,
    records: BTreeMap<ActorId, ActorRecord>,
    runners: BTreeMap<ActorId, ActiveRunner>,
    background: BackgroundTickManager,
    transients: TransientPool,
    focus: Option<Vec2>,
    activation_radius: f32,
    pinned_active: HashSet<ActorId>,
    save_path: Option<PathBuf>,
    tick_index: u64,
    last_event_counts: EventBusCounts,
    transitions_last_tick: u32,
}

impl SimContext {
    fn new(
        services: Services,
        active_table: ActiveStateTable,
        background_table: BackgroundStateTable,
        save_path: Option<PathBuf>,
    ) -> Self {
        Self {
            services,
            active_table,
            background_table,
            records: BTreeMap::new(),
            runners: BTreeMap::new(),
            background: BackgroundTickManager::default(),
            transients: TransientPool::new(TRANSIENT_POOL_CAPACITY),
            focus: None,
            activation_radius: ACTIVATION_RADIUS_UNITS,
            pinned_active: HashSet::new(),
            save_path,
            tick_index: 0,
            last_event_counts: EventBusCounts::default(),
            transitions_last_tick: 0,
        }
    }

    /// Adds a persistent actor, dormant. Ids must be unique.
    fn register_actor(&mut self, record: ActorRecord) -> Result<(), String> {
        if self.records.contains_key(&record.id) {
            return Err(format!("duplicate actor id '{}'", record.id));
        }
        self.background.register(record.id.clone());
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub(crate) fn set_focus(&mut self, focus: Option<Vec2>) {
        self.focus = focus;
    }

    /// Forces an actor to high fidelity regardless of the focus radius,
    /// until released.
    pub(crate) fn summon(&mut self, actor_id: &ActorId) -> bool {
        if !self.records.contains_key(actor_id) {
            return false;
        }
        self.pinned_active.insert(actor_id.clone());
        self.activate(actor_id.clone());
        true
    }

    pub(crate) fn release_summon(&mut self, actor_id: &ActorId) {
        self.pinned_active.remove(actor_id);
    }

    pub(crate) fn publish_external(&mut self, target: &ActorId, event: ShopEvent) {
        self.services.events.publish(target, event);
    }

    pub(crate) fn tick(&mut self, dt_seconds: f32) {
        self.tick_index += 1;
        self.update_activation();

        self.background.tick(
            dt_seconds,
            &mut self.records,
            &self.background_table,
            &mut self.services,
        );

        let ids: Vec<ActorId> = self.runners.keys().cloned().collect();
        for id in ids {
            if let Some(mut runner) = self.runners.remove(&id) {
                runner.update(dt_seconds, &self.active_table, &mut self.services);
                self.runners.insert(id, runner);
            }
        }

        self.deliver_pending_events();
        self.tick_transients(dt_seconds);
        self.finish_tick();
    }

    pub(crate) fn summary(&self) -> SimSummary {
        SimSummary {
            tick_index: self.tick_index,
            active_actors: self.runners.len(),
            dormant_actors: self.background.len(),
            transients: self.transients.occupied(),
            ledger_balance_minor: self.services.ledger.balance(),
            event_counts: self.last_event_counts,
            transitions_last_tick: self.transitions_last_tick,
        }
    }

    fn update_activation(&mut self) {
        let mut to_activate: Vec<ActorId> = Vec::new();
        let mut to_deactivate: Vec<ActorId> = Vec::new();

        for (id, record) in &self.records {
            let pinned = self.pinned_active.contains(id);
            let active = self.runners.contains_key(id);
            // A record's position is only reconciled at flush time; for an
            // actor with a live runner the runner is the truth.
            let position = match self.runners.get(id) {
                Some(runner) => runner.position(),
                None => record.position,
            };
            let within = match self.focus {
                Some(focus) => position.distance(focus) <= self.activation_radius,
                None => false,
            };
            let beyond = match self.focus {
                Some(focus) => {
                    position.distance(focus)
                        > self.activation_radius + DEACTIVATION_HYSTERESIS_UNITS
                }
                None => true,
            };
            if !active && (pinned || within) {
                to_activate.push(id.clone());
            } else if active && !pinned && beyond {
                to_deactivate.push(id.clone());
            }
        }

        for id in to_deactivate {
            self.deactivate(&id);
        }
        for id in to_activate {
            self.activate(id);
        }
    }

    fn activate(&mut self, id: ActorId) {
        if self.runners.contains_key(&id) || !self.background.is_registered(&id) {
            return;
        }
        let Some(record) = self.records.get(&id) else {
            return;
        };
        let runner = activate_record_to_active(record, &self.active_table, &mut self.services);
        self.background.unregister(&id);
        info!(
            actor = %id,
            archetype = runner.archetype.name(),
            state = runner.current_state().name(),
            "actor_activated"
        );
        self.runners.insert(id, runner);
    }

    fn deactivate(&mut self, id: &ActorId) {
        let Some(runner) = self.runners.remove(id) else {
            return;
        };
        if let Some(record) = self.records.get_mut(id) {
            flush_active_to_record(&runner, record, &self.services);
        }
        self.background.register(id.clone());
        info!(actor = %id, "actor_deactivated");
    }

    /// Second (and bounded further) delivery pass so addressed events
    /// published late in a tick still land within the same tick.
    fn deliver_pending_events(&mut self) {
        for _ in 0..EVENT_DELIVERY_PASSES {
            let targets = self.services.events.pending_targets();
            if targets.is_empty() {
                break;
            }
            let mut progressed = false;
            for id in targets {
                if let Some(mut runner) = self.runners.remove(&id) {
                    for event in self.services.events.drain_for(&id) {
                        runner.handle_event(&event, &self.active_table, &mut self.services);
                    }
                    runner.resolve_pending(&self.active_table, &mut self.services);
                    self.runners.insert(id, runner);
                    progressed = true;
                } else if let Some(record) = self.records.get_mut(&id) {
                    let mut pending: Option<(BackgroundState, Option<RouteSeed>)> = None;
                    let mut queued_route: Option<RouteSeed> = None;
                    for event in self.services.events.drain_for(&id) {
                        handle_background_event(record, &event, &mut pending);
                    }
                    resolve_background_transitions(
                        record,
                        &mut pending,
                        &mut queued_route,
                        &self.background_table,
                        &mut self.services,
                    );
                    progressed = true;
                }
            }
            if !progressed {
                break;
            }
        }
    }

    /// Instantiates a pedestrian from the pool. A requested queue claim
    /// that cannot be honored falls back to claimless drifting.
    pub(crate) fn spawn_transient(&mut self, mut record: TransientActorRecord) -> Option<usize> {
        let index = self.transients.free_slot()?;
        if let Some(wanted) = record.queue_claim {
            if !self
                .services
                .queue
                .try_acquire_index(&transient_actor_id(index), wanted)
            {
                warn!(slot = wanted, "transient_claim_conflict");
                record.queue_claim = None;
                record.state_name = TRANSIENT_DRIFT_STATE.to_string();
                record.state_family = StateFamily::Background;
            }
        }
        self.transients.put(index, record);
        debug!(slot = index, "transient_spawned");
        Some(index)
    }

    fn release_transient(&mut self, index: usize) {
        if let Some(transient) = self.transients.release(index) {
            if let Some(slot) = transient.queue_claim {
                self.services.queue.release_index(slot);
            }
            self.services.events.drop_subscriber(&transient_actor_id(index));
            debug!(slot = index, "transient_released");
        }
    }

    fn release_all_transients(&mut self) {
        for index in 0..TRANSIENT_POOL_CAPACITY {
            self.release_transient(index);
        }
    }

    fn tick_transients(&mut self, dt_seconds: f32) {
        let exit = self.services.layout.exit;
        let mut to_release: Vec<usize> = Vec::new();
        for (index, transient) in self.transients.iter_mut() {
            // Queue-claiming pedestrians hold still; the rest drift on by.
            if transient.queue_claim.is_none() {
                transient.position.x += TRANSIENT_WALK_SPEED * dt_seconds;
            }
            if transient.position.distance(exit) > TRANSIENT_DESPAWN_DISTANCE {
                to_release.push(index);
            }
        }
        for index in to_release {
            self.release_transient(index);
        }
    }

    fn finish_tick(&mut self) {
        let mut transitions: u32 = 0;
        for event in self.services.events.drain_broadcasts() {
            match event {
                ShopEvent::StateChanged { .. } => transitions += 1,
                ShopEvent::ActorDeparted { actor } => {
                    debug!(actor = %actor, "departure_observed");
                }
                ShopEvent::ImpatienceExpired { actor } => {
                    debug!(actor = %actor, "impatience_observed");
                }
                _ => {}
            }
        }
        self.transitions_last_tick = transitions;
        self.services.events.finish_tick_rollover();
        self.last_event_counts = self.services.events.last_tick_counts();
        if self.last_event_counts.dropped > 0 {
            debug!(dropped = self.last_event_counts.dropped, "events_dropped");
        }
    }
}
