#[derive(Debug, Default, Clone, PartialEq)]
pub(crate) struct RestoreStats {
    pub(crate) restored: usize,
    pub(crate) conflicts: usize,
    pub(crate) transients_restored: usize,
    pub(crate) transients_dropped: usize,
    /// Actor ids in the order they were re-registered. Holders of scarce
    /// claims come first so re-acquisition cannot be stolen by latecomers.
    pub(crate) spawn_order: Vec<ActorId>,
}

/// Restore classes. Lower goes first: open transactions and register
/// holders, then the primary queue, then overflow and in-transit walkers,
/// then everyone else. Ties keep save-file order.
fn restore_priority(record: &ActorRecord) -> u8 {
    if matches!(record.claim, Some(claim) if claim.kind == ClaimKind::Register)
        || matches!(record.task, TaskPayload::Transaction { .. })
    {
        return 0;
    }
    if matches!(record.claim, Some(claim) if claim.kind == ClaimKind::QueueSlot) {
        return 1;
    }
    if matches!(record.claim, Some(claim) if claim.kind == ClaimKind::OverflowSlot)
        || matches!(
            record.background_state,
            BackgroundState::TravelingToStore
                | BackgroundState::TravelingHome
                | BackgroundState::LeavingStore
        )
    {
        return 2;
    }
    3
}

fn claim_capacity(kind: ClaimKind) -> usize {
    match kind {
        ClaimKind::Register => REGISTER_CAPACITY,
        ClaimKind::QueueSlot => PRIMARY_QUEUE_CAPACITY,
        ClaimKind::OverflowSlot => OVERFLOW_QUEUE_CAPACITY,
        ClaimKind::BrowseSpot => BROWSE_SPOT_CAPACITY,
        ClaimKind::PickupSpot => PICKUP_CLAIM_CAPACITY,
    }
}

fn record_to_saved(record: &ActorRecord) -> SavedActorRecord {
    SavedActorRecord {
        id: record.id.as_str().to_string(),
        archetype: SavedArchetype::from_archetype(record.archetype),
        position: SavedVec2::from_vec2(record.position),
        rotation_radians: record.rotation_radians,
        home_position: SavedVec2::from_vec2(record.home_position),
        background_state: SavedBackgroundState::from_state(record.background_state),
        task: SavedTaskPayload::from_task(&record.task),
        claim: record.claim.map(SavedClaim::from_claim),
        inventory: record.inventory.clone(),
    }
}

fn saved_to_record(saved: &SavedActorRecord) -> ActorRecord {
    ActorRecord {
        id: ActorId::new(saved.id.clone()),
        archetype: saved.archetype.to_archetype(),
        position: saved.position.to_vec2(),
        rotation_radians: saved.rotation_radians,
        home_position: saved.home_position.to_vec2(),
        background_state: saved.background_state.to_state(),
        task: saved.task.to_task(),
        claim: saved.claim.map(SavedClaim::to_claim),
        inventory: saved.inventory.clone(),
    }
}

fn transient_to_saved(transient: &TransientActorRecord) -> SavedTransientRecord {
    SavedTransientRecord {
        position: SavedVec2::from_vec2(transient.position),
        rotation_radians: transient.rotation_radians,
        state_name: transient.state_name.clone(),
        state_family: match transient.state_family {
            StateFamily::Active => SavedStateFamily::Active,
            StateFamily::Background => SavedStateFamily::Background,
        },
        queue_claim: transient.queue_claim.map(|slot| slot as u32),
        inventory: transient.inventory.clone(),
    }
}

fn saved_to_transient(saved: &SavedTransientRecord) -> TransientActorRecord {
    TransientActorRecord {
        position: saved.position.to_vec2(),
        rotation_radians: saved.rotation_radians,
        state_name: saved.state_name.clone(),
        state_family: match saved.state_family {
            SavedStateFamily::Active => StateFamily::Active,
            SavedStateFamily::Background => StateFamily::Background,
        },
        queue_claim: saved.queue_claim.map(|slot| slot as usize),
        inventory: saved.inventory.clone(),
    }
}

fn parse_save_game(text: &str) -> Result<SaveGame, String> {
    let mut deserializer = serde_json::Deserializer::from_str(text);
    serde_path_to_error::deserialize(&mut deserializer)
        .map_err(|err| format!("save parse failed at {}: {}", err.path(), err.inner()))
}

impl SimContext {
    /// Snapshots every persistent actor and pooled transient. Active actors
    /// are flushed into a copy of their record; the live runner is not
    /// disturbed, so saving mid-run is safe.
    fn build_save_game(&self) -> SaveGame {
        let mut records = Vec::with_capacity(self.records.len());
        for (id, record) in &self.records {
            let snapshot = match self.runners.get(id) {
                Some(runner) => {
                    let mut flushed = record.clone();
                    flush_active_to_record(runner, &mut flushed, &self.services);
                    flushed
                }
                None => record.clone(),
            };
            records.push(record_to_saved(&snapshot));
        }
        let transients = self
            .transients
            .iter()
            .map(|(_, transient)| transient_to_saved(transient))
            .collect();
        SaveGame {
            save_version: SAVE_VERSION,
            ledger_balance_minor: self.services.ledger.balance(),
            records,
            transients,
        }
    }

    /// Structural checks a save must pass before it is written or applied.
    /// Claim indices are range-checked here; cross-actor conflicts are
    /// resolved later, during apply.
    fn validate_save_game(save: &SaveGame) -> Result<(), String> {
        if save.save_version != SAVE_VERSION {
            return Err(format!(
                "unsupported save version {} (expected {})",
                save.save_version, SAVE_VERSION
            ));
        }
        let mut seen: HashSet<&str> = HashSet::new();
        for record in &save.records {
            if record.id.is_empty() {
                return Err("actor record with empty id".to_string());
            }
            if !seen.insert(record.id.as_str()) {
                return Err(format!("duplicate actor id '{}'", record.id));
            }
            if !record.position.is_finite()
                || !record.home_position.is_finite()
                || !record.rotation_radians.is_finite()
            {
                return Err(format!("non-finite float in record '{}'", record.id));
            }
            if let Some(claim) = record.claim {
                let claim = claim.to_claim();
                if claim.index >= claim_capacity(claim.kind) {
                    return Err(format!(
                        "claim index {} out of range for {} in record '{}'",
                        claim.index,
                        claim.kind.name(),
                        record.id
                    ));
                }
            }
            match &record.task {
                SavedTaskPayload::Transaction {
                    remaining_seconds, ..
                }
                | SavedTaskPayload::Wait { remaining_seconds } => {
                    if !remaining_seconds.is_finite() || *remaining_seconds < 0.0 {
                        return Err(format!("invalid task timer in record '{}'", record.id));
                    }
                }
                SavedTaskPayload::FollowPath { .. } | SavedTaskPayload::None => {}
            }
        }
        for (index, transient) in save.transients.iter().enumerate() {
            if !transient.position.is_finite() || !transient.rotation_radians.is_finite() {
                return Err(format!("non-finite float in transient {index}"));
            }
            if let Some(slot) = transient.queue_claim {
                if slot as usize >= PRIMARY_QUEUE_CAPACITY {
                    return Err(format!(
                        "queue claim {slot} out of range in transient {index}"
                    ));
                }
            }
        }
        Ok(())
    }

    fn resolve_save_path(&self) -> Result<PathBuf, String> {
        if let Some(path) = &self.save_path {
            return Ok(path.clone());
        }
        let paths = resolve_app_paths().map_err(|err| err.to_string())?;
        Ok(paths.saves_dir.join(SAVE_FILE_NAME))
    }

    pub(crate) fn save_to_disk(&self) -> Result<PathBuf, String> {
        let save = self.build_save_game();
        Self::validate_save_game(&save).map_err(|err| format!("refusing to write save: {err}"))?;
        let path = self.resolve_save_path()?;
        let text = serde_json::to_string_pretty(&save)
            .map_err(|err| format!("failed to serialize save: {err}"))?;
        simcore::savefile::write_text_atomic(&path, &text).map_err(|err| err.to_string())?;
        Ok(path)
    }

    pub(crate) fn load_from_disk(&mut self) -> Result<RestoreStats, String> {
        let path = self.resolve_save_path()?;
        let text = simcore::savefile::read_text(&path).map_err(|err| err.to_string())?;
        let save = parse_save_game(&text)?;
        let stats = self.apply_save_game(save)?;
        info!(
            path = %path.display(),
            restored = stats.restored,
            conflicts = stats.conflicts,
            "save_loaded"
        );
        Ok(stats)
    }

    /// Replaces the whole population with the saved one. Everyone comes back
    /// dormant; the activation policy re-promotes near the focus on the next
    /// tick. A claim or transaction that cannot be re-established downgrades
    /// that one actor to its archetype fallback instead of failing the load.
    fn apply_save_game(&mut self, save: SaveGame) -> Result<RestoreStats, String> {
        Self::validate_save_game(&save)?;

        self.release_all_transients();
        self.runners.clear();
        self.records.clear();
        self.background.clear();
        self.pinned_active.clear();
        self.services.reset_claims();
        self.services.events.clear();
        self.services.ledger = EconomyLedger::with_balance(save.ledger_balance_minor);
        self.tick_index = 0;
        self.transitions_last_tick = 0;
        self.last_event_counts = EventBusCounts::default();

        let incoming_ids: HashSet<ActorId> = save
            .records
            .iter()
            .map(|record| ActorId::new(record.id.clone()))
            .collect();

        let mut records: Vec<ActorRecord> = save.records.iter().map(saved_to_record).collect();
        // Stable: within a class, save-file order holds.
        records.sort_by_key(restore_priority);

        let mut stats = RestoreStats::default();
        for mut record in records {
            if let TaskPayload::Transaction { counterparty, .. } = &record.task {
                if !incoming_ids.contains(counterparty) {
                    warn!(
                        actor = %record.id,
                        counterparty = %counterparty,
                        "restore_conflict"
                    );
                    record.task = TaskPayload::None;
                    stats.conflicts += 1;
                }
            }
            if let Some(claim) = record.claim {
                if !self
                    .services
                    .pool_mut(claim.kind)
                    .try_acquire_index(&record.id, claim.index)
                {
                    warn!(
                        actor = %record.id,
                        pool = claim.kind.name(),
                        slot = claim.index,
                        "restore_conflict"
                    );
                    record.claim = None;
                    record.task = TaskPayload::None;
                    record.background_state = record.archetype.fallback_background_state();
                    stats.conflicts += 1;
                }
            }
            stats.spawn_order.push(record.id.clone());
            self.background.register(record.id.clone());
            self.records.insert(record.id.clone(), record);
            stats.restored += 1;
        }

        // Second pass: rebuild register pairings from surviving transactions.
        let paying: Vec<(ActorId, ActorId)> = self
            .records
            .values()
            .filter_map(|record| match &record.task {
                TaskPayload::Transaction { counterparty, .. } => {
                    Some((record.id.clone(), counterparty.clone()))
                }
                _ => None,
            })
            .collect();
        for (shopper, counterparty) in paying {
            match self.services.registers.index_of(&counterparty) {
                Some(register) => {
                    self.services.active_checkouts.insert(register, shopper);
                }
                None => {
                    warn!(actor = %shopper, counterparty = %counterparty, "restore_conflict");
                    if let Some(record) = self.records.get_mut(&shopper) {
                        record.task = TaskPayload::None;
                    }
                    stats.conflicts += 1;
                }
            }
        }

        for saved in &save.transients {
            match self.spawn_transient(saved_to_transient(saved)) {
                Some(_) => stats.transients_restored += 1,
                None => {
                    warn!("transient_pool_full");
                    stats.transients_dropped += 1;
                }
            }
        }

        Ok(stats)
    }
}
