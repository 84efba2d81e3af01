/// Behavior attached to one `ActiveState` value. Definitions are immutable
/// and shared; all per-actor mutation goes through the context. `on_enter`
/// performs at most one of: start a task, request a transition, nothing.
trait ActiveStateDef {
    fn id(&self) -> ActiveState;
    fn on_enter(&self, _cx: &mut ActiveCx<'_>) {}
    fn on_tick(&self, _cx: &mut ActiveCx<'_>, _dt_seconds: f32) {}
    fn on_exit(&self, _cx: &mut ActiveCx<'_>) {}
    /// The runner's current movement task finished at its destination.
    fn on_destination_reached(&self, _cx: &mut ActiveCx<'_>) {}
    /// A wait or checkout task ran to completion while this state owned it.
    fn on_task_complete(&self, _cx: &mut ActiveCx<'_>) {}
}

/// Behavior attached to one `BackgroundState` value, operating on the bare
/// `ActorRecord`. Work per tick is bounded; there is no suspension.
trait BackgroundStateDef {
    fn id(&self) -> BackgroundState;
    fn on_enter(&self, _cx: &mut BackgroundCx<'_>) {}
    fn on_tick(&self, _cx: &mut BackgroundCx<'_>, _dt_seconds: f32) {}
    fn on_exit(&self, _cx: &mut BackgroundCx<'_>) {}
}

struct ActiveStateTable {
    defs: HashMap<ActiveState, Box<dyn ActiveStateDef>>,
}

impl ActiveStateTable {
    /// Builds the lookup table, rejecting duplicates and missing entries.
    /// Runs once at startup; a malformed table is a wiring bug.
    fn from_defs(defs: Vec<Box<dyn ActiveStateDef>>) -> Result<Self, String> {
        let mut table: HashMap<ActiveState, Box<dyn ActiveStateDef>> = HashMap::new();
        for def in defs {
            let id = def.id();
            if table.insert(id, def).is_some() {
                return Err(format!("duplicate active state definition: {}", id.name()));
            }
        }
        let missing: Vec<&str> = ACTIVE_STATE_ORDER
            .iter()
            .filter(|state| !table.contains_key(state))
            .map(|state| state.name())
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "missing active state definitions: {}",
                missing.join(", ")
            ));
        }
        Ok(Self { defs: table })
    }

    fn def(&self, state: ActiveState) -> Option<&dyn ActiveStateDef> {
        self.defs.get(&state).map(Box::as_ref)
    }
}

struct BackgroundStateTable {
    defs: HashMap<BackgroundState, Box<dyn BackgroundStateDef>>,
}

impl BackgroundStateTable {
    fn from_defs(defs: Vec<Box<dyn BackgroundStateDef>>) -> Result<Self, String> {
        let mut table: HashMap<BackgroundState, Box<dyn BackgroundStateDef>> = HashMap::new();
        for def in defs {
            let id = def.id();
            if table.insert(id, def).is_some() {
                return Err(format!(
                    "duplicate background state definition: {}",
                    id.name()
                ));
            }
        }
        let missing: Vec<&str> = BACKGROUND_STATE_ORDER
            .iter()
            .filter(|state| !table.contains_key(state))
            .map(|state| state.name())
            .collect();
        if !missing.is_empty() {
            return Err(format!(
                "missing background state definitions: {}",
                missing.join(", ")
            ));
        }
        Ok(Self { defs: table })
    }

    fn def(&self, state: BackgroundState) -> Option<&dyn BackgroundStateDef> {
        self.defs.get(&state).map(Box::as_ref)
    }
}

/// Total mapping from high-fidelity to low-fidelity states. Exhaustive
/// match: adding an `ActiveState` without deciding its dormant counterpart
/// does not compile.
fn active_to_background(state: ActiveState) -> BackgroundState {
    match state {
        ActiveState::IdleAtHome => BackgroundState::AtHome,
        ActiveState::WalkToStore => BackgroundState::TravelingToStore,
        ActiveState::BrowseShelves => BackgroundState::Browsing,
        ActiveState::JoinQueue => BackgroundState::QueuedPrimary,
        ActiveState::WaitOverflow => BackgroundState::QueuedOverflow,
        ActiveState::CheckoutAtRegister => BackgroundState::PayingAtRegister,
        ActiveState::AwaitPrescription => BackgroundState::AwaitingPrescription,
        ActiveState::ExitStore => BackgroundState::LeavingStore,
        ActiveState::WalkHome => BackgroundState::TravelingHome,
        // A fleeing actor that drops to low fidelity is simply on its way
        // out of the store.
        ActiveState::Flee => BackgroundState::LeavingStore,
        ActiveState::StaffRegister => BackgroundState::StaffingRegister,
        ActiveState::RunCheckout => BackgroundState::ProcessingCheckout,
        ActiveState::PatrolFloor => BackgroundState::Patrolling,
    }
}

fn background_to_active(state: BackgroundState) -> ActiveState {
    match state {
        BackgroundState::AtHome => ActiveState::IdleAtHome,
        BackgroundState::TravelingToStore => ActiveState::WalkToStore,
        BackgroundState::Browsing => ActiveState::BrowseShelves,
        BackgroundState::QueuedPrimary => ActiveState::JoinQueue,
        BackgroundState::QueuedOverflow => ActiveState::WaitOverflow,
        BackgroundState::PayingAtRegister => ActiveState::CheckoutAtRegister,
        BackgroundState::AwaitingPrescription => ActiveState::AwaitPrescription,
        BackgroundState::LeavingStore => ActiveState::ExitStore,
        BackgroundState::TravelingHome => ActiveState::WalkHome,
        BackgroundState::StaffingRegister => ActiveState::StaffRegister,
        BackgroundState::ProcessingCheckout => ActiveState::RunCheckout,
        BackgroundState::Patrolling => ActiveState::PatrolFloor,
    }
}

/// Two active states are interchangeable across a fidelity round trip when
/// they share a dormant counterpart.
fn family_equivalent(a: ActiveState, b: ActiveState) -> bool {
    active_to_background(a) == active_to_background(b)
}

/// Startup cross-check over both `_ORDER` arrays: every dormant state
/// round-trips exactly, every active state round-trips at least to a
/// family-equivalent value.
fn validate_state_mapping() -> Result<(), String> {
    for state in BACKGROUND_STATE_ORDER {
        let round_trip = active_to_background(background_to_active(state));
        if round_trip != state {
            return Err(format!(
                "background state '{}' does not round-trip (got '{}')",
                state.name(),
                round_trip.name()
            ));
        }
    }
    for state in ACTIVE_STATE_ORDER {
        let round_trip = background_to_active(active_to_background(state));
        if !family_equivalent(state, round_trip) {
            return Err(format!(
                "active state '{}' maps outside its family (got '{}')",
                state.name(),
                round_trip.name()
            ));
        }
    }
    Ok(())
}
