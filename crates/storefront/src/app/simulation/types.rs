#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Archetype {
    Shopper,
    Cashier,
}

impl Archetype {
    fn name(self) -> &'static str {
        match self {
            Archetype::Shopper => "shopper",
            Archetype::Cashier => "cashier",
        }
    }

    /// Where an actor lands when its persisted situation cannot be
    /// re-established: visibly alive, holding nothing.
    fn fallback_background_state(self) -> BackgroundState {
        match self {
            Archetype::Shopper => BackgroundState::Browsing,
            Archetype::Cashier => BackgroundState::Patrolling,
        }
    }

    fn fallback_active_state(self) -> ActiveState {
        match self {
            Archetype::Shopper => ActiveState::BrowseShelves,
            Archetype::Cashier => ActiveState::PatrolFloor,
        }
    }
}

/// High-fidelity states, driven per-frame by an `ActiveRunner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ActiveState {
    IdleAtHome,
    WalkToStore,
    BrowseShelves,
    JoinQueue,
    WaitOverflow,
    CheckoutAtRegister,
    AwaitPrescription,
    ExitStore,
    WalkHome,
    Flee,
    StaffRegister,
    RunCheckout,
    PatrolFloor,
}

const ACTIVE_STATE_ORDER: [ActiveState; 13] = [
    ActiveState::IdleAtHome,
    ActiveState::WalkToStore,
    ActiveState::BrowseShelves,
    ActiveState::JoinQueue,
    ActiveState::WaitOverflow,
    ActiveState::CheckoutAtRegister,
    ActiveState::AwaitPrescription,
    ActiveState::ExitStore,
    ActiveState::WalkHome,
    ActiveState::Flee,
    ActiveState::StaffRegister,
    ActiveState::RunCheckout,
    ActiveState::PatrolFloor,
];

impl ActiveState {
    fn name(self) -> &'static str {
        match self {
            ActiveState::IdleAtHome => "idle_at_home",
            ActiveState::WalkToStore => "walk_to_store",
            ActiveState::BrowseShelves => "browse_shelves",
            ActiveState::JoinQueue => "join_queue",
            ActiveState::WaitOverflow => "wait_overflow",
            ActiveState::CheckoutAtRegister => "checkout_at_register",
            ActiveState::AwaitPrescription => "await_prescription",
            ActiveState::ExitStore => "exit_store",
            ActiveState::WalkHome => "walk_home",
            ActiveState::Flee => "flee",
            ActiveState::StaffRegister => "staff_register",
            ActiveState::RunCheckout => "run_checkout",
            ActiveState::PatrolFloor => "patrol_floor",
        }
    }

    /// States whose movement follows an authored waypoint path, as opposed
    /// to a single destination. Decision options targeting these must carry
    /// a route.
    fn is_follow_path(self) -> bool {
        matches!(
            self,
            ActiveState::WalkToStore | ActiveState::WalkHome | ActiveState::PatrolFloor
        )
    }
}

/// Low-fidelity states, advanced in bulk by the `BackgroundTickManager`
/// directly on the actor's record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum BackgroundState {
    AtHome,
    TravelingToStore,
    Browsing,
    QueuedPrimary,
    QueuedOverflow,
    PayingAtRegister,
    AwaitingPrescription,
    LeavingStore,
    TravelingHome,
    StaffingRegister,
    ProcessingCheckout,
    Patrolling,
}

const BACKGROUND_STATE_ORDER: [BackgroundState; 12] = [
    BackgroundState::AtHome,
    BackgroundState::TravelingToStore,
    BackgroundState::Browsing,
    BackgroundState::QueuedPrimary,
    BackgroundState::QueuedOverflow,
    BackgroundState::PayingAtRegister,
    BackgroundState::AwaitingPrescription,
    BackgroundState::LeavingStore,
    BackgroundState::TravelingHome,
    BackgroundState::StaffingRegister,
    BackgroundState::ProcessingCheckout,
    BackgroundState::Patrolling,
];

impl BackgroundState {
    fn name(self) -> &'static str {
        match self {
            BackgroundState::AtHome => "at_home",
            BackgroundState::TravelingToStore => "traveling_to_store",
            BackgroundState::Browsing => "browsing",
            BackgroundState::QueuedPrimary => "queued_primary",
            BackgroundState::QueuedOverflow => "queued_overflow",
            BackgroundState::PayingAtRegister => "paying_at_register",
            BackgroundState::AwaitingPrescription => "awaiting_prescription",
            BackgroundState::LeavingStore => "leaving_store",
            BackgroundState::TravelingHome => "traveling_home",
            BackgroundState::StaffingRegister => "staffing_register",
            BackgroundState::ProcessingCheckout => "processing_checkout",
            BackgroundState::Patrolling => "patrolling",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StateFamily {
    Active,
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum PathId {
    HomeToStore,
    FloorLoop,
}

const PATH_ORDER: [PathId; 2] = [PathId::HomeToStore, PathId::FloorLoop];

impl PathId {
    fn name(self) -> &'static str {
        match self {
            PathId::HomeToStore => "home_to_store",
            PathId::FloorLoop => "floor_loop",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PathDirection {
    Forward,
    Reverse,
}

/// A path plus where on it to start. `next_waypoint` indexes the
/// direction-ordered waypoint sequence, not the raw authored list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct RouteSeed {
    path: PathId,
    next_waypoint: usize,
    direction: PathDirection,
}

impl RouteSeed {
    fn start_of(path: PathId, direction: PathDirection) -> Self {
        Self {
            path,
            next_waypoint: 0,
            direction,
        }
    }
}

/// The waypoint at direction-ordered position `index`, or `None` once the
/// path is exhausted.
fn path_point(waypoints: &[Vec2], direction: PathDirection, index: usize) -> Option<Vec2> {
    if index >= waypoints.len() {
        return None;
    }
    match direction {
        PathDirection::Forward => Some(waypoints[index]),
        PathDirection::Reverse => Some(waypoints[waypoints.len() - 1 - index]),
    }
}

/// The one long-running thing a dormant actor is doing. The enum shape is
/// the mutual-exclusion guarantee: writing any variant discards the rest.
#[derive(Debug, Clone, PartialEq)]
enum TaskPayload {
    None,
    FollowPath {
        path: PathId,
        next_waypoint: usize,
        direction: PathDirection,
    },
    Transaction {
        counterparty: ActorId,
        remaining_seconds: f32,
        value_minor: u32,
    },
    Wait {
        remaining_seconds: f32,
    },
}

impl TaskPayload {
    fn is_none(&self) -> bool {
        matches!(self, TaskPayload::None)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ClaimKind {
    Register,
    QueueSlot,
    OverflowSlot,
    BrowseSpot,
    PickupSpot,
}

impl ClaimKind {
    fn name(self) -> &'static str {
        match self {
            ClaimKind::Register => "register",
            ClaimKind::QueueSlot => "queue_slot",
            ClaimKind::OverflowSlot => "overflow_slot",
            ClaimKind::BrowseSpot => "browse_spot",
            ClaimKind::PickupSpot => "pickup_spot",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ResourceClaim {
    kind: ClaimKind,
    index: usize,
}

/// Authoritative persistent actor. Position and rotation here are the truth
/// whenever the actor has no runner; the flush layer reconciles on
/// every activation boundary.
#[derive(Debug, Clone, PartialEq)]
struct ActorRecord {
    id: ActorId,
    archetype: Archetype,
    position: Vec2,
    rotation_radians: f32,
    home_position: Vec2,
    background_state: BackgroundState,
    task: TaskPayload,
    claim: Option<ResourceClaim>,
    inventory: Vec<String>,
}

impl ActorRecord {
    fn new(id: ActorId, archetype: Archetype, home_position: Vec2, state: BackgroundState) -> Self {
        Self {
            id,
            archetype,
            position: home_position,
            rotation_radians: 0.0,
            home_position,
            background_state: state,
            task: TaskPayload::None,
            claim: None,
            inventory: Vec::new(),
        }
    }

    fn set_task(&mut self, task: TaskPayload) {
        self.task = task;
    }
}

/// Nameless pooled pedestrian. Holds at most a primary-queue claim; never
/// ticked while the slot is vacant.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TransientActorRecord {
    position: Vec2,
    rotation_radians: f32,
    state_name: String,
    state_family: StateFamily,
    queue_claim: Option<usize>,
    inventory: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum DecisionPointId {
    LeaveHome,
    StoreEntrance,
    AisleEnd,
    AfterCheckout,
    PickupCounter,
}

impl DecisionPointId {
    fn name(self) -> &'static str {
        match self {
            DecisionPointId::LeaveHome => "leave_home",
            DecisionPointId::StoreEntrance => "store_entrance",
            DecisionPointId::AisleEnd => "aisle_end",
            DecisionPointId::AfterCheckout => "after_checkout",
            DecisionPointId::PickupCounter => "pickup_counter",
        }
    }
}

/// One selectable outcome at a decision point. Options targeting
/// follow-path states must carry a route; others leave it `None`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DecisionOption {
    target: ActiveState,
    route: Option<RouteSeed>,
}

impl DecisionOption {
    fn to(target: ActiveState) -> Self {
        Self {
            target,
            route: None,
        }
    }

    fn routed(target: ActiveState, path: PathId, direction: PathDirection) -> Self {
        Self {
            target,
            route: Some(RouteSeed::start_of(path, direction)),
        }
    }
}

/// Everything actors say to each other, plus externally-sourced
/// interruptions. State-change notices and departures are broadcast; the
/// rest are addressed.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ShopEvent {
    StateChanged {
        actor: ActorId,
        from: &'static str,
        to: &'static str,
    },
    ActorDeparted {
        actor: ActorId,
    },
    ImpatienceExpired {
        actor: ActorId,
    },
    CheckoutStarted {
        shopper: ActorId,
        value_minor: u32,
    },
    CheckoutAborted {
        shopper: ActorId,
    },
    TransactionCompleted {
        counterparty: ActorId,
        value_minor: u32,
    },
    Attacked,
    InteractedWith,
    EmoteTriggered,
}

/// Static store geometry: anchor points for every claimable spot plus the
/// authored waypoint paths.
#[derive(Debug, Clone, PartialEq)]
struct StoreLayout {
    entrance: Vec2,
    exit: Vec2,
    register_positions: Vec<Vec2>,
    queue_anchor: Vec2,
    overflow_anchor: Vec2,
    browse_positions: Vec<Vec2>,
    pickup_counter: Vec2,
    paths: HashMap<PathId, Vec<Vec2>>,
}

impl StoreLayout {
    fn path(&self, id: PathId) -> Option<&Vec<Vec2>> {
        self.paths.get(&id)
    }

    fn queue_slot_position(&self, index: usize) -> Vec2 {
        Vec2::new(
            self.queue_anchor.x,
            self.queue_anchor.y + index as f32 * QUEUE_SLOT_SPACING_UNITS,
        )
    }

    fn overflow_slot_position(&self, index: usize) -> Vec2 {
        Vec2::new(
            self.overflow_anchor.x,
            self.overflow_anchor.y + index as f32 * QUEUE_SLOT_SPACING_UNITS,
        )
    }

    fn browse_position(&self, index: usize) -> Vec2 {
        if self.browse_positions.is_empty() {
            return self.entrance;
        }
        self.browse_positions[index % self.browse_positions.len()]
    }

    fn register_position(&self, index: usize) -> Vec2 {
        if self.register_positions.is_empty() {
            return self.entrance;
        }
        self.register_positions[index % self.register_positions.len()]
    }
}

// --- Saved mirror types -----------------------------------------------------
//
// The persisted schema is decoupled from the live types on purpose; every
// field crosses through an explicit conversion so schema drift shows up
// here instead of in a serde error at a customer's machine.

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
struct SavedVec2 {
    x: f32,
    y: f32,
}

impl SavedVec2 {
    fn from_vec2(value: Vec2) -> Self {
        Self { x: value.x, y: value.y }
    }

    fn to_vec2(self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }

    fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedArchetype {
    Shopper,
    Cashier,
}

impl SavedArchetype {
    fn from_archetype(value: Archetype) -> Self {
        match value {
            Archetype::Shopper => SavedArchetype::Shopper,
            Archetype::Cashier => SavedArchetype::Cashier,
        }
    }

    fn to_archetype(self) -> Archetype {
        match self {
            SavedArchetype::Shopper => Archetype::Shopper,
            SavedArchetype::Cashier => Archetype::Cashier,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedBackgroundState {
    AtHome,
    TravelingToStore,
    Browsing,
    QueuedPrimary,
    QueuedOverflow,
    PayingAtRegister,
    AwaitingPrescription,
    LeavingStore,
    TravelingHome,
    StaffingRegister,
    ProcessingCheckout,
    Patrolling,
}

impl SavedBackgroundState {
    fn from_state(value: BackgroundState) -> Self {
        match value {
            BackgroundState::AtHome => SavedBackgroundState::AtHome,
            BackgroundState::TravelingToStore => SavedBackgroundState::TravelingToStore,
            BackgroundState::Browsing => SavedBackgroundState::Browsing,
            BackgroundState::QueuedPrimary => SavedBackgroundState::QueuedPrimary,
            BackgroundState::QueuedOverflow => SavedBackgroundState::QueuedOverflow,
            BackgroundState::PayingAtRegister => SavedBackgroundState::PayingAtRegister,
            BackgroundState::AwaitingPrescription => SavedBackgroundState::AwaitingPrescription,
            BackgroundState::LeavingStore => SavedBackgroundState::LeavingStore,
            BackgroundState::TravelingHome => SavedBackgroundState::TravelingHome,
            BackgroundState::StaffingRegister => SavedBackgroundState::StaffingRegister,
            BackgroundState::ProcessingCheckout => SavedBackgroundState::ProcessingCheckout,
            BackgroundState::Patrolling => SavedBackgroundState::Patrolling,
        }
    }

    fn to_state(self) -> BackgroundState {
        match self {
            SavedBackgroundState::AtHome => BackgroundState::AtHome,
            SavedBackgroundState::TravelingToStore => BackgroundState::TravelingToStore,
            SavedBackgroundState::Browsing => BackgroundState::Browsing,
            SavedBackgroundState::QueuedPrimary => BackgroundState::QueuedPrimary,
            SavedBackgroundState::QueuedOverflow => BackgroundState::QueuedOverflow,
            SavedBackgroundState::PayingAtRegister => BackgroundState::PayingAtRegister,
            SavedBackgroundState::AwaitingPrescription => BackgroundState::AwaitingPrescription,
            SavedBackgroundState::LeavingStore => BackgroundState::LeavingStore,
            SavedBackgroundState::TravelingHome => BackgroundState::TravelingHome,
            SavedBackgroundState::StaffingRegister => BackgroundState::StaffingRegister,
            SavedBackgroundState::ProcessingCheckout => BackgroundState::ProcessingCheckout,
            SavedBackgroundState::Patrolling => BackgroundState::Patrolling,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedPathId {
    HomeToStore,
    FloorLoop,
}

impl SavedPathId {
    fn from_path(value: PathId) -> Self {
        match value {
            PathId::HomeToStore => SavedPathId::HomeToStore,
            PathId::FloorLoop => SavedPathId::FloorLoop,
        }
    }

    fn to_path(self) -> PathId {
        match self {
            SavedPathId::HomeToStore => PathId::HomeToStore,
            SavedPathId::FloorLoop => PathId::FloorLoop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
enum SavedTaskPayload {
    None,
    FollowPath {
        path: SavedPathId,
        next_waypoint: u32,
        reverse: bool,
    },
    Transaction {
        counterparty: String,
        remaining_seconds: f32,
        value_minor: u32,
    },
    Wait {
        remaining_seconds: f32,
    },
}

impl SavedTaskPayload {
    fn from_task(value: &TaskPayload) -> Self {
        match value {
            TaskPayload::None => SavedTaskPayload::None,
            TaskPayload::FollowPath {
                path,
                next_waypoint,
                direction,
            } => SavedTaskPayload::FollowPath {
                path: SavedPathId::from_path(*path),
                next_waypoint: *next_waypoint as u32,
                reverse: *direction == PathDirection::Reverse,
            },
            TaskPayload::Transaction {
                counterparty,
                remaining_seconds,
                value_minor,
            } => SavedTaskPayload::Transaction {
                counterparty: counterparty.as_str().to_string(),
                remaining_seconds: *remaining_seconds,
                value_minor: *value_minor,
            },
            TaskPayload::Wait { remaining_seconds } => SavedTaskPayload::Wait {
                remaining_seconds: *remaining_seconds,
            },
        }
    }

    fn to_task(&self) -> TaskPayload {
        match self {
            SavedTaskPayload::None => TaskPayload::None,
            SavedTaskPayload::FollowPath {
                path,
                next_waypoint,
                reverse,
            } => TaskPayload::FollowPath {
                path: path.to_path(),
                next_waypoint: *next_waypoint as usize,
                direction: if *reverse {
                    PathDirection::Reverse
                } else {
                    PathDirection::Forward
                },
            },
            SavedTaskPayload::Transaction {
                counterparty,
                remaining_seconds,
                value_minor,
            } => TaskPayload::Transaction {
                counterparty: ActorId::new(counterparty.clone()),
                remaining_seconds: *remaining_seconds,
                value_minor: *value_minor,
            },
            SavedTaskPayload::Wait { remaining_seconds } => TaskPayload::Wait {
                remaining_seconds: *remaining_seconds,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedClaim {
    Register(u32),
    QueueSlot(u32),
    OverflowSlot(u32),
    BrowseSpot(u32),
    PickupSpot(u32),
}

impl SavedClaim {
    fn from_claim(value: ResourceClaim) -> Self {
        let index = value.index as u32;
        match value.kind {
            ClaimKind::Register => SavedClaim::Register(index),
            ClaimKind::QueueSlot => SavedClaim::QueueSlot(index),
            ClaimKind::OverflowSlot => SavedClaim::OverflowSlot(index),
            ClaimKind::BrowseSpot => SavedClaim::BrowseSpot(index),
            ClaimKind::PickupSpot => SavedClaim::PickupSpot(index),
        }
    }

    fn to_claim(self) -> ResourceClaim {
        let (kind, index) = match self {
            SavedClaim::Register(index) => (ClaimKind::Register, index),
            SavedClaim::QueueSlot(index) => (ClaimKind::QueueSlot, index),
            SavedClaim::OverflowSlot(index) => (ClaimKind::OverflowSlot, index),
            SavedClaim::BrowseSpot(index) => (ClaimKind::BrowseSpot, index),
            SavedClaim::PickupSpot(index) => (ClaimKind::PickupSpot, index),
        };
        ResourceClaim {
            kind,
            index: index as usize,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedActorRecord {
    id: String,
    archetype: SavedArchetype,
    position: SavedVec2,
    rotation_radians: f32,
    home_position: SavedVec2,
    background_state: SavedBackgroundState,
    task: SavedTaskPayload,
    claim: Option<SavedClaim>,
    inventory: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum SavedStateFamily {
    Active,
    Background,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SavedTransientRecord {
    position: SavedVec2,
    rotation_radians: f32,
    state_name: String,
    state_family: SavedStateFamily,
    queue_claim: Option<u32>,
    inventory: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct SaveGame {
    save_version: u32,
    ledger_balance_minor: u64,
    records: Vec<SavedActorRecord>,
    transients: Vec<SavedTransientRecord>,
}
