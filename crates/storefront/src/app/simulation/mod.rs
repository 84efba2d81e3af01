use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use simcore::{
    resolve_app_paths, step_toward, ActorId, EconomyLedger, EventBus, EventBusCounts, LinearMover,
    MovementProvider, SlotPool, Vec2,
};
use tracing::{debug, info, warn};

const SAVE_VERSION: u32 = 1;
const SAVE_FILE_NAME: &str = "storefront.save.json";

const WALK_SPEED_UNITS_PER_SECOND: f32 = 1.6;
const MOVE_ARRIVAL_THRESHOLD: f32 = 0.1;
const ROTATION_EPSILON_SQ: f32 = 1e-8;

const HOME_DWELL_SECONDS: f32 = 6.0;
const BROWSE_DWELL_SECONDS: f32 = 4.0;
const BROWSE_RETRY_SECONDS: f32 = 1.5;
const QUEUE_IMPATIENCE_SECONDS: f32 = 12.0;
const OVERFLOW_IMPATIENCE_SECONDS: f32 = 8.0;
const CHECKOUT_SECONDS: f32 = 2.5;
const PICKUP_WAIT_SECONDS: f32 = 5.0;
const INTERACTION_PAUSE_SECONDS: f32 = 1.5;

const ITEM_PRICE_MINOR: u32 = 25;
const PRESCRIPTION_ITEM: &str = "prescription";
const ITEM_NAMES: [&str; 5] = ["apples", "bread", "milk", "coffee", "soap"];

const TRANSITION_HOP_LIMIT: u32 = 8;
const EVENT_DELIVERY_PASSES: u32 = 2;
const ACTIVATION_RADIUS_UNITS: f32 = 14.0;
const DEACTIVATION_HYSTERESIS_UNITS: f32 = 2.0;

const REGISTER_CAPACITY: usize = 2;
const PRIMARY_QUEUE_CAPACITY: usize = 4;
const OVERFLOW_QUEUE_CAPACITY: usize = 6;
const BROWSE_SPOT_CAPACITY: usize = 6;
const PICKUP_CLAIM_CAPACITY: usize = 1;
const TRANSIENT_POOL_CAPACITY: usize = 8;
const QUEUE_SLOT_SPACING_UNITS: f32 = 0.8;
const TRANSIENT_DESPAWN_DISTANCE: f32 = 30.0;
const TRANSIENT_WALK_SPEED: f32 = 1.2;
const TRANSIENT_DRIFT_STATE: &str = "drift";

include!("types.rs");
include!("states.rs");
include!("shopper.rs");
include!("cashier.rs");
include!("runner.rs");
include!("background.rs");
include!("flush.rs");
include!("decision.rs");
include!("context.rs");
include!("restore.rs");
include!("demo.rs");

#[cfg(test)]
mod tests {
    include!("tests.rs");
}
