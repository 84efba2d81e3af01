use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::simulation::{self, SimContext};

const SEED_ENV_VAR: &str = "STOREFRONT_SEED";
const RUN_TICKS_ENV_VAR: &str = "STOREFRONT_RUN_TICKS";
const RESUME_ENV_VAR: &str = "STOREFRONT_RESUME";

#[derive(Debug, Clone, Copy)]
pub(crate) struct LoopConfig {
    pub(crate) tick_seconds: f32,
    pub(crate) run_ticks: u64,
    pub(crate) seed: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            tick_seconds: 1.0 / 30.0,
            run_ticks: 1800,
            seed: 7,
        }
    }
}

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) context: SimContext,
}

pub(crate) fn build_app() -> Result<AppWiring, String> {
    init_tracing();
    info!("=== Storefront Sim Startup ===");

    let config = parse_config_from_env()?;
    let mut context = simulation::build_demo_simulation(config.seed)?;
    if env_flag_set(RESUME_ENV_VAR) {
        match context.load_from_disk() {
            Ok(stats) => info!(
                restored = stats.restored,
                conflicts = stats.conflicts,
                transients = stats.transients_restored,
                "resume_complete"
            ),
            Err(error) => warn!(error = %error, "resume_failed"),
        }
    }
    info!(
        seed = config.seed,
        run_ticks = config.run_ticks,
        "simulation_built"
    );

    Ok(AppWiring { config, context })
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}

fn parse_config_from_env() -> Result<LoopConfig, String> {
    let mut config = LoopConfig::default();

    if let Some(seed) = parse_env_u64(SEED_ENV_VAR)? {
        config.seed = seed;
    }
    if let Some(run_ticks) = parse_env_u64(RUN_TICKS_ENV_VAR)? {
        config.run_ticks = run_ticks;
    }

    Ok(config)
}

fn env_flag_set(var: &'static str) -> bool {
    matches!(
        std::env::var(var).as_deref(),
        Ok("1") | Ok("true") | Ok("yes")
    )
}

fn parse_env_u64(var: &'static str) -> Result<Option<u64>, String> {
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|error| format!("invalid {var} value '{raw}': {error}")),
        Err(std::env::VarError::NotPresent) => Ok(None),
        Err(error) => Err(format!("failed to read {var}: {error}")),
    }
}
