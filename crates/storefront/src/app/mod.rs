use std::process::ExitCode;

use tracing::error;

pub(crate) mod bootstrap;
pub(crate) mod loop_runner;
pub(crate) mod simulation;

pub(crate) fn run() -> ExitCode {
    match bootstrap::build_app() {
        Ok(wiring) => loop_runner::run(wiring),
        Err(message) => {
            error!(error = %message, "startup_failed");
            ExitCode::FAILURE
        }
    }
}
