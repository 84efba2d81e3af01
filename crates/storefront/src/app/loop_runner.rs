use std::process::ExitCode;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use super::bootstrap::AppWiring;

const MAX_FRAME_DELTA: Duration = Duration::from_millis(250);
const MAX_TICKS_PER_FRAME: u32 = 5;
const SUMMARY_INTERVAL: Duration = Duration::from_secs(2);

/// Fixed-timestep headless loop. Wall-clock time feeds an accumulator that
/// is drained in whole simulation ticks; a stalled host process is clamped
/// to `MAX_FRAME_DELTA` so the simulation never spirals trying to catch up.
pub(crate) fn run(app: AppWiring) -> ExitCode {
    let AppWiring { config, mut context } = app;
    let tick_duration = Duration::from_secs_f32(config.tick_seconds);

    let mut previous = Instant::now();
    let mut last_summary = previous;
    let mut accumulator = Duration::ZERO;
    let mut ticks_run: u64 = 0;
    let mut clamped_frames: u32 = 0;

    while ticks_run < config.run_ticks {
        let now = Instant::now();
        let mut frame_delta = now.duration_since(previous);
        previous = now;
        if frame_delta > MAX_FRAME_DELTA {
            frame_delta = MAX_FRAME_DELTA;
            clamped_frames += 1;
        }
        accumulator += frame_delta;

        let mut ticks_this_frame = 0;
        while accumulator >= tick_duration
            && ticks_this_frame < MAX_TICKS_PER_FRAME
            && ticks_run < config.run_ticks
        {
            accumulator -= tick_duration;
            context.tick(config.tick_seconds);
            ticks_this_frame += 1;
            ticks_run += 1;
        }
        if ticks_this_frame == MAX_TICKS_PER_FRAME && accumulator >= tick_duration {
            // Running behind; drop the backlog rather than death-spiral.
            accumulator = Duration::ZERO;
        }

        if now.duration_since(last_summary) >= SUMMARY_INTERVAL {
            last_summary = now;
            let summary = context.summary();
            info!(
                tick = summary.tick_index,
                active = summary.active_actors,
                dormant = summary.dormant_actors,
                transients = summary.transients,
                ledger = summary.ledger_balance_minor,
                events_published = summary.event_counts.published,
                events_dropped = summary.event_counts.dropped,
                transitions = summary.transitions_last_tick,
                "tick_summary"
            );
        }

        thread::sleep(Duration::from_millis(1));
    }

    if clamped_frames > 0 {
        warn!(clamped_frames, "slow_frames_clamped");
    }

    match context.save_to_disk() {
        Ok(path) => info!(path = %path.display(), "save_written"),
        Err(message) => {
            warn!(error = %message, "final_save_failed");
            return ExitCode::FAILURE;
        }
    }

    let summary = context.summary();
    info!(
        ticks = ticks_run,
        ledger = summary.ledger_balance_minor,
        "run_complete"
    );
    ExitCode::SUCCESS
}
