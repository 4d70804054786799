//! Simulation binary for the Mars colony simulation.
//!
//! Loads configuration, founds the configured settlements, and runs the
//! stepping loop until a bound is reached or the process is interrupted.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `marsim-config.yaml` (defaults if absent)
//! 2. Initialize structured logging (tracing)
//! 3. Validate the configuration
//! 4. Create the simulation context (clocks, world, rules, seeded RNG)
//! 5. Found settlements from their templates
//! 6. Create control state from the session bounds
//! 7. Start snapshot publication and the sol reporter
//! 8. Install the interrupt handler
//! 9. Run the stepping loop
//! 10. Log the result

mod bootstrap;
mod error;

use std::path::Path;
use std::sync::Arc;

use marsim_core::config::{LoggingConfig, SimulationConfig};
use marsim_core::runner::{self, SnapshotPublisher};
use marsim_core::{SimulationContext, SimulationControl};
use marsim_types::SimulationSnapshot;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::EngineError;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "marsim-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the simulation itself fails.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging);
    info!("marsim-engine starting");
    if !from_file {
        info!(path = CONFIG_FILE, "Config file not found, using defaults");
    }

    // 3. Validate.
    config.validate()?;
    info!(
        session = config.simulation.name,
        seed = config.simulation.seed,
        step_millisols = config.simulation.step_millisols,
        step_interval_ms = config.simulation.step_interval_ms,
        settlements = config.settlements.len(),
        "Configuration loaded"
    );

    // 4. Create the simulation context.
    let mut ctx = SimulationContext::from_config(&config)?;
    info!(
        mars = %ctx.clock.mars_time(),
        earth = %ctx.clock.earth_time(),
        "Master clock initialized"
    );

    // 5. Found settlements.
    let founded = bootstrap::found_settlements(&mut ctx, &config.settlements)?;
    info!(
        settlements = founded.settlements.len(),
        people = founded.people,
        robots = founded.robots,
        vehicles = founded.vehicles,
        "Settlements founded"
    );

    // 6. Create control state.
    let control = Arc::new(SimulationControl::new(
        ctx.clock.control(),
        &config.simulation,
    ));

    // 7. Publish snapshots and report each new sol.
    let (mut publisher, receiver) = SnapshotPublisher::new(&ctx);
    tokio::spawn(report_sols(receiver));

    // 8. Stop cleanly on interrupt.
    {
        let control = Arc::clone(&control);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, stopping after the current step");
                control.request_stop();
            }
        });
    }

    // 9. Run the simulation.
    let result = runner::run_simulation(
        &mut ctx,
        config.simulation.step_millisols,
        &control,
        &mut publisher,
    )
    .await?;

    // 10. Log results.
    runner::log_simulation_end(&result, &ctx);
    match serde_json::to_string(&ctx.snapshot()) {
        Ok(json) => debug!(snapshot = %json, "Final snapshot"),
        Err(err) => warn!(error = %err, "failed to serialize final snapshot"),
    }

    info!(
        end_reason = ?result.end_reason,
        total_steps = result.total_steps,
        "marsim-engine shutdown complete"
    );
    Ok(())
}

/// Load `marsim-config.yaml`, or defaults when it does not exist. The flag
/// tells whether the file was read.
fn load_config() -> Result<(SimulationConfig, bool), EngineError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok((SimulationConfig::from_file(config_path)?, true))
    } else {
        Ok((SimulationConfig::default(), false))
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Log one line per sol from the published snapshots. Ends when the
/// publisher is dropped.
async fn report_sols(mut receiver: watch::Receiver<SimulationSnapshot>) {
    let mut last_sol = None;
    while receiver.changed().await.is_ok() {
        let (sol, mars, earth, agents, missions) = {
            let snapshot = receiver.borrow_and_update();
            (
                snapshot.clock.total_sols,
                snapshot.clock.mars_timestamp.clone(),
                snapshot.clock.earth_timestamp.clone(),
                snapshot.agents.len(),
                snapshot
                    .missions
                    .iter()
                    .filter(|mission| mission.end_reason.is_none())
                    .count(),
            )
        };
        if last_sol != Some(sol) {
            info!(sol, mars, earth, agents, active_missions = missions, "Sol report");
            last_sol = Some(sol);
        }
    }
}
