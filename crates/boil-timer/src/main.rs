//! Headless boil timer.
//!
//! Wires the timer engine to the button/duration-field controller and
//! runs one boil, logging the countdown until it finishes or Ctrl-C is
//! pressed.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `boil-config.yaml` (defaults when absent)
//! 2. Initialize structured logging (tracing)
//! 3. Spawn the timer engine and subscribe to its snapshots
//! 4. Press the start button with the configured duration input
//! 5. Run the session until finished or interrupted
//! 6. Close the engine and log the final state

mod controller;
mod error;
mod session;

use std::path::Path;
use std::sync::Arc;

use boil_core::TimerEngine;
use boil_core::config::{BoilConfig, LoggingConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::controller::BoilController;
use crate::error::AppError;
use crate::session::SessionEnd;

/// Configuration file looked up in the working directory.
const CONFIG_FILE: &str = "boil-config.yaml";

/// Application entry point for the boil timer.
///
/// # Errors
///
/// Returns an error if configuration, engine construction, the session,
/// or engine teardown fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let (config, from_file) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging)?;
    info!(
        config_from_file = from_file,
        tick_interval_ms = config.timer.tick_interval_ms,
        boil_input = %config.session.boil_input,
        "boil-timer starting"
    );

    // 3. Spawn the engine.
    let engine = Arc::new(TimerEngine::from_config(&config.timer)?);
    let mut updates = engine.subscribe().await?;

    // 4. Press start.
    let mut controller = BoilController::new(Arc::clone(&engine), config.session.precision);
    let started = controller.press(&config.session.boil_input).await?;
    info!(
        duration_ms = started.duration.as_millis(),
        tick_period_ms = engine.tick_period().as_millis(),
        label = %controller.label(),
        "Boil started"
    );

    // 5. Run until finished or interrupted.
    let end = session::run_session(&mut controller, &mut updates, ctrl_c()).await?;

    // 6. Tear down.
    let final_state = engine.close().await?;
    match end {
        SessionEnd::Finished => info!(
            duration_ms = final_state.duration.as_millis(),
            "Boil finished"
        ),
        SessionEnd::Interrupted | SessionEnd::EngineClosed => info!(
            ?end,
            progress = final_state.progress,
            remaining_ms = final_state.boil_remain().as_millis(),
            "Boil abandoned"
        ),
    }
    info!("boil-timer shutdown complete");

    Ok(())
}

/// Load configuration from [`CONFIG_FILE`], or defaults when it is absent.
///
/// The flag reports whether the file was found.
fn load_config() -> Result<(BoilConfig, bool), AppError> {
    let config_path = Path::new(CONFIG_FILE);
    if config_path.exists() {
        Ok((BoilConfig::from_file(config_path)?, true))
    } else {
        Ok((BoilConfig::parse("")?, false))
    }
}

/// Install the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
fn init_tracing(logging: &LoggingConfig) -> Result<(), AppError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| AppError::Logging {
        message: format!("{e}"),
    })
}

/// Resolve on Ctrl-C. Never resolves if the signal cannot be watched.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Cannot listen for Ctrl-C, running until the boil finishes");
        std::future::pending::<()>().await;
    }
}
