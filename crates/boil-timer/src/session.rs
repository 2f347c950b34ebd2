//! The boil session loop: feed published snapshots to the controller
//! until the boil finishes, the engine goes away, or shutdown is requested.

use std::future::Future;

use boil_core::TimerState;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};

use crate::controller::{BoilController, ButtonLabel, ControllerError};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The boil ran its full duration.
    Finished,
    /// Shutdown was requested before the boil finished.
    Interrupted,
    /// The engine closed its snapshot stream.
    EngineClosed,
}

/// Run until the boil finishes or `shutdown` resolves.
///
/// Logs the countdown once per whole remaining second; every snapshot is
/// logged at debug level. A lagging subscription is logged and skipped
/// over, since only the newest snapshot matters for the display.
///
/// # Errors
///
/// Returns [`ControllerError::Engine`] if stopping a finished boil fails.
pub async fn run_session<F>(
    controller: &mut BoilController,
    updates: &mut broadcast::Receiver<TimerState>,
    shutdown: F,
) -> Result<SessionEnd, ControllerError>
where
    F: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut last_whole_second: Option<u64> = None;

    loop {
        tokio::select! {
            () = &mut shutdown => {
                info!("Shutdown requested");
                return Ok(SessionEnd::Interrupted);
            }
            received = updates.recv() => match received {
                Ok(state) => {
                    let label = controller.observe(state).await?;
                    if let Some(text) = controller.remaining_text() {
                        debug!(progress = state.progress, remaining = %text, "Boiling");
                    }

                    let whole_second = state.boil_remain().as_secs();
                    if label == ButtonLabel::Stop && last_whole_second != Some(whole_second) {
                        last_whole_second = Some(whole_second);
                        info!(remaining_secs = whole_second, "Countdown");
                    }
                    if label == ButtonLabel::Finished {
                        return Ok(SessionEnd::Finished);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress display fell behind");
                }
                Err(RecvError::Closed) => {
                    warn!("Snapshot stream closed before the boil finished");
                    return Ok(SessionEnd::EngineClosed);
                }
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use boil_core::TimerEngine;
    use boil_core::clock::DEFAULT_TICK_PERIOD;

    use super::*;

    async fn started(
        input: &str,
    ) -> (
        Arc<TimerEngine>,
        BoilController,
        broadcast::Receiver<TimerState>,
    ) {
        let engine = Arc::new(TimerEngine::new(DEFAULT_TICK_PERIOD, Duration::ZERO).unwrap());
        let updates = engine.subscribe().await.unwrap();
        let mut controller = BoilController::new(Arc::clone(&engine), 1);
        controller.press(input).await.unwrap();
        (engine, controller, updates)
    }

    #[tokio::test(start_paused = true)]
    async fn session_runs_to_completion() {
        let (engine, mut controller, mut updates) = started("2").await;

        let end = run_session(&mut controller, &mut updates, std::future::pending())
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Finished);
        assert!(!engine.get().await.unwrap().boiling);

        engine.close().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_interrupts_a_running_boil() {
        let (engine, mut controller, mut updates) = started("60").await;

        let shutdown = tokio::time::sleep(Duration::from_secs(1));
        let end = run_session(&mut controller, &mut updates, shutdown)
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::Interrupted);

        let final_state = engine.close().await.unwrap();
        assert!(final_state.boiling);
        assert!(!final_state.is_complete());
    }

    #[tokio::test(start_paused = true)]
    async fn closed_engine_ends_the_session() {
        let (engine, mut controller, mut updates) = started("60").await;
        engine.close().await.unwrap();

        let end = run_session(&mut controller, &mut updates, std::future::pending())
            .await
            .unwrap();
        assert_eq!(end, SessionEnd::EngineClosed);
    }
}
