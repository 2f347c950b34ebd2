//! Button and duration-field logic around the timer engine.
//!
//! [`BoilController`] is the boundary between user input and the engine.
//! It validates the typed duration before anything reaches the engine,
//! turns a button press into the right signals, and stops the boil once a
//! published snapshot shows it complete.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use boil_core::{EngineError, Signal, TimerEngine, TimerState};
use tracing::{debug, info};

/// Errors surfaced by the controller.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    /// The duration field does not hold a usable number of seconds.
    #[error("invalid boil duration {input:?}: {reason}")]
    InvalidDuration {
        /// The text as entered.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The engine rejected a command.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: EngineError,
    },
}

/// Label shown on the start button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonLabel {
    /// Idle; pressing starts the boil.
    Start,
    /// Boiling; pressing stops it.
    Stop,
    /// Progress reached the full duration.
    Finished,
}

impl fmt::Display for ButtonLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Start => "Start",
            Self::Stop => "Stop",
            Self::Finished => "Finished",
        })
    }
}

/// Parse the duration field: decimal seconds, surrounding whitespace
/// ignored.
///
/// # Errors
///
/// Returns [`ControllerError::InvalidDuration`] for empty, non-numeric,
/// non-positive, non-finite, or out-of-range input.
pub fn parse_duration_input(input: &str) -> Result<Duration, ControllerError> {
    let invalid = |reason: &str| ControllerError::InvalidDuration {
        input: input.to_owned(),
        reason: reason.to_owned(),
    };

    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(invalid("empty"));
    }
    let seconds: f64 = trimmed
        .parse()
        .map_err(|e: std::num::ParseFloatError| invalid(&e.to_string()))?;
    if !seconds.is_finite() {
        return Err(invalid("not a finite number"));
    }
    if seconds <= 0.0 {
        return Err(invalid("must be greater than zero"));
    }
    Duration::try_from_secs_f64(seconds).map_err(|e| invalid(&e.to_string()))
}

/// Remaining time in seconds with `precision` decimals.
pub fn format_remaining(state: &TimerState, precision: u8) -> String {
    format!(
        "{:.*}",
        usize::from(precision),
        state.boil_remain().as_secs_f64()
    )
}

/// Smallest difference, in seconds, that counts as a new duration.
fn input_tolerance(precision: u8) -> f64 {
    10_f64.powi(-i32::from(precision))
}

/// Drives a [`TimerEngine`] the way the start button and duration field do.
#[derive(Debug)]
pub struct BoilController {
    engine: Arc<TimerEngine>,
    precision: u8,
    latest: TimerState,
    finish_sent: bool,
}

impl BoilController {
    /// Create a controller for `engine`, formatting remaining time with
    /// `precision` decimals.
    pub fn new(engine: Arc<TimerEngine>, precision: u8) -> Self {
        Self {
            engine,
            precision,
            latest: TimerState::default(),
            finish_sent: false,
        }
    }

    /// Handle a press of the start button with `input` in the duration
    /// field.
    ///
    /// If the entered duration differs from the remaining time by more than
    /// the display precision, the timer is reset to the new duration
    /// first. The press then starts an idle timer or stops a boiling one.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::InvalidDuration`] without touching the
    /// engine if `input` does not parse, or [`ControllerError::Engine`] if
    /// the engine is closed.
    pub async fn press(&mut self, input: &str) -> Result<TimerState, ControllerError> {
        let requested = parse_duration_input(input)?;
        let mut state = self.engine.get().await?;

        let remain = state.boil_remain().as_secs_f64();
        if (remain - requested.as_secs_f64()).abs() > input_tolerance(self.precision) {
            debug!(
                requested_ms = requested.as_millis(),
                remain_ms = state.boil_remain().as_millis(),
                "Duration changed, resetting"
            );
            state = self
                .engine
                .dispatch(Signal::Reset, TimerState::with_duration(requested))
                .await?;
        }

        let signal = if state.boiling {
            Signal::Stop
        } else {
            Signal::Start
        };
        state = self
            .engine
            .dispatch(signal, TimerState::default())
            .await?;

        self.finish_sent = false;
        self.latest = state;
        info!(
            %signal,
            duration_ms = state.duration.as_millis(),
            progress = state.progress,
            "Button pressed"
        );
        Ok(state)
    }

    /// Record a published snapshot and return the button label to show.
    ///
    /// The first snapshot at or past full progress stops the boil.
    ///
    /// # Errors
    ///
    /// Returns [`ControllerError::Engine`] if stopping a finished boil
    /// fails.
    pub async fn observe(&mut self, state: TimerState) -> Result<ButtonLabel, ControllerError> {
        self.latest = state;
        if state.is_complete() && state.boiling && !self.finish_sent {
            self.finish_sent = true;
            self.latest = self
                .engine
                .dispatch(Signal::Stop, TimerState::default())
                .await?;
            info!(
                duration_ms = self.latest.duration.as_millis(),
                "Boil finished"
            );
        }
        Ok(self.label())
    }

    /// Label for the latest state.
    pub fn label(&self) -> ButtonLabel {
        if self.latest.is_complete() {
            ButtonLabel::Finished
        } else if self.latest.boiling {
            ButtonLabel::Stop
        } else {
            ButtonLabel::Start
        }
    }

    /// Text for the duration field while a boil is counting down.
    ///
    /// `None` when idle or finished, in which case the field keeps whatever
    /// the user typed.
    pub fn remaining_text(&self) -> Option<String> {
        (self.latest.boiling && !self.latest.is_complete())
            .then(|| format_remaining(&self.latest, self.precision))
    }
}
