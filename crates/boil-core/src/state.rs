//! Timer state and the signal transition table.
//!
//! [`TimerState`] is the value the engine owns and hands out by copy. It is
//! never shared by reference across the engine boundary: every reply and
//! every published snapshot is a fresh copy.
//!
//! [`TimerState::apply`] is the pure transition function. It knows nothing
//! about clocks or channels; the engine loop couples its result to the
//! clock source.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A named command applied to the engine's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    /// Query the current state without changing it.
    Get,
    /// Begin (or continue) boiling from the current progress.
    Start,
    /// Pause boiling, keeping progress.
    Stop,
    /// Stop boiling and rewind progress to zero.
    Reset,
    /// Rewind progress to zero and boil again.
    Restart,
}

impl Signal {
    /// Whether the signal forces progress back to zero.
    pub const fn rewinds(self) -> bool {
        matches!(self, Self::Reset | Self::Restart)
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Get => "get",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Reset => "reset",
            Self::Restart => "restart",
        };
        f.write_str(name)
    }
}

/// Snapshot of the boil timer.
///
/// A zero `duration` means the timer has not been configured yet. Any
/// `progress >= 1.0` means the boil is complete; the last tick may
/// overshoot `1.0` by up to one tick's increment.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TimerState {
    /// True iff the clock source is currently active.
    pub boiling: bool,
    /// Target total boil time.
    pub duration: Duration,
    /// Fraction of `duration` elapsed.
    pub progress: f64,
}

impl TimerState {
    /// An idle, unprogressed state with the given target duration.
    ///
    /// Also the usual way to build the desired override passed alongside a
    /// [`Signal`].
    pub const fn with_duration(duration: Duration) -> Self {
        Self {
            boiling: false,
            duration,
            progress: 0.0,
        }
    }

    /// Apply `signal` with the caller's `desired` override and return the
    /// next state.
    ///
    /// A non-zero `desired.duration` replaces the stored duration before
    /// the table below is applied; a zero duration leaves it untouched.
    /// [`Signal::Get`] ignores the override entirely.
    ///
    /// | Signal  | boiling   | progress  |
    /// |---------|-----------|-----------|
    /// | Get     | unchanged | unchanged |
    /// | Start   | true      | unchanged |
    /// | Restart | true      | 0         |
    /// | Stop    | false     | unchanged |
    /// | Reset   | false     | 0         |
    #[must_use]
    pub fn apply(self, signal: Signal, desired: Self) -> Self {
        let mut next = self;

        if signal != Signal::Get && !desired.duration.is_zero() {
            next.duration = desired.duration;
        }

        match signal {
            Signal::Get => {}
            Signal::Start => next.boiling = true,
            Signal::Stop => next.boiling = false,
            Signal::Restart => {
                next.boiling = true;
                next.progress = 0.0;
            }
            Signal::Reset => {
                next.boiling = false;
                next.progress = 0.0;
            }
        }

        next
    }

    /// Whether the boil has run its full duration.
    pub fn is_complete(&self) -> bool {
        self.progress >= 1.0
    }

    /// Remaining boil time: `(1 - progress) * duration`.
    ///
    /// Saturates at zero once progress reaches or overshoots `1.0`, and at
    /// `duration` when the product does not fit in a [`Duration`].
    pub fn boil_remain(&self) -> Duration {
        let remaining = 1.0 - self.progress;
        if !remaining.is_finite() || remaining <= 0.0 {
            return Duration::ZERO;
        }
        if remaining >= 1.0 {
            return self.duration;
        }
        Duration::try_from_secs_f64(self.duration.as_secs_f64() * remaining)
            .map_or(self.duration, |remain| remain.min(self.duration))
    }
}

/// Remaining boil time for `state`, without going through the engine.
pub fn boil_remain(state: &TimerState) -> Duration {
    state.boil_remain()
}
