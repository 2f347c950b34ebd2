//! Boil clock: the periodic tick source that advances progress.
//!
//! The clock samples at a fixed period that is independent of (and much
//! finer than) the target boil duration. It is either enabled, in which
//! case [`BoilClock::tick`] resolves once per period, or disabled, in which
//! case it never resolves.
//!
//! # Design Principles
//!
//! - Enabling and disabling are idempotent. Re-enabling a running clock
//!   keeps its phase.
//! - The clock owns no timer state. Progress arithmetic lives in the pure
//!   [`advance_progress`] so it can be checked without a runtime.
//! - Ticks missed while the owning loop was busy are delivered in a burst
//!   rather than dropped.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// Sampling period of the reference timer (25 Hz).
pub const DEFAULT_TICK_PERIOD: Duration = Duration::from_millis(40);

/// Errors that can occur when building a clock.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// A zero tick period would spin without yielding.
    #[error("tick period must be greater than zero")]
    ZeroPeriod,
}

/// Progress after one tick, or `None` if the tick is a no-op.
///
/// A tick is a no-op once `progress` has reached `1.0`. With a zero
/// `duration` the result is pinned to `0.0`. The last productive tick may
/// overshoot `1.0` by at most one increment.
pub fn advance_progress(progress: f64, period: Duration, duration: Duration) -> Option<f64> {
    if progress >= 1.0 {
        return None;
    }
    if duration.is_zero() {
        return Some(0.0);
    }
    Some(progress + period.as_secs_f64() / duration.as_secs_f64())
}

/// Periodic tick source with an enabled/disabled switch.
#[derive(Debug)]
pub struct BoilClock {
    /// Fixed sampling period.
    period: Duration,

    /// Live interval while enabled; `None` while disabled.
    interval: Option<Interval>,
}

impl BoilClock {
    /// Create a disabled clock ticking every `period` once enabled.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::ZeroPeriod`] if `period` is zero.
    pub const fn new(period: Duration) -> Result<Self, ClockError> {
        if period.is_zero() {
            return Err(ClockError::ZeroPeriod);
        }
        Ok(Self {
            period,
            interval: None,
        })
    }

    /// Return the sampling period.
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Whether the clock is currently emitting ticks.
    pub const fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Enable or disable the clock.
    ///
    /// Enabling schedules the first tick one full period from now. Must be
    /// called from within a Tokio runtime.
    pub fn set_enabled(&mut self, enabled: bool) {
        match (enabled, self.interval.is_some()) {
            (true, false) => {
                let mut interval = tokio::time::interval_at(
                    Instant::now().checked_add(self.period).unwrap_or_else(Instant::now),
                    self.period,
                );
                interval.set_missed_tick_behavior(MissedTickBehavior::Burst);
                self.interval = Some(interval);
            }
            (false, true) => self.interval = None,
            _ => {}
        }
    }

    /// Wait for the next tick.
    ///
    /// Never resolves while the clock is disabled. Cancel safe, so it can
    /// sit in a `tokio::select!` branch.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => std::future::pending::<()>().await,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn zero_period_is_rejected() {
        assert!(matches!(
            BoilClock::new(Duration::ZERO),
            Err(ClockError::ZeroPeriod)
        ));
    }

    #[test]
    fn new_clock_starts_disabled() {
        let clock = BoilClock::new(DEFAULT_TICK_PERIOD).unwrap();
        assert!(!clock.is_enabled());
        assert_eq!(clock.period(), Duration::from_millis(40));
    }

    #[test]
    fn advance_adds_one_period_fraction() {
        let next = advance_progress(0.0, DEFAULT_TICK_PERIOD, Duration::from_secs(4)).unwrap();
        assert!((next - 0.01).abs() < 1e-12);
    }

    #[test]
    fn advance_is_a_no_op_once_complete() {
        assert_eq!(
            advance_progress(1.0, DEFAULT_TICK_PERIOD, Duration::from_secs(4)),
            None
        );
        assert_eq!(
            advance_progress(1.004, DEFAULT_TICK_PERIOD, Duration::from_secs(4)),
            None
        );
    }

    #[test]
    fn zero_duration_pins_progress_to_zero() {
        let mut progress = 0.0;
        for _ in 0..50 {
            progress = advance_progress(progress, DEFAULT_TICK_PERIOD, Duration::ZERO).unwrap();
            assert_eq!(progress, 0.0);
            assert!(!progress.is_nan());
        }
    }

    #[test]
    fn accumulation_is_monotonic_and_bounded() {
        let period = DEFAULT_TICK_PERIOD;
        let duration = Duration::from_millis(1_130);
        let increment = period.as_secs_f64() / duration.as_secs_f64();

        let mut progress = 0.0;
        let mut steps = 0_u32;
        while let Some(next) = advance_progress(progress, period, duration) {
            assert!(next >= progress);
            progress = next;
            steps = steps.saturating_add(1);
            assert!(steps < 1_000, "accumulation never completed");
        }
        assert!(progress >= 1.0);
        assert!(progress <= 1.0 + increment);
    }

    #[tokio::test(start_paused = true)]
    async fn enabled_clock_ticks_once_per_period() {
        let mut clock = BoilClock::new(DEFAULT_TICK_PERIOD).unwrap();
        let started = Instant::now();
        clock.set_enabled(true);
        assert!(clock.is_enabled());

        clock.tick().await;
        assert_eq!(started.elapsed(), DEFAULT_TICK_PERIOD);
        clock.tick().await;
        assert_eq!(started.elapsed(), DEFAULT_TICK_PERIOD * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn disabled_clock_never_ticks() {
        let mut clock = BoilClock::new(DEFAULT_TICK_PERIOD).unwrap();
        let waited = tokio::time::timeout(Duration::from_secs(5), clock.tick()).await;
        assert!(waited.is_err());

        clock.set_enabled(true);
        clock.set_enabled(false);
        assert!(!clock.is_enabled());
        let waited = tokio::time::timeout(Duration::from_secs(5), clock.tick()).await;
        assert!(waited.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn re_enabling_keeps_phase() {
        let mut clock = BoilClock::new(DEFAULT_TICK_PERIOD).unwrap();
        let started = Instant::now();
        clock.set_enabled(true);
        tokio::time::sleep(Duration::from_millis(30)).await;
        clock.set_enabled(true);

        clock.tick().await;
        assert_eq!(started.elapsed(), DEFAULT_TICK_PERIOD);
    }
}
