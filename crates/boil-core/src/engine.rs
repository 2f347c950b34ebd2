//! The timer engine: a single task that owns the boil state.
//!
//! [`TimerEngine`] is the caller-facing handle. All mutation happens inside
//! one spawned loop that waits on two inputs at once:
//!
//! - **Commands** -- a bounded queue of signals, each carrying a one-shot
//!   reply slot. The caller awaits the reply, so a dispatch is a
//!   synchronous round trip.
//! - **Clock ticks** -- from the [`BoilClock`], only while boiling.
//!
//! Exactly one input is handled at a time, so a tick can never observe a
//! half-applied signal and vice versa. Snapshots are published on a
//! [`broadcast`] channel; a subscriber that falls behind loses the oldest
//! snapshots rather than stalling the loop.
//!
//! # Lifecycle
//!
//! `Created -> Running -> Closed`. [`TimerEngine::close`] is final: it stops
//! the loop after the step in flight, drops the clock and the broadcast
//! sender, and makes every later call fail with [`EngineError::Closed`].
//! The stop request is a [`Notify`] permit rather than a queued command, so
//! it is delivered even if the caller abandons the `close` future.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::sync::{Mutex, Notify, broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace};

use crate::clock::{self, BoilClock, ClockError};
use crate::config::TimerConfig;
use crate::state::{Signal, TimerState};

/// Default depth of the command queue.
pub const DEFAULT_COMMAND_CAPACITY: usize = 32;

/// Default number of snapshots buffered per subscriber.
pub const DEFAULT_BROADCAST_CAPACITY: usize = 64;

/// Errors returned by [`TimerEngine`] operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The engine was closed before or while the operation ran.
    #[error("engine closed")]
    Closed,

    /// [`TimerEngine::close`] was called a second time.
    #[error("engine already closed")]
    AlreadyClosed,

    /// The clock could not be built.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A channel was sized at zero.
    #[error("{channel} capacity must be at least 1")]
    ZeroCapacity {
        /// Which channel was misconfigured.
        channel: &'static str,
    },

    /// The engine was built outside a Tokio runtime.
    #[error("timer engine must be created inside a Tokio runtime")]
    NoRuntime,

    /// The engine task panicked or was cancelled.
    #[error("engine task failed: {message}")]
    Task {
        /// Description of the task failure.
        message: String,
    },
}

/// Requests sent from handles to the engine loop.
#[derive(Debug)]
enum Command {
    /// Apply a signal and reply with the resulting state.
    Signal {
        signal: Signal,
        desired: TimerState,
        reply: oneshot::Sender<TimerState>,
    },
    /// Hand out a new snapshot receiver.
    Subscribe {
        reply: oneshot::Sender<broadcast::Receiver<TimerState>>,
    },
}

/// Handle to a running boil timer.
///
/// Methods take `&self`; share the engine between tasks with an [`Arc`].
#[derive(Debug)]
pub struct TimerEngine {
    commands: mpsc::Sender<Command>,
    shutdown: Arc<Notify>,
    closed: AtomicBool,
    task: Mutex<Option<JoinHandle<TimerState>>>,
    tick_period: Duration,
}

impl TimerEngine {
    /// Spawn an idle engine with the given tick period and initial target
    /// duration.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] for a zero tick period and
    /// [`EngineError::NoRuntime`] when called outside a Tokio runtime.
    pub fn new(tick_period: Duration, initial_duration: Duration) -> Result<Self, EngineError> {
        Self::with_capacity(
            tick_period,
            initial_duration,
            DEFAULT_COMMAND_CAPACITY,
            DEFAULT_BROADCAST_CAPACITY,
        )
    }

    /// Spawn an engine from the `timer` configuration section.
    ///
    /// # Errors
    ///
    /// See [`TimerEngine::with_capacity`].
    pub fn from_config(config: &TimerConfig) -> Result<Self, EngineError> {
        Self::with_capacity(
            config.tick_period(),
            config.initial_duration(),
            config.command_capacity,
            config.broadcast_capacity,
        )
    }

    /// Spawn an engine with explicit channel sizes.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Clock`] for a zero tick period,
    /// [`EngineError::ZeroCapacity`] for a zero-sized channel, and
    /// [`EngineError::NoRuntime`] when called outside a Tokio runtime.
    pub fn with_capacity(
        tick_period: Duration,
        initial_duration: Duration,
        command_capacity: usize,
        broadcast_capacity: usize,
    ) -> Result<Self, EngineError> {
        if command_capacity == 0 {
            return Err(EngineError::ZeroCapacity { channel: "command" });
        }
        if broadcast_capacity == 0 {
            return Err(EngineError::ZeroCapacity {
                channel: "broadcast",
            });
        }
        let clock = BoilClock::new(tick_period)?;
        let runtime = Handle::try_current().map_err(|_err| EngineError::NoRuntime)?;

        let (commands_tx, commands_rx) = mpsc::channel(command_capacity);
        let (updates, _) = broadcast::channel(broadcast_capacity);
        let shutdown = Arc::new(Notify::new());
        let boil_loop = BoilLoop {
            state: TimerState::with_duration(initial_duration),
            clock,
            commands: commands_rx,
            updates,
            shutdown: Arc::clone(&shutdown),
        };

        info!(
            tick_period_ms = tick_period.as_millis(),
            initial_duration_ms = initial_duration.as_millis(),
            "Timer engine starting"
        );
        let task = runtime.spawn(boil_loop.run());

        Ok(Self {
            commands: commands_tx,
            shutdown,
            closed: AtomicBool::new(false),
            task: Mutex::new(Some(task)),
            tick_period,
        })
    }

    /// Return the clock sampling period.
    pub const fn tick_period(&self) -> Duration {
        self.tick_period
    }

    /// Whether [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Apply `signal` with the `desired` override and return the resulting
    /// state.
    ///
    /// Waits until the engine loop has applied the transition. Safe to call
    /// from many tasks at once; each call is applied atomically, in the
    /// order the loop receives them.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] if the engine is closed, or closes
    /// before the command is applied.
    pub async fn dispatch(
        &self,
        signal: Signal,
        desired: TimerState,
    ) -> Result<TimerState, EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Signal {
                signal,
                desired,
                reply,
            })
            .await
            .map_err(|_err| EngineError::Closed)?;
        response.await.map_err(|_err| EngineError::Closed)
    }

    /// Return the current state without changing it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] once the engine is closed.
    pub async fn get(&self) -> Result<TimerState, EngineError> {
        self.dispatch(Signal::Get, TimerState::default()).await
    }

    /// Subscribe to state snapshots.
    ///
    /// The receiver yields one snapshot per productive tick, plus one after
    /// every reset or restart. It reports
    /// [`Lagged`](broadcast::error::RecvError::Lagged) if it falls more
    /// than the broadcast capacity behind, and
    /// [`Closed`](broadcast::error::RecvError::Closed) after the engine
    /// shuts down.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Closed`] once the engine is closed.
    pub async fn subscribe(&self) -> Result<broadcast::Receiver<TimerState>, EngineError> {
        if self.is_closed() {
            return Err(EngineError::Closed);
        }
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { reply })
            .await
            .map_err(|_err| EngineError::Closed)?;
        response.await.map_err(|_err| EngineError::Closed)
    }

    /// Stop the engine and wait for its loop to exit.
    ///
    /// Commands already queued when the loop sees the request are applied
    /// first; later ones fail with [`EngineError::Closed`]. Returns the
    /// final state.
    ///
    /// Cancel safe: the stop request is registered before the first await,
    /// so dropping this future still shuts the loop down.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyClosed`] on any call after the first,
    /// and [`EngineError::Task`] if the loop panicked.
    pub async fn close(&self) -> Result<TimerState, EngineError> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(EngineError::AlreadyClosed);
        }

        // Stores a permit if the loop is busy.
        self.shutdown.notify_one();

        let task = self.task.lock().await.take();
        let Some(task) = task else {
            return Err(EngineError::AlreadyClosed);
        };
        let final_state = task.await.map_err(|e| EngineError::Task {
            message: format!("{e}"),
        })?;

        info!(
            boiling = final_state.boiling,
            progress = final_state.progress,
            "Timer engine closed"
        );
        Ok(final_state)
    }
}

/// The single owner of [`TimerState`] and the clock switch.
#[derive(Debug)]
struct BoilLoop {
    state: TimerState,
    clock: BoilClock,
    commands: mpsc::Receiver<Command>,
    updates: broadcast::Sender<TimerState>,
    shutdown: Arc<Notify>,
}

impl BoilLoop {
    /// Run until shutdown is requested or every handle is dropped.
    async fn run(mut self) -> TimerState {
        loop {
            tokio::select! {
                () = self.shutdown.notified() => {
                    debug!("Shutdown requested");
                    self.drain_queued();
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => {
                        debug!("All engine handles dropped");
                        break;
                    }
                },
                () = self.clock.tick() => self.on_tick(),
            }
        }

        self.clock.set_enabled(false);
        self.state
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Signal {
                signal,
                desired,
                reply,
            } => {
                let next = self.apply(signal, desired);
                if reply.send(next).is_err() {
                    debug!(%signal, "Caller went away before the reply");
                }
            }
            Command::Subscribe { reply } => {
                if reply.send(self.updates.subscribe()).is_err() {
                    debug!("Subscriber went away before the reply");
                }
            }
        }
    }

    /// Refuse new commands and answer the ones already queued.
    fn drain_queued(&mut self) {
        self.commands.close();
        while let Ok(command) = self.commands.try_recv() {
            self.handle(command);
        }
    }

    /// Apply a signal and couple the clock to the resulting `boiling` flag.
    fn apply(&mut self, signal: Signal, desired: TimerState) -> TimerState {
        let next = self.state.apply(signal, desired);
        self.clock.set_enabled(next.boiling);
        self.state = next;

        if signal != Signal::Get {
            debug!(
                %signal,
                boiling = next.boiling,
                duration_ms = next.duration.as_millis(),
                progress = next.progress,
                "Signal applied"
            );
        }
        if signal.rewinds() {
            self.publish();
        }
        next
    }

    /// Advance progress by one tick and publish the result.
    fn on_tick(&mut self) {
        let Some(progress) =
            clock::advance_progress(self.state.progress, self.clock.period(), self.state.duration)
        else {
            return;
        };
        self.state.progress = progress;
        trace!(progress, "Tick");

        if self.state.is_complete() {
            info!(
                duration_ms = self.state.duration.as_millis(),
                progress, "Boil complete"
            );
        }
        self.publish();
    }

    /// Push the current state to every subscriber without waiting.
    fn publish(&self) {
        // Err only means nobody is listening right now.
        let _ = self.updates.send(self.state);
    }
}
