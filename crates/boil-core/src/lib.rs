//! Timer engine, boil clock, and signal arbitration for the boil timer.
//!
//! This crate owns the concurrent core that drives a boil progress
//! indicator: callers send [`Signal`]s, a periodic clock advances progress,
//! and a single task serializes both.
//!
//! # Modules
//!
//! - [`clock`] -- Periodic tick source and the progress increment.
//! - [`config`] -- Configuration loading from `boil-config.yaml` into
//!   strongly-typed structs.
//! - [`engine`] -- [`TimerEngine`], the request/response handle around the
//!   owning loop.
//! - [`state`] -- [`TimerState`], [`Signal`], and the transition table.
//!
//! [`Signal`]: state::Signal
//! [`TimerEngine`]: engine::TimerEngine
//! [`TimerState`]: state::TimerState

pub mod clock;
pub mod config;
pub mod engine;
pub mod state;

pub use engine::{EngineError, TimerEngine};
pub use state::{Signal, TimerState, boil_remain};
