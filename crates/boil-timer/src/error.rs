//! Error types for the boil timer binary.
//!
//! [`AppError`] wraps every failure that can end the process, so `main`
//! can propagate with `?` and exit non-zero.

/// Top-level error for the boil timer binary.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: boil_core::config::ConfigError,
    },

    /// Engine construction or teardown failed.
    #[error("engine error: {source}")]
    Engine {
        /// The underlying engine error.
        #[from]
        source: boil_core::EngineError,
    },

    /// The controller rejected input or lost the engine mid-session.
    #[error("controller error: {source}")]
    Controller {
        /// The underlying controller error.
        #[from]
        source: crate::controller::ControllerError,
    },

    /// The logging subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
