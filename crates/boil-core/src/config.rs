//! Configuration loading and typed config structures for the boil timer.
//!
//! The canonical configuration lives in `boil-config.yaml` next to the
//! binary's working directory. Every field is optional; a missing file or
//! an empty document yields [`BoilConfig::default`], which reproduces the
//! reference 25 Hz timer.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot drive the engine.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level boil timer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BoilConfig {
    /// Engine timing and channel sizing.
    #[serde(default)]
    pub timer: TimerConfig,

    /// Input fed to the boundary controller.
    #[serde(default)]
    pub session: SessionConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl BoilConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override YAML values:
    /// - `BOIL_TICK_INTERVAL_MS` overrides `timer.tick_interval_ms`
    /// - `BOIL_INPUT` overrides `session.boil_input`
    /// - `BOIL_LOG_LEVEL` overrides `logging.level`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value fails validation.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string, then apply environment
    /// overrides and validate.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] or [`ConfigError::Invalid`].
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Override individual values with environment variables when set.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `BOIL_TICK_INTERVAL_MS` is not
    /// an integer.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Ok(val) = std::env::var("BOIL_TICK_INTERVAL_MS") {
            self.timer.tick_interval_ms = val.trim().parse().map_err(|e| ConfigError::Invalid {
                reason: format!("invalid BOIL_TICK_INTERVAL_MS {val:?}: {e}"),
            })?;
        }
        if let Ok(val) = std::env::var("BOIL_INPUT") {
            self.session.boil_input = val;
        }
        if let Ok(val) = std::env::var("BOIL_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }

    /// Reject values the engine cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason: &str| {
            Err(ConfigError::Invalid {
                reason: reason.to_owned(),
            })
        };
        if self.timer.tick_interval_ms == 0 {
            return invalid("timer.tick_interval_ms must be at least 1");
        }
        if self.timer.command_capacity == 0 {
            return invalid("timer.command_capacity must be at least 1");
        }
        if self.timer.broadcast_capacity == 0 {
            return invalid("timer.broadcast_capacity must be at least 1");
        }
        if self.session.precision > MAX_PRECISION {
            return invalid("session.precision must be at most 6");
        }
        Ok(())
    }
}

/// Highest number of decimals the controller formats remaining time with.
pub const MAX_PRECISION: u8 = 6;

/// Engine timing and channel sizing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimerConfig {
    /// Real-time milliseconds per clock tick.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Target boil duration the engine starts with (0 = not configured).
    #[serde(default)]
    pub initial_duration_ms: u64,

    /// Commands that may queue before callers wait for a free slot.
    #[serde(default = "default_command_capacity")]
    pub command_capacity: usize,

    /// Snapshots a subscriber may fall behind before it starts losing
    /// the oldest ones.
    #[serde(default = "default_broadcast_capacity")]
    pub broadcast_capacity: usize,
}

impl TimerConfig {
    /// Clock sampling period.
    pub const fn tick_period(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Duration the engine is constructed with.
    pub const fn initial_duration(&self) -> Duration {
        Duration::from_millis(self.initial_duration_ms)
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            initial_duration_ms: 0,
            command_capacity: default_command_capacity(),
            broadcast_capacity: default_broadcast_capacity(),
        }
    }
}

/// Input fed to the boundary controller by the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Boil duration as typed into the duration field, in seconds.
    #[serde(default = "default_boil_input")]
    pub boil_input: String,

    /// Decimals shown for the remaining time.
    #[serde(default = "default_precision")]
    pub precision: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            boil_input: default_boil_input(),
            precision: default_precision(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

const fn default_tick_interval_ms() -> u64 {
    40
}

const fn default_command_capacity() -> usize {
    32
}

const fn default_broadcast_capacity() -> usize {
    64
}

fn default_boil_input() -> String {
    "4.0".to_owned()
}

const fn default_precision() -> u8 {
    1
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_the_reference_timer() {
        let config = BoilConfig::default();
        assert_eq!(config.timer.tick_period(), Duration::from_millis(40));
        assert_eq!(config.timer.initial_duration(), Duration::ZERO);
        assert_eq!(config.session.precision, 1);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_yaml() {
        let yaml = r#"
timer:
  tick_interval_ms: 20
  initial_duration_ms: 360000
  command_capacity: 8
  broadcast_capacity: 4

session:
  boil_input: "6.5"
  precision: 2

logging:
  level: "debug"
  json: true
"#;

        let config = BoilConfig::parse(yaml);
        assert!(config.is_ok(), "{config:?}");
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.timer.tick_period(), Duration::from_millis(20));
        assert_eq!(config.timer.initial_duration(), Duration::from_secs(360));
        assert_eq!(config.timer.command_capacity, 8);
        assert_eq!(config.timer.broadcast_capacity, 4);
        assert_eq!(config.session.precision, 2);
        assert!(config.logging.json);
    }

    #[test]
    fn parse_minimal_yaml() {
        let yaml = "timer:\n  initial_duration_ms: 4000\n";
        let config = BoilConfig::parse(yaml);
        assert!(config.is_ok());
        let config = config.ok().unwrap_or_default();

        assert_eq!(config.timer.initial_duration(), Duration::from_secs(4));
        // Everything else uses defaults
        assert_eq!(config.timer.tick_interval_ms, 40);
        assert_eq!(config.timer.broadcast_capacity, 64);
    }

    #[test]
    fn parse_empty_yaml() {
        assert!(BoilConfig::parse("").is_ok());
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let result = BoilConfig::parse("timer:\n  tick_interval_ms: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn zero_broadcast_capacity_is_rejected() {
        let result = BoilConfig::parse("timer:\n  broadcast_capacity: 0\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn excessive_precision_is_rejected() {
        let result = BoilConfig::parse("session:\n  precision: 9\n");
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let result = BoilConfig::parse("timer: [unterminated");
        assert!(matches!(result, Err(ConfigError::Yaml { .. })));
    }

    #[test]
    fn load_project_config_file() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("boil-config.yaml");
        if path.exists() {
            let config = BoilConfig::from_file(&path);
            assert!(config.is_ok(), "Failed to load project config: {config:?}");
        }
    }
}
