//! Arena configuration.

use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Tunables for sessions and automated participants.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ArenaConfig {
    /// Display name given to injected automated participants.
    #[serde(default = "default_ai_name")]
    #[setters(into)]
    ai_name: String,

    /// Simulated thinking time before an automated move, in milliseconds.
    #[serde(default = "default_ai_delay_ms")]
    ai_delay_ms: u64,

    /// Optimistic commit attempts before giving up with contention.
    #[serde(default = "default_max_commit_attempts")]
    max_commit_attempts: u32,

    /// Period of the stalled-turn sweep, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    sweep_interval_secs: u64,

    /// Seed for the automated policy's random source.
    #[serde(default)]
    #[setters(strip_option)]
    ai_seed: Option<u64>,
}

fn default_ai_name() -> String {
    "AI Player".to_string()
}

fn default_ai_delay_ms() -> u64 {
    1000
}

fn default_max_commit_attempts() -> u32 {
    5
}

fn default_sweep_interval_secs() -> u64 {
    2
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            ai_name: default_ai_name(),
            ai_delay_ms: default_ai_delay_ms(),
            max_commit_attempts: default_max_commit_attempts(),
            sweep_interval_secs: default_sweep_interval_secs(),
            ai_seed: None,
        }
    }
}

impl ArenaConfig {
    /// Loads configuration from TOML file.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config = Self::from_toml(&content)?;
        info!(ai_delay_ms = config.ai_delay_ms, "Config loaded successfully");
        Ok(config)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        if config.max_commit_attempts == 0 {
            return Err(ConfigError::new(
                "max_commit_attempts must be at least 1".to_string(),
            ));
        }
        Ok(config)
    }

    /// Loads `path` if it exists, defaults otherwise.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            Self::from_file(path)
        } else {
            info!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Thinking delay as a [`Duration`].
    pub fn ai_delay(&self) -> Duration {
        Duration::from_millis(self.ai_delay_ms)
    }

    /// Sweep period as a [`Duration`], never below one second.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
