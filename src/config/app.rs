//! Application configuration structures.

use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::monitor::{DEFAULT_INTERVAL, DEFAULT_TARGETS, Settings, TimeMode};
use crate::probe::DEFAULT_TIMEOUT;

use super::validation::ConfigError;

fn default_targets() -> Vec<String> {
    DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect()
}

fn default_interval() -> Duration {
    DEFAULT_INTERVAL
}

fn default_timeout() -> Duration {
    DEFAULT_TIMEOUT
}

// =============================================================================
// Server Configuration
// =============================================================================

/// Web server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address (default: "0.0.0.0").
    pub bind: String,

    /// Server port (default: 8080).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

// =============================================================================
// Monitor Configuration
// =============================================================================

/// Polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Target URLs probed each cycle.
    #[serde(default = "default_targets")]
    pub targets: Vec<String>,

    /// Poll interval (default: 5s, whole seconds, minimum 1s).
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    /// Per-probe timeout (default: 10s).
    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    /// Timestamp display mode.
    #[serde(default)]
    pub time_mode: TimeMode,

    /// Start polling at boot.
    #[serde(default)]
    pub autostart: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            targets: default_targets(),
            interval: DEFAULT_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
            time_mode: TimeMode::default(),
            autostart: false,
        }
    }
}

impl MonitorConfig {
    /// Initial monitor settings, normalized.
    pub fn to_settings(&self) -> Settings {
        Settings {
            targets: self.targets.clone(),
            interval: self.interval,
            time_mode: self.time_mode,
        }
        .normalized()
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Web server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Monitor configuration.
    #[serde(default)]
    pub monitor: MonitorConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate server bind address
        self.server.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "invalid server bind address: '{}'",
                self.server.bind
            ))
        })?;

        // Validate server port
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }

        if self.monitor.timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "monitor timeout must be positive".to_string(),
            ));
        }

        for target in &self.monitor.targets {
            let target = target.trim();
            if target.is_empty() {
                continue;
            }
            url::Url::parse(target).map_err(|e| {
                ConfigError::ValidationError(format!("invalid target URL '{}': {}", target, e))
            })?;
        }

        Ok(())
    }
}
