//! Configuration module for the pingboard application.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Server settings (port, bind address)
//! - Monitor settings (targets, interval, timeout, time mode, autostart)

mod app;
mod validation;

pub use app::{AppConfig, MonitorConfig, ServerConfig};
pub use validation::{ConfigError, coerce_interval_secs, parse_targets};
