//! Configuration validation utilities.

use std::time::Duration;

use thiserror::Error;

use crate::monitor::{MAX_INTERVAL, MIN_INTERVAL, normalize_targets};

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Split newline-separated text into targets.
///
/// Lines are trimmed, blank lines dropped; order and duplicates are kept.
///
/// ```
/// use pingboard::config::parse_targets;
///
/// assert_eq!(
///     parse_targets(" https://a.test \n\n https://b.test "),
///     vec!["https://a.test", "https://b.test"]
/// );
/// ```
pub fn parse_targets(text: &str) -> Vec<String> {
    normalize_targets(text.lines())
}

/// Coerce a user-entered interval to whole seconds, between 1 second and
/// [`MAX_INTERVAL`] (24 hours).
///
/// Fractions are truncated; anything unparseable becomes the minimum and
/// anything too large becomes the maximum.
pub fn coerce_interval_secs(text: &str) -> Duration {
    let text = text.trim();
    let secs = text
        .parse::<i64>()
        .ok()
        .or_else(|| {
            text.parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(|v| v.trunc() as i64)
        })
        .unwrap_or(0);

    let min = MIN_INTERVAL.as_secs() as i64;
    if secs < min {
        tracing::warn!(input = text, "Interval below minimum, using {}s", min);
        return MIN_INTERVAL;
    }
    let max = MAX_INTERVAL.as_secs() as i64;
    if secs > max {
        tracing::warn!(input = text, "Interval above maximum, using {}s", max);
        return MAX_INTERVAL;
    }
    Duration::from_secs(secs as u64)
}
