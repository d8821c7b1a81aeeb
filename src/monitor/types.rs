//! Core data types for the monitor.
//!
//! - [`LogEntry`]: One probe attempt against one target
//! - [`ProbeStatus`]: Tri-state outcome of a log entry
//! - [`TimeMode`]: How timestamps are rendered (local zone or UTC)
//! - [`Settings`] / [`SettingsPatch`]: Targets, interval and time mode

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use uuid::Uuid;

use crate::probe::ProbeOutcome;

/// Maximum number of entries kept in the log.
pub const MAX_LOG_ENTRIES: usize = 200;

/// Default poll interval (5 seconds).
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Minimum poll interval (1 second).
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Maximum poll interval (24 hours).
pub const MAX_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Targets polled when none are configured.
pub const DEFAULT_TARGETS: [&str; 3] = [
    "https://www.google.com",
    "https://www.github.com",
    "https://www.cloudflare.com",
];

/// Clamp a poll interval to whole seconds within
/// [`MIN_INTERVAL`]..=[`MAX_INTERVAL`].
pub fn clamp_interval(interval: Duration) -> Duration {
    let whole = Duration::from_secs(interval.as_secs());
    if whole < MIN_INTERVAL {
        tracing::warn!(
            requested = ?interval,
            min_interval = ?MIN_INTERVAL,
            "Interval is less than minimum allowed. Using minimum interval."
        );
        MIN_INTERVAL
    } else if whole > MAX_INTERVAL {
        tracing::warn!(
            requested = ?interval,
            max_interval = ?MAX_INTERVAL,
            "Interval exceeds maximum allowed. Using maximum interval."
        );
        MAX_INTERVAL
    } else {
        whole
    }
}

/// Trim every target and drop blank ones, keeping order and duplicates.
pub fn normalize_targets<I, S>(targets: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    targets
        .into_iter()
        .map(|t| t.as_ref().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Unique identifier of one probe attempt.
///
/// Random per attempt, so duplicate targets within one cycle and the same
/// target across cycles never share an id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(Uuid);

impl EntryId {
    /// Generate a fresh id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Tri-state status of a log entry.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display, AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum ProbeStatus {
    /// Probe issued, not yet settled.
    Pending,
    /// Target reachable.
    Success,
    /// Target unreachable.
    Failure,
}

impl ProbeStatus {
    /// Whether the entry has settled.
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// One probe attempt against one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Unique per attempt.
    pub id: EntryId,
    /// Server string that was probed.
    pub target: String,
    /// Creation time while pending, settlement time once final.
    pub timestamp: DateTime<Utc>,
    /// Current status.
    pub status: ProbeStatus,
    /// Elapsed time on success; `None` while pending or on failure.
    pub latency_ms: Option<u64>,
}

impl LogEntry {
    /// Create a pending entry with a fresh id.
    pub fn pending(target: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(),
            target: target.into(),
            timestamp: at,
            status: ProbeStatus::Pending,
            latency_ms: None,
        }
    }

    /// Finalize this entry in place from a probe outcome.
    pub fn settle(&mut self, outcome: ProbeOutcome, at: DateTime<Utc>) {
        self.timestamp = at;
        match outcome {
            ProbeOutcome::Success { latency_ms } => {
                self.status = ProbeStatus::Success;
                self.latency_ms = Some(latency_ms);
            }
            ProbeOutcome::Failure => {
                self.status = ProbeStatus::Failure;
                self.latency_ms = None;
            }
        }
    }
}

/// Timestamp display mode.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimeMode {
    /// Host local time zone.
    #[default]
    Local,
    /// Coordinated Universal Time.
    Utc,
}

impl TimeMode {
    /// Upper-case label used in the export header.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Utc => "UTC",
        }
    }
}

/// Monitor phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Phase {
    /// Not polling; settings may change.
    #[default]
    Idle,
    /// Polling on a fixed interval.
    Running,
}

/// Polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Targets probed each cycle, in order.
    pub targets: Vec<String>,
    /// Time between cycles, whole seconds, at least [`MIN_INTERVAL`].
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
    /// Timestamp display mode.
    pub time_mode: TimeMode,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            targets: DEFAULT_TARGETS.iter().map(|t| t.to_string()).collect(),
            interval: DEFAULT_INTERVAL,
            time_mode: TimeMode::default(),
        }
    }
}

/// Partial settings update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SettingsPatch {
    #[serde(default)]
    pub targets: Option<Vec<String>>,
    #[serde(default, with = "humantime_serde")]
    pub interval: Option<Duration>,
    #[serde(default)]
    pub time_mode: Option<TimeMode>,
}

impl Settings {
    /// Settings with targets normalized and the interval clamped.
    pub fn normalized(self) -> Self {
        Self {
            targets: normalize_targets(&self.targets),
            interval: clamp_interval(self.interval),
            time_mode: self.time_mode,
        }
    }

    /// Settings with a patch applied on top.
    pub fn merged(&self, patch: &SettingsPatch) -> Self {
        Self {
            targets: patch
                .targets
                .as_ref()
                .map(normalize_targets)
                .unwrap_or_else(|| self.targets.clone()),
            interval: patch.interval.map(clamp_interval).unwrap_or(self.interval),
            time_mode: patch.time_mode.unwrap_or(self.time_mode),
        }
    }
}

impl SettingsPatch {
    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.targets.is_none() && self.interval.is_none() && self.time_mode.is_none()
    }

    /// Set the targets.
    pub fn with_targets<I, S>(mut self, targets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.targets = Some(targets.into_iter().map(Into::into).collect());
        self
    }

    /// Set the interval.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    /// Set the time mode.
    pub fn with_time_mode(mut self, mode: TimeMode) -> Self {
        self.time_mode = Some(mode);
        self
    }
}
