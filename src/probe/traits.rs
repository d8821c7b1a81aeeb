//! Core probe traits and types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that prevent a probe from being constructed.
///
/// These never occur while probing: a failed check is a
/// [`ProbeOutcome::Failure`], not an error.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// HTTP client could not be built.
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    /// Invalid probe configuration.
    #[error("config error: {0}")]
    Config(String),
}

/// Result of a single reachability check.
///
/// DNS failures, refused connections, TLS errors, malformed URLs and
/// timeouts all collapse into `Failure`. No richer signal is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ProbeOutcome {
    /// The network layer accepted the request; any HTTP status counts.
    Success {
        /// Elapsed time from issue to settlement, whole milliseconds.
        latency_ms: u64,
    },
    /// The request was rejected before a response arrived.
    Failure,
}

impl ProbeOutcome {
    /// Whether the target was reachable.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Measured latency, present only on success.
    pub fn latency_ms(&self) -> Option<u64> {
        match self {
            Self::Success { latency_ms } => Some(*latency_ms),
            Self::Failure => None,
        }
    }
}

/// Reachability check against a single target.
///
/// Implementations are shared across concurrently running probe tasks, so
/// they must be cheap to call concurrently and must always settle: a probe
/// that can hang needs its own timeout.
#[async_trait::async_trait]
pub trait Probe: Send + Sync + 'static {
    /// Short name used in logs (e.g., "http").
    fn kind(&self) -> &str;

    /// Check one target and classify the result.
    async fn probe(&self, target: &str) -> ProbeOutcome;
}
