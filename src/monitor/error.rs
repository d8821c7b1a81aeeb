//! Monitor error types.
//!
//! Validation errors are user-facing and leave the monitor untouched;
//! [`MonitorError::ChannelClosed`] means the actor is gone.

use thiserror::Error;

/// Errors returned by monitor actions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// Start requested with no targets after normalization.
    #[error("Please enter at least one server URL.")]
    EmptyTargets,

    /// Export requested with an empty log.
    #[error("There are no logs to export.")]
    NoLogs,

    /// Clear requested with an empty log.
    #[error("There are no logs to clear.")]
    NothingToClear,

    /// Action not permitted while polling.
    #[error("cannot {0} while pinging is active")]
    Running(&'static str),

    /// The monitor actor has stopped.
    #[error("monitor actor is not running")]
    ChannelClosed,
}

impl MonitorError {
    /// Whether the error is a user-input validation failure.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::EmptyTargets | Self::NoLogs | Self::NothingToClear)
    }

    /// Whether the error is a conflict with the current phase.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Running(_))
    }
}
