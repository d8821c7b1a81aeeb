//! Monitor Layer
//!
//! Periodic reachability polling with a bounded, id-keyed result log:
//! - **Reducer**: [`MonitorState::apply`] turns actions into state changes and effects
//! - **Actor**: one Tokio task owns the state, the cycle timer and probe fan-out
//!
//! # Components
//!
//! - [`MonitorBuilder`] / [`MonitorHandles`]: Initialization and lifecycle management
//! - [`MonitorHandle`]: Cloneable facade for start/stop/clear/configure/export
//! - [`LogStore`]: Newest-first log capped at [`MAX_LOG_ENTRIES`]
//! - [`MonitorError`]: Validation and infrastructure errors

mod actor;
mod error;
mod handle;
pub mod log_store;
pub mod state;
mod types;

pub use error::MonitorError;
pub use handle::{DEFAULT_SHUTDOWN_TIMEOUT, MonitorBuilder, MonitorHandle, MonitorHandles};
pub use log_store::LogStore;
pub use state::{Action, Effect, MonitorState, ProbeRequest, Snapshot};
pub use types::{
    DEFAULT_INTERVAL, DEFAULT_TARGETS, EntryId, LogEntry, MAX_INTERVAL, MAX_LOG_ENTRIES,
    MIN_INTERVAL, Phase, ProbeStatus, Settings, SettingsPatch, TimeMode, clamp_interval,
    normalize_targets,
};
