//! Pingboard - Server Ping Dashboard
//!
//! Periodically probes a list of server URLs with HTTP `HEAD`, keeps the
//! results in a bounded newest-first log and serves them as a live-updating
//! table with CSV export. It can be used as a library, or run as a
//! standalone binary with the `pingboard` executable.
//!
//! # Architecture
//!
//! - **Probe**: One best-effort reachability check per target
//! - **Monitor**: Single-owner actor running the poll cycle, timer and log
//! - **Export**: CSV rendering of the log
//! - **Server**: HTMX dashboard and JSON API
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use pingboard::{HttpProbe, MonitorBuilder, SettingsPatch};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let probe = HttpProbe::new(Duration::from_secs(10))?;
//!     let handles = MonitorBuilder::new(probe).build();
//!
//!     handles
//!         .monitor
//!         .start(SettingsPatch::default().with_targets(["https://www.rust-lang.org"]))
//!         .await?;
//!     tokio::time::sleep(Duration::from_secs(3)).await;
//!
//!     let export = handles.monitor.export(None).await?;
//!     println!("{}", export.content);
//!
//!     handles.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod export;
pub mod monitor;
pub mod probe;
pub mod server;

pub use export::CsvExport;
pub use monitor::{
    LogEntry, MonitorBuilder, MonitorError, MonitorHandle, MonitorHandles, ProbeStatus, Settings,
    SettingsPatch, Snapshot, TimeMode,
};
pub use probe::{HttpProbe, Probe, ProbeOutcome};
