//! Probe Layer
//!
//! Best-effort reachability checks against server URLs. A probe never
//! returns an error for an unreachable target: unreachability is data,
//! reported as [`ProbeOutcome::Failure`].
//!
//! - [`Probe`]: Core trait for implementing reachability checks
//! - [`HttpProbe`]: One `HEAD` request per check, timed from issue to settlement

mod http;
mod traits;

pub use http::{DEFAULT_TIMEOUT, HttpProbe};
pub use traits::{Probe, ProbeError, ProbeOutcome};
