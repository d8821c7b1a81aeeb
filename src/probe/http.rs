//! HTTP reachability probe.
//!
//! Issues a single `HEAD` request and reports whether the network layer
//! accepted it. Status codes and bodies are never inspected.

use std::time::{Duration, Instant};

use reqwest::Client;
use tokio::time::timeout;

use crate::probe::{Probe, ProbeError, ProbeOutcome};

/// Default request timeout (10 seconds).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP `HEAD` probe.
///
/// Cloning is cheap; the underlying connection pool is shared.
#[derive(Clone)]
pub struct HttpProbe {
    client: Client,
    timeout: Duration,
}

impl HttpProbe {
    /// Create a probe with the given per-request timeout.
    ///
    /// # Errors
    /// Returns `ProbeError::Config` for a zero timeout and
    /// `ProbeError::Client` if the HTTP client cannot be built.
    pub fn new(request_timeout: Duration) -> Result<Self, ProbeError> {
        if request_timeout.is_zero() {
            return Err(ProbeError::Config("probe timeout must be non-zero".to_string()));
        }

        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ProbeError::Client(e.to_string()))?;

        Ok(Self {
            client,
            timeout: request_timeout,
        })
    }

    /// Configured per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl std::fmt::Debug for HttpProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProbe")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl Probe for HttpProbe {
    fn kind(&self) -> &str {
        "http"
    }

    async fn probe(&self, target: &str) -> ProbeOutcome {
        // Malformed URLs surface as a builder error from `send()`, which
        // lands in the failure arm below.
        let request = self.client.head(target);

        let start = Instant::now();
        let result = timeout(self.timeout, request.send()).await;
        let elapsed = start.elapsed();

        match result {
            Ok(Ok(response)) => {
                let latency_ms = elapsed.as_millis().min(u64::MAX as u128) as u64;
                tracing::debug!(
                    url = %target,
                    latency_ms,
                    status = response.status().as_u16(),
                    "Probe reached target"
                );
                ProbeOutcome::Success { latency_ms }
            }
            Ok(Err(e)) => {
                tracing::warn!(url = %target, error = %e, "Probe failed");
                ProbeOutcome::Failure
            }
            Err(_) => {
                tracing::warn!(
                    url = %target,
                    timeout_ms = self.timeout.as_millis(),
                    "Probe timed out"
                );
                ProbeOutcome::Failure
            }
        }
    }
}
