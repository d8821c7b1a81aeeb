//! Monitor builder and handles.
//!
//! [`MonitorBuilder`] spawns the actor; [`MonitorHandle`] is the cloneable
//! facade used by the web layer, and [`MonitorHandles`] keeps the actor task
//! for graceful shutdown.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::export::CsvExport;
use crate::monitor::MonitorError;
use crate::monitor::actor::{Command, MonitorActor};
use crate::monitor::log_store::LogStore;
use crate::monitor::state::{Action, MonitorState, Snapshot};
use crate::monitor::types::{MAX_LOG_ENTRIES, Settings, SettingsPatch, TimeMode};
use crate::probe::Probe;

/// Default channel capacity for actor commands.
const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Default timeout for graceful shutdown (5 seconds).
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for the monitor actor.
pub struct MonitorBuilder {
    probe: Arc<dyn Probe>,
    settings: Settings,
    channel_capacity: usize,
    log_capacity: usize,
}

impl MonitorBuilder {
    /// Create a builder around a probe implementation.
    pub fn new(probe: impl Probe) -> Self {
        Self::with_shared_probe(Arc::new(probe))
    }

    /// Create a builder around an already shared probe.
    pub fn with_shared_probe(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            settings: Settings::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            log_capacity: MAX_LOG_ENTRIES,
        }
    }

    /// Set the initial settings.
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Set the channel capacity for actor commands.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the log bound. Defaults to [`MAX_LOG_ENTRIES`].
    pub fn log_capacity(mut self, capacity: usize) -> Self {
        self.log_capacity = capacity;
        self
    }

    /// Spawn the actor on the current Tokio runtime.
    pub fn build(self) -> MonitorHandles {
        let log = LogStore::with_capacity(self.log_capacity);
        let state = MonitorState::with_log(self.settings, log);
        let (actor_handle, tx) = MonitorActor::spawn(state, self.probe, self.channel_capacity);

        MonitorHandles {
            monitor: MonitorHandle { tx },
            actor_handle: Some(actor_handle),
        }
    }
}

/// Cloneable facade over the monitor actor.
#[derive(Clone)]
pub struct MonitorHandle {
    tx: mpsc::Sender<Command>,
}

impl std::fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorHandle").finish_non_exhaustive()
    }
}

impl MonitorHandle {
    /// Start polling, applying `patch` first.
    ///
    /// The first cycle's pending entries exist when this returns.
    pub async fn start(&self, patch: SettingsPatch) -> Result<(), MonitorError> {
        self.apply(Action::Start(patch)).await
    }

    /// Stop scheduling cycles. In-flight probes still settle.
    pub async fn stop(&self) -> Result<(), MonitorError> {
        self.apply(Action::Stop).await
    }

    /// Clear the log while idle.
    pub async fn clear(&self) -> Result<(), MonitorError> {
        self.apply(Action::Clear).await
    }

    /// Change settings while idle.
    pub async fn configure(&self, patch: SettingsPatch) -> Result<(), MonitorError> {
        self.apply(Action::Configure(patch)).await
    }

    /// Current state of the monitor.
    pub async fn snapshot(&self) -> Result<Snapshot, MonitorError> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    /// Render the log as CSV; `mode` defaults to the configured time mode.
    pub async fn export(&self, mode: Option<TimeMode>) -> Result<CsvExport, MonitorError> {
        self.request(|reply| Command::Export { mode, reply }).await?
    }

    async fn apply(&self, action: Action) -> Result<(), MonitorError> {
        self.request(|reply| Command::Apply {
            action,
            reply: Some(reply),
        })
        .await?
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, MonitorError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .await
            .map_err(|_| MonitorError::ChannelClosed)?;
        rx.await.map_err(|_| MonitorError::ChannelClosed)
    }

    fn request_shutdown(&self) -> Result<(), MonitorError> {
        self.tx
            .try_send(Command::Shutdown)
            .map_err(|_| MonitorError::ChannelClosed)
    }
}

/// Monitor facade plus the actor task.
pub struct MonitorHandles {
    /// Cloneable facade.
    pub monitor: MonitorHandle,
    actor_handle: Option<JoinHandle<()>>,
}

impl MonitorHandles {
    /// Gracefully shutdown with the default timeout.
    pub async fn shutdown(self) -> Result<(), MonitorError> {
        self.shutdown_with_timeout(DEFAULT_SHUTDOWN_TIMEOUT).await
    }

    /// Shutdown with a custom timeout.
    ///
    /// Polling is stopped first; probes still in flight are abandoned.
    pub async fn shutdown_with_timeout(mut self, timeout: Duration) -> Result<(), MonitorError> {
        if let Err(e) = self.monitor.stop().await {
            tracing::warn!(error = %e, "Failed to stop monitor before shutdown");
        }
        self.monitor.request_shutdown()?;

        if let Some(handle) = self.actor_handle.take() {
            match tokio::time::timeout(timeout, handle).await {
                Ok(Ok(())) => tracing::info!("Monitor shutdown complete"),
                Ok(Err(e)) => tracing::error!(error = %e, "Monitor actor task failed"),
                Err(_) => tracing::warn!("Monitor shutdown timed out"),
            }
        }
        Ok(())
    }
}

impl Drop for MonitorHandles {
    fn drop(&mut self) {
        if self.actor_handle.take().is_some() {
            let _ = self.monitor.request_shutdown();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::types::{MAX_INTERVAL, Phase, ProbeStatus};
    use crate::probe::ProbeOutcome;
    use tokio::sync::Semaphore;

    /// Succeeds for targets containing "ok", fails otherwise.
    struct InstantProbe;

    #[async_trait::async_trait]
    impl Probe for InstantProbe {
        fn kind(&self) -> &str {
            "instant"
        }

        async fn probe(&self, target: &str) -> ProbeOutcome {
            if target.contains("ok") {
                ProbeOutcome::Success { latency_ms: 5 }
            } else {
                ProbeOutcome::Failure
            }
        }
    }

    /// Blocks every probe until the test releases a permit.
    struct GatedProbe {
        gate: Arc<Semaphore>,
    }

    #[async_trait::async_trait]
    impl Probe for GatedProbe {
        fn kind(&self) -> &str {
            "gated"
        }

        async fn probe(&self, _target: &str) -> ProbeOutcome {
            if let Ok(permit) = self.gate.acquire().await {
                permit.forget();
            }
            ProbeOutcome::Success { latency_ms: 1 }
        }
    }

    fn settings(targets: &[&str]) -> Settings {
        Settings {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            interval: Duration::from_secs(1),
            time_mode: TimeMode::Utc,
        }
    }

    /// Let probe tasks run and their settlements reach the actor.
    async fn wait_for(monitor: &MonitorHandle, done: impl Fn(&Snapshot) -> bool) -> Snapshot {
        for _ in 0..200 {
            let snapshot = monitor.snapshot().await.unwrap();
            if done(&snapshot) {
                return snapshot;
            }
            tokio::task::yield_now().await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_start_registers_pending_before_settlement() {
        let gate = Arc::new(Semaphore::new(0));
        let handles = MonitorBuilder::new(GatedProbe { gate: Arc::clone(&gate) })
            .settings(settings(&["https://a.test", "https://b.test"]))
            .build();
        let monitor = handles.monitor.clone();

        monitor.start(SettingsPatch::default()).await.unwrap();
        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Running);
        assert_eq!(snapshot.entries.len(), 2);
        assert_eq!(snapshot.pending, 2);

        gate.add_permits(2);
        let snapshot = wait_for(&monitor, |s| s.pending == 0).await;
        assert_eq!(snapshot.entries.len(), 2);
        assert!(snapshot.entries.iter().all(|e| e.status == ProbeStatus::Success));

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_stop_lets_in_flight_probes_settle() {
        let gate = Arc::new(Semaphore::new(0));
        let handles = MonitorBuilder::new(GatedProbe { gate: Arc::clone(&gate) })
            .settings(settings(&["https://a.test"]))
            .build();
        let monitor = handles.monitor.clone();

        monitor.start(SettingsPatch::default()).await.unwrap();
        monitor.stop().await.unwrap();

        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.pending, 1);

        gate.add_permits(1);
        let snapshot = wait_for(&monitor, |s| s.pending == 0).await;
        assert_eq!(snapshot.entries.len(), 1);
        assert_eq!(snapshot.entries[0].status, ProbeStatus::Success);

        handles.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_adds_cycles_on_top() {
        let handles = MonitorBuilder::new(InstantProbe)
            .settings(settings(&["https://ok.test", "https://down.test"]))
            .build();
        let monitor = handles.monitor.clone();

        monitor.start(SettingsPatch::default()).await.unwrap();
        let snapshot = wait_for(&monitor, |s| s.pending == 0).await;
        assert_eq!(snapshot.entries.len(), 2);
        let ok = snapshot.entries.iter().find(|e| e.target == "https://ok.test").unwrap();
        assert_eq!(ok.status, ProbeStatus::Success);
        assert_eq!(ok.latency_ms, Some(5));
        let down = snapshot.entries.iter().find(|e| e.target == "https://down.test").unwrap();
        assert_eq!(down.status, ProbeStatus::Failure);
        assert_eq!(down.latency_ms, None);

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        let snapshot = wait_for(&monitor, |s| s.entries.len() == 4 && s.pending == 0).await;
        assert_eq!(snapshot.cycles, 2);
        let first_ids: Vec<_> = snapshot.entries[2..].iter().map(|e| e.id).collect();
        assert!(!first_ids.contains(&snapshot.entries[0].id));

        monitor.stop().await.unwrap();
        tokio::time::sleep(Duration::from_secs(3)).await;
        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.entries.len(), 4);

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_targets_rejected_without_mutation() {
        let handles = MonitorBuilder::new(InstantProbe)
            .settings(settings(&["https://ok.test"]))
            .build();
        let monitor = handles.monitor.clone();

        let err = monitor
            .start(SettingsPatch::default().with_targets([" ", ""]))
            .await
            .unwrap_err();
        assert_eq!(err, MonitorError::EmptyTargets);

        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.phase, Phase::Idle);
        assert_eq!(snapshot.settings.targets, vec!["https://ok.test"]);
        assert!(snapshot.entries.is_empty());

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_and_export_through_handle() {
        let handles = MonitorBuilder::new(InstantProbe)
            .settings(settings(&["https://ok.test"]))
            .build();
        let monitor = handles.monitor.clone();

        assert_eq!(monitor.export(None).await.unwrap_err(), MonitorError::NoLogs);

        monitor.start(SettingsPatch::default()).await.unwrap();
        assert!(monitor.clear().await.unwrap_err().is_conflict());

        monitor.stop().await.unwrap();
        wait_for(&monitor, |s| s.pending == 0).await;

        let export = monitor.export(Some(TimeMode::Utc)).await.unwrap();
        assert!(export.filename.starts_with("ping-logs-"));
        assert_eq!(export.content.lines().count(), 2);
        assert!(export.content.ends_with(",\"https://ok.test\",5,Success"));

        monitor.clear().await.unwrap();
        assert!(monitor.snapshot().await.unwrap().entries.is_empty());

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_start_with_huge_interval_keeps_actor_alive() {
        let handles = MonitorBuilder::new(InstantProbe)
            .settings(settings(&["https://ok.test"]))
            .build();
        let monitor = handles.monitor.clone();

        monitor
            .start(SettingsPatch::default().with_interval(Duration::MAX))
            .await
            .unwrap();
        let snapshot = wait_for(&monitor, |s| s.pending == 0).await;
        assert_eq!(snapshot.phase, Phase::Running);
        assert_eq!(snapshot.settings.interval, MAX_INTERVAL);
        assert_eq!(snapshot.entries.len(), 1);

        monitor.stop().await.unwrap();
        assert_eq!(monitor.snapshot().await.unwrap().phase, Phase::Idle);

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_builder_caps_huge_interval() {
        let mut initial = settings(&["https://ok.test"]);
        initial.interval = Duration::from_secs(u64::MAX);
        let handles = MonitorBuilder::new(InstantProbe).settings(initial).build();
        let monitor = handles.monitor.clone();

        monitor.start(SettingsPatch::default()).await.unwrap();
        let snapshot = monitor.snapshot().await.unwrap();
        assert_eq!(snapshot.settings.interval, MAX_INTERVAL);
        assert_eq!(snapshot.phase, Phase::Running);

        handles.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_handle_after_shutdown_reports_closed() {
        let handles = MonitorBuilder::new(InstantProbe).build();
        let monitor = handles.monitor.clone();
        handles.shutdown().await.unwrap();

        assert_eq!(
            monitor.snapshot().await.unwrap_err(),
            MonitorError::ChannelClosed
        );
    }

    #[tokio::test]
    async fn test_log_capacity_respected() {
        let handles = MonitorBuilder::new(InstantProbe)
            .settings(settings(&["https://ok.test", "https://ok.test", "https://ok.test"]))
            .log_capacity(2)
            .build();
        let monitor = handles.monitor.clone();

        monitor.start(SettingsPatch::default()).await.unwrap();
        let snapshot = wait_for(&monitor, |s| s.pending == 0).await;
        assert_eq!(snapshot.entries.len(), 2);

        handles.shutdown().await.unwrap();
    }
}
