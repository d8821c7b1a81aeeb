//! Monitor state and reducer.
//!
//! Every mutation goes through [`MonitorState::apply`]: user actions, timer
//! ticks and probe settlements arrive as [`Action`]s, one at a time, and the
//! reducer answers with the [`Effect`]s the actor must carry out. The reducer
//! itself never performs I/O, which keeps the polling rules testable without
//! a runtime.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::export::{CsvExport, render_csv};
use crate::monitor::MonitorError;
use crate::monitor::log_store::LogStore;
use crate::monitor::types::{EntryId, LogEntry, Phase, Settings, SettingsPatch, TimeMode};
use crate::probe::ProbeOutcome;

/// Input to the reducer.
#[derive(Debug, Clone)]
pub enum Action {
    /// Begin polling, optionally replacing settings first.
    Start(SettingsPatch),
    /// Stop scheduling new cycles.
    Stop,
    /// Empty the log.
    Clear,
    /// Change settings while idle.
    Configure(SettingsPatch),
    /// Interval timer fired.
    Tick,
    /// A probe finished.
    Settle {
        id: EntryId,
        outcome: ProbeOutcome,
        at: DateTime<Utc>,
    },
}

/// One probe to launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeRequest {
    /// Entry the result settles.
    pub id: EntryId,
    /// Target to probe.
    pub target: String,
}

/// Side effect requested by the reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Spawn one probe task per request.
    Launch(Vec<ProbeRequest>),
    /// Start the repeating cycle timer.
    ArmTimer(Duration),
    /// Stop the cycle timer.
    DisarmTimer,
}

/// Point-in-time view of the monitor.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub phase: Phase,
    pub settings: Settings,
    /// Cycles fired since the last start.
    pub cycles: u64,
    /// Entries still waiting on their probe.
    pub pending: usize,
    /// Entries, newest first.
    pub entries: Vec<LogEntry>,
}

impl Snapshot {
    /// Whether polling is active.
    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    /// Targets, interval and time mode are editable only while idle.
    pub fn can_configure(&self) -> bool {
        !self.is_running()
    }

    /// Clear needs an idle monitor and a non-empty log.
    pub fn can_clear(&self) -> bool {
        !self.is_running() && !self.entries.is_empty()
    }

    /// Export needs a non-empty log.
    pub fn can_export(&self) -> bool {
        !self.entries.is_empty()
    }
}

/// Complete monitor state, owned by the actor.
#[derive(Debug, Clone)]
pub struct MonitorState {
    phase: Phase,
    settings: Settings,
    log: LogStore,
    cycles: u64,
}

impl MonitorState {
    /// Create an idle state with the given settings.
    pub fn new(settings: Settings) -> Self {
        Self::with_log(settings, LogStore::new())
    }

    /// Create an idle state with a custom log store.
    pub fn with_log(settings: Settings, log: LogStore) -> Self {
        Self {
            phase: Phase::Idle,
            settings: settings.normalized(),
            log,
            cycles: 0,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn log(&self) -> &LogStore {
        &self.log
    }

    /// Apply one action.
    ///
    /// # Errors
    /// Validation and phase errors leave the state exactly as it was.
    pub fn apply(
        &mut self,
        action: Action,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, MonitorError> {
        match action {
            Action::Start(patch) => self.start(&patch, now),
            Action::Stop => Ok(self.stop()),
            Action::Clear => self.clear().map(|()| Vec::new()),
            Action::Configure(patch) => self.configure(&patch).map(|()| Vec::new()),
            Action::Tick => Ok(self.tick(now)),
            Action::Settle { id, outcome, at } => {
                self.settle(&id, outcome, at);
                Ok(Vec::new())
            }
        }
    }

    /// Current view of the monitor.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            phase: self.phase,
            settings: self.settings.clone(),
            cycles: self.cycles,
            pending: self.log.pending_count(),
            entries: self.log.to_vec(),
        }
    }

    /// Render the log as CSV, oldest entry first.
    ///
    /// `mode` defaults to the configured time mode.
    ///
    /// # Errors
    /// Returns `MonitorError::NoLogs` when the log is empty.
    pub fn export(
        &self,
        mode: Option<TimeMode>,
        now: DateTime<Utc>,
    ) -> Result<CsvExport, MonitorError> {
        if self.log.is_empty() {
            return Err(MonitorError::NoLogs);
        }
        let mode = mode.unwrap_or(self.settings.time_mode);
        Ok(CsvExport::new(
            render_csv(self.log.iter_chronological(), mode),
            now.date_naive(),
        ))
    }

    // --- Transitions ---

    fn start(
        &mut self,
        patch: &SettingsPatch,
        now: DateTime<Utc>,
    ) -> Result<Vec<Effect>, MonitorError> {
        if self.phase == Phase::Running {
            return Err(MonitorError::Running("start pinging"));
        }

        let settings = self.settings.merged(patch);
        if settings.targets.is_empty() {
            return Err(MonitorError::EmptyTargets);
        }

        self.settings = settings;
        self.log.clear();
        self.cycles = 0;
        self.phase = Phase::Running;

        tracing::info!(
            targets = self.settings.targets.len(),
            interval = ?self.settings.interval,
            "Pinging started"
        );

        let requests = self.run_cycle(now);
        Ok(vec![
            Effect::Launch(requests),
            Effect::ArmTimer(self.settings.interval),
        ])
    }

    fn stop(&mut self) -> Vec<Effect> {
        if self.phase == Phase::Idle {
            return Vec::new();
        }
        self.phase = Phase::Idle;
        tracing::info!(
            cycles = self.cycles,
            pending = self.log.pending_count(),
            "Pinging stopped"
        );
        vec![Effect::DisarmTimer]
    }

    fn clear(&mut self) -> Result<(), MonitorError> {
        if self.phase == Phase::Running {
            return Err(MonitorError::Running("clear logs"));
        }
        if self.log.is_empty() {
            return Err(MonitorError::NothingToClear);
        }
        let removed = self.log.len();
        self.log.clear();
        tracing::info!(removed, "Logs cleared");
        Ok(())
    }

    fn configure(&mut self, patch: &SettingsPatch) -> Result<(), MonitorError> {
        if self.phase == Phase::Running {
            return Err(MonitorError::Running("change settings"));
        }
        if patch.is_empty() {
            return Ok(());
        }
        self.settings = self.settings.merged(patch);
        tracing::debug!(settings = ?self.settings, "Settings updated");
        Ok(())
    }

    fn tick(&mut self, now: DateTime<Utc>) -> Vec<Effect> {
        if self.phase == Phase::Idle {
            tracing::debug!("Ignoring timer tick while idle");
            return Vec::new();
        }
        vec![Effect::Launch(self.run_cycle(now))]
    }

    fn settle(&mut self, id: &EntryId, outcome: ProbeOutcome, at: DateTime<Utc>) {
        if !self.log.settle(id, outcome, at) {
            tracing::debug!(id = %id, "Dropping settlement for unknown or settled entry");
        }
    }

    /// Register one pending entry per target and return the probes to run.
    fn run_cycle(&mut self, now: DateTime<Utc>) -> Vec<ProbeRequest> {
        self.cycles += 1;
        let mut requests = Vec::with_capacity(self.settings.targets.len());
        let mut dropped = 0;

        for target in &self.settings.targets {
            let entry = LogEntry::pending(target.clone(), now);
            requests.push(ProbeRequest {
                id: entry.id,
                target: target.clone(),
            });
            dropped += self.log.push(entry);
        }

        tracing::debug!(
            cycle = self.cycles,
            probes = requests.len(),
            dropped,
            entries = self.log.len(),
            capacity = self.log.capacity(),
            "Cycle registered"
        );
        requests
    }
}

impl Default for MonitorState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}
