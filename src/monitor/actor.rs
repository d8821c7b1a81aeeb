//! Monitor actor: owns the state, the cycle timer and probe fan-out.
//!
//! Single-owner pattern: one Tokio task owns [`MonitorState`] and applies
//! commands from an MPSC channel one at a time. Probe tasks report back on
//! the same channel, so user actions, timer ticks and settlements are
//! serialized through one reducer.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};

use crate::export::CsvExport;
use crate::monitor::MonitorError;
use crate::monitor::state::{Action, Effect, MonitorState, ProbeRequest, Snapshot};
use crate::monitor::types::{MAX_INTERVAL, TimeMode};
use crate::probe::Probe;

// =============================================================================
// Commands
// =============================================================================

/// Reply channel for actions.
pub(crate) type ActionReply = oneshot::Sender<Result<(), MonitorError>>;

/// Commands sent to the monitor actor.
#[derive(Debug)]
pub(crate) enum Command {
    /// Run an action through the reducer. Settlements carry no reply.
    Apply {
        action: Action,
        reply: Option<ActionReply>,
    },
    /// Read the current state.
    Snapshot { reply: oneshot::Sender<Snapshot> },
    /// Render the log as CSV.
    Export {
        mode: Option<TimeMode>,
        reply: oneshot::Sender<Result<CsvExport, MonitorError>>,
    },
    /// Graceful shutdown. In-flight probes are abandoned.
    Shutdown,
}

// =============================================================================
// Actor
// =============================================================================

pub(crate) struct MonitorActor {
    state: MonitorState,
    probe: Arc<dyn Probe>,
    rx: mpsc::Receiver<Command>,
    // Weak so the actor exits once every handle and probe task is gone.
    tx: mpsc::WeakSender<Command>,
    ticker: Option<Interval>,
}

impl MonitorActor {
    /// Spawn the actor task.
    ///
    /// Returns the task handle and the command sender.
    pub(crate) fn spawn(
        state: MonitorState,
        probe: Arc<dyn Probe>,
        channel_capacity: usize,
    ) -> (JoinHandle<()>, mpsc::Sender<Command>) {
        let (tx, rx) = mpsc::channel(channel_capacity.max(1));
        let actor = MonitorActor {
            state,
            probe,
            rx,
            tx: tx.downgrade(),
            ticker: None,
        };
        let handle = tokio::spawn(actor.run());
        (handle, tx)
    }

    async fn run(mut self) {
        tracing::info!(probe = self.probe.kind(), "MonitorActor started");

        loop {
            tokio::select! {
                cmd = self.rx.recv() => match cmd {
                    Some(Command::Shutdown) => {
                        tracing::info!("MonitorActor shutting down");
                        break;
                    }
                    Some(cmd) => self.handle_command(cmd),
                    None => {
                        tracing::warn!("Channel disconnected, shutting down");
                        break;
                    }
                },
                () = next_tick(&mut self.ticker) => self.dispatch(Action::Tick, None),
            }
        }

        tracing::info!("MonitorActor stopped");
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::Apply { action, reply } => self.dispatch(action, reply),
            Command::Snapshot { reply } => {
                let _ = reply.send(self.state.snapshot());
            }
            Command::Export { mode, reply } => {
                let _ = reply.send(self.state.export(mode, Utc::now()));
            }
            Command::Shutdown => {}
        }
    }

    fn dispatch(&mut self, action: Action, reply: Option<ActionReply>) {
        let result = match self.state.apply(action, Utc::now()) {
            Ok(effects) => {
                for effect in effects {
                    self.execute(effect);
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "Action rejected");
                Err(e)
            }
        };

        if let Some(reply) = reply {
            let _ = reply.send(result);
        }
    }

    fn execute(&mut self, effect: Effect) {
        match effect {
            Effect::Launch(requests) => self.launch(requests),
            Effect::ArmTimer(period) => self.ticker = Some(cycle_timer(period)),
            Effect::DisarmTimer => self.ticker = None,
        }
    }

    /// Spawn one task per probe; each reports back with a settlement.
    fn launch(&self, requests: Vec<ProbeRequest>) {
        let Some(tx) = self.tx.upgrade() else {
            tracing::warn!(probes = requests.len(), "No senders left, skipping cycle");
            return;
        };

        for ProbeRequest { id, target } in requests {
            let probe = Arc::clone(&self.probe);
            let tx = tx.clone();
            tokio::spawn(async move {
                let outcome = probe.probe(&target).await;
                let settle = Command::Apply {
                    action: Action::Settle {
                        id,
                        outcome,
                        at: Utc::now(),
                    },
                    reply: None,
                };
                if tx.send(settle).await.is_err() {
                    tracing::debug!(url = %target, "Monitor gone before probe settled");
                }
            });
        }
    }
}

/// Fixed-period timer whose first tick is one period from now.
///
/// The immediate cycle on start is run by the reducer, not the timer.
/// Periods are capped at [`MAX_INTERVAL`] so the deadline cannot overflow.
fn cycle_timer(period: Duration) -> Interval {
    let period = period.min(MAX_INTERVAL);
    let now = Instant::now();
    let start = now.checked_add(period).unwrap_or(now);
    let mut interval = tokio::time::interval_at(start, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    interval
}

/// Wait for the next tick, or forever when no timer is armed.
async fn next_tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cycle_timer_caps_period() {
        let timer = cycle_timer(Duration::MAX);
        assert_eq!(timer.period(), MAX_INTERVAL);

        let timer = cycle_timer(Duration::from_secs(3));
        assert_eq!(timer.period(), Duration::from_secs(3));
    }
}
