use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};

use crate::models::execution::{ExecutionId, ExecutionStatus, StatusRecord};
use crate::services::registry::ExecutionRegistry;

/// Buffered records per open stream. The relay only ever needs the most
/// recent one, so this stays small.
const CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelaySettings {
    /// Registry poll cadence.
    pub poll_interval: Duration,
    /// Hard upper bound on the lifetime of one stream.
    pub stream_timeout: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            stream_timeout: Duration::from_secs(3600),
        }
    }
}

/// Why a relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamClose {
    /// A terminal record was delivered; the registry entry was evicted.
    Final(ExecutionStatus),
    /// The safety-valve timer fired; the registry entry was evicted.
    Timeout,
    /// The subscriber went away; the registry entry is left in place.
    ClientDisconnected,
}

impl StreamClose {
    fn as_label(self) -> &'static str {
        match self {
            StreamClose::Final(_) => "final",
            StreamClose::Timeout => "timeout",
            StreamClose::ClientDisconnected => "client_disconnected",
        }
    }
}

/// An open relay: records arrive on `updates` until the task closes it.
pub struct Relay {
    pub updates: mpsc::Receiver<StatusRecord>,
    pub task: JoinHandle<StreamClose>,
}

/// Start relaying registry state for `execution_id`.
///
/// The id does not have to exist yet; the relay simply waits for the
/// first record. Dropping `updates` closes the relay without touching the
/// registry.
pub fn open(
    registry: Arc<ExecutionRegistry>,
    execution_id: ExecutionId,
    settings: RelaySettings,
) -> Relay {
    let (tx, updates) = mpsc::channel(CHANNEL_CAPACITY);
    let task = tokio::spawn(async move {
        metrics::gauge!("execution_streams_open").increment(1.0);
        let close = run(&registry, &execution_id, settings, tx).await;
        metrics::gauge!("execution_streams_open").decrement(1.0);

        match close {
            StreamClose::ClientDisconnected => {}
            _ => {
                metrics::counter!("executions_evicted_total", "reason" => close.as_label())
                    .increment(1);
            }
        }
        tracing::info!(
            execution_id = %execution_id,
            reason = close.as_label(),
            "Update stream closed"
        );
        close
    });

    Relay { updates, task }
}

async fn run(
    registry: &ExecutionRegistry,
    execution_id: &ExecutionId,
    settings: RelaySettings,
    tx: mpsc::Sender<StatusRecord>,
) -> StreamClose {
    let deadline = sleep(settings.stream_timeout);
    tokio::pin!(deadline);

    let mut ticker = interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut last_sent: Option<u64> = None;

    loop {
        tokio::select! {
            biased;

            _ = tx.closed() => return StreamClose::ClientDisconnected,

            _ = &mut deadline => return expire(registry, execution_id, settings),

            _ = ticker.tick() => {
                let Some(snapshot) = registry.get(execution_id) else {
                    continue;
                };
                if last_sent == Some(snapshot.revision) {
                    continue;
                }
                last_sent = Some(snapshot.revision);

                let status = snapshot.record.status;
                // A subscriber that stops reading fills the channel; the
                // deadline still applies while the send is pending.
                let sent = tokio::select! {
                    biased;
                    _ = &mut deadline => return expire(registry, execution_id, settings),
                    sent = tx.send(snapshot.record) => sent,
                };
                if sent.is_err() {
                    return StreamClose::ClientDisconnected;
                }
                if status.is_terminal() {
                    registry.evict(execution_id);
                    return StreamClose::Final(status);
                }
            }
        }
    }
}

fn expire(
    registry: &ExecutionRegistry,
    execution_id: &ExecutionId,
    settings: RelaySettings,
) -> StreamClose {
    registry.evict(execution_id);
    tracing::warn!(
        execution_id = %execution_id,
        timeout_secs = settings.stream_timeout.as_secs(),
        "Execution never reached a terminal status, evicting"
    );
    StreamClose::Timeout
}
