use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};

use crate::services::registry::ExecutionRegistry;

/// Evict executions nobody has written to for `ttl`.
///
/// Streams already evict on terminal status and on their own timeout;
/// this catches submissions that were never streamed at all.
pub async fn run(registry: Arc<ExecutionRegistry>, ttl: Duration, every: Duration) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        sweep(&registry, ttl);
    }
}

/// One sweep pass. Returns the number of evicted executions.
pub fn sweep(registry: &ExecutionRegistry, ttl: Duration) -> usize {
    let evicted = registry.evict_stale(ttl);
    if !evicted.is_empty() {
        metrics::counter!("executions_evicted_total", "reason" => "inactive")
            .increment(evicted.len() as u64);
        for execution_id in &evicted {
            tracing::info!(execution_id = %execution_id, "Evicted inactive execution");
        }
    }
    metrics::gauge!("executions_active").set(registry.len() as f64);
    evicted.len()
}
