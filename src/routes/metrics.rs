use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::services::registry::ExecutionRegistry;

#[derive(Clone)]
pub struct MetricsState {
    pub handle: Arc<PrometheusHandle>,
    pub registry: Arc<ExecutionRegistry>,
}

/// GET /metrics — Prometheus text exposition.
///
/// `executions_active` is refreshed on every scrape so it does not lag
/// behind the sweeper interval.
pub async fn prometheus_metrics(State(state): State<MetricsState>) -> impl IntoResponse {
    metrics::gauge!("executions_active").set(state.registry.len() as f64);
    state.handle.render()
}
