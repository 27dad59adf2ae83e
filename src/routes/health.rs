use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::app_state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_executions: usize,
    pub workflow_endpoint: String,
}

/// GET /health — liveness plus the size of the in-memory registry.
///
/// The workflow engine is not contacted; its reachability only shows up per
/// execution as a dispatch error.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_executions: state.registry.len(),
        workflow_endpoint: state.workflow.endpoint().to_string(),
    })
}
