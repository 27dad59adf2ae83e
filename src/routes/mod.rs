pub mod analysis;
pub mod health;
pub mod metrics;
pub mod webhook;

use axum::extract::DefaultBodyLimit;
use axum::response::Html;
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;

/// Build the application router.
///
/// `max_upload_bytes` bounds every request body; axum's own 2 MB default
/// for extractors is lifted to the same value so contract uploads fit.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        // Static UI (embedded at compile time)
        .route("/", get(|| async { Html(include_str!("../../static/index.html")) }))
        .route("/health", get(health::health_check))
        .route(
            "/api/analysis/callback",
            post(analysis::submit_with_callback),
        )
        .route(
            "/api/contracts/analyze",
            post(analysis::submit_with_criteria),
        )
        .route(
            "/api/webhook/updates",
            get(webhook::stream_updates).post(webhook::receive_notification),
        )
        .route("/api/webhook/n8n", post(webhook::receive_notification))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        // SSE responses are excluded by the default compression predicate
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(RequestBodyLimitLayer::new(max_upload_bytes))
}
