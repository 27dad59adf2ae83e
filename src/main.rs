use axum::routing::get;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use contract_analyzer::app_state::AppState;
use contract_analyzer::config::AppConfig;
use contract_analyzer::routes::{self, metrics::MetricsState};
use contract_analyzer::services::{reaper, registry::ExecutionRegistry, workflow::WorkflowClient};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing contract-analyzer server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    // Register application metrics
    metrics::describe_counter!(
        "executions_submitted_total",
        "Total contract analyses submitted"
    );
    metrics::describe_counter!(
        "workflow_dispatch_total",
        "Outbound workflow dispatches by outcome"
    );
    metrics::describe_histogram!(
        "workflow_dispatch_seconds",
        "Time until the workflow engine answered a dispatch"
    );
    metrics::describe_counter!(
        "notifications_received_total",
        "Progress notifications applied to the registry"
    );
    metrics::describe_counter!(
        "notifications_rejected_total",
        "Progress notifications rejected as malformed or unknown"
    );
    metrics::describe_counter!(
        "executions_evicted_total",
        "Registry evictions by reason"
    );
    metrics::describe_gauge!(
        "execution_streams_open",
        "Currently open live update streams"
    );
    metrics::describe_gauge!(
        "executions_active",
        "Executions currently held in memory"
    );

    // Initialize workflow engine client
    tracing::info!(workflow_url = %config.workflow_url, "Initializing workflow client");
    let workflow = WorkflowClient::new(&config.workflow_url, config.dispatch_timeout())
        .expect("Failed to initialize workflow client");

    let registry = Arc::new(ExecutionRegistry::new());

    // Evict executions that never report back and are never streamed
    tokio::spawn(reaper::run(
        registry.clone(),
        config.execution_ttl(),
        config.sweep_interval(),
    ));

    // Create shared application state
    let state = AppState::new(&config, registry.clone(), workflow);

    let metrics_state = MetricsState {
        handle: prometheus_handle,
        registry,
    };

    let app = routes::router(state, config.max_upload_bytes)
        // Prometheus metrics endpoint (separate state)
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(metrics_state),
        );

    tracing::info!("Starting contract-analyzer on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
