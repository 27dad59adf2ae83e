use std::sync::Arc;

use crate::config::AppConfig;
use crate::services::registry::ExecutionRegistry;
use crate::services::relay::RelaySettings;
use crate::services::workflow::WorkflowClient;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ExecutionRegistry>,
    pub workflow: Arc<WorkflowClient>,
    pub relay: RelaySettings,
    /// Callback handed to the engine when a submission names none.
    pub callback_url: Arc<str>,
}

impl AppState {
    pub fn new(config: &AppConfig, registry: Arc<ExecutionRegistry>, workflow: WorkflowClient) -> Self {
        Self {
            registry,
            workflow: Arc::new(workflow),
            relay: config.relay_settings(),
            callback_url: Arc::from(config.callback_url.as_str()),
        }
    }
}
