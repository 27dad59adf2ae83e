use std::time::Duration;

use serde::Deserialize;

use crate::services::relay::RelaySettings;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000").
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Webhook of the external workflow engine that runs extraction and analysis
    #[serde(default = "default_workflow_url")]
    pub workflow_url: String,

    /// Callback handed to the engine when the browser does not supply one
    #[serde(default = "default_callback_url")]
    pub callback_url: String,

    /// Upper bound on one outbound dispatch; extraction can take minutes
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Registry poll cadence of an open update stream
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Maximum lifetime of one update stream
    #[serde(default = "default_stream_timeout_secs")]
    pub stream_timeout_secs: u64,

    /// Executions not written to for this long are evicted by the sweeper
    #[serde(default = "default_execution_ttl_secs")]
    pub execution_ttl_secs: u64,

    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Request body limit for uploads
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_workflow_url() -> String {
    "http://n8n:5678/webhook-test/upload-pdf".to_string()
}

fn default_callback_url() -> String {
    "http://frontend:3000/api/webhook/updates".to_string()
}

fn default_dispatch_timeout_secs() -> u64 {
    600
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_stream_timeout_secs() -> u64 {
    3600
}

fn default_execution_ttl_secs() -> u64 {
    3600
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            workflow_url: default_workflow_url(),
            callback_url: default_callback_url(),
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            stream_timeout_secs: default_stream_timeout_secs(),
            execution_ttl_secs: default_execution_ttl_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn execution_ttl(&self) -> Duration {
        Duration::from_secs(self.execution_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn relay_settings(&self) -> RelaySettings {
        RelaySettings {
            poll_interval: Duration::from_millis(self.poll_interval_ms.max(1)),
            stream_timeout: Duration::from_secs(self.stream_timeout_secs),
        }
    }
}
