use std::time::Duration;

use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode, Url};
use uuid::Uuid;

use crate::models::criteria::Criterion;
use crate::models::execution::ExecutionId;
use crate::models::submission::UploadedFile;

/// Everything the workflow engine receives for one execution.
#[derive(Debug, Clone)]
pub struct DispatchJob {
    pub execution_id: ExecutionId,
    pub file: UploadedFile,
    pub callback_url: String,
    pub criteria: Option<Vec<Criterion>>,
}

/// Client for the external workflow engine that runs document extraction
/// and LLM analysis.
pub struct WorkflowClient {
    http: Client,
    endpoint: Url,
}

impl WorkflowClient {
    /// `timeout` bounds the whole outbound request, including upload of the
    /// file and the engine's response.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, WorkflowError> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| WorkflowError::InvalidEndpoint(format!("{endpoint}: {e}")))?;

        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(WorkflowError::Http)?;

        Ok(Self { http, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Build the multipart POST for `job` without sending it.
    pub fn prepare(&self, job: &DispatchJob) -> Result<reqwest::Request, WorkflowError> {
        let file_part = Part::bytes(job.file.bytes.to_vec())
            .file_name(job.file.file_name.clone())
            .mime_str(&job.file.content_type)
            .or_else(|_| {
                Part::bytes(job.file.bytes.to_vec())
                    .file_name(job.file.file_name.clone())
                    .mime_str("application/octet-stream")
            })
            .map_err(WorkflowError::Http)?;

        let mut form = Form::new()
            .part("file", file_part)
            .text("executionId", job.execution_id.to_string())
            .text("callbackUrl", job.callback_url.clone())
            .text("request_id", Uuid::new_v4().to_string())
            .text("timestamp", Utc::now().to_rfc3339());

        if let Some(criteria) = &job.criteria {
            let encoded = serde_json::to_string(criteria).map_err(WorkflowError::Encode)?;
            form = form.text("criteria", encoded);
        }

        self.http
            .post(self.endpoint.clone())
            .multipart(form)
            .build()
            .map_err(WorkflowError::Http)
    }

    /// Send a prepared request. Only a 2xx answer counts as delivered.
    pub async fn send(&self, request: reqwest::Request) -> Result<StatusCode, WorkflowError> {
        let response = self.http.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                WorkflowError::Timeout
            } else {
                WorkflowError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(WorkflowError::UpstreamStatus(status));
        }
        Ok(status)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid workflow endpoint {0}")]
    InvalidEndpoint(String),

    #[error("Workflow request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to encode criteria: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Workflow engine did not respond in time")]
    Timeout,

    #[error("Workflow engine answered with status {0}")]
    UpstreamStatus(StatusCode),
}
