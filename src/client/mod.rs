//! Client side of the execution-update relay.
//!
//! [`AnalyzerClient`] submits contracts; [`subscriber::ExecutionSubscriber`]
//! follows the resulting live update stream. The static browser page does
//! the same with `fetch` and `EventSource`.

pub mod sse;
pub mod subscriber;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

use crate::models::criteria::Criterion;
use crate::models::execution::ExecutionId;
use crate::models::submission::SubmitResponse;

/// Client for the submission endpoints.
pub struct AnalyzerClient {
    http: reqwest::Client,
    base_url: String,
}

impl AnalyzerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Submit a contract together with its analysis criteria.
    pub async fn submit_contract(
        &self,
        file_name: &str,
        content: Vec<u8>,
        criteria: &[Criterion],
    ) -> Result<ExecutionId, ClientError> {
        let form = Form::new()
            .part("file", file_part(file_name, content)?)
            .text("criteria", serde_json::to_string(criteria)?);
        self.submit("/api/contracts/analyze", form).await
    }

    /// Submit a contract; the engine reports to `callback_url`, or to the
    /// server's configured default when `None`.
    pub async fn submit_for_callback(
        &self,
        file_name: &str,
        content: Vec<u8>,
        callback_url: Option<&str>,
    ) -> Result<ExecutionId, ClientError> {
        let mut form = Form::new().part("file", file_part(file_name, content)?);
        if let Some(url) = callback_url {
            form = form.text("callbackUrl", url.to_string());
        }
        self.submit("/api/analysis/callback", form).await
    }

    async fn submit(&self, path: &str, form: Form) -> Result<ExecutionId, ClientError> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        let body: SubmitResponse = ClientError::check(response).await?.json().await?;

        match body.execution_id {
            Some(id) if body.success => Ok(id),
            _ => Err(ClientError::Rejected {
                status,
                message: body
                    .error
                    .unwrap_or_else(|| "Submission was not accepted".to_string()),
            }),
        }
    }
}

fn file_part(file_name: &str, content: Vec<u8>) -> Result<Part, ClientError> {
    Ok(Part::bytes(content)
        .file_name(file_name.to_string())
        .mime_str(mime_for(file_name))?)
}

fn mime_for(file_name: &str) -> &'static str {
    let lower = file_name.to_ascii_lowercase();
    if lower.ends_with(".pdf") {
        "application/pdf"
    } else if lower.ends_with(".docx") {
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
    } else {
        "application/octet-stream"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Failed to decode payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Server rejected request ({status}): {message}")]
    Rejected { status: StatusCode, message: String },
}

impl ClientError {
    /// Pass 2xx responses through; turn anything else into `Rejected`
    /// using the `error` field of the JSON body when there is one.
    pub(crate) async fn check(response: reqwest::Response) -> Result<reqwest::Response, Self> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<SubmitResponse>(&text)
            .ok()
            .and_then(|body| body.error)
            .unwrap_or(text);
        Err(ClientError::Rejected { status, message })
    }
}
