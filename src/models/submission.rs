use serde::{Deserialize, Serialize};

use crate::models::execution::ExecutionId;

/// Response to both submission entry points and the body of every
/// API error.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<ExecutionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SubmitResponse {
    pub fn accepted(execution_id: ExecutionId) -> Self {
        Self {
            success: true,
            execution_id: Some(execution_id),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            success: false,
            execution_id: None,
            error: Some(error.into()),
        }
    }
}

/// Contract file as received from the browser.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: axum::body::Bytes,
}
