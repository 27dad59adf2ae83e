use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;

use crate::models::criteria::CriteriaError;
use crate::models::execution::ExecutionId;
use crate::models::submission::SubmitResponse;
use crate::services::registry::RegistryError;
use crate::services::workflow::WorkflowError;

/// Error type for HTTP handlers.
///
/// Every variant renders as `{"success": false, "error": "..."}` so the
/// browser and the workflow engine can rely on one error shape.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Missing or malformed input; nothing was changed.
    #[error("{0}")]
    BadRequest(String),

    /// The execution is not (or no longer) known to this process.
    #[error("Unknown execution: {0}")]
    UnknownExecution(ExecutionId),

    /// The workflow request could not even be built.
    #[error("Failed to dispatch to workflow engine: {0}")]
    Dispatch(#[from] WorkflowError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl From<CriteriaError> for AppError {
    fn from(err: CriteriaError) -> Self {
        AppError::BadRequest(err.to_string())
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownExecution(id) => AppError::UnknownExecution(id),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::UnknownExecution(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Dispatch(err) => {
                tracing::error!(error = %err, "Workflow dispatch could not be initiated");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to dispatch to workflow engine".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(SubmitResponse::rejected(message))).into_response()
    }
}
