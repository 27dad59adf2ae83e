use garde::Validate;
use serde::{Deserialize, Serialize};

use crate::models::execution::{ExecutionId, ExecutionStatus, StatusRecord};

const DEFAULT_TITLE: &str = "Processing...";
const DEFAULT_DESCRIPTION: &str = "Please wait";

/// Progress notification pushed by the workflow engine.
///
/// Every field except `executionId` is optional; missing ones fall back to
/// a generic "still processing" record.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRequest {
    #[garde(skip)]
    pub execution_id: Option<String>,

    #[garde(length(max = 200))]
    pub title: Option<String>,

    #[garde(length(max = 4000))]
    pub description: Option<String>,

    #[garde(range(min = 0.0, max = 100.0))]
    pub progress: Option<f64>,

    #[garde(skip)]
    pub status: Option<ExecutionStatus>,

    #[garde(skip)]
    pub results: Option<Vec<serde_json::Value>>,
}

impl NotificationRequest {
    /// The execution this notification is for, if one was given.
    pub fn execution_id(&self) -> Option<ExecutionId> {
        self.execution_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(ExecutionId::from)
    }

    /// Build the replacement record. Each notification replaces the whole
    /// record; nothing is merged from the previous one.
    pub fn into_record(self) -> StatusRecord {
        let progress = self.progress.unwrap_or(0.0).round().clamp(0.0, 100.0) as u8;
        StatusRecord::new(
            self.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            self.description
                .unwrap_or_else(|| DEFAULT_DESCRIPTION.to_string()),
            progress,
            self.status.unwrap_or(ExecutionStatus::Processing),
        )
        .with_results(self.results)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NotificationResponse {
    pub success: bool,
}
