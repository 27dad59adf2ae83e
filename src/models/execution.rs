use std::fmt;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Opaque token identifying one submitted analysis job end-to-end.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(String);

impl ExecutionId {
    /// Mint a fresh id: `exec_<unix millis>_<9 random hex chars>`.
    pub fn generate() -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self(format!(
            "exec_{}_{}",
            Utc::now().timestamp_millis(),
            &suffix[..9]
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ExecutionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for ExecutionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Phase of an execution as reported by the workflow engine.
///
/// Parsing is case-insensitive (`"COMPLETED"` and `"Completed"` are both
/// accepted); serialization is always lowercase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "lowercase", try_from = "String")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExecutionStatus {
    Submitted,
    Uploading,
    Processing,
    Completed,
    Error,
}

impl ExecutionStatus {
    /// `completed` and `error` end an execution; its state is torn down.
    pub fn is_terminal(self) -> bool {
        matches!(self, ExecutionStatus::Completed | ExecutionStatus::Error)
    }
}

impl TryFrom<String> for ExecutionStatus {
    type Error = strum::ParseError;

    fn try_from(value: String) -> Result<Self, strum::ParseError> {
        value.trim().parse()
    }
}

/// Latest known progress/result snapshot for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusRecord {
    pub title: String,
    pub description: String,
    /// Percentage 0-100. Not checked for monotonicity across updates.
    pub progress: u8,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<serde_json::Value>>,
}

impl StatusRecord {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        progress: u8,
        status: ExecutionStatus,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            progress: progress.min(100),
            status,
            results: None,
        }
    }

    /// Attach final results. Dropped unless the record is `completed`.
    pub fn with_results(mut self, results: Option<Vec<serde_json::Value>>) -> Self {
        self.results = match self.status {
            ExecutionStatus::Completed => results,
            _ => None,
        };
        self
    }

    /// Terminal error record written when a job fails after the
    /// submission response has already been sent.
    pub fn failed(description: impl Into<String>) -> Self {
        Self::new(
            "Übermittlung fehlgeschlagen",
            description,
            0,
            ExecutionStatus::Error,
        )
    }
}
