use garde::Validate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Upper bound on criteria per submission.
pub const MAX_CRITERIA: usize = 100;

/// Weight of a criterion in the analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumString, Display)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum CriterionKind {
    /// Mandatory requirement.
    Muss,
    /// Expected but negotiable.
    Soll,
    /// Optional.
    Kann,
    /// Free-form analysis question.
    Analyse,
}

/// One user-entered analysis criterion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct Criterion {
    #[serde(rename = "type")]
    #[garde(skip)]
    pub kind: CriterionKind,

    #[garde(length(min = 1, max = 2000))]
    pub value: String,
}

impl Criterion {
    pub fn new(kind: CriterionKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CriteriaError {
    #[error("No criteria provided")]
    Missing,

    #[error("Invalid criteria JSON: {0}")]
    Malformed(String),

    #[error("At least one criterion is required")]
    Empty,

    #[error("Too many criteria (at most {MAX_CRITERIA} allowed)")]
    TooMany,

    #[error("Criterion {index} is invalid: {reason}")]
    Invalid { index: usize, reason: String },
}

/// Parse the JSON-encoded `criteria` form field.
///
/// Values are trimmed before validation, so whitespace-only entries are
/// rejected. Unknown fields on each entry are ignored.
pub fn parse_criteria(raw: &str) -> Result<Vec<Criterion>, CriteriaError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CriteriaError::Missing);
    }

    let mut criteria: Vec<Criterion> =
        serde_json::from_str(raw).map_err(|e| CriteriaError::Malformed(e.to_string()))?;

    if criteria.is_empty() {
        return Err(CriteriaError::Empty);
    }
    if criteria.len() > MAX_CRITERIA {
        return Err(CriteriaError::TooMany);
    }

    for (index, criterion) in criteria.iter_mut().enumerate() {
        criterion.value = criterion.value.trim().to_string();
        criterion
            .validate()
            .map_err(|report| CriteriaError::Invalid {
                index,
                reason: report.to_string(),
            })?;
    }

    Ok(criteria)
}
