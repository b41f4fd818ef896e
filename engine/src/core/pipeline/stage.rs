//! Stage Results
//!
//! Uniform result wrapper returned by every pipeline stage.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline stage identifier
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    /// Config validation and working directory setup
    Setup,
    ScriptVoice,
    Visual,
    Timing,
    Composition,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Setup => "setup",
            StageId::ScriptVoice => "script_voice",
            StageId::Visual => "visual",
            StageId::Timing => "timing",
            StageId::Composition => "composition",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome class of a stage
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Ok,
    /// Produced a substitute value after a failure
    Degraded,
    Failed,
}

/// Result of one stage.
///
/// `value` is present for `ok` and `degraded`; `error_detail` explains a
/// degraded or failed outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageResult<T> {
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
}

impl<T> StageResult<T> {
    pub fn ok(value: T) -> Self {
        Self {
            status: StageStatus::Ok,
            value: Some(value),
            error_detail: None,
        }
    }

    pub fn degraded(value: T, detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Degraded,
            value: Some(value),
            error_detail: Some(detail.into()),
        }
    }

    pub fn failed(detail: impl Into<String>) -> Self {
        Self {
            status: StageStatus::Failed,
            value: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == StageStatus::Ok
    }

    pub fn is_degraded(&self) -> bool {
        self.status == StageStatus::Degraded
    }

    pub fn is_failed(&self) -> bool {
        self.status == StageStatus::Failed
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }
}

/// Condensed view of one stage for run summaries
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StageRecord {
    pub stage: StageId,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StageRecord {
    pub fn from_result<T>(stage: StageId, result: &StageResult<T>) -> Self {
        Self {
            stage,
            status: result.status,
            detail: result.error_detail.clone(),
        }
    }
}
