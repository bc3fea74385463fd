//! Evaluation bookkeeping rows.
//!
//! These are written and read by the evaluation scheduler, which lives
//! outside this crate. The store only persists them and guards the job
//! status machine.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What an evaluation job targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobType {
    /// Every model against every prompt in the suite.
    All,
    /// One model against every prompt.
    Model,
    /// Every model against one prompt.
    Prompt,
}

impl JobType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Model => "model",
            Self::Prompt => "prompt",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Self::All),
            "model" => Some(Self::Model),
            "prompt" => Some(Self::Prompt),
            _ => None,
        }
    }
}

/// Lifecycle state of an evaluation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    pub(crate) fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// pending → running → {completed, failed, cancelled}; a pending job may
    /// also be cancelled before it starts.
    #[must_use]
    pub const fn can_transition_to(&self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running | Self::Cancelled)
                | (Self::Running, Self::Completed | Self::Failed | Self::Cancelled)
        )
    }
}

/// Fields supplied when enqueuing a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewJob {
    pub suite_id: i64,
    pub job_type: JobType,
    pub target_id: Option<i64>,
    pub progress_total: i64,
    pub estimated_cost_usd: f64,
}

/// An evaluation job row. Timestamps are Unix milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationJob {
    pub id: i64,
    pub suite_id: i64,
    pub job_type: JobType,
    pub target_id: Option<i64>,
    pub status: JobStatus,
    pub progress_current: i64,
    pub progress_total: i64,
    pub estimated_cost_usd: f64,
    pub actual_cost_usd: f64,
    pub error_message: String,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub completed_at: Option<i64>,
}

/// The latest answer a model gave to a prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelResponse {
    pub id: i64,
    pub model_id: i64,
    pub prompt_id: i64,
    pub response_text: String,
    /// Where the text came from (`manual`, `api`, ...).
    pub response_source: String,
    pub api_config: String,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Fields for one judge verdict appended to the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub job_id: i64,
    pub model_id: i64,
    pub prompt_id: i64,
    pub judge_name: String,
    pub judge_score: i64,
    pub judge_confidence: f64,
    pub judge_reasoning: String,
    pub cost_usd: f64,
}

/// One judge verdict. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationHistory {
    pub id: i64,
    pub job_id: i64,
    pub model_id: i64,
    pub prompt_id: i64,
    pub judge_name: String,
    pub judge_score: i64,
    pub judge_confidence: f64,
    pub judge_reasoning: String,
    pub cost_usd: f64,
    pub created_at: i64,
}

/// Accumulated spend for a suite on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostTracking {
    pub id: i64,
    pub suite_id: i64,
    pub date: NaiveDate,
    pub total_cost_usd: f64,
    pub evaluation_count: i64,
}
