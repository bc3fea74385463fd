//! Data models for the tournament store.
//!
//! This module contains all domain models:
//! - Suite (and the `SuiteScope` used to address one)
//! - Profile, Prompt, Model, Score
//! - EvaluationJob, ModelResponse, EvaluationHistory, CostTracking

pub mod content;
pub mod evaluation;
pub mod suite;

pub use content::{
    Model, Profile, ProfileDraft, Prompt, PromptDraft, PromptType, ResultsTable, Score,
};
pub use evaluation::{
    CostTracking, EvaluationHistory, EvaluationJob, JobStatus, JobType, ModelResponse,
    NewHistoryEntry, NewJob,
};
pub use suite::{Suite, SuiteScope, SuiteStats, DEFAULT_SUITE};
