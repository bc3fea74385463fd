//! Suite model.
//!
//! A suite is an isolated workspace; every profile, prompt, model and score
//! belongs to exactly one. Exactly one suite is "current" at a time.

use serde::{Deserialize, Serialize};

/// Name of the suite seeded when the schema is first created.
pub const DEFAULT_SUITE: &str = "default";

/// A suite row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suite {
    pub id: i64,
    pub name: String,
    pub is_current: bool,
}

/// Which suite a suite-scoped operation acts on.
///
/// Handlers normally pass `Current`; `Named` addresses a suite directly,
/// regardless of which one is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuiteScope<'a> {
    Current,
    Named(&'a str),
}

impl<'a> SuiteScope<'a> {
    /// Scope for a suite name, treating an empty name as the current suite.
    #[must_use]
    pub fn from_name(name: Option<&'a str>) -> Self {
        match name {
            Some(n) if !n.is_empty() => Self::Named(n),
            _ => Self::Current,
        }
    }
}

impl std::fmt::Display for SuiteScope<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => f.write_str("<current>"),
            Self::Named(name) => f.write_str(name),
        }
    }
}

/// Row counts for a suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuiteStats {
    pub profiles: usize,
    pub prompts: usize,
    pub models: usize,
    pub scores: usize,
}

impl SuiteStats {
    /// Returns total number of records.
    #[must_use]
    pub fn total(&self) -> usize {
        self.profiles + self.prompts + self.models + self.scores
    }
}
