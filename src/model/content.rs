//! Suite content: profiles, prompts, models and scores.

use serde::{Deserialize, Serialize};

/// A named grouping label for prompts within a suite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub suite_id: i64,
}

/// Profile fields supplied by callers when creating or bulk-replacing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileDraft {
    pub name: String,
    #[serde(default)]
    pub description: String,
}

impl ProfileDraft {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

/// How a prompt's answers are judged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptType {
    /// Has a single correct solution.
    #[default]
    Objective,
    /// Judged on reasoning quality.
    Subjective,
    /// Open-ended writing.
    Creative,
}

impl PromptType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Objective => "objective",
            Self::Subjective => "subjective",
            Self::Creative => "creative",
        }
    }
}

impl std::fmt::Display for PromptType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PromptType {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::validate::normalize_prompt_type(s)
    }
}

/// A prompt as read back from the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub id: i64,
    pub text: String,
    pub solution: String,
    /// Cleared (not the prompt deleted) when the profile goes away.
    pub profile_id: Option<i64>,
    /// Resolved name of `profile_id`, for display.
    pub profile_name: Option<String>,
    pub suite_id: i64,
    pub display_order: i64,
    pub prompt_type: PromptType,
}

/// Prompt fields supplied by callers. The profile is given by name and
/// resolved within the target suite.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptDraft {
    pub text: String,
    #[serde(default)]
    pub solution: String,
    #[serde(default)]
    pub profile: Option<String>,
    #[serde(default, rename = "type")]
    pub prompt_type: PromptType,
}

impl PromptDraft {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = solution.into();
        self
    }

    #[must_use]
    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    #[must_use]
    pub fn with_type(mut self, prompt_type: PromptType) -> Self {
        self.prompt_type = prompt_type;
        self
    }

    /// The profile name, ignoring blank values.
    pub(crate) fn profile_name(&self) -> Option<&str> {
        self.profile.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// A model under evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Model {
    pub id: i64,
    pub name: String,
    pub suite_id: i64,
}

/// Model name → one score per prompt, aligned with prompt read order.
pub type ResultsTable = std::collections::BTreeMap<String, Vec<i64>>;

/// The score a model earned on one prompt (0-100).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub id: i64,
    pub model_id: i64,
    pub prompt_id: i64,
    pub score: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_draft_builder() {
        let draft = PromptDraft::new("What is 2+2?")
            .with_solution("4")
            .with_profile("Math")
            .with_type(PromptType::Objective);
        assert_eq!(draft.profile_name(), Some("Math"));
        assert_eq!(draft.solution, "4");
    }

    #[test]
    fn test_blank_profile_is_none() {
        let draft = PromptDraft::new("x").with_profile("   ");
        assert_eq!(draft.profile_name(), None);
    }

    #[test]
    fn test_prompt_draft_deserializes_type_field() {
        let draft: PromptDraft =
            serde_json::from_str(r#"{"text":"t","type":"creative"}"#).unwrap();
        assert_eq!(draft.prompt_type, PromptType::Creative);
        assert!(draft.profile.is_none());
    }
}
