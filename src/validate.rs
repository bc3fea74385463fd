//! Input validation for names, providers, scores and prompt types.
//!
//! Prompt types resolve in three tiers: exact match → synonym lookup →
//! error with the closest suggestion.

use crate::error::{Error, Result};
use crate::model::PromptType;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Lowest and highest score a model can earn on a prompt.
pub const SCORE_RANGE: std::ops::RangeInclusive<i64> = 0..=100;

// ── Prompt types ─────────────────────────────────────────────

const VALID_PROMPT_TYPES: [(&str, PromptType); 3] = [
    ("objective", PromptType::Objective),
    ("subjective", PromptType::Subjective),
    ("creative", PromptType::Creative),
];

pub static PROMPT_TYPE_SYNONYMS: LazyLock<HashMap<&str, PromptType>> = LazyLock::new(|| {
    [
        ("fact", PromptType::Objective),
        ("factual", PromptType::Objective),
        ("exact", PromptType::Objective),
        ("closed", PromptType::Objective),
        ("opinion", PromptType::Subjective),
        ("reasoning", PromptType::Subjective),
        ("open", PromptType::Subjective),
        ("story", PromptType::Creative),
        ("writing", PromptType::Creative),
        ("poem", PromptType::Creative),
    ]
    .into_iter()
    .collect()
});

/// Normalize a prompt type via exact match or synonym lookup.
///
/// An empty string yields the default type.
pub fn normalize_prompt_type(input: &str) -> Result<PromptType> {
    let lower = input.trim().to_lowercase();
    if lower.is_empty() {
        return Ok(PromptType::default());
    }

    if let Some((_, t)) = VALID_PROMPT_TYPES.iter().find(|(name, _)| *name == lower) {
        return Ok(*t);
    }

    if let Some(&t) = PROMPT_TYPE_SYNONYMS.get(lower.as_str()) {
        return Ok(t);
    }

    let mut msg = format!("unknown prompt type '{input}'");
    if let Some(suggestion) = closest_prompt_type(&lower) {
        msg.push_str(&format!(" (did you mean '{suggestion}'?)"));
    }
    Err(Error::Validation(msg))
}

fn closest_prompt_type(input: &str) -> Option<&'static str> {
    VALID_PROMPT_TYPES
        .iter()
        .map(|(name, t)| (*name, *t))
        .chain(PROMPT_TYPE_SYNONYMS.iter().map(|(name, t)| (*name, *t)))
        .map(|(name, t)| (levenshtein_distance(input, name), t))
        .filter(|(dist, _)| *dist <= 3)
        .min_by_key(|(dist, _)| *dist)
        .map(|(_, t)| t.as_str())
}

// ── Names ────────────────────────────────────────────────────

/// Validate a suite name for create/rename.
pub fn validate_suite_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("suite name cannot be empty".to_string()));
    }
    if name.contains(['/', '\\']) {
        return Err(Error::Validation(
            "suite name contains invalid characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate a profile or model name.
pub fn validate_label(entity: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{entity} name cannot be empty")));
    }
    Ok(())
}

/// Validate a credential provider name (`anthropic`, `openai`, ...).
pub fn validate_provider(provider: &str) -> Result<()> {
    let ok = !provider.is_empty()
        && provider
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-');
    if ok {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "invalid provider '{provider}': use lowercase letters, digits, '_' or '-'"
        )))
    }
}

/// Validate a score value.
pub fn validate_score(score: i64) -> Result<()> {
    if SCORE_RANGE.contains(&score) {
        Ok(())
    } else {
        Err(Error::Validation(format!(
            "score {score} outside {}..={}",
            SCORE_RANGE.start(),
            SCORE_RANGE.end()
        )))
    }
}

// ── Levenshtein distance ─────────────────────────────────────

/// Compute the Levenshtein edit distance between two strings.
pub fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}
