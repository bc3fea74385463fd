//! The handler-facing storage capability set.
//!
//! Request handlers depend on [`DataStore`], never on a concrete backend.
//! [`SqliteStore`] is the production implementation; `MemoryStore` and
//! `FaultyStore` implement the same trait for tests.

use crate::error::Result;
use crate::model::{
    Model, Profile, ProfileDraft, Prompt, PromptDraft, ResultsTable, Score, Suite, SuiteScope,
};
use crate::notify::ChangeEvent;
use crate::storage::sqlite::SqliteStore;
use std::collections::{BTreeMap, HashMap};

/// Everything a request handler may do to the tournament state.
pub trait DataStore: Send + Sync {
    // Suites
    fn list_suites(&self) -> Result<Vec<Suite>>;
    fn create_suite(&self, name: &str) -> Result<Suite>;
    fn select_suite(&self, name: &str) -> Result<()>;
    fn rename_suite(&self, old: &str, new: &str) -> Result<()>;
    fn delete_suite(&self, name: &str) -> Result<()>;
    fn current_suite(&self) -> Result<Suite>;
    fn suite_exists(&self, name: &str) -> Result<bool>;

    // Profiles
    fn read_profiles(&self, scope: SuiteScope<'_>) -> Result<Vec<Profile>>;
    fn add_profile(&self, scope: SuiteScope<'_>, draft: &ProfileDraft) -> Result<Profile>;
    fn update_profile(&self, id: i64, draft: &ProfileDraft) -> Result<()>;
    fn delete_profile(&self, id: i64) -> Result<()>;
    fn write_profiles(&self, scope: SuiteScope<'_>, profiles: &[ProfileDraft]) -> Result<()>;

    // Prompts
    fn read_prompts(&self, scope: SuiteScope<'_>) -> Result<Vec<Prompt>>;
    fn add_prompt(&self, scope: SuiteScope<'_>, draft: &PromptDraft) -> Result<Prompt>;
    fn update_prompt(&self, id: i64, draft: &PromptDraft) -> Result<()>;
    fn delete_prompt(&self, id: i64) -> Result<()>;
    fn reorder_prompts(&self, scope: SuiteScope<'_>, ordered: &[i64]) -> Result<()>;
    fn write_prompts(&self, scope: SuiteScope<'_>, prompts: &[PromptDraft]) -> Result<()>;

    // Models and scores
    fn read_models(&self, scope: SuiteScope<'_>) -> Result<Vec<Model>>;
    fn add_model(&self, scope: SuiteScope<'_>, name: &str) -> Result<Model>;
    fn rename_model(&self, id: i64, name: &str) -> Result<()>;
    fn delete_model(&self, id: i64) -> Result<()>;
    fn set_score(&self, model_id: i64, prompt_id: i64, score: i64) -> Result<()>;
    fn read_scores(&self, scope: SuiteScope<'_>) -> Result<Vec<Score>>;
    fn write_results(&self, scope: SuiteScope<'_>, results: &ResultsTable) -> Result<()>;

    // Settings and credentials
    fn get_setting(&self, key: &str) -> Result<Option<String>>;
    fn set_setting(&self, key: &str, value: &str) -> Result<()>;
    fn set_api_key(&self, provider: &str, plaintext: &str) -> Result<()>;
    fn get_api_key(&self, provider: &str) -> Result<String>;
    fn masked_api_keys(&self) -> Result<BTreeMap<String, String>>;

    /// Tell live viewers something changed. Never fails.
    fn notify_changed(&self);

    /// Move the prompt at read position `from` to position `to`.
    ///
    /// `to` may equal the prompt count, meaning "to the end". The suite is
    /// resolved once; the move never lands in a suite selected mid-call.
    fn move_prompt(&self, scope: SuiteScope<'_>, from: usize, to: usize) -> Result<()>;

    /// Model name → scores aligned with prompt read order. Missing scores are 0.
    ///
    /// Built from a single view of one suite.
    fn read_results(&self, scope: SuiteScope<'_>) -> Result<ResultsTable>;
}

/// Assemble a results table from one suite's prompts, models and scores.
pub(crate) fn build_results(prompts: &[Prompt], models: &[Model], scores: &[Score]) -> ResultsTable {
    let position: HashMap<i64, usize> = prompts.iter().enumerate().map(|(i, p)| (p.id, i)).collect();
    let names: HashMap<i64, &str> = models.iter().map(|m| (m.id, m.name.as_str())).collect();

    let mut table: ResultsTable = models
        .iter()
        .map(|m| (m.name.clone(), vec![0; prompts.len()]))
        .collect();

    for score in scores {
        let (Some(name), Some(&idx)) = (names.get(&score.model_id), position.get(&score.prompt_id))
        else {
            continue;
        };
        if let Some(row) = table.get_mut(*name) {
            row[idx] = score.score;
        }
    }
    table
}

impl DataStore for SqliteStore {
    fn list_suites(&self) -> Result<Vec<Suite>> {
        SqliteStore::list_suites(self)
    }

    fn create_suite(&self, name: &str) -> Result<Suite> {
        SqliteStore::create_suite(self, name)
    }

    fn select_suite(&self, name: &str) -> Result<()> {
        SqliteStore::select_suite(self, name)
    }

    fn rename_suite(&self, old: &str, new: &str) -> Result<()> {
        SqliteStore::rename_suite(self, old, new)
    }

    fn delete_suite(&self, name: &str) -> Result<()> {
        SqliteStore::delete_suite(self, name)
    }

    fn current_suite(&self) -> Result<Suite> {
        SqliteStore::current_suite(self)
    }

    fn suite_exists(&self, name: &str) -> Result<bool> {
        SqliteStore::suite_exists(self, name)
    }

    fn read_profiles(&self, scope: SuiteScope<'_>) -> Result<Vec<Profile>> {
        SqliteStore::read_profiles(self, scope)
    }

    fn add_profile(&self, scope: SuiteScope<'_>, draft: &ProfileDraft) -> Result<Profile> {
        SqliteStore::add_profile(self, scope, draft)
    }

    fn update_profile(&self, id: i64, draft: &ProfileDraft) -> Result<()> {
        SqliteStore::update_profile(self, id, draft)
    }

    fn delete_profile(&self, id: i64) -> Result<()> {
        SqliteStore::delete_profile(self, id)
    }

    fn write_profiles(&self, scope: SuiteScope<'_>, profiles: &[ProfileDraft]) -> Result<()> {
        SqliteStore::write_profiles(self, scope, profiles)
    }

    fn read_prompts(&self, scope: SuiteScope<'_>) -> Result<Vec<Prompt>> {
        SqliteStore::read_prompts(self, scope)
    }

    fn add_prompt(&self, scope: SuiteScope<'_>, draft: &PromptDraft) -> Result<Prompt> {
        SqliteStore::add_prompt(self, scope, draft)
    }

    fn update_prompt(&self, id: i64, draft: &PromptDraft) -> Result<()> {
        SqliteStore::update_prompt(self, id, draft)
    }

    fn delete_prompt(&self, id: i64) -> Result<()> {
        SqliteStore::delete_prompt(self, id)
    }

    fn reorder_prompts(&self, scope: SuiteScope<'_>, ordered: &[i64]) -> Result<()> {
        SqliteStore::reorder_prompts(self, scope, ordered)
    }

    fn write_prompts(&self, scope: SuiteScope<'_>, prompts: &[PromptDraft]) -> Result<()> {
        SqliteStore::write_prompts(self, scope, prompts)
    }

    fn read_models(&self, scope: SuiteScope<'_>) -> Result<Vec<Model>> {
        SqliteStore::read_models(self, scope)
    }

    fn add_model(&self, scope: SuiteScope<'_>, name: &str) -> Result<Model> {
        SqliteStore::add_model(self, scope, name)
    }

    fn rename_model(&self, id: i64, name: &str) -> Result<()> {
        SqliteStore::rename_model(self, id, name)
    }

    fn delete_model(&self, id: i64) -> Result<()> {
        SqliteStore::delete_model(self, id)
    }

    fn set_score(&self, model_id: i64, prompt_id: i64, score: i64) -> Result<()> {
        SqliteStore::set_score(self, model_id, prompt_id, score)
    }

    fn read_scores(&self, scope: SuiteScope<'_>) -> Result<Vec<Score>> {
        SqliteStore::read_scores(self, scope)
    }

    fn write_results(&self, scope: SuiteScope<'_>, results: &ResultsTable) -> Result<()> {
        SqliteStore::write_results(self, scope, results)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        SqliteStore::get_setting(self, key)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        SqliteStore::set_setting(self, key, value)
    }

    fn set_api_key(&self, provider: &str, plaintext: &str) -> Result<()> {
        SqliteStore::set_api_key(self, provider, plaintext)
    }

    fn get_api_key(&self, provider: &str) -> Result<String> {
        SqliteStore::get_api_key(self, provider)
    }

    fn masked_api_keys(&self) -> Result<BTreeMap<String, String>> {
        SqliteStore::masked_api_keys(self)
    }

    fn notify_changed(&self) {
        self.notifier().notify(ChangeEvent::new("notify_changed", None));
    }

    fn move_prompt(&self, scope: SuiteScope<'_>, from: usize, to: usize) -> Result<()> {
        SqliteStore::move_prompt(self, scope, from, to)
    }

    fn read_results(&self, scope: SuiteScope<'_>) -> Result<ResultsTable> {
        SqliteStore::read_results(self, scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_store(store: &SqliteStore) -> &dyn DataStore {
        store
    }

    #[test]
    fn test_move_prompt_through_trait() {
        let sqlite = SqliteStore::open_memory().unwrap();
        let store = as_store(&sqlite);
        for text in ["A", "B", "C", "D"] {
            store.add_prompt(SuiteScope::Current, &PromptDraft::new(text)).unwrap();
        }

        store.move_prompt(SuiteScope::Current, 3, 0).unwrap();
        store.move_prompt(SuiteScope::Current, 1, 4).unwrap();

        let texts: Vec<String> = store
            .read_prompts(SuiteScope::Current)
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(texts, vec!["D", "B", "C", "A"]);
        assert!(store.move_prompt(SuiteScope::Current, 9, 0).is_err());
    }

    #[test]
    fn test_read_results_aligns_with_prompt_order() {
        let sqlite = SqliteStore::open_memory().unwrap();
        let store = as_store(&sqlite);
        let p1 = store.add_prompt(SuiteScope::Current, &PromptDraft::new("1")).unwrap();
        let p2 = store.add_prompt(SuiteScope::Current, &PromptDraft::new("2")).unwrap();
        let m = store.add_model(SuiteScope::Current, "alpha").unwrap();
        store.add_model(SuiteScope::Current, "beta").unwrap();
        store.set_score(m.id, p2.id, 70).unwrap();

        let results = store.read_results(SuiteScope::Current).unwrap();
        assert_eq!(results["alpha"], vec![0, 70]);
        assert_eq!(results["beta"], vec![0, 0]);

        store.reorder_prompts(SuiteScope::Current, &[p2.id, p1.id]).unwrap();
        let results = store.read_results(SuiteScope::Current).unwrap();
        assert_eq!(results["alpha"], vec![70, 0]);
    }
}
