//! A [`DataStore`] wrapper that fails chosen operations on demand.
//!
//! Used to drive handler error paths without corrupting a real database.

use crate::error::{Error, ErrorKind, Result};
use crate::model::{
    Model, Profile, ProfileDraft, Prompt, PromptDraft, ResultsTable, Score, Suite, SuiteScope,
};
use crate::storage::store::DataStore;
use rusqlite::ffi;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};

/// One [`DataStore`] operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOp {
    ListSuites,
    CreateSuite,
    SelectSuite,
    RenameSuite,
    DeleteSuite,
    CurrentSuite,
    SuiteExists,
    ReadProfiles,
    AddProfile,
    UpdateProfile,
    DeleteProfile,
    WriteProfiles,
    ReadPrompts,
    AddPrompt,
    UpdatePrompt,
    DeletePrompt,
    ReorderPrompts,
    WritePrompts,
    ReadModels,
    AddModel,
    RenameModel,
    DeleteModel,
    SetScore,
    ReadScores,
    WriteResults,
    GetSetting,
    SetSetting,
    SetApiKey,
    GetApiKey,
    MaskedApiKeys,
    MovePrompt,
    ReadResults,
}

#[derive(Debug, Clone, Copy)]
struct Fault {
    kind: ErrorKind,
    remaining: Option<u32>,
}

/// Build an error of the given kind, as a backend would report it.
#[must_use]
pub fn synthetic_error(kind: ErrorKind, op: StoreOp) -> Error {
    let what = format!("{op:?}");
    match kind {
        ErrorKind::NotFound => Error::SuiteNotFound { name: what },
        ErrorKind::Conflict => Error::Conflict {
            entity: "Suite",
            name: what,
        },
        ErrorKind::ForeignKeyViolation => Error::ForeignKey(what),
        ErrorKind::Validation => Error::Validation(format!("injected failure in {what}")),
        ErrorKind::Encryption => Error::Encryption(format!("injected failure in {what}")),
        ErrorKind::Storage => Error::Database(rusqlite::Error::SqliteFailure(
            ffi::Error::new(ffi::SQLITE_IOERR),
            Some(format!("injected failure in {what}")),
        )),
    }
}

/// Delegates to `inner` unless a fault is armed for the operation.
pub struct FaultyStore<S> {
    inner: S,
    faults: Mutex<HashMap<StoreOp, Fault>>,
}

impl<S: DataStore> FaultyStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            faults: Mutex::new(HashMap::new()),
        }
    }

    /// Make every call to `op` fail with `kind` until cleared.
    pub fn fail(&self, op: StoreOp, kind: ErrorKind) {
        self.arm(op, kind, None);
    }

    /// Make only the next call to `op` fail.
    pub fn fail_once(&self, op: StoreOp, kind: ErrorKind) {
        self.arm(op, kind, Some(1));
    }

    pub fn clear(&self, op: StoreOp) {
        self.lock().remove(&op);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<StoreOp, Fault>> {
        self.faults.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm(&self, op: StoreOp, kind: ErrorKind, remaining: Option<u32>) {
        self.lock().insert(op, Fault { kind, remaining });
    }

    fn check(&self, op: StoreOp) -> Result<()> {
        let mut faults = self.lock();
        let Some(fault) = faults.get_mut(&op) else {
            return Ok(());
        };
        let kind = fault.kind;
        if let Some(left) = fault.remaining.as_mut() {
            *left -= 1;
            if *left == 0 {
                faults.remove(&op);
            }
        }
        Err(synthetic_error(kind, op))
    }
}

impl<S: DataStore> DataStore for FaultyStore<S> {
    fn list_suites(&self) -> Result<Vec<Suite>> {
        self.check(StoreOp::ListSuites)?;
        self.inner.list_suites()
    }

    fn create_suite(&self, name: &str) -> Result<Suite> {
        self.check(StoreOp::CreateSuite)?;
        self.inner.create_suite(name)
    }

    fn select_suite(&self, name: &str) -> Result<()> {
        self.check(StoreOp::SelectSuite)?;
        self.inner.select_suite(name)
    }

    fn rename_suite(&self, old: &str, new: &str) -> Result<()> {
        self.check(StoreOp::RenameSuite)?;
        self.inner.rename_suite(old, new)
    }

    fn delete_suite(&self, name: &str) -> Result<()> {
        self.check(StoreOp::DeleteSuite)?;
        self.inner.delete_suite(name)
    }

    fn current_suite(&self) -> Result<Suite> {
        self.check(StoreOp::CurrentSuite)?;
        self.inner.current_suite()
    }

    fn suite_exists(&self, name: &str) -> Result<bool> {
        self.check(StoreOp::SuiteExists)?;
        self.inner.suite_exists(name)
    }

    fn read_profiles(&self, scope: SuiteScope<'_>) -> Result<Vec<Profile>> {
        self.check(StoreOp::ReadProfiles)?;
        self.inner.read_profiles(scope)
    }

    fn add_profile(&self, scope: SuiteScope<'_>, draft: &ProfileDraft) -> Result<Profile> {
        self.check(StoreOp::AddProfile)?;
        self.inner.add_profile(scope, draft)
    }

    fn update_profile(&self, id: i64, draft: &ProfileDraft) -> Result<()> {
        self.check(StoreOp::UpdateProfile)?;
        self.inner.update_profile(id, draft)
    }

    fn delete_profile(&self, id: i64) -> Result<()> {
        self.check(StoreOp::DeleteProfile)?;
        self.inner.delete_profile(id)
    }

    fn write_profiles(&self, scope: SuiteScope<'_>, profiles: &[ProfileDraft]) -> Result<()> {
        self.check(StoreOp::WriteProfiles)?;
        self.inner.write_profiles(scope, profiles)
    }

    fn read_prompts(&self, scope: SuiteScope<'_>) -> Result<Vec<Prompt>> {
        self.check(StoreOp::ReadPrompts)?;
        self.inner.read_prompts(scope)
    }

    fn add_prompt(&self, scope: SuiteScope<'_>, draft: &PromptDraft) -> Result<Prompt> {
        self.check(StoreOp::AddPrompt)?;
        self.inner.add_prompt(scope, draft)
    }

    fn update_prompt(&self, id: i64, draft: &PromptDraft) -> Result<()> {
        self.check(StoreOp::UpdatePrompt)?;
        self.inner.update_prompt(id, draft)
    }

    fn delete_prompt(&self, id: i64) -> Result<()> {
        self.check(StoreOp::DeletePrompt)?;
        self.inner.delete_prompt(id)
    }

    fn reorder_prompts(&self, scope: SuiteScope<'_>, ordered: &[i64]) -> Result<()> {
        self.check(StoreOp::ReorderPrompts)?;
        self.inner.reorder_prompts(scope, ordered)
    }

    fn write_prompts(&self, scope: SuiteScope<'_>, prompts: &[PromptDraft]) -> Result<()> {
        self.check(StoreOp::WritePrompts)?;
        self.inner.write_prompts(scope, prompts)
    }

    fn read_models(&self, scope: SuiteScope<'_>) -> Result<Vec<Model>> {
        self.check(StoreOp::ReadModels)?;
        self.inner.read_models(scope)
    }

    fn add_model(&self, scope: SuiteScope<'_>, name: &str) -> Result<Model> {
        self.check(StoreOp::AddModel)?;
        self.inner.add_model(scope, name)
    }

    fn rename_model(&self, id: i64, name: &str) -> Result<()> {
        self.check(StoreOp::RenameModel)?;
        self.inner.rename_model(id, name)
    }

    fn delete_model(&self, id: i64) -> Result<()> {
        self.check(StoreOp::DeleteModel)?;
        self.inner.delete_model(id)
    }

    fn set_score(&self, model_id: i64, prompt_id: i64, score: i64) -> Result<()> {
        self.check(StoreOp::SetScore)?;
        self.inner.set_score(model_id, prompt_id, score)
    }

    fn read_scores(&self, scope: SuiteScope<'_>) -> Result<Vec<Score>> {
        self.check(StoreOp::ReadScores)?;
        self.inner.read_scores(scope)
    }

    fn write_results(&self, scope: SuiteScope<'_>, results: &ResultsTable) -> Result<()> {
        self.check(StoreOp::WriteResults)?;
        self.inner.write_results(scope, results)
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.check(StoreOp::GetSetting)?;
        self.inner.get_setting(key)
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        self.check(StoreOp::SetSetting)?;
        self.inner.set_setting(key, value)
    }

    fn set_api_key(&self, provider: &str, plaintext: &str) -> Result<()> {
        self.check(StoreOp::SetApiKey)?;
        self.inner.set_api_key(provider, plaintext)
    }

    fn get_api_key(&self, provider: &str) -> Result<String> {
        self.check(StoreOp::GetApiKey)?;
        self.inner.get_api_key(provider)
    }

    fn masked_api_keys(&self) -> Result<BTreeMap<String, String>> {
        self.check(StoreOp::MaskedApiKeys)?;
        self.inner.masked_api_keys()
    }

    fn notify_changed(&self) {
        self.inner.notify_changed();
    }

    fn move_prompt(&self, scope: SuiteScope<'_>, from: usize, to: usize) -> Result<()> {
        self.check(StoreOp::MovePrompt)?;
        self.inner.move_prompt(scope, from, to)
    }

    fn read_results(&self, scope: SuiteScope<'_>) -> Result<ResultsTable> {
        self.check(StoreOp::ReadResults)?;
        self.inner.read_results(scope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryStore;

    #[test]
    fn test_fail_once_then_recovers() {
        let store = FaultyStore::new(MemoryStore::new());
        store.fail_once(StoreOp::CreateSuite, ErrorKind::Storage);

        let err = store.create_suite("a").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Storage);
        assert!(!store.suite_exists("a").unwrap());

        store.create_suite("a").unwrap();
        assert!(store.suite_exists("a").unwrap());
    }

    #[test]
    fn test_persistent_fault_until_cleared() {
        let store = FaultyStore::new(MemoryStore::new());
        store.fail(StoreOp::ReadModels, ErrorKind::NotFound);
        assert!(store.read_models(SuiteScope::Current).is_err());
        assert!(store.read_models(SuiteScope::Current).is_err());

        store.clear(StoreOp::ReadModels);
        assert!(store.read_models(SuiteScope::Current).unwrap().is_empty());
    }

    #[test]
    fn test_failed_move_leaves_order() {
        let store = FaultyStore::new(MemoryStore::new());
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("a")).unwrap();
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("b")).unwrap();
        store.fail_once(StoreOp::MovePrompt, ErrorKind::Storage);

        assert!(store.move_prompt(SuiteScope::Current, 1, 0).is_err());
        let texts: Vec<String> = store
            .read_prompts(SuiteScope::Current)
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect();
        assert_eq!(texts, vec!["a", "b"]);

        store.move_prompt(SuiteScope::Current, 1, 0).unwrap();
        assert!(store.read_results(SuiteScope::Current).unwrap().is_empty());
    }

    #[test]
    fn test_synthetic_errors_match_kind() {
        for kind in [
            ErrorKind::NotFound,
            ErrorKind::Conflict,
            ErrorKind::ForeignKeyViolation,
            ErrorKind::Validation,
            ErrorKind::Encryption,
            ErrorKind::Storage,
        ] {
            assert_eq!(synthetic_error(kind, StoreOp::SetScore).kind(), kind);
        }
    }
}
