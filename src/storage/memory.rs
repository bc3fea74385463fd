//! In-memory [`DataStore`] with the same observable rules as SQLite.
//!
//! Each mutation works on a copy of the state and swaps it in only on
//! success, which gives bulk operations the same all-or-nothing behaviour as
//! a transaction.

use crate::error::{Error, Result};
use crate::model::{
    DEFAULT_SUITE, Model, Profile, ProfileDraft, Prompt, PromptDraft, ResultsTable, Score, Suite,
    SuiteScope,
};
use crate::notify::{ChangeEvent, ChangeNotifier, NoopNotifier};
use crate::storage::ordering::{check_permutation, move_within};
use crate::storage::settings::API_KEY_PREFIX;
use crate::storage::sqlite::MutationContext;
use crate::storage::store::{DataStore, build_results};
use crate::validate::{validate_label, validate_provider, validate_score, validate_suite_name};
use crate::vault::{MASK_ERROR, SecretVault, mask_key};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Clone)]
struct State {
    last_id: i64,
    suites: Vec<Suite>,
    profiles: Vec<Profile>,
    prompts: Vec<Prompt>,
    models: Vec<Model>,
    scores: Vec<Score>,
    settings: BTreeMap<String, String>,
}

impl State {
    fn seeded() -> Self {
        Self {
            last_id: 1,
            suites: vec![Suite {
                id: 1,
                name: DEFAULT_SUITE.to_string(),
                is_current: true,
            }],
            profiles: Vec::new(),
            prompts: Vec::new(),
            models: Vec::new(),
            scores: Vec::new(),
            settings: BTreeMap::new(),
        }
    }

    fn next_id(&mut self) -> i64 {
        self.last_id += 1;
        self.last_id
    }

    fn resolve(&self, scope: SuiteScope<'_>) -> Result<i64> {
        match scope {
            SuiteScope::Current => self
                .suites
                .iter()
                .find(|s| s.is_current)
                .map(|s| s.id)
                .ok_or(Error::NoCurrentSuite),
            SuiteScope::Named(name) => self.suite_by_name(name).map(|s| s.id),
        }
    }

    fn suite_by_name(&self, name: &str) -> Result<&Suite> {
        self.suites
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| Error::SuiteNotFound {
                name: name.to_string(),
            })
    }

    fn set_current(&mut self, suite_id: i64) {
        for suite in &mut self.suites {
            suite.is_current = suite.id == suite_id;
        }
    }

    fn profile_id(&self, suite_id: i64, name: Option<&str>) -> Result<Option<i64>> {
        let Some(name) = name else {
            return Ok(None);
        };
        self.profiles
            .iter()
            .find(|p| p.suite_id == suite_id && p.name == name)
            .map(|p| Some(p.id))
            .ok_or_else(|| Error::ProfileNameNotFound {
                name: name.to_string(),
            })
    }

    fn insert_profile(&mut self, suite_id: i64, draft: &ProfileDraft) -> Result<Profile> {
        validate_label("profile", &draft.name)?;
        if self
            .profiles
            .iter()
            .any(|p| p.suite_id == suite_id && p.name == draft.name)
        {
            return Err(Error::Conflict {
                entity: "Profile",
                name: draft.name.clone(),
            });
        }
        let profile = Profile {
            id: self.next_id(),
            name: draft.name.clone(),
            description: draft.description.clone(),
            suite_id,
        };
        self.profiles.push(profile.clone());
        Ok(profile)
    }

    fn remove_profiles(&mut self, keep: impl Fn(&Profile) -> bool) {
        let removed: Vec<i64> = self
            .profiles
            .iter()
            .filter(|p| !keep(p))
            .map(|p| p.id)
            .collect();
        self.profiles.retain(|p| keep(p));
        for prompt in &mut self.prompts {
            if prompt.profile_id.is_some_and(|id| removed.contains(&id)) {
                prompt.profile_id = None;
            }
        }
    }

    fn insert_prompt(&mut self, suite_id: i64, draft: &PromptDraft, order: i64) -> Result<i64> {
        if draft.text.trim().is_empty() {
            return Err(Error::Validation("prompt text cannot be empty".to_string()));
        }
        let profile_id = self.profile_id(suite_id, draft.profile_name())?;
        let id = self.next_id();
        self.prompts.push(Prompt {
            id,
            text: draft.text.clone(),
            solution: draft.solution.clone(),
            profile_id,
            profile_name: None,
            suite_id,
            display_order: order,
            prompt_type: draft.prompt_type,
        });
        Ok(id)
    }

    fn remove_prompts(&mut self, keep: impl Fn(&Prompt) -> bool) {
        let removed: Vec<i64> = self
            .prompts
            .iter()
            .filter(|p| !keep(p))
            .map(|p| p.id)
            .collect();
        self.prompts.retain(|p| keep(p));
        self.scores.retain(|s| !removed.contains(&s.prompt_id));
    }

    fn insert_model(&mut self, suite_id: i64, name: &str) -> Result<Model> {
        validate_label("model", name)?;
        if self
            .models
            .iter()
            .any(|m| m.suite_id == suite_id && m.name == name)
        {
            return Err(Error::Conflict {
                entity: "Model",
                name: name.to_string(),
            });
        }
        let model = Model {
            id: self.next_id(),
            name: name.to_string(),
            suite_id,
        };
        self.models.push(model.clone());
        Ok(model)
    }

    fn remove_models(&mut self, keep: impl Fn(&Model) -> bool) {
        let removed: Vec<i64> = self
            .models
            .iter()
            .filter(|m| !keep(m))
            .map(|m| m.id)
            .collect();
        self.models.retain(|m| keep(m));
        self.scores.retain(|s| !removed.contains(&s.model_id));
    }

    fn prompts_in(&self, suite_id: i64) -> Vec<Prompt> {
        let mut prompts: Vec<Prompt> = self
            .prompts
            .iter()
            .filter(|p| p.suite_id == suite_id)
            .map(|p| Prompt {
                profile_name: p.profile_id.and_then(|id| {
                    self.profiles
                        .iter()
                        .find(|pr| pr.id == id)
                        .map(|pr| pr.name.clone())
                }),
                ..p.clone()
            })
            .collect();
        prompts.sort_by_key(|p| (p.display_order, p.id));
        prompts
    }

    fn model_suite(&self, id: i64) -> Option<i64> {
        self.models.iter().find(|m| m.id == id).map(|m| m.suite_id)
    }

    fn prompt_suite(&self, id: i64) -> Option<i64> {
        self.prompts.iter().find(|p| p.id == id).map(|p| p.suite_id)
    }
}

/// A [`DataStore`] held entirely in memory.
pub struct MemoryStore {
    state: Mutex<State>,
    vault: SecretVault,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// A store holding only the default suite.
    ///
    /// Like `SqliteStore::open_memory`, it has no vault secret until
    /// [`with_vault`](Self::with_vault) supplies one.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::seeded()),
            vault: SecretVault::disabled(),
            notifier: Arc::new(NoopNotifier),
        }
    }

    #[must_use]
    pub fn with_vault(mut self, vault: SecretVault) -> Self {
        self.vault = vault;
        self
    }

    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> Result<R>) -> Result<R> {
        f(&self.lock())
    }

    fn write<R>(
        &self,
        op: &'static str,
        f: impl FnOnce(&mut State, &mut MutationContext) -> Result<R>,
    ) -> Result<R> {
        let (result, event) = {
            let mut state = self.lock();
            let mut draft = state.clone();
            let mut ctx = MutationContext::new(op);
            let result = f(&mut draft, &mut ctx)?;
            *state = draft;
            (result, ctx.event())
        };
        if let Some(event) = event {
            self.notifier.notify(event);
        }
        Ok(result)
    }
}

impl DataStore for MemoryStore {
    fn list_suites(&self) -> Result<Vec<Suite>> {
        self.read(|s| {
            let mut suites = s.suites.clone();
            suites.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(suites)
        })
    }

    fn create_suite(&self, name: &str) -> Result<Suite> {
        validate_suite_name(name)?;
        self.write("create_suite", |s, ctx| {
            if s.suites.iter().any(|suite| suite.name == name) {
                return Err(Error::Conflict {
                    entity: "Suite",
                    name: name.to_string(),
                });
            }
            let suite = Suite {
                id: s.next_id(),
                name: name.to_string(),
                is_current: false,
            };
            s.suites.push(suite.clone());
            ctx.notify_global();
            Ok(suite)
        })
    }

    fn select_suite(&self, name: &str) -> Result<()> {
        self.write("select_suite", |s, ctx| {
            let id = s.suite_by_name(name)?.id;
            s.set_current(id);
            ctx.notify_suite(id);
            Ok(())
        })
    }

    fn rename_suite(&self, old: &str, new: &str) -> Result<()> {
        if old == DEFAULT_SUITE {
            return Err(Error::Validation(
                "the default suite cannot be renamed".to_string(),
            ));
        }
        validate_suite_name(new)?;
        self.write("rename_suite", |s, ctx| {
            let id = s.suite_by_name(old)?.id;
            if s.suites.iter().any(|suite| suite.name == new && suite.id != id) {
                return Err(Error::Conflict {
                    entity: "Suite",
                    name: new.to_string(),
                });
            }
            if let Some(suite) = s.suites.iter_mut().find(|suite| suite.id == id) {
                suite.name = new.to_string();
            }
            ctx.notify_suite(id);
            Ok(())
        })
    }

    fn delete_suite(&self, name: &str) -> Result<()> {
        if name == DEFAULT_SUITE {
            return Err(Error::Validation(
                "the default suite cannot be deleted".to_string(),
            ));
        }
        self.write("delete_suite", |s, ctx| {
            let suite = s.suite_by_name(name)?.clone();
            s.suites.retain(|x| x.id != suite.id);
            s.remove_prompts(|p| p.suite_id != suite.id);
            s.remove_models(|m| m.suite_id != suite.id);
            s.profiles.retain(|p| p.suite_id != suite.id);

            if suite.is_current {
                let fallback = s
                    .suites
                    .iter()
                    .find(|x| x.name == DEFAULT_SUITE)
                    .or_else(|| s.suites.iter().min_by_key(|x| x.id))
                    .map(|x| x.id);
                if let Some(id) = fallback {
                    s.set_current(id);
                    ctx.notify_suite(id);
                }
            }
            ctx.notify_global();
            Ok(())
        })
    }

    fn current_suite(&self) -> Result<Suite> {
        self.read(|s| {
            s.suites
                .iter()
                .find(|suite| suite.is_current)
                .cloned()
                .ok_or(Error::NoCurrentSuite)
        })
    }

    fn suite_exists(&self, name: &str) -> Result<bool> {
        self.read(|s| Ok(s.suites.iter().any(|suite| suite.name == name)))
    }

    fn read_profiles(&self, scope: SuiteScope<'_>) -> Result<Vec<Profile>> {
        self.read(|s| {
            let suite_id = s.resolve(scope)?;
            Ok(s.profiles
                .iter()
                .filter(|p| p.suite_id == suite_id)
                .cloned()
                .collect())
        })
    }

    fn add_profile(&self, scope: SuiteScope<'_>, draft: &ProfileDraft) -> Result<Profile> {
        self.write("add_profile", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            let profile = s.insert_profile(suite_id, draft)?;
            ctx.notify_suite(suite_id);
            Ok(profile)
        })
    }

    fn update_profile(&self, id: i64, draft: &ProfileDraft) -> Result<()> {
        validate_label("profile", &draft.name)?;
        self.write("update_profile", |s, ctx| {
            let suite_id = s
                .profiles
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.suite_id)
                .ok_or(Error::ProfileNotFound { id })?;
            if s
                .profiles
                .iter()
                .any(|p| p.suite_id == suite_id && p.name == draft.name && p.id != id)
            {
                return Err(Error::Conflict {
                    entity: "Profile",
                    name: draft.name.clone(),
                });
            }
            if let Some(profile) = s.profiles.iter_mut().find(|p| p.id == id) {
                profile.name.clone_from(&draft.name);
                profile.description.clone_from(&draft.description);
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn delete_profile(&self, id: i64) -> Result<()> {
        self.write("delete_profile", |s, ctx| {
            let suite_id = s
                .profiles
                .iter()
                .find(|p| p.id == id)
                .map(|p| p.suite_id)
                .ok_or(Error::ProfileNotFound { id })?;
            s.remove_profiles(|p| p.id != id);
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn write_profiles(&self, scope: SuiteScope<'_>, profiles: &[ProfileDraft]) -> Result<()> {
        self.write("write_profiles", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            s.remove_profiles(|p| p.suite_id != suite_id);
            for draft in profiles {
                s.insert_profile(suite_id, draft)?;
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn read_prompts(&self, scope: SuiteScope<'_>) -> Result<Vec<Prompt>> {
        self.read(|s| Ok(s.prompts_in(s.resolve(scope)?)))
    }

    fn add_prompt(&self, scope: SuiteScope<'_>, draft: &PromptDraft) -> Result<Prompt> {
        self.write("add_prompt", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            let order = s
                .prompts
                .iter()
                .filter(|p| p.suite_id == suite_id)
                .map(|p| p.display_order + 1)
                .max()
                .unwrap_or(0);
            let id = s.insert_prompt(suite_id, draft, order)?;
            ctx.notify_suite(suite_id);
            s.prompts_in(suite_id)
                .into_iter()
                .find(|p| p.id == id)
                .ok_or(Error::PromptNotFound { id })
        })
    }

    fn update_prompt(&self, id: i64, draft: &PromptDraft) -> Result<()> {
        if draft.text.trim().is_empty() {
            return Err(Error::Validation("prompt text cannot be empty".to_string()));
        }
        self.write("update_prompt", |s, ctx| {
            let suite_id = s.prompt_suite(id).ok_or(Error::PromptNotFound { id })?;
            let profile_id = s.profile_id(suite_id, draft.profile_name())?;
            if let Some(prompt) = s.prompts.iter_mut().find(|p| p.id == id) {
                prompt.text.clone_from(&draft.text);
                prompt.solution.clone_from(&draft.solution);
                prompt.profile_id = profile_id;
                prompt.prompt_type = draft.prompt_type;
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn delete_prompt(&self, id: i64) -> Result<()> {
        self.write("delete_prompts", |s, ctx| {
            let suite_id = s.prompt_suite(id).ok_or(Error::PromptNotFound { id })?;
            s.remove_prompts(|p| p.id != id);
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn reorder_prompts(&self, scope: SuiteScope<'_>, ordered: &[i64]) -> Result<()> {
        self.write("reorder_prompts", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            let existing: Vec<i64> = s.prompts_in(suite_id).iter().map(|p| p.id).collect();
            check_permutation(&existing, ordered)?;
            for (position, id) in (0_i64..).zip(ordered) {
                if let Some(prompt) = s.prompts.iter_mut().find(|p| p.id == *id) {
                    prompt.display_order = position;
                }
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn write_prompts(&self, scope: SuiteScope<'_>, prompts: &[PromptDraft]) -> Result<()> {
        self.write("write_prompts", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            s.remove_prompts(|p| p.suite_id != suite_id);
            for (order, draft) in (0_i64..).zip(prompts) {
                s.insert_prompt(suite_id, draft, order)?;
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn read_models(&self, scope: SuiteScope<'_>) -> Result<Vec<Model>> {
        self.read(|s| {
            let suite_id = s.resolve(scope)?;
            let mut models: Vec<Model> = s
                .models
                .iter()
                .filter(|m| m.suite_id == suite_id)
                .cloned()
                .collect();
            models.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(models)
        })
    }

    fn add_model(&self, scope: SuiteScope<'_>, name: &str) -> Result<Model> {
        self.write("add_model", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            let model = s.insert_model(suite_id, name)?;
            ctx.notify_suite(suite_id);
            Ok(model)
        })
    }

    fn rename_model(&self, id: i64, name: &str) -> Result<()> {
        validate_label("model", name)?;
        self.write("rename_model", |s, ctx| {
            let suite_id = s.model_suite(id).ok_or(Error::ModelNotFound { id })?;
            if s
                .models
                .iter()
                .any(|m| m.suite_id == suite_id && m.name == name && m.id != id)
            {
                return Err(Error::Conflict {
                    entity: "Model",
                    name: name.to_string(),
                });
            }
            if let Some(model) = s.models.iter_mut().find(|m| m.id == id) {
                model.name = name.to_string();
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn delete_model(&self, id: i64) -> Result<()> {
        self.write("delete_model", |s, ctx| {
            let suite_id = s.model_suite(id).ok_or(Error::ModelNotFound { id })?;
            s.remove_models(|m| m.id != id);
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn set_score(&self, model_id: i64, prompt_id: i64, score: i64) -> Result<()> {
        validate_score(score)?;
        self.write("set_score", |s, ctx| {
            let suite_id = match (s.model_suite(model_id), s.prompt_suite(prompt_id)) {
                (Some(m), Some(p)) if m == p => m,
                (Some(_), Some(_)) => {
                    return Err(Error::Validation(format!(
                        "model {model_id} and prompt {prompt_id} belong to different suites"
                    )));
                }
                _ => {
                    return Err(Error::ForeignKey(format!(
                        "Score model {model_id} / prompt {prompt_id}"
                    )));
                }
            };
            match s
                .scores
                .iter_mut()
                .find(|x| x.model_id == model_id && x.prompt_id == prompt_id)
            {
                Some(existing) => existing.score = score,
                None => {
                    let id = s.next_id();
                    s.scores.push(Score {
                        id,
                        model_id,
                        prompt_id,
                        score,
                    });
                }
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn read_scores(&self, scope: SuiteScope<'_>) -> Result<Vec<Score>> {
        self.read(|s| {
            let suite_id = s.resolve(scope)?;
            let mut scores: Vec<Score> = s
                .scores
                .iter()
                .filter(|x| s.model_suite(x.model_id) == Some(suite_id))
                .cloned()
                .collect();
            scores.sort_by_key(|x| (x.model_id, x.prompt_id));
            Ok(scores)
        })
    }

    fn write_results(&self, scope: SuiteScope<'_>, results: &ResultsTable) -> Result<()> {
        self.write("write_results", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            let prompt_ids: Vec<i64> = s.prompts_in(suite_id).iter().map(|p| p.id).collect();
            let suite_models: Vec<i64> = s
                .models
                .iter()
                .filter(|m| m.suite_id == suite_id)
                .map(|m| m.id)
                .collect();
            s.scores.retain(|x| !suite_models.contains(&x.model_id));

            for (name, scores) in results {
                let existing = s
                    .models
                    .iter()
                    .find(|m| m.suite_id == suite_id && &m.name == name)
                    .map(|m| m.id);
                let model_id = match existing {
                    Some(id) => id,
                    None => s.insert_model(suite_id, name)?.id,
                };
                for (&prompt_id, &score) in prompt_ids.iter().zip(scores) {
                    validate_score(score)?;
                    let id = s.next_id();
                    s.scores.push(Score {
                        id,
                        model_id,
                        prompt_id,
                        score,
                    });
                }
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn get_setting(&self, key: &str) -> Result<Option<String>> {
        self.read(|s| Ok(s.settings.get(key).cloned()))
    }

    fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(Error::Validation("setting key cannot be empty".to_string()));
        }
        if key.starts_with(API_KEY_PREFIX) {
            return Err(Error::Validation(format!(
                "'{key}' is a credential; use set_api_key"
            )));
        }
        self.write("set_setting", |s, _ctx| {
            s.settings.insert(key.to_string(), value.to_string());
            Ok(())
        })
    }

    fn set_api_key(&self, provider: &str, plaintext: &str) -> Result<()> {
        validate_provider(provider)?;
        let key = format!("{API_KEY_PREFIX}{provider}");
        if plaintext.is_empty() {
            return self.write("clear_api_key", |s, _ctx| {
                s.settings.remove(&key);
                Ok(())
            });
        }
        let sealed = self.vault.encrypt(plaintext)?;
        self.write("set_api_key", |s, _ctx| {
            s.settings.insert(key, sealed);
            Ok(())
        })
    }

    fn get_api_key(&self, provider: &str) -> Result<String> {
        validate_provider(provider)?;
        let key = format!("{API_KEY_PREFIX}{provider}");
        let sealed = self.read(|s| Ok(s.settings.get(&key).cloned()))?;
        match sealed {
            Some(sealed) => self.vault.decrypt(&sealed),
            None => Ok(String::new()),
        }
    }

    fn masked_api_keys(&self) -> Result<BTreeMap<String, String>> {
        self.read(|s| {
            Ok(s.settings
                .iter()
                .filter_map(|(key, sealed)| {
                    let provider = key.strip_prefix(API_KEY_PREFIX)?;
                    let shown = self
                        .vault
                        .decrypt(sealed)
                        .map_or_else(|_| MASK_ERROR.to_string(), |plain| mask_key(&plain));
                    Some((provider.to_string(), shown))
                })
                .collect())
        })
    }

    fn notify_changed(&self) {
        self.notifier.notify(ChangeEvent::new("notify_changed", None));
    }

    fn move_prompt(&self, scope: SuiteScope<'_>, from: usize, to: usize) -> Result<()> {
        self.write("move_prompt", |s, ctx| {
            let suite_id = s.resolve(scope)?;
            let ids: Vec<i64> = s.prompts_in(suite_id).iter().map(|p| p.id).collect();
            let moved = move_within(&ids, from, to)?;
            for (position, id) in (0_i64..).zip(&moved) {
                if let Some(prompt) = s.prompts.iter_mut().find(|p| p.id == *id) {
                    prompt.display_order = position;
                }
            }
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    fn read_results(&self, scope: SuiteScope<'_>) -> Result<ResultsTable> {
        self.read(|s| {
            let suite_id = s.resolve(scope)?;
            let prompts = s.prompts_in(suite_id);
            let mut models: Vec<Model> = s
                .models
                .iter()
                .filter(|m| m.suite_id == suite_id)
                .cloned()
                .collect();
            models.sort_by(|a, b| a.name.cmp(&b.name));
            let scores: Vec<Score> = s
                .scores
                .iter()
                .filter(|x| s.model_suite(x.model_id) == Some(suite_id))
                .cloned()
                .collect();
            Ok(build_results(&prompts, &models, &scores))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::notify::BroadcastNotifier;

    fn texts(store: &MemoryStore) -> Vec<String> {
        store
            .read_prompts(SuiteScope::Current)
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect()
    }

    #[test]
    fn test_seeded_with_default() {
        let store = MemoryStore::new();
        assert_eq!(store.current_suite().unwrap().name, DEFAULT_SUITE);
        assert_eq!(store.list_suites().unwrap().len(), 1);
    }

    #[test]
    fn test_failed_bulk_write_leaves_state_untouched() {
        let store = MemoryStore::new();
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("keep")).unwrap();
        let err = store
            .write_prompts(
                SuiteScope::Current,
                &[PromptDraft::new("a"), PromptDraft::new("b").with_profile("ghost")],
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(texts(&store), vec!["keep"]);
    }

    #[test]
    fn test_profile_delete_detaches() {
        let store = MemoryStore::new();
        let profile = store
            .add_profile(SuiteScope::Current, &ProfileDraft::new("Math", ""))
            .unwrap();
        store
            .add_prompt(SuiteScope::Current, &PromptDraft::new("1+1").with_profile("Math"))
            .unwrap();
        store.delete_profile(profile.id).unwrap();

        let prompts = store.read_prompts(SuiteScope::Current).unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].profile_id.is_none());
    }

    #[test]
    fn test_delete_current_suite_cascades_and_reselects() {
        let store = MemoryStore::new();
        store.create_suite("x").unwrap();
        store.select_suite("x").unwrap();
        let m = store.add_model(SuiteScope::Current, "m").unwrap();
        let p = store.add_prompt(SuiteScope::Current, &PromptDraft::new("p")).unwrap();
        store.set_score(m.id, p.id, 10).unwrap();

        store.delete_suite("x").unwrap();
        assert_eq!(store.current_suite().unwrap().name, DEFAULT_SUITE);
        assert!(store.read_scores(SuiteScope::Current).unwrap().is_empty());
        assert_eq!(
            store.read_prompts(SuiteScope::Named("x")).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_notifies_after_mutation_only() {
        let notifier = Arc::new(BroadcastNotifier::default());
        let mut rx = notifier.subscribe();
        let store = MemoryStore::new().with_notifier(notifier);

        assert!(store.select_suite("ghost").is_err());
        assert!(rx.try_recv().is_err());

        store.add_model(SuiteScope::Current, "m").unwrap();
        assert_eq!(rx.try_recv().unwrap().op, "add_model");
    }

    const KEY: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

    #[test]
    fn test_api_keys() {
        let store = MemoryStore::new().with_vault(SecretVault::new(Some(KEY)));
        store.set_api_key("openai", "sk-test-abcdefgh1234").unwrap();
        assert_eq!(store.get_api_key("openai").unwrap(), "sk-test-abcdefgh1234");
        assert_eq!(store.masked_api_keys().unwrap()["openai"], "sk-...1234");
    }

    #[test]
    fn test_new_store_has_no_secret() {
        let store = MemoryStore::new();
        assert_eq!(
            store.set_api_key("openai", "x").unwrap_err().kind(),
            ErrorKind::Encryption
        );
        assert_eq!(store.get_api_key("openai").unwrap(), "");
    }

    #[test]
    fn test_masked_keys_without_secret() {
        let store = MemoryStore::new();
        assert!(store.masked_api_keys().unwrap().is_empty());

        let keyed = MemoryStore::new().with_vault(SecretVault::new(Some(KEY)));
        keyed.set_api_key("openai", "sk-test-abcdefgh1234").unwrap();
        let locked = keyed.with_vault(SecretVault::disabled());

        let masked = locked.masked_api_keys().unwrap();
        assert_eq!(masked["openai"], MASK_ERROR);
        assert_eq!(
            locked.get_api_key("openai").unwrap_err().kind(),
            ErrorKind::Encryption
        );
    }

    #[test]
    fn test_move_prompt_and_results() {
        let store = MemoryStore::new();
        let a = store.add_prompt(SuiteScope::Current, &PromptDraft::new("a")).unwrap();
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("b")).unwrap();
        let m = store.add_model(SuiteScope::Current, "m").unwrap();
        store.set_score(m.id, a.id, 40).unwrap();

        store.move_prompt(SuiteScope::Current, 0, 2).unwrap();
        assert_eq!(texts(&store), vec!["b", "a"]);
        assert_eq!(store.read_results(SuiteScope::Current).unwrap()["m"], vec![0, 40]);
        assert_eq!(
            store.move_prompt(SuiteScope::Current, 5, 0).unwrap_err().kind(),
            ErrorKind::Validation
        );
    }
}
