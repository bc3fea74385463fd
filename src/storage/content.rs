//! Profiles, prompts, models and scores.
//!
//! Every collection is suite-scoped. Referential actions do the cascading:
//! deleting a profile nulls `prompts.profile_id`, deleting a model or prompt
//! removes its scores and responses.

use crate::error::{Error, Result};
use crate::model::{
    Model, Profile, ProfileDraft, Prompt, PromptDraft, ResultsTable, Score, SuiteScope,
};
use crate::storage::ordering::next_display_order;
use crate::storage::sqlite::{SqliteStore, resolve_suite};
use crate::storage::store::build_results;
use crate::validate::{normalize_prompt_type, validate_label, validate_score};
use rusqlite::{Connection, OptionalExtension, Row};
use std::collections::HashMap;
use tracing::debug;

const PROMPT_COLUMNS: &str = "p.id, p.text, p.solution, p.profile_id, pr.name, p.suite_id, \
                              p.display_order, p.type";

fn map_profile(row: &Row<'_>) -> rusqlite::Result<Profile> {
    Ok(Profile {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        suite_id: row.get(3)?,
    })
}

fn map_prompt(row: &Row<'_>) -> rusqlite::Result<Prompt> {
    let prompt_type: String = row.get(7)?;
    Ok(Prompt {
        id: row.get(0)?,
        text: row.get(1)?,
        solution: row.get(2)?,
        profile_id: row.get(3)?,
        profile_name: row.get(4)?,
        suite_id: row.get(5)?,
        display_order: row.get(6)?,
        prompt_type: normalize_prompt_type(&prompt_type).unwrap_or_default(),
    })
}

fn map_model(row: &Row<'_>) -> rusqlite::Result<Model> {
    Ok(Model {
        id: row.get(0)?,
        name: row.get(1)?,
        suite_id: row.get(2)?,
    })
}

/// Suite owning row `id` of `table`, if the row exists.
fn owning_suite(conn: &Connection, table: &str, id: i64) -> rusqlite::Result<Option<i64>> {
    conn.query_row(
        &format!("SELECT suite_id FROM {table} WHERE id = ?1"),
        [id],
        |row| row.get(0),
    )
    .optional()
}

/// Resolve a profile name inside a suite. Blank names mean "no profile".
fn resolve_profile(conn: &Connection, suite_id: i64, name: Option<&str>) -> Result<Option<i64>> {
    let Some(name) = name else {
        return Ok(None);
    };
    conn.query_row(
        "SELECT id FROM profiles WHERE suite_id = ?1 AND name = ?2",
        rusqlite::params![suite_id, name],
        |row| row.get(0),
    )
    .optional()?
    .map(Some)
    .ok_or_else(|| Error::ProfileNameNotFound {
        name: name.to_string(),
    })
}

fn check_prompt_text(draft: &PromptDraft) -> Result<()> {
    if draft.text.trim().is_empty() {
        return Err(Error::Validation("prompt text cannot be empty".to_string()));
    }
    Ok(())
}

fn insert_profile(conn: &Connection, suite_id: i64, draft: &ProfileDraft) -> Result<Profile> {
    validate_label("profile", &draft.name)?;
    conn.execute(
        "INSERT INTO profiles (name, description, suite_id) VALUES (?1, ?2, ?3)",
        rusqlite::params![draft.name, draft.description, suite_id],
    )
    .map_err(|e| Error::from_constraint(e, "Profile", &draft.name))?;
    Ok(Profile {
        id: conn.last_insert_rowid(),
        name: draft.name.clone(),
        description: draft.description.clone(),
        suite_id,
    })
}

fn insert_prompt(
    conn: &Connection,
    suite_id: i64,
    draft: &PromptDraft,
    display_order: i64,
) -> Result<i64> {
    check_prompt_text(draft)?;
    let profile_id = resolve_profile(conn, suite_id, draft.profile_name())?;
    conn.execute(
        "INSERT INTO prompts (text, solution, profile_id, suite_id, display_order, type)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        rusqlite::params![
            draft.text,
            draft.solution,
            profile_id,
            suite_id,
            display_order,
            draft.prompt_type.as_str()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn insert_model(conn: &Connection, suite_id: i64, name: &str) -> Result<Model> {
    validate_label("model", name)?;
    conn.execute(
        "INSERT INTO models (name, suite_id) VALUES (?1, ?2)",
        rusqlite::params![name, suite_id],
    )
    .map_err(|e| Error::from_constraint(e, "Model", name))?;
    Ok(Model {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        suite_id,
    })
}

fn get_prompt_in(conn: &Connection, id: i64) -> Result<Prompt> {
    conn.query_row(
        &format!(
            "SELECT {PROMPT_COLUMNS} FROM prompts p
             LEFT JOIN profiles pr ON p.profile_id = pr.id
             WHERE p.id = ?1"
        ),
        [id],
        map_prompt,
    )
    .optional()?
    .ok_or(Error::PromptNotFound { id })
}

fn read_prompts_in(conn: &Connection, suite_id: i64) -> Result<Vec<Prompt>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROMPT_COLUMNS} FROM prompts p
         LEFT JOIN profiles pr ON p.profile_id = pr.id
         WHERE p.suite_id = ?1
         ORDER BY p.display_order, p.id"
    ))?;
    let prompts = stmt
        .query_map([suite_id], map_prompt)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(prompts)
}

fn read_models_in(conn: &Connection, suite_id: i64) -> Result<Vec<Model>> {
    let mut stmt =
        conn.prepare("SELECT id, name, suite_id FROM models WHERE suite_id = ?1 ORDER BY name")?;
    let models = stmt
        .query_map([suite_id], map_model)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(models)
}

fn read_scores_in(conn: &Connection, suite_id: i64) -> Result<Vec<Score>> {
    let mut stmt = conn.prepare(
        "SELECT s.id, s.model_id, s.prompt_id, s.score FROM scores s
         INNER JOIN models m ON s.model_id = m.id
         WHERE m.suite_id = ?1
         ORDER BY s.model_id, s.prompt_id",
    )?;
    let scores = stmt
        .query_map([suite_id], |row| {
            Ok(Score {
                id: row.get(0)?,
                model_id: row.get(1)?,
                prompt_id: row.get(2)?,
                score: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(scores)
}

impl SqliteStore {
    // ==================
    // Profile Operations
    // ==================

    /// Profiles of a suite in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or the query fails.
    pub fn read_profiles(&self, scope: SuiteScope<'_>) -> Result<Vec<Profile>> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;
        let mut stmt = conn.prepare(
            "SELECT id, name, description, suite_id FROM profiles
             WHERE suite_id = ?1 ORDER BY id",
        )?;
        let profiles = stmt
            .query_map([suite_id], map_profile)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(profiles)
    }

    /// # Errors
    ///
    /// `Conflict` if the suite already has a profile with this name.
    pub fn add_profile(&self, scope: SuiteScope<'_>, draft: &ProfileDraft) -> Result<Profile> {
        self.mutate("add_profile", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            let profile = insert_profile(tx, suite_id, draft)?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, profile = %profile.name, "Added profile");
            Ok(profile)
        })
    }

    /// Rename a profile or change its description.
    ///
    /// # Errors
    ///
    /// `ProfileNotFound` if unknown, `Conflict` if the new name is taken.
    pub fn update_profile(&self, id: i64, draft: &ProfileDraft) -> Result<()> {
        validate_label("profile", &draft.name)?;
        self.mutate("update_profile", |tx, ctx| {
            let suite_id =
                owning_suite(tx, "profiles", id)?.ok_or(Error::ProfileNotFound { id })?;
            tx.execute(
                "UPDATE profiles SET name = ?1, description = ?2 WHERE id = ?3",
                rusqlite::params![draft.name, draft.description, id],
            )
            .map_err(|e| Error::from_constraint(e, "Profile", &draft.name))?;
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    /// Delete a profile. Its prompts stay, with the profile cleared.
    ///
    /// # Errors
    ///
    /// `ProfileNotFound` if unknown.
    pub fn delete_profile(&self, id: i64) -> Result<()> {
        self.mutate("delete_profile", |tx, ctx| {
            let suite_id =
                owning_suite(tx, "profiles", id)?.ok_or(Error::ProfileNotFound { id })?;
            tx.execute("DELETE FROM profiles WHERE id = ?1", [id])?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, profile_id = id, "Deleted profile");
            Ok(())
        })
    }

    /// Replace every profile of a suite.
    ///
    /// Existing prompts are detached from the old profiles.
    ///
    /// # Errors
    ///
    /// `Conflict` on duplicate names in `profiles`; nothing is applied.
    pub fn write_profiles(&self, scope: SuiteScope<'_>, profiles: &[ProfileDraft]) -> Result<()> {
        self.mutate("write_profiles", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            tx.execute("DELETE FROM profiles WHERE suite_id = ?1", [suite_id])?;
            for draft in profiles {
                insert_profile(tx, suite_id, draft)?;
            }
            ctx.notify_suite(suite_id);
            debug!(suite_id, count = profiles.len(), "Replaced profiles");
            Ok(())
        })
    }

    // ==================
    // Prompt Operations
    // ==================

    /// Prompts of a suite in display order, with profile names resolved.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or the query fails.
    pub fn read_prompts(&self, scope: SuiteScope<'_>) -> Result<Vec<Prompt>> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;
        read_prompts_in(&conn, suite_id)
    }

    /// # Errors
    ///
    /// `PromptNotFound` if unknown.
    pub fn get_prompt(&self, id: i64) -> Result<Prompt> {
        get_prompt_in(&self.conn(), id)
    }

    /// Append a prompt to the end of a suite.
    ///
    /// # Errors
    ///
    /// `Validation` for empty text, `ProfileNameNotFound` if the named
    /// profile is not in the suite.
    pub fn add_prompt(&self, scope: SuiteScope<'_>, draft: &PromptDraft) -> Result<Prompt> {
        self.mutate("add_prompt", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            let order = next_display_order(tx, suite_id)?;
            let id = insert_prompt(tx, suite_id, draft, order)?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, prompt_id = id, order, "Added prompt");
            get_prompt_in(tx, id)
        })
    }

    /// Replace a prompt's text, solution, profile and type. Its position is kept.
    ///
    /// # Errors
    ///
    /// `PromptNotFound`, `Validation` or `ProfileNameNotFound`.
    pub fn update_prompt(&self, id: i64, draft: &PromptDraft) -> Result<()> {
        check_prompt_text(draft)?;
        self.mutate("update_prompt", |tx, ctx| {
            let suite_id = owning_suite(tx, "prompts", id)?.ok_or(Error::PromptNotFound { id })?;
            let profile_id = resolve_profile(tx, suite_id, draft.profile_name())?;
            tx.execute(
                "UPDATE prompts SET text = ?1, solution = ?2, profile_id = ?3, type = ?4
                 WHERE id = ?5",
                rusqlite::params![
                    draft.text,
                    draft.solution,
                    profile_id,
                    draft.prompt_type.as_str(),
                    id
                ],
            )?;
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    /// Delete a prompt and its scores. Remaining prompts keep their order.
    ///
    /// # Errors
    ///
    /// `PromptNotFound` if unknown.
    pub fn delete_prompt(&self, id: i64) -> Result<()> {
        self.delete_prompts(&[id])
    }

    /// Delete several prompts at once; all or nothing.
    ///
    /// # Errors
    ///
    /// `PromptNotFound` for the first unknown id; nothing is deleted.
    pub fn delete_prompts(&self, ids: &[i64]) -> Result<()> {
        self.mutate("delete_prompts", |tx, ctx| {
            for &id in ids {
                let suite_id =
                    owning_suite(tx, "prompts", id)?.ok_or(Error::PromptNotFound { id })?;
                tx.execute("DELETE FROM prompts WHERE id = ?1", [id])?;
                ctx.notify_suite(suite_id);
            }
            debug!(count = ids.len(), "Deleted prompts");
            Ok(())
        })
    }

    /// Replace every prompt of a suite, in the given order.
    ///
    /// Scores and responses for the old prompts are removed with them.
    ///
    /// # Errors
    ///
    /// `Validation` or `ProfileNameNotFound` for any draft; nothing is applied.
    pub fn write_prompts(&self, scope: SuiteScope<'_>, prompts: &[PromptDraft]) -> Result<()> {
        self.mutate("write_prompts", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            tx.execute("DELETE FROM prompts WHERE suite_id = ?1", [suite_id])?;
            for (order, draft) in (0_i64..).zip(prompts) {
                insert_prompt(tx, suite_id, draft, order)?;
            }
            ctx.notify_suite(suite_id);
            debug!(suite_id, count = prompts.len(), "Replaced prompts");
            Ok(())
        })
    }

    // ==================
    // Model Operations
    // ==================

    /// Models of a suite ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or the query fails.
    pub fn read_models(&self, scope: SuiteScope<'_>) -> Result<Vec<Model>> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;
        read_models_in(&conn, suite_id)
    }

    /// # Errors
    ///
    /// `Conflict` if the suite already has a model with this name.
    pub fn add_model(&self, scope: SuiteScope<'_>, name: &str) -> Result<Model> {
        self.mutate("add_model", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            let model = insert_model(tx, suite_id, name)?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, model = name, "Added model");
            Ok(model)
        })
    }

    /// # Errors
    ///
    /// `ModelNotFound` if unknown, `Conflict` if the name is taken.
    pub fn rename_model(&self, id: i64, name: &str) -> Result<()> {
        validate_label("model", name)?;
        self.mutate("rename_model", |tx, ctx| {
            let suite_id = owning_suite(tx, "models", id)?.ok_or(Error::ModelNotFound { id })?;
            tx.execute(
                "UPDATE models SET name = ?1 WHERE id = ?2",
                rusqlite::params![name, id],
            )
            .map_err(|e| Error::from_constraint(e, "Model", name))?;
            ctx.notify_suite(suite_id);
            Ok(())
        })
    }

    /// Delete a model with its scores and responses.
    ///
    /// # Errors
    ///
    /// `ModelNotFound` if unknown.
    pub fn delete_model(&self, id: i64) -> Result<()> {
        self.mutate("delete_model", |tx, ctx| {
            let suite_id = owning_suite(tx, "models", id)?.ok_or(Error::ModelNotFound { id })?;
            tx.execute("DELETE FROM models WHERE id = ?1", [id])?;
            ctx.notify_suite(suite_id);
            debug!(suite_id, model_id = id, "Deleted model");
            Ok(())
        })
    }

    // ==================
    // Score Operations
    // ==================

    /// Upsert the score of a model on a prompt.
    ///
    /// # Errors
    ///
    /// `Validation` for an out-of-range score or a model and prompt from
    /// different suites, `ForeignKey` if either id does not exist.
    pub fn set_score(&self, model_id: i64, prompt_id: i64, score: i64) -> Result<()> {
        validate_score(score)?;
        self.mutate("set_score", |tx, ctx| {
            let model_suite = owning_suite(tx, "models", model_id)?;
            let prompt_suite = owning_suite(tx, "prompts", prompt_id)?;
            if let (Some(m), Some(p)) = (model_suite, prompt_suite) {
                if m != p {
                    return Err(Error::Validation(format!(
                        "model {model_id} and prompt {prompt_id} belong to different suites"
                    )));
                }
            }

            tx.execute(
                "INSERT INTO scores (model_id, prompt_id, score) VALUES (?1, ?2, ?3)
                 ON CONFLICT(model_id, prompt_id) DO UPDATE SET score = excluded.score",
                rusqlite::params![model_id, prompt_id, score],
            )
            .map_err(|e| {
                Error::from_constraint(e, "Score", &format!("model {model_id} / prompt {prompt_id}"))
            })?;

            if let Some(suite_id) = model_suite {
                ctx.notify_suite(suite_id);
            }
            Ok(())
        })
    }

    /// Every score recorded in a suite.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or the query fails.
    pub fn read_scores(&self, scope: SuiteScope<'_>) -> Result<Vec<Score>> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;
        read_scores_in(&conn, suite_id)
    }

    /// Model name → scores aligned with prompt read order. Missing scores are 0.
    ///
    /// The suite is resolved once and all three reads share one read
    /// transaction, so a concurrent `select_suite` cannot mix two suites.
    ///
    /// # Errors
    ///
    /// Returns an error if the scope does not resolve or a query fails.
    pub fn read_results(&self, scope: SuiteScope<'_>) -> Result<ResultsTable> {
        let conn = self.conn();
        let tx = conn.unchecked_transaction()?;
        let suite_id = resolve_suite(&tx, scope)?;
        let prompts = read_prompts_in(&tx, suite_id)?;
        let models = read_models_in(&tx, suite_id)?;
        let scores = read_scores_in(&tx, suite_id)?;
        Ok(build_results(&prompts, &models, &scores))
    }

    /// Replace every score in a suite from a results table.
    ///
    /// Unknown models are created. Position `i` of each row scores the
    /// `i`-th prompt in read order; values past the last prompt are ignored.
    /// An empty table clears all scores.
    ///
    /// # Errors
    ///
    /// `Validation` for an out-of-range score; nothing is applied.
    pub fn write_results(&self, scope: SuiteScope<'_>, results: &ResultsTable) -> Result<()> {
        self.mutate("write_results", |tx, ctx| {
            let suite_id = resolve_suite(tx, scope)?;
            let prompt_ids: Vec<i64> =
                read_prompts_in(tx, suite_id)?.into_iter().map(|p| p.id).collect();

            tx.execute(
                "DELETE FROM scores WHERE model_id IN (SELECT id FROM models WHERE suite_id = ?1)",
                [suite_id],
            )?;

            let mut models: HashMap<String, i64> = HashMap::new();
            {
                let mut stmt = tx.prepare("SELECT name, id FROM models WHERE suite_id = ?1")?;
                let rows = stmt.query_map([suite_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
                for row in rows {
                    let (name, id) = row?;
                    models.insert(name, id);
                }
            }

            let mut insert = tx.prepare(
                "INSERT INTO scores (model_id, prompt_id, score) VALUES (?1, ?2, ?3)",
            )?;
            for (name, scores) in results {
                let model_id = match models.get(name) {
                    Some(id) => *id,
                    None => {
                        let id = insert_model(tx, suite_id, name)?.id;
                        models.insert(name.clone(), id);
                        id
                    }
                };
                for (&prompt_id, &score) in prompt_ids.iter().zip(scores) {
                    validate_score(score)?;
                    insert.execute(rusqlite::params![model_id, prompt_id, score])?;
                }
            }

            ctx.notify_suite(suite_id);
            debug!(suite_id, models = results.len(), "Replaced results");
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::model::PromptType;

    fn store_with_profiles(names: &[&str]) -> SqliteStore {
        let store = SqliteStore::open_memory().unwrap();
        for name in names {
            store
                .add_profile(SuiteScope::Current, &ProfileDraft::new(*name, ""))
                .unwrap();
        }
        store
    }

    fn texts(store: &SqliteStore, scope: SuiteScope<'_>) -> Vec<String> {
        store
            .read_prompts(scope)
            .unwrap()
            .into_iter()
            .map(|p| p.text)
            .collect()
    }

    #[test]
    fn test_profile_crud() {
        let store = store_with_profiles(&["Math"]);
        let profiles = store.read_profiles(SuiteScope::Current).unwrap();
        assert_eq!(profiles.len(), 1);

        store
            .update_profile(profiles[0].id, &ProfileDraft::new("Algebra", "x and y"))
            .unwrap();
        let profiles = store.read_profiles(SuiteScope::Current).unwrap();
        assert_eq!(profiles[0].name, "Algebra");
        assert_eq!(profiles[0].description, "x and y");

        store.delete_profile(profiles[0].id).unwrap();
        assert!(store.read_profiles(SuiteScope::Current).unwrap().is_empty());
        assert_eq!(
            store.delete_profile(profiles[0].id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_duplicate_profile_is_conflict() {
        let store = store_with_profiles(&["Math"]);
        let err = store
            .add_profile(SuiteScope::Current, &ProfileDraft::new("Math", ""))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_same_profile_name_in_two_suites() {
        let store = store_with_profiles(&["Math"]);
        store.create_suite("other").unwrap();
        store
            .add_profile(SuiteScope::Named("other"), &ProfileDraft::new("Math", ""))
            .unwrap();
    }

    #[test]
    fn test_delete_profile_detaches_prompts() {
        let store = store_with_profiles(&["Math"]);
        for text in ["1+1", "2+2"] {
            store
                .add_prompt(SuiteScope::Current, &PromptDraft::new(text).with_profile("Math"))
                .unwrap();
        }
        let profile_id = store.read_profiles(SuiteScope::Current).unwrap()[0].id;

        store.delete_profile(profile_id).unwrap();

        let prompts = store.read_prompts(SuiteScope::Current).unwrap();
        assert_eq!(prompts.len(), 2);
        assert!(prompts.iter().all(|p| p.profile_id.is_none() && p.profile_name.is_none()));
    }

    #[test]
    fn test_add_prompt_resolves_profile() {
        let store = store_with_profiles(&["Math"]);
        let prompt = store
            .add_prompt(
                SuiteScope::Current,
                &PromptDraft::new("What is 2+2?")
                    .with_solution("4")
                    .with_profile("Math")
                    .with_type(PromptType::Objective),
            )
            .unwrap();
        assert_eq!(prompt.profile_name.as_deref(), Some("Math"));
        assert_eq!(prompt.display_order, 0);

        let err = store
            .add_prompt(SuiteScope::Current, &PromptDraft::new("x").with_profile("Art"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store
            .add_prompt(SuiteScope::Current, &PromptDraft::new("  "))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_update_prompt() {
        let store = store_with_profiles(&["Math"]);
        let prompt = store
            .add_prompt(SuiteScope::Current, &PromptDraft::new("draft"))
            .unwrap();

        store
            .update_prompt(
                prompt.id,
                &PromptDraft::new("final")
                    .with_profile("Math")
                    .with_type(PromptType::Creative),
            )
            .unwrap();

        let updated = store.get_prompt(prompt.id).unwrap();
        assert_eq!(updated.text, "final");
        assert_eq!(updated.profile_name.as_deref(), Some("Math"));
        assert_eq!(updated.prompt_type, PromptType::Creative);
        assert_eq!(updated.display_order, prompt.display_order);
    }

    #[test]
    fn test_delete_keeps_relative_order() {
        let store = SqliteStore::open_memory().unwrap();
        let mut ids = Vec::new();
        for text in ["A", "B", "C", "D"] {
            ids.push(store.add_prompt(SuiteScope::Current, &PromptDraft::new(text)).unwrap().id);
        }
        store.delete_prompt(ids[1]).unwrap();
        assert_eq!(texts(&store, SuiteScope::Current), vec!["A", "C", "D"]);

        let next = store.add_prompt(SuiteScope::Current, &PromptDraft::new("E")).unwrap();
        assert_eq!(next.display_order, 4);
    }

    #[test]
    fn test_bulk_delete_is_atomic() {
        let store = SqliteStore::open_memory().unwrap();
        let a = store.add_prompt(SuiteScope::Current, &PromptDraft::new("A")).unwrap();
        let err = store.delete_prompts(&[a.id, 999]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(texts(&store, SuiteScope::Current), vec!["A"]);
    }

    #[test]
    fn test_reorder() {
        let store = SqliteStore::open_memory().unwrap();
        let ids: Vec<i64> = ["A", "B", "C"]
            .iter()
            .map(|t| store.add_prompt(SuiteScope::Current, &PromptDraft::new(*t)).unwrap().id)
            .collect();

        store
            .reorder_prompts(SuiteScope::Current, &[ids[2], ids[0], ids[1]])
            .unwrap();
        assert_eq!(texts(&store, SuiteScope::Current), vec!["C", "A", "B"]);

        let err = store
            .reorder_prompts(SuiteScope::Current, &[ids[0], ids[1]])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_reorder_rejects_foreign_prompt() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("other").unwrap();
        let mine = store.add_prompt(SuiteScope::Current, &PromptDraft::new("mine")).unwrap();
        let theirs = store
            .add_prompt(SuiteScope::Named("other"), &PromptDraft::new("theirs"))
            .unwrap();

        let err = store
            .reorder_prompts(SuiteScope::Current, &[theirs.id, mine.id])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn test_write_prompts_is_atomic() {
        let store = store_with_profiles(&["Math"]);
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("keep")).unwrap();

        let err = store
            .write_prompts(
                SuiteScope::Current,
                &[PromptDraft::new("new"), PromptDraft::new("bad").with_profile("Ghost")],
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(texts(&store, SuiteScope::Current), vec!["keep"]);

        store
            .write_prompts(
                SuiteScope::Current,
                &[PromptDraft::new("one").with_profile("Math"), PromptDraft::new("two")],
            )
            .unwrap();
        assert_eq!(texts(&store, SuiteScope::Current), vec!["one", "two"]);
    }

    #[test]
    fn test_write_profiles_replaces() {
        let store = store_with_profiles(&["Old"]);
        store
            .write_profiles(
                SuiteScope::Current,
                &[ProfileDraft::new("A", ""), ProfileDraft::new("B", "")],
            )
            .unwrap();
        let names: Vec<_> = store
            .read_profiles(SuiteScope::Current)
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["A", "B"]);

        let err = store
            .write_profiles(
                SuiteScope::Current,
                &[ProfileDraft::new("C", ""), ProfileDraft::new("C", "")],
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(store.read_profiles(SuiteScope::Current).unwrap().len(), 2);
    }

    #[test]
    fn test_model_crud() {
        let store = SqliteStore::open_memory().unwrap();
        let model = store.add_model(SuiteScope::Current, "gpt").unwrap();
        assert_eq!(
            store.add_model(SuiteScope::Current, "gpt").unwrap_err().kind(),
            ErrorKind::Conflict
        );

        store.rename_model(model.id, "claude").unwrap();
        assert_eq!(store.read_models(SuiteScope::Current).unwrap()[0].name, "claude");

        store.delete_model(model.id).unwrap();
        assert!(store.read_models(SuiteScope::Current).unwrap().is_empty());
        assert_eq!(
            store.delete_model(model.id).unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_scores_cascade_with_parents() {
        let store = SqliteStore::open_memory().unwrap();
        let model = store.add_model(SuiteScope::Current, "m").unwrap();
        let p1 = store.add_prompt(SuiteScope::Current, &PromptDraft::new("1")).unwrap();
        let p2 = store.add_prompt(SuiteScope::Current, &PromptDraft::new("2")).unwrap();
        store.set_score(model.id, p1.id, 80).unwrap();
        store.set_score(model.id, p2.id, 20).unwrap();
        store.set_score(model.id, p2.id, 30).unwrap();
        assert_eq!(store.read_scores(SuiteScope::Current).unwrap().len(), 2);

        store.delete_prompt(p1.id).unwrap();
        let scores = store.read_scores(SuiteScope::Current).unwrap();
        assert_eq!(scores.len(), 1);
        assert_eq!(scores[0].score, 30);

        store.delete_model(model.id).unwrap();
        assert!(store.read_scores(SuiteScope::Current).unwrap().is_empty());
    }

    #[test]
    fn test_set_score_errors() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("other").unwrap();
        let model = store.add_model(SuiteScope::Current, "m").unwrap();
        let prompt = store.add_prompt(SuiteScope::Current, &PromptDraft::new("p")).unwrap();
        let foreign = store
            .add_prompt(SuiteScope::Named("other"), &PromptDraft::new("q"))
            .unwrap();

        assert_eq!(
            store.set_score(model.id, prompt.id, 101).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            store.set_score(model.id, foreign.id, 50).unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            store.set_score(model.id, 9999, 50).unwrap_err().kind(),
            ErrorKind::ForeignKeyViolation
        );
    }

    #[test]
    fn test_write_results_replaces_and_creates_models() {
        let store = SqliteStore::open_memory().unwrap();
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("1")).unwrap();
        store.add_prompt(SuiteScope::Current, &PromptDraft::new("2")).unwrap();

        let mut results = ResultsTable::new();
        results.insert("alpha".to_string(), vec![10, 20, 99]);
        store.write_results(SuiteScope::Current, &results).unwrap();

        assert_eq!(store.read_models(SuiteScope::Current).unwrap().len(), 1);
        assert_eq!(store.read_scores(SuiteScope::Current).unwrap().len(), 2);

        store
            .write_results(SuiteScope::Current, &ResultsTable::new())
            .unwrap();
        assert!(store.read_scores(SuiteScope::Current).unwrap().is_empty());
        assert_eq!(store.read_models(SuiteScope::Current).unwrap().len(), 1);
    }

    #[test]
    fn test_suite_stats() {
        let store = store_with_profiles(&["Math"]);
        let model = store.add_model(SuiteScope::Current, "m").unwrap();
        let prompt = store.add_prompt(SuiteScope::Current, &PromptDraft::new("p")).unwrap();
        store.set_score(model.id, prompt.id, 5).unwrap();

        let stats = store.suite_stats(SuiteScope::Current).unwrap();
        assert_eq!((stats.profiles, stats.prompts, stats.models, stats.scores), (1, 1, 1, 1));
        assert_eq!(stats.total(), 4);
    }
}
