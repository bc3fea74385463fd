//! Suite lifecycle and the current-suite pointer.
//!
//! The current suite is a column flag rather than process state, so every
//! handler sees the same selection. Each operation that touches the flag
//! rewrites it in one statement inside one transaction; readers never see
//! zero or two current suites.

use crate::error::{Error, Result};
use crate::model::{DEFAULT_SUITE, Suite, SuiteScope, SuiteStats};
use crate::storage::sqlite::{SqliteStore, resolve_suite, suite_id_by_name};
use crate::validate::validate_suite_name;
use rusqlite::{Connection, OptionalExtension, Row};
use tracing::info;

fn map_suite(row: &Row<'_>) -> rusqlite::Result<Suite> {
    Ok(Suite {
        id: row.get(0)?,
        name: row.get(1)?,
        is_current: row.get(2)?,
    })
}

fn set_current(conn: &Connection, suite_id: i64) -> rusqlite::Result<usize> {
    conn.execute(
        "UPDATE suites SET is_current = CASE WHEN id = ?1 THEN 1 ELSE 0 END",
        [suite_id],
    )
}

impl SqliteStore {
    /// List all suites ordered by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn list_suites(&self) -> Result<Vec<Suite>> {
        let conn = self.conn();
        let mut stmt = conn.prepare("SELECT id, name, is_current FROM suites ORDER BY name")?;
        let suites = stmt
            .query_map([], map_suite)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(suites)
    }

    /// Create an empty, unselected suite.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad name, `Conflict` if the name is taken.
    pub fn create_suite(&self, name: &str) -> Result<Suite> {
        validate_suite_name(name)?;
        let suite = self.mutate("create_suite", |tx, ctx| {
            tx.execute("INSERT INTO suites (name, is_current) VALUES (?1, 0)", [name])
                .map_err(|e| Error::from_constraint(e, "Suite", name))?;
            ctx.notify_global();
            Ok(Suite {
                id: tx.last_insert_rowid(),
                name: name.to_string(),
                is_current: false,
            })
        })?;
        info!(suite = name, id = suite.id, "Created suite");
        Ok(suite)
    }

    /// Make `name` the current suite.
    ///
    /// # Errors
    ///
    /// `SuiteNotFound` if the suite does not exist.
    pub fn select_suite(&self, name: &str) -> Result<()> {
        self.mutate("select_suite", |tx, ctx| {
            let id = resolve_suite(tx, SuiteScope::Named(name))?;
            set_current(tx, id)?;
            ctx.notify_suite(id);
            Ok(())
        })?;
        info!(suite = name, "Selected suite");
        Ok(())
    }

    /// Rename a suite. Which suite is current does not change.
    ///
    /// # Errors
    ///
    /// `Validation` for the default suite or a bad new name, `SuiteNotFound`
    /// for an unknown `old`, `Conflict` if `new` is taken.
    pub fn rename_suite(&self, old: &str, new: &str) -> Result<()> {
        if old == DEFAULT_SUITE {
            return Err(Error::Validation(
                "the default suite cannot be renamed".to_string(),
            ));
        }
        validate_suite_name(new)?;

        self.mutate("rename_suite", |tx, ctx| {
            let id = resolve_suite(tx, SuiteScope::Named(old))?;
            tx.execute("UPDATE suites SET name = ?1 WHERE id = ?2", rusqlite::params![new, id])
                .map_err(|e| Error::from_constraint(e, "Suite", new))?;
            ctx.notify_suite(id);
            Ok(())
        })?;
        info!(from = old, to = new, "Renamed suite");
        Ok(())
    }

    /// Delete a suite and everything it owns.
    ///
    /// Deleting the current suite selects `default` in the same transaction.
    ///
    /// # Errors
    ///
    /// `Validation` for the default suite, `SuiteNotFound` if unknown.
    pub fn delete_suite(&self, name: &str) -> Result<()> {
        if name == DEFAULT_SUITE {
            return Err(Error::Validation(
                "the default suite cannot be deleted".to_string(),
            ));
        }

        let reselected = self.mutate("delete_suite", |tx, ctx| {
            let (id, was_current): (i64, bool) = tx
                .query_row(
                    "SELECT id, is_current FROM suites WHERE name = ?1",
                    [name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?
                .ok_or_else(|| Error::SuiteNotFound {
                    name: name.to_string(),
                })?;

            tx.execute("DELETE FROM suites WHERE id = ?1", [id])?;

            let mut reselected = None;
            if was_current {
                let fallback = match suite_id_by_name(tx, DEFAULT_SUITE)? {
                    Some(default_id) => Some(default_id),
                    None => tx
                        .query_row("SELECT id FROM suites ORDER BY id LIMIT 1", [], |row| {
                            row.get(0)
                        })
                        .optional()?,
                };
                if let Some(fallback) = fallback {
                    set_current(tx, fallback)?;
                    ctx.notify_suite(fallback);
                    reselected = Some(fallback);
                }
            }
            ctx.notify_global();
            Ok(reselected)
        })?;

        info!(suite = name, reselected = ?reselected, "Deleted suite");
        Ok(())
    }

    /// The suite currently selected.
    ///
    /// # Errors
    ///
    /// `NoCurrentSuite` if none is selected.
    pub fn current_suite(&self) -> Result<Suite> {
        self.conn()
            .query_row(
                "SELECT id, name, is_current FROM suites WHERE is_current = 1",
                [],
                map_suite,
            )
            .optional()?
            .ok_or(Error::NoCurrentSuite)
    }

    /// Look up a suite by name.
    ///
    /// # Errors
    ///
    /// `SuiteNotFound` if unknown.
    pub fn get_suite(&self, name: &str) -> Result<Suite> {
        self.conn()
            .query_row(
                "SELECT id, name, is_current FROM suites WHERE name = ?1",
                [name],
                map_suite,
            )
            .optional()?
            .ok_or_else(|| Error::SuiteNotFound {
                name: name.to_string(),
            })
    }

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn suite_exists(&self, name: &str) -> Result<bool> {
        Ok(suite_id_by_name(&self.conn(), name)?.is_some())
    }

    /// Row counts for a suite.
    ///
    /// # Errors
    ///
    /// `SuiteNotFound`/`NoCurrentSuite` if the scope does not resolve.
    pub fn suite_stats(&self, scope: SuiteScope<'_>) -> Result<SuiteStats> {
        let conn = self.conn();
        let suite_id = resolve_suite(&conn, scope)?;

        let count = |sql: &str| -> Result<usize> {
            let n: i64 = conn.query_row(sql, [suite_id], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };

        Ok(SuiteStats {
            profiles: count("SELECT COUNT(*) FROM profiles WHERE suite_id = ?1")?,
            prompts: count("SELECT COUNT(*) FROM prompts WHERE suite_id = ?1")?,
            models: count("SELECT COUNT(*) FROM models WHERE suite_id = ?1")?,
            scores: count(
                "SELECT COUNT(*) FROM scores s
                 INNER JOIN models m ON s.model_id = m.id
                 WHERE m.suite_id = ?1",
            )?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn current_count(store: &SqliteStore) -> i64 {
        store
            .conn()
            .query_row("SELECT COUNT(*) FROM suites WHERE is_current = 1", [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[test]
    fn test_default_suite_seeded_and_current() {
        let store = SqliteStore::open_memory().unwrap();
        let suites = store.list_suites().unwrap();
        assert_eq!(suites.len(), 1);
        assert_eq!(suites[0].name, DEFAULT_SUITE);
        assert_eq!(store.current_suite().unwrap().name, DEFAULT_SUITE);
    }

    #[test]
    fn test_create_and_select() {
        let store = SqliteStore::open_memory().unwrap();
        let alpha = store.create_suite("alpha").unwrap();
        assert!(!alpha.is_current);
        assert_eq!(current_count(&store), 1);

        store.select_suite("alpha").unwrap();
        assert_eq!(store.current_suite().unwrap().name, "alpha");
        assert_eq!(current_count(&store), 1);
    }

    #[test]
    fn test_create_duplicate_is_conflict() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("alpha").unwrap();
        let err = store.create_suite("alpha").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_select_unknown_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store.select_suite("ghost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.current_suite().unwrap().name, DEFAULT_SUITE);
    }

    #[test]
    fn test_list_is_sorted_by_name() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("zeta").unwrap();
        store.create_suite("alpha").unwrap();
        let names: Vec<_> = store.list_suites().unwrap().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alpha", "default", "zeta"]);
    }

    #[test]
    fn test_rename_keeps_current_flag() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("alpha").unwrap();
        store.select_suite("alpha").unwrap();
        store.rename_suite("alpha", "omega").unwrap();

        assert_eq!(store.current_suite().unwrap().name, "omega");
        assert!(!store.suite_exists("alpha").unwrap());
    }

    #[test]
    fn test_rename_rules() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("alpha").unwrap();
        store.create_suite("beta").unwrap();

        assert_eq!(
            store.rename_suite("default", "x").unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            store.rename_suite("alpha", "a/b").unwrap_err().kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            store.rename_suite("alpha", "beta").unwrap_err().kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            store.rename_suite("ghost", "gamma").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }

    #[test]
    fn test_delete_current_reselects_default() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("alpha").unwrap();
        store.select_suite("alpha").unwrap();

        store.delete_suite("alpha").unwrap();
        assert_eq!(store.current_suite().unwrap().name, DEFAULT_SUITE);
        assert_eq!(current_count(&store), 1);
    }

    #[test]
    fn test_delete_non_current_keeps_selection() {
        let store = SqliteStore::open_memory().unwrap();
        store.create_suite("alpha").unwrap();
        store.create_suite("beta").unwrap();
        store.select_suite("beta").unwrap();

        store.delete_suite("alpha").unwrap();
        assert_eq!(store.current_suite().unwrap().name, "beta");
    }

    #[test]
    fn test_delete_default_rejected() {
        let store = SqliteStore::open_memory().unwrap();
        let err = store.delete_suite(DEFAULT_SUITE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert!(store.suite_exists(DEFAULT_SUITE).unwrap());
    }

    #[test]
    fn test_delete_unknown_is_not_found() {
        let store = SqliteStore::open_memory().unwrap();
        assert_eq!(
            store.delete_suite("ghost").unwrap_err().kind(),
            ErrorKind::NotFound
        );
    }
}
