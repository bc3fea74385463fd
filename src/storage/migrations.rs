//! Versioned schema migrations.
//!
//! The base DDL in [`super::schema`] always describes the latest layout, so
//! on a fresh database these are no-ops. They exist for databases created
//! before the columns and indexes were added.

use rusqlite::{Connection, Result};
use tracing::{info, warn};

/// A single migration with version identifier and SQL content.
struct Migration {
    version: &'static str,
    sql: &'static str,
}

/// All migrations in order. The `schema_migrations` table tracks which have
/// been applied.
const MIGRATIONS: &[Migration] = &[
    Migration {
        version: "001_prompt_type",
        sql: "ALTER TABLE prompts ADD COLUMN type TEXT NOT NULL DEFAULT 'objective';",
    },
    Migration {
        version: "002_unique_model_response",
        sql: "
            DELETE FROM model_responses
             WHERE id NOT IN (
                SELECT MAX(id) FROM model_responses GROUP BY model_id, prompt_id
             );
            CREATE UNIQUE INDEX IF NOT EXISTS idx_responses_model_prompt
                ON model_responses(model_id, prompt_id);
        ",
    },
];

/// Run all pending migrations on the database.
///
/// Already-applied migrations are skipped, so this is safe to call on every
/// open.
///
/// # Errors
///
/// Returns an error if a migration fails to apply. ALTER TABLE errors for
/// duplicate columns are tolerated since the base DDL may already carry
/// those columns.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY,
            applied_at INTEGER NOT NULL
        )",
        [],
    )?;

    let applied: std::collections::HashSet<String> = conn
        .prepare("SELECT version FROM schema_migrations")?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for migration in MIGRATIONS {
        if applied.contains(migration.version) {
            continue;
        }

        info!(version = migration.version, "Applying migration");

        if let Err(e) = conn.execute_batch(migration.sql) {
            if e.to_string().contains("duplicate column name") {
                warn!(
                    version = migration.version,
                    "Migration partially applied (columns exist), marking complete"
                );
            } else {
                return Err(e);
            }
        }

        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().timestamp_millis()],
        )?;

        info!(version = migration.version, "Migration complete");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::schema::SCHEMA_SQL;

    fn applied_count(conn: &Connection) -> i64 {
        conn.query_row(
            "SELECT COUNT(*) FROM schema_migrations WHERE version LIKE '0%'",
            [],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_run_migrations_fresh_db() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        run_migrations(&conn).expect("Migrations should apply to fresh database");
        assert_eq!(applied_count(&conn), MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_run_migrations_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(SCHEMA_SQL).unwrap();
        run_migrations(&conn).unwrap();
        run_migrations(&conn).unwrap();
        assert_eq!(applied_count(&conn), MIGRATIONS.len() as i64);
    }

    #[test]
    fn test_legacy_prompts_table_gains_type_column() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE prompts (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                text TEXT NOT NULL,
                suite_id INTEGER NOT NULL,
                display_order INTEGER NOT NULL
             );
             CREATE TABLE model_responses (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                model_id INTEGER NOT NULL,
                prompt_id INTEGER NOT NULL,
                response_text TEXT
             );
             INSERT INTO prompts (text, suite_id, display_order) VALUES ('old', 1, 0);
             INSERT INTO model_responses (model_id, prompt_id, response_text) VALUES (1, 1, 'a');
             INSERT INTO model_responses (model_id, prompt_id, response_text) VALUES (1, 1, 'b');",
        )
        .unwrap();

        run_migrations(&conn).unwrap();

        let prompt_type: String = conn
            .query_row("SELECT type FROM prompts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(prompt_type, "objective");

        let latest: String = conn
            .query_row("SELECT response_text FROM model_responses", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(latest, "b");
    }
}
