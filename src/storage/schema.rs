//! Database schema definitions and bootstrap logic.
//!
//! Timestamps are stored as INTEGER (Unix milliseconds). Calendar dates in
//! `cost_tracking` are stored as ISO `YYYY-MM-DD` text.

use crate::model::DEFAULT_SUITE;
use rusqlite::{Connection, OptionalExtension, Result};
use tracing::info;

/// Current schema version for migration tracking.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// The complete SQL schema for the tournament database.
pub const SCHEMA_SQL: &str = r"
-- ====================
-- Schema Version Tracking
-- ====================

CREATE TABLE IF NOT EXISTS schema_migrations (
    version TEXT PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- ====================
-- Suites and their content
-- ====================

CREATE TABLE IF NOT EXISTS suites (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    is_current INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS profiles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    description TEXT NOT NULL DEFAULT '',
    suite_id INTEGER NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
    UNIQUE(name, suite_id)
);

CREATE INDEX IF NOT EXISTS idx_profiles_suite ON profiles(suite_id);

-- Prompts only weakly reference their profile
CREATE TABLE IF NOT EXISTS prompts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    solution TEXT NOT NULL DEFAULT '',
    profile_id INTEGER REFERENCES profiles(id) ON DELETE SET NULL,
    suite_id INTEGER NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
    display_order INTEGER NOT NULL,
    type TEXT NOT NULL DEFAULT 'objective'
        CHECK (type IN ('objective', 'subjective', 'creative'))
);

CREATE INDEX IF NOT EXISTS idx_prompts_suite ON prompts(suite_id);
CREATE INDEX IF NOT EXISTS idx_prompts_order ON prompts(suite_id, display_order);
CREATE INDEX IF NOT EXISTS idx_prompts_profile ON prompts(profile_id);

CREATE TABLE IF NOT EXISTS models (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    suite_id INTEGER NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
    UNIQUE(name, suite_id)
);

CREATE INDEX IF NOT EXISTS idx_models_suite ON models(suite_id);

CREATE TABLE IF NOT EXISTS scores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_id INTEGER NOT NULL REFERENCES models(id) ON DELETE CASCADE,
    prompt_id INTEGER NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
    score INTEGER NOT NULL DEFAULT 0 CHECK (score BETWEEN 0 AND 100),
    UNIQUE(model_id, prompt_id)
);

CREATE INDEX IF NOT EXISTS idx_scores_prompt ON scores(prompt_id);

-- ====================
-- Process-wide settings (API keys live here encrypted)
-- ====================

CREATE TABLE IF NOT EXISTS settings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    value TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- ====================
-- Evaluation bookkeeping
-- ====================

CREATE TABLE IF NOT EXISTS evaluation_jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    suite_id INTEGER NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
    job_type TEXT NOT NULL CHECK (job_type IN ('all', 'model', 'prompt')),
    target_id INTEGER,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'running', 'completed', 'failed', 'cancelled')),
    progress_current INTEGER NOT NULL DEFAULT 0,
    progress_total INTEGER NOT NULL DEFAULT 0,
    estimated_cost_usd REAL NOT NULL DEFAULT 0,
    actual_cost_usd REAL NOT NULL DEFAULT 0,
    error_message TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    completed_at INTEGER,
    CHECK (progress_current <= progress_total)
);

CREATE INDEX IF NOT EXISTS idx_jobs_suite ON evaluation_jobs(suite_id);
CREATE INDEX IF NOT EXISTS idx_jobs_status ON evaluation_jobs(status);

CREATE TABLE IF NOT EXISTS model_responses (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    model_id INTEGER NOT NULL REFERENCES models(id) ON DELETE CASCADE,
    prompt_id INTEGER NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
    response_text TEXT NOT NULL DEFAULT '',
    response_source TEXT NOT NULL DEFAULT 'manual',
    api_config TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_responses_model ON model_responses(model_id);
CREATE INDEX IF NOT EXISTS idx_responses_prompt ON model_responses(prompt_id);

CREATE TABLE IF NOT EXISTS evaluation_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES evaluation_jobs(id) ON DELETE CASCADE,
    model_id INTEGER NOT NULL REFERENCES models(id) ON DELETE CASCADE,
    prompt_id INTEGER NOT NULL REFERENCES prompts(id) ON DELETE CASCADE,
    judge_name TEXT NOT NULL,
    judge_score INTEGER NOT NULL,
    judge_confidence REAL NOT NULL DEFAULT 0,
    judge_reasoning TEXT NOT NULL DEFAULT '',
    cost_usd REAL NOT NULL DEFAULT 0,
    created_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_history_job ON evaluation_history(job_id);

CREATE TABLE IF NOT EXISTS cost_tracking (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    suite_id INTEGER NOT NULL REFERENCES suites(id) ON DELETE CASCADE,
    date TEXT NOT NULL,
    total_cost_usd REAL NOT NULL DEFAULT 0,
    evaluation_count INTEGER NOT NULL DEFAULT 0,
    UNIQUE(suite_id, date)
);

CREATE INDEX IF NOT EXISTS idx_cost_suite ON cost_tracking(suite_id);
";

/// Apply the schema to a database connection.
///
/// Sets pragmas, creates tables, runs migrations, and makes sure exactly one
/// suite is current. Safe to call on every open.
///
/// # Errors
///
/// Returns an error if any step fails.
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;

    conn.execute_batch(SCHEMA_SQL)?;

    super::migrations::run_migrations(conn)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
        rusqlite::params![
            format!("v{CURRENT_SCHEMA_VERSION}"),
            chrono::Utc::now().timestamp_millis()
        ],
    )?;

    bootstrap_suites(conn)
}

/// Seed the default suite on an empty database and repair a missing
/// current-suite flag left behind by older builds.
fn bootstrap_suites(conn: &Connection) -> Result<()> {
    let suites: i64 = conn.query_row("SELECT COUNT(*) FROM suites", [], |row| row.get(0))?;
    if suites == 0 {
        conn.execute(
            "INSERT OR IGNORE INTO suites (name, is_current) VALUES (?1, 1)",
            [DEFAULT_SUITE],
        )?;
        info!(suite = DEFAULT_SUITE, "Seeded default suite");
        return Ok(());
    }

    let current: i64 = conn.query_row(
        "SELECT COUNT(*) FROM suites WHERE is_current = 1",
        [],
        |row| row.get(0),
    )?;
    if current == 1 {
        return Ok(());
    }

    let fallback: Option<i64> = conn
        .query_row(
            "SELECT id FROM suites ORDER BY (name = ?1) DESC, id ASC LIMIT 1",
            [DEFAULT_SUITE],
            |row| row.get(0),
        )
        .optional()?;

    if let Some(id) = fallback {
        conn.execute(
            "UPDATE suites SET is_current = CASE WHEN id = ?1 THEN 1 ELSE 0 END",
            [id],
        )?;
        info!(suite_id = id, previous = current, "Repaired current suite flag");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn current_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM suites WHERE is_current = 1")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_>>()
            .unwrap()
    }

    #[test]
    fn test_schema_applies() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let count: i32 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name='prompts'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();

        let suites: i64 = conn
            .query_row("SELECT COUNT(*) FROM suites", [], |row| row.get(0))
            .unwrap();
        assert_eq!(suites, 1);
        assert_eq!(current_names(&conn), vec![DEFAULT_SUITE.to_string()]);
    }

    #[test]
    fn test_foreign_keys_enabled() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();

        let fk_enabled: i32 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn test_missing_current_flag_is_repaired() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute("INSERT INTO suites (name) VALUES ('alpha')", [])
            .unwrap();
        conn.execute("UPDATE suites SET is_current = 0", []).unwrap();

        apply_schema(&conn).unwrap();
        assert_eq!(current_names(&conn), vec![DEFAULT_SUITE.to_string()]);
    }

    #[test]
    fn test_score_range_constraint() {
        let conn = Connection::open_in_memory().unwrap();
        apply_schema(&conn).unwrap();
        conn.execute("INSERT INTO models (name, suite_id) VALUES ('m', 1)", [])
            .unwrap();
        conn.execute(
            "INSERT INTO prompts (text, suite_id, display_order) VALUES ('p', 1, 0)",
            [],
        )
        .unwrap();

        assert!(conn
            .execute("INSERT INTO scores (model_id, prompt_id, score) VALUES (1, 1, 101)", [])
            .is_err());
        assert!(conn
            .execute("INSERT INTO scores (model_id, prompt_id, score) VALUES (1, 1, 100)", [])
            .is_ok());
    }
}
