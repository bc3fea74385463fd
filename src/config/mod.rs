//! Configuration management.
//!
//! Resolves where the tournament database lives, the busy timeout used for
//! SQLite lock waits, and the credential encryption secret.
//!
//! Everything is read once at startup. The encryption secret in particular
//! is never reloaded for the life of the process.

use crate::error::{Error, Result};
use crate::vault::ENCRYPTION_KEY_ENV;

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Overrides the database location.
pub const DB_ENV: &str = "TOURNEY_DB";

/// Overrides the SQLite busy timeout, in milliseconds.
pub const BUSY_TIMEOUT_ENV: &str = "TOURNEY_BUSY_TIMEOUT_MS";

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings needed to open a store.
#[derive(Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub db_path: PathBuf,
    /// Hex secret for the credential vault. Absence is tolerated until a
    /// credential is read or written.
    pub encryption_key: Option<String>,
    pub busy_timeout: Duration,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreConfig")
            .field("db_path", &self.db_path)
            .field("encryption_key", &self.encryption_key.as_ref().map(|_| "<set>"))
            .field("busy_timeout", &self.busy_timeout)
            .finish()
    }
}

impl StoreConfig {
    /// Config for an explicit path with defaults for everything else.
    #[must_use]
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: db_path.into(),
            encryption_key: None,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    #[must_use]
    pub fn with_encryption_key(mut self, key: impl Into<String>) -> Self {
        self.encryption_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    /// Build the config from the environment.
    ///
    /// # Errors
    ///
    /// Returns `Config` if no database location can be determined or the
    /// busy timeout is not a number.
    pub fn from_env(explicit_db: Option<&Path>) -> Result<Self> {
        let db_path = resolve_db_path(explicit_db).ok_or_else(|| {
            Error::Config(format!(
                "cannot determine home directory; pass --db or set {DB_ENV}"
            ))
        })?;

        let encryption_key = std::env::var(ENCRYPTION_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty());

        let busy_timeout = match std::env::var(BUSY_TIMEOUT_ENV) {
            Ok(raw) if !raw.trim().is_empty() => parse_busy_timeout(&raw)?,
            _ => DEFAULT_BUSY_TIMEOUT,
        };

        Ok(Self {
            db_path,
            encryption_key,
            busy_timeout,
        })
    }

    /// Generate a fresh 64-hex encryption secret.
    #[must_use]
    pub fn generate_key() -> String {
        crate::vault::generate_key()
    }

    /// Create the database's parent directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns `Io` if the directory cannot be created.
    pub fn ensure_parent_dir(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(())
    }
}

fn parse_busy_timeout(raw: &str) -> Result<Duration> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|_| Error::Config(format!("{BUSY_TIMEOUT_ENV} must be milliseconds, got '{raw}'")))
}

/// Global tournament directory: `~/.tourney/`.
#[must_use]
pub fn global_tourney_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".tourney"))
}

/// Resolve the database path.
///
/// Priority:
/// 1. If `explicit_path` is provided, use it directly
/// 2. `TOURNEY_DB` environment variable
/// 3. Global location: `~/.tourney/data/tourney.db`
#[must_use]
pub fn resolve_db_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return Some(path.to_path_buf());
    }

    if let Ok(db_path) = std::env::var(DB_ENV) {
        if !db_path.trim().is_empty() {
            return Some(PathBuf::from(db_path));
        }
    }

    global_tourney_dir().map(|dir| dir.join("data").join("tourney.db"))
}
