//! SQLite storage implementation.
//!
//! [`SqliteStore`] owns one connection behind a mutex, shared by every
//! request handler. Writes go through [`SqliteStore::mutate`], which runs
//! the closure in an IMMEDIATE transaction, retries on lock contention, and
//! fires the change notifier only after a successful commit.
//!
//! Domain operations live in sibling modules (`suites`, `content`,
//! `settings`, `evaluation`) as further `impl SqliteStore` blocks.

use crate::config::StoreConfig;
use crate::error::{Error, Result};
use crate::model::SuiteScope;
use crate::notify::{ChangeEvent, ChangeNotifier, NoopNotifier};
use crate::storage::schema::apply_schema;
use crate::vault::SecretVault;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// How many times a mutation is retried after `SQLITE_BUSY`/`SQLITE_LOCKED`.
pub const MAX_LOCK_RETRIES: u32 = 3;

const LOCK_RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    vault: SecretVault,
    notifier: Arc<dyn ChangeNotifier>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("vault", &self.vault)
            .finish_non_exhaustive()
    }
}

/// Context for a mutation, tracking what to announce after commit.
#[derive(Debug)]
pub struct MutationContext {
    /// Name of the operation being performed.
    pub op_name: &'static str,
    suite_id: Option<i64>,
    notify: bool,
}

impl MutationContext {
    #[must_use]
    pub fn new(op_name: &'static str) -> Self {
        Self {
            op_name,
            suite_id: None,
            notify: false,
        }
    }

    /// Request a change notification for `suite_id` once the transaction commits.
    pub fn notify_suite(&mut self, suite_id: i64) {
        self.suite_id = Some(suite_id);
        self.notify = true;
    }

    /// Request a change notification not tied to one suite.
    pub fn notify_global(&mut self) {
        self.notify = true;
    }

    pub(crate) fn event(&self) -> Option<ChangeEvent> {
        self.notify
            .then(|| ChangeEvent::new(self.op_name, self.suite_id))
    }
}

impl SqliteStore {
    /// Open a database at the given path with default settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with_config(&StoreConfig::new(path))
    }

    /// Open the database described by `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established or schema fails.
    pub fn open_with_config(config: &StoreConfig) -> Result<Self> {
        config.ensure_parent_dir()?;
        let conn = Connection::open(&config.db_path)?;
        conn.busy_timeout(config.busy_timeout)?;
        apply_schema(&conn)?;
        debug!(path = %config.db_path.display(), "Opened store");
        Ok(Self::from_connection(
            conn,
            SecretVault::new(config.encryption_key.as_deref()),
        ))
    }

    /// Open an in-memory database (for testing).
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self::from_connection(conn, SecretVault::disabled()))
    }

    fn from_connection(conn: Connection, vault: SecretVault) -> Self {
        Self {
            conn: Mutex::new(conn),
            vault,
            notifier: Arc::new(NoopNotifier),
        }
    }

    /// Replace the credential vault.
    #[must_use]
    pub fn with_vault(mut self, vault: SecretVault) -> Self {
        self.vault = vault;
        self
    }

    /// Replace the change notifier.
    #[must_use]
    pub fn with_notifier(mut self, notifier: Arc<dyn ChangeNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub(crate) fn vault(&self) -> &SecretVault {
        &self.vault
    }

    pub(crate) fn notifier(&self) -> &dyn ChangeNotifier {
        self.notifier.as_ref()
    }

    /// Lock the connection for a read.
    ///
    /// A panic in another handler while holding the lock leaves SQLite in a
    /// consistent state (the transaction rolls back on drop), so poisoning
    /// is ignored.
    pub(crate) fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute a mutation with the transaction protocol.
    ///
    /// This method:
    /// 1. Begins an IMMEDIATE transaction (for write locking)
    /// 2. Executes the mutation closure
    /// 3. Commits (or rolls back on error)
    /// 4. Notifies viewers if the closure asked for it
    ///
    /// Lock contention is retried up to [`MAX_LOCK_RETRIES`] times with a
    /// linear backoff, so the closure may run more than once.
    ///
    /// # Errors
    ///
    /// Returns an error if any step fails. The transaction is rolled back on error.
    pub fn mutate<F, R>(&self, op: &'static str, mut f: F) -> Result<R>
    where
        F: FnMut(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let mut attempt = 0;
        loop {
            match self.try_mutate(op, &mut f) {
                Err(e) if e.is_lock_contention() && attempt < MAX_LOCK_RETRIES => {
                    attempt += 1;
                    warn!(op, attempt, "Database busy, retrying mutation");
                    std::thread::sleep(LOCK_RETRY_BACKOFF * attempt);
                }
                Err(e) => return Err(e),
                Ok((result, event)) => {
                    if let Some(event) = event {
                        self.notifier.notify(event);
                    }
                    return Ok(result);
                }
            }
        }
    }

    fn try_mutate<F, R>(&self, op: &'static str, f: &mut F) -> Result<(R, Option<ChangeEvent>)>
    where
        F: FnMut(&Transaction, &mut MutationContext) -> Result<R>,
    {
        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut ctx = MutationContext::new(op);
        let result = f(&tx, &mut ctx)?;

        tx.commit()?;
        Ok((result, ctx.event()))
    }
}

// ==================
// Suite resolution shared by every suite-scoped operation
// ==================

/// Resolve a scope to a suite id.
///
/// # Errors
///
/// `SuiteNotFound` for an unknown name, `NoCurrentSuite` when no suite is
/// selected.
pub(crate) fn resolve_suite(conn: &Connection, scope: SuiteScope<'_>) -> Result<i64> {
    match scope {
        SuiteScope::Current => conn
            .query_row("SELECT id FROM suites WHERE is_current = 1", [], |row| {
                row.get(0)
            })
            .optional()?
            .ok_or(Error::NoCurrentSuite),
        SuiteScope::Named(name) => suite_id_by_name(conn, name)?.ok_or_else(|| {
            Error::SuiteNotFound {
                name: name.to_string(),
            }
        }),
    }
}

pub(crate) fn suite_id_by_name(conn: &Connection, name: &str) -> Result<Option<i64>> {
    Ok(conn
        .query_row("SELECT id FROM suites WHERE name = ?1", [name], |row| {
            row.get(0)
        })
        .optional()?)
}

pub(crate) fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
