//! Error types for the tournament store.
//!
//! Provides structured error handling with:
//! - A coarse `ErrorKind` taxonomy the HTTP layer maps to status codes
//! - Machine-readable error codes (`ErrorCode`)
//! - Category-based exit codes for the admin CLI
//! - Context-aware recovery hints
//! - Structured JSON output for piped / non-TTY consumers

use rusqlite::ffi;
use thiserror::Error;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, Error>;

// ── Error Kind ────────────────────────────────────────────────

/// The failure categories callers are expected to branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    ForeignKeyViolation,
    Validation,
    Encryption,
    Storage,
}

impl ErrorKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Conflict => "conflict",
            Self::ForeignKeyViolation => "foreign_key_violation",
            Self::Validation => "validation",
            Self::Encryption => "encryption",
            Self::Storage => "storage",
        }
    }
}

// ── Error Code ────────────────────────────────────────────────

/// Machine-readable error codes grouped by category.
///
/// Each code maps to a SCREAMING_SNAKE string and a category-based
/// exit code. Scripts match on the string or the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Storage (exit 2)
    DatabaseError,
    LockContention,

    // Not Found (exit 3)
    SuiteNotFound,
    NoCurrentSuite,
    ProfileNotFound,
    PromptNotFound,
    ModelNotFound,
    JobNotFound,

    // Validation (exit 4)
    InvalidArgument,
    InvalidTransition,

    // Integrity (exit 5)
    Conflict,
    ForeignKeyViolation,

    // Encryption (exit 6)
    EncryptionError,

    // Config (exit 7)
    ConfigError,

    // I/O (exit 8)
    IoError,
    JsonError,
}

impl ErrorCode {
    /// Machine-readable SCREAMING_SNAKE code string.
    #[must_use]
    pub const fn as_str(&self) -> &str {
        match self {
            Self::DatabaseError => "DATABASE_ERROR",
            Self::LockContention => "LOCK_CONTENTION",
            Self::SuiteNotFound => "SUITE_NOT_FOUND",
            Self::NoCurrentSuite => "NO_CURRENT_SUITE",
            Self::ProfileNotFound => "PROFILE_NOT_FOUND",
            Self::PromptNotFound => "PROMPT_NOT_FOUND",
            Self::ModelNotFound => "MODEL_NOT_FOUND",
            Self::JobNotFound => "JOB_NOT_FOUND",
            Self::InvalidArgument => "INVALID_ARGUMENT",
            Self::InvalidTransition => "INVALID_TRANSITION",
            Self::Conflict => "CONFLICT",
            Self::ForeignKeyViolation => "FOREIGN_KEY_VIOLATION",
            Self::EncryptionError => "ENCRYPTION_ERROR",
            Self::ConfigError => "CONFIG_ERROR",
            Self::IoError => "IO_ERROR",
            Self::JsonError => "JSON_ERROR",
        }
    }

    /// Category-based exit code (2-8).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::DatabaseError | Self::LockContention => 2,
            Self::SuiteNotFound
            | Self::NoCurrentSuite
            | Self::ProfileNotFound
            | Self::PromptNotFound
            | Self::ModelNotFound
            | Self::JobNotFound => 3,
            Self::InvalidArgument | Self::InvalidTransition => 4,
            Self::Conflict | Self::ForeignKeyViolation => 5,
            Self::EncryptionError => 6,
            Self::ConfigError => 7,
            Self::IoError | Self::JsonError => 8,
        }
    }

    /// Whether retrying the same call may succeed.
    ///
    /// Only lock contention is transient; everything else needs different input.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::LockContention)
    }
}

// ── Error Enum ────────────────────────────────────────────────

/// Errors that can occur in store operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Suite not found: {name}")]
    SuiteNotFound { name: String },

    #[error("No current suite is selected")]
    NoCurrentSuite,

    #[error("Profile not found: {id}")]
    ProfileNotFound { id: i64 },

    #[error("Profile not found in suite: {name}")]
    ProfileNameNotFound { name: String },

    #[error("Prompt not found: {id}")]
    PromptNotFound { id: i64 },

    #[error("Model not found: {id}")]
    ModelNotFound { id: i64 },

    #[error("Evaluation job not found: {id}")]
    JobNotFound { id: i64 },

    #[error("{entity} already exists: {name}")]
    Conflict { entity: &'static str, name: String },

    #[error("Referenced row does not exist: {0}")]
    ForeignKey(String),

    #[error("Invalid argument: {0}")]
    Validation(String),

    #[error("Invalid job transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Map this error to its taxonomy bucket.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::SuiteNotFound { .. }
            | Self::NoCurrentSuite
            | Self::ProfileNotFound { .. }
            | Self::ProfileNameNotFound { .. }
            | Self::PromptNotFound { .. }
            | Self::ModelNotFound { .. }
            | Self::JobNotFound { .. } => ErrorKind::NotFound,
            Self::Conflict { .. } => ErrorKind::Conflict,
            Self::ForeignKey(_) => ErrorKind::ForeignKeyViolation,
            Self::Validation(_) | Self::InvalidTransition { .. } | Self::Config(_) => {
                ErrorKind::Validation
            }
            Self::Encryption(_) => ErrorKind::Encryption,
            Self::Database(_) | Self::Io(_) | Self::Json(_) => ErrorKind::Storage,
        }
    }

    /// Map this error to its structured `ErrorCode`.
    #[must_use]
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::SuiteNotFound { .. } => ErrorCode::SuiteNotFound,
            Self::NoCurrentSuite => ErrorCode::NoCurrentSuite,
            Self::ProfileNotFound { .. } | Self::ProfileNameNotFound { .. } => {
                ErrorCode::ProfileNotFound
            }
            Self::PromptNotFound { .. } => ErrorCode::PromptNotFound,
            Self::ModelNotFound { .. } => ErrorCode::ModelNotFound,
            Self::JobNotFound { .. } => ErrorCode::JobNotFound,
            Self::Conflict { .. } => ErrorCode::Conflict,
            Self::ForeignKey(_) => ErrorCode::ForeignKeyViolation,
            Self::Validation(_) => ErrorCode::InvalidArgument,
            Self::InvalidTransition { .. } => ErrorCode::InvalidTransition,
            Self::Encryption(_) => ErrorCode::EncryptionError,
            Self::Database(_) if self.is_lock_contention() => ErrorCode::LockContention,
            Self::Database(_) => ErrorCode::DatabaseError,
            Self::Config(_) => ErrorCode::ConfigError,
            Self::Io(_) => ErrorCode::IoError,
            Self::Json(_) => ErrorCode::JsonError,
        }
    }

    /// Category-based exit code, delegating to the `ErrorCode`.
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        self.error_code().exit_code()
    }

    /// True when SQLite reported `SQLITE_BUSY` or `SQLITE_LOCKED`.
    #[must_use]
    pub fn is_lock_contention(&self) -> bool {
        match self {
            Self::Database(rusqlite::Error::SqliteFailure(err, _)) => matches!(
                err.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    /// Classify a failed insert/update on a row identified by `name`.
    ///
    /// Unique violations become `Conflict`, foreign-key violations become
    /// `ForeignKey`; anything else stays a plain database error.
    pub(crate) fn from_constraint(err: rusqlite::Error, entity: &'static str, name: &str) -> Self {
        if let rusqlite::Error::SqliteFailure(ref failure, _) = err {
            match failure.extended_code {
                ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY => {
                    return Self::Conflict {
                        entity,
                        name: name.to_string(),
                    };
                }
                ffi::SQLITE_CONSTRAINT_FOREIGNKEY => {
                    return Self::ForeignKey(format!("{entity} {name}"));
                }
                _ => {}
            }
        }
        Self::Database(err)
    }

    /// Context-aware recovery hint for humans.
    ///
    /// Returns `None` if no actionable suggestion exists.
    #[must_use]
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::SuiteNotFound { name } => Some(format!(
                "No suite named '{name}'. Use `tourney suite list` to see available suites."
            )),
            Self::NoCurrentSuite => {
                Some("Select a suite: tourney suite select <name>".to_string())
            }
            Self::Conflict { entity, name } => Some(format!(
                "Pick a different name; a {} called '{name}' is already present.",
                entity.to_lowercase()
            )),
            Self::Encryption(msg) if msg.contains("ENCRYPTION_KEY") => Some(
                "Set ENCRYPTION_KEY to 64 hex characters. Generate one with `tourney key generate`."
                    .to_string(),
            ),
            Self::InvalidTransition { .. } => Some(
                "Jobs move pending -> running -> completed|failed|cancelled.".to_string(),
            ),
            _ if self.is_lock_contention() => {
                Some("Another process holds the database lock; retry shortly.".to_string())
            }
            _ => None,
        }
    }

    /// Structured JSON representation for machine consumption.
    #[must_use]
    pub fn to_structured_json(&self) -> serde_json::Value {
        let code = self.error_code();
        let mut obj = serde_json::json!({
            "error": {
                "code": code.as_str(),
                "kind": self.kind().as_str(),
                "message": self.to_string(),
                "retryable": code.is_retryable(),
                "exit_code": code.exit_code(),
            }
        });

        if let Some(hint) = self.hint() {
            obj["error"]["hint"] = serde_json::Value::String(hint);
        }

        obj
    }
}
