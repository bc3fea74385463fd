//! Command implementations.

pub mod key;
pub mod setting;
pub mod stats;
pub mod suite;

use crate::config::StoreConfig;
use crate::error::Result;
use crate::storage::SqliteStore;
use std::path::Path;

/// Open the store named by `--db`, `TOURNEY_DB` or the default location.
pub(crate) fn open_store(db_path: Option<&Path>) -> Result<SqliteStore> {
    let config = StoreConfig::from_env(db_path)?;
    SqliteStore::open_with_config(&config)
}

/// Print `value` as one line of JSON.
pub(crate) fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
