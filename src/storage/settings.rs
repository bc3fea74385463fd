//! Process-wide settings and encrypted provider credentials.
//!
//! Settings are plain key/value rows, not suite-scoped. Credentials share
//! the table under `api_key_<provider>` with the value sealed by the
//! store's [`SecretVault`](crate::vault::SecretVault).

use crate::error::{Error, Result};
use crate::storage::sqlite::{SqliteStore, now_millis};
use crate::validate::validate_provider;
use crate::vault::{MASK_ERROR, mask_key};
use rusqlite::{Connection, OptionalExtension};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Prefix of setting keys that hold encrypted credentials.
pub const API_KEY_PREFIX: &str = "api_key_";

/// Spend per day above which the UI warns.
pub const COST_ALERT_THRESHOLD: &str = "cost_alert_threshold_usd";
/// Whether adding a model queues an evaluation job.
pub const AUTO_EVALUATE_NEW_MODELS: &str = "auto_evaluate_new_models";
/// Base URL of the judge service.
pub const JUDGE_SERVICE_URL: &str = "python_service_url";

fn api_key_setting(provider: &str) -> String {
    format!("{API_KEY_PREFIX}{provider}")
}

fn upsert_setting(conn: &Connection, key: &str, value: &str) -> rusqlite::Result<usize> {
    let now = now_millis();
    conn.execute(
        "INSERT INTO settings (key, value, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
        rusqlite::params![key, value, now],
    )
}

fn read_setting(conn: &Connection, key: &str) -> rusqlite::Result<Option<String>> {
    conn.query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
        row.get(0)
    })
    .optional()
}

impl SqliteStore {
    // ==================
    // Settings
    // ==================

    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn get_setting(&self, key: &str) -> Result<Option<String>> {
        Ok(read_setting(&self.conn(), key)?)
    }

    /// Insert or replace a setting.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty key or one in the credential namespace.
    pub fn set_setting(&self, key: &str, value: &str) -> Result<()> {
        if key.trim().is_empty() {
            return Err(Error::Validation("setting key cannot be empty".to_string()));
        }
        if key.starts_with(API_KEY_PREFIX) {
            return Err(Error::Validation(format!(
                "'{key}' is a credential; use set_api_key"
            )));
        }
        self.mutate("set_setting", |tx, _ctx| {
            upsert_setting(tx, key, value)?;
            Ok(())
        })?;
        debug!(key, "Saved setting");
        Ok(())
    }

    /// Every non-credential setting, by key.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn all_settings(&self) -> Result<BTreeMap<String, String>> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare("SELECT key, value FROM settings WHERE key NOT LIKE 'api\\_key\\_%' ESCAPE '\\'")?;
        let settings = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<BTreeMap<_, _>>>()?;
        Ok(settings)
    }

    // ==================
    // API keys
    // ==================

    /// Encrypt and store a provider key. An empty key removes it.
    ///
    /// # Errors
    ///
    /// `Validation` for a bad provider name, `Encryption` if the vault has
    /// no usable secret.
    pub fn set_api_key(&self, provider: &str, plaintext: &str) -> Result<()> {
        validate_provider(provider)?;
        let key = api_key_setting(provider);

        if plaintext.is_empty() {
            self.mutate("clear_api_key", |tx, _ctx| {
                tx.execute("DELETE FROM settings WHERE key = ?1", [&key])?;
                Ok(())
            })?;
            info!(provider, "Cleared API key");
            return Ok(());
        }

        let sealed = self.vault().encrypt(plaintext)?;
        self.mutate("set_api_key", |tx, _ctx| {
            upsert_setting(tx, &key, &sealed)?;
            Ok(())
        })?;
        info!(provider, "Stored API key");
        Ok(())
    }

    /// Decrypted key for a provider, or an empty string if none is stored.
    ///
    /// # Errors
    ///
    /// `Encryption` for missing key material or a corrupt stored value.
    pub fn get_api_key(&self, provider: &str) -> Result<String> {
        validate_provider(provider)?;
        match read_setting(&self.conn(), &api_key_setting(provider))? {
            Some(sealed) => self.vault().decrypt(&sealed),
            None => Ok(String::new()),
        }
    }

    /// Provider → masked key for every stored credential.
    ///
    /// Entries that fail to decrypt, including every entry when the vault
    /// has no secret, show as `***ERROR***`.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub fn masked_api_keys(&self) -> Result<BTreeMap<String, String>> {
        let rows: Vec<(String, String)> = {
            let conn = self.conn();
            let mut stmt = conn.prepare(
                "SELECT key, value FROM settings WHERE key LIKE 'api\\_key\\_%' ESCAPE '\\'",
            )?;
            let rows = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut masked = BTreeMap::new();
        for (key, sealed) in rows {
            let provider = key.trim_start_matches(API_KEY_PREFIX).to_string();
            let shown = match self.vault().decrypt(&sealed) {
                Ok(plain) => mask_key(&plain),
                Err(e) => {
                    warn!(provider = %provider, error = %e, "Stored API key is unreadable");
                    MASK_ERROR.to_string()
                }
            };
            masked.insert(provider, shown);
        }
        Ok(masked)
    }
}
