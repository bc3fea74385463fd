//! API key command implementations.

use super::{open_store, print_json};
use crate::cli::KeyCommands;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::vault::mask_key;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct KeyOutput<'a> {
    provider: &'a str,
    key: &'a str,
    masked: bool,
}

#[derive(Serialize)]
struct GeneratedKey {
    encryption_key: String,
}

/// Execute key commands.
///
/// # Errors
///
/// Returns an error if the store cannot be opened, the vault has no
/// usable secret, or the operation fails.
pub fn execute(command: &KeyCommands, db_path: Option<&Path>, json: bool) -> Result<()> {
    match command {
        KeyCommands::Generate => {
            let encryption_key = StoreConfig::generate_key();
            if json {
                return print_json(&GeneratedKey { encryption_key });
            }
            println!("{encryption_key}");
        }
        KeyCommands::Set { provider, key } => {
            let store = open_store(db_path)?;
            store.set_api_key(provider, key)?;
            if json {
                return print_json(&KeyOutput {
                    provider,
                    key: &mask_key(key),
                    masked: true,
                });
            }
            if key.is_empty() {
                println!("Cleared key for {}", provider.bold());
            } else {
                println!("Stored key for {}", provider.bold());
            }
        }
        KeyCommands::Get { provider, reveal } => {
            let store = open_store(db_path)?;
            let plain = store.get_api_key(provider)?;
            let shown = if *reveal || plain.is_empty() {
                plain
            } else {
                mask_key(&plain)
            };
            if json {
                return print_json(&KeyOutput {
                    provider,
                    key: &shown,
                    masked: !*reveal,
                });
            }
            if shown.is_empty() {
                println!("No key stored for {provider}");
            } else {
                println!("{shown}");
            }
        }
        KeyCommands::List => {
            let store = open_store(db_path)?;
            let keys = store.masked_api_keys()?;
            if json {
                return print_json(&keys);
            }
            if keys.is_empty() {
                println!("No API keys stored.");
            }
            for (provider, masked) in &keys {
                println!("{:<16} {}", provider.bold(), masked.dimmed());
            }
        }
    }
    Ok(())
}
