//! Setting command implementations.

use super::{open_store, print_json};
use crate::cli::SettingCommands;
use crate::error::Result;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct SettingOutput<'a> {
    key: &'a str,
    value: Option<&'a str>,
}

/// Execute setting commands.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the operation fails.
pub fn execute(command: &SettingCommands, db_path: Option<&Path>, json: bool) -> Result<()> {
    let store = open_store(db_path)?;

    match command {
        SettingCommands::Get { key } => {
            let value = store.get_setting(key)?;
            if json {
                return print_json(&SettingOutput {
                    key,
                    value: value.as_deref(),
                });
            }
            match value {
                Some(value) => println!("{value}"),
                None => println!("(not set)"),
            }
        }
        SettingCommands::Set { key, value } => {
            store.set_setting(key, value)?;
            if json {
                return print_json(&SettingOutput {
                    key,
                    value: Some(value),
                });
            }
            println!("Set {key}");
        }
        SettingCommands::List => {
            let settings = store.all_settings()?;
            if json {
                return print_json(&settings);
            }
            if settings.is_empty() {
                println!("No settings.");
            }
            for (key, value) in &settings {
                println!("{key} = {value}");
            }
        }
    }
    Ok(())
}
