//! Suite command implementations.

use super::{open_store, print_json};
use crate::cli::SuiteCommands;
use crate::error::Result;
use crate::storage::DataStore;
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct SuiteListOutput<'a> {
    suites: &'a [crate::model::Suite],
    count: usize,
}

#[derive(Serialize)]
struct SuiteActionOutput<'a> {
    action: &'a str,
    name: &'a str,
}

/// Execute suite commands.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the operation fails.
pub fn execute(command: &SuiteCommands, db_path: Option<&Path>, json: bool) -> Result<()> {
    let store = open_store(db_path)?;

    match command {
        SuiteCommands::List => list(&store, json),
        SuiteCommands::Current => current(&store, json),
        SuiteCommands::Create { name, select } => {
            store.create_suite(name)?;
            if *select {
                store.select_suite(name)?;
            }
            report(json, "created", name)
        }
        SuiteCommands::Select { name } => {
            store.select_suite(name)?;
            report(json, "selected", name)
        }
        SuiteCommands::Rename { old, new } => {
            store.rename_suite(old, new)?;
            report(json, "renamed", new)
        }
        SuiteCommands::Delete { name } => {
            store.delete_suite(name)?;
            report(json, "deleted", name)
        }
    }
}

fn list(store: &dyn DataStore, json: bool) -> Result<()> {
    let suites = store.list_suites()?;

    if json {
        return print_json(&SuiteListOutput {
            suites: &suites,
            count: suites.len(),
        });
    }

    for suite in &suites {
        if suite.is_current {
            println!("{} {}", "*".green(), suite.name.bold());
        } else {
            println!("  {}", suite.name);
        }
    }
    Ok(())
}

fn current(store: &dyn DataStore, json: bool) -> Result<()> {
    let suite = store.current_suite()?;
    if json {
        return print_json(&suite);
    }
    println!("{}", suite.name);
    Ok(())
}

fn report(json: bool, action: &str, name: &str) -> Result<()> {
    if json {
        return print_json(&SuiteActionOutput { action, name });
    }
    println!("{} suite {}", capitalize(action), name.bold());
    Ok(())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|c| c.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}
