//! Stats command implementation.

use super::{open_store, print_json};
use crate::error::Result;
use crate::model::{SuiteScope, SuiteStats};
use colored::Colorize;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct StatsOutput<'a> {
    suite: &'a str,
    #[serde(flatten)]
    stats: &'a SuiteStats,
    total: usize,
}

/// Execute the stats command.
///
/// # Errors
///
/// Returns an error if the store cannot be opened or the suite is unknown.
pub fn execute(suite: Option<&str>, db_path: Option<&Path>, json: bool) -> Result<()> {
    let store = open_store(db_path)?;
    let scope = SuiteScope::from_name(suite);
    let stats = store.suite_stats(scope)?;
    let name = match scope {
        SuiteScope::Named(name) => name.to_string(),
        SuiteScope::Current => store.current_suite()?.name,
    };

    if json {
        return print_json(&StatsOutput {
            suite: &name,
            stats: &stats,
            total: stats.total(),
        });
    }

    println!("{}", format!("Suite {name}").cyan().bold());
    println!("  Profiles: {}", stats.profiles);
    println!("  Prompts:  {}", stats.prompts);
    println!("  Models:   {}", stats.models);
    println!("  Scores:   {}", stats.scores);
    Ok(())
}
