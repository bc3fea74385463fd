//! CLI definitions using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

pub mod commands;

/// Admin tool for the tournament store
#[derive(Parser, Debug)]
#[command(name = "tourney", author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database path (default: ~/.tourney/data/tourney.db)
    #[arg(long, global = true, env = "TOURNEY_DB")]
    pub db: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Increase logging verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Quiet mode (no output except errors)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Suite management
    Suite {
        #[command(subcommand)]
        command: SuiteCommands,
    },

    /// Process-wide settings
    Setting {
        #[command(subcommand)]
        command: SettingCommands,
    },

    /// Encrypted provider API keys
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Row counts for a suite
    Stats {
        /// Suite name (default: current suite)
        #[arg(long)]
        suite: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum SuiteCommands {
    /// List all suites
    List,

    /// Create a new suite
    Create {
        name: String,

        /// Select the new suite after creating it
        #[arg(long)]
        select: bool,
    },

    /// Make a suite current
    Select { name: String },

    /// Rename a suite
    Rename { old: String, new: String },

    /// Delete a suite and everything in it
    Delete { name: String },

    /// Show the current suite
    Current,
}

#[derive(Subcommand, Debug)]
pub enum SettingCommands {
    /// Print one setting
    Get { key: String },

    /// Set a setting
    Set { key: String, value: String },

    /// List every setting (credentials excluded)
    List,
}

#[derive(Subcommand, Debug)]
pub enum KeyCommands {
    /// Store a provider key (an empty value clears it)
    Set { provider: String, key: String },

    /// Show a provider key, masked unless --reveal is given
    Get {
        provider: String,

        /// Print the decrypted key
        #[arg(long)]
        reveal: bool,
    },

    /// List stored providers with masked keys
    List,

    /// Print a fresh value for ENCRYPTION_KEY
    Generate,
}
