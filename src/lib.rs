//! Tournament store - suite-scoped persistence for LLM tournaments
//!
//! This crate provides the storage engine behind the tournament server and
//! the `tourney` admin CLI.
//!
//! # Architecture
//!
//! - [`storage`] - SQLite database layer and the [`DataStore`] trait
//! - [`model`] - Data types (Suite, Profile, Prompt, Model, Score, jobs)
//! - [`vault`] - AES-256-GCM sealing of provider API keys
//! - [`notify`] - Change notification for live viewers
//! - [`config`] - Configuration management
//! - [`validate`] - Input validation and normalisation
//! - [`error`] - Error types and handling
//! - [`cli`] - Command-line interface using clap

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod notify;
pub mod storage;
pub mod validate;
pub mod vault;

pub use config::StoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use notify::{BroadcastNotifier, ChangeEvent, ChangeNotifier};
pub use storage::{DataStore, MemoryStore, SqliteStore};
pub use vault::SecretVault;
