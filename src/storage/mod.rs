//! SQLite storage layer for the tournament store.
//!
//! This module provides the persistence layer using SQLite with:
//! - WAL mode for concurrent reads
//! - Transaction discipline for atomic writes
//! - Change notification after commit
//!
//! # Submodules
//!
//! - [`schema`] - Database schema definitions
//! - [`migrations`] - Upgrades for databases created by older versions
//! - [`sqlite`] - Connection handling and the mutation protocol
//! - [`store`] - The [`DataStore`] trait request handlers depend on
//! - [`memory`] / [`faults`] - Test doubles implementing [`DataStore`]

pub mod content;
pub mod evaluation;
pub mod faults;
pub mod memory;
pub mod migrations;
pub mod ordering;
pub mod schema;
pub mod settings;
pub mod sqlite;
pub mod store;
pub mod suites;

pub use faults::{FaultyStore, StoreOp};
pub use memory::MemoryStore;
pub use ordering::{check_permutation, move_within};
pub use sqlite::{MAX_LOCK_RETRIES, MutationContext, SqliteStore};
pub use store::DataStore;
