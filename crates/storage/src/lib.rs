//! Storage abstraction and implementations for Hitos.
//!
//! This crate provides a trait-based interface over indicator and milestone
//! persistence with a transactional SQLite implementation.

#![warn(missing_docs)]

pub mod config;
pub mod trait_;
pub mod sqlite_storage;

pub use config::StorageConfig;
pub use trait_::{Storage, StorageError, Result};
pub use sqlite_storage::SqliteStorage;
