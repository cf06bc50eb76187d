//! Storage Module
//!
//! SQLite-based storage layer with:
//! - Card store with scheduling state and optimistic versioning
//! - Append-only review event log
//! - Session records with exactly-once finalization
//! - Versioned migrations over a reader/writer connection pair

mod migrations;
mod sqlite;

pub use migrations::MIGRATIONS;
pub use sqlite::{Result, ReviewEventRecord, ReviewReceipt, Storage, StorageError};
