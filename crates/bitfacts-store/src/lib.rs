//! Bitfacts storage layer
//!
//! ```text
//!   ingest ──► BatchWriter ──► KvStore ◄── scan_matching ◄── reconcile
//!                  │             │
//!                  ▼             ├── MemoryStore  (in-process)
//!              registry set      └── SqliteStore  (file)
//! ```
//!
//! - [`KvStore`]: string / set / hash values under string keys, cursor
//!   enumeration by prefix, pipelined batches
//! - [`Keyspace`]: the key layout under a validated prefix
//! - [`BatchWriter`] / [`reset_registry`]: bounded batches, registry-scoped delete
//! - [`scan_matching`]: the scan-and-filter evaluator

pub mod error;
pub mod keys;
pub mod kv;
pub mod memory;
pub mod scan;
pub mod sqlite;
pub mod writer;

#[cfg(test)]
mod tests;

pub use error::{Result, StoreError};
pub use keys::Keyspace;
pub use kv::{KvStore, WriteOp};
pub use memory::MemoryStore;
pub use scan::{scan_matching, ScanOptions, ScanOutcome, ScanStats};
pub use sqlite::SqliteStore;
pub use writer::{reset_registry, BatchWriter, ResetOutcome, WriteStats};

use std::path::Path;

/// Open the store named by `location`: `:memory:` for an in-process store,
/// anything else as a SQLite file path.
pub fn open_store(location: &str) -> Result<Box<dyn KvStore>> {
    if location == ":memory:" {
        return Ok(Box::new(MemoryStore::new()));
    }
    Ok(Box::new(SqliteStore::open(Path::new(location))?))
}
