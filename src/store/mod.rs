// src/store/mod.rs

//! Record store abstraction.
//!
//! The execution controller and the HTTP layer talk to a [`RecordStore`]
//! rather than to a concrete database, so tests can swap in an in-memory or
//! deliberately failing implementation.
//!
//! - [`sqlite`] is the production store (rusqlite, one serialised
//!   connection, blocking work offloaded with `spawn_blocking`).
//! - [`memory`] keeps records in a `BTreeMap`; handy for tests and for
//!   running without a database file.

pub mod memory;
pub mod sqlite;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::errors::Result;
use crate::types::{CommandRecord, ResultSnapshot, StoreBackend};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Boxed future returned by [`RecordStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Durable keyed storage of command records.
pub trait RecordStore: Send + Sync {
    /// Insert a new record and return its store-assigned id.
    fn insert_record(&self, command: String, snapshot: ResultSnapshot) -> StoreFuture<'_, i64>;

    /// Overwrite result, status and exit code of an existing record.
    ///
    /// Fails with `NotFound` if no record has this id.
    fn update_result(&self, id: i64, snapshot: ResultSnapshot) -> StoreFuture<'_, ()>;

    /// All current records, ascending by id.
    fn list_all(&self) -> StoreFuture<'_, Vec<CommandRecord>>;

    /// Fails with `NotFound` if no record has this id.
    fn get_by_id(&self, id: i64) -> StoreFuture<'_, CommandRecord>;
}

/// Open the store described by `[database]`.
pub fn open_store(cfg: &DatabaseConfig) -> Result<Arc<dyn RecordStore>> {
    match cfg.backend {
        StoreBackend::Sqlite => Ok(Arc::new(SqliteStore::open_with_busy_timeout(
            &cfg.path,
            cfg.busy_timeout,
        )?)),
        StoreBackend::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
