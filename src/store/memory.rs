// src/store/memory.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::{RecordStore, StoreFuture};
use crate::errors::{CmdstreamError, Result};
use crate::types::{CommandRecord, ResultSnapshot};

#[derive(Debug, Default)]
struct Inner {
    next_id: i64,
    records: BTreeMap<i64, CommandRecord>,
}

/// In-process record store. Ids start at 1, like SQLite's rowids.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner.lock().map_err(|_| {
            CmdstreamError::StorageUnavailable("memory store mutex poisoned".to_string())
        })
    }

    pub fn len(&self) -> usize {
        self.lock().map(|inner| inner.records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn insert(&self, command: String, snapshot: ResultSnapshot) -> Result<i64> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.records.insert(
            id,
            CommandRecord {
                id,
                command,
                result: snapshot.result,
                status: snapshot.status,
                exit_code: snapshot.exit_code,
            },
        );
        Ok(id)
    }

    fn update(&self, id: i64, snapshot: ResultSnapshot) -> Result<()> {
        let mut inner = self.lock()?;
        let record = inner
            .records
            .get_mut(&id)
            .ok_or(CmdstreamError::NotFound(id))?;
        record.result = snapshot.result;
        record.status = snapshot.status;
        record.exit_code = snapshot.exit_code;
        Ok(())
    }

    fn get(&self, id: i64) -> Result<CommandRecord> {
        self.lock()?
            .records
            .get(&id)
            .cloned()
            .ok_or(CmdstreamError::NotFound(id))
    }

    fn all(&self) -> Result<Vec<CommandRecord>> {
        Ok(self.lock()?.records.values().cloned().collect())
    }
}

impl RecordStore for MemoryStore {
    fn insert_record(&self, command: String, snapshot: ResultSnapshot) -> StoreFuture<'_, i64> {
        Box::pin(async move { self.insert(command, snapshot) })
    }

    fn update_result(&self, id: i64, snapshot: ResultSnapshot) -> StoreFuture<'_, ()> {
        Box::pin(async move { self.update(id, snapshot) })
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<CommandRecord>> {
        Box::pin(async move { self.all() })
    }

    fn get_by_id(&self, id: i64) -> StoreFuture<'_, CommandRecord> {
        Box::pin(async move { self.get(id) })
    }
}
