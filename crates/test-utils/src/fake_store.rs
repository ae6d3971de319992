use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cmdstream::errors::CmdstreamError;
use cmdstream::store::{MemoryStore, RecordStore, StoreFuture};
use cmdstream::types::{CommandRecord, ResultSnapshot};

/// One write observed by a [`FlakyStore`], successful or not.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreWrite {
    Insert { command: String, snapshot: ResultSnapshot },
    Update { id: i64, snapshot: ResultSnapshot },
}

/// A store that:
/// - records every write attempt in order
/// - fails the first `fail_inserts` inserts with `StorageUnavailable`
/// - otherwise delegates to a `MemoryStore`.
#[derive(Clone, Default)]
pub struct FlakyStore {
    inner: MemoryStore,
    writes: Arc<Mutex<Vec<StoreWrite>>>,
    fail_inserts: Arc<AtomicUsize>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_first_inserts(n: usize) -> Self {
        let store = Self::default();
        store.fail_inserts.store(n, Ordering::SeqCst);
        store
    }

    pub fn writes(&self) -> Vec<StoreWrite> {
        self.writes.lock().unwrap().clone()
    }

    pub fn records(&self) -> MemoryStore {
        self.inner.clone()
    }

    fn should_fail_insert(&self) -> bool {
        self.fail_inserts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl RecordStore for FlakyStore {
    fn insert_record(&self, command: String, snapshot: ResultSnapshot) -> StoreFuture<'_, i64> {
        self.writes.lock().unwrap().push(StoreWrite::Insert {
            command: command.clone(),
            snapshot: snapshot.clone(),
        });
        let fail = self.should_fail_insert();
        Box::pin(async move {
            if fail {
                return Err(CmdstreamError::StorageUnavailable(
                    "injected insert failure".to_string(),
                ));
            }
            self.inner.insert_record(command, snapshot).await
        })
    }

    fn update_result(&self, id: i64, snapshot: ResultSnapshot) -> StoreFuture<'_, ()> {
        self.writes.lock().unwrap().push(StoreWrite::Update {
            id,
            snapshot: snapshot.clone(),
        });
        self.inner.update_result(id, snapshot)
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<CommandRecord>> {
        self.inner.list_all()
    }

    fn get_by_id(&self, id: i64) -> StoreFuture<'_, CommandRecord> {
        self.inner.get_by_id(id)
    }
}
