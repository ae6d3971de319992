// src/exec/sink.rs

use std::sync::Arc;

use crate::errors::Result;
use crate::store::RecordStore;
use crate::types::{PersistMode, ResultSnapshot};

/// Turns one execution's snapshots into store writes.
///
/// In `Update` mode the first successful write inserts the record and later
/// writes overwrite it by id. Until an insert succeeds every write retries
/// the insert, so a transient failure on the first chunk doesn't lose the
/// record. In `Snapshot` mode every write inserts.
pub struct ResultSink {
    store: Arc<dyn RecordStore>,
    mode: PersistMode,
    command: String,
    record_id: Option<i64>,
}

impl ResultSink {
    pub fn new(store: Arc<dyn RecordStore>, mode: PersistMode, command: String) -> Self {
        Self {
            store,
            mode,
            command,
            record_id: None,
        }
    }

    pub async fn save(&mut self, snapshot: ResultSnapshot) -> Result<i64> {
        if let (PersistMode::Update, Some(id)) = (self.mode, self.record_id) {
            self.store.update_result(id, snapshot).await?;
            return Ok(id);
        }

        let id = self
            .store
            .insert_record(self.command.clone(), snapshot)
            .await?;
        self.record_id = Some(id);
        Ok(id)
    }
}
