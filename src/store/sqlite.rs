// src/store/sqlite.rs

use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use anyhow::anyhow;
use rusqlite::{params, Connection, Row};
use tracing::debug;

use super::{RecordStore, StoreFuture};
use crate::errors::{CmdstreamError, Result};
use crate::types::{CommandRecord, ExecutionStatus, ResultSnapshot};

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS commands (
  id INTEGER PRIMARY KEY AUTOINCREMENT,
  command TEXT NOT NULL,
  result TEXT,
  status TEXT NOT NULL DEFAULT 'running',
  exit_code INTEGER
);
"#;

const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const SELECT_COLUMNS: &str = "SELECT id, command, result, status, exit_code FROM commands";

/// SQLite-backed record store.
///
/// One connection shared behind a mutex: every physical write is serialised,
/// which is all the concurrency control the pipeline needs.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open (or create) a database file with the default busy timeout.
    /// `":memory:"` opens a private in-memory database.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_busy_timeout(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open_with_busy_timeout(path: impl AsRef<Path>, busy_timeout: Duration) -> Result<Self> {
        let path = path.as_ref();
        if path == Path::new(":memory:") {
            return Self::open_in_memory();
        }

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(busy_timeout)?;

        debug!(path = %path.display(), ?busy_timeout, "opened sqlite record store");
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| {
            CmdstreamError::StorageUnavailable("sqlite connection mutex poisoned".to_string())
        })
    }

    pub fn insert_blocking(&self, command: &str, snapshot: &ResultSnapshot) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO commands (command, result, status, exit_code) VALUES (?1, ?2, ?3, ?4)",
            params![
                command,
                snapshot.result,
                snapshot.status.as_str(),
                snapshot.exit_code
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_blocking(&self, id: i64, snapshot: &ResultSnapshot) -> Result<()> {
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE commands SET result = ?1, status = ?2, exit_code = ?3 WHERE id = ?4",
            params![
                snapshot.result,
                snapshot.status.as_str(),
                snapshot.exit_code,
                id
            ],
        )?;
        if n == 0 {
            return Err(CmdstreamError::NotFound(id));
        }
        Ok(())
    }

    pub fn list_blocking(&self) -> Result<Vec<CommandRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id ASC"))?;
        let rows = stmt.query_map([], record_from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    pub fn get_blocking(&self, id: i64) -> Result<CommandRecord> {
        let conn = self.conn()?;
        let res = conn.query_row(
            &format!("{SELECT_COLUMNS} WHERE id = ?1"),
            params![id],
            record_from_row,
        );
        match res {
            Ok(record) => Ok(record),
            Err(rusqlite::Error::QueryReturnedNoRows) => Err(CmdstreamError::NotFound(id)),
            Err(e) => Err(e.into()),
        }
    }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CommandRecord> {
    let status: String = row.get(3)?;
    let status = status.parse::<ExecutionStatus>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, e.into())
    })?;
    Ok(CommandRecord {
        id: row.get(0)?,
        command: row.get(1)?,
        result: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
        status,
        exit_code: row.get(4)?,
    })
}

/// Offload rusqlite work from the async executor.
async fn run_blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| CmdstreamError::Other(anyhow!("join error: {e}")))?
}

impl RecordStore for SqliteStore {
    fn insert_record(&self, command: String, snapshot: ResultSnapshot) -> StoreFuture<'_, i64> {
        let store = self.clone();
        Box::pin(run_blocking(move || store.insert_blocking(&command, &snapshot)))
    }

    fn update_result(&self, id: i64, snapshot: ResultSnapshot) -> StoreFuture<'_, ()> {
        let store = self.clone();
        Box::pin(run_blocking(move || store.update_blocking(id, &snapshot)))
    }

    fn list_all(&self) -> StoreFuture<'_, Vec<CommandRecord>> {
        let store = self.clone();
        Box::pin(run_blocking(move || store.list_blocking()))
    }

    fn get_by_id(&self, id: i64) -> StoreFuture<'_, CommandRecord> {
        let store = self.clone();
        Box::pin(run_blocking(move || store.get_blocking(id)))
    }
}
