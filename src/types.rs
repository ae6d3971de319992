// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A persisted pairing of a submitted command and its (possibly partial)
/// output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub id: i64,
    pub command: String,
    pub result: String,
    pub status: ExecutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

/// The mutable part of a record, as written by one persistence event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultSnapshot {
    pub result: String,
    pub status: ExecutionStatus,
    pub exit_code: Option<i32>,
}

impl ResultSnapshot {
    /// Snapshot written while the process is still producing output.
    pub fn running(result: impl Into<String>) -> Self {
        Self {
            result: result.into(),
            status: ExecutionStatus::Running,
            exit_code: None,
        }
    }
}

/// Where an execution currently stands, as seen by readers of the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Succeeded => "succeeded",
            ExecutionStatus::Failed => "failed",
            ExecutionStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ExecutionStatus::Running)
    }
}

impl Default for ExecutionStatus {
    fn default() -> Self {
        ExecutionStatus::Running
    }
}

impl FromStr for ExecutionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(ExecutionStatus::Running),
            "succeeded" => Ok(ExecutionStatus::Succeeded),
            "failed" => Ok(ExecutionStatus::Failed),
            "cancelled" => Ok(ExecutionStatus::Cancelled),
            other => Err(format!("invalid execution status: {other}")),
        }
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How incremental output is written to the store.
///
/// - `Update`: the first successful write creates the record, every later
///   write for the same execution overwrites it in place (default).
/// - `Snapshot`: every write inserts a fresh record, so one execution leaves
///   a trail of growing snapshots behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistMode {
    Update,
    Snapshot,
}

impl Default for PersistMode {
    fn default() -> Self {
        PersistMode::Update
    }
}

impl FromStr for PersistMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "update" => Ok(PersistMode::Update),
            "snapshot" => Ok(PersistMode::Snapshot),
            other => Err(format!(
                "invalid persist_mode: {other} (expected \"update\" or \"snapshot\")"
            )),
        }
    }
}

/// Which record store backs the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl Default for StoreBackend {
    fn default() -> Self {
        StoreBackend::Sqlite
    }
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!(
                "invalid database backend: {other} (expected \"sqlite\" or \"memory\")"
            )),
        }
    }
}

/// Identifier assigned to an execution when it is accepted.
///
/// Independent of the store-assigned record id, which only exists once the
/// first write succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExecutionId(pub u64);

impl fmt::Display for ExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
