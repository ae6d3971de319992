// src/exec/registry.rs

//! Bookkeeping for in-flight executions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::{CmdstreamError, Result};
use crate::types::ExecutionId;

/// Internal handle for a currently-running execution.
struct ActiveExecution {
    command: String,
    cancel: CancellationToken,
}

/// Public view of an in-flight execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecutionSummary {
    pub execution_id: ExecutionId,
    pub command: String,
}

/// Maps execution ids to their cancellation tokens.
///
/// Entries are added when an execution is accepted and removed when it
/// ends, whatever the outcome.
#[derive(Default)]
pub struct ExecutionRegistry {
    next_id: AtomicU64,
    active: Mutex<HashMap<ExecutionId, ActiveExecution>>,
}

impl ExecutionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn active(&self) -> MutexGuard<'_, HashMap<ExecutionId, ActiveExecution>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a fresh id and token for a new execution.
    pub fn register(&self, command: &str) -> (ExecutionId, CancellationToken) {
        let id = ExecutionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let cancel = CancellationToken::new();
        self.active().insert(
            id,
            ActiveExecution {
                command: command.to_string(),
                cancel: cancel.clone(),
            },
        );
        (id, cancel)
    }

    pub fn unregister(&self, id: ExecutionId) {
        if self.active().remove(&id).is_none() {
            debug!(execution_id = %id, "execution was not registered");
        }
    }

    /// Request cancellation of one execution.
    pub fn cancel(&self, id: ExecutionId) -> Result<()> {
        let active = self.active();
        let entry = active.get(&id).ok_or(CmdstreamError::NotRunning(id))?;
        entry.cancel.cancel();
        Ok(())
    }

    /// Request cancellation of every in-flight execution; returns how many
    /// were signalled.
    pub fn cancel_all(&self) -> usize {
        let active = self.active();
        for entry in active.values() {
            entry.cancel.cancel();
        }
        active.len()
    }

    pub fn is_active(&self, id: ExecutionId) -> bool {
        self.active().contains_key(&id)
    }

    /// Snapshot of in-flight executions, ordered by id.
    pub fn list(&self) -> Vec<ExecutionSummary> {
        let mut out: Vec<ExecutionSummary> = self
            .active()
            .iter()
            .map(|(id, entry)| ExecutionSummary {
                execution_id: *id,
                command: entry.command.clone(),
            })
            .collect();
        out.sort_by_key(|s| s.execution_id);
        out
    }
}
