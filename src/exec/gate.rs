// src/exec/gate.rs

use std::sync::{Mutex, PoisonError};

use crate::errors::{CmdstreamError, Result};

/// State of the process-wide stop gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    Closed,
}

/// One-shot stop signal shared by the whole process.
///
/// Starts `Open`; the first [`trip`](StopGate::trip) closes it for good and
/// every later trip fails with `AlreadyStopped`.
#[derive(Debug)]
pub struct StopGate {
    state: Mutex<GateState>,
}

impl StopGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::Open),
        }
    }

    pub fn state(&self) -> GateState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_tripped(&self) -> bool {
        self.state() == GateState::Closed
    }

    pub fn trip(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        match *state {
            GateState::Closed => Err(CmdstreamError::AlreadyStopped),
            GateState::Open => {
                *state = GateState::Closed;
                Ok(())
            }
        }
    }
}

impl Default for StopGate {
    fn default() -> Self {
        Self::new()
    }
}
