// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs submitted shell commands with `tokio::process::Command`
//! and persists their output as it arrives.
//!
//! - [`controller`] owns the lifecycle of each execution: spawn, stream,
//!   persist on every chunk, persist on exit, cancel.
//! - [`streamer`] reads a process's stdout in bounded chunks.
//! - [`sink`] turns accumulated output into store writes according to the
//!   configured `PersistMode`.
//! - [`gate`] is the process-wide one-shot stop signal.
//! - [`registry`] maps execution ids to cancellation tokens.

pub mod controller;
pub mod gate;
pub mod registry;
pub mod sink;
pub mod streamer;

pub use controller::{ExecutionController, ExecutionHandle, ExecutionOutcome};
pub use gate::{GateState, StopGate};
pub use registry::{ExecutionRegistry, ExecutionSummary};
pub use sink::ResultSink;
pub use streamer::{Chunk, OutputStreamer, DEFAULT_CHUNK_SIZE};
