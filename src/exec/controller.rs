// src/exec/controller.rs

//! Lifecycle of submitted commands: spawn, stream, persist, cancel.

use std::process::Stdio;
use std::sync::Arc;

use anyhow::anyhow;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::config::ExecutionSettings;
use crate::errors::{CmdstreamError, Result};
use crate::store::RecordStore;
use crate::types::{ExecutionId, ExecutionStatus, ResultSnapshot};

use super::gate::StopGate;
use super::registry::{ExecutionRegistry, ExecutionSummary};
use super::sink::ResultSink;
use super::streamer::OutputStreamer;

/// How an execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// The process or its stdout pipe could not be set up. No record.
    SpawnFailed,
    /// The process exited and the final result was persisted (best effort).
    Completed { exit_code: Option<i32>, success: bool },
    /// Waiting for the process failed; the final write was skipped.
    WaitFailed,
    /// Cancelled via the stop gate or a per-execution stop.
    Cancelled,
}

/// Returned by [`ExecutionController::execute`].
///
/// Dropping it detaches the execution; it keeps running in the background.
#[derive(Debug)]
pub struct ExecutionHandle {
    id: ExecutionId,
    join: JoinHandle<ExecutionOutcome>,
}

impl ExecutionHandle {
    pub fn id(&self) -> ExecutionId {
        self.id
    }

    /// Wait for the execution to end.
    pub async fn wait(self) -> Result<ExecutionOutcome> {
        self.join
            .await
            .map_err(|e| CmdstreamError::Other(anyhow!("execution {} task failed: {e}", self.id)))
    }
}

struct Shared {
    store: Arc<dyn RecordStore>,
    settings: ExecutionSettings,
    registry: ExecutionRegistry,
    gate: StopGate,
    limiter: Option<Arc<Semaphore>>,
}

/// Accepts commands and runs each one on its own Tokio task.
///
/// Cheap to clone; all clones share the store, the registry and the stop
/// gate.
#[derive(Clone)]
pub struct ExecutionController {
    shared: Arc<Shared>,
}

impl ExecutionController {
    pub fn new(store: Arc<dyn RecordStore>, settings: ExecutionSettings) -> Self {
        let limiter = settings
            .concurrency_limit()
            .map(|n| Arc::new(Semaphore::new(n)));
        Self {
            shared: Arc::new(Shared {
                store,
                settings,
                registry: ExecutionRegistry::new(),
                gate: StopGate::new(),
                limiter,
            }),
        }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.shared.store
    }

    pub fn gate(&self) -> &StopGate {
        &self.shared.gate
    }

    /// Accept a command and return immediately.
    ///
    /// Spawning, streaming and persistence all happen on a background task
    /// that may outlive the caller. Failures there are only logged.
    pub fn execute(&self, command: impl Into<String>) -> ExecutionHandle {
        let command = command.into();
        let (id, cancel) = self.shared.registry.register(&command);
        info!(execution_id = %id, cmd = %command, "accepted command");

        let shared = Arc::clone(&self.shared);
        let join = tokio::spawn(async move {
            let outcome = run_execution(&shared, id, command, cancel).await;
            shared.registry.unregister(id);
            debug!(execution_id = %id, ?outcome, "execution finished");
            outcome
        });

        ExecutionHandle { id, join }
    }

    /// Trip the stop gate and cancel everything currently running.
    ///
    /// Fails with `AlreadyStopped` (cancelling nothing) if the gate was
    /// already tripped.
    pub fn stop_all(&self) -> Result<usize> {
        self.shared.gate.trip()?;
        let cancelled = self.shared.registry.cancel_all();
        info!(cancelled, "stop gate tripped");
        Ok(cancelled)
    }

    /// Cancel a single in-flight execution.
    pub fn stop(&self, id: ExecutionId) -> Result<()> {
        self.shared.registry.cancel(id)?;
        info!(execution_id = %id, "stop requested for execution");
        Ok(())
    }

    /// Cancel in-flight executions without touching the gate (server
    /// shutdown).
    pub fn cancel_all(&self) -> usize {
        self.shared.registry.cancel_all()
    }

    pub fn active_executions(&self) -> Vec<ExecutionSummary> {
        self.shared.registry.list()
    }

    pub fn is_active(&self, id: ExecutionId) -> bool {
        self.shared.registry.is_active(id)
    }
}

async fn run_execution(
    shared: &Shared,
    id: ExecutionId,
    command: String,
    cancel: CancellationToken,
) -> ExecutionOutcome {
    let _permit = match &shared.limiter {
        Some(limiter) => tokio::select! {
            permit = Arc::clone(limiter).acquire_owned() => match permit {
                Ok(permit) => Some(permit),
                Err(e) => {
                    error!(execution_id = %id, error = %e, "concurrency limiter closed");
                    return ExecutionOutcome::SpawnFailed;
                }
            },
            _ = cancel.cancelled() => {
                info!(execution_id = %id, "cancelled while waiting for a free slot");
                return ExecutionOutcome::Cancelled;
            }
        },
        None => None,
    };

    if cancel.is_cancelled() {
        info!(execution_id = %id, "cancelled before the process was started");
        return ExecutionOutcome::Cancelled;
    }

    let mut child = match spawn_shell(&shared.settings.shell, &command) {
        Ok(child) => child,
        Err(e) => {
            error!(execution_id = %id, cmd = %command, error = %e, "error starting command");
            return ExecutionOutcome::SpawnFailed;
        }
    };

    let Some(stdout) = child.stdout.take() else {
        error!(execution_id = %id, "stdout pipe unavailable");
        if let Err(e) = child.kill().await {
            warn!(execution_id = %id, error = %e, "failed to kill process without stdout");
        }
        return ExecutionOutcome::SpawnFailed;
    };
    drain_stderr(id, child.stderr.take());

    let mut streamer = OutputStreamer::new(stdout, shared.settings.chunk_size);
    let mut sink = ResultSink::new(
        Arc::clone(&shared.store),
        shared.settings.persist_mode,
        command,
    );
    let mut output: Vec<u8> = Vec::new();

    loop {
        tokio::select! {
            chunk = streamer.next_chunk() => {
                if !chunk.bytes.is_empty() {
                    output.extend_from_slice(&chunk.bytes);
                    let snapshot = ResultSnapshot::running(String::from_utf8_lossy(&output));
                    match sink.save(snapshot).await {
                        Ok(record_id) => trace!(
                            execution_id = %id,
                            record_id,
                            bytes = output.len(),
                            "saved partial result"
                        ),
                        Err(e) => warn!(execution_id = %id, error = %e, "error saving partial result"),
                    }
                }
                if chunk.done {
                    break;
                }
            }
            _ = cancel.cancelled() => {
                return cancel_execution(id, &mut child, &mut sink, &output).await;
            }
        }
    }

    let status = tokio::select! {
        res = child.wait() => res,
        _ = cancel.cancelled() => {
            return cancel_execution(id, &mut child, &mut sink, &output).await;
        }
    };

    let status = match status {
        Ok(status) => status,
        Err(e) => {
            error!(execution_id = %id, error = %e, "error waiting for command");
            return ExecutionOutcome::WaitFailed;
        }
    };

    let exit_code = status.code();
    let success = status.success();
    info!(
        execution_id = %id,
        exit_code = ?exit_code,
        success,
        bytes = output.len(),
        "command process exited"
    );

    let snapshot = ResultSnapshot {
        result: String::from_utf8_lossy(&output).into_owned(),
        status: if success {
            ExecutionStatus::Succeeded
        } else {
            ExecutionStatus::Failed
        },
        exit_code,
    };
    if let Err(e) = sink.save(snapshot).await {
        error!(execution_id = %id, error = %e, "error saving final result");
    }

    ExecutionOutcome::Completed { exit_code, success }
}

/// Kill the child and persist whatever output was collected so far.
async fn cancel_execution(
    id: ExecutionId,
    child: &mut Child,
    sink: &mut ResultSink,
    output: &[u8],
) -> ExecutionOutcome {
    info!(execution_id = %id, "cancellation requested; killing process group");
    kill_process_group(id, child);
    if let Err(e) = child.kill().await {
        warn!(execution_id = %id, error = %e, "failed to kill child process on cancellation");
    }

    let snapshot = ResultSnapshot {
        result: String::from_utf8_lossy(output).into_owned(),
        status: ExecutionStatus::Cancelled,
        exit_code: None,
    };
    if let Err(e) = sink.save(snapshot).await {
        error!(execution_id = %id, error = %e, "error saving cancelled result");
    }

    ExecutionOutcome::Cancelled
}

fn spawn_shell(shell: &str, command: &str) -> std::io::Result<Child> {
    let mut cmd = Command::new(shell);
    cmd.arg("-c")
        .arg(command)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    // Own process group, so a stop reaches everything the shell forks.
    #[cfg(unix)]
    cmd.process_group(0);
    cmd.spawn()
}

/// SIGKILL the whole process group led by `child`.
#[cfg(unix)]
fn kill_process_group(id: ExecutionId, child: &Child) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    let Some(pid) = child.id() else {
        return;
    };
    let Ok(pgid) = i32::try_from(pid) else {
        warn!(execution_id = %id, pid, "pid out of range for a process group id");
        return;
    };
    if let Err(e) = killpg(Pid::from_raw(pgid), Signal::SIGKILL) {
        debug!(execution_id = %id, error = %e, "killpg failed; group already gone");
    }
}

#[cfg(not(unix))]
fn kill_process_group(_id: ExecutionId, _child: &Child) {}

/// Consume stderr until EOF so the pipe never fills up or closes early.
///
/// Lines go to the debug log, decoded lossily; stderr is not required to be
/// UTF-8.
fn drain_stderr(id: ExecutionId, stderr: Option<ChildStderr>) {
    if let Some(stderr) = stderr {
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => break,
                    Ok(_) => {
                        let text = String::from_utf8_lossy(&line);
                        debug!(execution_id = %id, "stderr: {}", text.trim_end());
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(e) => {
                        warn!(execution_id = %id, error = %e, "error reading stderr");
                        break;
                    }
                }
            }
        });
    }
}
