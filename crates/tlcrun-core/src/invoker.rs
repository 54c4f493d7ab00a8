//! Checker invocation: command construction and subprocess execution.
//!
//! The invoker streams the engine's stdout/stderr straight into files as
//! they are produced, enforces an optional wall-clock timeout and reports the
//! raw exit status. It never interprets exit codes.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::{EngineLocation, ResolvedInputs, ResourceLimits, Result, WorkbenchError};

/// Main class inside `tla2tools.jar`.
pub const TLC_MAIN_CLASS: &str = "tlc2.TLC";

/// Seed and fingerprint index pinned so repeated runs explore identically.
pub const DETERMINISTIC_SEED: &str = "0";

/// How long to wait for output pumps after the child is gone.
const DEFAULT_DRAIN_GRACE: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Command construction
// ---------------------------------------------------------------------------

/// A fully built engine command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl EngineCommand {
    /// Build a TLC invocation that dumps a JSON trace on failure.
    ///
    /// Archives run as `java [-Xmx..] -cp <jar> tlc2.TLC <args>`; executables
    /// receive `<args>` directly. The working directory is the spec directory.
    pub fn tlc(
        inputs: &ResolvedInputs,
        java: &str,
        limits: &ResourceLimits,
        metadir: &Path,
        trace_path: &Path,
    ) -> Self {
        let tlc_args = [
            "-workers".to_string(),
            limits.workers.max(1).to_string(),
            "-seed".to_string(),
            DETERMINISTIC_SEED.to_string(),
            "-fp".to_string(),
            DETERMINISTIC_SEED.to_string(),
            "-metadir".to_string(),
            metadir.to_string_lossy().into_owned(),
            "-dumpTrace".to_string(),
            "json".to_string(),
            trace_path.to_string_lossy().into_owned(),
            "-config".to_string(),
            inputs.cfg_arg(),
            inputs.module.clone(),
        ];

        let (program, args) = match &inputs.engine {
            EngineLocation::Archive(jar) => {
                let mut args = Vec::with_capacity(tlc_args.len() + 4);
                if let Some(mb) = limits.memory_mb {
                    args.push(format!("-Xmx{}m", mb));
                }
                args.push("-cp".to_string());
                args.push(jar.to_string_lossy().into_owned());
                args.push(TLC_MAIN_CLASS.to_string());
                args.extend(tlc_args);
                (PathBuf::from(java), args)
            }
            EngineLocation::Executable(path) => (path.clone(), tlc_args.to_vec()),
        };

        Self {
            program,
            args,
            cwd: inputs.spec_dir.clone(),
        }
    }

    /// Program followed by its arguments.
    pub fn argv(&self) -> Vec<String> {
        std::iter::once(self.program.to_string_lossy().into_owned())
            .chain(self.args.iter().cloned())
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Invocation contract
// ---------------------------------------------------------------------------

/// Where captured output is streamed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSinks {
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// One engine execution request.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: EngineCommand,
    pub sinks: CaptureSinks,
    pub timeout: Option<Duration>,
}

/// Why the child stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process exited on its own.
    Exited,
    /// The timeout expired and the process was killed.
    TimedOut,
    /// An external stop signal was forwarded by killing the process.
    Interrupted,
    /// The invoker failed after launch; how the process ended is not known.
    Unknown,
}

/// Raw result of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Exit code; `None` if the process was killed or died by a signal.
    pub exit_code: Option<i32>,
    pub termination: Termination,
    pub duration_ms: u64,
    pub stdout_bytes: u64,
    pub stderr_bytes: u64,
}

impl InvocationResult {
    /// Stand-in for an invocation that failed after the engine was launched.
    pub fn unknown() -> Self {
        Self {
            exit_code: None,
            termination: Termination::Unknown,
            duration_ms: 0,
            stdout_bytes: 0,
            stderr_bytes: 0,
        }
    }

    pub fn timed_out(&self) -> bool {
        self.termination == Termination::TimedOut
    }
}

/// Backend that executes the checking engine.
#[async_trait]
pub trait EngineInvoker: Send + Sync {
    /// Run the engine to completion, timeout or interruption.
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationResult>;
}

// ---------------------------------------------------------------------------
// Subprocess backend
// ---------------------------------------------------------------------------

/// Runs the engine as a child process.
#[derive(Debug, Clone)]
pub struct ProcessInvoker {
    /// Kill the child when the current process receives Ctrl-C.
    pub forward_interrupt: bool,

    /// Upper bound on draining output after the child is gone (a grandchild
    /// may still hold the pipes open).
    pub drain_grace: Duration,
}

impl Default for ProcessInvoker {
    fn default() -> Self {
        Self {
            forward_interrupt: false,
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

impl ProcessInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn forwarding_interrupts(mut self) -> Self {
        self.forward_interrupt = true;
        self
    }
}

async fn pump<R>(mut reader: R, path: PathBuf) -> std::io::Result<u64>
where
    R: AsyncRead + Unpin,
{
    let mut file = tokio::fs::File::create(&path).await?;
    let copied = tokio::io::copy(&mut reader, &mut file).await?;
    file.flush().await?;
    Ok(copied)
}

/// Wait for an output pump. A pump still running after `grace` is aborted and
/// its capture kept as truncated; a failed pump is returned as an I/O error.
async fn drain(
    handle: JoinHandle<std::io::Result<u64>>,
    grace: Duration,
    stream: &str,
) -> std::io::Result<u64> {
    let abort = handle.abort_handle();
    match tokio::time::timeout(grace, handle).await {
        Ok(Ok(copied)) => copied,
        Ok(Err(e)) => Err(std::io::Error::other(format!(
            "{} capture task failed: {}",
            stream, e
        ))),
        Err(_) => {
            warn!(stream = stream, "output still open after engine exit; truncating capture");
            abort.abort();
            Ok(0)
        }
    }
}

async fn deadline(timeout: Option<Duration>) {
    match timeout {
        Some(d) => tokio::time::sleep(d).await,
        None => std::future::pending().await,
    }
}

async fn interrupt(enabled: bool) {
    if !enabled || tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

#[async_trait]
impl EngineInvoker for ProcessInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationResult> {
        let start = Instant::now();
        let command = &invocation.command;

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .current_dir(&command.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(WorkbenchError::Spawn)?;

        crate::obs::emit_engine_spawned(&command.program.to_string_lossy(), child.id());

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkbenchError::Setup("engine stdout was not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| WorkbenchError::Setup("engine stderr was not captured".to_string()))?;
        let stdout_task = tokio::spawn(pump(stdout, invocation.sinks.stdout.clone()));
        let stderr_task = tokio::spawn(pump(stderr, invocation.sinks.stderr.clone()));

        let (termination, exit_code) = tokio::select! {
            status = child.wait() => (Termination::Exited, status?.code()),
            _ = deadline(invocation.timeout) => (Termination::TimedOut, None),
            _ = interrupt(self.forward_interrupt) => (Termination::Interrupted, None),
        };

        if termination != Termination::Exited {
            if let Err(e) = child.kill().await {
                debug!(error = %e, "engine already gone when stopping");
            }
        }

        let stdout_bytes = drain(stdout_task, self.drain_grace, "stdout").await;
        let stderr_bytes = drain(stderr_task, self.drain_grace, "stderr").await;
        let (stdout_bytes, stderr_bytes) = (stdout_bytes?, stderr_bytes?);
        let duration_ms = start.elapsed().as_millis() as u64;

        match termination {
            Termination::Exited => crate::obs::emit_engine_exited(exit_code, duration_ms),
            Termination::TimedOut => crate::obs::emit_engine_timed_out(
                invocation.timeout.map(|t| t.as_secs()).unwrap_or_default(),
            ),
            Termination::Interrupted => crate::obs::emit_engine_interrupted(),
            Termination::Unknown => {}
        }

        Ok(InvocationResult {
            exit_code,
            termination,
            duration_ms,
            stdout_bytes,
            stderr_bytes,
        })
    }
}
