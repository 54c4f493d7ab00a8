//! Run orchestration and artifact persistence.
//!
//! Each run gets its own directory `<out_root>/<run_id>/`:
//!
//! ```text
//! tlc.stdout            captured engine stdout
//! tlc.stderr            captured engine stderr
//! summary.json          the Summary, written atomically
//! counterexample.json   raw trace dump, only when the engine produced one
//! metadir/              engine scratch space
//! ```
//!
//! The run identifier is a UTC timestamp with millisecond precision, strictly
//! increasing within the process. The directory is created non-recursively,
//! so a concurrent collision surfaces as `AlreadyExists` and is resolved with
//! a `-NN` suffix.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, Instrument};

use crate::domain::summary::SUMMARY_SCHEMA_VERSION;
use crate::domain::{
    ArtifactPaths, InputProvenance, Outcome, ResolvedInputs, Result, RunConfig, RunRecord,
    Summary, WorkbenchError,
};
use crate::extract::{parse_bounds, MarkerTable, OutcomeScanner, StatsCollector};
use crate::invoker::{
    CaptureSinks, EngineCommand, EngineInvoker, Invocation, InvocationResult, ProcessInvoker,
};
use crate::obs;
use crate::trace_summary::summarize_trace_dump;

pub const STDOUT_FILE: &str = "tlc.stdout";
pub const STDERR_FILE: &str = "tlc.stderr";
pub const SUMMARY_FILE: &str = "summary.json";
pub const TRACE_FILE: &str = "counterexample.json";
pub const METADIR: &str = "metadir";

/// Collision suffixes tried before giving up on a timestamp.
const MAX_ID_SUFFIX: u32 = 99;

static LAST_ISSUED_MS: AtomicI64 = AtomicI64::new(0);

// ---------------------------------------------------------------------------
// Run identifiers
// ---------------------------------------------------------------------------

fn next_timestamp_ms() -> i64 {
    let now = Utc::now().timestamp_millis();
    let prev = LAST_ISSUED_MS
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
            Some(now.max(last + 1))
        })
        .unwrap_or_else(|last| last);
    now.max(prev + 1)
}

fn format_run_id(ms: i64) -> String {
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(ts) => ts.format("%Y%m%dT%H%M%S%3fZ").to_string(),
        None => format!("{:020}", ms),
    }
}

/// Allocate a fresh run identifier and create its directory under `out_root`.
///
/// Fails with [`WorkbenchError::RunDirCreate`] if `out_root` cannot be created
/// or written.
pub fn allocate_run_dir(out_root: &Path) -> Result<(String, PathBuf)> {
    std::fs::create_dir_all(out_root).map_err(|source| WorkbenchError::RunDirCreate {
        path: out_root.to_path_buf(),
        source,
    })?;

    let base = format_run_id(next_timestamp_ms());
    for suffix in 0..=MAX_ID_SUFFIX {
        let run_id = if suffix == 0 {
            base.clone()
        } else {
            format!("{}-{:02}", base, suffix)
        };
        let run_dir = out_root.join(&run_id);
        match std::fs::create_dir(&run_dir) {
            Ok(()) => return Ok((run_id, run_dir)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(source) => {
                return Err(WorkbenchError::RunDirCreate {
                    path: run_dir,
                    source,
                })
            }
        }
    }

    Err(WorkbenchError::Setup(format!(
        "could not allocate a run directory for {} under {}",
        base,
        out_root.display()
    )))
}

/// Directory of a run, derived from its identifier alone.
pub fn run_dir_for(out_root: &Path, run_id: &str) -> PathBuf {
    out_root.join(run_id)
}

// ---------------------------------------------------------------------------
// Summary persistence
// ---------------------------------------------------------------------------

/// Write `summary` to `path` atomically: temp file in the same directory,
/// then rename.
pub fn write_summary(summary: &Summary, path: &Path) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| WorkbenchError::Setup(format!("{} has no parent", path.display())))?;

    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer_pretty(&mut tmp, summary)?;
    tmp.write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Read a persisted summary.
pub fn read_summary(path: &Path) -> Result<Summary> {
    let json = std::fs::read(path)?;
    Ok(serde_json::from_slice(&json)?)
}

// ---------------------------------------------------------------------------
// Run lifecycle
// ---------------------------------------------------------------------------

/// A run that has started but not been finalized.
///
/// [`PendingRun::finish`] consumes it, so a run is finalized exactly once.
#[derive(Debug)]
pub struct PendingRun {
    run_id: String,
    started_at: DateTime<Utc>,
    clock: Instant,
    artifacts: ArtifactPaths,
}

impl PendingRun {
    pub fn start(run_id: String, artifacts: ArtifactPaths) -> Self {
        Self {
            run_id,
            started_at: Utc::now(),
            clock: Instant::now(),
            artifacts,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn finish(
        self,
        result: &InvocationResult,
        outcome: Outcome,
        trace_file: Option<PathBuf>,
    ) -> RunRecord {
        RunRecord {
            run_id: self.run_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_ms: self.clock.elapsed().as_millis() as u64,
            exit_code: result.exit_code,
            timed_out: result.timed_out(),
            outcome,
            artifacts: ArtifactPaths {
                counterexample: trace_file,
                ..self.artifacts
            },
        }
    }
}

async fn sha256_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hex::encode(Sha256::digest(&bytes)))
}

/// Feed each line of a captured stream to `sink` without loading the whole
/// file. A capture that was never created reads as empty.
async fn scan_capture(path: &Path, mut sink: impl FnMut(&str)) -> Result<()> {
    let file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "no captured output");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let mut reader = BufReader::new(file);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&buf);
        sink(line.trim_end_matches(['\r', '\n']));
    }
}

/// Coordinates one model-check run from configuration to persisted summary.
pub struct RunManager {
    invoker: Arc<dyn EngineInvoker>,
    markers: MarkerTable,
}

impl RunManager {
    /// A manager that launches the engine as a subprocess.
    pub fn new(markers: MarkerTable) -> Self {
        Self::with_invoker(Arc::new(ProcessInvoker::new()), markers)
    }

    pub fn with_invoker(invoker: Arc<dyn EngineInvoker>, markers: MarkerTable) -> Self {
        Self { invoker, markers }
    }

    /// Execute one run.
    ///
    /// Returns `Err` only for setup failures (unresolvable inputs, run
    /// directory creation, engine not launchable) and local I/O errors.
    /// Everything the engine reports, including timeouts, is an [`Outcome`]
    /// inside the returned [`Summary`].
    ///
    /// If the invoker fails after the engine was launched, the run is still
    /// classified and `summary.json` written before the error is returned.
    pub async fn run(&self, config: &RunConfig) -> Result<Summary> {
        let inputs = config.resolve().inspect_err(|e| obs::emit_run_setup_error(e))?;
        let (run_id, run_dir) =
            allocate_run_dir(&inputs.out_root).inspect_err(|e| obs::emit_run_setup_error(e))?;

        let span = obs::run_span(&run_id);
        self.execute(config, inputs, run_id, run_dir)
            .instrument(span)
            .await
    }

    async fn execute(
        &self,
        config: &RunConfig,
        inputs: ResolvedInputs,
        run_id: String,
        run_dir: PathBuf,
    ) -> Result<Summary> {
        obs::emit_run_started(&run_id, &inputs.module, &run_dir.to_string_lossy());

        let metadir = run_dir.join(METADIR);
        std::fs::create_dir(&metadir)?;

        let artifacts = ArtifactPaths {
            run_dir: run_dir.clone(),
            stdout: run_dir.join(STDOUT_FILE),
            stderr: run_dir.join(STDERR_FILE),
            summary: run_dir.join(SUMMARY_FILE),
            counterexample: None,
        };
        let trace_path = run_dir.join(TRACE_FILE);

        let command =
            EngineCommand::tlc(&inputs, &config.java, &config.limits, &metadir, &trace_path);
        let provenance = InputProvenance {
            spec_sha256: sha256_file(&inputs.spec_path).await?,
            cfg_sha256: sha256_file(&inputs.cfg_path).await?,
            spec_path: inputs.spec_path.clone(),
            cfg_path: inputs.cfg_path.clone(),
            module: inputs.module.clone(),
            engine: inputs.engine.clone(),
            command: command.argv(),
        };

        let invocation = Invocation {
            command,
            sinks: CaptureSinks {
                stdout: artifacts.stdout.clone(),
                stderr: artifacts.stderr.clone(),
            },
            timeout: config.timeout(),
        };

        let pending = PendingRun::start(run_id.clone(), artifacts.clone());
        let (result, invoke_error) = match self.invoker.invoke(&invocation).await {
            Ok(result) => (result, None),
            Err(e @ WorkbenchError::Spawn(_)) => {
                // nothing ran; leave no half-populated run directory behind
                if let Err(cleanup) = std::fs::remove_dir_all(&run_dir) {
                    debug!(error = %cleanup, "failed to remove run directory");
                }
                obs::emit_run_setup_error(&e);
                return Err(e);
            }
            Err(e) => {
                debug!(error = %e, "engine invocation failed after launch");
                (InvocationResult::unknown(), Some(e))
            }
        };

        let mut scanner = OutcomeScanner::new(&self.markers);
        let mut collector = StatsCollector::new();
        scan_capture(&artifacts.stdout, |line| {
            scanner.feed(line);
            collector.observe(line);
        })
        .await?;
        scanner.end_stream();
        scan_capture(&artifacts.stderr, |line| scanner.feed(line)).await?;

        let outcome = scanner.finish(result.exit_code, result.timed_out());
        obs::emit_run_classified(&run_id, &outcome);

        let mut stats = collector.finish();
        let bounds = match tokio::fs::read_to_string(&inputs.cfg_path).await {
            Ok(cfg) => parse_bounds(&cfg),
            Err(e) => {
                debug!(error = %e, "cfg unreadable; bounds left empty");
                Default::default()
            }
        };

        // A dump left next to a non-violation outcome is kept on disk but not
        // summarized.
        let trace_file = trace_path.is_file().then_some(trace_path);
        let (trace, trace_error) = match &trace_file {
            Some(path) if outcome.is_violation() => {
                let bytes = tokio::fs::read(path).await?;
                match summarize_trace_dump(&bytes) {
                    Ok(ce) => (Some(ce), None),
                    Err(e) => {
                        obs::emit_trace_unavailable(&run_id, &e);
                        (None, Some(e.to_string()))
                    }
                }
            }
            _ => (None, None),
        };

        if stats.depth.is_none() {
            stats.depth = trace.as_ref().map(|ce| ce.states_total as u64);
        }

        let record = pending.finish(&result, outcome, trace_file);
        let summary = Summary {
            schema_version: SUMMARY_SCHEMA_VERSION.to_string(),
            run: record,
            stats,
            bounds,
            inputs: provenance,
            trace,
            trace_error,
        };

        write_summary(&summary, &summary.run.artifacts.summary)?;
        obs::emit_run_finished(&run_id, summary.run.duration_ms, summary.outcome());

        match invoke_error {
            Some(e) => Err(e),
            None => Ok(summary),
        }
    }
}
