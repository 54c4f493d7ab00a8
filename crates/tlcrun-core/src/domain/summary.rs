//! Run record and the persisted summary document.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::config::EngineLocation;
use super::outcome::Outcome;
use super::trace::Counterexample;

/// Schema tag written into every `summary.json`.
pub const SUMMARY_SCHEMA_VERSION: &str = "tlcrun.summary/1";

/// Files produced by one run, all beneath `run_dir`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub run_dir: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
    pub summary: PathBuf,
    /// Raw engine trace dump; `None` when the engine produced none.
    pub counterexample: Option<PathBuf>,
}

/// One finalized execution attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunRecord {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    /// Raw child exit code; `None` when killed by a signal or timed out.
    pub exit_code: Option<i32>,
    pub timed_out: bool,
    pub outcome: Outcome,
    pub artifacts: ArtifactPaths,
}

/// Where the inputs came from and how the engine was invoked.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputProvenance {
    pub spec_path: PathBuf,
    pub cfg_path: PathBuf,
    pub module: String,
    pub engine: EngineLocation,
    pub spec_sha256: String,
    pub cfg_sha256: String,
    /// Full argv, program first.
    pub command: Vec<String>,
}

/// State-space counters reported by the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunStats {
    pub states_generated: Option<u64>,
    pub distinct_states: Option<u64>,
    pub states_left_on_queue: Option<u64>,
    pub depth: Option<u64>,
}

/// The report written once per run to `summary.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Summary {
    pub schema_version: String,

    #[serde(flatten)]
    pub run: RunRecord,

    #[serde(flatten)]
    pub stats: RunStats,

    /// Constant assignments from the model configuration.
    pub bounds: BTreeMap<String, String>,

    pub inputs: InputProvenance,

    /// Summarized counterexample; `null` when none was produced or the dump
    /// could not be parsed.
    pub trace: Option<Counterexample>,

    /// Why `trace` is `null` despite a dump being present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_error: Option<String>,
}

impl Summary {
    pub fn outcome(&self) -> &Outcome {
        &self.run.outcome
    }

    pub fn run_id(&self) -> &str {
        &self.run.run_id
    }
}
