//! Marker table and outcome classification.
//!
//! The engine's console output is scanned line by line against a table of
//! regular expressions. The table is data (TOML), versioned, and can be
//! replaced without touching the classifier.

use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::domain::{Outcome, Result, WorkbenchError};

/// Marker table shipped with the crate.
pub const DEFAULT_TLC_MARKERS: &str = include_str!("../../markers/tlc.toml");

/// Highest marker table schema version this build understands.
pub const SUPPORTED_MARKER_TABLE_VERSION: u32 = 1;

/// Lines following a usage-error marker that are kept as its message.
const USAGE_CONTEXT_LINES: usize = 20;

/// What a marker signals.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    UsageError,
    Deadlock,
    Invariant,
    Liveness,
}

#[derive(Debug, Deserialize)]
struct MarkerTableDoc {
    version: u32,
    #[serde(default)]
    engine: Option<String>,
    #[serde(rename = "marker", default)]
    markers: Vec<MarkerDoc>,
}

#[derive(Debug, Deserialize)]
struct MarkerDoc {
    kind: MarkerKind,
    pattern: String,
}

/// A compiled marker.
#[derive(Debug, Clone)]
pub struct Marker {
    pub kind: MarkerKind,
    pub regex: Regex,
}

/// Ordered set of compiled markers.
#[derive(Debug, Clone)]
pub struct MarkerTable {
    pub version: u32,
    pub engine: String,
    markers: Vec<Marker>,
}

impl MarkerTable {
    /// Parse and compile a TOML marker table.
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let doc: MarkerTableDoc =
            toml::from_str(source).map_err(|e| WorkbenchError::MarkerTable(e.to_string()))?;

        if doc.version == 0 || doc.version > SUPPORTED_MARKER_TABLE_VERSION {
            return Err(WorkbenchError::MarkerTable(format!(
                "unsupported marker table version {} (supported: {})",
                doc.version, SUPPORTED_MARKER_TABLE_VERSION
            )));
        }
        if doc.markers.is_empty() {
            return Err(WorkbenchError::MarkerTable("no markers defined".to_string()));
        }

        let markers = doc
            .markers
            .into_iter()
            .map(|m| {
                Regex::new(&m.pattern)
                    .map(|regex| Marker { kind: m.kind, regex })
                    .map_err(|e| WorkbenchError::MarkerTable(format!("{}: {}", m.pattern, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            version: doc.version,
            engine: doc.engine.unwrap_or_else(|| "unknown".to_string()),
            markers,
        })
    }

    /// Load a marker table from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)
            .map_err(|e| WorkbenchError::MarkerTable(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&source)
    }

    /// The built-in TLC marker table.
    pub fn tlc_default() -> Self {
        Self::from_toml_str(DEFAULT_TLC_MARKERS).expect("embedded TLC marker table is valid")
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// First marker matching `line`, in table order.
    pub fn match_line(&self, line: &str) -> Option<MarkerHit> {
        self.markers.iter().find_map(|marker| {
            marker.regex.captures(line).map(|caps| MarkerHit {
                kind: marker.kind,
                name: caps.name("name").map(|m| m.as_str().to_string()),
                line: line.trim().to_string(),
            })
        })
    }
}

/// A line that matched a marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerHit {
    pub kind: MarkerKind,
    pub name: Option<String>,
    pub line: String,
}

/// Console output of one engine invocation, as seen by the classifier.
#[derive(Debug, Clone, Copy)]
pub struct CapturedOutput<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub exit_code: Option<i32>,
    pub timed_out: bool,
}

/// Incremental classifier fed one output line at a time.
///
/// Holds only the first violation hit and the usage-error context, so
/// memory stays bounded however much the engine prints.
#[derive(Debug)]
pub struct OutcomeScanner<'t> {
    table: &'t MarkerTable,
    first_violation: Option<MarkerHit>,
    usage: Option<Vec<String>>,
    usage_open: bool,
}

impl<'t> OutcomeScanner<'t> {
    pub fn new(table: &'t MarkerTable) -> Self {
        Self {
            table,
            first_violation: None,
            usage: None,
            usage_open: false,
        }
    }

    /// Feed the next line, stdout lines first, then stderr.
    pub fn feed(&mut self, line: &str) {
        if let Some(context) = &mut self.usage {
            if self.usage_open {
                if line.trim().is_empty() || context.len() > USAGE_CONTEXT_LINES {
                    self.usage_open = false;
                } else {
                    context.push(line.trim_end().to_string());
                }
            }
            return;
        }

        let Some(hit) = self.table.match_line(line) else {
            return;
        };
        if hit.kind == MarkerKind::UsageError {
            self.usage = Some(vec![line.trim_end().to_string()]);
            self.usage_open = true;
        } else if self.first_violation.is_none() {
            self.first_violation = Some(hit);
        }
    }

    /// Close a stream; usage-error context never spans stdout into stderr.
    pub fn end_stream(&mut self) {
        self.usage_open = false;
    }

    /// Classify everything fed so far.
    ///
    /// Rules, first match wins:
    /// 1. timeout;
    /// 2. a usage-error marker anywhere, message kept verbatim;
    /// 3. the earliest violation marker in output order;
    /// 4. exit code zero: success;
    /// 5. anything else: crash.
    pub fn finish(self, exit_code: Option<i32>, timed_out: bool) -> Outcome {
        if timed_out {
            return Outcome::Timeout;
        }
        if let Some(context) = self.usage {
            return Outcome::EngineUsageError {
                message: context.join("\n").trim().to_string(),
            };
        }
        match self.first_violation {
            Some(hit) => violation_outcome(hit),
            None if exit_code == Some(0) => Outcome::Success,
            None => Outcome::EngineCrashed { exit_code },
        }
    }
}

/// Classify captured engine output into exactly one [`Outcome`].
///
/// See [`OutcomeScanner::finish`] for the rules.
pub fn classify(output: &CapturedOutput<'_>, table: &MarkerTable) -> Outcome {
    classify_lines(
        output.stdout.lines(),
        output.stderr.lines(),
        output.exit_code,
        output.timed_out,
        table,
    )
}

/// [`classify`] over line iterators, for output that is not held in memory.
pub fn classify_lines<'l>(
    stdout: impl IntoIterator<Item = &'l str>,
    stderr: impl IntoIterator<Item = &'l str>,
    exit_code: Option<i32>,
    timed_out: bool,
    table: &MarkerTable,
) -> Outcome {
    let mut scanner = OutcomeScanner::new(table);
    stdout.into_iter().for_each(|line| scanner.feed(line));
    scanner.end_stream();
    stderr.into_iter().for_each(|line| scanner.feed(line));
    scanner.finish(exit_code, timed_out)
}

fn violation_outcome(hit: MarkerHit) -> Outcome {
    match hit.kind {
        MarkerKind::Deadlock => Outcome::DeadlockDetected,
        MarkerKind::Invariant => Outcome::InvariantViolation {
            name: hit.name.unwrap_or(hit.line),
        },
        MarkerKind::Liveness => Outcome::LivenessViolation { property: hit.name },
        MarkerKind::UsageError => Outcome::EngineUsageError { message: hit.line },
    }
}
