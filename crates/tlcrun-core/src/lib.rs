//! tlcrun-core: run the TLC model checker and report what it found.
//!
//! A run takes a TLA+ spec, its model configuration and a TLC engine, launches
//! the engine in an isolated run directory, classifies the result into one
//! [`Outcome`] and persists a [`Summary`] with a step-by-step diff of any
//! counterexample.
//!
//! ```ignore
//! let config = RunConfig::new("Counter.tla", None, engine).with_timeout_secs(600);
//! let summary = RunManager::new(MarkerTable::tlc_default()).run(&config).await?;
//! println!("{}", summary.outcome());
//! ```

pub mod domain;
pub mod extract;
pub mod invoker;
pub mod obs;
pub mod run_manager;
pub mod telemetry;
pub mod trace_summary;

pub use domain::{
    resolve_engine, ArtifactPaths, Counterexample, EngineLocation, InputKind, InputProvenance,
    LassoEdge, Outcome, ResolvedInputs, ResourceLimits, Result, RunConfig, RunRecord, RunStats,
    StateVars, StepDiff, Summary, TraceStep, ValueChange, WorkbenchError,
};
pub use extract::{
    classify, classify_lines, parse_bounds, parse_stats, CapturedOutput, MarkerKind,
    MarkerTable, OutcomeScanner, StatsCollector,
};
pub use invoker::{
    CaptureSinks, EngineCommand, EngineInvoker, Invocation, InvocationResult, ProcessInvoker,
    Termination,
};
pub use run_manager::{allocate_run_dir, read_summary, write_summary, RunManager};
pub use telemetry::init_tracing;
pub use trace_summary::{
    diff_steps, parse_trace_dump, render_step_list, summarize_steps, summarize_trace_dump,
    ParsedTrace,
};

/// Crate version, recorded by the CLI.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
