//! Structured observability hooks for the run lifecycle.
//!
//! This module provides:
//! - A run-scoped tracing span via `run_span`
//! - Emission functions for key lifecycle events: start, engine spawn/exit,
//!   classification, trace availability, finish
//!
//! Events are emitted with a stable `event` field so log pipelines can key
//! on them. Filter with `RUST_LOG`; pass `--json` to the CLI for JSON lines.

use tracing::{info, info_span, warn, Span};

use crate::domain::Outcome;

/// Span tagged with the run id, for instrumenting a run's future.
///
/// # Example
///
/// ```ignore
/// execute(run).instrument(run_span("20261017T101500123Z")).await
/// ```
pub fn run_span(run_id: &str) -> Span {
    info_span!("tlcrun.run", run_id = %run_id)
}

/// Emit event: run directory allocated, engine about to start.
pub fn emit_run_started(run_id: &str, module: &str, run_dir: &str) {
    info!(event = "run.started", run_id = %run_id, module = %module, run_dir = %run_dir);
}

/// Emit event: setup failed before the engine was launched.
pub fn emit_run_setup_error(error: &dyn std::fmt::Display) {
    warn!(event = "run.setup_error", error = %error);
}

/// Emit event: engine process spawned.
pub fn emit_engine_spawned(program: &str, pid: Option<u32>) {
    info!(event = "engine.spawned", program = %program, pid = ?pid);
}

/// Emit event: engine exited on its own.
pub fn emit_engine_exited(exit_code: Option<i32>, duration_ms: u64) {
    info!(event = "engine.exited", exit_code = ?exit_code, duration_ms = duration_ms);
}

/// Emit event: timeout expired, engine killed.
pub fn emit_engine_timed_out(timeout_secs: u64) {
    warn!(event = "engine.timed_out", timeout_secs = timeout_secs);
}

/// Emit event: stop signal forwarded, engine killed.
pub fn emit_engine_interrupted() {
    warn!(event = "engine.interrupted");
}

/// Emit event: outcome classified.
pub fn emit_run_classified(run_id: &str, outcome: &Outcome) {
    info!(event = "run.classified", run_id = %run_id, outcome = outcome.label(), detail = %outcome);
}

/// Emit event: a trace dump exists but could not be summarized.
pub fn emit_trace_unavailable(run_id: &str, reason: &dyn std::fmt::Display) {
    warn!(event = "trace.unavailable", run_id = %run_id, reason = %reason);
}

/// Emit event: summary persisted, run finalized.
pub fn emit_run_finished(run_id: &str, duration_ms: u64, outcome: &Outcome) {
    info!(
        event = "run.finished",
        run_id = %run_id,
        duration_ms = duration_ms,
        outcome = outcome.label(),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_span_create() {
        let span = run_span("test-run-id");
        let _entered = span.enter();
        emit_run_classified("test-run-id", &Outcome::Success);
    }
}
