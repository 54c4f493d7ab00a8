//! End-to-end runs against fake engines.

#![cfg(unix)]

mod common;

use std::time::{Duration, Instant};

use common::{write_dump, Workspace, THREE_STATE_DUMP};
use serde_json::json;
use tlcrun_core::{read_summary, MarkerTable, Outcome, RunManager, WorkbenchError};

fn manager() -> RunManager {
    RunManager::new(MarkerTable::tlc_default())
}

/// Test: clean run produces Success, persisted artifacts and no trace
#[tokio::test]
async fn test_success_without_trace() {
    let ws = Workspace::new();
    let engine = ws.engine(
        "tlc-ok",
        r#"echo "Starting... (2026-10-17 10:00:00)"
echo "Model checking completed. No error has been found."
echo "4 states generated, 3 distinct states found, 0 states left on queue."
echo "The depth of the complete state graph search is 3."
exit 0"#,
    );

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");

    assert_eq!(summary.outcome(), &Outcome::Success);
    assert_eq!(summary.run.exit_code, Some(0));
    assert!(!summary.run.timed_out);
    assert!(summary.trace.is_none());
    assert!(summary.trace_error.is_none());
    assert!(summary.run.artifacts.counterexample.is_none());
    assert_eq!(summary.stats.states_generated, Some(4));
    assert_eq!(summary.stats.distinct_states, Some(3));
    assert_eq!(summary.stats.depth, Some(3));
    assert_eq!(summary.bounds["Max"], "2");
    assert_eq!(summary.inputs.module, "Counter");
    assert_eq!(summary.inputs.spec_sha256.len(), 64);
    assert!(summary.run.finished_at >= summary.run.started_at);

    let artifacts = &summary.run.artifacts;
    assert!(artifacts.run_dir.starts_with(&ws.out_root));
    assert!(artifacts.run_dir.ends_with(summary.run_id()));
    let stdout = std::fs::read_to_string(&artifacts.stdout).expect("stdout captured");
    assert!(stdout.contains("No error has been found"));
    assert!(artifacts.stderr.is_file());

    let persisted = read_summary(&artifacts.summary).expect("summary persisted");
    assert_eq!(persisted, summary);
}

/// Test: invariant violation with a three-state trace yields two diffs
#[tokio::test]
async fn test_invariant_violation_with_trace() {
    let ws = Workspace::new();
    let body = format!(
        "echo \"Error: Invariant TypeOK is violated.\"\n{}exit 12",
        write_dump(THREE_STATE_DUMP)
    );
    let engine = ws.engine("tlc-inv", &body);

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");

    assert_eq!(
        summary.outcome(),
        &Outcome::InvariantViolation {
            name: "TypeOK".to_string()
        }
    );
    assert_eq!(summary.outcome().exit_status(), 10);

    let trace = summary.trace.as_ref().expect("trace summarized");
    assert_eq!(trace.states_total, 3);
    assert_eq!(trace.steps.len(), 2);
    assert_eq!(trace.initial["x"], json!(0));
    for step in &trace.steps {
        assert_eq!(step.action.as_deref(), Some("Next"));
        assert_eq!(step.changed.keys().collect::<Vec<_>>(), vec!["x"]);
        assert_eq!(step.unchanged, vec!["y".to_string()]);
    }
    assert_eq!(trace.steps[1].changed["x"].before(), &json!(1));
    assert_eq!(trace.steps[1].changed["x"].after(), &json!(2));

    // no depth line on stdout: taken from the trace
    assert_eq!(summary.stats.depth, Some(3));
    assert!(summary
        .run
        .artifacts
        .counterexample
        .as_ref()
        .is_some_and(|p| p.is_file()));
}

/// Test: an unparseable dump degrades to "trace unavailable", verdict intact
#[tokio::test]
async fn test_malformed_trace_keeps_outcome() {
    let ws = Workspace::new();
    let body = format!(
        "echo \"Error: Invariant TypeOK is violated.\"\n{}exit 12",
        write_dump(r#"{"counterexample": {"state": [[1, {"x""#)
    );
    let engine = ws.engine("tlc-bad-trace", &body);

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");

    assert!(matches!(
        summary.outcome(),
        Outcome::InvariantViolation { name } if name == "TypeOK"
    ));
    assert!(summary.trace.is_none());
    assert!(summary.trace_error.is_some());
    assert!(summary.run.artifacts.counterexample.is_some());
}

/// Test: timeout stops the engine and keeps partial output
#[tokio::test]
async fn test_timeout_is_an_outcome() {
    let ws = Workspace::new();
    let engine = ws.engine("tlc-hang", "echo \"Starting...\"\nexec sleep 30");
    let config = ws.config(&engine).with_timeout_secs(1);

    let start = Instant::now();
    let summary = manager().run(&config).await.expect("run failed");

    assert_eq!(summary.outcome(), &Outcome::Timeout);
    assert!(summary.run.timed_out);
    assert_eq!(summary.run.exit_code, None);
    assert!(start.elapsed() < Duration::from_secs(15));
    let stdout = std::fs::read_to_string(&summary.run.artifacts.stdout).unwrap();
    assert!(stdout.contains("Starting..."));
    assert!(summary.run.artifacts.summary.is_file());
}

/// Test: concurrent runs on one output root never share a directory
#[tokio::test]
async fn test_concurrent_runs_are_isolated() {
    let ws = Workspace::new();
    let engine = ws.engine(
        "tlc-ok",
        "echo \"Model checking completed. No error has been found.\"\nexit 0",
    );
    let config = ws.config(&engine);
    let manager = manager();

    let (a, b, c) = tokio::join!(
        manager.run(&config),
        manager.run(&config),
        manager.run(&config)
    );
    let (a, b, c) = (a.expect("run a"), b.expect("run b"), c.expect("run c"));

    assert_ne!(a.run_id(), b.run_id());
    assert_ne!(b.run_id(), c.run_id());
    assert_ne!(a.run_id(), c.run_id());
    for s in [&a, &b, &c] {
        assert_eq!(s.outcome(), &Outcome::Success);
        assert_eq!(read_summary(&s.run.artifacts.summary).unwrap().run_id(), s.run_id());
    }
    assert_eq!(std::fs::read_dir(&ws.out_root).unwrap().count(), 3);
}

/// Test: engine rejecting its inputs surfaces the engine's own message
#[tokio::test]
async fn test_usage_error_message() {
    let ws = Workspace::new();
    let engine = ws.engine(
        "tlc-parse",
        r#"echo "***Parse Error***"
echo "Was expecting \"==== or more Module body\""
echo "Encountered \"Beginning of definition\" at line 5, column 1"
echo ""
echo "Fatal errors while parsing TLA+ spec in file Counter"
exit 150"#,
    );

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");

    let Outcome::EngineUsageError { message } = summary.outcome() else {
        panic!("expected usage error, got {:?}", summary.outcome());
    };
    assert!(message.starts_with("***Parse Error***"));
    assert!(message.contains("line 5, column 1"));
    assert!(!message.contains("Fatal errors"));
}

/// Test: non-zero exit with no marker is a crash carrying the code
#[tokio::test]
async fn test_unrecognized_failure_is_crash() {
    let ws = Workspace::new();
    let engine = ws.engine(
        "tlc-crash",
        "echo \"Exception in thread main java.lang.OutOfMemoryError\" >&2\nexit 1",
    );

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");

    assert_eq!(
        summary.outcome(),
        &Outcome::EngineCrashed { exit_code: Some(1) }
    );
    let stderr = std::fs::read_to_string(&summary.run.artifacts.stderr).unwrap();
    assert!(stderr.contains("OutOfMemoryError"));
}

/// Test: deadlock reported before an invariant wins
#[tokio::test]
async fn test_earliest_marker_wins() {
    let ws = Workspace::new();
    let engine = ws.engine(
        "tlc-both",
        r#"echo "Error: Deadlock reached."
echo "Error: Invariant TypeOK is violated."
exit 11"#,
    );

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");
    assert_eq!(summary.outcome(), &Outcome::DeadlockDetected);
}

/// Test: temporal violation with a lasso back-edge
#[tokio::test]
async fn test_liveness_violation_records_lasso() {
    let ws = Workspace::new();
    let dump = r#"{"counterexample": {
  "state": [[1, {"x": 0}], [2, {"x": 1}]],
  "action": [
    [[1, {"x": 0}], {"name": "Inc"}, [2, {"x": 1}]],
    [[2, {"x": 1}], {"name": "Reset"}, [1, {"x": 0}]]
  ]
}}"#;
    let body = format!(
        "echo \"Error: Temporal properties were violated.\"\n{}exit 13",
        write_dump(dump)
    );
    let engine = ws.engine("tlc-live", &body);

    let summary = manager().run(&ws.config(&engine)).await.expect("run failed");

    assert_eq!(
        summary.outcome(),
        &Outcome::LivenessViolation { property: None }
    );
    let trace = summary.trace.expect("trace");
    assert_eq!(trace.steps.len(), 1);
    assert_eq!(trace.lasso.len(), 1);
    assert_eq!((trace.lasso[0].from, trace.lasso[0].to), (2, 1));
}

/// Test: unresolvable inputs fail before any run directory exists
#[tokio::test]
async fn test_missing_spec_is_setup_error() {
    let ws = Workspace::new();
    let engine = ws.engine("tlc-ok", "exit 0");
    let mut config = ws.config(&engine);
    config.spec_path = ws.dir.path().join("Missing.tla");

    let err = manager().run(&config).await.unwrap_err();

    assert!(err.is_setup());
    assert!(matches!(err, WorkbenchError::InputNotFound { .. }));
    assert!(!ws.out_root.exists());
}

/// Test: an engine that cannot be launched leaves no run directory behind
#[tokio::test]
async fn test_unlaunchable_engine_cleans_up() {
    let ws = Workspace::new();
    // present but not executable
    let engine = ws.dir.path().join("tlc-noexec");
    std::fs::write(&engine, "not a program").unwrap();

    let err = manager().run(&ws.config(&engine)).await.unwrap_err();

    assert!(matches!(err, WorkbenchError::Spawn(_)));
    assert!(err.is_setup());
    assert_eq!(std::fs::read_dir(&ws.out_root).unwrap().count(), 0);
}
