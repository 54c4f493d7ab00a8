//! Counterexample parsing and step-diff summarization.
//!
//! Input is the engine's `-dumpTrace json` document:
//!
//! ```text
//! { "counterexample": {
//!     "state":  [ [1, {"x": 0}], [2, {"x": 1}], ... ],
//!     "action": [ [[1, {...}], {"name": "Next", ...}, [2, {...}]], ... ] } }
//! ```
//!
//! The wrapping `counterexample` object is optional. Everything here is a pure
//! transformation from bytes to structured data; nothing touches the
//! filesystem.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Write as _;

use serde_json::{Map, Value};

use crate::domain::{
    Counterexample, LassoEdge, Result, StateVars, StepDiff, TraceStep, ValueChange,
    WorkbenchError,
};

/// States and lasso back-edges parsed from a trace dump.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTrace {
    pub steps: Vec<TraceStep>,
    pub lasso: Vec<LassoEdge>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn malformed(msg: impl Into<String>) -> WorkbenchError {
    WorkbenchError::MalformedTrace(msg.into())
}

fn parse_state_tuple(item: &Value) -> Option<(u64, &Map<String, Value>)> {
    let tuple = item.as_array()?;
    let number = tuple.first()?.as_u64()?;
    let vars = tuple.get(1)?.as_object()?;
    Some((number, vars))
}

fn action_name(record: &Value) -> String {
    match record.get("name").and_then(Value::as_str) {
        Some(name) => name.to_string(),
        None => record.to_string(),
    }
}

/// Parse a raw trace dump into ordered [`TraceStep`]s.
///
/// Unparseable state entries are skipped; a dump with no parseable state is
/// malformed.
pub fn parse_trace_dump(bytes: &[u8]) -> Result<ParsedTrace> {
    let doc: Value =
        serde_json::from_slice(bytes).map_err(|e| malformed(format!("invalid JSON: {}", e)))?;

    let ce = match doc.get("counterexample") {
        Some(inner) if inner.is_object() => inner,
        _ if doc.is_object() => &doc,
        _ => return Err(malformed("counterexample is not an object")),
    };

    let raw_states = ce
        .get("state")
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("counterexample.state is missing or not a list"))?;

    let mut states: Vec<(u64, &Map<String, Value>)> =
        raw_states.iter().filter_map(parse_state_tuple).collect();
    if states.is_empty() {
        return Err(malformed("no parseable states in counterexample.state"));
    }
    states.sort_by_key(|(number, _)| *number);

    let mut action_by_target: HashMap<u64, String> = HashMap::new();
    let mut lasso = Vec::new();
    if let Some(edges) = ce.get("action").and_then(Value::as_array) {
        for edge in edges {
            let Some(parts) = edge.as_array().filter(|p| p.len() >= 3) else {
                continue;
            };
            let (Some((from, _)), Some((to, _))) =
                (parse_state_tuple(&parts[0]), parse_state_tuple(&parts[2]))
            else {
                continue;
            };
            let name = action_name(&parts[1]);

            if to <= from {
                lasso.push(LassoEdge {
                    from,
                    to,
                    action: Some(name),
                });
            } else {
                action_by_target.entry(to).or_insert(name);
            }
        }
    }

    let steps = states
        .into_iter()
        .enumerate()
        .map(|(i, (state_number, vars))| TraceStep {
            index: i + 1,
            state_number,
            action: if i == 0 {
                None
            } else {
                action_by_target.get(&state_number).cloned()
            },
            vars: vars
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<StateVars>(),
        })
        .collect();

    Ok(ParsedTrace { steps, lasso })
}

// ---------------------------------------------------------------------------
// Diffing
// ---------------------------------------------------------------------------

/// Diff two adjacent steps.
///
/// Every variable of either step lands in exactly one of `changed` or
/// `unchanged`. Composite values are compared structurally and recorded in
/// full; a variable missing from one side compares as `null`.
pub fn diff_steps(prev: &TraceStep, next: &TraceStep) -> StepDiff {
    let names: BTreeSet<&String> = prev.vars.keys().chain(next.vars.keys()).collect();

    let mut changed = BTreeMap::new();
    let mut unchanged = Vec::new();
    for name in names {
        let before = prev.vars.get(name).unwrap_or(&Value::Null);
        let after = next.vars.get(name).unwrap_or(&Value::Null);
        if before == after {
            unchanged.push(name.clone());
        } else {
            changed.insert(name.clone(), ValueChange(before.clone(), after.clone()));
        }
    }

    StepDiff {
        index: next.index,
        from_index: prev.index,
        state_number: next.state_number,
        action: next.action.clone(),
        changed,
        unchanged,
    }
}

/// Summarize an ordered step sequence: N steps yield N-1 diffs.
///
/// Returns `None` for an empty sequence.
pub fn summarize_steps(steps: &[TraceStep], lasso: Vec<LassoEdge>) -> Option<Counterexample> {
    let initial = steps.first()?;
    Some(Counterexample {
        states_total: steps.len(),
        initial_state_number: initial.state_number,
        initial: initial.vars.clone(),
        steps: steps
            .windows(2)
            .map(|pair| diff_steps(&pair[0], &pair[1]))
            .collect(),
        lasso,
    })
}

/// Parse and summarize a raw trace dump in one go.
pub fn summarize_trace_dump(bytes: &[u8]) -> Result<Counterexample> {
    let parsed = parse_trace_dump(bytes)?;
    summarize_steps(&parsed.steps, parsed.lasso)
        .ok_or_else(|| malformed("no parseable states in counterexample.state"))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

/// Render a counterexample as a human-readable step list.
///
/// `max_steps` caps the number of transitions printed; it never changes the
/// underlying data.
pub fn render_step_list(ce: &Counterexample, max_steps: Option<usize>) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "State {} (initial):", ce.initial_state_number);
    for (name, value) in &ce.initial {
        let _ = writeln!(out, "  {} = {}", name, value);
    }

    let limit = max_steps.unwrap_or(usize::MAX);
    for step in ce.steps.iter().take(limit) {
        let names = if step.changed.is_empty() {
            "(none)".to_string()
        } else {
            step.changed.keys().cloned().collect::<Vec<_>>().join(", ")
        };
        let _ = write!(out, "State {}: changed {}", step.state_number, names);
        if let Some(action) = &step.action {
            let _ = write!(out, " via {}", action);
        }
        out.push('\n');
        for (name, change) in &step.changed {
            let _ = writeln!(out, "  {}: {} -> {}", name, change.before(), change.after());
        }
    }

    if ce.steps.len() > limit {
        let _ = writeln!(out, "... {} more step(s)", ce.steps.len() - limit);
    }

    if !ce.lasso.is_empty() {
        out.push_str("Lasso:\n");
        for edge in &ce.lasso {
            let _ = write!(out, "  {} -> {}", edge.from, edge.to);
            if let Some(action) = &edge.action {
                let _ = write!(out, " via {}", action);
            }
            out.push('\n');
        }
    }

    out
}
