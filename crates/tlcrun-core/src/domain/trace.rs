//! Counterexample trace model.
//!
//! Variable values are opaque [`serde_json::Value`]s. Nothing here interprets
//! them beyond structural equality.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Full variable assignment of one state.
pub type StateVars = BTreeMap<String, Value>;

/// One state of a counterexample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraceStep {
    /// 1-based position in the trace.
    pub index: usize,

    /// State number as reported by the engine.
    pub state_number: u64,

    /// Action that produced the transition into this state. `None` for the
    /// initial state.
    pub action: Option<String>,

    /// Variable name to value.
    pub vars: StateVars,
}

/// `[old, new]` pair for a changed variable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueChange(pub Value, pub Value);

impl ValueChange {
    pub fn before(&self) -> &Value {
        &self.0
    }

    pub fn after(&self) -> &Value {
        &self.1
    }
}

/// Delta between two adjacent trace steps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StepDiff {
    /// Index of the successor step.
    pub index: usize,

    /// Index of the predecessor step (`index - 1`).
    pub from_index: usize,

    /// Engine state number of the successor.
    pub state_number: u64,

    /// Action responsible for the transition.
    pub action: Option<String>,

    /// Variables whose value differs, with full old and new values.
    pub changed: BTreeMap<String, ValueChange>,

    /// Variables with identical values, sorted.
    pub unchanged: Vec<String>,
}

impl StepDiff {
    /// A step that changed nothing observable.
    pub fn is_stutter(&self) -> bool {
        self.changed.is_empty()
    }
}

/// A back-edge closing a liveness lasso.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LassoEdge {
    pub from: u64,
    pub to: u64,
    pub action: Option<String>,
}

/// Summarized counterexample: the initial state plus one diff per transition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Counterexample {
    /// Number of states in the trace.
    pub states_total: usize,

    /// Engine state number of the initial state.
    pub initial_state_number: u64,

    /// Complete assignment of the initial state.
    pub initial: StateVars,

    /// `states_total - 1` diffs, in order.
    pub steps: Vec<StepDiff>,

    /// Lasso back-edges, empty for finite (safety) traces.
    #[serde(default)]
    pub lasso: Vec<LassoEdge>,
}
