//! Domain model: configuration, outcomes, traces, summaries and errors.

pub mod config;
pub mod error;
pub mod outcome;
pub mod summary;
pub mod trace;

pub use config::{resolve_engine, EngineLocation, ResolvedInputs, ResourceLimits, RunConfig};
pub use error::{InputKind, Result, WorkbenchError};
pub use outcome::Outcome;
pub use summary::{ArtifactPaths, InputProvenance, RunRecord, RunStats, Summary};
pub use trace::{Counterexample, LassoEdge, StateVars, StepDiff, TraceStep, ValueChange};
