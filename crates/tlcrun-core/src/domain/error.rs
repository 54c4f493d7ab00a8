//! Orchestrator-level error taxonomy.
//!
//! Conditions reported by the engine itself (usage errors, crashes,
//! violations, timeouts) are [`Outcome`](super::outcome::Outcome) values, not
//! errors. These variants cover failures of the orchestrator: unresolvable
//! inputs, run directory setup, process spawning and local I/O.

use std::path::PathBuf;

/// Which run input a path refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Spec,
    Config,
    Engine,
}

impl std::fmt::Display for InputKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InputKind::Spec => "spec",
            InputKind::Config => "cfg",
            InputKind::Engine => "engine",
        };
        f.write_str(s)
    }
}

/// tlcrun errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    #[error("setup error: {0}")]
    Setup(String),

    #[error("engine not found: {0}")]
    EngineNotFound(String),

    #[error("{kind} not found: {}", path.display())]
    InputNotFound { kind: InputKind, path: PathBuf },

    #[error("cannot create run directory {}: {source}", path.display())]
    RunDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn engine: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("invalid marker table: {0}")]
    MarkerTable(String),

    #[error("malformed counterexample trace: {0}")]
    MalformedTrace(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkbenchError {
    /// Whether this error belongs to the setup class (nothing was launched).
    pub fn is_setup(&self) -> bool {
        matches!(
            self,
            WorkbenchError::Setup(_)
                | WorkbenchError::EngineNotFound(_)
                | WorkbenchError::InputNotFound { .. }
                | WorkbenchError::RunDirCreate { .. }
                | WorkbenchError::Spawn(_)
                | WorkbenchError::MarkerTable(_)
        )
    }
}

/// Result type for tlcrun operations.
pub type Result<T> = std::result::Result<T, WorkbenchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_not_found_display() {
        let err = WorkbenchError::InputNotFound {
            kind: InputKind::Config,
            path: PathBuf::from("/tmp/Foo.cfg"),
        };
        let msg = err.to_string();
        assert!(msg.contains("cfg not found"));
        assert!(msg.contains("/tmp/Foo.cfg"));
    }

    #[test]
    fn test_setup_classification() {
        assert!(WorkbenchError::EngineNotFound("x".to_string()).is_setup());
        assert!(WorkbenchError::RunDirCreate {
            path: PathBuf::from("/nope"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        }
        .is_setup());
        assert!(
            WorkbenchError::Spawn(std::io::Error::from(std::io::ErrorKind::NotFound)).is_setup()
        );
        assert!(!WorkbenchError::MalformedTrace("truncated".to_string()).is_setup());
        assert!(!WorkbenchError::Io(std::io::Error::from(std::io::ErrorKind::Other)).is_setup());
    }
}
