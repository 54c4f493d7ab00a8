//! Classified verdict of one run.

use serde::{Deserialize, Serialize};

/// The classified result of a model-check run. Exactly one per run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Outcome {
    /// The engine completed without reporting any violation.
    Success,

    /// A safety invariant was violated.
    InvariantViolation { name: String },

    /// The engine reached a state with no enabled successor.
    DeadlockDetected,

    /// A temporal property was violated. TLC does not always name it.
    LivenessViolation { property: Option<String> },

    /// The engine rejected its inputs; `message` is the engine's own text.
    EngineUsageError { message: String },

    /// Non-zero exit without a recognizable marker. No code when the
    /// process was terminated by a signal.
    EngineCrashed { exit_code: Option<i32> },

    /// The wall-clock timeout expired and the engine was stopped.
    Timeout,
}

impl Outcome {
    /// Short stable label, used in logs and text output.
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::InvariantViolation { .. } => "invariant_violation",
            Outcome::DeadlockDetected => "deadlock_detected",
            Outcome::LivenessViolation { .. } => "liveness_violation",
            Outcome::EngineUsageError { .. } => "engine_usage_error",
            Outcome::EngineCrashed { .. } => "engine_crashed",
            Outcome::Timeout => "timeout",
        }
    }

    /// Whether the engine reported a property violation.
    pub fn is_violation(&self) -> bool {
        matches!(
            self,
            Outcome::InvariantViolation { .. }
                | Outcome::DeadlockDetected
                | Outcome::LivenessViolation { .. }
        )
    }

    /// Process exit status for `tlcrun check`.
    ///
    /// 0 success, 10 violation, 11 timeout, 12 engine error.
    pub fn exit_status(&self) -> u8 {
        match self {
            Outcome::Success => 0,
            Outcome::InvariantViolation { .. }
            | Outcome::DeadlockDetected
            | Outcome::LivenessViolation { .. } => 10,
            Outcome::Timeout => 11,
            Outcome::EngineUsageError { .. } | Outcome::EngineCrashed { .. } => 12,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::InvariantViolation { name } => write!(f, "invariant {} violated", name),
            Outcome::DeadlockDetected => write!(f, "deadlock reached"),
            Outcome::LivenessViolation { property: Some(p) } => {
                write!(f, "temporal property {} violated", p)
            }
            Outcome::LivenessViolation { property: None } => {
                write!(f, "temporal properties violated")
            }
            Outcome::EngineUsageError { message } => write!(f, "engine usage error: {}", message),
            Outcome::EngineCrashed { exit_code: Some(code) } => {
                write!(f, "engine crashed (exit code {})", code)
            }
            Outcome::EngineCrashed { exit_code: None } => {
                write!(f, "engine crashed (terminated by signal)")
            }
            Outcome::Timeout => write!(f, "timed out"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_serde_shape() {
        let json = serde_json::to_value(Outcome::InvariantViolation {
            name: "TypeOK".to_string(),
        })
        .expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({"kind": "invariant_violation", "name": "TypeOK"})
        );

        let json = serde_json::to_value(Outcome::Success).expect("serialize");
        assert_eq!(json, serde_json::json!({"kind": "success"}));
    }

    #[test]
    fn test_outcome_serde_roundtrip() {
        let outcomes = [
            Outcome::Success,
            Outcome::InvariantViolation {
                name: "Inv".to_string(),
            },
            Outcome::DeadlockDetected,
            Outcome::LivenessViolation { property: None },
            Outcome::EngineUsageError {
                message: "Parse error".to_string(),
            },
            Outcome::EngineCrashed { exit_code: Some(1) },
            Outcome::Timeout,
        ];
        for outcome in &outcomes {
            let json = serde_json::to_string(outcome).expect("serialize");
            let back: Outcome = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(*outcome, back);
        }
    }

    #[test]
    fn test_exit_status_mapping() {
        assert_eq!(Outcome::Success.exit_status(), 0);
        assert_eq!(Outcome::DeadlockDetected.exit_status(), 10);
        assert_eq!(Outcome::Timeout.exit_status(), 11);
        assert_eq!(Outcome::EngineCrashed { exit_code: None }.exit_status(), 12);
    }

    #[test]
    fn test_display() {
        let o = Outcome::InvariantViolation {
            name: "TypeOK".to_string(),
        };
        assert_eq!(o.to_string(), "invariant TypeOK violated");
        assert!(o.is_violation());
        assert!(!Outcome::Timeout.is_violation());
    }
}
