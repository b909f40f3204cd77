/// Scenario outcome classification
use crate::config::types::{FailureKind, HarnessError};
use serde::{Deserialize, Serialize};

/// Final outcome of one scenario
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed { kind: FailureKind, message: String },
    Skipped { reason: String },
}

impl Outcome {
    /// Missing optional runtimes skip; every other error fails
    pub fn classify(result: &std::result::Result<(), HarnessError>) -> Self {
        match result {
            Ok(()) => Outcome::Passed,
            Err(HarnessError::RuntimeUnavailable(reason)) => Outcome::Skipped {
                reason: reason.clone(),
            },
            Err(e) => Outcome::Failed {
                kind: e.kind(),
                message: e.to_string(),
            },
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failed { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASS",
            Outcome::Failed { .. } => "FAIL",
            Outcome::Skipped { .. } => "SKIP",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Passed => write!(f, "PASS"),
            Outcome::Failed { kind, message } => write!(f, "FAIL ({}): {}", kind, message),
            Outcome::Skipped { reason } => write!(f, "SKIP: {}", reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_classification() {
        assert_eq!(Outcome::classify(&Ok(())), Outcome::Passed);

        let skipped = Outcome::classify(&Err(HarnessError::RuntimeUnavailable(
            "node not found".to_string(),
        )));
        assert_eq!(
            skipped,
            Outcome::Skipped {
                reason: "node not found".to_string()
            }
        );
        assert!(!skipped.is_failure());

        let failed = Outcome::classify(&Err(HarnessError::TimeCeilingExceeded {
            elapsed: Duration::from_secs(10),
            ceiling: Duration::from_millis(500),
        }));
        assert!(failed.is_failure());
        assert_eq!(failed.label(), "FAIL");
        assert_eq!(
            failed.to_string(),
            "FAIL (assertion): Task took 10.0, not 0.5 seconds"
        );
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(Outcome::Failed {
            kind: FailureKind::Environment,
            message: "cc missing".to_string(),
        })
        .unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["kind"], "environment");
    }
}
