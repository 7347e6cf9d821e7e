use aeflow_core::{EngineError, ErrorKind};
use serde::Serialize;

/// A failure represented as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&EngineError> for JobFailure {
    fn from(err: &EngineError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Result of one job at the orchestrator boundary.
///
/// Serializes as the success payload itself, or as `{"error": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobOutcome<T> {
    Completed(T),
    Failed { error: JobFailure },
}

impl<T> JobOutcome<T> {
    /// Convert a pipeline result, logging the failure.
    pub fn from_result(job: &'static str, job_id: &str, result: Result<T, EngineError>) -> Self {
        match result {
            Ok(value) => {
                tracing::info!(job, job_id, "Job completed");
                Self::Completed(value)
            }
            Err(err) => {
                tracing::warn!(job, job_id, kind = ?err.kind(), error = %err, "Job failed");
                Self::Failed {
                    error: JobFailure::from(&err),
                }
            }
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn failure(&self) -> Option<&JobFailure> {
        match self {
            Self::Completed(_) => None,
            Self::Failed { error } => Some(error),
        }
    }

    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Failed { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn completed_serializes_as_payload() {
        let outcome: JobOutcome<_> = JobOutcome::from_result("render", "t1", Ok(json!({"uri": "t1/Out.mov"})));
        assert_eq!(serde_json::to_value(&outcome).expect("json"), json!({"uri": "t1/Out.mov"}));
    }

    #[test]
    fn failure_serializes_under_error() {
        let outcome: JobOutcome<()> =
            JobOutcome::from_result("render", "t1", Err(EngineError::Busy("in use".into())));
        assert_eq!(
            serde_json::to_value(&outcome).expect("json"),
            json!({"error": {"kind": "busy", "message": "Host busy: in use"}})
        );
        assert_eq!(outcome.failure().map(|f| f.kind), Some(ErrorKind::Busy));
    }
}
