//! Pipeline event types.

use crate::core::StepAttempt;
use serde::{Deserialize, Serialize};

/// An event emitted while a run executes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// A run entered the `Started` state.
    RunStarted {
        /// The run identifier.
        run_id: String,
    },
    /// A step attempt finished, whatever its outcome.
    StepAttempted(StepAttempt),
    /// All steps succeeded.
    RunSucceeded {
        /// The run identifier.
        run_id: String,
        /// Total run duration in seconds.
        duration_secs: f64,
    },
    /// A step failed terminally and the run halted.
    RunFailed {
        /// The run identifier.
        run_id: String,
        /// The failing step.
        step: String,
        /// The terminal error message.
        error: String,
        /// Total run duration in seconds.
        duration_secs: f64,
    },
}

impl PipelineEvent {
    /// Returns the dotted event type name (e.g. `"run.started"`).
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::StepAttempted(_) => "step.attempted",
            Self::RunSucceeded { .. } => "run.succeeded",
            Self::RunFailed { .. } => "run.failed",
        }
    }

    /// Returns the run this event belongs to.
    #[must_use]
    pub fn run_id(&self) -> &str {
        match self {
            Self::RunStarted { run_id }
            | Self::RunSucceeded { run_id, .. }
            | Self::RunFailed { run_id, .. } => run_id,
            Self::StepAttempted(attempt) => &attempt.run_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::StepAttempt;

    #[test]
    fn test_event_type_names() {
        let started = PipelineEvent::RunStarted {
            run_id: "r".to_string(),
        };
        assert_eq!(started.event_type(), "run.started");
        assert_eq!(started.run_id(), "r");

        let attempted = PipelineEvent::StepAttempted(StepAttempt::success("r2", "fetch", 1, 3));
        assert_eq!(attempted.event_type(), "step.attempted");
        assert_eq!(attempted.run_id(), "r2");
    }

    #[test]
    fn test_event_serializes_tagged() {
        let event = PipelineEvent::RunFailed {
            run_id: "r".to_string(),
            step: "fetch".to_string(),
            error: "boom".to_string(),
            duration_secs: 0.5,
        };
        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "run_failed");
        assert_eq!(value["step"], "fetch");
    }
}
