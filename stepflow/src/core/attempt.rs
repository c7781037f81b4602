//! Step attempt records.

use super::AttemptOutcome;
use serde::{Deserialize, Serialize};

/// One execution attempt of one step within a run.
///
/// Created by the step executor after every attempt and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepAttempt {
    /// The run this attempt belongs to.
    pub run_id: String,
    /// Name of the step.
    pub step_name: String,
    /// 1-based attempt number.
    pub attempt_number: u32,
    /// How the attempt ended.
    pub outcome: AttemptOutcome,
    /// Wall-clock time spent in the attempt.
    pub duration_ms: u64,
    /// Error message for failed attempts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepAttempt {
    /// Records a successful attempt.
    #[must_use]
    pub fn success(
        run_id: impl Into<String>,
        step_name: impl Into<String>,
        attempt_number: u32,
        duration_ms: u64,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_name: step_name.into(),
            attempt_number,
            outcome: AttemptOutcome::Success,
            duration_ms,
            error: None,
        }
    }

    /// Records a failed attempt with the given outcome.
    #[must_use]
    pub fn failure(
        run_id: impl Into<String>,
        step_name: impl Into<String>,
        attempt_number: u32,
        outcome: AttemptOutcome,
        duration_ms: u64,
        error: impl Into<String>,
    ) -> Self {
        Self {
            run_id: run_id.into(),
            step_name: step_name.into(),
            attempt_number,
            outcome,
            duration_ms,
            error: Some(error.into()),
        }
    }

    /// Returns true if the attempt will be followed by a retry.
    #[must_use]
    pub fn is_retry(&self) -> bool {
        self.outcome == AttemptOutcome::RetryableFailure
    }
}
