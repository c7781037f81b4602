//! Run records.

use super::RunStatus;
use crate::errors::StepflowError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identifies one pipeline execution and tracks its lifecycle.
///
/// Only the orchestrator mutates a record, and only while it is `Started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    /// Opaque, process-unique run identifier.
    pub run_id: String,
    /// When the run entered `Started`.
    pub started_at: DateTime<Utc>,
    /// When the run reached a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Current status.
    pub status: RunStatus,
}

impl RunRecord {
    /// Creates a record in the `Started` state.
    #[must_use]
    pub fn start(run_id: impl Into<String>) -> Self {
        Self {
            run_id: run_id.into(),
            started_at: Utc::now(),
            ended_at: None,
            status: RunStatus::Started,
        }
    }

    /// Marks the run as succeeded.
    pub fn succeed(&mut self) -> Result<(), StepflowError> {
        self.finish(RunStatus::Succeeded)
    }

    /// Marks the run as failed.
    pub fn fail(&mut self) -> Result<(), StepflowError> {
        self.finish(RunStatus::Failed)
    }

    /// Returns true once the run has reached a terminal state.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    fn finish(&mut self, to: RunStatus) -> Result<(), StepflowError> {
        if self.status != RunStatus::Started {
            return Err(StepflowError::InvalidTransition {
                run_id: self.run_id.clone(),
                from: self.status,
                to,
            });
        }
        self.status = to;
        self.ended_at = Some(Utc::now());
        Ok(())
    }
}
