//! Error types for the stepflow pipeline.
//!
//! Errors are layered the same way they propagate at runtime:
//!
//! - [`StepError`] classifies the outcome of a single step attempt.
//! - [`FetchError`] describes failures of the external data source and is
//!   mapped onto a [`StepError`] by [`FetchError::classify`].
//! - [`StepFailure`] is the terminal error the executor raises once a step
//!   cannot make progress.
//! - [`StepflowError`] is what callers of the orchestrator see.

use crate::core::RunStatus;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The main error type for stepflow operations.
#[derive(Debug, Error)]
pub enum StepflowError {
    /// A step failed terminally and the run was halted.
    #[error("{0}")]
    Step(#[from] StepFailure),

    /// A run with this identifier has already been started by this pipeline.
    #[error("Run '{0}' has already been started")]
    DuplicateRun(String),

    /// No run with this identifier is known to the pipeline.
    #[error("Unknown run '{0}'")]
    UnknownRun(String),

    /// A retry policy is not usable.
    #[error("Invalid retry policy: {0}")]
    InvalidPolicy(String),

    /// A run record was asked to leave a terminal state.
    #[error("Run '{run_id}' cannot transition from {from} to {to}")]
    InvalidTransition {
        /// The run identifier.
        run_id: String,
        /// Current status.
        from: RunStatus,
        /// Requested status.
        to: RunStatus,
    },

    /// Configuration could not be loaded or is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The metrics endpoint failed.
    #[error("Metrics server error: {0}")]
    Metrics(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl StepflowError {
    /// Returns the step failure if this error came from a halted run.
    #[must_use]
    pub fn step_failure(&self) -> Option<&StepFailure> {
        match self {
            Self::Step(failure) => Some(failure),
            _ => None,
        }
    }
}

/// Classification of a failed step attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum StepError {
    /// A transient condition; the executor may try again.
    #[error("{0}")]
    Retryable(String),

    /// A non-recoverable condition; the run halts immediately.
    #[error("{0}")]
    Fatal(String),

    /// The attempt did not finish before its deadline.
    #[error("attempt timed out after {timeout_ms}ms")]
    TimedOut {
        /// The deadline that elapsed.
        timeout_ms: u64,
    },
}

impl StepError {
    /// Creates a retryable error.
    #[must_use]
    pub fn retryable(message: impl Into<String>) -> Self {
        Self::Retryable(message.into())
    }

    /// Creates a fatal error.
    #[must_use]
    pub fn fatal(message: impl Into<String>) -> Self {
        Self::Fatal(message.into())
    }

    /// Returns true if the executor is allowed to retry after this error.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable(_) | Self::TimedOut { .. })
    }
}

/// Failure of the external data source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Connection-level failure (DNS, refused, reset, client timeout).
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The response body was not a JSON object.
    #[error("malformed response body: {0}")]
    Decode(String),
}

impl FetchError {
    /// Maps the failure onto the step error taxonomy.
    ///
    /// Client-side faults (4xx other than 408 and 429) cannot succeed on
    /// retry and are fatal. Everything else is treated as transient.
    #[must_use]
    pub fn classify(&self) -> StepError {
        match self {
            Self::Status { status, .. }
                if (400..500).contains(status) && *status != 408 && *status != 429 =>
            {
                StepError::Fatal(self.to_string())
            }
            _ => StepError::Retryable(self.to_string()),
        }
    }
}

impl From<FetchError> for StepError {
    fn from(err: FetchError) -> Self {
        err.classify()
    }
}

/// Terminal error raised by the step executor.
///
/// Carries everything a caller needs to understand why a run stopped: the
/// step, how many attempts were made, and the last cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("step '{step}' failed after {attempts} attempt(s): {cause}")]
pub struct StepFailure {
    /// Name of the failing step.
    pub step: String,
    /// Total attempts made, including the last one.
    pub attempts: u32,
    /// The error from the last attempt.
    pub cause: StepError,
}

impl StepFailure {
    /// Creates a new step failure.
    #[must_use]
    pub fn new(step: impl Into<String>, attempts: u32, cause: StepError) -> Self {
        Self {
            step: step.into(),
            attempts,
            cause,
        }
    }

    /// Returns true if the step gave up because it ran out of attempts.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.cause.is_retryable()
    }
}
