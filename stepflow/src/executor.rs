//! Step executor: runs one step under a deadline and a retry policy.

use crate::core::{AttemptOutcome, StepAttempt};
use crate::errors::{StepError, StepFailure};
use crate::events::{EventSink, NoOpEventSink, PipelineEvent};
use crate::retry::{backoff_delay, should_retry, RetryPolicy};
use crate::steps::Step;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Runs steps with per-attempt timeouts and backoff retries.
///
/// Every attempt emits exactly one [`PipelineEvent::StepAttempted`] before
/// the executor returns or sleeps, so attempt numbers observed by sinks are
/// contiguous from 1 and never exceed the policy's `max_attempts`.
#[derive(Clone)]
pub struct StepExecutor {
    sink: Arc<dyn EventSink>,
}

impl Default for StepExecutor {
    fn default() -> Self {
        Self::new(Arc::new(NoOpEventSink))
    }
}

impl std::fmt::Debug for StepExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepExecutor").finish_non_exhaustive()
    }
}

impl StepExecutor {
    /// Creates an executor that reports attempts to `sink`.
    #[must_use]
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self { sink }
    }

    /// Runs `step` until it succeeds, fails fatally, or runs out of attempts.
    ///
    /// An attempt that outlives `timeout` is abandoned and counted as a
    /// retryable failure. Backoff sleeps are cooperative and hold no locks.
    pub async fn execute<S>(
        &self,
        run_id: &str,
        step: &S,
        input: &S::Input,
        policy: &RetryPolicy,
        timeout: Duration,
    ) -> Result<S::Output, StepFailure>
    where
        S: Step + ?Sized,
    {
        let name = step.name().to_string();
        let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        let mut attempt: u32 = 1;

        loop {
            let started = Instant::now();
            let result = match tokio::time::timeout(timeout, step.run(input)).await {
                Ok(result) => result,
                Err(_) => Err(StepError::TimedOut { timeout_ms }),
            };
            let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

            match result {
                Ok(output) => {
                    self.record(StepAttempt::success(run_id, &name, attempt, duration_ms));
                    debug!(run_id, step = %name, attempt, duration_ms, "Step succeeded");
                    return Ok(output);
                }
                Err(err) if err.is_retryable() && should_retry(attempt, policy) => {
                    self.record(StepAttempt::failure(
                        run_id,
                        &name,
                        attempt,
                        AttemptOutcome::RetryableFailure,
                        duration_ms,
                        err.to_string(),
                    ));
                    let delay = backoff_delay(attempt, policy);
                    warn!(
                        run_id,
                        step = %name,
                        attempt,
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "Retrying after error"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.record(StepAttempt::failure(
                        run_id,
                        &name,
                        attempt,
                        AttemptOutcome::FatalFailure,
                        duration_ms,
                        err.to_string(),
                    ));
                    error!(run_id, step = %name, attempt, error = %err, "Step failed");
                    return Err(StepFailure::new(name, attempt, err));
                }
            }
        }
    }

    fn record(&self, attempt: StepAttempt) {
        self.sink.try_emit(&PipelineEvent::StepAttempted(attempt));
    }
}
