//! Mock steps for testing.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::errors::StepError;
use crate::steps::Step;

/// A step that replays a script of results.
///
/// Once the script is exhausted the fallback result is returned; without a
/// fallback the step fails fatally.
#[derive(Debug)]
pub struct ScriptedStep<O> {
    name: String,
    script: Mutex<VecDeque<Result<O, StepError>>>,
    fallback: Option<Result<O, StepError>>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl<O: Clone + Send + Sync> ScriptedStep<O> {
    /// Creates a step with an empty script.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            script: Mutex::new(VecDeque::new()),
            fallback: None,
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Appends a successful result to the script.
    #[must_use]
    pub fn then_ok(self, value: O) -> Self {
        self.script.lock().push_back(Ok(value));
        self
    }

    /// Appends a failure to the script.
    #[must_use]
    pub fn then_err(self, error: StepError) -> Self {
        self.script.lock().push_back(Err(error));
        self
    }

    /// Succeeds with `value` once the script is exhausted.
    #[must_use]
    pub fn otherwise_ok(mut self, value: O) -> Self {
        self.fallback = Some(Ok(value));
        self
    }

    /// Fails with `error` once the script is exhausted.
    #[must_use]
    pub fn otherwise_err(mut self, error: StepError) -> Self {
        self.fallback = Some(Err(error));
        self
    }

    /// Sleeps for `latency` before every result.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Returns the number of times the step was started.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl<O: Clone + Send + Sync> Step for ScriptedStep<O> {
    type Input = ();
    type Output = O;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(&self, _input: &()) -> Result<O, StepError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let next = self.script.lock().pop_front();
        next.or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Err(StepError::fatal("script exhausted")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_step_replays_then_falls_back() {
        let step = ScriptedStep::new("s")
            .then_err(StepError::retryable("x"))
            .then_ok(1)
            .otherwise_ok(9);

        assert!(step.run(&()).await.is_err());
        assert_eq!(step.run(&()).await, Ok(1));
        assert_eq!(step.run(&()).await, Ok(9));
        assert_eq!(step.call_count(), 3);
    }

    #[tokio::test]
    async fn test_scripted_step_without_fallback_is_fatal() {
        let step: ScriptedStep<()> = ScriptedStep::new("s");
        assert_eq!(step.run(&()).await, Err(StepError::fatal("script exhausted")));
    }
}
