//! The pipeline orchestrator.

use super::RunRegistry;
use crate::config::{PipelineConfig, StepSettings};
use crate::core::{PipelineDocument, RunRecord};
use crate::errors::{StepFailure, StepflowError};
use crate::events::{EventSink, PipelineEvent};
use crate::executor::StepExecutor;
use crate::steps::{
    DocumentStore, FetchStep, SaveConfirmation, SaveStep, Step, TransformStep, FETCH, SAVE,
    TRANSFORM,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, info_span, warn, Instrument};

/// Error recorded for a run whose caller stopped waiting on it.
pub const ABANDONED: &str = "run abandoned before reaching a terminal state";

/// Runs fetch, transform and save strictly in order.
///
/// A pipeline is shareable between tasks; each call to [`Pipeline::run`] is
/// an independent run with its own [`RunRecord`]. Runs share only the event
/// sink, the document store, and the fetch step's failure strategy.
///
/// Per-run lifecycle: `Idle` (not yet registered) → `Started` →
/// `Succeeded` | `Failed`. There is no retry across steps and a failed run
/// is never restarted automatically.
pub struct Pipeline {
    config: PipelineConfig,
    fetch: FetchStep,
    transform: TransformStep,
    save: SaveStep,
    executor: StepExecutor,
    sink: Arc<dyn EventSink>,
    runs: RunRegistry,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("runs", &self.runs.len())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub(super) fn new(
        config: PipelineConfig,
        fetch: FetchStep,
        save: SaveStep,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            fetch,
            transform: TransformStep::new(),
            save,
            executor: StepExecutor::new(sink.clone()),
            sink,
            runs: RunRegistry::new(),
        }
    }

    /// Executes one run and waits for it to reach a terminal state.
    ///
    /// Returns the save confirmation on success. On failure the returned
    /// error names the failing step, the attempts made and the last cause;
    /// steps after the failing one are never invoked.
    ///
    /// # Errors
    ///
    /// - [`StepflowError::DuplicateRun`] if `run_id` was already used with
    ///   this pipeline. No events are emitted in that case.
    /// - [`StepflowError::Step`] if a step failed terminally.
    pub async fn run(&self, run_id: impl Into<String>) -> Result<SaveConfirmation, StepflowError> {
        let run_id = run_id.into();
        self.runs.register(&run_id)?;

        let span = info_span!("pipeline_run", run_id = %run_id);
        self.drive(&run_id).instrument(span).await
    }

    async fn drive(&self, run_id: &str) -> Result<SaveConfirmation, StepflowError> {
        self.sink.try_emit(&PipelineEvent::RunStarted {
            run_id: run_id.to_string(),
        });
        info!("Workflow started");
        let guard = RunGuard::new(self, run_id);

        let outcome = self.execute_steps(run_id, &guard).await;
        let duration_secs = guard.disarm();

        match outcome {
            Ok(confirmation) => {
                let transition = self.runs.update(run_id, RunRecord::succeed);
                self.sink.try_emit(&PipelineEvent::RunSucceeded {
                    run_id: run_id.to_string(),
                    duration_secs,
                });
                info!(duration_secs, "Workflow completed: {}", confirmation);
                transition.map(|()| confirmation)
            }
            Err(failure) => {
                let transition = self.runs.update(run_id, RunRecord::fail);
                self.sink.try_emit(&PipelineEvent::RunFailed {
                    run_id: run_id.to_string(),
                    step: failure.step.clone(),
                    error: failure.to_string(),
                    duration_secs,
                });
                error!(duration_secs, step = %failure.step, error = %failure, "Workflow failed");
                transition?;
                Err(failure.into())
            }
        }
    }

    async fn execute_steps(
        &self,
        run_id: &str,
        guard: &RunGuard<'_>,
    ) -> Result<SaveConfirmation, StepFailure> {
        guard.enter(FETCH);
        let fetched = self
            .execute(run_id, &self.fetch, &(), &self.config.fetch)
            .await?;
        info!(fields = fetched.fields.len(), "Data fetched successfully");

        guard.enter(TRANSFORM);
        let transformed: PipelineDocument = self
            .execute(run_id, &self.transform, &fetched, &self.config.transform)
            .await?;
        drop(fetched);
        info!("Data transformed successfully");

        guard.enter(SAVE);
        self.execute(run_id, &self.save, &transformed, &self.config.save)
            .await
    }

    async fn execute<S: Step>(
        &self,
        run_id: &str,
        step: &S,
        input: &S::Input,
        settings: &StepSettings,
    ) -> Result<S::Output, StepFailure> {
        self.executor
            .execute(run_id, step, input, &settings.policy, settings.timeout())
            .await
    }

    /// Returns the pipeline configuration.
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Returns a copy of a run's record.
    #[must_use]
    pub fn run_record(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id)
    }

    /// Returns the registry of all runs started by this pipeline.
    #[must_use]
    pub fn runs(&self) -> &RunRegistry {
        &self.runs
    }

    /// Returns the store the save step writes to.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        self.save.store()
    }
}

/// Fails a run whose future is dropped before it reaches a terminal state.
///
/// Dropping the future returned by [`Pipeline::run`] (a caller timeout, a
/// lost `select!` branch) would otherwise leave the record in `Started`
/// with no terminal event.
struct RunGuard<'a> {
    pipeline: &'a Pipeline,
    run_id: &'a str,
    started: Instant,
    step: Mutex<&'static str>,
    armed: AtomicBool,
}

impl<'a> RunGuard<'a> {
    fn new(pipeline: &'a Pipeline, run_id: &'a str) -> Self {
        Self {
            pipeline,
            run_id,
            started: Instant::now(),
            step: Mutex::new(FETCH),
            armed: AtomicBool::new(true),
        }
    }

    fn enter(&self, step: &'static str) {
        *self.step.lock() = step;
    }

    /// Stops the guard and returns the elapsed run time in seconds.
    fn disarm(&self) -> f64 {
        self.armed.store(false, Ordering::SeqCst);
        self.started.elapsed().as_secs_f64()
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if !self.armed.load(Ordering::SeqCst) {
            return;
        }
        let duration_secs = self.started.elapsed().as_secs_f64();
        let step = *self.step.lock();
        let run_id = self.run_id;

        if let Err(e) = self.pipeline.runs.update(run_id, RunRecord::fail) {
            warn!(run_id, error = %e, "Could not fail abandoned run");
        }
        self.pipeline.sink.try_emit(&PipelineEvent::RunFailed {
            run_id: run_id.to_string(),
            step: step.to_string(),
            error: ABANDONED.to_string(),
            duration_secs,
        });
        warn!(run_id, step, duration_secs, "Workflow abandoned before completion");
    }
}
