//! Test fixtures for pipeline testing.

use std::sync::Arc;
use std::time::Duration;

use crate::config::{PipelineConfig, StepSettings};
use crate::errors::StepflowError;
use crate::events::{CollectingEventSink, EventSink, FanoutEventSink};
use crate::metrics::MetricsSink;
use crate::pipeline::{Pipeline, PipelineBuilder};
use crate::retry::RetryPolicy;
use crate::steps::{DataSource, FailureStrategy};

/// A retry policy with millisecond backoff, for tests.
#[must_use]
pub fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::new()
        .with_initial_interval_ms(1)
        .with_max_interval_ms(5)
        .with_max_attempts(max_attempts)
}

/// Uniform step settings using [`fast_policy`] and a one second timeout.
#[must_use]
pub fn fast_settings(max_attempts: u32) -> PipelineConfig {
    PipelineConfig::uniform(StepSettings::new(
        fast_policy(max_attempts),
        Duration::from_secs(1),
    ))
}

/// Builds a pipeline with an in-memory store and the given resources.
pub fn in_memory_pipeline(
    source: Arc<dyn DataSource>,
    failures: Arc<dyn FailureStrategy>,
    config: PipelineConfig,
    sink: Arc<dyn EventSink>,
) -> Result<Pipeline, StepflowError> {
    PipelineBuilder::new()
        .config(config)
        .data_source(source)
        .failure_strategy(failures)
        .event_sink(sink)
        .build()
}

/// A pipeline wired to both a collecting sink and a metrics sink.
#[derive(Debug)]
pub struct TestPipeline {
    /// The pipeline under test.
    pub pipeline: Pipeline,
    /// Every event emitted by the pipeline.
    pub events: Arc<CollectingEventSink>,
    /// Metrics accumulated from the same events.
    pub metrics: Arc<MetricsSink>,
}

impl TestPipeline {
    /// Builds the pipeline.
    pub fn new(
        source: Arc<dyn DataSource>,
        failures: Arc<dyn FailureStrategy>,
        config: PipelineConfig,
    ) -> Result<Self, StepflowError> {
        let events = Arc::new(CollectingEventSink::new());
        let metrics = Arc::new(MetricsSink::new()?);
        let sink = FanoutEventSink::new()
            .with_sink(events.clone())
            .with_sink(metrics.clone());

        let pipeline = in_memory_pipeline(source, failures, config, Arc::new(sink))?;
        Ok(Self {
            pipeline,
            events,
            metrics,
        })
    }
}
