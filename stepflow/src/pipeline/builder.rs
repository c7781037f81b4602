//! Pipeline builder with validation.

use super::Pipeline;
use crate::config::PipelineConfig;
use crate::errors::StepflowError;
use crate::events::{EventSink, NoOpEventSink};
use crate::steps::{
    DataSource, DocumentStore, FailureStrategy, FetchStep, InMemoryDocumentStore, NeverFail,
    SaveStep,
};
use std::sync::Arc;

/// Builder wiring a [`Pipeline`] to its injected resources.
///
/// Defaults: no injected failures, a fresh in-memory document store, a
/// no-op event sink and, when the `http-source` feature is enabled, an
/// HTTP data source pointed at the configured URL.
pub struct PipelineBuilder {
    config: PipelineConfig,
    source: Option<Arc<dyn DataSource>>,
    failures: Arc<dyn FailureStrategy>,
    store: Arc<dyn DocumentStore>,
    sink: Arc<dyn EventSink>,
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("config", &self.config)
            .field("source", &self.source)
            .field("failures", &self.failures)
            .field("store", &self.store)
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    /// Creates a new pipeline builder with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: PipelineConfig::default(),
            source: None,
            failures: Arc::new(NeverFail),
            store: Arc::new(InMemoryDocumentStore::new()),
            sink: Arc::new(NoOpEventSink),
        }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the data source used by the fetch step.
    #[must_use]
    pub fn data_source(mut self, source: Arc<dyn DataSource>) -> Self {
        self.source = Some(source);
        self
    }

    /// Sets the failure strategy consulted by the fetch step.
    #[must_use]
    pub fn failure_strategy(mut self, failures: Arc<dyn FailureStrategy>) -> Self {
        self.failures = failures;
        self
    }

    /// Sets the store the save step appends to.
    #[must_use]
    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = store;
        self
    }

    /// Sets the sink receiving run and attempt events.
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Validates the configuration and builds the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`StepflowError::Config`] if any step's settings are invalid
    /// or no data source is available.
    pub fn build(self) -> Result<Pipeline, StepflowError> {
        self.config.validate()?;

        let source = match self.source {
            Some(source) => source,
            None => default_source(&self.config)?,
        };

        Ok(Pipeline::new(
            self.config,
            FetchStep::new(source, self.failures),
            SaveStep::new(self.store),
            self.sink,
        ))
    }
}

#[cfg(feature = "http-source")]
#[allow(clippy::unnecessary_wraps)]
fn default_source(config: &PipelineConfig) -> Result<Arc<dyn DataSource>, StepflowError> {
    Ok(Arc::new(crate::steps::HttpDataSource::new(
        config.source_url.clone(),
    )))
}

#[cfg(not(feature = "http-source"))]
fn default_source(_config: &PipelineConfig) -> Result<Arc<dyn DataSource>, StepflowError> {
    Err(StepflowError::Config(
        "no data source configured and the http-source feature is disabled".to_string(),
    ))
}
