//! # Stepflow
//!
//! A fetch → transform → save data pipeline with per-step retry policies,
//! attempt timeouts, and execution metrics.
//!
//! Stepflow provides:
//!
//! - **Step execution**: every step runs under a deadline and a
//!   [`retry::RetryPolicy`] with exponential backoff
//! - **Orchestration**: [`pipeline::Pipeline`] runs the three steps strictly
//!   in order and tracks each run's lifecycle
//! - **Event-driven observability**: attempts and run transitions are
//!   emitted to an [`events::EventSink`]
//! - **Metrics**: [`metrics::MetricsSink`] records events as Prometheus
//!   counters and a duration histogram
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use stepflow::prelude::*;
//!
//! let metrics = Arc::new(MetricsSink::new()?);
//! let pipeline = PipelineBuilder::new()
//!     .failure_strategy(Arc::new(AlternatingFailure::new()))
//!     .event_sink(metrics.clone())
//!     .build()?;
//!
//! let confirmation = pipeline.run("data-processing-workflow-1").await?;
//! println!("{confirmation}");
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod core;
pub mod errors;
pub mod events;
pub mod executor;
pub mod metrics;
pub mod pipeline;
pub mod retry;
pub mod steps;
pub mod telemetry;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{LogFormat, PipelineConfig, StepSettings, WorkerConfig};
    pub use crate::core::{
        AttemptOutcome, DocumentMetadata, PipelineDocument, RunRecord, RunStatus, StepAttempt,
    };
    pub use crate::errors::{FetchError, StepError, StepFailure, StepflowError};
    pub use crate::events::{
        CollectingEventSink, EventSink, FanoutEventSink, LoggingEventSink, NoOpEventSink,
        PipelineEvent,
    };
    pub use crate::executor::StepExecutor;
    pub use crate::metrics::MetricsSink;
    pub use crate::pipeline::{Pipeline, PipelineBuilder, RunRegistry};
    pub use crate::retry::{backoff_delay, should_retry, RetryPolicy};
    #[cfg(feature = "http-source")]
    pub use crate::steps::HttpDataSource;
    pub use crate::steps::{
        AlternatingFailure, AlwaysFail, DataSource, DocumentStore, FailureStrategy,
        InMemoryDocumentStore, NeverFail, SaveConfirmation, StaticDataSource, Step,
    };
}
