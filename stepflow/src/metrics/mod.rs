//! Execution metrics.
//!
//! [`MetricsSink`] is an [`crate::events::EventSink`] that records pipeline
//! events through the `metrics` facade into a Prometheus recorder:
//!
//! - `workflow_executions_total{status}`: `started`, `success`, `failed`
//! - `workflow_retries_total{activity}`: one per retryable attempt
//! - `workflow_duration_seconds`: total run duration
//!
//! With the `metrics-server` feature the rendered output can be scraped over
//! HTTP.

#[cfg(feature = "metrics-server")]
mod server;
mod sink;

#[cfg(feature = "metrics-server")]
pub use server::{router, serve, DEFAULT_METRICS_PORT};
pub use sink::{
    MetricsSink, DURATION_BUCKETS, DURATION_SECONDS, EXECUTIONS_TOTAL, RETRIES_TOTAL,
    STATUS_FAILED, STATUS_STARTED, STATUS_SUCCESS,
};
