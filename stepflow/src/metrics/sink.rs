//! Event-driven metrics recording.

use crate::core::AttemptOutcome;
use crate::errors::StepflowError;
use crate::events::{EventSink, PipelineEvent};
use ::metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle, PrometheusRecorder};
use tracing::trace;

/// `status` label for runs that entered `Started`.
pub const STATUS_STARTED: &str = "started";
/// `status` label for succeeded runs.
pub const STATUS_SUCCESS: &str = "success";
/// `status` label for failed runs.
pub const STATUS_FAILED: &str = "failed";

/// Run counter, labelled by `status`.
pub const EXECUTIONS_TOTAL: &str = "workflow_executions_total";
/// Retryable attempt counter, labelled by `activity`.
pub const RETRIES_TOTAL: &str = "workflow_retries_total";
/// Run duration histogram.
pub const DURATION_SECONDS: &str = "workflow_duration_seconds";

/// Bucket boundaries for [`DURATION_SECONDS`], in seconds.
pub const DURATION_BUCKETS: [f64; 6] = [0.1, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Records run and retry metrics from pipeline events.
///
/// Each sink owns its own Prometheus recorder rather than installing a
/// global one, so independent pipelines (and tests) never share series.
/// Every run contributes exactly one `started` and, once terminal, exactly
/// one of `success` or `failed`.
pub struct MetricsSink {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl std::fmt::Debug for MetricsSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsSink").finish_non_exhaustive()
    }
}

impl MetricsSink {
    /// Creates a sink with its own recorder and the duration buckets.
    pub fn new() -> Result<Self, StepflowError> {
        let recorder = PrometheusBuilder::new()
            .set_buckets(&DURATION_BUCKETS)
            .map_err(|e| StepflowError::Metrics(e.to_string()))?
            .build_recorder();
        let handle = recorder.handle();
        let sink = Self { recorder, handle };

        sink.record(|| {
            describe_counter!(EXECUTIONS_TOTAL, "Total number of workflow executions");
            describe_counter!(RETRIES_TOTAL, "Total number of activity retries");
            describe_histogram!(
                DURATION_SECONDS,
                Unit::Seconds,
                "Workflow execution duration in seconds"
            );
            // Register every status series so scrapes show zeros.
            for status in [STATUS_STARTED, STATUS_SUCCESS, STATUS_FAILED] {
                counter!(EXECUTIONS_TOTAL, "status" => status).increment(0);
            }
        });
        Ok(sink)
    }

    fn record<T>(&self, f: impl FnOnce() -> T) -> T {
        ::metrics::with_local_recorder(&self.recorder, f)
    }

    /// Records that a run started.
    pub fn record_run_started(&self) {
        self.record(|| counter!(EXECUTIONS_TOTAL, "status" => STATUS_STARTED).increment(1));
    }

    /// Records a successful run and its duration.
    pub fn record_run_succeeded(&self, duration_secs: f64) {
        self.record(|| {
            counter!(EXECUTIONS_TOTAL, "status" => STATUS_SUCCESS).increment(1);
            histogram!(DURATION_SECONDS).record(duration_secs);
        });
    }

    /// Records a failed run and its duration.
    pub fn record_run_failed(&self, duration_secs: f64) {
        self.record(|| {
            counter!(EXECUTIONS_TOTAL, "status" => STATUS_FAILED).increment(1);
            histogram!(DURATION_SECONDS).record(duration_secs);
        });
    }

    /// Records one retryable attempt of `activity`.
    pub fn record_retry(&self, activity: &str) {
        let activity = activity.to_string();
        self.record(|| counter!(RETRIES_TOTAL, "activity" => activity).increment(1));
    }

    /// Renders every series in the Prometheus text exposition format.
    #[must_use]
    pub fn render(&self) -> String {
        self.handle.render()
    }

    /// Returns the current value of one rendered series, e.g.
    /// `workflow_executions_total{status="started"}`.
    #[must_use]
    pub fn sample(&self, series: &str) -> Option<f64> {
        self.render()
            .lines()
            .filter(|line| !line.starts_with('#'))
            .filter_map(|line| line.rsplit_once(' '))
            .find(|(name, _)| *name == series)
            .and_then(|(_, value)| value.parse().ok())
    }

    /// Returns the run count for a status label.
    #[must_use]
    pub fn executions(&self, status: &str) -> u64 {
        self.counter_value(&format!("{EXECUTIONS_TOTAL}{{status=\"{status}\"}}"))
    }

    /// Returns the retry count for an activity label.
    #[must_use]
    pub fn retries(&self, activity: &str) -> u64 {
        self.counter_value(&format!("{RETRIES_TOTAL}{{activity=\"{activity}\"}}"))
    }

    /// Returns how many run durations have been observed.
    #[must_use]
    pub fn duration_count(&self) -> u64 {
        self.counter_value(&format!("{DURATION_SECONDS}_count"))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn counter_value(&self, series: &str) -> u64 {
        self.sample(series).map_or(0, |v| v as u64)
    }
}

impl EventSink for MetricsSink {
    fn try_emit(&self, event: &PipelineEvent) {
        trace!(event_type = event.event_type(), run_id = event.run_id(), "Recording metrics");
        match event {
            PipelineEvent::RunStarted { .. } => self.record_run_started(),
            PipelineEvent::RunSucceeded { duration_secs, .. } => {
                self.record_run_succeeded(*duration_secs);
            }
            PipelineEvent::RunFailed { duration_secs, .. } => {
                self.record_run_failed(*duration_secs);
            }
            PipelineEvent::StepAttempted(attempt) => {
                if attempt.outcome == AttemptOutcome::RetryableFailure {
                    self.record_retry(&attempt.step_name);
                }
            }
        }
    }
}
