//! End-to-end tests for pipeline runs.

#[cfg(test)]
mod tests {
    use crate::config::StepSettings;
    use crate::core::{AttemptOutcome, RunStatus, WORKFLOW_VERSION};
    use crate::errors::{StepError, StepflowError};
    use crate::events::PipelineEvent;
    use crate::metrics::{STATUS_FAILED, STATUS_STARTED, STATUS_SUCCESS};
    use crate::pipeline::ABANDONED;
    use crate::steps::{
        AlternatingFailure, AlwaysFail, FailureStrategy, NeverFail, ScriptedFailure,
        StaticDataSource, FETCH, SAVE, TRANSFORM,
    };
    use crate::testing::{fast_policy, fast_settings, TestPipeline};
    use futures::future::join_all;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::{assert_err, assert_ok};

    fn outcomes(harness: &TestPipeline, run_id: &str, step: &str) -> Vec<AttemptOutcome> {
        harness
            .events
            .attempts_for(run_id, step)
            .into_iter()
            .map(|a| a.outcome)
            .collect()
    }

    #[tokio::test]
    async fn test_alternating_failure_recovers_on_second_attempt() {
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("hello")),
            Arc::new(AlternatingFailure::new()),
            fast_settings(3),
        )
        .unwrap();

        let confirmation = assert_ok!(harness.pipeline.run("wf-1").await);
        assert_eq!(confirmation.total_records, 1);
        assert_eq!(
            confirmation.to_string(),
            "Data saved successfully. Total records: 1"
        );

        assert_eq!(
            outcomes(&harness, "wf-1", FETCH),
            vec![AttemptOutcome::RetryableFailure, AttemptOutcome::Success]
        );
        assert_eq!(outcomes(&harness, "wf-1", TRANSFORM), vec![AttemptOutcome::Success]);
        assert_eq!(outcomes(&harness, "wf-1", SAVE), vec![AttemptOutcome::Success]);

        let saved = harness.pipeline.store().documents().await;
        assert_eq!(saved.len(), 1);
        let doc = &saved[0];
        assert_eq!(doc.title(), Some("HELLO"));
        assert!(doc.processed_at.is_some());
        let metadata = doc.metadata.as_ref().unwrap();
        assert!(metadata.transformed);
        assert_eq!(metadata.original_length, 5);
        assert_eq!(metadata.workflow_version, WORKFLOW_VERSION);

        let metrics = &harness.metrics;
        assert_eq!(metrics.executions(STATUS_STARTED), 1);
        assert_eq!(metrics.executions(STATUS_SUCCESS), 1);
        assert_eq!(metrics.executions(STATUS_FAILED), 0);
        assert_eq!(metrics.retries(FETCH), 1);
        assert_eq!(metrics.duration_count(), 1);
    }

    #[tokio::test]
    async fn test_single_attempt_failure_halts_run() {
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("hello")),
            Arc::new(AlwaysFail),
            fast_settings(1),
        )
        .unwrap();

        let err = assert_err!(harness.pipeline.run("wf-2").await);
        let failure = err.step_failure().unwrap();
        assert_eq!(failure.step, FETCH);
        assert_eq!(failure.attempts, 1);

        let attempts = harness.events.attempts_for("wf-2", FETCH);
        assert_eq!(attempts.len(), 1);
        assert_eq!(attempts[0].outcome, AttemptOutcome::FatalFailure);
        assert!(harness.events.attempts_for("wf-2", TRANSFORM).is_empty());
        assert!(harness.events.attempts_for("wf-2", SAVE).is_empty());
        assert!(harness.pipeline.store().is_empty().await);

        let record = harness.pipeline.run_record("wf-2").unwrap();
        assert_eq!(record.status, RunStatus::Failed);

        let metrics = &harness.metrics;
        assert_eq!(metrics.executions(STATUS_FAILED), 1);
        assert_eq!(metrics.executions(STATUS_SUCCESS), 0);
        assert_eq!(metrics.retries(FETCH), 0);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_last_cause() {
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("hello")),
            Arc::new(AlwaysFail),
            fast_settings(3),
        )
        .unwrap();

        let err = assert_err!(harness.pipeline.run("wf-3").await);
        let failure = err.step_failure().unwrap();
        assert_eq!(failure.attempts, 3);
        assert!(failure.exhausted());
        assert!(failure.to_string().contains("simulated failure"));

        assert_eq!(
            outcomes(&harness, "wf-3", FETCH),
            vec![
                AttemptOutcome::RetryableFailure,
                AttemptOutcome::RetryableFailure,
                AttemptOutcome::FatalFailure,
            ]
        );
        assert_eq!(harness.metrics.retries(FETCH), 2);
    }

    #[tokio::test]
    async fn test_timed_out_attempt_is_retried() {
        let source = Arc::new(
            StaticDataSource::with_title("slow").with_latency(Duration::from_millis(200)),
        );
        let config = fast_settings(2).with_fetch(StepSettings::new(
            fast_policy(2),
            Duration::from_millis(20),
        ));
        let harness = TestPipeline::new(source.clone(), Arc::new(NeverFail), config).unwrap();

        let err = assert_err!(harness.pipeline.run("wf-timeout").await);
        let failure = err.step_failure().unwrap();
        assert_eq!(failure.step, FETCH);
        assert_eq!(failure.attempts, 2);
        assert_eq!(failure.cause, StepError::TimedOut { timeout_ms: 20 });

        assert_eq!(
            outcomes(&harness, "wf-timeout", FETCH),
            vec![AttemptOutcome::RetryableFailure, AttemptOutcome::FatalFailure]
        );
        assert_eq!(source.calls(), 2);
        assert!(harness.pipeline.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_event_order_for_successful_run() {
        let failures = ScriptedFailure::new([true, true]).then(false);
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("abc")),
            Arc::new(failures),
            fast_settings(3),
        )
        .unwrap();

        assert_ok!(harness.pipeline.run("wf-order").await);

        let events = harness.events.events();
        assert!(matches!(events.first(), Some(PipelineEvent::RunStarted { .. })));
        assert!(matches!(events.last(), Some(PipelineEvent::RunSucceeded { .. })));

        let steps: Vec<(String, u32)> = events
            .iter()
            .filter_map(|event| match event {
                PipelineEvent::StepAttempted(a) => Some((a.step_name.clone(), a.attempt_number)),
                _ => None,
            })
            .collect();
        assert_eq!(
            steps,
            vec![
                (FETCH.to_string(), 1),
                (FETCH.to_string(), 2),
                (FETCH.to_string(), 3),
                (TRANSFORM.to_string(), 1),
                (SAVE.to_string(), 1),
            ]
        );
    }

    #[tokio::test]
    async fn test_concurrent_runs_keep_counts_consistent() {
        const RUNS: usize = 12;
        const MAX_ATTEMPTS: u32 = 3;

        let failures: Arc<dyn FailureStrategy> = Arc::new(AlternatingFailure::new());
        let harness = Arc::new(
            TestPipeline::new(
                Arc::new(StaticDataSource::with_title("hello")),
                failures,
                fast_settings(MAX_ATTEMPTS),
            )
            .unwrap(),
        );

        let results = join_all((0..RUNS).map(|i| {
            let harness = harness.clone();
            async move { harness.pipeline.run(format!("wf-concurrent-{i}")).await }
        }))
        .await;

        let succeeded = results.iter().filter(|r| r.is_ok()).count();
        let failed = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(succeeded + failed, RUNS);

        let metrics = &harness.metrics;
        assert_eq!(metrics.executions(STATUS_STARTED), RUNS as u64);
        assert_eq!(
            metrics.executions(STATUS_STARTED),
            metrics.executions(STATUS_SUCCESS) + metrics.executions(STATUS_FAILED)
        );
        assert_eq!(metrics.executions(STATUS_SUCCESS), succeeded as u64);
        assert_eq!(metrics.duration_count(), RUNS as u64);

        assert_eq!(harness.pipeline.store().len().await, succeeded);
        assert_eq!(harness.pipeline.runs().count(RunStatus::Succeeded), succeeded);
        assert_eq!(harness.pipeline.runs().count(RunStatus::Failed), failed);

        for i in 0..RUNS {
            let run_id = format!("wf-concurrent-{i}");
            let numbers: Vec<u32> = harness
                .events
                .attempts_for(&run_id, FETCH)
                .iter()
                .map(|a| a.attempt_number)
                .collect();
            let expected: Vec<u32> = (1..=u32::try_from(numbers.len()).unwrap()).collect();
            assert_eq!(numbers, expected, "attempts of {run_id}");
            assert!(numbers.len() <= MAX_ATTEMPTS as usize);
        }
    }

    #[tokio::test]
    async fn test_failed_run_does_not_affect_later_runs() {
        let failures = ScriptedFailure::new([true]).then(false);
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("x")),
            Arc::new(failures),
            fast_settings(1),
        )
        .unwrap();

        assert_err!(harness.pipeline.run("first").await);
        let confirmation = assert_ok!(harness.pipeline.run("second").await);
        assert_eq!(confirmation.total_records, 1);

        assert_eq!(
            harness.pipeline.run_record("first").map(|r| r.status),
            Some(RunStatus::Failed)
        );
        assert_eq!(
            harness.pipeline.run_record("second").map(|r| r.status),
            Some(RunStatus::Succeeded)
        );
    }

    #[tokio::test]
    async fn test_duplicate_run_leaves_metrics_untouched() {
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("x")),
            Arc::new(NeverFail),
            fast_settings(1),
        )
        .unwrap();

        assert_ok!(harness.pipeline.run("dup").await);
        let err = assert_err!(harness.pipeline.run("dup").await);
        assert!(matches!(err, StepflowError::DuplicateRun(id) if id == "dup"));

        assert_eq!(harness.metrics.executions(STATUS_STARTED), 1);
        assert_eq!(harness.pipeline.runs().len(), 1);
    }

    #[tokio::test]
    async fn test_abandoned_run_is_marked_failed() {
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("slow").with_latency(Duration::from_millis(200))),
            Arc::new(NeverFail),
            fast_settings(1),
        )
        .unwrap();

        let waited =
            tokio::time::timeout(Duration::from_millis(20), harness.pipeline.run("abandoned")).await;
        assert!(waited.is_err());

        let record = harness.pipeline.run_record("abandoned").unwrap();
        assert_eq!(record.status, RunStatus::Failed);
        assert!(record.ended_at.is_some());

        let metrics = &harness.metrics;
        assert_eq!(metrics.executions(STATUS_STARTED), 1);
        assert_eq!(metrics.executions(STATUS_FAILED), 1);
        assert_eq!(metrics.executions(STATUS_SUCCESS), 0);
        assert_eq!(metrics.duration_count(), 1);

        match harness.events.events().last() {
            Some(PipelineEvent::RunFailed { run_id, step, error, .. }) => {
                assert_eq!(run_id, "abandoned");
                assert_eq!(step, FETCH);
                assert_eq!(error, ABANDONED);
            }
            other => panic!("expected run.failed, got {other:?}"),
        }
        assert!(harness.pipeline.store().is_empty().await);
    }

    #[tokio::test]
    async fn test_completed_run_emits_single_terminal_event() {
        let harness = TestPipeline::new(
            Arc::new(StaticDataSource::with_title("x")),
            Arc::new(NeverFail),
            fast_settings(1),
        )
        .unwrap();

        assert_ok!(harness.pipeline.run("once").await);

        assert_eq!(harness.events.events_of_type("run.succeeded").len(), 1);
        assert!(harness.events.events_of_type("run.failed").is_empty());
        assert_eq!(harness.metrics.executions(STATUS_FAILED), 0);
    }
}
