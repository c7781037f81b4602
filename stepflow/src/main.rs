//! Stepflow worker.
//!
//! Serves metrics, triggers `PIPELINE_RUNS` concurrent runs against the
//! configured data source, then keeps serving until interrupted.

use anyhow::Context;
use futures::future::join_all;
use std::sync::Arc;
use stepflow::config::WorkerConfig;
use stepflow::events::{EventSink, FanoutEventSink, LoggingEventSink};
use stepflow::metrics::{self, MetricsSink, STATUS_FAILED, STATUS_STARTED, STATUS_SUCCESS};
use stepflow::pipeline::PipelineBuilder;
use stepflow::steps::{AlternatingFailure, HttpDataSource, FETCH};
use stepflow::telemetry::init_tracing;
use tokio::sync::oneshot;
use tracing::{error, info};
use uuid::Uuid;

const RUN_ID_PREFIX: &str = "data-processing-workflow";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env().context("failed to load worker configuration")?;
    init_tracing(config.log_format)?;

    let metrics_sink = Arc::new(MetricsSink::new()?);
    let sink: Arc<dyn EventSink> = Arc::new(
        FanoutEventSink::new()
            .with_sink(Arc::new(LoggingEventSink::info()))
            .with_sink(metrics_sink.clone()),
    );

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(metrics::serve(
        config.metrics_addr(),
        metrics_sink.clone(),
        async move {
            let _ = stop_rx.await;
        },
    ));

    let pipeline = PipelineBuilder::new()
        .config(config.pipeline.clone())
        .data_source(Arc::new(HttpDataSource::new(&config.pipeline.source_url)))
        .failure_strategy(Arc::new(AlternatingFailure::new()))
        .event_sink(sink)
        .build()
        .context("failed to build pipeline")?;

    info!(
        runs = config.runs,
        metrics_port = config.metrics_port,
        source = %config.pipeline.source_url,
        "Worker started"
    );

    let results = join_all((0..config.runs).map(|_| {
        let run_id = format!("{RUN_ID_PREFIX}-{}", Uuid::new_v4());
        let pipeline = &pipeline;
        async move {
            let result = pipeline.run(run_id.clone()).await;
            (run_id, result)
        }
    }))
    .await;

    for (run_id, result) in &results {
        match result {
            Ok(confirmation) => info!(%run_id, "Workflow result: {}", confirmation),
            Err(e) => error!(%run_id, error = %e, "Workflow failed"),
        }
    }

    info!(
        started = metrics_sink.executions(STATUS_STARTED),
        succeeded = metrics_sink.executions(STATUS_SUCCESS),
        failed = metrics_sink.executions(STATUS_FAILED),
        fetch_retries = metrics_sink.retries(FETCH),
        "Runs finished; serving metrics until interrupted"
    );

    let interrupted = tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for shutdown signal")?;
            true
        }
        exited = &mut server => {
            exited
                .context("metrics server task panicked")?
                .context("metrics server failed")?;
            false
        }
    };

    if interrupted {
        info!("Shutting down");
        let _ = stop_tx.send(());
        server
            .await
            .context("metrics server task panicked")?
            .context("metrics server failed")?;
    }
    Ok(())
}
