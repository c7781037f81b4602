//! HTTP scrape endpoint for [`MetricsSink`].
//!
//! - `/metrics` - Prometheus text format
//! - `/health` - `{"status":"healthy"}`

use super::MetricsSink;
use crate::errors::StepflowError;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Port the worker listens on when `METRICS_PORT` is unset.
pub const DEFAULT_METRICS_PORT: u16 = 9090;

const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Builds the metrics router backed by `sink`.
pub fn router(sink: Arc<MetricsSink>) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_handler))
        .with_state(sink)
}

/// Serves the metrics router on `addr` until `shutdown` resolves.
pub async fn serve<F>(
    addr: SocketAddr,
    sink: Arc<MetricsSink>,
    shutdown: F,
) -> Result<(), StepflowError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, "Metrics server listening");

    axum::serve(listener, router(sink))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| StepflowError::Metrics(e.to_string()))?;

    info!("Metrics server stopped");
    Ok(())
}

async fn metrics_handler(State(sink): State<Arc<MetricsSink>>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], sink.render())
}

async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "healthy" }))
}
