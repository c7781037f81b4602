//! Tracing subscriber setup for the worker.

use crate::config::LogFormat;
use crate::errors::StepflowError;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs the global tracing subscriber.
///
/// Uses `RUST_LOG` for filtering, defaulting to [`DEFAULT_LOG_FILTER`].
/// Fails if a global subscriber is already installed.
pub fn init_tracing(format: LogFormat) -> Result<(), StepflowError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true);

    let result = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().with_current_span(true).try_init(),
    };
    result.map_err(|e| StepflowError::Config(format!("failed to install tracing subscriber: {e}")))
}
