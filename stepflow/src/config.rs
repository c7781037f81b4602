//! Configuration types for pipelines and the worker process.

use crate::errors::StepflowError;
use crate::retry::RetryPolicy;
use crate::steps::DEFAULT_SOURCE_URL;
use serde::{Deserialize, Serialize};
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use std::time::Duration;

/// Retry policy and deadline for one step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSettings {
    /// Retry policy applied between attempts.
    #[serde(default)]
    pub policy: RetryPolicy,
    /// Deadline for a single attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_timeout_ms() -> u64 {
    60_000
}

impl Default for StepSettings {
    fn default() -> Self {
        Self {
            policy: RetryPolicy::default(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl StepSettings {
    /// Creates settings from a policy and a timeout.
    #[must_use]
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Self {
        Self {
            policy,
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Sets the attempt timeout in milliseconds.
    #[must_use]
    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Gets timeout as Duration.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    fn validate(&self, step: &str) -> Result<(), StepflowError> {
        self.policy
            .validate()
            .map_err(|e| StepflowError::Config(format!("{step}: {e}")))?;
        if self.timeout_ms == 0 {
            return Err(StepflowError::Config(format!(
                "{step}: timeout_ms must be greater than 0"
            )));
        }
        Ok(())
    }
}

/// Configuration for a pipeline.
///
/// Every step declares its own [`StepSettings`]; there is no implicit
/// shared policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// URL queried by the fetch step.
    #[serde(default = "default_source_url")]
    pub source_url: String,
    /// Settings for the fetch step.
    #[serde(default)]
    pub fetch: StepSettings,
    /// Settings for the transform step.
    #[serde(default)]
    pub transform: StepSettings,
    /// Settings for the save step.
    #[serde(default)]
    pub save: StepSettings,
}

fn default_source_url() -> String {
    DEFAULT_SOURCE_URL.to_string()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            source_url: default_source_url(),
            fetch: StepSettings::default(),
            transform: StepSettings::default(),
            save: StepSettings::default(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the same settings for all three steps.
    #[must_use]
    pub fn uniform(settings: StepSettings) -> Self {
        Self {
            source_url: default_source_url(),
            fetch: settings.clone(),
            transform: settings.clone(),
            save: settings,
        }
    }

    /// Sets the source URL.
    #[must_use]
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = url.into();
        self
    }

    /// Sets the fetch step settings.
    #[must_use]
    pub fn with_fetch(mut self, settings: StepSettings) -> Self {
        self.fetch = settings;
        self
    }

    /// Sets the transform step settings.
    #[must_use]
    pub fn with_transform(mut self, settings: StepSettings) -> Self {
        self.transform = settings;
        self
    }

    /// Sets the save step settings.
    #[must_use]
    pub fn with_save(mut self, settings: StepSettings) -> Self {
        self.save = settings;
        self
    }

    /// Parses a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, StepflowError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, StepflowError> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw)
    }

    /// Checks every step's settings.
    pub fn validate(&self) -> Result<(), StepflowError> {
        if self.source_url.trim().is_empty() {
            return Err(StepflowError::Config("source_url must not be empty".to_string()));
        }
        self.fetch.validate("fetch")?;
        self.transform.validate("transform")?;
        self.save.validate("save")
    }
}

/// Output format for logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Process-level configuration for the worker binary.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    /// Port for the metrics scrape endpoint.
    pub metrics_port: u16,
    /// Number of runs to trigger at startup.
    pub runs: usize,
    /// Log output format.
    pub log_format: LogFormat,
    /// The pipeline configuration.
    pub pipeline: PipelineConfig,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            metrics_port: 9090,
            runs: 1,
            log_format: LogFormat::Text,
            pipeline: PipelineConfig::default(),
        }
    }
}

impl WorkerConfig {
    /// Reads `METRICS_PORT`, `PIPELINE_RUNS`, `LOG_FORMAT` and
    /// `PIPELINE_CONFIG` from the environment.
    pub fn from_env() -> Result<Self, StepflowError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, StepflowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(port) = lookup("METRICS_PORT") {
            config.metrics_port = port
                .trim()
                .parse()
                .map_err(|_| StepflowError::Config(format!("invalid METRICS_PORT: {port}")))?;
        }
        if let Some(runs) = lookup("PIPELINE_RUNS") {
            config.runs = runs
                .trim()
                .parse()
                .map_err(|_| StepflowError::Config(format!("invalid PIPELINE_RUNS: {runs}")))?;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.log_format = match format.trim().to_ascii_lowercase().as_str() {
                "text" | "" => LogFormat::Text,
                "json" => LogFormat::Json,
                other => {
                    return Err(StepflowError::Config(format!("invalid LOG_FORMAT: {other}")))
                }
            };
        }
        if let Some(path) = lookup("PIPELINE_CONFIG") {
            config.pipeline = PipelineConfig::from_file(path.trim())?;
        }

        Ok(config)
    }

    /// Address the metrics server binds to.
    #[must_use]
    pub fn metrics_addr(&self) -> SocketAddr {
        SocketAddr::from((Ipv4Addr::UNSPECIFIED, self.metrics_port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.source_url, DEFAULT_SOURCE_URL);
        assert_eq!(config.fetch.timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch.policy, RetryPolicy::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_pipeline_config_from_json() {
        let config = PipelineConfig::from_json_str(
            r#"{
                "source_url": "http://localhost:8080/record",
                "fetch": { "policy": { "max_attempts": 5 }, "timeout_ms": 250 }
            }"#,
        )
        .unwrap();

        assert_eq!(config.source_url, "http://localhost:8080/record");
        assert_eq!(config.fetch.policy.max_attempts, 5);
        assert_eq!(config.fetch.timeout_ms, 250);
        assert_eq!(config.save, StepSettings::default());
    }

    #[test]
    fn test_pipeline_config_rejects_invalid_policy() {
        let err = PipelineConfig::from_json_str(
            r#"{ "transform": { "policy": { "backoff_coefficient": 0.5 } } }"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("transform"));
    }

    #[test]
    fn test_pipeline_config_rejects_zero_timeout() {
        let config = PipelineConfig::new().with_save(StepSettings::default().with_timeout_ms(0));
        assert!(matches!(config.validate(), Err(StepflowError::Config(_))));
    }

    #[test]
    fn test_pipeline_config_rejects_malformed_json() {
        assert!(matches!(
            PipelineConfig::from_json_str("{"),
            Err(StepflowError::Serialization(_))
        ));
    }

    #[test]
    fn test_worker_config_defaults() {
        let config = WorkerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, WorkerConfig::default());
        assert_eq!(config.metrics_addr().port(), 9090);
    }

    #[test]
    fn test_worker_config_from_vars() {
        let config = WorkerConfig::from_lookup(lookup(&[
            ("METRICS_PORT", "9191"),
            ("PIPELINE_RUNS", "4"),
            ("LOG_FORMAT", "JSON"),
        ]))
        .unwrap();

        assert_eq!(config.metrics_port, 9191);
        assert_eq!(config.runs, 4);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn test_worker_config_invalid_port() {
        let err = WorkerConfig::from_lookup(lookup(&[("METRICS_PORT", "http")])).unwrap_err();
        assert!(matches!(err, StepflowError::Config(_)));
    }

    #[test]
    fn test_worker_config_missing_pipeline_file() {
        let err = WorkerConfig::from_lookup(lookup(&[("PIPELINE_CONFIG", "/nonexistent/stepflow.json")]))
            .unwrap_err();
        assert!(matches!(err, StepflowError::Io(_)));
    }

    #[test]
    fn test_worker_config_reads_pipeline_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            br#"{ "fetch": { "policy": { "max_attempts": 1 } } }"#,
        )
        .unwrap();
        let path = file.path().to_string_lossy().into_owned();

        let config = WorkerConfig::from_lookup(lookup(&[("PIPELINE_CONFIG", &path)])).unwrap();
        assert_eq!(config.pipeline.fetch.policy.max_attempts, 1);
        assert_eq!(config.pipeline.save, StepSettings::default());
    }
}
