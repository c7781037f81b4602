//! External data sources for the fetch step.

use crate::core::PipelineDocument;
use crate::errors::FetchError;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Endpoint queried when no source URL is configured.
pub const DEFAULT_SOURCE_URL: &str = "https://jsonplaceholder.typicode.com/posts/1";

/// Protocol for retrieving the record that seeds a run.
#[async_trait]
pub trait DataSource: Send + Sync + Debug {
    /// Retrieves a single record.
    async fn fetch_record(&self) -> Result<PipelineDocument, FetchError>;
}

/// Fetches a JSON object with a single HTTP GET.
#[cfg(feature = "http-source")]
#[derive(Debug, Clone)]
pub struct HttpDataSource {
    client: reqwest::Client,
    url: String,
}

#[cfg(feature = "http-source")]
impl HttpDataSource {
    /// Creates a source for `url` with a default client.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), url)
    }

    /// Creates a source using an existing client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Returns the endpoint URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[cfg(feature = "http-source")]
#[async_trait]
impl DataSource for HttpDataSource {
    async fn fetch_record(&self) -> Result<PipelineDocument, FetchError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                url: self.url.clone(),
            });
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FetchError::Decode(e.to_string()))?;

        let document = PipelineDocument::from_value(body)
            .ok_or_else(|| FetchError::Decode("expected a JSON object".to_string()))?;
        if document.title().is_none() {
            tracing::warn!(url = %self.url, "Fetched record has no string title");
        }
        Ok(document)
    }
}

/// Returns a fixed response, optionally after an artificial delay.
#[derive(Debug)]
pub struct StaticDataSource {
    response: Result<PipelineDocument, FetchError>,
    latency: Option<Duration>,
    calls: AtomicUsize,
}

impl StaticDataSource {
    /// Creates a source that always returns `document`.
    #[must_use]
    pub fn new(document: PipelineDocument) -> Self {
        Self {
            response: Ok(document),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Creates a source returning a record with the given title.
    #[must_use]
    pub fn with_title(title: &str) -> Self {
        let mut fields = serde_json::Map::new();
        fields.insert("title".to_string(), serde_json::Value::from(title));
        Self::new(PipelineDocument::from_fields(fields))
    }

    /// Creates a source that always fails with `error`.
    #[must_use]
    pub fn failing(error: FetchError) -> Self {
        Self {
            response: Err(error),
            latency: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Delays every response by `latency`.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of requests started, including abandoned ones.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for StaticDataSource {
    async fn fetch_record(&self) -> Result<PipelineDocument, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.response.clone()
    }
}
