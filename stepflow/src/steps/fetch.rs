//! The fetch step.

use super::{DataSource, FailureStrategy, Step, FETCH};
use crate::core::PipelineDocument;
use crate::errors::StepError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// Retrieves the record that seeds a run.
///
/// Before touching the data source the step consults its
/// [`FailureStrategy`]; an injected failure is reported as a retryable
/// upstream outage. Data source failures are classified by
/// [`crate::errors::FetchError::classify`].
#[derive(Debug, Clone)]
pub struct FetchStep {
    source: Arc<dyn DataSource>,
    failures: Arc<dyn FailureStrategy>,
}

impl FetchStep {
    /// Creates a fetch step.
    #[must_use]
    pub fn new(source: Arc<dyn DataSource>, failures: Arc<dyn FailureStrategy>) -> Self {
        Self { source, failures }
    }
}

#[async_trait]
impl Step for FetchStep {
    type Input = ();
    type Output = PipelineDocument;

    fn name(&self) -> &str {
        FETCH
    }

    async fn run(&self, _input: &()) -> Result<PipelineDocument, StepError> {
        if self.failures.should_fail() {
            info!(step = FETCH, "Simulating upstream failure");
            return Err(StepError::retryable(
                "API temporarily unavailable (simulated failure)",
            ));
        }

        let document = self.source.fetch_record().await?;
        debug!(step = FETCH, fields = document.fields.len(), "Record fetched");
        Ok(document)
    }
}
