//! The save step.

use super::{DocumentStore, Step, SAVE};
use crate::core::PipelineDocument;
use crate::errors::StepError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::info;

/// Confirmation returned by the save step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveConfirmation {
    /// Number of documents in the store after this save.
    pub total_records: usize,
}

impl SaveConfirmation {
    /// Returns the human-readable confirmation message.
    #[must_use]
    pub fn message(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SaveConfirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Data saved successfully. Total records: {}",
            self.total_records
        )
    }
}

/// Appends the transformed document to the shared store.
#[derive(Debug, Clone)]
pub struct SaveStep {
    store: Arc<dyn DocumentStore>,
}

impl SaveStep {
    /// Creates a save step writing to `store`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    /// Returns the backing store.
    #[must_use]
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

#[async_trait]
impl Step for SaveStep {
    type Input = PipelineDocument;
    type Output = SaveConfirmation;

    fn name(&self) -> &str {
        SAVE
    }

    async fn run(&self, input: &PipelineDocument) -> Result<SaveConfirmation, StepError> {
        let total_records = self.store.append(input.clone()).await;
        let confirmation = SaveConfirmation { total_records };
        info!(step = SAVE, total_records, "{}", confirmation);
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::InMemoryDocumentStore;

    #[test]
    fn test_confirmation_message() {
        let confirmation = SaveConfirmation { total_records: 1 };
        assert_eq!(
            confirmation.message(),
            "Data saved successfully. Total records: 1"
        );
    }

    #[tokio::test]
    async fn test_save_is_strictly_additive() {
        let store = Arc::new(InMemoryDocumentStore::new());
        store.append(PipelineDocument::default()).await;
        let prior = store.len().await;

        let step = SaveStep::new(store.clone());
        let mut last = 0;
        for _ in 0..4 {
            last = step.run(&PipelineDocument::default()).await.unwrap().total_records;
        }

        assert_eq!(last, prior + 4);
        assert_eq!(store.len().await, prior + 4);
    }
}
