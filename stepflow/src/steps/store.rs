//! Append-only storage for saved documents.

use crate::core::PipelineDocument;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::fmt::Debug;

/// Protocol for the storage backend of the save step.
#[async_trait]
pub trait DocumentStore: Send + Sync + Debug {
    /// Appends a document and returns the new total count.
    ///
    /// Concurrent appends must be serialized: the returned counts across
    /// all callers are exactly `1..=n` with no duplicates.
    async fn append(&self, document: PipelineDocument) -> usize;

    /// Returns the number of stored documents.
    async fn len(&self) -> usize;

    /// Returns true if nothing has been stored.
    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Returns a copy of every stored document, oldest first.
    async fn documents(&self) -> Vec<PipelineDocument>;
}

/// In-memory store that lives for the lifetime of the process.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    documents: Mutex<Vec<PipelineDocument>>,
}

impl InMemoryDocumentStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn append(&self, document: PipelineDocument) -> usize {
        let mut documents = self.documents.lock();
        documents.push(document);
        documents.len()
    }

    async fn len(&self) -> usize {
        self.documents.lock().len()
    }

    async fn documents(&self) -> Vec<PipelineDocument> {
        self.documents.lock().clone()
    }
}
