//! Registry of run records.

use crate::core::{RunRecord, RunStatus};
use crate::errors::StepflowError;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Concurrent map of run identifiers to their records.
///
/// Each run id may be registered once; the registry is the only place a
/// [`RunRecord`] is mutated.
///
/// Records are kept until [`RunRegistry::evict_finished`] is called, so a
/// long-lived pipeline should evict periodically. An evicted id is
/// forgotten and may be registered again.
#[derive(Debug, Default)]
pub struct RunRegistry {
    runs: DashMap<String, RunRecord>,
}

impl RunRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new run in the `Started` state.
    pub fn register(&self, run_id: &str) -> Result<RunRecord, StepflowError> {
        match self.runs.entry(run_id.to_string()) {
            Entry::Occupied(_) => Err(StepflowError::DuplicateRun(run_id.to_string())),
            Entry::Vacant(slot) => {
                let record = RunRecord::start(run_id);
                slot.insert(record.clone());
                Ok(record)
            }
        }
    }

    /// Applies a transition to a registered run.
    pub fn update<F>(&self, run_id: &str, transition: F) -> Result<(), StepflowError>
    where
        F: FnOnce(&mut RunRecord) -> Result<(), StepflowError>,
    {
        let mut record = self
            .runs
            .get_mut(run_id)
            .ok_or_else(|| StepflowError::UnknownRun(run_id.to_string()))?;
        transition(&mut record)
    }

    /// Returns a copy of a run's record.
    #[must_use]
    pub fn get(&self, run_id: &str) -> Option<RunRecord> {
        self.runs.get(run_id).map(|r| r.clone())
    }

    /// Returns copies of all records.
    #[must_use]
    pub fn records(&self) -> Vec<RunRecord> {
        self.runs.iter().map(|r| r.value().clone()).collect()
    }

    /// Counts runs currently in `status`.
    #[must_use]
    pub fn count(&self, status: RunStatus) -> usize {
        self.runs.iter().filter(|r| r.status == status).count()
    }

    /// Returns the number of registered runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Returns true if no run has been registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Removes every terminal record and returns how many were removed.
    ///
    /// Runs still in `Started` are kept.
    pub fn evict_finished(&self) -> usize {
        let before = self.runs.len();
        self.runs.retain(|_, record| !record.is_finished());
        before.saturating_sub(self.runs.len())
    }
}
