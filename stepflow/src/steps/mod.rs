//! Step trait and the three pipeline steps.
//!
//! Steps are stateless units of work: they borrow their input, produce an
//! owned output, and classify failures as retryable or fatal. Shared state
//! (the failure strategy, the data source, the document store) is injected
//! at construction time.

mod fetch;
mod save;
mod simulation;
mod source;
mod store;
mod transform;

pub use fetch::FetchStep;
pub use save::{SaveConfirmation, SaveStep};
pub use simulation::{
    AlternatingFailure, AlwaysFail, FailureStrategy, NeverFail, ScriptedFailure,
};
#[cfg(feature = "http-source")]
pub use source::HttpDataSource;
pub use source::{DataSource, StaticDataSource, DEFAULT_SOURCE_URL};
pub use store::{DocumentStore, InMemoryDocumentStore};
pub use transform::TransformStep;

use crate::errors::StepError;
use async_trait::async_trait;

/// Name of the fetch step.
pub const FETCH: &str = "fetch";
/// Name of the transform step.
pub const TRANSFORM: &str = "transform";
/// Name of the save step.
pub const SAVE: &str = "save";

/// Trait for pipeline steps.
///
/// The executor may call [`Step::run`] several times with the same input,
/// and may abandon a call mid-flight when its deadline elapses, so
/// implementations must be safe to abandon or idempotent on retry.
#[async_trait]
pub trait Step: Send + Sync {
    /// The value the step consumes.
    type Input: Send + Sync;
    /// The value the step produces.
    type Output: Send;

    /// Returns the name of the step.
    fn name(&self) -> &str;

    /// Runs one attempt of the step.
    async fn run(&self, input: &Self::Input) -> Result<Self::Output, StepError>;
}
