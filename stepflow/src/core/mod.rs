//! Core data model: run records, step attempts and the pipeline document.

mod attempt;
mod document;
mod record;
mod status;

pub use attempt::StepAttempt;
pub use document::{DocumentMetadata, PipelineDocument, WORKFLOW_VERSION};
pub use record::RunRecord;
pub use status::{AttemptOutcome, RunStatus};
