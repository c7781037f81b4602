//! Pipeline orchestration.
//!
//! This module provides:
//! - The [`Pipeline`] orchestrator running fetch, transform and save in order
//! - A [`PipelineBuilder`] wiring injected resources together
//! - The [`RunRegistry`] tracking every run's [`crate::core::RunRecord`]

mod builder;
mod integration_tests;
mod orchestrator;
mod registry;

pub use builder::PipelineBuilder;
pub use orchestrator::{Pipeline, ABANDONED};
pub use registry::RunRegistry;
