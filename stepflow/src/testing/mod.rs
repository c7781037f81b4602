//! Testing utilities for stepflow pipelines.
//!
//! This module provides:
//! - Scripted steps with controllable outcomes and latency
//! - Fixtures for fast retry policies and in-memory pipelines

mod fixtures;
mod mocks;

pub use fixtures::{fast_policy, fast_settings, in_memory_pipeline, TestPipeline};
pub use mocks::ScriptedStep;
