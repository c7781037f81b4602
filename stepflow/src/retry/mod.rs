//! Retry policy evaluation.
//!
//! A [`RetryPolicy`] is the single, explicit description of how a step is
//! retried. The evaluator functions are pure: they only look at the attempt
//! number and the policy.

mod policy;

pub use policy::{backoff_delay, should_retry, RetryPolicy};
