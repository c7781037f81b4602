//! Retry policy configuration and the backoff/retry evaluator.

use crate::errors::StepflowError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for retry behavior.
///
/// `max_attempts` counts the initial attempt, so `max_attempts = 1`
/// disables retry entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_interval_ms")]
    pub initial_interval_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_interval_ms")]
    pub max_interval_ms: u64,
    /// Multiplier applied per attempt. Must be at least 1.
    #[serde(default = "default_backoff_coefficient")]
    pub backoff_coefficient: f64,
    /// Maximum attempts, including the first one. Must be at least 1.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

fn default_initial_interval_ms() -> u64 {
    1_000
}

fn default_max_interval_ms() -> u64 {
    10_000
}

fn default_backoff_coefficient() -> f64 {
    2.0
}

fn default_max_attempts() -> u32 {
    3
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            initial_interval_ms: default_initial_interval_ms(),
            max_interval_ms: default_max_interval_ms(),
            backoff_coefficient: default_backoff_coefficient(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl RetryPolicy {
    /// Creates a new retry policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A policy that never retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self::default().with_max_attempts(1)
    }

    /// Sets the maximum attempts.
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Sets the initial interval.
    #[must_use]
    pub fn with_initial_interval_ms(mut self, interval: u64) -> Self {
        self.initial_interval_ms = interval;
        self
    }

    /// Sets the maximum interval.
    #[must_use]
    pub fn with_max_interval_ms(mut self, interval: u64) -> Self {
        self.max_interval_ms = interval;
        self
    }

    /// Sets the backoff coefficient.
    #[must_use]
    pub fn with_backoff_coefficient(mut self, coefficient: f64) -> Self {
        self.backoff_coefficient = coefficient;
        self
    }

    /// Checks the policy invariants.
    pub fn validate(&self) -> Result<(), StepflowError> {
        if self.max_attempts < 1 {
            return Err(StepflowError::InvalidPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_coefficient.is_finite() || self.backoff_coefficient < 1.0 {
            return Err(StepflowError::InvalidPolicy(format!(
                "backoff_coefficient must be >= 1, got {}",
                self.backoff_coefficient
            )));
        }
        if self.initial_interval_ms > self.max_interval_ms {
            return Err(StepflowError::InvalidPolicy(format!(
                "initial_interval_ms ({}) exceeds max_interval_ms ({})",
                self.initial_interval_ms, self.max_interval_ms
            )));
        }
        Ok(())
    }
}

/// Returns true if another attempt may follow attempt `attempt_number`.
#[must_use]
pub fn should_retry(attempt_number: u32, policy: &RetryPolicy) -> bool {
    attempt_number < policy.max_attempts
}

/// Delay to wait after attempt `attempt_number` fails.
///
/// `min(initial * coefficient^(attempt - 1), max)`. Attempt numbers are
/// 1-based; 0 is treated as 1.
#[must_use]
pub fn backoff_delay(attempt_number: u32, policy: &RetryPolicy) -> Duration {
    if policy.initial_interval_ms == 0 {
        return Duration::ZERO;
    }
    let exponent = attempt_number.saturating_sub(1);
    let exponent = i32::try_from(exponent).unwrap_or(i32::MAX);
    #[allow(clippy::cast_precision_loss)]
    let raw = policy.initial_interval_ms as f64 * policy.backoff_coefficient.powi(exponent);
    #[allow(clippy::cast_precision_loss)]
    let cap = policy.max_interval_ms as f64;

    // NaN and infinity from overflow collapse to the cap.
    let millis = if raw.is_finite() { raw.min(cap) } else { cap };
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let millis = millis.max(0.0).round() as u64;
    Duration::from_millis(millis.min(policy.max_interval_ms))
}
