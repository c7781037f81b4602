//! Injectable failure simulation for the fetch step.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

/// Decides whether an invocation should fail before doing any real work.
///
/// Strategies are owned by whoever constructs the step. Sharing one
/// instance between pipelines shares its state; giving each pipeline its
/// own instance keeps runs independent.
pub trait FailureStrategy: Send + Sync + Debug {
    /// Returns true if the current invocation should fail.
    fn should_fail(&self) -> bool;
}

/// Never injects a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverFail;

impl FailureStrategy for NeverFail {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Always injects a failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysFail;

impl FailureStrategy for AlwaysFail {
    fn should_fail(&self) -> bool {
        true
    }
}

/// Fails every odd-numbered invocation and succeeds on even ones.
///
/// The counter belongs to this instance and is shared by every caller
/// holding it, so concurrent runs sharing one instance interleave.
#[derive(Debug, Default)]
pub struct AlternatingFailure {
    invocations: AtomicU64,
}

impl AlternatingFailure {
    /// Creates a strategy whose first invocation fails.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invocations observed so far.
    #[must_use]
    pub fn invocations(&self) -> u64 {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl FailureStrategy for AlternatingFailure {
    fn should_fail(&self) -> bool {
        let n = self.invocations.fetch_add(1, Ordering::SeqCst) + 1;
        n % 2 == 1
    }
}

/// Replays a fixed sequence of outcomes, then falls back to a default.
#[derive(Debug)]
pub struct ScriptedFailure {
    script: Mutex<VecDeque<bool>>,
    fallback: bool,
}

impl ScriptedFailure {
    /// Creates a script where `true` means "fail this invocation".
    /// Once exhausted every invocation succeeds.
    #[must_use]
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback: false,
        }
    }

    /// Sets the outcome used once the script runs out.
    #[must_use]
    pub fn then(mut self, fail: bool) -> Self {
        self.fallback = fail;
        self
    }

    /// Number of scripted outcomes not yet consumed.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.script.lock().len()
    }
}

impl FailureStrategy for ScriptedFailure {
    fn should_fail(&self) -> bool {
        self.script.lock().pop_front().unwrap_or(self.fallback)
    }
}
