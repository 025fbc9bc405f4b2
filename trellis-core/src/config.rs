//! Runtime configuration.
//!
//! Each thread owns one reactive runtime. Its behaviour can be tuned with a
//! [`RuntimeConfig`], which derives serde traits so hosts can embed it in
//! their own configuration files.

use serde::{Deserialize, Serialize};

/// What to do when a node is read while its own computation is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePolicy {
    /// No detection. A computed value that reads itself, directly or
    /// transitively, recurses without bound. Callers must keep the graph
    /// acyclic.
    #[default]
    Unchecked,

    /// Report [`ReactiveError::Cycle`](crate::ReactiveError::Cycle) from the
    /// read that closes the cycle.
    Detect,
}

/// Configuration for the current thread's reactive runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Dependency cycle handling.
    pub cycle_policy: CyclePolicy,
}

impl RuntimeConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the cycle policy.
    pub fn with_cycle_policy(mut self, cycle_policy: CyclePolicy) -> Self {
        self.cycle_policy = cycle_policy;
        self
    }
}
