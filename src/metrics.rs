//! Metrics collection for chain execution.
//!
//! This module provides `ChainMetrics` for tracking how far a chain got and
//! which units failed.

use serde::{Deserialize, Serialize};

/// Aggregated metrics for one or more chain executions.
///
/// `units_invoked` and `failures` accumulate over every run recorded into the
/// same context. `terminated_at` and `exhausted` describe the most recent run
/// only and are cleared when a new run starts.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainMetrics {
    /// Number of chain runs started.
    pub runs: usize,
    /// Number of middleware units invoked.
    pub units_invoked: usize,
    /// Index of the unit that terminated the most recent run, if any.
    pub terminated_at: Option<usize>,
    /// Whether the most recent run ran out of units without terminating.
    pub exhausted: bool,
    /// Names of the units whose task failed.
    pub failures: Vec<String>,
}

impl ChainMetrics {
    /// Start a new run, clearing the outcome of the previous one.
    pub fn record_run(&mut self) {
        self.runs += 1;
        self.terminated_at = None;
        self.exhausted = false;
    }

    /// Increment the invoked-units counter.
    pub fn record_invocation(&mut self) {
        self.units_invoked += 1;
    }

    /// Record that the unit at `index` terminated the chain.
    pub fn record_termination(&mut self, index: usize) {
        self.terminated_at = Some(index);
    }

    /// Record that a chain was exhausted.
    pub fn record_exhaustion(&mut self) {
        self.exhausted = true;
    }

    /// Record a failed unit.
    pub fn record_failure(&mut self, unit_name: String) {
        self.failures.push(unit_name);
    }

    /// Check if there were any failures.
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}
