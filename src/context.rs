//! Execution context for chain runs.
//!
//! This module provides the `ExecutionContext` which is passed to every
//! middleware unit, enabling metrics collection and event tracing.

use std::sync::{Arc, Mutex};

use crate::events::{ChainEvent, TraceEntry};
use crate::metrics::ChainMetrics;

/// Context passed to every middleware unit in a chain.
///
/// The context is cloneable; clones share the same metrics and trace log.
/// It carries no payload data, so units never observe each other through it
/// unless they record artifacts explicitly.
///
/// # Example
///
/// ```rust
/// use middleware_chain::{ChainEvent, ExecutionContext};
///
/// let ctx = ExecutionContext::new();
/// ctx.emit(ChainEvent::Exhausted {
///     chain: "auth".to_string(),
///     units_invoked: 0,
/// });
/// assert_eq!(ctx.trace_snapshot().len(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    /// Shared metrics accumulator.
    pub metrics: Arc<Mutex<ChainMetrics>>,
    /// Shared trace log for structured chain events.
    pub traces: Arc<Mutex<Vec<TraceEntry>>>,
    recording: bool,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ExecutionContext {
    /// Create a new execution context with empty metrics and traces.
    #[must_use]
    pub fn new() -> Self {
        Self {
            metrics: Arc::new(Mutex::new(ChainMetrics::default())),
            traces: Arc::new(Mutex::new(Vec::new())),
            recording: true,
        }
    }

    /// Create a context that records nothing.
    ///
    /// Units still receive it, but metrics stay at their defaults and no
    /// trace entries are kept.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            recording: false,
            ..Self::new()
        }
    }

    /// Returns `false` for a [`detached`](Self::detached) context.
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// Start a new chain run, clearing the previous run's outcome.
    pub fn record_run(&self) {
        if self.recording {
            self.metrics.lock().unwrap().record_run();
        }
    }

    /// Increment the invoked-units counter.
    pub fn record_invocation(&self) {
        if self.recording {
            self.metrics.lock().unwrap().record_invocation();
        }
    }

    /// Record that the unit at `index` terminated the chain.
    pub fn record_termination(&self, index: usize) {
        if self.recording {
            self.metrics.lock().unwrap().record_termination(index);
        }
    }

    /// Record that a chain was exhausted.
    pub fn record_exhaustion(&self) {
        if self.recording {
            self.metrics.lock().unwrap().record_exhaustion();
        }
    }

    /// Record a failed unit.
    pub fn record_failure(&self, unit_name: impl Into<String>) {
        if self.recording {
            self.metrics.lock().unwrap().record_failure(unit_name.into());
        }
    }

    /// Get a snapshot of the current metrics.
    #[must_use]
    pub fn snapshot(&self) -> ChainMetrics {
        self.metrics.lock().unwrap().clone()
    }

    /// Emit a structured event to the trace log.
    pub fn emit(&self, event: ChainEvent) {
        if !self.recording {
            return;
        }
        let entry = TraceEntry::new(event);
        self.traces.lock().unwrap().push(entry);
    }

    /// Emit an artifact event with automatic JSON serialization.
    ///
    /// Units call this to record intermediate payloads.
    ///
    /// ```rust
    /// use middleware_chain::{ChainEvent, ExecutionContext};
    ///
    /// let ctx = ExecutionContext::new();
    /// ctx.emit_artifact("normalize", "payload", &vec![1, 2]);
    ///
    /// match &ctx.trace_snapshot()[0].event {
    ///     ChainEvent::Artifact { key, data, .. } => {
    ///         assert_eq!(key, "payload");
    ///         assert_eq!(data, &serde_json::json!([1, 2]));
    ///     }
    ///     other => panic!("unexpected event {other:?}"),
    /// }
    /// ```
    pub fn emit_artifact<T: serde::Serialize>(&self, unit_name: &str, key: &str, data: &T) {
        if !self.recording {
            return;
        }
        let json_data = serde_json::to_value(data)
            .unwrap_or_else(|_| serde_json::json!("<serialization_error>"));
        self.emit(ChainEvent::Artifact {
            unit_name: unit_name.to_string(),
            key: key.to_string(),
            data: json_data,
        });
    }

    /// Get a snapshot of the current trace log.
    #[must_use]
    pub fn trace_snapshot(&self) -> Vec<TraceEntry> {
        self.traces.lock().unwrap().clone()
    }

    /// Clear all trace entries.
    pub fn clear_traces(&self) {
        self.traces.lock().unwrap().clear();
    }
}
