//! Structured chain execution events for tracing and observability.
//!
//! The executor emits one event when a unit starts, one when it settles, and
//! one when a chain runs out of units.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::Decision;

/// Events that can be emitted during chain execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ChainEvent {
    /// A unit was invoked.
    UnitStart {
        /// Name of the chain.
        chain: String,
        /// Position of the unit in the chain.
        index: usize,
        /// Name of the unit.
        unit_name: String,
    },
    /// A unit settled successfully.
    UnitEnd {
        /// Name of the chain.
        chain: String,
        /// Position of the unit in the chain.
        index: usize,
        /// Name of the unit.
        unit_name: String,
        /// Whether the unit continued or terminated the chain.
        decision: Decision,
        /// Duration of execution in milliseconds.
        duration_ms: u128,
    },
    /// A unit's task failed, failing the whole chain.
    UnitFailed {
        /// Name of the chain.
        chain: String,
        /// Position of the unit in the chain.
        index: usize,
        /// Name of the unit.
        unit_name: String,
    },
    /// A branch unit routed the payload to one of its sides.
    BranchTaken {
        /// Name of the branch unit.
        unit_name: String,
        /// Name of the unit that received the payload.
        taken: String,
    },
    /// The chain ran out of units without any of them terminating it.
    Exhausted {
        /// Name of the chain.
        chain: String,
        /// How many units ran before exhaustion.
        units_invoked: usize,
    },
    /// An intermediate artifact recorded by a unit.
    Artifact {
        /// Name of the unit that produced the artifact.
        unit_name: String,
        /// Key identifying the artifact.
        key: String,
        /// The artifact data as a JSON value.
        data: serde_json::Value,
    },
}

/// A timestamped trace entry containing a chain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Unix epoch timestamp in milliseconds when this event occurred.
    pub timestamp: u128,
    /// The recorded event.
    #[serde(flatten)]
    pub event: ChainEvent,
}

impl TraceEntry {
    /// Create a new trace entry with the current timestamp.
    #[must_use]
    pub fn new(event: ChainEvent) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or_default();
        Self { timestamp, event }
    }
}
