//! The continue-or-terminate decision returned by every middleware unit.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A decision produced by a middleware unit, carrying exactly one payload.
///
/// # Example
///
/// ```rust
/// use middleware_chain::Step;
///
/// let step = Step::Continue(2).map(|x| x * 10);
/// assert_eq!(step, Step::Continue(20));
/// assert!(step.is_continue());
/// assert_eq!(step.into_payload(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "decision", content = "payload")]
pub enum Step<A> {
    /// Hand the payload to the next unit in the chain.
    Continue(A),
    /// Stop the chain; the payload is the chain's final result.
    Terminate(A),
}

/// The tag of a [`Step`] without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Decision {
    /// See [`Step::Continue`].
    Continue,
    /// See [`Step::Terminate`].
    Terminate,
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Decision::Continue => f.write_str("continue"),
            Decision::Terminate => f.write_str("terminate"),
        }
    }
}

impl<A> Step<A> {
    /// Returns the tag of this step.
    pub fn decision(&self) -> Decision {
        match self {
            Step::Continue(_) => Decision::Continue,
            Step::Terminate(_) => Decision::Terminate,
        }
    }

    /// Returns `true` if the chain should proceed.
    pub fn is_continue(&self) -> bool {
        matches!(self, Step::Continue(_))
    }

    /// Returns `true` if the chain should stop.
    pub fn is_terminate(&self) -> bool {
        matches!(self, Step::Terminate(_))
    }

    /// Borrow the payload.
    pub fn payload(&self) -> &A {
        match self {
            Step::Continue(payload) | Step::Terminate(payload) => payload,
        }
    }

    /// Consume the step, returning the payload.
    pub fn into_payload(self) -> A {
        match self {
            Step::Continue(payload) | Step::Terminate(payload) => payload,
        }
    }

    /// Transform the payload, keeping the tag.
    pub fn map<B, F>(self, f: F) -> Step<B>
    where
        F: FnOnce(A) -> B,
    {
        match self {
            Step::Continue(payload) => Step::Continue(f(payload)),
            Step::Terminate(payload) => Step::Terminate(f(payload)),
        }
    }
}
