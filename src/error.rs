//! Error types for chain execution.

use thiserror::Error;

/// Engine-level failure of a chain.
///
/// Failures produced by individual middleware units are never wrapped in this
/// type; they reach the caller as-is. `ChainError` only reports conditions the
/// executor itself detects, and is lifted into the caller's error type by the
/// `on_exhausted` function given to [`connect`](crate::connect).
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChainError {
    /// Every unit ran and none of them produced [`Step::Terminate`](crate::Step::Terminate).
    ///
    /// An empty chain always fails with this variant.
    #[error("chain was exhausted without any middleware terminating it")]
    NeverTerminated,
}
