//! # middleware-chain
//!
//! Sequential, short-circuiting chains of async middleware units.
//!
//! Each unit receives the current payload, does some asynchronous work and
//! decides whether the chain goes on with a (possibly new) payload or stops
//! with a final one. The executor runs units strictly in order, stops at the
//! first termination or failure, and reports a dedicated error when every
//! unit ran and none of them terminated the chain.
//!
//! ## Core Concepts
//!
//! - **Step**: The `Continue` / `Terminate` decision returned by a unit
//! - **next / end**: Tag a plain future's output as a `Step`
//! - **Middleware**: The trait every unit implements
//! - **connect**: Run an ordered sequence of units against a payload
//! - **Chain**: Owned, named, reusable chain with metrics
//! - **map_error**: Unify the failure types of heterogeneous units
//! - **ChainError**: Engine-level failure (`NeverTerminated`)
//! - **ExecutionContext**: Shared context for metrics and trace events
//!
//! ## Example: Early Termination
//!
//! ```rust
//! use middleware_chain::{connect, end, next, ChainError, LambdaMiddleware, MiddlewareExt};
//!
//! #[derive(Debug, PartialEq, thiserror::Error)]
//! enum AppError {
//!     #[error("rejected: {0}")]
//!     Rejected(String),
//!     #[error(transparent)]
//!     Chain(#[from] ChainError),
//! }
//!
//! # tokio_test::block_on(async {
//! let trim = LambdaMiddleware::new(|s: String| next(async move {
//!     Ok::<_, AppError>(s.trim().to_string())
//! }));
//! let cached = LambdaMiddleware::new(|s: String| async move {
//!     if s == "ping" {
//!         Ok(middleware_chain::Step::Terminate("pong".to_string()))
//!     } else {
//!         Ok(middleware_chain::Step::Continue(s))
//!     }
//! });
//! let reject = LambdaMiddleware::new(|s: String| end(async move {
//!     Err::<String, _>(AppError::Rejected(s))
//! }));
//!
//! let units = vec![trim.boxed(), cached.boxed(), reject.boxed()];
//! let result = connect(units, "  ping ".to_string(), AppError::from).await;
//! assert_eq!(result, Ok("pong".to_string()));
//! # });
//! ```

pub mod chain;
pub mod context;
pub mod continuation;
pub mod error;
pub mod events;
pub mod metrics;
pub mod middleware;
pub mod step;

pub use chain::{connect, connect_with_ctx, Chain};
pub use context::ExecutionContext;
pub use continuation::{end, next};
pub use error::ChainError;
pub use events::{ChainEvent, TraceEntry};
pub use metrics::ChainMetrics;
pub use step::{Decision, Step};

// Re-export middleware types
pub use middleware::branch::{BranchMiddleware, Passthrough};
pub use middleware::tap::TapMiddleware;
pub use middleware::{map_error, BoxedMiddleware, LambdaMiddleware, MapErr, Middleware, MiddlewareExt};
