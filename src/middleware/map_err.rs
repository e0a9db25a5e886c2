//! Failure-type adaptation for middleware units.
//!
//! A chain requires every unit to fail with the same type. Units written
//! against their own error types are brought into line with [`map_error`]
//! (or [`MiddlewareExt::map_err`](super::MiddlewareExt::map_err)) before they
//! are placed in the chain.

use async_trait::async_trait;

use super::Middleware;
use crate::{ExecutionContext, Step};

/// A unit whose failure value is converted by a function.
///
/// Continue/terminate behaviour is identical to the wrapped unit, and the
/// function is only called when the wrapped unit fails.
pub struct MapErr<M, F> {
    unit: M,
    f: F,
}

impl<M, F> MapErr<M, F> {
    /// Create a new error-mapping unit.
    pub fn new(unit: M, f: F) -> Self {
        Self { unit, f }
    }
}

/// Wrap `unit` so that its failures are converted by `f`.
///
/// # Example
///
/// ```rust
/// use middleware_chain::{map_error, next, ExecutionContext, LambdaMiddleware, Middleware};
///
/// # tokio_test::block_on(async {
/// let parse = LambdaMiddleware::new(|raw: String| {
///     next(async move { raw.trim().parse::<u32>().map(|n| n.to_string()) })
/// });
/// let unit = map_error(|e: std::num::ParseIntError| e.to_string(), parse);
///
/// let ctx = ExecutionContext::new();
/// let err = unit.run(&ctx, "abc".to_string()).await.unwrap_err();
/// assert_eq!(err, "invalid digit found in string");
/// # });
/// ```
pub fn map_error<M, F, Y>(f: F, unit: M) -> MapErr<M, F>
where
    M: Middleware,
    F: Fn(M::Error) -> Y + Send + Sync + 'static,
    Y: Send + 'static,
{
    MapErr::new(unit, f)
}

#[async_trait]
impl<M, F, Y> Middleware for MapErr<M, F>
where
    M: Middleware,
    F: Fn(M::Error) -> Y + Send + Sync + 'static,
    Y: Send + 'static,
{
    type Payload = M::Payload;
    type Error = Y;

    async fn run(
        &self,
        ctx: &ExecutionContext,
        payload: M::Payload,
    ) -> Result<Step<M::Payload>, Y> {
        self.unit.run(ctx, payload).await.map_err(&self.f)
    }

    fn name(&self) -> &str {
        self.unit.name()
    }
}
