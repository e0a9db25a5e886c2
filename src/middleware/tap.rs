//! Tap adapter for side-effect inspection.

use async_trait::async_trait;

use super::Middleware;
use crate::{ExecutionContext, Step};

/// A unit that runs a side-effect closure on every [`Step`] the inner unit
/// produces, without modifying it. Failures are not observed.
///
/// Constructed via [`MiddlewareExt::tap`](super::MiddlewareExt::tap).
pub struct TapMiddleware<M, F> {
    unit: M,
    f: F,
}

impl<M, F> TapMiddleware<M, F> {
    /// Create a new tap unit.
    pub fn new(unit: M, f: F) -> Self {
        Self { unit, f }
    }
}

#[async_trait]
impl<M, F> Middleware for TapMiddleware<M, F>
where
    M: Middleware,
    F: Fn(&Step<M::Payload>) + Send + Sync + 'static,
{
    type Payload = M::Payload;
    type Error = M::Error;

    async fn run(
        &self,
        ctx: &ExecutionContext,
        payload: M::Payload,
    ) -> Result<Step<M::Payload>, M::Error> {
        let step = self.unit.run(ctx, payload).await?;
        (self.f)(&step);
        Ok(step)
    }

    fn name(&self) -> &str {
        self.unit.name()
    }
}
