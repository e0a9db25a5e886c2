//! Conditional units.
//!
//! [`BranchMiddleware`] decides, per payload, which of two units handles the
//! payload. The chosen unit's decision becomes the branch's decision, so a
//! branch can end the chain on one side and continue it on the other.

use async_trait::async_trait;
use std::marker::PhantomData;
use tracing::debug;

use super::Middleware;
use crate::{ChainEvent, ExecutionContext, Step};

/// A unit that routes the payload to `left` when the predicate holds and to
/// `right` otherwise, recording the route as a [`ChainEvent::BranchTaken`].
///
/// # Example
///
/// ```rust
/// use middleware_chain::{connect, end, next, BranchMiddleware, LambdaMiddleware, MiddlewareExt};
///
/// # tokio_test::block_on(async {
/// let clamp = BranchMiddleware::new(
///     |x: &i32| *x > 100,
///     LambdaMiddleware::new(|_x: i32| end(async move { Ok(100) })).named("clamp"),
///     LambdaMiddleware::new(|x: i32| next(async move { Ok(x) })).named("pass"),
/// );
/// let double = LambdaMiddleware::new(|x: i32| end(async move { Ok(x * 2) }));
///
/// let units = vec![clamp.boxed(), double.boxed()];
/// assert_eq!(connect(units, 250, std::convert::identity).await, Ok(100));
/// # });
/// ```
pub struct BranchMiddleware<P, L, R> {
    name: String,
    predicate: P,
    left: L,
    right: R,
}

impl<P, L, R> BranchMiddleware<P, L, R> {
    /// Create a new branch unit.
    ///
    /// - `predicate`: Chooses the side (borrow of the payload).
    /// - `left`: Handles the payload when the predicate is `true`.
    /// - `right`: Handles the payload when the predicate is `false`.
    pub fn new(predicate: P, left: L, right: R) -> Self {
        Self {
            name: "branch".to_string(),
            predicate,
            left,
            right,
        }
    }

    /// Give this branch a name for traces and metrics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl<P, L, A, E> BranchMiddleware<P, L, Passthrough<A, E>> {
    /// Run `unit` only when the predicate holds; otherwise continue the chain
    /// with the payload untouched.
    pub fn when(predicate: P, unit: L) -> Self {
        Self::new(predicate, unit, Passthrough::new())
    }
}

#[async_trait]
impl<P, L, R, A, E> Middleware for BranchMiddleware<P, L, R>
where
    P: Fn(&A) -> bool + Send + Sync + 'static,
    L: Middleware<Payload = A, Error = E>,
    R: Middleware<Payload = A, Error = E>,
    A: Send + 'static,
    E: Send + 'static,
{
    type Payload = A;
    type Error = E;

    async fn run(&self, ctx: &ExecutionContext, payload: A) -> Result<Step<A>, E> {
        let taken: &dyn Middleware<Payload = A, Error = E> = if (self.predicate)(&payload) {
            &self.left
        } else {
            &self.right
        };

        debug!(branch = %self.name, taken = taken.name(), "branch selected");
        if ctx.is_recording() {
            ctx.emit(ChainEvent::BranchTaken {
                unit_name: self.name.clone(),
                taken: taken.name().to_string(),
            });
        }

        taken.run(ctx, payload).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// A unit that always continues with the payload it was given.
pub struct Passthrough<A, E> {
    _phantom: PhantomData<fn(A) -> E>,
}

impl<A, E> Passthrough<A, E> {
    /// Create a passthrough unit.
    pub fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<A, E> Default for Passthrough<A, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<A, E> Middleware for Passthrough<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    type Payload = A;
    type Error = E;

    async fn run(&self, _ctx: &ExecutionContext, payload: A) -> Result<Step<A>, E> {
        Ok(Step::Continue(payload))
    }

    fn name(&self) -> &str {
        "passthrough"
    }
}
