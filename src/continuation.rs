//! Lifting plain tasks into [`Step`]s.
//!
//! A middleware unit usually does its work in an ordinary future that yields
//! the new payload. [`next`] and [`end`] tag that payload with the decision,
//! leaving the failure channel untouched.

use futures::TryFutureExt;
use std::future::Future;

use crate::Step;

/// Tag a task's success value as [`Step::Continue`].
///
/// # Example
///
/// ```rust
/// use middleware_chain::{next, Step};
///
/// # tokio_test::block_on(async {
/// let step = next(async { Ok::<_, String>(3) }).await;
/// assert_eq!(step, Ok(Step::Continue(3)));
/// # });
/// ```
pub fn next<A, E, Fut>(task: Fut) -> impl Future<Output = Result<Step<A>, E>>
where
    Fut: Future<Output = Result<A, E>>,
{
    task.map_ok(Step::Continue)
}

/// Tag a task's success value as [`Step::Terminate`].
///
/// # Example
///
/// ```rust
/// use middleware_chain::{end, Step};
///
/// # tokio_test::block_on(async {
/// let failed = end(async { Err::<i32, _>("boom") }).await;
/// assert_eq!(failed, Err("boom"));
/// # });
/// ```
pub fn end<A, E, Fut>(task: Fut) -> impl Future<Output = Result<Step<A>, E>>
where
    Fut: Future<Output = Result<A, E>>,
{
    task.map_ok(Step::Terminate)
}
