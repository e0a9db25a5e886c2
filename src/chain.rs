//! Sequential chain execution.
//!
//! [`connect`] runs an ordered sequence of units against a payload, handing
//! each unit's payload to the next until one of them terminates the chain.
//! [`Chain`] is the owned, reusable form of the same thing.

use std::time::Instant;
use tracing::{debug, warn};

use crate::middleware::{BoxedMiddleware, Middleware};
use crate::{ChainError, ChainEvent, ChainMetrics, ExecutionContext, Step};

const ANONYMOUS_CHAIN: &str = "chain";

/// Run `units` in order, starting from `payload`.
///
/// The returned future settles with the payload of the first
/// [`Step::Terminate`], with the first unit failure, or with
/// `on_exhausted(ChainError::NeverTerminated)` when the units run out
/// (immediately, for an empty sequence). Units after the terminating or
/// failing one are never invoked.
///
/// # Example
///
/// ```rust
/// use middleware_chain::{connect, end, next, LambdaMiddleware, MiddlewareExt};
///
/// # tokio_test::block_on(async {
/// let units = vec![
///     LambdaMiddleware::new(|p: i32| next(async move { Ok(p) })).boxed(),
///     LambdaMiddleware::new(|p: i32| end(async move { Ok(p * p) })).boxed(),
/// ];
///
/// let result = connect(units, 2, std::convert::identity).await;
/// assert_eq!(result, Ok(4));
/// # });
/// ```
pub async fn connect<I, A, E, F>(units: I, payload: A, on_exhausted: F) -> Result<A, E>
where
    I: IntoIterator,
    I::Item: Middleware<Payload = A, Error = E>,
    F: FnOnce(ChainError) -> E,
{
    let ctx = ExecutionContext::detached();
    dispatch(&ctx, ANONYMOUS_CHAIN, units, payload, on_exhausted).await
}

/// Like [`connect`], recording metrics and events into `ctx`.
///
/// The run's outcome replaces the previous run's `terminated_at` and
/// `exhausted` metrics; counters keep accumulating.
pub async fn connect_with_ctx<I, A, E, F>(
    ctx: &ExecutionContext,
    units: I,
    payload: A,
    on_exhausted: F,
) -> Result<A, E>
where
    I: IntoIterator,
    I::Item: Middleware<Payload = A, Error = E>,
    F: FnOnce(ChainError) -> E,
{
    dispatch(ctx, ANONYMOUS_CHAIN, units, payload, on_exhausted).await
}

async fn dispatch<I, A, E, F>(
    ctx: &ExecutionContext,
    chain: &str,
    units: I,
    mut payload: A,
    on_exhausted: F,
) -> Result<A, E>
where
    I: IntoIterator,
    I::Item: Middleware<Payload = A, Error = E>,
    F: FnOnce(ChainError) -> E,
{
    let recording = ctx.is_recording();
    let mut invoked = 0;
    ctx.record_run();

    for (index, unit) in units.into_iter().enumerate() {
        let unit_name = unit.name();
        debug!(chain, index, unit = unit_name, "invoking middleware");

        invoked += 1;
        ctx.record_invocation();
        if recording {
            ctx.emit(ChainEvent::UnitStart {
                chain: chain.to_string(),
                index,
                unit_name: unit_name.to_string(),
            });
        }

        let start = Instant::now();
        let step = match unit.run(ctx, payload).await {
            Ok(step) => step,
            Err(err) => {
                debug!(chain, index, unit = unit_name, "middleware failed");
                if recording {
                    ctx.record_failure(unit_name);
                    ctx.emit(ChainEvent::UnitFailed {
                        chain: chain.to_string(),
                        index,
                        unit_name: unit_name.to_string(),
                    });
                }
                return Err(err);
            }
        };

        if recording {
            ctx.emit(ChainEvent::UnitEnd {
                chain: chain.to_string(),
                index,
                unit_name: unit_name.to_string(),
                decision: step.decision(),
                duration_ms: start.elapsed().as_millis(),
            });
        }

        match step {
            Step::Continue(advanced) => payload = advanced,
            Step::Terminate(last) => {
                debug!(chain, index, "chain terminated");
                ctx.record_termination(index);
                return Ok(last);
            }
        }
    }

    warn!(chain, units_invoked = invoked, "chain exhausted without terminating");
    ctx.record_exhaustion();
    if recording {
        ctx.emit(ChainEvent::Exhausted {
            chain: chain.to_string(),
            units_invoked: invoked,
        });
    }
    Err(on_exhausted(ChainError::NeverTerminated))
}

/// An owned, reusable chain of units sharing payload type `A` and failure type `E`.
///
/// `Chain` stores its units and the function that lifts
/// [`ChainError`] into `E`, and can be run any number of times.
///
/// # Example
///
/// ```rust
/// use middleware_chain::{end, next, Chain, ChainError, LambdaMiddleware};
///
/// # tokio_test::block_on(async {
/// let chain = Chain::<i32, ChainError>::default()
///     .with_name("square")
///     .then(LambdaMiddleware::new(|p: i32| next(async move { Ok(p) })))
///     .then(LambdaMiddleware::new(|p: i32| end(async move { Ok(p * p) })));
///
/// let (result, metrics) = chain.run(2).await.unwrap();
/// assert_eq!(result, 4);
/// assert_eq!(metrics.units_invoked, 2);
/// assert_eq!(metrics.terminated_at, Some(1));
/// # });
/// ```
pub struct Chain<A, E> {
    name: String,
    units: Vec<BoxedMiddleware<A, E>>,
    on_exhausted: Box<dyn Fn(ChainError) -> E + Send + Sync>,
}

impl<A, E> Chain<A, E>
where
    A: Send + 'static,
    E: Send + 'static,
{
    /// Create an empty chain whose exhaustion error is produced by `on_exhausted`.
    pub fn new<F>(on_exhausted: F) -> Self
    where
        F: Fn(ChainError) -> E + Send + Sync + 'static,
    {
        Self {
            name: ANONYMOUS_CHAIN.to_string(),
            units: Vec::new(),
            on_exhausted: Box::new(on_exhausted),
        }
    }

    /// Set a human-readable name for this chain.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append a unit to the end of the chain.
    pub fn then<M>(mut self, unit: M) -> Self
    where
        M: Middleware<Payload = A, Error = E> + 'static,
    {
        self.units.push(Box::new(unit));
        self
    }

    /// Returns the name of this chain.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of units in the chain.
    pub fn len(&self) -> usize {
        self.units.len()
    }

    /// Returns `true` if the chain has no units. Running it always fails.
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Run the chain, returning the final payload along with the collected metrics.
    ///
    /// A fresh [`ExecutionContext`] is created for each invocation.
    pub async fn run(&self, payload: A) -> Result<(A, ChainMetrics), E> {
        let ctx = ExecutionContext::new();
        let result = self.run_with_ctx(&ctx, payload).await?;
        Ok((result, ctx.snapshot()))
    }

    /// Run the chain with a caller-provided execution context.
    ///
    /// Metrics and events are recorded into `ctx` whether or not the chain
    /// succeeds.
    pub async fn run_with_ctx(&self, ctx: &ExecutionContext, payload: A) -> Result<A, E> {
        dispatch(ctx, &self.name, &self.units, payload, |err| {
            (self.on_exhausted)(err)
        })
        .await
    }
}

impl<A, E> Default for Chain<A, E>
where
    A: Send + 'static,
    E: From<ChainError> + Send + 'static,
{
    fn default() -> Self {
        Self::new(E::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{end, next, LambdaMiddleware, MiddlewareExt};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, PartialEq, thiserror::Error)]
    enum TestError {
        #[error("unit {0} failed")]
        Unit(usize),
        #[error(transparent)]
        Chain(#[from] ChainError),
    }

    type Log = Arc<Mutex<Vec<usize>>>;

    fn recording(
        log: &Log,
        id: usize,
        decide: fn(usize, i32) -> Result<Step<i32>, TestError>,
    ) -> BoxedMiddleware<i32, TestError> {
        let log = Arc::clone(log);
        LambdaMiddleware::new(move |p: i32| {
            log.lock().unwrap().push(id);
            async move { decide(id, p) }
        })
        .boxed()
    }

    fn cont(_: usize, p: i32) -> Result<Step<i32>, TestError> {
        Ok(Step::Continue(p + 1))
    }

    fn term(_: usize, p: i32) -> Result<Step<i32>, TestError> {
        Ok(Step::Terminate(p * 10))
    }

    fn fail(id: usize, _: i32) -> Result<Step<i32>, TestError> {
        Err(TestError::Unit(id))
    }

    #[tokio::test]
    async fn test_terminate_stops_chain() {
        let log = Log::default();
        let units = vec![
            recording(&log, 0, cont),
            recording(&log, 1, cont),
            recording(&log, 2, term),
            recording(&log, 3, cont),
            recording(&log, 4, term),
        ];

        let result = connect(units, 1, TestError::from).await;

        assert_eq!(result, Ok(30));
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_first_failure_wins() {
        let log = Log::default();
        let units = vec![
            recording(&log, 0, cont),
            recording(&log, 1, fail),
            recording(&log, 2, fail),
            recording(&log, 3, term),
        ];

        let result = connect(units, 0, TestError::from).await;

        assert_eq!(result, Err(TestError::Unit(1)));
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
    }

    #[tokio::test]
    async fn test_empty_chain_never_terminates() {
        let units: Vec<BoxedMiddleware<i32, TestError>> = Vec::new();
        let result = connect(units, 42, TestError::from).await;
        assert_eq!(result, Err(TestError::Chain(ChainError::NeverTerminated)));
    }

    #[tokio::test]
    async fn test_all_continue_runs_every_unit_once() {
        let log = Log::default();
        let units = vec![
            recording(&log, 0, cont),
            recording(&log, 1, cont),
            recording(&log, 2, cont),
        ];

        let result = connect(units, 0, TestError::from).await;

        assert_eq!(result, Err(TestError::Chain(ChainError::NeverTerminated)));
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2]);
    }

    #[tokio::test]
    async fn test_square_scenario() {
        let calls = Arc::new(AtomicUsize::new(0));
        let (first, second) = (Arc::clone(&calls), Arc::clone(&calls));
        let units = vec![
            LambdaMiddleware::new(move |p: i32| {
                first.fetch_add(1, Ordering::SeqCst);
                next(async move { Ok(p) })
            })
            .boxed(),
            LambdaMiddleware::new(move |p: i32| {
                second.fetch_add(1, Ordering::SeqCst);
                end(async move { Ok(p * p) })
            })
            .boxed(),
        ];

        let result = connect(units, 2, std::convert::identity).await;

        assert_eq!(result, Ok(4));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_single_continue_scenario() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let unit = LambdaMiddleware::new(move |p: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            next(async move { Ok(p) })
        });

        let result = connect([unit], 5, std::convert::identity).await;

        assert_eq!(result, Err(ChainError::NeverTerminated));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_units_never_overlap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let log = Log::default();

        let units = (0..4usize)
            .map(|id| {
                let in_flight = Arc::clone(&in_flight);
                let log = Arc::clone(&log);
                LambdaMiddleware::new(move |p: i32| {
                    let in_flight = Arc::clone(&in_flight);
                    let log = Arc::clone(&log);
                    async move {
                        assert_eq!(in_flight.fetch_add(1, Ordering::SeqCst), 0);
                        // Later units sleep less, so overlap would reorder the log.
                        tokio::time::sleep(Duration::from_millis(20 - 5 * id as u64)).await;
                        log.lock().unwrap().push(id);
                        in_flight.fetch_sub(1, Ordering::SeqCst);
                        if id == 3 {
                            Ok::<_, ChainError>(Step::Terminate(p))
                        } else {
                            Ok(Step::Continue(p + 1))
                        }
                    }
                })
            })
            .collect::<Vec<_>>();

        let result = connect(units, 0, std::convert::identity).await;

        assert_eq!(result, Ok(3));
        assert_eq!(*log.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[tokio::test]
    async fn test_long_chain_does_not_recurse() {
        let units = (0..10_000)
            .map(|_| LambdaMiddleware::new(|p: u64| next(async move { Ok(p + 1) })).boxed())
            .chain(std::iter::once(
                LambdaMiddleware::new(|p: u64| end(async move { Ok(p) })).boxed(),
            ));

        let result = connect(units, 0, std::convert::identity).await;
        assert_eq!(result, Ok(10_000));
    }

    #[tokio::test]
    async fn test_dropping_chain_stops_later_units() {
        let started = Arc::new(AtomicUsize::new(0));
        let (slow, after) = (Arc::clone(&started), Arc::clone(&started));
        let units = vec![
            LambdaMiddleware::new(move |p: i32| {
                slow.fetch_add(1, Ordering::SeqCst);
                async move {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok::<_, ChainError>(Step::Continue(p))
                }
            })
            .boxed(),
            LambdaMiddleware::new(move |p: i32| {
                after.fetch_add(1, Ordering::SeqCst);
                end(async move { Ok(p) })
            })
            .boxed(),
        ];

        let chain = connect(units, 1, std::convert::identity);
        let timed_out = tokio::time::timeout(Duration::from_millis(10), chain).await;
        assert!(timed_out.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(started.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_heterogeneous_errors_unified() {
        #[derive(Debug, PartialEq)]
        struct ParseFailure;

        let parse = LambdaMiddleware::new(|raw: String| {
            next(async move {
                raw.parse::<i32>()
                    .map(|n| n.to_string())
                    .map_err(|_| ParseFailure)
            })
        })
        .map_err(|_: ParseFailure| TestError::Unit(0));
        let check = LambdaMiddleware::new(|raw: String| {
            end(async move {
                if raw.starts_with('-') {
                    Err("negative")
                } else {
                    Ok(raw)
                }
            })
        })
        .map_err(|_: &str| TestError::Unit(1));

        let chain = Chain::<String, TestError>::default()
            .then(parse)
            .then(check);

        assert_eq!(chain.run("12".to_string()).await.unwrap().0, "12");
        assert_eq!(chain.run("x".to_string()).await.unwrap_err(), TestError::Unit(0));
        assert_eq!(chain.run("-3".to_string()).await.unwrap_err(), TestError::Unit(1));
    }

    #[tokio::test]
    async fn test_chain_records_events() {
        let chain = Chain::new(|_| TestError::Unit(99))
            .with_name("guard")
            .then(LambdaMiddleware::new(|p: i32| next(async move { Ok(p) })).named("first"))
            .then(LambdaMiddleware::new(|p: i32| next(async move { Ok(p) })).named("second"));

        let ctx = ExecutionContext::new();
        let result = chain.run_with_ctx(&ctx, 1).await;
        assert_eq!(result, Err(TestError::Unit(99)));

        let metrics = ctx.snapshot();
        assert_eq!(metrics.units_invoked, 2);
        assert!(metrics.exhausted);
        assert_eq!(metrics.terminated_at, None);

        let events: Vec<ChainEvent> = ctx.trace_snapshot().into_iter().map(|t| t.event).collect();
        assert_eq!(events.len(), 5);
        assert!(matches!(
            &events[0],
            ChainEvent::UnitStart { chain, index: 0, unit_name } if chain == "guard" && unit_name == "first"
        ));
        assert!(matches!(
            &events[3],
            ChainEvent::UnitEnd { index: 1, decision: crate::Decision::Continue, .. }
        ));
        assert_eq!(
            events[4],
            ChainEvent::Exhausted {
                chain: "guard".to_string(),
                units_invoked: 2,
            }
        );
    }

    #[tokio::test]
    async fn test_failure_recorded_in_metrics() {
        let log = Log::default();
        let ctx = ExecutionContext::new();
        let units = vec![recording(&log, 0, fail)];

        let result = connect_with_ctx(&ctx, units, 0, TestError::from).await;

        assert_eq!(result, Err(TestError::Unit(0)));
        assert!(ctx.snapshot().has_failures());
        assert!(!ctx.snapshot().exhausted);
    }

    #[tokio::test]
    async fn test_chain_is_reusable_and_nests() {
        let inner = Arc::new(
            Chain::<i32, TestError>::default()
                .then(LambdaMiddleware::new(|p: i32| next(async move { Ok(p + 1) })))
                .then(LambdaMiddleware::new(|p: i32| end(async move { Ok(p * 2) }))),
        );
        assert_eq!(inner.len(), 2);

        let nested = Arc::clone(&inner);
        let outer = Chain::<i32, TestError>::default()
            .then(LambdaMiddleware::new(move |p: i32| {
                let inner = Arc::clone(&nested);
                next(async move { inner.run(p).await.map(|(out, _)| out) })
            }))
            .then(LambdaMiddleware::new(|p: i32| end(async move { Ok(p - 1) })));

        assert_eq!(outer.run(1).await.unwrap().0, 3);
        assert_eq!(outer.run(2).await.unwrap().0, 5);
        assert_eq!(inner.run(0).await.unwrap().0, 2);
    }

    #[tokio::test]
    async fn test_shared_context_reports_latest_outcome() {
        let terminating = Chain::<i32, ChainError>::default()
            .then(LambdaMiddleware::new(|p: i32| end(async move { Ok(p) })));
        let exhausting = Chain::<i32, ChainError>::default()
            .then(LambdaMiddleware::new(|p: i32| next(async move { Ok(p) })));
        let ctx = ExecutionContext::new();

        assert_eq!(terminating.run_with_ctx(&ctx, 1).await, Ok(1));
        assert_eq!(ctx.snapshot().terminated_at, Some(0));

        let result = exhausting.run_with_ctx(&ctx, 1).await;
        assert_eq!(result, Err(ChainError::NeverTerminated));

        let metrics = ctx.snapshot();
        assert_eq!(metrics.runs, 2);
        assert_eq!(metrics.units_invoked, 2);
        assert_eq!(metrics.terminated_at, None);
        assert!(metrics.exhausted);

        assert_eq!(terminating.run_with_ctx(&ctx, 1).await, Ok(1));
        let metrics = ctx.snapshot();
        assert_eq!(metrics.terminated_at, Some(0));
        assert!(!metrics.exhausted);
    }

    #[tokio::test]
    async fn test_empty_chain_run_fails_through_mapper() {
        let chain = Chain::<i32, TestError>::new(|err| match err {
            ChainError::NeverTerminated => TestError::Unit(usize::MAX),
        });
        assert!(chain.is_empty());

        let result = chain.run(7).await;
        assert_eq!(result.unwrap_err(), TestError::Unit(usize::MAX));

        let ctx = ExecutionContext::new();
        let result = Chain::<i32, TestError>::default().run_with_ctx(&ctx, 7).await;
        assert_eq!(result, Err(TestError::Chain(ChainError::NeverTerminated)));
        assert_eq!(ctx.snapshot().units_invoked, 0);
        assert!(ctx.snapshot().exhausted);
    }

    #[tokio::test]
    async fn test_detached_context_skips_recording() {
        let log = Log::default();
        let ctx = ExecutionContext::detached();
        let units = vec![recording(&log, 0, cont), recording(&log, 1, term)];

        let result = connect_with_ctx(&ctx, units, 1, TestError::from).await;

        assert_eq!(result, Ok(20));
        assert_eq!(*log.lock().unwrap(), vec![0, 1]);
        assert_eq!(ctx.snapshot(), ChainMetrics::default());
        assert!(ctx.trace_snapshot().is_empty());
    }
}
