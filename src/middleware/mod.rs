//! Core middleware trait and fundamental unit types.
//!
//! This module defines the [`Middleware`] trait, the unit every chain is made
//! of, along with [`LambdaMiddleware`] for closure-based units and
//! [`MiddlewareExt`] for fluent adaptation.

use async_trait::async_trait;
use std::future::Future;
use std::marker::PhantomData;

use crate::{ExecutionContext, Step};

pub mod branch;
pub mod map_err;
pub mod tap;

pub use map_err::{map_error, MapErr};

/// A single unit of a chain.
///
/// A unit receives the current payload and settles with a [`Step`] deciding
/// whether the chain goes on, or with a failure that ends the chain. Units hold
/// no per-chain state; the executor may run the same unit in any number of
/// chains.
///
/// # Example
///
/// ```rust
/// use async_trait::async_trait;
/// use middleware_chain::{ExecutionContext, Middleware, Step};
///
/// struct RejectNegative;
///
/// #[async_trait]
/// impl Middleware for RejectNegative {
///     type Payload = i64;
///     type Error = String;
///
///     async fn run(&self, _ctx: &ExecutionContext, payload: i64) -> Result<Step<i64>, String> {
///         if payload < 0 {
///             return Err(format!("negative payload {payload}"));
///         }
///         Ok(Step::Continue(payload))
///     }
/// }
/// ```
#[async_trait]
pub trait Middleware: Send + Sync {
    /// The payload threaded through the chain.
    type Payload: Send;
    /// The failure value of this unit.
    type Error: Send;

    /// Run this unit against the current payload.
    async fn run(
        &self,
        ctx: &ExecutionContext,
        payload: Self::Payload,
    ) -> Result<Step<Self::Payload>, Self::Error>;

    /// Returns a human-readable name for this unit. Defaults to the type name.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// A type-erased middleware unit, used to put heterogeneous units in one chain.
pub type BoxedMiddleware<A, E> = Box<dyn Middleware<Payload = A, Error = E> + Send + Sync>;

/// A unit constructed from a closure returning a future of a [`Step`].
///
/// # Example
///
/// ```rust
/// use middleware_chain::{next, LambdaMiddleware};
///
/// let double = LambdaMiddleware::new(|x: i32| next(async move { Ok::<_, String>(x * 2) }))
///     .named("double");
/// ```
pub struct LambdaMiddleware<A, E, F> {
    f: F,
    name: Option<String>,
    _phantom: PhantomData<fn(A) -> E>,
}

impl<A, E, F, Fut> LambdaMiddleware<A, E, F>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    A: Send + 'static,
    E: Send + 'static,
    Fut: Future<Output = Result<Step<A>, E>> + Send + 'static,
{
    /// Create a new `LambdaMiddleware` from the given closure.
    pub fn new(f: F) -> Self {
        Self {
            f,
            name: None,
            _phantom: PhantomData,
        }
    }

    /// Give this unit a name for traces and metrics.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

#[async_trait]
impl<A, E, F, Fut> Middleware for LambdaMiddleware<A, E, F>
where
    F: Fn(A) -> Fut + Send + Sync + 'static,
    A: Send + 'static,
    E: Send + 'static,
    Fut: Future<Output = Result<Step<A>, E>> + Send + 'static,
{
    type Payload = A;
    type Error = E;

    async fn run(&self, _ctx: &ExecutionContext, payload: A) -> Result<Step<A>, E> {
        (self.f)(payload).await
    }

    fn name(&self) -> &str {
        self.name
            .as_deref()
            .unwrap_or_else(|| std::any::type_name::<Self>())
    }
}

/// Extension trait providing fluent adaptation methods for all [`Middleware`] implementors.
pub trait MiddlewareExt: Middleware + Sized {
    /// Convert this unit's failure value with `f`.
    ///
    /// See [`map_error`].
    fn map_err<F, Y>(self, f: F) -> MapErr<Self, F>
    where
        F: Fn(Self::Error) -> Y + Send + Sync + 'static,
        Y: Send + 'static,
    {
        MapErr::new(self, f)
    }

    /// Inspect every [`Step`] this unit produces, passing it through unchanged.
    ///
    /// ```rust
    /// use middleware_chain::{end, LambdaMiddleware, MiddlewareExt, Step};
    ///
    /// let unit = LambdaMiddleware::new(|x: i32| end(async move { Ok::<_, String>(x) }))
    ///     .tap(|step: &Step<i32>| println!("decided: {}", step.decision()));
    /// ```
    fn tap<F>(self, f: F) -> tap::TapMiddleware<Self, F>
    where
        F: Fn(&Step<Self::Payload>) + Send + Sync + 'static,
    {
        tap::TapMiddleware::new(self, f)
    }

    /// Erase the concrete unit type, returning a trait object.
    fn boxed(self) -> BoxedMiddleware<Self::Payload, Self::Error>
    where
        Self: 'static,
    {
        Box::new(self)
    }
}

impl<T: Middleware + Sized> MiddlewareExt for T {}

// Boxed units can be used anywhere a unit is expected.
#[async_trait]
impl<M> Middleware for Box<M>
where
    M: Middleware + ?Sized,
{
    type Payload = M::Payload;
    type Error = M::Error;

    async fn run(
        &self,
        ctx: &ExecutionContext,
        payload: M::Payload,
    ) -> Result<Step<M::Payload>, M::Error> {
        (**self).run(ctx, payload).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

// Borrowed units let a stored chain run without giving up its units.
#[async_trait]
impl<'a, M> Middleware for &'a M
where
    M: Middleware + ?Sized,
{
    type Payload = M::Payload;
    type Error = M::Error;

    async fn run(
        &self,
        ctx: &ExecutionContext,
        payload: M::Payload,
    ) -> Result<Step<M::Payload>, M::Error> {
        (**self).run(ctx, payload).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
