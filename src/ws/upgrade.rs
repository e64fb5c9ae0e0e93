//! Upgrade-time collaborators of the sync route: the guard deciding whether
//! to upgrade and the producer supplying the value to synchronize.
//!
//! Value producers come in three calling conventions (plain, fallible and
//! async). All of them are adapted into the single [`ValueProducer`]
//! contract: produce a value, possibly failing, possibly asynchronously.

use std::fmt::{self, Display};
use std::future::Future;
use std::marker::PhantomData;

use axum::http::{HeaderMap, Uri};
use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};

use crate::error::SyncError;

/// Request data available to guards and producers.
#[derive(Debug, Clone)]
pub struct UpgradeContext {
    /// Request URI, including the query string.
    pub uri: Uri,
    /// Request headers.
    pub headers: HeaderMap,
}

/// Decides whether a request may be upgraded.
pub trait UpgradeGuard: Send + Sync {
    /// Returns extra response headers to attach to the upgrade response,
    /// or an error rejecting the request.
    fn check(&self, context: &UpgradeContext) -> BoxFuture<'static, Result<HeaderMap, SyncError>>;
}

/// Guard that accepts every request without extra headers.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

impl UpgradeGuard for AllowAll {
    fn check(&self, _context: &UpgradeContext) -> BoxFuture<'static, Result<HeaderMap, SyncError>> {
        future::ready(Ok(HeaderMap::new())).boxed()
    }
}

/// Guard backed by an async closure. See [`guard_fn`].
pub struct FnGuard<F>(F);

impl<F> fmt::Debug for FnGuard<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnGuard").finish_non_exhaustive()
    }
}

/// Builds a guard from `f(context) -> Future<Output = Result<HeaderMap, SyncError>>`.
pub fn guard_fn<F, Fut>(f: F) -> FnGuard<F>
where
    F: Fn(UpgradeContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HeaderMap, SyncError>> + Send + 'static,
{
    FnGuard(f)
}

impl<F, Fut> UpgradeGuard for FnGuard<F>
where
    F: Fn(UpgradeContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<HeaderMap, SyncError>> + Send + 'static,
{
    fn check(&self, context: &UpgradeContext) -> BoxFuture<'static, Result<HeaderMap, SyncError>> {
        (self.0)(context.clone()).boxed()
    }
}

/// Supplies the value synchronized over a freshly upgraded connection.
pub trait ValueProducer<V>: Send + Sync {
    /// Produces the value for the connection described by `context`.
    fn produce(&self, context: &UpgradeContext) -> BoxFuture<'static, Result<V, SyncError>>;
}

/// Producer adapter; construct with [`from_fn`], [`try_from_fn`] or
/// [`from_async`].
pub struct Producer<F, K> {
    f: F,
    kind: K,
}

impl<F, K: fmt::Debug> fmt::Debug for Producer<F, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Producer")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// Marker for infallible synchronous producers.
#[derive(Debug, Clone, Copy)]
pub struct Infallible;

/// Marker for fallible synchronous producers failing with `E`.
pub struct Fallible<E>(PhantomData<fn() -> E>);

impl<E> fmt::Debug for Fallible<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Fallible")
    }
}

/// Marker for async producers.
#[derive(Debug, Clone, Copy)]
pub struct Async;

/// Producer from a plain function that always yields a value.
pub fn from_fn<F, V>(f: F) -> Producer<F, Infallible>
where
    F: Fn(&UpgradeContext) -> V + Send + Sync,
{
    Producer { f, kind: Infallible }
}

/// Producer from a function that may fail. The error's `Display` text
/// becomes [`SyncError::ValueProduction`].
pub fn try_from_fn<F, V, E>(f: F) -> Producer<F, Fallible<E>>
where
    F: Fn(&UpgradeContext) -> Result<V, E> + Send + Sync,
    E: Display,
{
    Producer {
        f,
        kind: Fallible(PhantomData),
    }
}

/// Producer from an async function that may fail.
pub fn from_async<F, Fut, V, E>(f: F) -> Producer<F, Async>
where
    F: Fn(UpgradeContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    E: Display,
{
    Producer { f, kind: Async }
}

impl<V, F> ValueProducer<V> for Producer<F, Infallible>
where
    F: Fn(&UpgradeContext) -> V + Send + Sync,
    V: Send + 'static,
{
    fn produce(&self, context: &UpgradeContext) -> BoxFuture<'static, Result<V, SyncError>> {
        future::ready(Ok((self.f)(context))).boxed()
    }
}

impl<V, E, F> ValueProducer<V> for Producer<F, Fallible<E>>
where
    F: Fn(&UpgradeContext) -> Result<V, E> + Send + Sync,
    V: Send + 'static,
    E: Display,
{
    fn produce(&self, context: &UpgradeContext) -> BoxFuture<'static, Result<V, SyncError>> {
        let result = (self.f)(context).map_err(|e| SyncError::ValueProduction(e.to_string()));
        future::ready(result).boxed()
    }
}

impl<V, E, F, Fut> ValueProducer<V> for Producer<F, Async>
where
    F: Fn(UpgradeContext) -> Fut + Send + Sync,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
    V: Send + 'static,
    E: Display,
{
    fn produce(&self, context: &UpgradeContext) -> BoxFuture<'static, Result<V, SyncError>> {
        (self.f)(context.clone())
            .map(|result| result.map_err(|e| SyncError::ValueProduction(e.to_string())))
            .boxed()
    }
}
