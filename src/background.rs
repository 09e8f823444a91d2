//! Fire-and-await execution of blocking database work.
//!
//! The query and transaction entry points are synchronous; their `_async` variants hand
//! the same closure to a [`BackgroundExecutor`] and return an [`AsyncResult`] that
//! resolves exactly once.

use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::error::SqlMapperDbError;

/// One-shot result of work running elsewhere.
///
/// Await it from async code, or call [`AsyncResult::wait`] from a plain thread.
#[must_use = "an AsyncResult does nothing unless awaited or waited on"]
#[derive(Debug)]
pub struct AsyncResult<V, E = SqlMapperDbError> {
    rx: oneshot::Receiver<Result<V, E>>,
}

/// Write side of an [`AsyncResult`].
#[derive(Debug)]
pub struct Resolver<V, E = SqlMapperDbError> {
    tx: oneshot::Sender<Result<V, E>>,
}

impl<V, E> Resolver<V, E> {
    /// Deliver the outcome. Dropped silently if nobody is waiting any more.
    pub fn resolve(self, result: Result<V, E>) {
        let _ = self.tx.send(result);
    }
}

impl<V, E> AsyncResult<V, E>
where
    E: From<SqlMapperDbError>,
{
    /// An unresolved result and the resolver that completes it.
    pub fn pending() -> (Resolver<V, E>, Self) {
        let (tx, rx) = oneshot::channel();
        (Resolver { tx }, Self { rx })
    }

    /// A result that is already resolved.
    pub fn ready(result: Result<V, E>) -> Self {
        let (resolver, pending) = Self::pending();
        resolver.resolve(result);
        pending
    }

    /// Block the current thread until the result arrives.
    ///
    /// Must not be called from inside an async context; `.await` the result there.
    ///
    /// # Errors
    /// Returns the work's error, or `BackgroundTaskFailed` if the work never produced an
    /// outcome.
    pub fn wait(self) -> Result<V, E> {
        self.rx.blocking_recv().unwrap_or_else(|_| Err(abandoned()))
    }
}

impl<V, E> Future for AsyncResult<V, E>
where
    E: From<SqlMapperDbError>,
{
    type Output = Result<V, E>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(result)) => Poll::Ready(result),
            Poll::Ready(Err(_)) => Poll::Ready(Err(abandoned())),
            Poll::Pending => Poll::Pending,
        }
    }
}

fn abandoned<E: From<SqlMapperDbError>>() -> E {
    E::from(SqlMapperDbError::BackgroundTaskFailed(
        "work ended without producing a result".into(),
    ))
}

/// Somewhere to run a unit of blocking work off the caller's thread.
pub trait BackgroundExecutor {
    /// Run `work(ctx)` in the background; the returned result resolves exactly once.
    fn schedule<V, E, F>(&self, ctx: CancellationToken, work: F) -> AsyncResult<V, E>
    where
        V: Send + 'static,
        E: From<SqlMapperDbError> + Send + 'static,
        F: FnOnce(CancellationToken) -> Result<V, E> + Send + 'static;
}

/// Built-in executors.
#[derive(Debug, Clone)]
pub enum Background {
    /// Tokio's blocking thread pool on the given runtime.
    Tokio(Handle),
    /// A dedicated OS thread per unit of work.
    Thread,
}

impl Background {
    /// Tokio when called inside a runtime, a plain thread otherwise.
    #[must_use]
    pub fn detect() -> Self {
        match Handle::try_current() {
            Ok(handle) => Background::Tokio(handle),
            Err(_) => Background::Thread,
        }
    }
}

impl Default for Background {
    fn default() -> Self {
        Self::detect()
    }
}

impl BackgroundExecutor for Background {
    fn schedule<V, E, F>(&self, ctx: CancellationToken, work: F) -> AsyncResult<V, E>
    where
        V: Send + 'static,
        E: From<SqlMapperDbError> + Send + 'static,
        F: FnOnce(CancellationToken) -> Result<V, E> + Send + 'static,
    {
        let (resolver, result) = AsyncResult::pending();
        match self {
            Background::Tokio(handle) => {
                let _detached = handle.spawn_blocking(move || run_unit(ctx, work, resolver));
                result
            }
            Background::Thread => {
                let spawned = std::thread::Builder::new()
                    .name("sql-mapper-bg".into())
                    .spawn(move || run_unit(ctx, work, resolver));
                match spawned {
                    Ok(_) => result,
                    Err(e) => AsyncResult::ready(Err(E::from(
                        SqlMapperDbError::BackgroundTaskFailed(format!(
                            "failed to spawn worker thread: {e}"
                        )),
                    ))),
                }
            }
        }
    }
}

/// Run `work`, turning a panic into `BackgroundTaskFailed` so the result still resolves.
fn run_unit<V, E, F>(ctx: CancellationToken, work: F, resolver: Resolver<V, E>)
where
    E: From<SqlMapperDbError>,
    F: FnOnce(CancellationToken) -> Result<V, E>,
{
    let outcome = catch_unwind(AssertUnwindSafe(move || work(ctx))).unwrap_or_else(|payload| {
        let message = panic_message(&*payload);
        tracing::warn!(%message, "background database work panicked");
        Err(E::from(SqlMapperDbError::BackgroundTaskFailed(format!(
            "background work panicked: {message}"
        ))))
    });
    resolver.resolve(outcome);
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}
