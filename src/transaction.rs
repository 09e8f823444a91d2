//! Commit-or-rollback transaction scopes.
//!
//! A scope function receives the open transaction handle. If it returns `Ok`, the
//! transaction is committed and the value handed back; if it returns `Err`, panics, or
//! the commit itself fails, the transaction is rolled back before control returns.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::background::{AsyncResult, Background, BackgroundExecutor};
use crate::error::SqlMapperDbError;
use crate::session::{Connection, Transaction};
use crate::types::TxOptions;

/// Owns an open transaction and rolls it back on drop unless it committed.
struct RollbackGuard<X: Transaction> {
    tx: X,
    armed: bool,
}

impl<X: Transaction> RollbackGuard<X> {
    fn arm(tx: X) -> Self {
        Self { tx, armed: true }
    }

    /// A failed commit leaves the guard armed so the handle still gets rolled back.
    fn commit(&mut self) -> Result<(), SqlMapperDbError> {
        self.tx.commit()?;
        self.armed = false;
        tracing::debug!("transaction committed");
        Ok(())
    }
}

impl<X: Transaction> Drop for RollbackGuard<X> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        match self.tx.rollback() {
            Ok(()) => tracing::debug!(panicking = std::thread::panicking(), "transaction rolled back"),
            Err(err) => tracing::warn!(error = %err, "transaction rollback failed"),
        }
    }
}

/// Run `scope` inside a transaction on `conn`.
///
/// `opts` of `None` leaves isolation and read-only mode at the provider's defaults.
/// Exactly one of these happens:
///
/// * `begin` fails: its error is returned, there is nothing to clean up.
/// * `scope` returns `Err`: the transaction is rolled back, the scope's error returned.
/// * `scope` panics: the transaction is rolled back while unwinding.
/// * commit fails: the commit error is returned and the transaction rolled back.
/// * commit succeeds: the scope's value is returned.
///
/// ```rust,no_run
/// use sql_mapper::prelude::*;
///
/// # fn run(conn: &SqliteConnection) -> Result<(), SqlMapperDbError> {
/// let ctx = CancellationToken::new();
/// let moved = execute_in_transaction(&ctx, conn, |ctx, tx: &mut SqliteTx<'_>| {
///     tx.execute(ctx, "UPDATE accounts SET balance = balance - 10 WHERE id = ?1", &[RowValues::Int(1)])?;
///     tx.execute(ctx, "UPDATE accounts SET balance = balance + 10 WHERE id = ?1", &[RowValues::Int(2)])
/// }, None)?;
/// # let _ = moved;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns the begin error, the scope's error, or the commit error, converted into `E`.
pub fn execute_in_transaction<'c, C, T, E, F>(
    ctx: &CancellationToken,
    conn: &'c C,
    scope: F,
    opts: Option<&TxOptions>,
) -> Result<T, E>
where
    C: Connection,
    E: From<SqlMapperDbError>,
    F: FnOnce(&CancellationToken, &mut C::Tx<'c>) -> Result<T, E>,
{
    let tx = conn.begin_tx(ctx, opts)?;
    tracing::debug!(?opts, "transaction started");
    let mut guard = RollbackGuard::arm(tx);
    let value = scope(ctx, &mut guard.tx)?;
    guard.commit()?;
    Ok(value)
}

/// [`execute_in_transaction`] on a background executor chosen by [`Background::detect`].
///
/// A panicking scope still rolls back; the result then resolves with
/// `SqlMapperDbError::BackgroundTaskFailed` converted into `E`.
pub fn execute_in_transaction_async<C, T, E, F>(
    ctx: &CancellationToken,
    conn: Arc<C>,
    scope: F,
    opts: Option<TxOptions>,
) -> AsyncResult<T, E>
where
    C: Connection + Send + Sync + 'static,
    T: Send + 'static,
    E: From<SqlMapperDbError> + Send + 'static,
    F: for<'c> FnOnce(&CancellationToken, &mut C::Tx<'c>) -> Result<T, E> + Send + 'static,
{
    execute_in_transaction_async_on(&Background::detect(), ctx, conn, scope, opts)
}

/// [`execute_in_transaction`] on an explicit [`BackgroundExecutor`].
pub fn execute_in_transaction_async_on<C, T, E, F, X>(
    executor: &X,
    ctx: &CancellationToken,
    conn: Arc<C>,
    scope: F,
    opts: Option<TxOptions>,
) -> AsyncResult<T, E>
where
    C: Connection + Send + Sync + 'static,
    T: Send + 'static,
    E: From<SqlMapperDbError> + Send + 'static,
    F: for<'c> FnOnce(&CancellationToken, &mut C::Tx<'c>) -> Result<T, E> + Send + 'static,
    X: BackgroundExecutor,
{
    executor.schedule(ctx.clone(), move |ctx| {
        execute_in_transaction(&ctx, conn.as_ref(), scope, opts.as_ref())
    })
}
