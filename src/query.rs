use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::background::{AsyncResult, Background, BackgroundExecutor};
use crate::error::SqlMapperDbError;
use crate::mapper::{Record, parse_db_result};
use crate::session::{RowCursor, Session};
use crate::types::RowValues;

/// Closes the wrapped cursor however the owning scope exits.
struct CloseOnDrop<'s>(Box<dyn RowCursor + 's>);

impl Drop for CloseOnDrop<'_> {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Run `sql` on `session` and map every row onto a `T`.
///
/// Returns an empty `Vec` when no rows match. The cursor is closed before returning on
/// every path, including mapping failures.
///
/// ```rust,no_run
/// use sql_mapper::prelude::*;
///
/// #[derive(Debug, Default)]
/// struct User {
///     id: i64,
///     name: String,
/// }
/// impl_record!(User { id, name });
///
/// # fn run(conn: &SqliteConnection) -> Result<(), SqlMapperDbError> {
/// let ctx = CancellationToken::new();
/// let users: Vec<User> = query(&ctx, conn, "SELECT id, name FROM users WHERE id > ?1", &[RowValues::Int(10)])?;
/// # let _ = users;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
/// Returns the first error from acquiring the cursor, scanning a row, or the cursor's
/// terminal state.
pub fn query<T, S>(
    ctx: &CancellationToken,
    session: &S,
    sql: &str,
    args: &[RowValues],
) -> Result<Vec<T>, SqlMapperDbError>
where
    T: Record,
    S: Session + ?Sized,
{
    tracing::debug!(sql, args = args.len(), "mapped query");
    let mut cursor = CloseOnDrop(session.query_context(ctx, sql, args)?);
    parse_db_result::<T, _>(cursor.0.as_mut())
}

/// [`query`] on a background executor chosen by [`Background::detect`].
///
/// Returns immediately. `ctx` is handed to the session unchanged, so cancelling it
/// aborts the in-flight query the same way it would for [`query`].
pub fn query_async<T, S>(
    ctx: &CancellationToken,
    session: Arc<S>,
    sql: impl Into<String>,
    args: Vec<RowValues>,
) -> AsyncResult<Vec<T>>
where
    T: Record + Send + 'static,
    S: Session + Send + Sync + ?Sized + 'static,
{
    query_async_on(&Background::detect(), ctx, session, sql, args)
}

/// [`query`] on an explicit [`BackgroundExecutor`].
pub fn query_async_on<T, S, X>(
    executor: &X,
    ctx: &CancellationToken,
    session: Arc<S>,
    sql: impl Into<String>,
    args: Vec<RowValues>,
) -> AsyncResult<Vec<T>>
where
    T: Record + Send + 'static,
    S: Session + Send + Sync + ?Sized + 'static,
    X: BackgroundExecutor,
{
    let sql = sql.into();
    executor.schedule(ctx.clone(), move |ctx| {
        query::<T, S>(&ctx, session.as_ref(), &sql, &args)
    })
}
