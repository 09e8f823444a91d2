use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio_util::sync::CancellationToken;

use super::config::SqliteOptions;
use super::query::{build_result_set, check_cancelled, execute_dml};
use super::transaction::SqliteTx;
use crate::error::SqlMapperDbError;
use crate::results::ResultSetCursor;
use crate::session::{Connection, RowCursor, Session};
use crate::types::{IsolationLevel, RowValues, TxOptions};

/// A single `SQLite` connection usable as a [`Session`] and [`Connection`].
///
/// Calls are serialized on an internal lock. An open [`SqliteTx`] holds that lock
/// until it commits or rolls back, so inside a transaction scope issue statements
/// through the transaction handle, not the connection.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Mutex<rusqlite::Connection>,
}

impl SqliteConnection {
    /// Open (and by default create) the database described by `opts`.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError::ConfigError` for invalid options, or the `SQLite`
    /// error if the database cannot be opened or configured.
    pub fn open(opts: &SqliteOptions) -> Result<Self, SqlMapperDbError> {
        opts.validate()?;
        let conn = rusqlite::Connection::open_with_flags(&opts.db_path, opts.open_flags())?;
        conn.busy_timeout(opts.busy_timeout())?;
        if opts.foreign_keys {
            conn.execute_batch("PRAGMA foreign_keys = ON")?;
        }
        tracing::debug!(db_path = %opts.db_path, "opened SQLite connection");
        Ok(Self::from_rusqlite(conn))
    }

    /// Shorthand for a private in-memory database.
    ///
    /// # Errors
    /// Returns the `SQLite` error if the database cannot be opened.
    pub fn open_in_memory() -> Result<Self, SqlMapperDbError> {
        Self::open(&SqliteOptions::in_memory())
    }

    /// Wrap a connection opened elsewhere.
    #[must_use]
    pub fn from_rusqlite(conn: rusqlite::Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    /// A poisoned lock only means a scope panicked; its transaction was already rolled
    /// back during unwinding, so the connection is reusable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, rusqlite::Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute a statement that returns no rows.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if execution fails or `ctx` is cancelled.
    pub fn execute(
        &self,
        ctx: &CancellationToken,
        sql: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlMapperDbError> {
        execute_dml(&self.lock(), ctx, sql, args)
    }

    /// Execute several `;`-separated statements without arguments.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if any statement fails or `ctx` is cancelled.
    pub fn execute_batch(&self, ctx: &CancellationToken, sql: &str) -> Result<(), SqlMapperDbError> {
        check_cancelled(ctx)?;
        self.lock().execute_batch(sql)?;
        Ok(())
    }
}

impl Session for SqliteConnection {
    fn query_context<'s>(
        &'s self,
        ctx: &CancellationToken,
        query: &str,
        args: &[RowValues],
    ) -> Result<Box<dyn RowCursor + 's>, SqlMapperDbError> {
        let result_set = build_result_set(&self.lock(), ctx, query, args)?;
        Ok(Box::new(ResultSetCursor::new(result_set)))
    }
}

impl Connection for SqliteConnection {
    type Tx<'c>
        = SqliteTx<'c>
    where
        Self: 'c;

    fn begin_tx(
        &self,
        ctx: &CancellationToken,
        opts: Option<&TxOptions>,
    ) -> Result<SqliteTx<'_>, SqlMapperDbError> {
        let opts = opts.copied().unwrap_or_default();
        let begin = begin_statement(opts.isolation)?;
        check_cancelled(ctx)?;
        let conn = self.lock();
        conn.execute_batch(begin)?;
        let mut tx = SqliteTx::new(conn);
        if opts.read_only {
            tx.enable_read_only()?;
        }
        Ok(tx)
    }
}

fn begin_statement(isolation: IsolationLevel) -> Result<&'static str, SqlMapperDbError> {
    match isolation {
        IsolationLevel::Default => Ok("BEGIN DEFERRED"),
        IsolationLevel::Serializable => Ok("BEGIN IMMEDIATE"),
        other => Err(SqlMapperDbError::ConfigError(format!(
            "SQLite does not support isolation level {other:?}"
        ))),
    }
}
