use std::sync::MutexGuard;

use tokio_util::sync::CancellationToken;

use super::query::{build_result_set, execute_dml};
use crate::error::SqlMapperDbError;
use crate::results::ResultSetCursor;
use crate::session::{RowCursor, Session, Transaction};
use crate::types::RowValues;

/// Transaction handle that holds the `SQLite` connection lock until completion.
pub struct SqliteTx<'c> {
    conn: MutexGuard<'c, rusqlite::Connection>,
    read_only: bool,
    finished: bool,
}

impl<'c> SqliteTx<'c> {
    pub(crate) fn new(conn: MutexGuard<'c, rusqlite::Connection>) -> Self {
        Self {
            conn,
            read_only: false,
            finished: false,
        }
    }

    pub(crate) fn enable_read_only(&mut self) -> Result<(), SqlMapperDbError> {
        self.conn.execute_batch("PRAGMA query_only = ON")?;
        self.read_only = true;
        Ok(())
    }

    fn ensure_open(&self) -> Result<(), SqlMapperDbError> {
        if self.finished {
            return Err(SqlMapperDbError::ExecutionError(
                "SQLite transaction already completed".into(),
            ));
        }
        Ok(())
    }

    /// `query_only` is connection-wide, so it is cleared however the transaction ends.
    fn clear_read_only(&mut self) {
        if self.read_only {
            self.read_only = false;
            if let Err(err) = self.conn.execute_batch("PRAGMA query_only = OFF") {
                tracing::warn!(error = %err, "failed to clear query_only after transaction");
            }
        }
    }

    /// Run `sql` to abandon the transaction. A failed statement leaves the handle open so
    /// a later rollback (or drop) can retry.
    fn rollback_with(&mut self, sql: &str) -> Result<(), SqlMapperDbError> {
        if self.finished {
            return Ok(());
        }
        // SQLite ends the transaction itself after some errors; nothing left to undo.
        let outcome = if self.conn.is_autocommit() {
            Ok(())
        } else {
            self.conn.execute_batch(sql)
        };
        self.clear_read_only();
        outcome?;
        self.finished = true;
        Ok(())
    }

    /// Execute a statement that returns no rows inside the transaction.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if the transaction has completed, execution fails, or
    /// `ctx` is cancelled.
    pub fn execute(
        &self,
        ctx: &CancellationToken,
        sql: &str,
        args: &[RowValues],
    ) -> Result<usize, SqlMapperDbError> {
        self.ensure_open()?;
        execute_dml(&self.conn, ctx, sql, args)
    }

    /// True once the transaction committed or rolled back.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl Session for SqliteTx<'_> {
    fn query_context<'s>(
        &'s self,
        ctx: &CancellationToken,
        query: &str,
        args: &[RowValues],
    ) -> Result<Box<dyn RowCursor + 's>, SqlMapperDbError> {
        self.ensure_open()?;
        let result_set = build_result_set(&self.conn, ctx, query, args)?;
        Ok(Box::new(ResultSetCursor::new(result_set)))
    }
}

impl Transaction for SqliteTx<'_> {
    fn commit(&mut self) -> Result<(), SqlMapperDbError> {
        self.ensure_open()?;
        self.conn.execute_batch("COMMIT")?;
        self.clear_read_only();
        self.finished = true;
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), SqlMapperDbError> {
        self.rollback_with("ROLLBACK")
    }
}

impl Drop for SqliteTx<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.rollback();
        }
    }
}
