//! Capability traits the rest of the crate is written against.
//!
//! Any database client that can hand back a [`RowCursor`] for a query and open a
//! [`Transaction`] is usable by [`crate::query`] and [`crate::execute_in_transaction`];
//! nothing here names a driver.

use tokio_util::sync::CancellationToken;

use crate::error::SqlMapperDbError;
use crate::mapper::ScanTarget;
use crate::types::{RowValues, TxOptions};

/// Tabular result of a query, consumed one row at a time.
///
/// The protocol is: read [`RowCursor::column_names`] once, call [`RowCursor::next_row`]
/// until it returns `false`, scanning each current row with [`RowCursor::scan_into`],
/// then check [`RowCursor::terminal_error`] to tell exhaustion apart from failure.
pub trait RowCursor {
    /// Ordered column names of the result set.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if the cursor cannot describe its columns.
    fn column_names(&mut self) -> Result<Vec<String>, SqlMapperDbError>;

    /// Advance to the next row. `false` once exhausted, closed, or errored.
    fn next_row(&mut self) -> bool;

    /// Scan the current row, one destination per column in column order.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if there is no current row, the destination count does
    /// not match the column count, or a destination rejects its value.
    fn scan_into(&mut self, dest: &mut [&mut dyn ScanTarget]) -> Result<(), SqlMapperDbError>;

    /// Release the cursor. Safe to call more than once.
    fn close(&mut self);

    /// Error that stopped iteration early, if any.
    fn terminal_error(&mut self) -> Option<SqlMapperDbError>;
}

/// Something that can run a query: a connection, or a transaction handle.
pub trait Session {
    /// Execute `query` with positional `args`, observing `ctx` for cancellation.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` for any failure in the database layer, including
    /// cancellation.
    fn query_context<'s>(
        &'s self,
        ctx: &CancellationToken,
        query: &str,
        args: &[RowValues],
    ) -> Result<Box<dyn RowCursor + 's>, SqlMapperDbError>;
}

/// A live transaction. Terminated exactly once by commit or rollback.
pub trait Transaction: Session {
    /// # Errors
    /// Returns `SqlMapperDbError` if the provider refuses the commit; the handle is then
    /// still open and must be rolled back.
    fn commit(&mut self) -> Result<(), SqlMapperDbError>;

    /// Must be a no-op on a handle that already committed or rolled back.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if the provider fails to roll back.
    fn rollback(&mut self) -> Result<(), SqlMapperDbError>;
}

/// A [`Session`] that can also open transactions.
pub trait Connection: Session {
    type Tx<'c>: Transaction
    where
        Self: 'c;

    /// Begin a transaction. `None` leaves every setting at the provider default.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError` if the transaction cannot be started or the options
    /// are not supported.
    fn begin_tx(
        &self,
        ctx: &CancellationToken,
        opts: Option<&TxOptions>,
    ) -> Result<Self::Tx<'_>, SqlMapperDbError>;
}
