//! Convenient imports for common functionality.
//!
//! This module re-exports the most commonly used types and functions
//! to make it easier to get started with the library.

pub use crate::background::{AsyncResult, Background, BackgroundExecutor};
pub use crate::error::SqlMapperDbError;
pub use crate::impl_record;
pub use crate::mapper::{Bindable, Record, ScanTarget};
pub use crate::query::{query, query_async};
pub use crate::session::{Connection, RowCursor, Session, Transaction};
pub use crate::transaction::{execute_in_transaction, execute_in_transaction_async};
pub use crate::types::{IsolationLevel, RowValues, TxOptions};

pub use tokio_util::sync::CancellationToken;

#[cfg(feature = "sqlite")]
pub use crate::sqlite::{SqliteConnection, SqliteOptions, SqliteTx};
