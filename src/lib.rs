//! Map SQL result rows onto plain Rust structs, and run closures inside
//! commit-or-rollback transaction scopes.
//!
//! The crate is written against three small capability traits ([`Session`],
//! [`Connection`], [`Transaction`]) and a [`RowCursor`] protocol, so any client that
//! can run a query and open a transaction plugs in. A `rusqlite` implementation ships
//! behind the default `sqlite` feature.
//!
//! ```rust
//! use sql_mapper::prelude::*;
//!
//! #[derive(Debug, Default)]
//! struct Street {
//!     name: String,
//! }
//! impl_record!(Street { name });
//!
//! #[derive(Debug, Default)]
//! struct Person {
//!     id: i64,
//!     name: String,
//!     street: Street,
//! }
//! impl_record!(Person { id, name => "full_name", street });
//!
//! # fn main() -> Result<(), SqlMapperDbError> {
//! let ctx = CancellationToken::new();
//! let conn = SqliteConnection::open_in_memory()?;
//! let people: Vec<Person> = query(
//!     &ctx,
//!     &conn,
//!     "SELECT 1 AS id, 'Ada' AS full_name, 'Main St' AS street_name, 'ignored' AS extra",
//!     &[],
//! )?;
//! assert_eq!(people[0].street.name, "Main St");
//! # Ok(())
//! # }
//! ```

pub mod background;
pub mod error;
pub mod mapper;
pub mod prelude;
mod query;
pub mod results;
pub mod session;
mod transaction;
pub mod types;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use background::{AsyncResult, Background, BackgroundExecutor, Resolver};
pub use error::SqlMapperDbError;
pub use mapper::{Bindable, Discard, FieldBindings, Record, ScanTarget, parse_db_result};
pub use query::{query, query_async, query_async_on};
pub use results::{CustomDbRow, ResultSet, ResultSetCursor};
pub use session::{Connection, RowCursor, Session, Transaction};
pub use transaction::{
    execute_in_transaction, execute_in_transaction_async, execute_in_transaction_async_on,
};
pub use types::{IsolationLevel, RowValues, TxOptions};

pub use tokio_util::sync::CancellationToken;
