//! `SQLite` implementation of the capability traits, built on `rusqlite`.
//!
//! Query results are fetched eagerly into a [`crate::ResultSet`] while the connection
//! lock is held and replayed through a [`crate::ResultSetCursor`].

pub mod config;
mod connection;
pub mod params;
pub mod query;
mod transaction;

pub use config::{SqliteOptions, SqliteOptionsBuilder};
pub use connection::SqliteConnection;
pub use params::Params;
pub use query::build_result_set;
pub use transaction::SqliteTx;
