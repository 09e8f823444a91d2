use std::fmt;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;

#[derive(Debug, Error)]
pub enum SqlMapperDbError {
    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Invalid data type: {0}")]
    InvalidDataType(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    #[error("Operation cancelled: {0}")]
    Cancelled(String),

    #[error("Background task failed: {0}")]
    BackgroundTaskFailed(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}

impl SqlMapperDbError {
    /// Build an `InvalidDataType` error from format arguments.
    ///
    /// ```rust
    /// use sql_mapper::SqlMapperDbError;
    ///
    /// let err = SqlMapperDbError::invalid_data_type(format_args!("cannot scan {} into i64", "TEXT"));
    /// assert_eq!(err.to_string(), "Invalid data type: cannot scan TEXT into i64");
    /// ```
    #[must_use]
    pub fn invalid_data_type(args: fmt::Arguments<'_>) -> Self {
        SqlMapperDbError::InvalidDataType(args.to_string())
    }

    /// True for errors produced by the mapper rather than the database layer.
    #[must_use]
    pub fn is_mapping_error(&self) -> bool {
        matches!(self, SqlMapperDbError::InvalidDataType(_))
    }
}
