use std::collections::HashMap;
use std::sync::Arc;

use super::row::CustomDbRow;
use crate::error::SqlMapperDbError;
use crate::types::RowValues;

/// A fully fetched result set.
///
/// Capability implementations that buffer rows (the `SQLite` adapter, test doubles)
/// collect into a `ResultSet` and replay it through [`super::ResultSetCursor`].
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    /// The rows returned by the query
    pub results: Vec<CustomDbRow>,
    /// Column names shared by all rows
    column_names: Arc<Vec<String>>,
    column_index_cache: Arc<HashMap<String, usize>>,
}

impl ResultSet {
    /// Create an empty result set for the given columns.
    #[must_use]
    pub fn new(column_names: Vec<String>) -> Self {
        Self::with_capacity(column_names, 0)
    }

    /// Create an empty result set with room for `capacity` rows.
    #[must_use]
    pub fn with_capacity(column_names: Vec<String>, capacity: usize) -> Self {
        let column_index_cache = column_names
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), i))
            .collect();
        Self {
            results: Vec::with_capacity(capacity),
            column_names: Arc::new(column_names),
            column_index_cache: Arc::new(column_index_cache),
        }
    }

    /// Get the column names for this result set
    #[must_use]
    pub fn column_names(&self) -> &Arc<Vec<String>> {
        &self.column_names
    }

    /// Add a row to the result set.
    ///
    /// # Errors
    /// Returns `SqlMapperDbError::ExecutionError` if the value count does not match the
    /// column count.
    pub fn add_row_values(&mut self, row_values: Vec<RowValues>) -> Result<(), SqlMapperDbError> {
        if row_values.len() != self.column_names.len() {
            return Err(SqlMapperDbError::ExecutionError(format!(
                "row has {} values but the result set has {} columns",
                row_values.len(),
                self.column_names.len()
            )));
        }
        self.results.push(CustomDbRow::with_cache(
            Arc::clone(&self.column_names),
            row_values,
            Arc::clone(&self.column_index_cache),
        ));
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.results.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}
