use std::sync::Arc;

use super::ResultSet;
use super::row::CustomDbRow;
use crate::error::SqlMapperDbError;
use crate::mapper::ScanTarget;
use crate::session::RowCursor;

/// [`RowCursor`] over rows that were already fetched into a [`ResultSet`].
#[derive(Debug)]
pub struct ResultSetCursor {
    columns: Arc<Vec<String>>,
    rows: std::vec::IntoIter<CustomDbRow>,
    current: Option<CustomDbRow>,
    terminal: Option<SqlMapperDbError>,
    closed: bool,
}

impl ResultSetCursor {
    #[must_use]
    pub fn new(result_set: ResultSet) -> Self {
        Self {
            columns: Arc::clone(result_set.column_names()),
            rows: result_set.results.into_iter(),
            current: None,
            terminal: None,
            closed: false,
        }
    }

    /// Report `err` from [`RowCursor::terminal_error`] once the buffered rows run out,
    /// as a driver does when the connection drops mid-stream.
    #[must_use]
    pub fn with_terminal_error(mut self, err: SqlMapperDbError) -> Self {
        self.terminal = Some(err);
        self
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl From<ResultSet> for ResultSetCursor {
    fn from(result_set: ResultSet) -> Self {
        Self::new(result_set)
    }
}

impl RowCursor for ResultSetCursor {
    fn column_names(&mut self) -> Result<Vec<String>, SqlMapperDbError> {
        if self.closed {
            return Err(SqlMapperDbError::ExecutionError("cursor is closed".into()));
        }
        Ok(self.columns.as_ref().clone())
    }

    fn next_row(&mut self) -> bool {
        if self.closed {
            self.current = None;
            return false;
        }
        self.current = self.rows.next();
        self.current.is_some()
    }

    fn scan_into(&mut self, dest: &mut [&mut dyn ScanTarget]) -> Result<(), SqlMapperDbError> {
        let row = self.current.as_ref().ok_or_else(|| {
            SqlMapperDbError::ExecutionError("scan called without a current row".into())
        })?;
        if dest.len() != row.rows.len() {
            return Err(SqlMapperDbError::ExecutionError(format!(
                "expected {} destination arguments in scan, got {}",
                row.rows.len(),
                dest.len()
            )));
        }
        for (target, value) in dest.iter_mut().zip(&row.rows) {
            target.scan(value)?;
        }
        Ok(())
    }

    fn close(&mut self) {
        self.closed = true;
        self.current = None;
        self.rows = Vec::new().into_iter();
    }

    fn terminal_error(&mut self) -> Option<SqlMapperDbError> {
        if self.current.is_some() {
            return None;
        }
        self.terminal.take()
    }
}
