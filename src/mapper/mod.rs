//! Row-to-record mapping.
//!
//! A record type describes its shape through [`Record`] (normally generated by
//! [`crate::impl_record!`]). For each row the mapper builds a fresh record, resolves a
//! column-name to field map from that shape, and hands the cursor one destination per
//! column: the matching field, or a [`Discard`] sink for columns nothing maps to.

mod bindings;
mod macros;
mod scan;

pub use bindings::{Bindable, FieldBindings, PREFIX_SEPARATOR, Record, column_name};
pub use scan::{Discard, ScanTarget};

use std::collections::HashMap;

use crate::error::SqlMapperDbError;
use crate::session::RowCursor;

/// Drain `cursor` into a `Vec<T>`, one record per row, in cursor order.
///
/// The first scan failure aborts the whole call; no partially scanned record is ever
/// returned. Columns with no matching field are read and dropped.
///
/// # Errors
/// Returns the cursor's error if the column list is unavailable, the first scan error,
/// or the cursor's terminal error once it stops yielding rows.
pub fn parse_db_result<T, C>(cursor: &mut C) -> Result<Vec<T>, SqlMapperDbError>
where
    T: Record,
    C: RowCursor + ?Sized,
{
    let columns = cursor.column_names()?;
    let mut result = Vec::new();
    while cursor.next_row() {
        let mut item = T::default();
        scan_row(cursor, &columns, &mut item)?;
        result.push(item);
    }
    if let Some(err) = cursor.terminal_error() {
        return Err(err);
    }
    Ok(result)
}

fn scan_row<T, C>(cursor: &mut C, columns: &[String], item: &mut T) -> Result<(), SqlMapperDbError>
where
    T: Record,
    C: RowCursor + ?Sized,
{
    // a repeated column name fills the field from its last occurrence
    let last_index: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, column)| (column.as_str(), i))
        .collect();

    let mut bindings = FieldBindings::for_record(item);
    let mut sinks = vec![Discard; columns.len()];
    let mut dest: Vec<&mut dyn ScanTarget> = Vec::with_capacity(columns.len());
    for (i, (column, sink)) in columns.iter().zip(sinks.iter_mut()).enumerate() {
        let field = if last_index.get(column.as_str()) == Some(&i) {
            bindings.take(column)
        } else {
            None
        };
        match field {
            Some(field) => dest.push(field),
            None => dest.push(sink),
        }
    }
    cursor.scan_into(&mut dest)
}
