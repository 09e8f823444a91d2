use rusqlite::types::Value;
use tokio_util::sync::CancellationToken;

use super::params::Params;
use crate::error::SqlMapperDbError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Fail with `Cancelled` once `ctx` has been cancelled.
pub(crate) fn check_cancelled(ctx: &CancellationToken) -> Result<(), SqlMapperDbError> {
    if ctx.is_cancelled() {
        return Err(SqlMapperDbError::Cancelled(
            "SQLite query cancelled by caller".into(),
        ));
    }
    Ok(())
}

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `SqlMapperDbError` if the value cannot be converted.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, SqlMapperDbError> {
    let value: Value = row.get(idx)?;
    match value {
        Value::Null => Ok(RowValues::Null),
        Value::Integer(i) => Ok(RowValues::Int(i)),
        Value::Real(f) => Ok(RowValues::Float(f)),
        Value::Text(s) => Ok(RowValues::Text(s)),
        Value::Blob(b) => Ok(RowValues::Blob(b)),
    }
}

/// Run a query and buffer every row into a `ResultSet`.
///
/// `ctx` is checked before the statement runs and again before each row is fetched, so
/// a cancelled caller stops paying for the rest of the result.
///
/// # Errors
/// Returns `SqlMapperDbError` if preparing, stepping, or converting fails, or
/// `SqlMapperDbError::Cancelled` once `ctx` is cancelled.
pub fn build_result_set(
    conn: &rusqlite::Connection,
    ctx: &CancellationToken,
    sql: &str,
    args: &[RowValues],
) -> Result<ResultSet, SqlMapperDbError> {
    check_cancelled(ctx)?;
    let params = Params::convert(args);
    let param_refs = params.as_refs();
    let mut stmt = conn.prepare(sql)?;
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();

    let mut result_set = ResultSet::with_capacity(column_names, 10);
    let mut rows_iter = stmt.query(&param_refs[..])?;
    loop {
        check_cancelled(ctx)?;
        let Some(row) = rows_iter.next()? else {
            break;
        };
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        result_set.add_row_values(row_values)?;
    }

    Ok(result_set)
}

/// Run a statement that returns no rows and report the affected row count.
///
/// # Errors
/// Returns `SqlMapperDbError` if execution fails or `ctx` is cancelled.
pub fn execute_dml(
    conn: &rusqlite::Connection,
    ctx: &CancellationToken,
    sql: &str,
    args: &[RowValues],
) -> Result<usize, SqlMapperDbError> {
    check_cancelled(ctx)?;
    let params = Params::convert(args);
    let param_refs = params.as_refs();
    Ok(conn.execute(sql, &param_refs[..])?)
}
