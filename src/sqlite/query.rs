use rusqlite::Statement;
use rusqlite::types::Value;

use super::params::sqlite_value_to_row_value;
use crate::error::PersistorError;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
///
/// Returns `PersistorError` if the value cannot be read.
pub fn sqlite_extract_value_sync(
    row: &rusqlite::Row,
    idx: usize,
) -> Result<RowValues, PersistorError> {
    let value: Value = row.get(idx)?;
    Ok(sqlite_value_to_row_value(value))
}

/// Column names of a prepared statement, in select-list order.
#[must_use]
pub fn column_names(stmt: &Statement) -> Vec<String> {
    stmt.column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect()
}

/// Step `stmt` to completion and collect every row.
///
/// Statements that produce no rows (DML, DDL) still run; the result is simply empty.
///
/// # Errors
/// Returns `PersistorError::SqliteError` if stepping or reading a value fails.
pub fn collect_rows(stmt: &mut Statement) -> Result<Vec<Vec<RowValues>>, PersistorError> {
    let col_count = stmt.column_count();
    let mut rows_iter = stmt.query([])?;
    let mut rows = Vec::new();
    while let Some(row) = rows_iter.next()? {
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value_sync(row, i)?);
        }
        rows.push(row_values);
    }
    Ok(rows)
}
