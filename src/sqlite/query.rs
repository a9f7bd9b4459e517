use rusqlite::types::Value;

use crate::error::StatementError;
use crate::results::ResultSet;
use crate::types::RowValues;

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns `StatementError::SqliteError` if the column cannot be read.
pub fn sqlite_extract_value(row: &rusqlite::Row, idx: usize) -> Result<RowValues, StatementError> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => RowValues::Float(f),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

/// Step a prepared statement to completion, collecting at most `limit` rows.
///
/// # Errors
/// Returns `StatementError::SqliteError` if stepping or decoding fails.
pub fn build_result_set(
    stmt: &mut rusqlite::Statement<'_>,
    limit: Option<usize>,
) -> Result<ResultSet, StatementError> {
    let column_names: Vec<String> = stmt
        .column_names()
        .iter()
        .map(std::string::ToString::to_string)
        .collect();
    let col_count = column_names.len();
    let mut result_set = ResultSet::with_capacity(column_names, 10);

    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        if limit.is_some_and(|max| result_set.len() >= max) {
            break;
        }
        let mut row_values = Vec::with_capacity(col_count);
        for i in 0..col_count {
            row_values.push(sqlite_extract_value(row, i)?);
        }
        result_set.add_row_values(row_values);
    }

    Ok(result_set)
}

/// The one-row result `SQLite` offers as generated keys.
#[must_use]
pub fn last_insert_rowid_keys(conn: &rusqlite::Connection) -> ResultSet {
    let mut keys = ResultSet::with_capacity(vec!["last_insert_rowid()".to_string()], 1);
    keys.add_row_values(vec![RowValues::Int(conn.last_insert_rowid())]);
    keys
}
