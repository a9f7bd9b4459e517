use chrono::NaiveDateTime;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

/// A single column value read back from a delegate.
///
/// Both backends decode into the same enum so listeners, tests and callers
/// never branch on driver types:
/// ```rust
/// use sql_statement_proxy::prelude::*;
///
/// let value = RowValues::Int(1);
/// assert_eq!(value.as_int(), Some(&1));
/// assert!(RowValues::Null.is_null());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        match self {
            RowValues::Int(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RowValues::Text(value) => Some(value),
            _ => None,
        }
    }

    /// Booleans come back from `SQLite` as 0/1 integers, so both shapes are accepted.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            RowValues::Bool(value) => Some(*value),
            RowValues::Int(1) => Some(true),
            RowValues::Int(0) => Some(false),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            RowValues::Timestamp(value) => Some(*value),
            RowValues::Text(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
                .ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            RowValues::Blob(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// Backends that ship a `Statement` implementation in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    /// `SQLite` through rusqlite (feature `sqlite`)
    Sqlite,
    /// `PostgreSQL` through tokio-postgres (feature `postgres`)
    Postgres,
}

/// Execution-mode modifier asking the delegate to make generated keys available.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum GeneratedKeys {
    /// Plain execution.
    #[default]
    None,
    /// Return whatever keys the backend generates.
    Returned,
    /// Return the keys found in these (1-based) column positions.
    ColumnIndexes(Vec<usize>),
    /// Return the keys found in these named columns.
    ColumnNames(Vec<String>),
}

impl GeneratedKeys {
    #[must_use]
    pub fn is_requested(&self) -> bool {
        !matches!(self, GeneratedKeys::None)
    }
}

/// What to do with the current result when moving on with `more_results`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CurrentResult {
    #[default]
    Close,
    Keep,
    CloseAll,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchDirection {
    #[default]
    Forward,
    Reverse,
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultSetType {
    #[default]
    ForwardOnly,
    ScrollInsensitive,
    ScrollSensitive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultSetConcurrency {
    #[default]
    ReadOnly,
    Updatable,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResultSetHoldability {
    HoldCursorsOverCommit,
    #[default]
    CloseCursorsAtCommit,
}
