use std::time::Duration;

use thiserror::Error;

#[cfg(feature = "sqlite")]
use rusqlite;
#[cfg(feature = "postgres")]
use tokio_postgres;

#[derive(Debug, Error)]
pub enum StatementError {
    #[cfg(feature = "postgres")]
    #[error(transparent)]
    PostgresError(#[from] tokio_postgres::Error),

    #[cfg(feature = "sqlite")]
    #[error(transparent)]
    SqliteError(#[from] rusqlite::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Statement is closed: {0}")]
    Closed(String),

    #[error("SQL execution error: {0}")]
    ExecutionError(String),

    /// A batch entry failed; `update_counts` holds the counts of the entries that ran before it.
    #[error("Batch entry {index} failed: {message}")]
    BatchError {
        index: usize,
        update_counts: Vec<u64>,
        message: String,
    },

    #[error("Query timed out after {0:?}")]
    Timeout(Duration),

    /// Raised by a `StatementListener`; propagates to the caller like any delegate error.
    #[error("Statement listener error: {0}")]
    ListenerError(String),

    #[error("Unimplemented feature: {0}")]
    Unimplemented(String),

    #[error("Other database error: {0}")]
    Other(String),
}
