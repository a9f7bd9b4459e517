//! Statement interception for SQL tracing and N+1 detection.
//!
//! [`StatementProxy`] wraps any [`Statement`] and behaves exactly like it,
//! except that every operation that sends SQL to the database first reports
//! the literal SQL text to a [`StatementListener`]. Batched statements are
//! reported when the batch is executed, once per queued statement, in the
//! order they were queued.
//!
//! Backends: `SqliteStatement` (feature `sqlite`, default) and
//! `PostgresStatement` (feature `postgres`).

pub mod error;
pub mod listener;
pub mod options;
pub mod prelude;
pub mod proxy;
pub mod results;
pub mod statement;
pub mod types;

#[cfg(feature = "postgres")]
pub mod postgres;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use error::StatementError;
pub use listener::{FanOutListener, RecordingListener, StatementListener, TracingListener};
pub use options::{ProxyOptions, ProxyOptionsBuilder};
pub use proxy::{BatchState, PendingBatch, StatementInterceptor, StatementProxy};
pub use results::{DbRow, ResultSet};
pub use statement::{Statement, StatementState};
pub use types::{
    CurrentResult, DatabaseType, FetchDirection, GeneratedKeys, ResultSetConcurrency,
    ResultSetHoldability, ResultSetType, RowValues,
};

#[cfg(feature = "postgres")]
pub use postgres::PostgresStatement;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStatement;
