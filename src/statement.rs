use std::time::Duration;

use async_trait::async_trait;

use crate::error::StatementError;
use crate::results::ResultSet;
use crate::types::{
    CurrentResult, FetchDirection, GeneratedKeys, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType,
};

mod state;

pub use state::StatementState;
pub(crate) use state::narrow_count;

/// A statement-like resource: one unit of SQL execution capability against a
/// database connection, supporting immediate and batched execution.
///
/// `StatementProxy` implements it by forwarding every operation, and concrete
/// backends (`SqliteStatement`, `PostgresStatement`) implement it against a
/// real driver.
///
/// I/O-bound operations are async; property accessors are synchronous and
/// fail only when the resource is closed.
#[async_trait]
pub trait Statement: Send {
    /// Run arbitrary SQL. Returns `true` when the statement produced a result
    /// set (see `result_set`), `false` when it produced an update count.
    async fn execute(&mut self, sql: &str) -> Result<bool, StatementError>;

    /// `execute` with a generated-key modifier.
    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, StatementError>;

    /// Run a query and return its rows.
    async fn execute_query(&mut self, sql: &str) -> Result<ResultSet, StatementError>;

    /// Run a DML/DDL statement and return the number of rows affected.
    async fn execute_update(&mut self, sql: &str) -> Result<u32, StatementError>;

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u32, StatementError>;

    /// `execute_update` for row counts that may exceed `u32::MAX`.
    async fn execute_large_update(&mut self, sql: &str) -> Result<u64, StatementError>;

    async fn execute_large_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, StatementError>;

    /// Queue `sql` for the next `execute_batch`.
    async fn add_batch(&mut self, sql: &str) -> Result<(), StatementError>;

    /// Discard every queued statement.
    async fn clear_batch(&mut self) -> Result<(), StatementError>;

    /// Run the queued statements in order, returning one update count per statement.
    /// The queue is empty afterwards.
    ///
    /// Through `StatementProxy`, a listener error part way through the flush
    /// leaves the queue as it was, so retrying the flush reports the
    /// statements that were already notified a second time.
    async fn execute_batch(&mut self) -> Result<Vec<u32>, StatementError>;

    async fn execute_large_batch(&mut self) -> Result<Vec<u64>, StatementError>;

    /// The result set of the last `execute`, if it produced one. Each result set is handed out once.
    async fn result_set(&mut self) -> Result<Option<ResultSet>, StatementError>;

    /// The update count of the last `execute`, or `None` if it produced a result set.
    async fn update_count(&mut self) -> Result<Option<u32>, StatementError>;

    async fn large_update_count(&mut self) -> Result<Option<u64>, StatementError>;

    /// Move to the next result of the last execution.
    async fn more_results(&mut self, current: CurrentResult) -> Result<bool, StatementError>;

    /// Keys generated by the last execution that asked for them; empty otherwise.
    async fn generated_keys(&mut self) -> Result<ResultSet, StatementError>;

    /// Ask the backend to abort the running statement.
    async fn cancel(&mut self) -> Result<(), StatementError>;

    /// Release the resource and discard any queued batch. Closing twice is a no-op.
    async fn close(&mut self) -> Result<(), StatementError>;

    fn is_closed(&self) -> Result<bool, StatementError>;

    /// Close the resource once its result sets have been handed out.
    async fn close_on_completion(&mut self) -> Result<(), StatementError>;

    fn is_close_on_completion(&self) -> Result<bool, StatementError>;

    fn max_field_size(&self) -> Result<usize, StatementError>;

    fn set_max_field_size(&mut self, max: usize) -> Result<(), StatementError>;

    fn max_rows(&self) -> Result<u32, StatementError>;

    fn set_max_rows(&mut self, max: u32) -> Result<(), StatementError>;

    fn large_max_rows(&self) -> Result<u64, StatementError>;

    fn set_large_max_rows(&mut self, max: u64) -> Result<(), StatementError>;

    fn query_timeout(&self) -> Result<Option<Duration>, StatementError>;

    /// Bound each execution by `timeout`. `None` and a zero duration both mean no limit;
    /// `query_timeout` reports either as `None`.
    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), StatementError>;

    fn fetch_direction(&self) -> Result<FetchDirection, StatementError>;

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), StatementError>;

    fn fetch_size(&self) -> Result<u32, StatementError>;

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), StatementError>;

    fn set_cursor_name(&mut self, name: &str) -> Result<(), StatementError>;

    fn set_escape_processing(&mut self, enable: bool) -> Result<(), StatementError>;

    fn is_poolable(&self) -> Result<bool, StatementError>;

    fn set_poolable(&mut self, poolable: bool) -> Result<(), StatementError>;

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, StatementError>;

    fn result_set_type(&self) -> Result<ResultSetType, StatementError>;

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, StatementError>;

    /// Warnings reported by the backend since the last `clear_warnings`.
    fn warnings(&self) -> Result<Vec<String>, StatementError>;

    fn clear_warnings(&mut self) -> Result<(), StatementError>;

    /// Quote `value` as a SQL string literal, doubling embedded single quotes.
    fn enquote_literal(&self, value: &str) -> Result<String, StatementError> {
        Ok(format!("'{}'", value.replace('\'', "''")))
    }

    /// Quote `identifier` as a SQL delimited identifier.
    ///
    /// Simple identifiers are returned unchanged unless `always_quote` is set;
    /// identifiers that are already delimited are returned as they are.
    ///
    /// # Errors
    /// Returns `StatementError::ExecutionError` for identifiers that cannot be delimited.
    fn enquote_identifier(
        &self,
        identifier: &str,
        always_quote: bool,
    ) -> Result<String, StatementError> {
        let len = identifier.chars().count();
        if !(1..=128).contains(&len) {
            return Err(StatementError::ExecutionError(format!(
                "invalid identifier length {len}"
            )));
        }
        if !always_quote && self.is_simple_identifier(identifier)? {
            return Ok(identifier.to_string());
        }
        if len > 2 && identifier.starts_with('"') && identifier.ends_with('"') {
            let inner = &identifier[1..identifier.len() - 1];
            if !inner.contains('"') && !inner.contains('\0') {
                return Ok(identifier.to_string());
            }
        }
        if identifier.contains('"') || identifier.contains('\0') {
            return Err(StatementError::ExecutionError(format!(
                "identifier cannot be delimited: {identifier}"
            )));
        }
        Ok(format!("\"{identifier}\""))
    }

    /// An ASCII letter followed by ASCII letters, digits or underscores, at most 128 characters.
    fn is_simple_identifier(&self, identifier: &str) -> Result<bool, StatementError> {
        let mut chars = identifier.chars();
        let starts_alpha = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
        Ok(starts_alpha
            && identifier.len() <= 128
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_'))
    }
}
