use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::connection::{SharedSqliteConnection, apply_query_timeout, run_blocking};
use super::query::{build_result_set, last_insert_rowid_keys};
use crate::error::StatementError;
use crate::results::ResultSet;
use crate::statement::{Statement, StatementState, narrow_count};
use crate::types::{
    CurrentResult, FetchDirection, GeneratedKeys, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType,
};

/// What running one SQL text produced.
enum Outcome {
    Rows(ResultSet),
    Count(u64),
}

/// `Statement` backed by a rusqlite connection.
///
/// Several statements may share one connection (see `shared_connection`);
/// closing a statement never closes the connection.
pub struct SqliteStatement {
    conn: SharedSqliteConnection,
    interrupt: Arc<rusqlite::InterruptHandle>,
    state: StatementState,
    batch: Vec<String>,
}

impl SqliteStatement {
    /// Open (or create) the database file at `path`.
    ///
    /// # Errors
    /// Returns `StatementError::SqliteError` if the file cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StatementError> {
        Ok(Self::from_connection(rusqlite::Connection::open(path)?))
    }

    /// # Errors
    /// Returns `StatementError::SqliteError` if the in-memory database cannot be created.
    pub fn open_in_memory() -> Result<Self, StatementError> {
        Ok(Self::from_connection(rusqlite::Connection::open_in_memory()?))
    }

    #[must_use]
    pub fn from_connection(conn: rusqlite::Connection) -> Self {
        let interrupt = Arc::new(conn.get_interrupt_handle());
        Self::build(Arc::new(Mutex::new(conn)), interrupt)
    }

    /// Create another statement on a connection that is already shared.
    pub async fn from_shared(conn: SharedSqliteConnection) -> Self {
        let interrupt = Arc::new(conn.lock().await.get_interrupt_handle());
        Self::build(conn, interrupt)
    }

    fn build(conn: SharedSqliteConnection, interrupt: Arc<rusqlite::InterruptHandle>) -> Self {
        Self {
            conn,
            interrupt,
            state: StatementState::new(),
            batch: Vec::new(),
        }
    }

    /// The connection this statement runs on.
    #[must_use]
    pub fn shared_connection(&self) -> SharedSqliteConnection {
        Arc::clone(&self.conn)
    }

    /// Statements queued in this statement's own batch.
    #[must_use]
    pub fn queued(&self) -> &[String] {
        &self.batch
    }

    async fn run(
        &mut self,
        ctx: &'static str,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<Outcome, StatementError> {
        self.state.ensure_open(ctx)?;
        self.state.reset_results();
        if matches!(
            keys,
            GeneratedKeys::ColumnIndexes(_) | GeneratedKeys::ColumnNames(_)
        ) {
            self.state
                .add_warning("SQLite ignores generated key columns; returning last_insert_rowid()");
        }

        let sql_owned = sql.to_owned();
        let limit = self.state.row_limit();
        let timeout = self.state.query_timeout;
        let (outcome, generated) = run_blocking(self.shared_connection(), move |conn| {
            apply_query_timeout(conn, timeout)?;
            let mut stmt = conn.prepare(&sql_owned)?;
            if stmt.column_count() > 0 {
                let rs = build_result_set(&mut stmt, limit)?;
                return Ok((Outcome::Rows(rs), None));
            }
            let affected = stmt.execute([])?;
            let generated = keys.is_requested().then(|| last_insert_rowid_keys(conn));
            Ok((Outcome::Count(widen(affected)), generated))
        })
        .await?;

        if let Some(generated) = generated {
            self.state.record_generated_keys(generated);
        }
        Ok(match outcome {
            Outcome::Rows(mut rs) => {
                self.state.clamp_fields(&mut rs);
                Outcome::Rows(rs)
            }
            count @ Outcome::Count(_) => count,
        })
    }

    async fn execute_inner(
        &mut self,
        ctx: &'static str,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, StatementError> {
        match self.run(ctx, sql, keys).await? {
            Outcome::Rows(rs) => {
                self.state.record_result_set(rs);
                Ok(true)
            }
            Outcome::Count(n) => {
                self.state.record_update_count(n);
                Ok(false)
            }
        }
    }

    async fn update_inner(
        &mut self,
        ctx: &'static str,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, StatementError> {
        match self.run(ctx, sql, keys).await? {
            Outcome::Rows(_) => Err(StatementError::ExecutionError(format!(
                "{ctx}: statement returned a result set"
            ))),
            Outcome::Count(n) => {
                self.state.record_update_count(n);
                Ok(n)
            }
        }
    }

    async fn run_batch(&mut self, ctx: &'static str) -> Result<Vec<u64>, StatementError> {
        self.state.ensure_open(ctx)?;
        self.state.reset_results();
        let statements = std::mem::take(&mut self.batch);
        let timeout = self.state.query_timeout;
        run_blocking(self.shared_connection(), move |conn| {
            apply_query_timeout(conn, timeout)?;
            let mut update_counts = Vec::with_capacity(statements.len());
            for (index, sql) in statements.iter().enumerate() {
                match run_batch_entry(conn, sql) {
                    Ok(n) => update_counts.push(n),
                    Err(message) => {
                        return Err(StatementError::BatchError {
                            index,
                            update_counts,
                            message,
                        });
                    }
                }
            }
            Ok(update_counts)
        })
        .await
    }
}

fn run_batch_entry(conn: &rusqlite::Connection, sql: &str) -> Result<u64, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    if stmt.column_count() > 0 {
        return Err("batch entry returned a result set".to_string());
    }
    stmt.execute([]).map(widen).map_err(|e| e.to_string())
}

fn widen(count: usize) -> u64 {
    u64::try_from(count).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for SqliteStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStatement")
            .field("state", &self.state)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Statement for SqliteStatement {
    async fn execute(&mut self, sql: &str) -> Result<bool, StatementError> {
        self.execute_inner("execute", sql, GeneratedKeys::None).await
    }

    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, StatementError> {
        self.execute_inner("execute", sql, keys).await
    }

    async fn execute_query(&mut self, sql: &str) -> Result<ResultSet, StatementError> {
        match self.run("execute_query", sql, GeneratedKeys::None).await? {
            Outcome::Rows(rs) => {
                self.state.query_completed();
                Ok(rs)
            }
            Outcome::Count(_) => Err(StatementError::ExecutionError(
                "execute_query: statement did not return a result set".to_string(),
            )),
        }
    }

    async fn execute_update(&mut self, sql: &str) -> Result<u32, StatementError> {
        narrow_count(self.update_inner("execute_update", sql, GeneratedKeys::None).await?)
    }

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u32, StatementError> {
        narrow_count(self.update_inner("execute_update", sql, keys).await?)
    }

    async fn execute_large_update(&mut self, sql: &str) -> Result<u64, StatementError> {
        self.update_inner("execute_large_update", sql, GeneratedKeys::None)
            .await
    }

    async fn execute_large_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, StatementError> {
        self.update_inner("execute_large_update", sql, keys).await
    }

    async fn add_batch(&mut self, sql: &str) -> Result<(), StatementError> {
        self.state.ensure_open("add_batch")?;
        self.batch.push(sql.to_owned());
        Ok(())
    }

    async fn clear_batch(&mut self) -> Result<(), StatementError> {
        self.state.ensure_open("clear_batch")?;
        self.batch.clear();
        Ok(())
    }

    async fn execute_batch(&mut self) -> Result<Vec<u32>, StatementError> {
        self.run_batch("execute_batch")
            .await?
            .into_iter()
            .map(narrow_count)
            .collect()
    }

    async fn execute_large_batch(&mut self) -> Result<Vec<u64>, StatementError> {
        self.run_batch("execute_large_batch").await
    }

    async fn result_set(&mut self) -> Result<Option<ResultSet>, StatementError> {
        self.state.ensure_open("result_set")?;
        Ok(self.state.take_result_set())
    }

    async fn update_count(&mut self) -> Result<Option<u32>, StatementError> {
        self.state.ensure_open("update_count")?;
        self.state.update_count().map(narrow_count).transpose()
    }

    async fn large_update_count(&mut self) -> Result<Option<u64>, StatementError> {
        self.state.ensure_open("large_update_count")?;
        Ok(self.state.update_count())
    }

    async fn more_results(&mut self, current: CurrentResult) -> Result<bool, StatementError> {
        self.state.ensure_open("more_results")?;
        Ok(self.state.more_results(current))
    }

    async fn generated_keys(&mut self) -> Result<ResultSet, StatementError> {
        self.state.ensure_open("generated_keys")?;
        Ok(self.state.take_generated_keys())
    }

    async fn cancel(&mut self) -> Result<(), StatementError> {
        self.state.ensure_open("cancel")?;
        self.interrupt.interrupt();
        Ok(())
    }

    async fn close(&mut self) -> Result<(), StatementError> {
        self.state.mark_closed();
        self.batch.clear();
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, StatementError> {
        Ok(self.state.is_closed())
    }

    async fn close_on_completion(&mut self) -> Result<(), StatementError> {
        self.state.ensure_open("close_on_completion")?;
        self.state.close_on_completion = true;
        Ok(())
    }

    fn is_close_on_completion(&self) -> Result<bool, StatementError> {
        self.state.ensure_open("is_close_on_completion")?;
        Ok(self.state.close_on_completion)
    }

    fn max_field_size(&self) -> Result<usize, StatementError> {
        self.state.ensure_open("max_field_size")?;
        Ok(self.state.max_field_size)
    }

    fn set_max_field_size(&mut self, max: usize) -> Result<(), StatementError> {
        self.state.ensure_open("set_max_field_size")?;
        self.state.max_field_size = max;
        Ok(())
    }

    fn max_rows(&self) -> Result<u32, StatementError> {
        self.state.ensure_open("max_rows")?;
        Ok(u32::try_from(self.state.max_rows).unwrap_or(u32::MAX))
    }

    fn set_max_rows(&mut self, max: u32) -> Result<(), StatementError> {
        self.set_large_max_rows(u64::from(max))
    }

    fn large_max_rows(&self) -> Result<u64, StatementError> {
        self.state.ensure_open("large_max_rows")?;
        Ok(self.state.max_rows)
    }

    fn set_large_max_rows(&mut self, max: u64) -> Result<(), StatementError> {
        self.state.ensure_open("set_max_rows")?;
        self.state.max_rows = max;
        Ok(())
    }

    fn query_timeout(&self) -> Result<Option<Duration>, StatementError> {
        self.state.ensure_open("query_timeout")?;
        Ok(self.state.query_timeout)
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), StatementError> {
        self.state.ensure_open("set_query_timeout")?;
        self.state.set_query_timeout(timeout);
        Ok(())
    }

    fn fetch_direction(&self) -> Result<FetchDirection, StatementError> {
        self.state.ensure_open("fetch_direction")?;
        Ok(self.state.fetch_direction)
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), StatementError> {
        self.state.ensure_open("set_fetch_direction")?;
        self.state.fetch_direction = direction;
        Ok(())
    }

    fn fetch_size(&self) -> Result<u32, StatementError> {
        self.state.ensure_open("fetch_size")?;
        Ok(self.state.fetch_size)
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), StatementError> {
        self.state.ensure_open("set_fetch_size")?;
        self.state.fetch_size = rows;
        Ok(())
    }

    fn set_cursor_name(&mut self, name: &str) -> Result<(), StatementError> {
        self.state.ensure_open("set_cursor_name")?;
        self.state.cursor_name = Some(name.to_owned());
        Ok(())
    }

    fn set_escape_processing(&mut self, enable: bool) -> Result<(), StatementError> {
        self.state.ensure_open("set_escape_processing")?;
        self.state.escape_processing = enable;
        Ok(())
    }

    fn is_poolable(&self) -> Result<bool, StatementError> {
        self.state.ensure_open("is_poolable")?;
        Ok(self.state.poolable)
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), StatementError> {
        self.state.ensure_open("set_poolable")?;
        self.state.poolable = poolable;
        Ok(())
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, StatementError> {
        self.state.ensure_open("result_set_concurrency")?;
        Ok(ResultSetConcurrency::ReadOnly)
    }

    fn result_set_type(&self) -> Result<ResultSetType, StatementError> {
        self.state.ensure_open("result_set_type")?;
        Ok(ResultSetType::ForwardOnly)
    }

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, StatementError> {
        self.state.ensure_open("result_set_holdability")?;
        Ok(ResultSetHoldability::CloseCursorsAtCommit)
    }

    fn warnings(&self) -> Result<Vec<String>, StatementError> {
        self.state.ensure_open("warnings")?;
        Ok(self.state.warnings().to_vec())
    }

    fn clear_warnings(&mut self) -> Result<(), StatementError> {
        self.state.ensure_open("clear_warnings")?;
        self.state.clear_warnings();
        Ok(())
    }
}
