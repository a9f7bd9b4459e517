use std::borrow::Cow;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_postgres::{Client, NoTls};

use super::query::build_result_set;
use crate::error::StatementError;
use crate::results::ResultSet;
use crate::statement::{Statement, StatementState, narrow_count};
use crate::types::{
    CurrentResult, FetchDirection, GeneratedKeys, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType,
};

enum Outcome {
    Rows(ResultSet),
    Count(u64),
}

/// `Statement` backed by a tokio-postgres client.
///
/// The client is shared; closing the statement leaves it connected.
pub struct PostgresStatement {
    client: Arc<Client>,
    state: StatementState,
    batch: Vec<String>,
}

impl PostgresStatement {
    #[must_use]
    pub fn new(client: Arc<Client>) -> Self {
        Self {
            client,
            state: StatementState::new(),
            batch: Vec::new(),
        }
    }

    /// Connect with a libpq-style connection string and drive the connection on a tokio task.
    ///
    /// # Errors
    /// Returns `StatementError::PostgresError` if the connection cannot be established.
    pub async fn connect(config: &str) -> Result<Self, StatementError> {
        let (client, connection) = tokio_postgres::connect(config, NoTls).await?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(target: "sql_statement_proxy::postgres", error = %e, "connection closed with error");
            }
        });
        Ok(Self::new(Arc::new(client)))
    }

    #[must_use]
    pub fn client(&self) -> Arc<Client> {
        Arc::clone(&self.client)
    }

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
        let returning = with_returning(sql, &keys)?;
        let wants_keys = returning.is_some();
        let sql = returning.map_or(Cow::Borrowed(sql), Cow::Owned);
        let timeout = self.state.query_timeout;
        let client = Arc::clone(&self.client);

        let stmt = timed(timeout, client.prepare(&sql)).await?;
        if stmt.columns().is_empty() {
            let affected = timed(timeout, client.execute(&stmt, &[])).await?;
            return Ok(Outcome::Count(affected));
        }

        let rows = timed(timeout, client.query(&stmt, &[])).await?;
        if wants_keys {
            let keys_rs = build_result_set(&stmt, &rows, None)?;
            let affected = u64::try_from(keys_rs.len()).unwrap_or(u64::MAX);
            self.state.record_generated_keys(keys_rs);
            return Ok(Outcome::Count(affected));
        }
        let mut rs = build_result_set(&stmt, &rows, self.state.row_limit())?;
        self.state.clamp_fields(&mut rs);
        Ok(Outcome::Rows(rs))
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
        let client = Arc::clone(&self.client);

        let mut update_counts = Vec::with_capacity(statements.len());
        for (index, sql) in statements.iter().enumerate() {
            match run_batch_entry(&client, sql, timeout).await {
                Ok(n) => update_counts.push(n),
                Err(e) => {
                    return Err(StatementError::BatchError {
                        index,
                        update_counts,
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(update_counts)
    }
}

async fn run_batch_entry(
    client: &Client,
    sql: &str,
    timeout: Option<Duration>,
) -> Result<u64, StatementError> {
    let stmt = timed(timeout, client.prepare(sql)).await?;
    if !stmt.columns().is_empty() {
        return Err(StatementError::ExecutionError(
            "batch entry returned a result set".to_string(),
        ));
    }
    timed(timeout, client.execute(&stmt, &[])).await
}

/// Await a driver future, bounded by the statement's query timeout when one is set.
/// A zero timeout is no limit.
async fn timed<T, F>(timeout: Option<Duration>, fut: F) -> Result<T, StatementError>
where
    F: Future<Output = Result<T, tokio_postgres::Error>>,
{
    match timeout.filter(|limit| !limit.is_zero()) {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| StatementError::Timeout(limit))?
            .map_err(StatementError::from),
        None => fut.await.map_err(StatementError::from),
    }
}

/// Postgres hands generated keys back through a `RETURNING` clause.
///
/// Returns the rewritten text, or `None` when no keys were asked for or the
/// statement is not an INSERT, UPDATE or DELETE; such statements run as written.
fn with_returning(sql: &str, keys: &GeneratedKeys) -> Result<Option<String>, StatementError> {
    if !keys.is_requested() || !is_dml(sql) {
        return Ok(None);
    }
    let base = sql.trim_end().trim_end_matches(';');
    match keys {
        GeneratedKeys::ColumnNames(cols) if !cols.is_empty() => {
            let list = cols
                .iter()
                .map(|c| format!("\"{}\"", c.replace('"', "\"\"")))
                .collect::<Vec<_>>()
                .join(", ");
            Ok(Some(format!("{base} RETURNING {list}")))
        }
        GeneratedKeys::ColumnIndexes(_) => Err(StatementError::Unimplemented(
            "returning generated keys by column index is not supported by PostgreSQL".to_string(),
        )),
        _ => Ok(Some(format!("{base} RETURNING *"))),
    }
}

fn is_dml(sql: &str) -> bool {
    let keyword = sql
        .trim_start()
        .split(|c: char| !c.is_ascii_alphabetic())
        .next()
        .unwrap_or_default();
    ["INSERT", "UPDATE", "DELETE"]
        .iter()
        .any(|dml| keyword.eq_ignore_ascii_case(dml))
}

impl std::fmt::Debug for PostgresStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresStatement")
            .field("state", &self.state)
            .field("batch", &self.batch)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Statement for PostgresStatement {
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
        self.client.cancel_token().cancel_query(NoTls).await?;
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
        Ok(ResultSetHoldability::HoldCursorsOverCommit)
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
