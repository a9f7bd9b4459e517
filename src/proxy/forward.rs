use std::time::Duration;

use async_trait::async_trait;

use super::StatementProxy;
use crate::error::StatementError;
use crate::results::ResultSet;
use crate::statement::Statement;
use crate::types::{
    CurrentResult, FetchDirection, GeneratedKeys, ResultSetConcurrency, ResultSetHoldability,
    ResultSetType,
};

#[async_trait]
impl<S: Statement> Statement for StatementProxy<S> {
    // Immediate execution: one notification, then the delegate.

    async fn execute(&mut self, sql: &str) -> Result<bool, StatementError> {
        self.notify("execute", sql)?;
        self.delegate.execute(sql).await
    }

    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, StatementError> {
        self.notify("execute_with_keys", sql)?;
        self.delegate.execute_with_keys(sql, keys).await
    }

    async fn execute_query(&mut self, sql: &str) -> Result<ResultSet, StatementError> {
        self.notify("execute_query", sql)?;
        self.delegate.execute_query(sql).await
    }

    async fn execute_update(&mut self, sql: &str) -> Result<u32, StatementError> {
        self.notify("execute_update", sql)?;
        self.delegate.execute_update(sql).await
    }

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u32, StatementError> {
        self.notify("execute_update_with_keys", sql)?;
        self.delegate.execute_update_with_keys(sql, keys).await
    }

    async fn execute_large_update(&mut self, sql: &str) -> Result<u64, StatementError> {
        self.notify("execute_large_update", sql)?;
        self.delegate.execute_large_update(sql).await
    }

    async fn execute_large_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, StatementError> {
        self.notify("execute_large_update_with_keys", sql)?;
        self.delegate.execute_large_update_with_keys(sql, keys).await
    }

    // Batches: queue silently, report everything at flush time.

    async fn add_batch(&mut self, sql: &str) -> Result<(), StatementError> {
        self.delegate.add_batch(sql).await?;
        self.pending.push(sql);
        Ok(())
    }

    async fn clear_batch(&mut self) -> Result<(), StatementError> {
        self.pending.clear();
        self.delegate.clear_batch().await
    }

    async fn execute_batch(&mut self) -> Result<Vec<u32>, StatementError> {
        self.flush_pending("execute_batch")?;
        self.delegate.execute_batch().await
    }

    async fn execute_large_batch(&mut self) -> Result<Vec<u64>, StatementError> {
        self.flush_pending("execute_large_batch")?;
        self.delegate.execute_large_batch().await
    }

    // Everything below is forwarded untouched, except that a successful close
    // drops the pending batch along with the delegate's.

    async fn result_set(&mut self) -> Result<Option<ResultSet>, StatementError> {
        self.delegate.result_set().await
    }

    async fn update_count(&mut self) -> Result<Option<u32>, StatementError> {
        self.delegate.update_count().await
    }

    async fn large_update_count(&mut self) -> Result<Option<u64>, StatementError> {
        self.delegate.large_update_count().await
    }

    async fn more_results(&mut self, current: CurrentResult) -> Result<bool, StatementError> {
        self.delegate.more_results(current).await
    }

    async fn generated_keys(&mut self) -> Result<ResultSet, StatementError> {
        self.delegate.generated_keys().await
    }

    async fn cancel(&mut self) -> Result<(), StatementError> {
        self.delegate.cancel().await
    }

    async fn close(&mut self) -> Result<(), StatementError> {
        self.delegate.close().await?;
        self.pending.clear();
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, StatementError> {
        self.delegate.is_closed()
    }

    async fn close_on_completion(&mut self) -> Result<(), StatementError> {
        self.delegate.close_on_completion().await
    }

    fn is_close_on_completion(&self) -> Result<bool, StatementError> {
        self.delegate.is_close_on_completion()
    }

    fn max_field_size(&self) -> Result<usize, StatementError> {
        self.delegate.max_field_size()
    }

    fn set_max_field_size(&mut self, max: usize) -> Result<(), StatementError> {
        self.delegate.set_max_field_size(max)
    }

    fn max_rows(&self) -> Result<u32, StatementError> {
        self.delegate.max_rows()
    }

    fn set_max_rows(&mut self, max: u32) -> Result<(), StatementError> {
        self.delegate.set_max_rows(max)
    }

    fn large_max_rows(&self) -> Result<u64, StatementError> {
        self.delegate.large_max_rows()
    }

    fn set_large_max_rows(&mut self, max: u64) -> Result<(), StatementError> {
        self.delegate.set_large_max_rows(max)
    }

    fn query_timeout(&self) -> Result<Option<Duration>, StatementError> {
        self.delegate.query_timeout()
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), StatementError> {
        self.delegate.set_query_timeout(timeout)
    }

    fn fetch_direction(&self) -> Result<FetchDirection, StatementError> {
        self.delegate.fetch_direction()
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), StatementError> {
        self.delegate.set_fetch_direction(direction)
    }

    fn fetch_size(&self) -> Result<u32, StatementError> {
        self.delegate.fetch_size()
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), StatementError> {
        self.delegate.set_fetch_size(rows)
    }

    fn set_cursor_name(&mut self, name: &str) -> Result<(), StatementError> {
        self.delegate.set_cursor_name(name)
    }

    fn set_escape_processing(&mut self, enable: bool) -> Result<(), StatementError> {
        self.delegate.set_escape_processing(enable)
    }

    fn is_poolable(&self) -> Result<bool, StatementError> {
        self.delegate.is_poolable()
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), StatementError> {
        self.delegate.set_poolable(poolable)
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, StatementError> {
        self.delegate.result_set_concurrency()
    }

    fn result_set_type(&self) -> Result<ResultSetType, StatementError> {
        self.delegate.result_set_type()
    }

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, StatementError> {
        self.delegate.result_set_holdability()
    }

    fn warnings(&self) -> Result<Vec<String>, StatementError> {
        self.delegate.warnings()
    }

    fn clear_warnings(&mut self) -> Result<(), StatementError> {
        self.delegate.clear_warnings()
    }

    fn enquote_literal(&self, value: &str) -> Result<String, StatementError> {
        self.delegate.enquote_literal(value)
    }

    fn enquote_identifier(
        &self,
        identifier: &str,
        always_quote: bool,
    ) -> Result<String, StatementError> {
        self.delegate.enquote_identifier(identifier, always_quote)
    }

    fn is_simple_identifier(&self, identifier: &str) -> Result<bool, StatementError> {
        self.delegate.is_simple_identifier(identifier)
    }
}
