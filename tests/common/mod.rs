#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sql_statement_proxy::prelude::*;
use sql_statement_proxy::{
    FetchDirection, ResultSetConcurrency, ResultSetHoldability, ResultSetType, StatementState,
};

/// Everything that happened, listener notifications and delegate calls interleaved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Notified(String),
    Called(&'static str, Option<String>),
}

pub fn notified(sql: &str) -> Event {
    Event::Notified(sql.to_string())
}

pub fn called(op: &'static str) -> Event {
    Event::Called(op, None)
}

pub fn called_with(op: &'static str, sql: &str) -> Event {
    Event::Called(op, Some(sql.to_string()))
}

#[derive(Debug, Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<Event>>>);

impl Journal {
    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }

    pub fn notifications(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Notified(sql) => Some(sql),
                Event::Called(..) => None,
            })
            .collect()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                Event::Called(op, _) => Some(op),
                Event::Notified(_) => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.0.lock().unwrap().clear();
    }

    /// A listener writing into this journal.
    pub fn listener(&self) -> Arc<dyn StatementListener> {
        let journal = self.clone();
        Arc::new(move |sql: &str| -> Result<(), StatementError> {
            journal.push(Event::Notified(sql.to_string()));
            Ok(())
        })
    }

    /// A listener that journals, then fails once it has seen `fail_on`.
    pub fn failing_listener(&self, fail_on: &str) -> Arc<dyn StatementListener> {
        let journal = self.clone();
        let fail_on = fail_on.to_string();
        Arc::new(move |sql: &str| -> Result<(), StatementError> {
            journal.push(Event::Notified(sql.to_string()));
            if sql == fail_on {
                Err(StatementError::ListenerError(format!("rejected {sql}")))
            } else {
                Ok(())
            }
        })
    }
}

/// In-memory delegate that journals every call and answers deterministically.
///
/// Texts starting with `SELECT` produce a one-row result set holding the text;
/// everything else affects `rows_per_update` rows.
#[derive(Debug)]
pub struct ScriptedStatement {
    journal: Journal,
    state: StatementState,
    batch: Vec<String>,
    fail_next: Option<String>,
    fail_flush: Option<String>,
    pub rows_per_update: u64,
}

impl ScriptedStatement {
    pub fn new(journal: &Journal) -> Self {
        Self {
            journal: journal.clone(),
            state: StatementState::new(),
            batch: Vec::new(),
            fail_next: None,
            fail_flush: None,
            rows_per_update: 1,
        }
    }

    /// Make the next call carrying SQL text fail with `ExecutionError(message)`.
    pub fn fail_next(&mut self, message: &str) {
        self.fail_next = Some(message.to_string());
    }

    /// Make the next batch flush fail with `BatchError` after running nothing.
    pub fn fail_flush(&mut self, message: &str) {
        self.fail_flush = Some(message.to_string());
    }

    pub fn queued(&self) -> &[String] {
        &self.batch
    }

    fn call(&self, op: &'static str) {
        self.journal.push(Event::Called(op, None));
    }

    fn call_sql(&mut self, op: &'static str, sql: &str) -> Result<(), StatementError> {
        self.journal.push(Event::Called(op, Some(sql.to_string())));
        self.state.ensure_open(op)?;
        match self.fail_next.take() {
            Some(message) => Err(StatementError::ExecutionError(message)),
            None => Ok(()),
        }
    }

    fn rows_for(sql: &str) -> ResultSet {
        let mut rs = ResultSet::new(vec!["sql".to_string()]);
        rs.add_row_values(vec![RowValues::Text(sql.to_string())]);
        rs
    }

    fn run(&mut self, op: &'static str, sql: &str, keys: &GeneratedKeys) -> Result<bool, StatementError> {
        self.call_sql(op, sql)?;
        self.state.reset_results();
        if keys.is_requested() {
            let mut generated = ResultSet::new(vec!["id".to_string()]);
            generated.add_row_values(vec![RowValues::Int(42)]);
            self.state.record_generated_keys(generated);
        }
        if sql.starts_with("SELECT") {
            self.state.record_result_set(Self::rows_for(sql));
            Ok(true)
        } else {
            self.state.record_update_count(self.rows_per_update);
            Ok(false)
        }
    }

    fn flush(&mut self, op: &'static str) -> Result<Vec<u64>, StatementError> {
        self.call(op);
        self.state.ensure_open(op)?;
        let queued = std::mem::take(&mut self.batch);
        if let Some(message) = self.fail_flush.take() {
            return Err(StatementError::BatchError {
                index: 0,
                update_counts: Vec::new(),
                message,
            });
        }
        Ok(vec![self.rows_per_update; queued.len()])
    }
}

#[async_trait]
impl Statement for ScriptedStatement {
    async fn execute(&mut self, sql: &str) -> Result<bool, StatementError> {
        self.run("execute", sql, &GeneratedKeys::None)
    }

    async fn execute_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<bool, StatementError> {
        self.run("execute_with_keys", sql, &keys)
    }

    async fn execute_query(&mut self, sql: &str) -> Result<ResultSet, StatementError> {
        self.call_sql("execute_query", sql)?;
        Ok(Self::rows_for(sql))
    }

    async fn execute_update(&mut self, sql: &str) -> Result<u32, StatementError> {
        self.run("execute_update", sql, &GeneratedKeys::None)?;
        Ok(u32::try_from(self.rows_per_update).unwrap())
    }

    async fn execute_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u32, StatementError> {
        self.run("execute_update_with_keys", sql, &keys)?;
        Ok(u32::try_from(self.rows_per_update).unwrap())
    }

    async fn execute_large_update(&mut self, sql: &str) -> Result<u64, StatementError> {
        self.run("execute_large_update", sql, &GeneratedKeys::None)?;
        Ok(self.rows_per_update)
    }

    async fn execute_large_update_with_keys(
        &mut self,
        sql: &str,
        keys: GeneratedKeys,
    ) -> Result<u64, StatementError> {
        self.run("execute_large_update_with_keys", sql, &keys)?;
        Ok(self.rows_per_update)
    }

    async fn add_batch(&mut self, sql: &str) -> Result<(), StatementError> {
        self.call_sql("add_batch", sql)?;
        self.batch.push(sql.to_string());
        Ok(())
    }

    async fn clear_batch(&mut self) -> Result<(), StatementError> {
        self.call("clear_batch");
        self.batch.clear();
        Ok(())
    }

    async fn execute_batch(&mut self) -> Result<Vec<u32>, StatementError> {
        Ok(self
            .flush("execute_batch")?
            .into_iter()
            .map(|n| u32::try_from(n).unwrap())
            .collect())
    }

    async fn execute_large_batch(&mut self) -> Result<Vec<u64>, StatementError> {
        self.flush("execute_large_batch")
    }

    async fn result_set(&mut self) -> Result<Option<ResultSet>, StatementError> {
        self.call("result_set");
        self.state.ensure_open("result_set")?;
        Ok(self.state.take_result_set())
    }

    async fn update_count(&mut self) -> Result<Option<u32>, StatementError> {
        self.call("update_count");
        self.state.ensure_open("update_count")?;
        Ok(self.state.update_count().map(|n| u32::try_from(n).unwrap()))
    }

    async fn large_update_count(&mut self) -> Result<Option<u64>, StatementError> {
        self.call("large_update_count");
        self.state.ensure_open("large_update_count")?;
        Ok(self.state.update_count())
    }

    async fn more_results(&mut self, current: CurrentResult) -> Result<bool, StatementError> {
        self.call("more_results");
        self.state.ensure_open("more_results")?;
        Ok(self.state.more_results(current))
    }

    async fn generated_keys(&mut self) -> Result<ResultSet, StatementError> {
        self.call("generated_keys");
        self.state.ensure_open("generated_keys")?;
        Ok(self.state.take_generated_keys())
    }

    async fn cancel(&mut self) -> Result<(), StatementError> {
        self.call("cancel");
        self.state.ensure_open("cancel")
    }

    async fn close(&mut self) -> Result<(), StatementError> {
        self.call("close");
        self.state.mark_closed();
        self.batch.clear();
        Ok(())
    }

    fn is_closed(&self) -> Result<bool, StatementError> {
        self.call("is_closed");
        Ok(self.state.is_closed())
    }

    async fn close_on_completion(&mut self) -> Result<(), StatementError> {
        self.call("close_on_completion");
        self.state.ensure_open("close_on_completion")?;
        self.state.close_on_completion = true;
        Ok(())
    }

    fn is_close_on_completion(&self) -> Result<bool, StatementError> {
        self.call("is_close_on_completion");
        Ok(self.state.close_on_completion)
    }

    fn max_field_size(&self) -> Result<usize, StatementError> {
        self.call("max_field_size");
        Ok(self.state.max_field_size)
    }

    fn set_max_field_size(&mut self, max: usize) -> Result<(), StatementError> {
        self.call("set_max_field_size");
        self.state.ensure_open("set_max_field_size")?;
        self.state.max_field_size = max;
        Ok(())
    }

    fn max_rows(&self) -> Result<u32, StatementError> {
        self.call("max_rows");
        Ok(u32::try_from(self.state.max_rows).unwrap_or(u32::MAX))
    }

    fn set_max_rows(&mut self, max: u32) -> Result<(), StatementError> {
        self.call("set_max_rows");
        self.state.ensure_open("set_max_rows")?;
        self.state.max_rows = u64::from(max);
        Ok(())
    }

    fn large_max_rows(&self) -> Result<u64, StatementError> {
        self.call("large_max_rows");
        Ok(self.state.max_rows)
    }

    fn set_large_max_rows(&mut self, max: u64) -> Result<(), StatementError> {
        self.call("set_large_max_rows");
        self.state.ensure_open("set_large_max_rows")?;
        self.state.max_rows = max;
        Ok(())
    }

    fn query_timeout(&self) -> Result<Option<Duration>, StatementError> {
        self.call("query_timeout");
        Ok(self.state.query_timeout)
    }

    fn set_query_timeout(&mut self, timeout: Option<Duration>) -> Result<(), StatementError> {
        self.call("set_query_timeout");
        self.state.ensure_open("set_query_timeout")?;
        self.state.set_query_timeout(timeout);
        Ok(())
    }

    fn fetch_direction(&self) -> Result<FetchDirection, StatementError> {
        self.call("fetch_direction");
        Ok(self.state.fetch_direction)
    }

    fn set_fetch_direction(&mut self, direction: FetchDirection) -> Result<(), StatementError> {
        self.call("set_fetch_direction");
        self.state.fetch_direction = direction;
        Ok(())
    }

    fn fetch_size(&self) -> Result<u32, StatementError> {
        self.call("fetch_size");
        Ok(self.state.fetch_size)
    }

    fn set_fetch_size(&mut self, rows: u32) -> Result<(), StatementError> {
        self.call("set_fetch_size");
        self.state.fetch_size = rows;
        Ok(())
    }

    fn set_cursor_name(&mut self, name: &str) -> Result<(), StatementError> {
        self.call("set_cursor_name");
        self.state.cursor_name = Some(name.to_string());
        Ok(())
    }

    fn set_escape_processing(&mut self, enable: bool) -> Result<(), StatementError> {
        self.call("set_escape_processing");
        self.state.escape_processing = enable;
        Ok(())
    }

    fn is_poolable(&self) -> Result<bool, StatementError> {
        self.call("is_poolable");
        Ok(self.state.poolable)
    }

    fn set_poolable(&mut self, poolable: bool) -> Result<(), StatementError> {
        self.call("set_poolable");
        self.state.poolable = poolable;
        Ok(())
    }

    fn result_set_concurrency(&self) -> Result<ResultSetConcurrency, StatementError> {
        self.call("result_set_concurrency");
        Ok(ResultSetConcurrency::Updatable)
    }

    fn result_set_type(&self) -> Result<ResultSetType, StatementError> {
        self.call("result_set_type");
        Ok(ResultSetType::ScrollInsensitive)
    }

    fn result_set_holdability(&self) -> Result<ResultSetHoldability, StatementError> {
        self.call("result_set_holdability");
        Ok(ResultSetHoldability::HoldCursorsOverCommit)
    }

    fn warnings(&self) -> Result<Vec<String>, StatementError> {
        self.call("warnings");
        Ok(self.state.warnings().to_vec())
    }

    fn clear_warnings(&mut self) -> Result<(), StatementError> {
        self.call("clear_warnings");
        self.state.clear_warnings();
        Ok(())
    }

    fn enquote_literal(&self, value: &str) -> Result<String, StatementError> {
        self.call("enquote_literal");
        Ok(format!("'{}'", value.replace('\'', "''")))
    }
}

/// A proxy over a fresh scripted delegate, both reporting into `journal`.
pub fn scripted_proxy(journal: &Journal) -> StatementProxy<ScriptedStatement> {
    StatementProxy::new(ScriptedStatement::new(journal), journal.listener())
}
