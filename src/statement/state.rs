use std::time::Duration;

use crate::error::StatementError;
use crate::results::ResultSet;
use crate::types::{CurrentResult, FetchDirection, RowValues};

/// Bookkeeping shared by the concrete `Statement` backends: tuning settings,
/// lifecycle flags, warnings and the results of the last execution.
#[derive(Debug, Clone, Default)]
pub struct StatementState {
    pub max_field_size: usize,
    /// Zero means unlimited.
    pub max_rows: u64,
    pub query_timeout: Option<Duration>,
    pub fetch_direction: FetchDirection,
    pub fetch_size: u32,
    pub cursor_name: Option<String>,
    pub escape_processing: bool,
    pub poolable: bool,
    pub close_on_completion: bool,
    closed: bool,
    warnings: Vec<String>,
    result_set: Option<ResultSet>,
    update_count: Option<u64>,
    generated_keys: Option<ResultSet>,
}

impl StatementState {
    #[must_use]
    pub fn new() -> Self {
        Self {
            escape_processing: true,
            ..Self::default()
        }
    }

    /// Fail with `StatementError::Closed` once the statement has been closed.
    ///
    /// # Errors
    /// Returns `StatementError::Closed` naming `ctx` when the statement is closed.
    pub fn ensure_open(&self, ctx: &str) -> Result<(), StatementError> {
        if self.closed {
            Err(StatementError::Closed(ctx.to_string()))
        } else {
            Ok(())
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark the statement closed and drop any pending results.
    pub fn mark_closed(&mut self) {
        self.closed = true;
        self.reset_results();
    }

    /// Store the execution time limit; a zero duration means no limit.
    pub fn set_query_timeout(&mut self, timeout: Option<Duration>) {
        self.query_timeout = timeout.filter(|limit| !limit.is_zero());
    }

    /// Row cap to apply while collecting a result set.
    #[must_use]
    pub fn row_limit(&self) -> Option<usize> {
        match self.max_rows {
            0 => None,
            n => Some(usize::try_from(n).unwrap_or(usize::MAX)),
        }
    }

    /// Forget the results of the previous execution.
    pub fn reset_results(&mut self) {
        self.result_set = None;
        self.update_count = None;
        self.generated_keys = None;
    }

    pub fn record_result_set(&mut self, rs: ResultSet) {
        self.result_set = Some(rs);
        self.update_count = None;
    }

    pub fn record_update_count(&mut self, count: u64) {
        self.result_set = None;
        self.update_count = Some(count);
    }

    pub fn record_generated_keys(&mut self, keys: ResultSet) {
        self.generated_keys = Some(keys);
    }

    /// A query handed its rows straight to the caller.
    pub fn query_completed(&mut self) {
        if self.close_on_completion {
            self.mark_closed();
        }
    }

    /// Cut text and binary values down to `max_field_size` bytes; zero means unlimited.
    pub fn clamp_fields(&self, rs: &mut ResultSet) {
        let max = self.max_field_size;
        if max == 0 {
            return;
        }
        for value in rs.results.iter_mut().flat_map(|row| row.values.iter_mut()) {
            match value {
                RowValues::Text(s) if s.len() > max => {
                    let mut end = max;
                    while !s.is_char_boundary(end) {
                        end -= 1;
                    }
                    s.truncate(end);
                }
                RowValues::Blob(b) => b.truncate(max),
                _ => {}
            }
        }
    }

    pub fn take_result_set(&mut self) -> Option<ResultSet> {
        let rs = self.result_set.take();
        if rs.is_some() && self.close_on_completion {
            self.mark_closed();
        }
        rs
    }

    #[must_use]
    pub fn update_count(&self) -> Option<u64> {
        self.update_count
    }

    /// A statement yields at most one result, so advancing always exhausts it.
    pub fn more_results(&mut self, current: CurrentResult) -> bool {
        if current != CurrentResult::Keep {
            self.result_set = None;
        }
        self.update_count = None;
        false
    }

    pub fn take_generated_keys(&mut self) -> ResultSet {
        self.generated_keys.take().unwrap_or_default()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn clear_warnings(&mut self) {
        self.warnings.clear();
    }
}

/// Narrow a row count to the `u32` used by the ordinary update operations.
///
/// # Errors
/// Returns `StatementError::ExecutionError` when `count` does not fit.
pub(crate) fn narrow_count(count: u64) -> Result<u32, StatementError> {
    u32::try_from(count).map_err(|e| {
        StatementError::ExecutionError(format!(
            "update count {count} exceeds the ordinary range; use the large variant: {e}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_state_rejects_use() {
        let mut state = StatementState::new();
        assert!(state.ensure_open("execute").is_ok());
        state.record_update_count(3);
        state.mark_closed();
        assert!(matches!(
            state.ensure_open("execute"),
            Err(StatementError::Closed(ctx)) if ctx == "execute"
        ));
        assert_eq!(state.update_count(), None);
    }

    #[test]
    fn zero_query_timeout_is_no_limit() {
        let mut state = StatementState::new();
        state.set_query_timeout(Some(Duration::from_secs(2)));
        assert_eq!(state.query_timeout, Some(Duration::from_secs(2)));
        state.set_query_timeout(Some(Duration::ZERO));
        assert_eq!(state.query_timeout, None);
    }

    #[test]
    fn result_set_handed_out_once() {
        let mut state = StatementState::new();
        state.record_result_set(ResultSet::new(vec!["x".into()]));
        assert!(state.take_result_set().is_some());
        assert!(state.take_result_set().is_none());
        assert!(!state.is_closed());
    }

    #[test]
    fn close_on_completion_closes_after_result_taken() {
        let mut state = StatementState::new();
        state.close_on_completion = true;
        state.record_result_set(ResultSet::default());
        let _ = state.take_result_set();
        assert!(state.is_closed());
    }

    #[test]
    fn clamp_fields_respects_char_boundaries() {
        let mut state = StatementState::new();
        state.max_field_size = 2;
        let mut rs = ResultSet::new(vec!["t".into(), "b".into(), "n".into()]);
        rs.add_row_values(vec![
            RowValues::Text("héllo".into()),
            RowValues::Blob(vec![1, 2, 3]),
            RowValues::Int(12345),
        ]);
        state.clamp_fields(&mut rs);
        let row = &rs.results[0];
        assert_eq!(row.get("t").and_then(RowValues::as_text), Some("h"));
        assert_eq!(row.get("b").and_then(RowValues::as_blob), Some(&[1u8, 2][..]));
        assert_eq!(row.get("n"), Some(&RowValues::Int(12345)));
    }

    #[test]
    fn narrow_count_rejects_overflow() {
        assert_eq!(narrow_count(7).ok(), Some(7));
        assert!(narrow_count(u64::from(u32::MAX) + 1).is_err());
    }
}
