use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::StatementError;

/// Sink for execution notifications.
///
/// Called synchronously on the caller's thread, once per statement and before
/// the statement is handed to the delegate. Implementations must be fast: a
/// slow listener slows every intercepted call. An error returned here aborts
/// the call it was raised from and reaches the caller unchanged, so a failing
/// listener can stop an otherwise healthy statement.
pub trait StatementListener: Send + Sync {
    /// Record that `sql` is about to be submitted.
    ///
    /// # Errors
    /// Any error is propagated to the caller of the intercepted operation.
    fn statement_executed(&self, sql: &str) -> Result<(), StatementError>;
}

impl<F> StatementListener for F
where
    F: Fn(&str) -> Result<(), StatementError> + Send + Sync,
{
    fn statement_executed(&self, sql: &str) -> Result<(), StatementError> {
        self(sql)
    }
}

/// Keeps every notification, in order, duplicates included.
#[derive(Debug, Default)]
pub struct RecordingListener {
    statements: Mutex<Vec<String>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        // A panic while pushing cannot leave the Vec half-written.
        self.statements
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Snapshot of the statements seen so far.
    #[must_use]
    pub fn statements(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Drain the recorded statements.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lock())
    }

    /// How many times exactly `sql` was seen.
    #[must_use]
    pub fn count_of(&self, sql: &str) -> usize {
        self.lock().iter().filter(|s| *s == sql).count()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

impl StatementListener for RecordingListener {
    fn statement_executed(&self, sql: &str) -> Result<(), StatementError> {
        self.lock().push(sql.to_string());
        Ok(())
    }
}

/// Emits one `tracing` event per statement under the `sql_statement_proxy::listener` target.
#[derive(Debug, Clone, Default)]
pub struct TracingListener {
    label: Option<String>,
}

impl TracingListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
        }
    }
}

impl StatementListener for TracingListener {
    fn statement_executed(&self, sql: &str) -> Result<(), StatementError> {
        tracing::info!(
            target: "sql_statement_proxy::listener",
            label = self.label.as_deref().unwrap_or_default(),
            sql,
            "statement executed"
        );
        Ok(())
    }
}

/// Forwards each notification to several listeners in registration order,
/// stopping at the first error.
#[derive(Default, Clone)]
pub struct FanOutListener {
    listeners: Vec<Arc<dyn StatementListener>>,
}

impl FanOutListener {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, listener: Arc<dyn StatementListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn push(&mut self, listener: Arc<dyn StatementListener>) {
        self.listeners.push(listener);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl std::fmt::Debug for FanOutListener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FanOutListener")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl StatementListener for FanOutListener {
    fn statement_executed(&self, sql: &str) -> Result<(), StatementError> {
        for listener in &self.listeners {
            listener.statement_executed(sql)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_listener_keeps_order_and_duplicates() {
        let listener = RecordingListener::new();
        for sql in ["SELECT 1", "SELECT 2", "SELECT 1"] {
            listener.statement_executed(sql).unwrap();
        }
        assert_eq!(listener.statements(), vec!["SELECT 1", "SELECT 2", "SELECT 1"]);
        assert_eq!(listener.count_of("SELECT 1"), 2);
        assert_eq!(listener.take().len(), 3);
        assert!(listener.is_empty());
    }

    #[test]
    fn closures_are_listeners() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener = move |sql: &str| -> Result<(), StatementError> {
            sink.lock().unwrap().push(sql.len());
            Ok(())
        };
        listener.statement_executed("abc").unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn fan_out_stops_at_first_error() {
        let first = Arc::new(RecordingListener::new());
        let last = Arc::new(RecordingListener::new());
        let failing: Arc<dyn StatementListener> = Arc::new(|_: &str| -> Result<(), StatementError> {
            Err(StatementError::ListenerError("sink full".into()))
        });
        let fan_out = FanOutListener::new()
            .with(first.clone())
            .with(failing)
            .with(last.clone());

        let err = fan_out.statement_executed("SELECT 1").unwrap_err();
        assert!(matches!(err, StatementError::ListenerError(msg) if msg == "sink full"));
        assert_eq!(first.statements(), vec!["SELECT 1"]);
        assert!(last.is_empty());
    }
}
