//! Statement interception.
//!
//! `StatementProxy` wraps a `Statement` and is itself a `Statement`: every
//! operation is forwarded to the wrapped delegate, and the operations that send
//! SQL to the database first notify a `StatementListener` with the literal SQL
//! text. Notification always precedes delegation, so a statement that fails
//! inside the database has still been reported.
//!
//! ```rust
//! use std::sync::Arc;
//! use sql_statement_proxy::prelude::*;
//!
//! # #[cfg(feature = "sqlite")]
//! # async fn demo() -> Result<(), StatementError> {
//! let listener = Arc::new(RecordingListener::new());
//! let mut stmt = StatementProxy::new(SqliteStatement::open_in_memory()?, listener.clone());
//!
//! stmt.execute_update("CREATE TABLE a (id INTEGER)").await?;
//! stmt.add_batch("INSERT INTO a VALUES (1)").await?;
//! stmt.add_batch("INSERT INTO a VALUES (2)").await?;
//! stmt.execute_batch().await?;
//!
//! assert_eq!(
//!     listener.statements(),
//!     vec![
//!         "CREATE TABLE a (id INTEGER)",
//!         "INSERT INTO a VALUES (1)",
//!         "INSERT INTO a VALUES (2)",
//!     ]
//! );
//! # Ok(()) }
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::StatementError;
use crate::listener::StatementListener;
use crate::options::ProxyOptions;
use crate::statement::Statement;

pub mod batch;
mod forward;

pub use batch::{BatchState, PendingBatch};

const LOG_TARGET: &str = "sql_statement_proxy";

/// A `Statement` that reports executed SQL to a listener.
///
/// The proxy owns its delegate for the delegate's whole usable life and is the
/// only path to it, which keeps the pending batch in step with the delegate's
/// own batch. It adds no locking: use it exactly as concurrently as the
/// delegate allows.
///
/// A successful `close` empties the pending batch, matching the delegate,
/// which discards its own batch on close. A failed `close` leaves it alone.
pub struct StatementProxy<S: Statement> {
    delegate: S,
    listener: Arc<dyn StatementListener>,
    pending: PendingBatch,
    options: ProxyOptions,
}

impl<S: Statement> StatementProxy<S> {
    /// Wrap `delegate`, reporting to `listener`.
    #[must_use]
    pub fn new(delegate: S, listener: Arc<dyn StatementListener>) -> Self {
        Self::with_options(delegate, listener, ProxyOptions::default())
    }

    #[must_use]
    pub fn with_options(
        delegate: S,
        listener: Arc<dyn StatementListener>,
        options: ProxyOptions,
    ) -> Self {
        Self {
            delegate,
            listener,
            pending: PendingBatch::new(),
            options,
        }
    }

    /// Read-only view of the wrapped statement.
    #[must_use]
    pub fn delegate(&self) -> &S {
        &self.delegate
    }

    #[must_use]
    pub fn listener(&self) -> &Arc<dyn StatementListener> {
        &self.listener
    }

    /// Statements queued since the last clear or flush.
    #[must_use]
    pub fn pending_batch(&self) -> &PendingBatch {
        &self.pending
    }

    #[must_use]
    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// Stop intercepting and hand the delegate back. Queued statements are discarded
    /// from the proxy's view but stay queued in the delegate.
    pub fn into_inner(self) -> S {
        self.delegate
    }

    fn notify(&self, op: &'static str, sql: &str) -> Result<(), StatementError> {
        if self.options.log_statements {
            tracing::debug!(target: LOG_TARGET, label = self.options.label(), op, sql, "intercepted");
        }
        self.listener.statement_executed(sql)
    }

    /// Report every queued statement, then empty the queue.
    ///
    /// A listener error stops the flush before the queue is touched, so the
    /// queue still matches the delegate's batch, which has not run either.
    fn flush_pending(&mut self, op: &'static str) -> Result<(), StatementError> {
        if self.options.log_statements {
            tracing::debug!(
                target: LOG_TARGET,
                label = self.options.label(),
                op,
                statements = self.pending.len(),
                "flushing batch"
            );
        }
        for sql in self.pending.iter() {
            self.listener.statement_executed(sql)?;
        }
        self.pending.clear();
        Ok(())
    }
}

impl<S: Statement + fmt::Debug> fmt::Debug for StatementProxy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementProxy")
            .field("delegate", &self.delegate)
            .field("pending", &self.pending)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

/// Produces proxies that share one listener and one set of options.
#[derive(Clone)]
pub struct StatementInterceptor {
    listener: Arc<dyn StatementListener>,
    options: ProxyOptions,
}

impl StatementInterceptor {
    #[must_use]
    pub fn new(listener: Arc<dyn StatementListener>) -> Self {
        Self {
            listener,
            options: ProxyOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ProxyOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn options(&self) -> &ProxyOptions {
        &self.options
    }

    /// Wrap `delegate` in a proxy reporting to this interceptor's listener.
    #[must_use]
    pub fn wrap<S: Statement>(&self, delegate: S) -> StatementProxy<S> {
        StatementProxy::with_options(delegate, Arc::clone(&self.listener), self.options.clone())
    }
}

impl fmt::Debug for StatementInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementInterceptor")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}
