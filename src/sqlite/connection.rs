use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;

use crate::error::StatementError;

/// A rusqlite connection shared by every statement created on it.
pub type SharedSqliteConnection = Arc<Mutex<rusqlite::Connection>>;

/// Run `func` against the connection on tokio's blocking pool.
pub(crate) async fn run_blocking<F, R>(
    conn: SharedSqliteConnection,
    func: F,
) -> Result<R, StatementError>
where
    F: FnOnce(&mut rusqlite::Connection) -> Result<R, StatementError> + Send + 'static,
    R: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let mut guard = conn.blocking_lock();
        func(&mut guard)
    })
    .await
    .map_err(|e| StatementError::ExecutionError(format!("sqlite spawn_blocking join error: {e}")))?
}

/// `SQLite` has no per-statement timeout; the closest knob is how long to wait on a locked database.
pub(crate) fn apply_query_timeout(
    conn: &rusqlite::Connection,
    timeout: Option<Duration>,
) -> Result<(), StatementError> {
    if let Some(timeout) = timeout {
        conn.busy_timeout(timeout)?;
    }
    Ok(())
}
