//! Convenient imports for common functionality.
//!
//! Brings the `Statement` trait into scope along with the proxy, the stock
//! listeners and the value types.

pub use crate::error::StatementError;
pub use crate::listener::{FanOutListener, RecordingListener, StatementListener, TracingListener};
pub use crate::options::ProxyOptions;
pub use crate::proxy::{StatementInterceptor, StatementProxy};
pub use crate::results::{DbRow, ResultSet};
pub use crate::statement::Statement;
pub use crate::types::{CurrentResult, GeneratedKeys, RowValues};

#[cfg(feature = "postgres")]
pub use crate::postgres::PostgresStatement;
#[cfg(feature = "sqlite")]
pub use crate::sqlite::SqliteStatement;
