// SQLite backend - a `Statement` implementation over rusqlite
//
// - connection: the shared connection handle and the blocking-pool runner
// - query: row decoding and result set building
// - statement: `SqliteStatement`

pub mod connection;
pub mod query;
pub mod statement;

pub use connection::SharedSqliteConnection;
pub use query::build_result_set;
pub use statement::SqliteStatement;
