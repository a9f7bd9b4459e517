// PostgreSQL backend - a `Statement` implementation over tokio-postgres
//
// - query: row decoding and result set building
// - statement: `PostgresStatement`

pub mod query;
pub mod statement;

pub use query::build_result_set;
pub use statement::PostgresStatement;
