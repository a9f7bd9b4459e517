//! Run SQL through an intercepted statement and print what the listener saw.
//!
//! ```text
//! cargo run --example trace_statements -- \
//!     --sql "CREATE TABLE t (id INTEGER)" \
//!     --batch "INSERT INTO t VALUES (1)" --batch "INSERT INTO t VALUES (2)" \
//!     --sql "SELECT * FROM t"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sql_statement_proxy::prelude::*;
use sql_statement_proxy::DatabaseType;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(author, version, about = "Trace the SQL a statement sends to the database")]
struct Args {
    #[arg(long, value_enum, default_value = "sqlite")]
    db_type: DatabaseType,
    /// SQLite file (in-memory when absent) or a Postgres connection string.
    #[arg(long)]
    db: Option<String>,
    /// Executed immediately, in order.
    #[arg(long)]
    sql: Vec<String>,
    /// Queued and flushed as one batch after the immediate statements.
    #[arg(long)]
    batch: Vec<String>,
    /// Proxy options as JSON, e.g. '{"log_statements": true, "label": "demo"}'.
    #[arg(long)]
    options: Option<String>,
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_target(true)
        .with_max_level(if args.verbose { Level::DEBUG } else { Level::INFO })
        .init();

    let options = match &args.options {
        Some(json) => ProxyOptions::from_json(json)?,
        None => ProxyOptions::builder().log_statements(args.verbose).finish(),
    };
    let recording = Arc::new(RecordingListener::new());
    let listener = FanOutListener::new()
        .with(Arc::new(TracingListener::with_label("demo")))
        .with(recording.clone());
    let interceptor = StatementInterceptor::new(Arc::new(listener)).with_options(options);

    match args.db_type {
        DatabaseType::Sqlite => {
            let delegate = match &args.db {
                Some(path) => SqliteStatement::open(PathBuf::from(path))?,
                None => SqliteStatement::open_in_memory()?,
            };
            run(interceptor.wrap(delegate), &args).await?;
        }
        DatabaseType::Postgres => {
            #[cfg(feature = "postgres")]
            {
                let url = args.db.as_deref().ok_or("--db is required for postgres")?;
                let delegate = PostgresStatement::connect(url).await?;
                run(interceptor.wrap(delegate), &args).await?;
            }
            #[cfg(not(feature = "postgres"))]
            return Err("built without the postgres feature".into());
        }
    }

    println!("listener saw {} statement(s):", recording.len());
    for (i, sql) in recording.statements().iter().enumerate() {
        println!("  {:>3}  {sql}", i + 1);
    }
    Ok(())
}

async fn run<S: Statement>(
    mut stmt: StatementProxy<S>,
    args: &Args,
) -> Result<(), StatementError> {
    for sql in &args.sql {
        if stmt.execute(sql).await? {
            if let Some(rs) = stmt.result_set().await? {
                println!("{}", rs.column_names().join(" | "));
                for row in &rs.results {
                    let cells: Vec<String> = row.values.iter().map(|v| format!("{v:?}")).collect();
                    println!("{}", cells.join(" | "));
                }
            }
        } else if let Some(n) = stmt.large_update_count().await? {
            println!("{n} row(s) affected");
        }
    }

    if !args.batch.is_empty() {
        for sql in &args.batch {
            stmt.add_batch(sql).await?;
        }
        let counts = stmt.execute_large_batch().await?;
        println!("batch update counts: {counts:?}");
    }

    stmt.close().await
}
