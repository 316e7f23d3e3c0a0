//! Database initialization
//!
//! Creates the database file on first run, applies connection pragmas on
//! every pooled connection, creates the submissions table and brings older
//! tables up to the current column set.

use crate::db::schema::{create_table_sql, sync_table, SUBMISSIONS_TABLE, SUBMISSION_COLUMNS};
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Lock wait before SQLite reports SQLITE_BUSY
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows concurrent readers with one writer
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(BUSY_TIMEOUT);

    // Schema changes run on their own connection, closed before the serving
    // pool opens, so no pooled connection holds statements prepared against
    // the pre-sync column set.
    let schema_pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options.clone())
        .await?;
    let schema_result = create_schema(&schema_pool).await;
    schema_pool.close().await;
    schema_result?;

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    Ok(pool)
}

/// Create the submissions table and add any columns it is missing
///
/// Idempotent - safe to call on every startup.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(&create_table_sql(SUBMISSIONS_TABLE, SUBMISSION_COLUMNS))
        .execute(pool)
        .await?;

    let added = sync_table(pool, SUBMISSIONS_TABLE, SUBMISSION_COLUMNS).await?;
    if !added.is_empty() {
        info!("Schema sync added columns: {}", added.join(", "));
    }

    Ok(())
}
