//! Database initialization
//!
//! Creates the database file and the `pois` table on first run and opens the
//! existing database afterwards. Table creation is idempotent; schema
//! migration is out of scope.

use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Milliseconds a connection waits on a locked database before failing
const BUSY_TIMEOUT_MS: u64 = 5000;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // Journal mode and busy timeout apply to every pooled connection
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(4)
        .connect_with(options)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    create_pois_table(&pool).await?;

    Ok(pool)
}

/// Create the pois table
///
/// `external_id` carries the uniqueness guarantee the reconciler relies on:
/// `INSERT OR IGNORE` is only first-writer-wins because of this index.
pub async fn create_pois_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pois (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            external_id TEXT NOT NULL UNIQUE CHECK (length(external_id) > 0),
            name TEXT NOT NULL DEFAULT '',
            category TEXT NOT NULL DEFAULT '',
            latitude REAL,
            longitude REAL,
            avg_rating REAL,
            created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP,
            updated_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_pois_category ON pois(category)")
        .execute(pool)
        .await?;

    Ok(())
}
