//! SQLite connection pool with WAL mode.
//!
//! The review engine reads gate and vote rows far more often than it writes
//! them, so the pool runs SQLite in Write-Ahead Logging mode: readers are
//! never blocked by the single writer.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Type alias for the SQLite connection pool.
pub type DbPool = Pool<Sqlite>;

/// Create a new connection pool with WAL mode enabled.
///
/// # Arguments
/// * `db_path` - Path to the SQLite database file
///
/// # Returns
/// A connection pool ready for use
pub async fn create_pool(db_path: &Path) -> Result<DbPool, sqlx::Error> {
    let db_url = format!("sqlite:{}", db_path.display());

    let connect_options = SqliteConnectOptions::from_str(&db_url)?
        // Create the database file on first run
        .create_if_missing(true)
        // WAL: concurrent reads while a vote is being recorded
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL is durable enough under WAL
        .synchronous(SqliteSynchronous::Normal)
        // Gates reference stages reference features; enforce it
        .foreign_keys(true)
        // Writers queue up behind each other during sweeps
        .busy_timeout(std::time::Duration::from_secs(30))
        // Checkpoint every 1000 pages so the WAL file stays small
        .pragma("wal_autocheckpoint", "1000");

    let pool = SqlitePoolOptions::new()
        // SQLite serializes writes anyway; a small pool is enough
        .max_connections(5)
        .min_connections(1)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect_with(connect_options)
        .await?;

    // Verify WAL mode took effect
    let mode: (String,) = sqlx::query_as("PRAGMA journal_mode")
        .fetch_one(&pool)
        .await?;

    debug_assert!(
        mode.0.to_lowercase() == "wal",
        "WAL mode should be enabled, got: {}",
        mode.0
    );

    Ok(pool)
}
