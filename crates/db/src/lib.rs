//! SQLite persistence for the lock subsystem.

use std::str::FromStr;
use std::time::Duration;

use mdedit_core::file_lock::STORE_BUSY_TIMEOUT_SECS;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};

pub mod lease_store;
pub mod models;
pub mod repositories;

pub use lease_store::SqliteLeaseStore;

pub type DbPool = sqlx::SqlitePool;

/// Create a connection pool from a database URL (e.g. `sqlite://work/locks.db`).
///
/// The database file is created if missing. Every connection runs in WAL
/// mode with `synchronous = FULL` so each committed lease write is durable,
/// and waits at most [`STORE_BUSY_TIMEOUT_SECS`] for SQLite's write lock.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    let busy_timeout = Duration::from_secs(STORE_BUSY_TIMEOUT_SECS);

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Full)
        .busy_timeout(busy_timeout);

    SqlitePoolOptions::new()
        .max_connections(8)
        .acquire_timeout(busy_timeout)
        .connect_with(options)
        .await
}

/// Cheap round-trip to confirm the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply the embedded migrations in `crates/db/migrations`.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
