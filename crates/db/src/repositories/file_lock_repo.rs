//! Repository for the `file_locks` table.
//!
//! Each method is a single auto-committed statement. The conditional ones
//! re-check ownership or expiry inside their own WHERE clause, which is what
//! makes them safe against concurrent callers.
//!
//! Expiry in SQL mirrors `mdedit_core::types::is_stale_stamp`: a row is
//! expired when its timestamp is not well formed or when `timestamp < cutoff`
//! as strings. All timestamps are written in the fixed-width format, so
//! string order is time order.

use mdedit_core::types::{format_timestamp, Timestamp};
use sqlx::SqlitePool;

use crate::models::file_lock::FileLock;

/// Column list for `file_locks` queries.
const COLUMNS: &str = "file_path, session_id, timestamp, created_at";

/// SQL predicate for a well-formed `timestamp`, the rule of
/// `mdedit_core::types::parse_timestamp`.
///
/// - the first 19 characters have the `YYYY-MM-DDTHH:MM:SS` shape,
/// - they survive a `strftime` round trip unchanged (real calendar date and
///   time; SQLite normalizes `02-30` or `24:00:00` into something else),
/// - the rest is empty or `.` followed by one or more digits.
const WELL_FORMED: &str = "(substr(timestamp, 1, 19) GLOB \
    '[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]T[0-9][0-9]:[0-9][0-9]:[0-9][0-9]' \
    AND strftime('%Y-%m-%dT%H:%M:%S', substr(timestamp, 1, 19)) IS substr(timestamp, 1, 19) \
    AND (length(timestamp) = 19 \
         OR (substr(timestamp, 20, 1) = '.' \
             AND length(timestamp) > 20 \
             AND substr(timestamp, 21) NOT GLOB '*[^0-9]*')))";

/// SQL predicate matching expired rows, comparing against the bind parameter
/// `cutoff` (e.g. `?` or `?4`).
fn expired(cutoff: &str) -> String {
    format!("(NOT {WELL_FORMED} OR timestamp < {cutoff})")
}

/// Provides the lease primitives over `file_locks`.
pub struct FileLockRepo;

impl FileLockRepo {
    /// Fetch the lock row for a path.
    pub async fn find(pool: &SqlitePool, file_path: &str) -> Result<Option<FileLock>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM file_locks WHERE file_path = ?");
        sqlx::query_as::<_, FileLock>(&query)
            .bind(file_path)
            .fetch_optional(pool)
            .await
    }

    /// Insert a lock unless one already exists for the path.
    ///
    /// Returns `false` on collision; the existing row is never overwritten.
    pub async fn insert_if_absent(
        pool: &SqlitePool,
        file_path: &str,
        session_id: &str,
        at: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let stamp = format_timestamp(at);
        let result = sqlx::query(
            "INSERT INTO file_locks (file_path, session_id, timestamp, created_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT (file_path) DO NOTHING",
        )
        .bind(file_path)
        .bind(session_id)
        .bind(&stamp)
        .bind(&stamp)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Stamp the lock with `session_id` at `at` if the caller already holds it
    /// or the stored lock is expired relative to `expired_before`.
    ///
    /// `created_at` is preserved for the same holder and reset on takeover.
    pub async fn update_if_owner_or_expired(
        pool: &SqlitePool,
        file_path: &str,
        session_id: &str,
        at: Timestamp,
        expired_before: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        let stamp = format_timestamp(at);
        let query = format!(
            "UPDATE file_locks \
             SET created_at = CASE WHEN session_id = ?1 THEN created_at ELSE ?2 END, \
                 session_id = ?1, \
                 timestamp = ?2 \
             WHERE file_path = ?3 \
               AND (session_id = ?1 OR {})",
            expired("?4")
        );
        let result = sqlx::query(&query)
            .bind(session_id)
            .bind(&stamp)
            .bind(file_path)
            .bind(format_timestamp(expired_before))
            .execute(pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Delete the lock only if `session_id` holds it.
    pub async fn delete_if_owner(
        pool: &SqlitePool,
        file_path: &str,
        session_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_locks WHERE file_path = ? AND session_id = ?")
            .bind(file_path)
            .bind(session_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete the lock on a path regardless of holder.
    pub async fn delete(pool: &SqlitePool, file_path: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_locks WHERE file_path = ?")
            .bind(file_path)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// All locks that are not expired relative to `expired_before`.
    pub async fn list_fresh(
        pool: &SqlitePool,
        expired_before: Timestamp,
    ) -> Result<Vec<FileLock>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM file_locks \
             WHERE NOT {} \
             ORDER BY file_path",
            expired("?")
        );
        sqlx::query_as::<_, FileLock>(&query)
            .bind(format_timestamp(expired_before))
            .fetch_all(pool)
            .await
    }

    /// Delete every lock that is expired at the time the statement runs.
    ///
    /// The expiry test is part of the DELETE itself, so a lock refreshed a
    /// moment earlier survives. Returns the number of rows removed.
    pub async fn delete_expired(
        pool: &SqlitePool,
        expired_before: Timestamp,
    ) -> Result<u64, sqlx::Error> {
        let query = format!("DELETE FROM file_locks WHERE {}", expired("?"));
        let result = sqlx::query(&query)
            .bind(format_timestamp(expired_before))
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }

    /// Remove every lock. Returns the number of rows removed.
    pub async fn clear_all(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM file_locks").execute(pool).await?;
        Ok(result.rows_affected())
    }
}
