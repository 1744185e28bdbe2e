//! [`LeaseStore`] over the SQLite `file_locks` table.

use mdedit_core::file_lock::{Lease, LeaseClaim, LeaseStore};
use mdedit_core::types::Timestamp;

use crate::repositories::FileLockRepo;
use crate::DbPool;

/// Durable lease store. Cloning shares the underlying pool.
#[derive(Debug, Clone)]
pub struct SqliteLeaseStore {
    pool: DbPool,
}

impl SqliteLeaseStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl LeaseStore for SqliteLeaseStore {
    type Error = sqlx::Error;

    async fn get(&self, file_path: &str) -> Result<Option<Lease>, sqlx::Error> {
        Ok(FileLockRepo::find(&self.pool, file_path)
            .await?
            .map(Lease::from))
    }

    async fn insert_if_absent(&self, claim: &LeaseClaim) -> Result<bool, sqlx::Error> {
        FileLockRepo::insert_if_absent(&self.pool, &claim.file_path, &claim.session_id, claim.at)
            .await
    }

    async fn update_if_owner_or_expired(
        &self,
        claim: &LeaseClaim,
        expired_before: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        FileLockRepo::update_if_owner_or_expired(
            &self.pool,
            &claim.file_path,
            &claim.session_id,
            claim.at,
            expired_before,
        )
        .await
    }

    async fn delete_if_owner(&self, file_path: &str, session_id: &str) -> Result<bool, sqlx::Error> {
        FileLockRepo::delete_if_owner(&self.pool, file_path, session_id).await
    }

    async fn delete(&self, file_path: &str) -> Result<bool, sqlx::Error> {
        FileLockRepo::delete(&self.pool, file_path).await
    }

    async fn list_fresh(&self, expired_before: Timestamp) -> Result<Vec<Lease>, sqlx::Error> {
        let rows = FileLockRepo::list_fresh(&self.pool, expired_before).await?;
        Ok(rows.into_iter().map(Lease::from).collect())
    }

    async fn delete_expired(&self, expired_before: Timestamp) -> Result<u64, sqlx::Error> {
        let deleted = FileLockRepo::delete_expired(&self.pool, expired_before).await?;
        tracing::debug!(deleted, %expired_before, "Deleted expired file locks");
        Ok(deleted)
    }

    async fn clear_all(&self) -> Result<u64, sqlx::Error> {
        let cleared = FileLockRepo::clear_all(&self.pool).await?;
        tracing::info!(cleared, "Cleared all file locks");
        Ok(cleared)
    }
}
