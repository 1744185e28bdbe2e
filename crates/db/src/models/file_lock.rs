//! `file_locks` row model and lock request DTOs.

use mdedit_core::file_lock::Lease;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `file_locks` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct FileLock {
    pub file_path: String,
    pub session_id: String,
    pub timestamp: String,
    pub created_at: String,
}

impl From<FileLock> for Lease {
    fn from(row: FileLock) -> Self {
        Lease {
            file_path: row.file_path,
            session_id: row.session_id,
            timestamp: row.timestamp,
            created_at: row.created_at,
        }
    }
}

/// Body of `POST /api/file/lock`.
///
/// Every field is optional at the serde level so that missing values reach
/// the handler and are reported as 400 rather than a deserialization error.
#[derive(Debug, Default, Deserialize)]
pub struct LockActionRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    /// Accepted for client compatibility; has no effect.
    #[serde(default)]
    pub force: bool,
}

/// Query of `GET /api/file/lock`.
#[derive(Debug, Deserialize)]
pub struct LockStatusQuery {
    #[serde(default)]
    pub path: Option<String>,
}
