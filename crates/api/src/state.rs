use std::sync::Arc;

use mdedit_core::file_lock::LockManager;
use mdedit_db::SqliteLeaseStore;

use crate::attachments::AttachmentStore;
use crate::config::ServerConfig;
use crate::documents::{DocumentGate, DocumentStore};

/// The lock manager over the SQLite lease store.
pub type FileLocks = LockManager<SqliteLeaseStore>;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (lock store).
    pub pool: mdedit_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// File lock manager, shared with the janitor.
    pub locks: Arc<FileLocks>,
    /// Lock-aware document access.
    pub documents: Arc<DocumentGate<SqliteLeaseStore>>,
    /// Deduplicating attachment storage.
    pub attachments: Arc<AttachmentStore>,
}

impl AppState {
    /// Wire every service over one pool and configuration.
    pub fn new(pool: mdedit_db::DbPool, config: ServerConfig) -> Self {
        let locks = Arc::new(LockManager::new(SqliteLeaseStore::new(pool.clone())));
        let documents = Arc::new(DocumentGate::new(
            Arc::clone(&locks),
            DocumentStore::new(config.documents_dir()),
        ));
        let attachments = Arc::new(AttachmentStore::new(config.attachments_dir()));

        Self {
            pool,
            config: Arc::new(config),
            locks,
            documents,
            attachments,
        }
    }
}
