//! Lock-aware reads and writes of documents.

use std::sync::Arc;

use mdedit_core::file_lock::{AcquireOutcome, LeaseStore, LockManager, LockStatus};
use mdedit_core::types::Timestamp;
use serde::Serialize;
use serde_json::Value;

use super::{Document, DocumentError, DocumentStore};

/// Lock information attached to a document read (and to a 423 on save).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentLockView {
    pub is_locked: bool,
    pub lock_owner: Option<String>,
    pub lock_time: Option<String>,
    pub is_expired: bool,
    /// Whether the caller holds the lease after this request.
    pub lock_success: bool,
    /// Outcome message of the acquire attempt; `None` when none was made.
    pub lock_message: Option<String>,
}

impl From<LockStatus> for DocumentLockView {
    fn from(status: LockStatus) -> Self {
        Self {
            is_locked: status.is_locked,
            lock_owner: status.holder,
            lock_time: status.since,
            is_expired: status.is_expired,
            lock_success: false,
            lock_message: None,
        }
    }
}

impl From<AcquireOutcome> for DocumentLockView {
    fn from(outcome: AcquireOutcome) -> Self {
        Self {
            is_locked: outcome.holder.is_some(),
            lock_owner: outcome.holder,
            lock_time: outcome.since,
            is_expired: false,
            lock_success: outcome.granted,
            lock_message: Some(outcome.reason.message().to_string()),
        }
    }
}

/// A document read together with the caller's lock state.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenedDocument {
    #[serde(flatten)]
    pub document: Document,
    pub lock_status: DocumentLockView,
}

/// A save rejected because another session holds a live lease.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedDocument {
    pub path: String,
    pub lock: DocumentLockView,
}

#[derive(Debug, thiserror::Error)]
pub enum GateError<E> {
    #[error("Document '{}' is locked by another session", .0.path)]
    Locked(Box<LockedDocument>),

    #[error("session_id is required unless the save is forced")]
    MissingHolder,

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("Lock store error: {0}")]
    Store(#[source] E),
}

/// Routes document access through the lock manager.
#[derive(Debug)]
pub struct DocumentGate<S> {
    locks: Arc<LockManager<S>>,
    store: DocumentStore,
}

impl<S: LeaseStore> DocumentGate<S> {
    pub fn new(locks: Arc<LockManager<S>>, store: DocumentStore) -> Self {
        Self { locks, store }
    }

    pub fn locks(&self) -> &LockManager<S> {
        &self.locks
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Read a document and, when a holder is given, acquire or refresh its
    /// lease as a side effect.
    ///
    /// Lock contention never fails the read; it only shows up in the returned
    /// [`DocumentLockView`]. A lease store fault is logged and reported as
    /// `lock_success = false`.
    pub async fn open(
        &self,
        path: &str,
        holder: Option<&str>,
        now: Timestamp,
    ) -> Result<OpenedDocument, GateError<S::Error>> {
        let document = self.store.read(path).await?;

        let lock_status = match holder {
            Some(holder) => match self.locks.acquire(path, holder, now).await {
                Ok(outcome) => {
                    if outcome.granted {
                        tracing::debug!(
                            path = %path,
                            holder = %holder,
                            reason = outcome.reason.message(),
                            "Lock held on open"
                        );
                    }
                    DocumentLockView::from(outcome)
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path,
                        holder = %holder,
                        error = %e,
                        "Lock acquire failed on open"
                    );
                    DocumentLockView {
                        lock_message: Some("Lock unavailable".into()),
                        ..Default::default()
                    }
                }
            },
            None => match self.locks.status(path, now).await {
                Ok(status) => DocumentLockView::from(status),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "Lock status failed on open");
                    DocumentLockView::default()
                }
            },
        };

        Ok(OpenedDocument {
            document,
            lock_status,
        })
    }

    /// Write a document.
    ///
    /// Without `force` the holder must be granted the lease first, which
    /// covers no lease, its own lease and an expired lease of someone else.
    /// With `force` the write happens regardless and leases are left as they
    /// are.
    pub async fn save(
        &self,
        path: &str,
        content: &str,
        format_options: &Value,
        holder: Option<&str>,
        force: bool,
        now: Timestamp,
    ) -> Result<(), GateError<S::Error>> {
        if !force {
            let holder = holder.ok_or(GateError::MissingHolder)?;
            let outcome = self
                .locks
                .acquire(path, holder, now)
                .await
                .map_err(GateError::Store)?;

            if !outcome.granted {
                tracing::warn!(
                    path = %path,
                    holder = %holder,
                    owner = ?outcome.holder,
                    "Save rejected, document locked"
                );
                return Err(GateError::Locked(Box::new(LockedDocument {
                    path: path.to_string(),
                    lock: DocumentLockView::from(outcome),
                })));
            }
        }

        self.store.write(path, content, format_options).await?;
        tracing::info!(path = %path, holder = ?holder, force, "Document saved");
        Ok(())
    }

    /// Delete a document and drop any lease on it.
    pub async fn remove(&self, path: &str) -> Result<(), GateError<S::Error>> {
        self.store.delete(path).await?;
        if self.locks.forget(path).await.map_err(GateError::Store)? {
            tracing::info!(path = %path, "Dropped lock of deleted document");
        }
        tracing::info!(path = %path, "Document deleted");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{NaiveDate, TimeDelta};
    use mdedit_core::documents::default_format_options;
    use mdedit_core::file_lock::{LeaseStore, MemoryLeaseStore};
    use serde_json::json;

    use super::*;

    const PATH: &str = "notes/todo.md";

    fn t0() -> Timestamp {
        NaiveDate::from_ymd_opt(2026, 10, 15)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn secs(n: i64) -> Timestamp {
        t0() + TimeDelta::seconds(n)
    }

    fn gate() -> (tempfile::TempDir, DocumentGate<MemoryLeaseStore>) {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(LockManager::new(MemoryLeaseStore::new()));
        let gate = DocumentGate::new(locks, DocumentStore::new(dir.path()));
        (dir, gate)
    }

    async fn seed_document(gate: &DocumentGate<MemoryLeaseStore>) {
        gate.save(PATH, "# Todo", &default_format_options(), None, true, t0())
            .await
            .unwrap();
    }

    // -----------------------------------------------------------------------
    // open
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_open_with_holder_acquires() {
        let (_dir, gate) = gate();
        seed_document(&gate).await;

        let opened = gate.open(PATH, Some("A"), t0()).await.unwrap();
        assert_eq!(opened.document.content, "# Todo");
        assert!(opened.lock_status.lock_success);
        assert!(opened.lock_status.is_locked);
        assert_eq!(opened.lock_status.lock_owner.as_deref(), Some("A"));
        assert_eq!(opened.lock_status.lock_message.as_deref(), Some("Lock acquired"));
    }

    #[tokio::test]
    async fn test_open_while_locked_reports_owner() {
        let (_dir, gate) = gate();
        seed_document(&gate).await;
        gate.open(PATH, Some("A"), secs(0)).await.unwrap();

        let opened = gate.open(PATH, Some("B"), secs(30)).await.unwrap();
        assert_eq!(opened.document.content, "# Todo");
        assert!(!opened.lock_status.lock_success);
        assert_eq!(opened.lock_status.lock_owner.as_deref(), Some("A"));
        assert_eq!(
            opened.lock_status.lock_message.as_deref(),
            Some("Locked by other session")
        );
    }

    #[tokio::test]
    async fn test_open_without_holder_is_read_only() {
        let (_dir, gate) = gate();
        seed_document(&gate).await;

        let opened = gate.open(PATH, None, t0()).await.unwrap();
        assert!(!opened.lock_status.lock_success);
        assert!(!opened.lock_status.is_locked);
        assert!(gate.locks().store().is_empty());
    }

    #[tokio::test]
    async fn test_open_missing_document_touches_no_lock() {
        let (_dir, gate) = gate();
        assert_matches!(
            gate.open("ghost.md", Some("A"), t0()).await,
            Err(GateError::Document(DocumentError::NotFound { .. }))
        );
        assert!(gate.locks().store().is_empty());
    }

    #[tokio::test]
    async fn test_opened_document_serializes_flat() {
        let (_dir, gate) = gate();
        seed_document(&gate).await;

        let json = serde_json::to_value(gate.open(PATH, Some("A"), t0()).await.unwrap()).unwrap();
        assert_eq!(json["content"], "# Todo");
        assert_eq!(json["formatOptions"], default_format_options());
        assert_eq!(json["lockStatus"]["lockOwner"], "A");
        assert_eq!(json["lockStatus"]["lockSuccess"], true);
    }

    // -----------------------------------------------------------------------
    // save
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_save_by_holder_then_locked_for_other() {
        let (_dir, gate) = gate();
        let opts = json!({"font": "Georgia"});

        gate.save(PATH, "v1", &opts, Some("A"), false, secs(0)).await.unwrap();

        let err = gate
            .save(PATH, "v2", &opts, Some("B"), false, secs(5))
            .await
            .unwrap_err();
        assert_matches!(&err, GateError::Locked(locked) if locked.lock.lock_owner.as_deref() == Some("A"));

        let doc = gate.store().read(PATH).await.unwrap();
        assert_eq!(doc.content, "v1");
    }

    #[tokio::test]
    async fn test_save_takes_over_expired_lease() {
        let (_dir, gate) = gate();
        let opts = default_format_options();

        gate.save(PATH, "v1", &opts, Some("A"), false, secs(0)).await.unwrap();
        gate.save(PATH, "v2", &opts, Some("B"), false, secs(601)).await.unwrap();

        let lease = gate.locks().store().get(PATH).await.unwrap().unwrap();
        assert_eq!(lease.session_id, "B");
        assert_eq!(gate.store().read(PATH).await.unwrap().content, "v2");
    }

    #[tokio::test]
    async fn test_forced_save_ignores_and_keeps_lease() {
        let (_dir, gate) = gate();
        let opts = default_format_options();

        gate.save(PATH, "v1", &opts, Some("A"), false, secs(0)).await.unwrap();
        gate.save(PATH, "forced", &opts, Some("B"), true, secs(5)).await.unwrap();

        assert_eq!(gate.store().read(PATH).await.unwrap().content, "forced");
        let lease = gate.locks().store().get(PATH).await.unwrap().unwrap();
        assert_eq!(lease.session_id, "A");
    }

    #[tokio::test]
    async fn test_unforced_save_requires_holder() {
        let (_dir, gate) = gate();
        assert_matches!(
            gate.save(PATH, "x", &default_format_options(), None, false, t0()).await,
            Err(GateError::MissingHolder)
        );
    }

    // -----------------------------------------------------------------------
    // remove
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_remove_drops_lease() {
        let (_dir, gate) = gate();
        gate.save(PATH, "x", &default_format_options(), Some("A"), false, t0())
            .await
            .unwrap();

        gate.remove(PATH).await.unwrap();
        assert!(gate.locks().store().is_empty());
        assert_matches!(
            gate.remove(PATH).await,
            Err(GateError::Document(DocumentError::NotFound { .. }))
        );
    }
}
