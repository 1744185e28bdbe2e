//! Document storage on disk and the lock-aware access gate in front of it.
//!
//! - [`store::DocumentStore`] does plain file I/O under the documents root.
//! - [`gate::DocumentGate`] ties reads and writes to the file lock: opening a
//!   document with a session acquires or refreshes the lease, and saving
//!   requires holding it unless the save is forced.

pub mod gate;
pub mod store;

pub use gate::{DocumentGate, DocumentLockView, GateError, LockedDocument, OpenedDocument};
pub use store::{Document, DocumentStore, TreeEntry};

/// Failure of a filesystem operation on the documents tree.
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("{kind} '{path}' not found")]
    NotFound { kind: &'static str, path: String },

    #[error("{kind} '{path}' already exists")]
    AlreadyExists { kind: &'static str, path: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
