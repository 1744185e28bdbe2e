//! Domain logic for the markdown editor backend.
//!
//! This crate has no I/O of its own. Persistence lives in `mdedit-db` and the
//! HTTP surface in `mdedit-api`; both depend on the types and the lease state
//! machine defined here.

pub mod attachments;
pub mod documents;
pub mod error;
pub mod file_lock;
pub mod types;
