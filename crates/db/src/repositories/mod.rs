//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&SqlitePool` as the first argument.

pub mod file_lock_repo;

pub use file_lock_repo::FileLockRepo;
