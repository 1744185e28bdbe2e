//! Row structs and request DTOs.

pub mod file_lock;
