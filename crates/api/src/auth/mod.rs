//! Authentication support: the Basic auth users file and credential checks.

pub mod users;
