//! Request extractors shared by handlers.
//!
//! - [`basic_auth::BasicAuth`] -- Requires valid Basic credentials when a
//!   users file is configured.

pub mod basic_auth;
