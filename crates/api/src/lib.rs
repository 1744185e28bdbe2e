//! mdedit API server library.
//!
//! Exposes the building blocks (config, state, error handling, routes,
//! document gate, lock janitor) so integration tests and the binary
//! entrypoint can both access them.

pub mod attachments;
pub mod auth;
pub mod background;
pub mod config;
pub mod documents;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod routes;
pub mod state;
