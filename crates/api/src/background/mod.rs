//! Background tasks and scheduled jobs.
//!
//! Each submodule owns a long-running task spawned via `tokio::spawn` and
//! stopped through a [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod lock_janitor;
