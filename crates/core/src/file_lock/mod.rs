//! Cooperative whole-document locking.
//!
//! A lock is a lease: a row keyed by document path that names the holding
//! session and the time it last acquired or refreshed the lease. Liveness is
//! derived from that timestamp alone. There is no active flag, and a missing
//! row means the document is unlocked.
//!
//! - [`LeaseStore`] is the persistence seam (SQLite in production, memory in
//!   tests).
//! - [`LockManager`] implements acquire / release / status / listing / sweep
//!   on top of a store.

mod manager;
mod store;

pub use manager::LockManager;
pub use store::{LeaseStore, MemoryLeaseStore};

use chrono::TimeDelta;
use serde::Serialize;

use crate::types::{is_stale_stamp, parse_timestamp, Timestamp};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// A lease not refreshed for this many minutes is expired.
pub const LEASE_TTL_MINS: i64 = 10;

/// How often the janitor physically deletes expired leases (15 minutes).
///
/// Longer than the TTL on purpose: expiry is a logical property checked on
/// every read, the sweep only reclaims rows.
pub const LOCK_SWEEP_INTERVAL_SECS: u64 = 15 * 60;

/// Upper bound on how long a store operation may wait for the database lock.
pub const STORE_BUSY_TIMEOUT_SECS: u64 = 10;

/// The lease time-to-live as a [`TimeDelta`].
pub fn lease_ttl() -> TimeDelta {
    TimeDelta::minutes(LEASE_TTL_MINS)
}

// ---------------------------------------------------------------------------
// Lease records
// ---------------------------------------------------------------------------

/// A stored lease, exactly as persisted.
///
/// Timestamps stay as raw strings so a corrupt row can still be read and
/// taken over instead of failing the whole request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Lease {
    pub file_path: String,
    pub session_id: String,
    /// Last successful acquire or refresh.
    pub timestamp: String,
    /// First acquisition by the current holder (diagnostic only).
    pub created_at: String,
}

impl Lease {
    /// The parsed acquire/refresh time, or `None` if the stored value is corrupt.
    pub fn acquired_at(&self) -> Option<Timestamp> {
        parse_timestamp(&self.timestamp)
    }

    /// `true` once `now - timestamp > ttl`, or when the timestamp is unparsable.
    pub fn is_expired(&self, now: Timestamp, ttl: TimeDelta) -> bool {
        is_stale_stamp(&self.timestamp, now - ttl)
    }
}

/// A request to write a lease for `session_id` stamped at `at`.
#[derive(Debug, Clone)]
pub struct LeaseClaim {
    pub file_path: String,
    pub session_id: String,
    pub at: Timestamp,
}

/// Lock state of a single path, derived by time comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaseState<'a> {
    Unlocked,
    Held(&'a Lease),
    /// Still stored, but past its TTL (or corrupt). Anyone may take it over.
    Expired(&'a Lease),
}

impl<'a> LeaseState<'a> {
    pub fn of(lease: Option<&'a Lease>, now: Timestamp, ttl: TimeDelta) -> Self {
        match lease {
            None => Self::Unlocked,
            Some(l) if l.is_expired(now, ttl) => Self::Expired(l),
            Some(l) => Self::Held(l),
        }
    }
}

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// Why an acquire was granted or denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireReason {
    /// No lease existed (or a racing insert was resolved in our favour).
    Acquired,
    /// The caller already held the lease; its timestamp was bumped.
    Refreshed,
    /// Another session's lease had passed its TTL.
    ExpiredTakenOver,
    /// The stored lease had an unparsable timestamp.
    InvalidTakenOver,
    /// Another session holds a live lease.
    LockedByOther,
}

impl AcquireReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Acquired => "Lock acquired",
            Self::Refreshed => "Lock refreshed",
            Self::ExpiredTakenOver => "Expired lock taken over",
            Self::InvalidTakenOver => "Invalid lock taken over",
            Self::LockedByOther => "Locked by other session",
        }
    }
}

/// Result of [`LockManager::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquireOutcome {
    pub granted: bool,
    /// The session holding the lease after the call. `None` only when a
    /// denial raced with a release and no lease remains to report.
    pub holder: Option<String>,
    /// The holder's stored timestamp.
    pub since: Option<String>,
    pub reason: AcquireReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseReason {
    Released,
    NothingToRelease,
    NotOwner,
}

impl ReleaseReason {
    pub fn message(self) -> &'static str {
        match self {
            Self::Released => "Lock released",
            Self::NothingToRelease => "Nothing to release",
            Self::NotOwner => "Not owner of lock",
        }
    }
}

/// Result of [`LockManager::release`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub success: bool,
    pub reason: ReleaseReason,
}

/// Read-only view of a path's lease, as returned by [`LockManager::status`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LockStatus {
    /// A lease row exists (live or expired).
    pub is_locked: bool,
    pub holder: Option<String>,
    pub since: Option<String>,
    pub is_expired: bool,
}

/// One entry of the "who is editing what" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveLock {
    pub file_path: String,
    pub session_id: String,
    pub timestamp: String,
}

impl From<Lease> for ActiveLock {
    fn from(lease: Lease) -> Self {
        Self {
            file_path: lease.file_path,
            session_id: lease.session_id,
            timestamp: lease.timestamp,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
