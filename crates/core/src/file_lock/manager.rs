//! Lease state machine on top of a [`LeaseStore`].

use chrono::TimeDelta;

use super::{
    lease_ttl, AcquireOutcome, AcquireReason, ActiveLock, Lease, LeaseClaim, LeaseState,
    LeaseStore, LockStatus, ReleaseOutcome, ReleaseReason,
};
use crate::types::{format_timestamp, Timestamp};

/// Acquire / release / query / sweep for whole-document leases.
///
/// The manager holds no lease state of its own: every call re-reads the
/// store, and every mutation goes through one of the store's conditional
/// writes. Several managers over one store are therefore safe.
#[derive(Debug)]
pub struct LockManager<S> {
    store: S,
    ttl: TimeDelta,
}

impl<S: LeaseStore> LockManager<S> {
    /// Manager with the standard 10 minute TTL.
    pub fn new(store: S) -> Self {
        Self::with_ttl(store, lease_ttl())
    }

    pub fn with_ttl(store: S, ttl: TimeDelta) -> Self {
        Self { store, ttl }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn ttl(&self) -> TimeDelta {
        self.ttl
    }

    fn expired_before(&self, now: Timestamp) -> Timestamp {
        now - self.ttl
    }

    /// Acquire or refresh the lease on `file_path` for `session_id`.
    ///
    /// Idempotent for the holder: calling again simply bumps the timestamp,
    /// which is how clients heartbeat while editing.
    pub async fn acquire(
        &self,
        file_path: &str,
        session_id: &str,
        now: Timestamp,
    ) -> Result<AcquireOutcome, S::Error> {
        let claim = LeaseClaim {
            file_path: file_path.to_string(),
            session_id: session_id.to_string(),
            at: now,
        };
        let expired_before = self.expired_before(now);
        let existing = self.store.get(file_path).await?;

        let reason = match LeaseState::of(existing.as_ref(), now, self.ttl) {
            LeaseState::Unlocked => {
                if self.store.insert_if_absent(&claim).await? {
                    return Ok(granted(&claim, AcquireReason::Acquired));
                }
                // Lost an insert race: the winner's row is now visible to the
                // conditional update, which only applies if it is ours or stale.
                AcquireReason::Acquired
            }
            LeaseState::Held(lease) if lease.session_id == session_id => AcquireReason::Refreshed,
            LeaseState::Expired(lease) if lease.session_id == session_id => {
                AcquireReason::Refreshed
            }
            LeaseState::Held(lease) => return Ok(denied(lease)),
            LeaseState::Expired(lease) => match lease.acquired_at() {
                Some(_) => AcquireReason::ExpiredTakenOver,
                None => AcquireReason::InvalidTakenOver,
            },
        };

        if self
            .store
            .update_if_owner_or_expired(&claim, expired_before)
            .await?
        {
            return Ok(granted(&claim, reason));
        }

        // The row changed between our read and the conditional update. A
        // vanished row (released or swept) can still be claimed by insert.
        match self.store.get(file_path).await? {
            None if self.store.insert_if_absent(&claim).await? => {
                Ok(granted(&claim, AcquireReason::Acquired))
            }
            None => Ok(self.report_winner(file_path).await?),
            Some(lease) => Ok(denied(&lease)),
        }
    }

    async fn report_winner(&self, file_path: &str) -> Result<AcquireOutcome, S::Error> {
        Ok(match self.store.get(file_path).await? {
            Some(lease) => denied(&lease),
            None => AcquireOutcome {
                granted: false,
                holder: None,
                since: None,
                reason: AcquireReason::LockedByOther,
            },
        })
    }

    /// Release the lease if `session_id` holds it.
    ///
    /// Releasing an absent lease succeeds. Releasing someone else's lease
    /// fails and leaves it untouched, even if it has expired.
    pub async fn release(
        &self,
        file_path: &str,
        session_id: &str,
    ) -> Result<ReleaseOutcome, S::Error> {
        let outcome = |success, reason| ReleaseOutcome { success, reason };

        match self.store.get(file_path).await? {
            None => return Ok(outcome(true, ReleaseReason::NothingToRelease)),
            Some(lease) if lease.session_id != session_id => {
                return Ok(outcome(false, ReleaseReason::NotOwner))
            }
            Some(_) => {}
        }

        if self.store.delete_if_owner(file_path, session_id).await? {
            return Ok(outcome(true, ReleaseReason::Released));
        }

        // Someone took it over or swept it after our read.
        Ok(match self.store.get(file_path).await? {
            None => outcome(true, ReleaseReason::NothingToRelease),
            Some(_) => outcome(false, ReleaseReason::NotOwner),
        })
    }

    /// Report the lease on `file_path` without touching it.
    pub async fn status(&self, file_path: &str, now: Timestamp) -> Result<LockStatus, S::Error> {
        let lease = self.store.get(file_path).await?;
        Ok(match LeaseState::of(lease.as_ref(), now, self.ttl) {
            LeaseState::Unlocked => LockStatus::default(),
            LeaseState::Held(lease) => status_of(lease, false),
            LeaseState::Expired(lease) => status_of(lease, true),
        })
    }

    /// Every lease younger than the TTL, regardless of when the last sweep ran.
    pub async fn list_active(&self, now: Timestamp) -> Result<Vec<ActiveLock>, S::Error> {
        let leases = self.store.list_fresh(self.expired_before(now)).await?;
        Ok(leases.into_iter().map(ActiveLock::from).collect())
    }

    /// Physically delete leases that are expired as of `now`.
    pub async fn sweep_expired(&self, now: Timestamp) -> Result<u64, S::Error> {
        self.store.delete_expired(self.expired_before(now)).await
    }

    /// Drop the lease on `file_path` whoever holds it (used when the
    /// document itself is deleted).
    pub async fn forget(&self, file_path: &str) -> Result<bool, S::Error> {
        self.store.delete(file_path).await
    }

    /// Drop every lease. Called once at process start.
    pub async fn clear_all(&self) -> Result<u64, S::Error> {
        self.store.clear_all().await
    }
}

fn granted(claim: &LeaseClaim, reason: AcquireReason) -> AcquireOutcome {
    AcquireOutcome {
        granted: true,
        holder: Some(claim.session_id.clone()),
        since: Some(format_timestamp(claim.at)),
        reason,
    }
}

fn denied(lease: &Lease) -> AcquireOutcome {
    AcquireOutcome {
        granted: false,
        holder: Some(lease.session_id.clone()),
        since: Some(lease.timestamp.clone()),
        reason: AcquireReason::LockedByOther,
    }
}

fn status_of(lease: &Lease, is_expired: bool) -> LockStatus {
    LockStatus {
        is_locked: true,
        holder: Some(lease.session_id.clone()),
        since: Some(lease.timestamp.clone()),
        is_expired,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
