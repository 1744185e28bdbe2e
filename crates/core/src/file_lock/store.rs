//! The lease persistence seam.
//!
//! Every mutating primitive is a single conditional write so that concurrent
//! callers resolve races inside the store instead of through read-then-write
//! sequences in the manager.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use super::{Lease, LeaseClaim};
use crate::types::{format_timestamp, is_stale_stamp, Timestamp};

/// Durable key-value table of leases keyed by document path.
///
/// `expired_before` arguments are the cutoff `now - ttl`: a lease whose
/// timestamp is strictly older than the cutoff, or unparsable, is expired.
pub trait LeaseStore: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Fetch the lease for `file_path`, if any.
    fn get(
        &self,
        file_path: &str,
    ) -> impl Future<Output = Result<Option<Lease>, Self::Error>> + Send;

    /// Insert a new lease. Returns `false` if a row already exists.
    fn insert_if_absent(
        &self,
        claim: &LeaseClaim,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Overwrite the lease when the claimant already holds it or the stored
    /// lease is expired. Returns `false` if the condition did not hold or the
    /// row no longer exists.
    fn update_if_owner_or_expired(
        &self,
        claim: &LeaseClaim,
        expired_before: Timestamp,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Delete the lease only if `session_id` holds it.
    fn delete_if_owner(
        &self,
        file_path: &str,
        session_id: &str,
    ) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// Delete the lease regardless of holder.
    fn delete(&self, file_path: &str) -> impl Future<Output = Result<bool, Self::Error>> + Send;

    /// All non-expired leases, ordered by path.
    fn list_fresh(
        &self,
        expired_before: Timestamp,
    ) -> impl Future<Output = Result<Vec<Lease>, Self::Error>> + Send;

    /// Delete every lease that is expired at the moment of the delete.
    fn delete_expired(
        &self,
        expired_before: Timestamp,
    ) -> impl Future<Output = Result<u64, Self::Error>> + Send;

    /// Delete every lease.
    fn clear_all(&self) -> impl Future<Output = Result<u64, Self::Error>> + Send;
}

// ---------------------------------------------------------------------------
// MemoryLeaseStore
// ---------------------------------------------------------------------------

/// In-process [`LeaseStore`] backed by a mutex-guarded map.
///
/// Each primitive runs entirely under the mutex, giving the same atomicity
/// as the single-statement SQL implementation.
#[derive(Debug, Default)]
pub struct MemoryLeaseStore {
    leases: Mutex<HashMap<String, Lease>>,
}

impl MemoryLeaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a lease row verbatim, bypassing all conditions.
    pub fn seed(&self, lease: Lease) {
        self.lock().insert(lease.file_path.clone(), lease);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Lease>> {
        self.leases.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_stale(lease: &Lease, expired_before: Timestamp) -> bool {
    is_stale_stamp(&lease.timestamp, expired_before)
}

impl LeaseStore for MemoryLeaseStore {
    type Error = Infallible;

    async fn get(&self, file_path: &str) -> Result<Option<Lease>, Infallible> {
        Ok(self.lock().get(file_path).cloned())
    }

    async fn insert_if_absent(&self, claim: &LeaseClaim) -> Result<bool, Infallible> {
        let mut leases = self.lock();
        if leases.contains_key(&claim.file_path) {
            return Ok(false);
        }
        let stamp = format_timestamp(claim.at);
        leases.insert(
            claim.file_path.clone(),
            Lease {
                file_path: claim.file_path.clone(),
                session_id: claim.session_id.clone(),
                timestamp: stamp.clone(),
                created_at: stamp,
            },
        );
        Ok(true)
    }

    async fn update_if_owner_or_expired(
        &self,
        claim: &LeaseClaim,
        expired_before: Timestamp,
    ) -> Result<bool, Infallible> {
        let mut leases = self.lock();
        let Some(lease) = leases.get_mut(&claim.file_path) else {
            return Ok(false);
        };
        let same_holder = lease.session_id == claim.session_id;
        if !same_holder && !is_stale(lease, expired_before) {
            return Ok(false);
        }
        let stamp = format_timestamp(claim.at);
        if !same_holder {
            lease.session_id = claim.session_id.clone();
            lease.created_at = stamp.clone();
        }
        lease.timestamp = stamp;
        Ok(true)
    }

    async fn delete_if_owner(&self, file_path: &str, session_id: &str) -> Result<bool, Infallible> {
        let mut leases = self.lock();
        match leases.get(file_path) {
            Some(lease) if lease.session_id == session_id => {
                leases.remove(file_path);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, file_path: &str) -> Result<bool, Infallible> {
        Ok(self.lock().remove(file_path).is_some())
    }

    async fn list_fresh(&self, expired_before: Timestamp) -> Result<Vec<Lease>, Infallible> {
        let mut fresh: Vec<Lease> = self
            .lock()
            .values()
            .filter(|lease| !is_stale(lease, expired_before))
            .cloned()
            .collect();
        fresh.sort_by(|a, b| a.file_path.cmp(&b.file_path));
        Ok(fresh)
    }

    async fn delete_expired(&self, expired_before: Timestamp) -> Result<u64, Infallible> {
        let mut leases = self.lock();
        let before = leases.len();
        leases.retain(|_, lease| !is_stale(lease, expired_before));
        Ok((before - leases.len()) as u64)
    }

    async fn clear_all(&self) -> Result<u64, Infallible> {
        let mut leases = self.lock();
        let count = leases.len() as u64;
        leases.clear();
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
