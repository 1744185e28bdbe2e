//! Integration tests for the `file_locks` repository and the SQLite lease store.
//!
//! Exercises the conditional SQL primitives against a real database:
//! - Insert-if-absent never overwrites
//! - Conditional update for owner, stale and corrupt rows
//! - Owner-conditioned delete
//! - Fresh listing and sweep by age
//! - Single winner among concurrent acquires through `LockManager`

use std::sync::Arc;

use chrono::{NaiveDate, TimeDelta};
use mdedit_core::file_lock::{AcquireReason, LeaseStore, LockManager};
use mdedit_core::types::{format_timestamp, is_stale_stamp, Timestamp};
use mdedit_db::repositories::FileLockRepo;
use mdedit_db::SqliteLeaseStore;
use sqlx::SqlitePool;

const PATH: &str = "notes/todo.md";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn t0() -> Timestamp {
    NaiveDate::from_ymd_opt(2026, 10, 15)
        .unwrap()
        .and_hms_opt(9, 0, 0)
        .unwrap()
}

fn mins(n: i64) -> Timestamp {
    t0() + TimeDelta::minutes(n)
}

/// Cutoff for a 10 minute TTL evaluated at `now`.
fn cutoff(now: Timestamp) -> Timestamp {
    now - TimeDelta::minutes(10)
}

async fn insert_raw(pool: &SqlitePool, path: &str, holder: &str, timestamp: &str) {
    sqlx::query(
        "INSERT INTO file_locks (file_path, session_id, timestamp, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(path)
    .bind(holder)
    .bind(timestamp)
    .bind(timestamp)
    .execute(pool)
    .await
    .unwrap();
}

// ---------------------------------------------------------------------------
// Test: insert / find
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_insert_if_absent_never_overwrites(pool: SqlitePool) {
    assert!(FileLockRepo::insert_if_absent(&pool, PATH, "A", t0()).await.unwrap());
    assert!(!FileLockRepo::insert_if_absent(&pool, PATH, "B", mins(1)).await.unwrap());

    let row = FileLockRepo::find(&pool, PATH).await.unwrap().unwrap();
    assert_eq!(row.session_id, "A");
    assert_eq!(row.timestamp, format_timestamp(t0()));
    assert_eq!(row.created_at, row.timestamp);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_find_missing_path(pool: SqlitePool) {
    assert!(FileLockRepo::find(&pool, "nope.md").await.unwrap().is_none());
}

// ---------------------------------------------------------------------------
// Test: conditional update
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_update_by_owner_keeps_created_at(pool: SqlitePool) {
    FileLockRepo::insert_if_absent(&pool, PATH, "A", mins(0)).await.unwrap();

    let applied = FileLockRepo::update_if_owner_or_expired(&pool, PATH, "A", mins(4), cutoff(mins(4)))
        .await
        .unwrap();
    assert!(applied);

    let row = FileLockRepo::find(&pool, PATH).await.unwrap().unwrap();
    assert_eq!(row.timestamp, format_timestamp(mins(4)));
    assert_eq!(row.created_at, format_timestamp(mins(0)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_by_other_rejected_while_live(pool: SqlitePool) {
    FileLockRepo::insert_if_absent(&pool, PATH, "A", mins(0)).await.unwrap();

    let applied = FileLockRepo::update_if_owner_or_expired(&pool, PATH, "B", mins(10), cutoff(mins(10)))
        .await
        .unwrap();
    assert!(!applied);
    assert_eq!(FileLockRepo::find(&pool, PATH).await.unwrap().unwrap().session_id, "A");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_by_other_takes_over_stale_row(pool: SqlitePool) {
    FileLockRepo::insert_if_absent(&pool, PATH, "A", mins(0)).await.unwrap();

    let applied = FileLockRepo::update_if_owner_or_expired(&pool, PATH, "B", mins(11), cutoff(mins(11)))
        .await
        .unwrap();
    assert!(applied);

    let row = FileLockRepo::find(&pool, PATH).await.unwrap().unwrap();
    assert_eq!(row.session_id, "B");
    assert_eq!(row.created_at, format_timestamp(mins(11)));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_takes_over_corrupt_row(pool: SqlitePool) {
    insert_raw(&pool, PATH, "A", "not a time").await;

    let applied = FileLockRepo::update_if_owner_or_expired(&pool, PATH, "B", t0(), cutoff(t0()))
        .await
        .unwrap();
    assert!(applied);
    assert_eq!(FileLockRepo::find(&pool, PATH).await.unwrap().unwrap().session_id, "B");
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_on_missing_row_applies_nothing(pool: SqlitePool) {
    let applied = FileLockRepo::update_if_owner_or_expired(&pool, PATH, "A", t0(), cutoff(t0()))
        .await
        .unwrap();
    assert!(!applied);
}

// ---------------------------------------------------------------------------
// Test: deletes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_if_owner(pool: SqlitePool) {
    FileLockRepo::insert_if_absent(&pool, PATH, "A", t0()).await.unwrap();

    assert!(!FileLockRepo::delete_if_owner(&pool, PATH, "B").await.unwrap());
    assert!(FileLockRepo::find(&pool, PATH).await.unwrap().is_some());

    assert!(FileLockRepo::delete_if_owner(&pool, PATH, "A").await.unwrap());
    assert!(FileLockRepo::find(&pool, PATH).await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_delete_ignores_holder(pool: SqlitePool) {
    FileLockRepo::insert_if_absent(&pool, PATH, "A", t0()).await.unwrap();

    assert!(FileLockRepo::delete(&pool, PATH).await.unwrap());
    assert!(!FileLockRepo::delete(&pool, PATH).await.unwrap());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_clear_all(pool: SqlitePool) {
    for path in ["a.md", "b.md", "c.md"] {
        FileLockRepo::insert_if_absent(&pool, path, "A", t0()).await.unwrap();
    }
    assert_eq!(FileLockRepo::clear_all(&pool).await.unwrap(), 3);
    assert_eq!(FileLockRepo::clear_all(&pool).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Test: listing and sweep
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_list_fresh_excludes_stale_and_corrupt(pool: SqlitePool) {
    let now = mins(30);
    FileLockRepo::insert_if_absent(&pool, "b.md", "B", now - TimeDelta::minutes(2)).await.unwrap();
    FileLockRepo::insert_if_absent(&pool, "a.md", "A", now - TimeDelta::minutes(9)).await.unwrap();
    FileLockRepo::insert_if_absent(&pool, "old.md", "C", now - TimeDelta::minutes(11)).await.unwrap();
    insert_raw(&pool, "bad.md", "D", "garbage").await;

    let fresh = FileLockRepo::list_fresh(&pool, cutoff(now)).await.unwrap();
    let paths: Vec<_> = fresh.iter().map(|r| r.file_path.as_str()).collect();
    assert_eq!(paths, ["a.md", "b.md"]);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sweep_deletes_by_age(pool: SqlitePool) {
    let now = mins(30);
    FileLockRepo::insert_if_absent(&pool, "five.md", "A", now - TimeDelta::minutes(5)).await.unwrap();
    FileLockRepo::insert_if_absent(&pool, "twelve.md", "B", now - TimeDelta::minutes(12)).await.unwrap();
    FileLockRepo::insert_if_absent(&pool, "twenty.md", "C", now - TimeDelta::minutes(20)).await.unwrap();

    let deleted = FileLockRepo::delete_expired(&pool, cutoff(now)).await.unwrap();
    assert_eq!(deleted, 2);
    assert!(FileLockRepo::find(&pool, "five.md").await.unwrap().is_some());
    assert!(FileLockRepo::find(&pool, "twelve.md").await.unwrap().is_none());
    assert!(FileLockRepo::find(&pool, "twenty.md").await.unwrap().is_none());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sweep_spares_lease_refreshed_before_delete(pool: SqlitePool) {
    let now = mins(30);
    FileLockRepo::insert_if_absent(&pool, PATH, "A", now - TimeDelta::minutes(15)).await.unwrap();

    // Refresh lands between the janitor deciding to sweep and the DELETE.
    FileLockRepo::update_if_owner_or_expired(&pool, PATH, "A", now, cutoff(now))
        .await
        .unwrap();

    assert_eq!(FileLockRepo::delete_expired(&pool, cutoff(now)).await.unwrap(), 0);
    assert!(FileLockRepo::find(&pool, PATH).await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sweep_removes_corrupt_rows(pool: SqlitePool) {
    insert_raw(&pool, PATH, "A", "").await;
    assert_eq!(FileLockRepo::delete_expired(&pool, cutoff(t0())).await.unwrap(), 1);
}

/// Values SQLite's date functions accept but that are not lease timestamps.
const LOOSE_STAMPS: [&str; 3] = ["9999", "now", "2026-10-15 08:59:00"];

#[sqlx::test(migrations = "./migrations")]
async fn test_loose_stamps_are_swept_and_not_listed(pool: SqlitePool) {
    for (i, raw) in LOOSE_STAMPS.iter().enumerate() {
        insert_raw(&pool, &format!("loose-{i}.md"), "A", raw).await;
    }
    FileLockRepo::insert_if_absent(&pool, "live.md", "B", t0()).await.unwrap();

    let fresh = FileLockRepo::list_fresh(&pool, cutoff(t0())).await.unwrap();
    let paths: Vec<_> = fresh.iter().map(|r| r.file_path.as_str()).collect();
    assert_eq!(paths, ["live.md"]);

    let deleted = FileLockRepo::delete_expired(&pool, cutoff(t0())).await.unwrap();
    assert_eq!(deleted, LOOSE_STAMPS.len() as u64);
    assert!(FileLockRepo::find(&pool, "live.md").await.unwrap().is_some());
}

#[sqlx::test(migrations = "./migrations")]
async fn test_update_takes_over_loose_stamps(pool: SqlitePool) {
    for raw in LOOSE_STAMPS {
        FileLockRepo::clear_all(&pool).await.unwrap();
        insert_raw(&pool, PATH, "A", raw).await;

        let applied =
            FileLockRepo::update_if_owner_or_expired(&pool, PATH, "B", t0(), cutoff(t0()))
                .await
                .unwrap();
        assert!(applied, "stamp {raw:?}");
        let row = FileLockRepo::find(&pool, PATH).await.unwrap().unwrap();
        assert_eq!(row.session_id, "B");
    }
}

#[sqlx::test(migrations = "./migrations")]
async fn test_sql_expiry_matches_lease_expiry(pool: SqlitePool) {
    let now = mins(30);
    let stamps = [
        format_timestamp(now),
        format_timestamp(now - TimeDelta::minutes(10)),
        format_timestamp(now - TimeDelta::minutes(11)),
        "2026-10-15T09:25:00".to_string(),
        "2026-10-15T09:25:00.5".to_string(),
        "2026-10-15T09:25:00.".to_string(),
        "2026-10-15T09:25:00Z".to_string(),
        "2026-10-15 09:25:00".to_string(),
        "2026-02-30T09:25:00".to_string(),
        "2026-10-15T24:00:00".to_string(),
        "9999".to_string(),
        "now".to_string(),
        "garbage".to_string(),
        String::new(),
    ];
    for (i, raw) in stamps.iter().enumerate() {
        insert_raw(&pool, &format!("{i:02}.md"), "A", raw).await;
    }

    let fresh = FileLockRepo::list_fresh(&pool, cutoff(now)).await.unwrap();
    for (i, raw) in stamps.iter().enumerate() {
        let listed = fresh.iter().any(|r| r.file_path == format!("{i:02}.md"));
        assert_eq!(listed, !is_stale_stamp(raw, cutoff(now)), "stamp {raw:?}");
    }
    assert_eq!(fresh.len(), 4);
}

// ---------------------------------------------------------------------------
// Test: lease store + manager
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "./migrations")]
async fn test_store_reads_corrupt_row_as_lease(pool: SqlitePool) {
    insert_raw(&pool, PATH, "A", "2026-13-45").await;
    let store = SqliteLeaseStore::new(pool);

    let lease = store.get(PATH).await.unwrap().unwrap();
    assert_eq!(lease.session_id, "A");
    assert_eq!(lease.acquired_at(), None);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_takeover_on_sqlite(pool: SqlitePool) {
    let locks = LockManager::new(SqliteLeaseStore::new(pool));

    assert!(locks.acquire(PATH, "A", t0()).await.unwrap().granted);
    let denied = locks.acquire(PATH, "B", t0() + TimeDelta::seconds(1)).await.unwrap();
    assert!(!denied.granted);
    assert_eq!(denied.holder.as_deref(), Some("A"));

    let taken = locks.acquire(PATH, "B", t0() + TimeDelta::seconds(601)).await.unwrap();
    assert!(taken.granted);
    assert_eq!(taken.reason, AcquireReason::ExpiredTakenOver);

    let status = locks.status(PATH, t0() + TimeDelta::seconds(602)).await.unwrap();
    assert_eq!(status.holder.as_deref(), Some("B"));
    assert!(!status.is_expired);
}

#[sqlx::test(migrations = "./migrations")]
async fn test_manager_takes_over_loose_stamps(pool: SqlitePool) {
    let locks = LockManager::new(SqliteLeaseStore::new(pool));

    for (i, raw) in LOOSE_STAMPS.iter().enumerate() {
        let path = format!("loose-{i}.md");
        insert_raw(locks.store().pool(), &path, "A", raw).await;

        let taken = locks.acquire(&path, "B", t0()).await.unwrap();
        assert!(taken.granted, "stamp {raw:?}");
        assert_eq!(taken.reason, AcquireReason::InvalidTakenOver);
        assert_eq!(taken.holder.as_deref(), Some("B"));
    }

    let active = locks.list_active(t0()).await.unwrap();
    assert_eq!(active.len(), LOOSE_STAMPS.len());
    assert!(active.iter().all(|lock| lock.session_id == "B"));
}

#[sqlx::test(migrations = "./migrations")]
async fn test_concurrent_acquires_single_winner(pool: SqlitePool) {
    let locks = Arc::new(LockManager::new(SqliteLeaseStore::new(pool)));
    let mut handles = Vec::new();

    for i in 0..8 {
        let locks = Arc::clone(&locks);
        handles.push(tokio::spawn(async move {
            locks.acquire(PATH, &format!("holder-{i}"), t0()).await.unwrap()
        }));
    }

    let mut winners = Vec::new();
    for handle in handles {
        let out = handle.await.unwrap();
        if out.granted {
            winners.push(out.holder.unwrap());
        }
    }

    assert_eq!(winners.len(), 1);
    let lease = locks.store().get(PATH).await.unwrap().unwrap();
    assert_eq!(lease.session_id, winners[0]);
}
