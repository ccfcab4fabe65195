use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use time::{Duration, OffsetDateTime};
use tokio::sync::Notify;

use super::*;
use crate::config::FeatureFlags;
use crate::services::audit::{AuditEntry, AuditFilter};
use crate::services::census::CensusError;
use crate::services::optimistic;
use crate::services::repository::Repository;
use crate::services::store::{MemoryRecordStore, RecordStore};
use crate::state::test_helpers;

fn record_at(date: &str, seconds: i64) -> DailyRecord {
    let mut record = DailyRecord::empty(date);
    record.last_updated = OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds);
    record
}

#[test]
fn newer_local_wins_and_ties_go_remote() {
    let older = record_at("2024-07-15", 1);
    let newer = record_at("2024-07-15", 2);
    assert_eq!(resolve_conflict(&newer, &older), ConflictWinner::Local);
    assert_eq!(resolve_conflict(&older, &newer), ConflictWinner::Remote);
    assert_eq!(resolve_conflict(&older, &older.clone()), ConflictWinner::Remote);
}

#[tokio::test]
async fn pending_entry_is_pushed_and_flag_cleared() {
    let app = test_helpers::test_app();
    let cache = app.state.repo.cache().unwrap().clone();
    let local = record_at("2024-07-15", 5);
    cache.save(&local, true).await.unwrap();

    let report = sync_pending(&app.state).await.unwrap();
    assert_eq!(report, SyncReport { pushed: 1, adopted_remote: 0, failed: 0, skipped: 0 });
    assert_eq!(app.store.get("2024-07-15").await.unwrap(), Some(local));
    assert!(cache.pending().await.unwrap().is_empty());
}

#[tokio::test]
async fn newer_remote_is_adopted_into_cache_and_live_map() {
    let app = test_helpers::test_app();
    let cache = app.state.repo.cache().unwrap().clone();
    let local = record_at("2024-07-15", 5);
    let mut remote = record_at("2024-07-15", 9);
    remote.nurses.day = vec!["Remota".into()];
    cache.save(&local, true).await.unwrap();
    app.store.put(&remote).await.unwrap();
    app.state.live.write().await.insert("2024-07-15".into(), local.clone());

    let report = sync_pending(&app.state).await.unwrap();
    assert_eq!(report.adopted_remote, 1);
    assert_eq!(app.store.get("2024-07-15").await.unwrap(), Some(remote.clone()));

    let cached = cache.load("2024-07-15").await.unwrap().unwrap();
    assert!(!cached.pending_sync);
    assert_eq!(cached.record, remote);
    assert_eq!(app.state.live.read().await["2024-07-15"], remote);
}

#[tokio::test]
async fn remote_outage_keeps_entries_pending() {
    let app = test_helpers::test_app();
    let cache = app.state.repo.cache().unwrap().clone();
    cache.save(&record_at("2024-07-15", 5), true).await.unwrap();
    app.store.set_available(false);

    let report = sync_pending(&app.state).await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(cache.pending().await.unwrap().len(), 1);
}

#[tokio::test]
async fn no_cache_means_nothing_to_sync() {
    let app = test_helpers::build(None, test_helpers::MockMailer::default());
    assert_eq!(sync_pending(&app.state).await.unwrap(), SyncReport::default());
}

#[tokio::test]
async fn entry_with_commit_in_flight_is_deferred() {
    let app = test_helpers::test_app();
    let cache = app.state.repo.cache().unwrap().clone();
    cache.save(&record_at("2024-07-15", 5), true).await.unwrap();

    let _held = optimistic::PendingGuard::acquire(&app.state.pending, "2024-07-15").unwrap();
    let report = sync_pending(&app.state).await.unwrap();
    assert_eq!(report, SyncReport { skipped: 1, ..SyncReport::default() });
    assert_eq!(app.store.get("2024-07-15").await.unwrap(), None);
    assert_eq!(cache.pending().await.unwrap().len(), 1);
}

/// Memory store whose next `get` parks until released.
#[derive(Default)]
struct PausingStore {
    inner: MemoryRecordStore,
    armed: AtomicBool,
    reached: Notify,
    release: Notify,
}

#[async_trait::async_trait]
impl RecordStore for PausingStore {
    async fn get(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        let found = self.inner.get(date).await;
        if self.armed.swap(false, Ordering::SeqCst) {
            self.reached.notify_one();
            self.release.notified().await;
        }
        found
    }

    async fn put(&self, record: &DailyRecord) -> Result<(), StoreError> {
        self.inner.put(record).await
    }

    async fn delete(&self, date: &str) -> Result<bool, StoreError> {
        self.inner.delete(date).await
    }

    async fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        self.inner.list_dates().await
    }

    async fn list_range(&self, from: &str, to: &str) -> Result<Vec<DailyRecord>, StoreError> {
        self.inner.list_range(from, to).await
    }

    async fn latest_before(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        self.inner.latest_before(date).await
    }

    async fn append_audit(&self, entry: &AuditEntry) -> Result<(), StoreError> {
        self.inner.append_audit(entry).await
    }

    async fn query_audit(&self, filter: &AuditFilter) -> Result<Vec<AuditEntry>, StoreError> {
        self.inner.query_audit(filter).await
    }
}

#[tokio::test]
async fn commit_cannot_land_between_sync_read_and_push() {
    let store = Arc::new(PausingStore::default());
    let cache = test_helpers::temp_cache();
    let repo = Repository::new(Arc::clone(&store) as Arc<dyn RecordStore>, Some(cache.clone()));
    let state = AppState::new(repo, None, FeatureFlags::default());

    let date = "2024-07-15";
    store.inner.put(&record_at(date, 1)).await.unwrap();
    let mut offline = record_at(date, 5);
    offline.nurses.day = vec!["offline".into()];
    cache.save(&offline, true).await.unwrap();
    state.live.write().await.insert(date.into(), offline.clone());

    store.armed.store(true, Ordering::SeqCst);
    let worker = tokio::spawn({
        let state = state.clone();
        async move { sync_pending(&state).await }
    });
    store.reached.notified().await;

    let set_newer = |record: &mut DailyRecord| -> Result<(), CensusError> {
        record.nurses.day = vec!["newer".into()];
        Ok(())
    };
    let blocked = optimistic::commit(&state, date, set_newer).await;
    assert!(matches!(blocked, Err(CensusError::SaveInProgress(_))));

    store.release.notify_one();
    let report = worker.await.unwrap().unwrap();
    assert_eq!(report.pushed, 1);

    let committed = optimistic::commit(&state, date, set_newer).await.unwrap();
    let remote = store.inner.get(date).await.unwrap().unwrap();
    assert_eq!(remote.nurses.day, vec!["newer".to_owned()]);
    assert_eq!(remote.last_updated, committed.record.last_updated);
    assert!(remote.last_updated > offline.last_updated);
    assert!(cache.pending().await.unwrap().is_empty());
}
