use time::Duration;

use super::*;
use crate::services::store::MemoryRecordStore;
use crate::state::test_helpers::temp_cache;

fn repo_with_cache() -> (Repository, Arc<MemoryRecordStore>, LocalCache) {
    let store = Arc::new(MemoryRecordStore::new());
    let cache = temp_cache();
    let repo = Repository::new(Arc::clone(&store) as Arc<dyn RecordStore>, Some(cache.clone()));
    (repo, store, cache)
}

fn record_at(date: &str, seconds: i64) -> DailyRecord {
    let mut record = DailyRecord::empty(date);
    record.last_updated = time::OffsetDateTime::UNIX_EPOCH + Duration::seconds(seconds);
    record
}

#[tokio::test]
async fn save_online_writes_remote_and_mirrors_cache() {
    let (repo, store, cache) = repo_with_cache();
    let record = record_at("2024-07-15", 10);

    assert_eq!(repo.save(&record).await.unwrap(), SaveOutcome::Remote);
    assert_eq!(store.get("2024-07-15").await.unwrap(), Some(record.clone()));
    let cached = cache.load("2024-07-15").await.unwrap().unwrap();
    assert!(!cached.pending_sync);
}

#[tokio::test]
async fn save_offline_goes_to_cache_as_pending() {
    let (repo, store, cache) = repo_with_cache();
    store.set_available(false);
    let record = record_at("2024-07-15", 10);

    assert_eq!(repo.save(&record).await.unwrap(), SaveOutcome::Offline);
    let cached = cache.load("2024-07-15").await.unwrap().unwrap();
    assert!(cached.pending_sync);
    assert_eq!(cached.record, record);

    // Reads fall back to the cache while the remote is down.
    assert_eq!(repo.load("2024-07-15").await.unwrap(), Some(record));
}

#[tokio::test]
async fn save_without_cache_propagates_remote_error() {
    let store = Arc::new(MemoryRecordStore::new());
    let repo = Repository::new(Arc::clone(&store) as Arc<dyn RecordStore>, None);
    store.set_available(false);

    let err = repo.save(&record_at("2024-07-15", 1)).await.unwrap_err();
    assert!(matches!(err, StoreError::Unavailable(_)));
    assert!(repo.load("2024-07-15").await.is_err());
}

#[tokio::test]
async fn newer_pending_local_copy_wins_on_read() {
    let (repo, store, cache) = repo_with_cache();
    store.put(&record_at("2024-07-15", 10)).await.unwrap();
    let mut local = record_at("2024-07-15", 20);
    local.nurses.day = vec!["Offline".into()];
    cache.save(&local, true).await.unwrap();

    assert_eq!(repo.load("2024-07-15").await.unwrap(), Some(local));
}

#[tokio::test]
async fn older_pending_local_copy_loses_on_read() {
    let (repo, store, cache) = repo_with_cache();
    let remote = record_at("2024-07-15", 30);
    store.put(&remote).await.unwrap();
    cache.save(&record_at("2024-07-15", 20), true).await.unwrap();

    assert_eq!(repo.load("2024-07-15").await.unwrap(), Some(remote));
}

#[tokio::test]
async fn list_dates_merges_pending_cache_entries() {
    let (repo, store, _cache) = repo_with_cache();
    repo.save(&record_at("2024-07-14", 1)).await.unwrap();
    store.set_available(false);
    repo.save(&record_at("2024-07-15", 2)).await.unwrap();

    // Offline: the cache answers with both days.
    assert_eq!(repo.list_dates().await.unwrap(), vec!["2024-07-14", "2024-07-15"]);

    // Online again: remote has one day, the pending one is merged in.
    store.set_available(true);
    assert_eq!(repo.list_dates().await.unwrap(), vec!["2024-07-14", "2024-07-15"]);
}

#[tokio::test]
async fn list_range_and_latest_before_fall_back_to_cache() {
    let (repo, store, _cache) = repo_with_cache();
    for (day, secs) in [("2024-07-01", 1), ("2024-07-10", 2), ("2024-08-01", 3)] {
        repo.save(&record_at(day, secs)).await.unwrap();
    }
    store.set_available(false);

    let july: Vec<_> = repo
        .list_range("2024-07-01", "2024-07-31")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.date)
        .collect();
    assert_eq!(july, vec!["2024-07-01", "2024-07-10"]);

    let previous = repo.latest_before("2024-07-10").await.unwrap().unwrap();
    assert_eq!(previous.date, "2024-07-01");
    assert!(repo.latest_before("2024-07-01").await.unwrap().is_none());
}

#[tokio::test]
async fn delete_requires_remote_and_clears_cache() {
    let (repo, store, cache) = repo_with_cache();
    repo.save(&record_at("2024-07-15", 1)).await.unwrap();

    store.set_available(false);
    assert!(repo.delete("2024-07-15").await.is_err());

    store.set_available(true);
    assert!(repo.delete("2024-07-15").await.unwrap());
    assert!(cache.load("2024-07-15").await.unwrap().is_none());
    assert!(!repo.delete("2024-07-15").await.unwrap());
}
