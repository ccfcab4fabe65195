//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor.
//! It holds the repository (remote store plus optional local cache), the
//! live records keyed by date, the set of dates with a save in flight, and
//! the optional mailer. Clone is cheap; every field is Arc-wrapped or Clone.
//!
//! The live map holds at most [`LIVE_DAYS`] dates. Beyond that the oldest
//! dates without a save in flight are dropped and reload from the repository
//! on next access.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::RwLock;

use crate::config::FeatureFlags;
use crate::model::DailyRecord;
use crate::services::email::Mailer;
use crate::services::repository::Repository;

pub const LIVE_DAYS: usize = 14;

#[derive(Clone)]
pub struct AppState {
    pub repo: Repository,
    /// Last known record per date. Updated optimistically before persistence.
    pub live: Arc<RwLock<HashMap<String, DailyRecord>>>,
    /// Dates with a save in flight.
    pub pending: Arc<Mutex<HashSet<String>>>,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub flags: FeatureFlags,
}

impl AppState {
    #[must_use]
    pub fn new(repo: Repository, mailer: Option<Arc<dyn Mailer>>, flags: FeatureFlags) -> Self {
        Self {
            repo,
            live: Arc::new(RwLock::new(HashMap::new())),
            pending: Arc::new(Mutex::new(HashSet::new())),
            mailer,
            flags,
        }
    }

    /// Make `record` the live copy of its date.
    pub async fn publish(&self, record: DailyRecord) {
        let mut live = self.live.write().await;
        live.insert(record.date.clone(), record);
        evict_settled(&mut live, &self.pending);
    }
}

/// Drop the oldest dates with no save in flight until at most [`LIVE_DAYS`] remain.
pub(crate) fn evict_settled(live: &mut HashMap<String, DailyRecord>, pending: &Mutex<HashSet<String>>) {
    if live.len() <= LIVE_DAYS {
        return;
    }
    let pending = pending.lock().unwrap_or_else(PoisonError::into_inner).clone();
    let mut settled: Vec<String> = live.keys().filter(|date| !pending.contains(*date)).cloned().collect();
    settled.sort();
    let excess = live.len() - LIVE_DAYS;
    for date in settled.into_iter().take(excess) {
        live.remove(&date);
    }
}

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use crate::services::email::{MailError, OutgoingEmail};
    use crate::services::local_cache::LocalCache;
    use crate::services::store::{MemoryRecordStore, RecordStore};

    /// Mailer that records what it is asked to send.
    #[derive(Default)]
    pub struct MockMailer {
        pub sent: Mutex<Vec<OutgoingEmail>>,
        pub fail: bool,
    }

    impl MockMailer {
        #[must_use]
        pub fn failing() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: true }
        }

        #[must_use]
        pub fn sent(&self) -> Vec<OutgoingEmail> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl Mailer for MockMailer {
        async fn send(&self, email: OutgoingEmail) -> Result<String, MailError> {
            if self.fail {
                return Err(MailError::Delivery("mock provider down".into()));
            }
            let mut sent = self.sent.lock().unwrap();
            sent.push(email);
            Ok(format!("mock-{}", sent.len()))
        }
    }

    /// Fresh cache directory under the system temp dir.
    #[must_use]
    pub fn temp_cache() -> LocalCache {
        LocalCache::new(std::env::temp_dir().join(format!("ward-census-test-{}", uuid::Uuid::new_v4())))
    }

    /// Handles to the pieces behind a test `AppState`.
    pub struct TestApp {
        pub state: AppState,
        pub store: Arc<MemoryRecordStore>,
        pub mailer: Arc<MockMailer>,
    }

    #[must_use]
    pub fn build(cache: Option<LocalCache>, mailer: MockMailer) -> TestApp {
        let store = Arc::new(MemoryRecordStore::new());
        let mailer = Arc::new(mailer);
        let repo = Repository::new(Arc::clone(&store) as Arc<dyn RecordStore>, cache);
        let state = AppState::new(repo, Some(Arc::clone(&mailer) as Arc<dyn Mailer>), FeatureFlags::default());
        TestApp { state, store, mailer }
    }

    /// In-memory store, temp cache dir, mock mailer.
    #[must_use]
    pub fn test_app() -> TestApp {
        build(Some(temp_cache()), MockMailer::default())
    }

    #[must_use]
    pub fn test_app_state() -> AppState {
        test_app().state
    }

    /// Write an empty record for `date` straight into the store.
    pub async fn seed_day(app: &TestApp, date: &str) -> DailyRecord {
        let record = DailyRecord::empty(date);
        app.store.put(&record).await.unwrap();
        record
    }
}

#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
