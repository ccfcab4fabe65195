//! Repository: remote store first, local cache as the offline fallback.
//!
//! DESIGN
//! ======
//! Reads go to the remote store. A retryable remote failure (database down,
//! network) falls back to the local cache; a non-retryable one (corrupt
//! document) is returned as is. A cached entry that is still pending sync
//! and newer than the remote copy wins on read, so offline edits are not
//! hidden once the remote comes back but before the sync task runs.
//!
//! Writes go to the remote and are mirrored into the cache. When the remote
//! write fails and a cache is configured, the record is written to the
//! cache with `pendingSync = true` and the save reports `Offline`.
//!
//! Deletes need the remote. There is no offline tombstone.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::ErrorCode;
use crate::model::DailyRecord;
use crate::services::local_cache::LocalCache;
use crate::services::store::{RecordStore, StoreError};
use crate::services::sync::{ConflictWinner, resolve_conflict};

/// Where a save landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SaveOutcome {
    Remote,
    Offline,
}

#[derive(Clone)]
pub struct Repository {
    store: Arc<dyn RecordStore>,
    cache: Option<LocalCache>,
}

impl Repository {
    #[must_use]
    pub fn new(store: Arc<dyn RecordStore>, cache: Option<LocalCache>) -> Self {
        Self { store, cache }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    #[must_use]
    pub fn cache(&self) -> Option<&LocalCache> {
        self.cache.as_ref()
    }

    fn fallback(&self, err: &StoreError) -> Option<&LocalCache> {
        if err.retryable() { self.cache.as_ref() } else { None }
    }

    async fn pending_local(&self, date: &str) -> Option<DailyRecord> {
        let cache = self.cache.as_ref()?;
        match cache.load(date).await {
            Ok(Some(cached)) if cached.pending_sync => Some(cached.record),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, %date, "cache read failed");
                None
            }
        }
    }

    /// # Errors
    ///
    /// Returns the remote error when no cache can answer instead.
    pub async fn load(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        match self.store.get(date).await {
            Ok(Some(remote)) => {
                if let Some(local) = self.pending_local(date).await
                    && resolve_conflict(&local, &remote) == ConflictWinner::Local
                {
                    return Ok(Some(local));
                }
                if let Some(cache) = &self.cache
                    && let Err(e) = cache.save(&remote, false).await
                {
                    warn!(error = %e, %date, "cache mirror failed");
                }
                Ok(Some(remote))
            }
            Ok(None) => Ok(self.pending_local(date).await),
            Err(e) => {
                let Some(cache) = self.fallback(&e) else {
                    return Err(e);
                };
                warn!(error = %e, %date, "remote read failed, using local cache");
                Ok(cache.load(date).await?.map(|cached| cached.record))
            }
        }
    }

    /// # Errors
    ///
    /// Returns the remote error when there is no cache to fall back to, or
    /// the cache error when the fallback write fails as well.
    pub async fn save(&self, record: &DailyRecord) -> Result<SaveOutcome, StoreError> {
        match self.store.put(record).await {
            Ok(()) => {
                if let Some(cache) = &self.cache
                    && let Err(e) = cache.save(record, false).await
                {
                    warn!(error = %e, date = %record.date, "cache mirror failed");
                }
                Ok(SaveOutcome::Remote)
            }
            Err(e) => {
                let Some(cache) = self.fallback(&e) else {
                    return Err(e);
                };
                cache.save(record, true).await?;
                warn!(error = %e, date = %record.date, "remote write failed, saved offline");
                Ok(SaveOutcome::Offline)
            }
        }
    }

    /// # Errors
    ///
    /// Returns the remote error. Deleting is not possible offline.
    pub async fn delete(&self, date: &str) -> Result<bool, StoreError> {
        let existed = self.store.delete(date).await?;
        if let Some(cache) = &self.cache
            && let Err(e) = cache.remove(date).await
        {
            warn!(error = %e, %date, "cache remove failed");
        }
        Ok(existed)
    }

    /// Remote dates merged with dates only present in the cache.
    ///
    /// # Errors
    ///
    /// Returns the remote error when no cache can answer instead.
    pub async fn list_dates(&self) -> Result<Vec<String>, StoreError> {
        let mut dates = match self.store.list_dates().await {
            Ok(dates) => dates,
            Err(e) => {
                let Some(cache) = self.fallback(&e) else {
                    return Err(e);
                };
                warn!(error = %e, "remote list failed, using local cache");
                return cache.list().await;
            }
        };
        if let Some(cache) = &self.cache {
            for cached in cache.pending().await.unwrap_or_default() {
                dates.push(cached.record.date);
            }
        }
        dates.sort();
        dates.dedup();
        Ok(dates)
    }

    /// Records with `from <= date <= to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns the remote error when no cache can answer instead.
    pub async fn list_range(&self, from: &str, to: &str) -> Result<Vec<DailyRecord>, StoreError> {
        let mut by_date: BTreeMap<String, DailyRecord> = match self.store.list_range(from, to).await {
            Ok(records) => records.into_iter().map(|r| (r.date.clone(), r)).collect(),
            Err(e) => {
                let Some(cache) = self.fallback(&e) else {
                    return Err(e);
                };
                warn!(error = %e, %from, %to, "remote range failed, using local cache");
                let mut records = BTreeMap::new();
                for date in cache.list().await? {
                    if date.as_str() < from || date.as_str() > to {
                        continue;
                    }
                    if let Some(cached) = cache.load(&date).await? {
                        records.insert(date, cached.record);
                    }
                }
                return Ok(records.into_values().collect());
            }
        };

        if let Some(cache) = &self.cache {
            for cached in cache.pending().await.unwrap_or_default() {
                let date = cached.record.date.clone();
                if date.as_str() < from || date.as_str() > to {
                    continue;
                }
                let local_wins = by_date
                    .get(&date)
                    .is_none_or(|remote| resolve_conflict(&cached.record, remote) == ConflictWinner::Local);
                if local_wins {
                    debug!(%date, "range includes pending local copy");
                    by_date.insert(date, cached.record);
                }
            }
        }
        Ok(by_date.into_values().collect())
    }

    /// Latest record strictly before `date`.
    ///
    /// # Errors
    ///
    /// Returns the remote error when no cache can answer instead.
    pub async fn latest_before(&self, date: &str) -> Result<Option<DailyRecord>, StoreError> {
        match self.store.latest_before(date).await {
            Ok(found) => Ok(found),
            Err(e) => {
                let Some(cache) = self.fallback(&e) else {
                    return Err(e);
                };
                warn!(error = %e, %date, "remote lookup failed, using local cache");
                let previous = cache.list().await?.into_iter().filter(|d| d.as_str() < date).next_back();
                match previous {
                    Some(previous) => Ok(cache.load(&previous).await?.map(|cached| cached.record)),
                    None => Ok(None),
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "repository_test.rs"]
mod tests;
