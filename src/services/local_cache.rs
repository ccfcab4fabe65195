//! Offline cache: one JSON file per census day.
//!
//! DESIGN
//! ======
//! The cache mirrors every record the service reads or writes so census data
//! stays available while the remote store is unreachable. Entries written
//! during an outage carry `pendingSync = true` until the sync worker pushes
//! them upstream.
//!
//! Files are written to a temporary sibling and renamed into place so a
//! crash never leaves a truncated document behind.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::model::{DailyRecord, parse_date_key};
use crate::services::store::StoreError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedRecord {
    pub record: DailyRecord,
    #[serde(default)]
    pub pending_sync: bool,
}

#[derive(Debug, Clone)]
pub struct LocalCache {
    dir: PathBuf,
}

impl LocalCache {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    #[cfg(test)]
    #[must_use]
    pub fn dir(&self) -> &std::path::Path {
        &self.dir
    }

    fn path_for(&self, date: &str) -> Result<PathBuf, StoreError> {
        // Only well-formed date keys become file names.
        if parse_date_key(date).is_none() {
            return Err(StoreError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid cache key {date:?}"),
            )));
        }
        Ok(self.dir.join(format!("{date}.json")))
    }

    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(&self, date: &str) -> Result<Option<CachedRecord>, StoreError> {
        let path = self.path_for(date)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let mut cached: CachedRecord = serde_json::from_slice(&bytes)?;
                cached.record.ensure_catalogue();
                Ok(Some(cached))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// # Errors
    ///
    /// Returns an error if the cache directory or file cannot be written.
    pub async fn save(&self, record: &DailyRecord, pending_sync: bool) -> Result<(), StoreError> {
        let path = self.path_for(&record.date)?;
        tokio::fs::create_dir_all(&self.dir).await?;

        let cached = CachedRecord { record: record.clone(), pending_sync };
        let bytes = serde_json::to_vec(&cached)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub async fn remove(&self, date: &str) -> Result<(), StoreError> {
        let path = self.path_for(date)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    /// Cached date keys, ascending. A missing directory is an empty cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be listed.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut dates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(date) = name.strip_suffix(".json")
                && parse_date_key(date).is_some()
            {
                dates.push(date.to_owned());
            }
        }
        dates.sort();
        Ok(dates)
    }

    /// Entries still waiting to be pushed upstream, oldest day first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or an entry cannot be read.
    pub async fn pending(&self) -> Result<Vec<CachedRecord>, StoreError> {
        let mut pending = Vec::new();
        for date in self.list().await? {
            if let Some(cached) = self.load(&date).await?
                && cached.pending_sync
            {
                pending.push(cached);
            }
        }
        Ok(pending)
    }

    /// Clear the pending flag, unless the entry changed after `synced_version`.
    ///
    /// # Errors
    ///
    /// Returns an error if the entry cannot be read or rewritten.
    pub async fn mark_synced(&self, date: &str, synced_version: OffsetDateTime) -> Result<bool, StoreError> {
        let Some(cached) = self.load(date).await? else {
            return Ok(false);
        };
        if !cached.pending_sync || cached.record.last_updated != synced_version {
            return Ok(false);
        }
        self.save(&cached.record, false).await?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "local_cache_test.rs"]
mod tests;
