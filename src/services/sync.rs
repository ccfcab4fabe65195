//! Offline sync: push pending cache entries back to the remote store.
//!
//! DESIGN
//! ======
//! A background task wakes every `SYNC_INTERVAL_MS`, lists cache entries
//! marked `pendingSync`, and reconciles each with the remote copy using
//! last-write-wins on `lastUpdated`. Ties go to the remote. The pending flag
//! is cleared only after the remote write succeeds, and only if the entry
//! was not edited again in the meantime.
//!
//! Each entry is reconciled under the same per-date guard that commits take,
//! so no commit can land between reading the remote copy and writing over it.

use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::model::DailyRecord;
use crate::services::optimistic::PendingGuard;
use crate::services::store::StoreError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictWinner {
    Local,
    Remote,
}

#[must_use]
pub fn resolve_conflict(local: &DailyRecord, remote: &DailyRecord) -> ConflictWinner {
    if local.last_updated > remote.last_updated {
        ConflictWinner::Local
    } else {
        ConflictWinner::Remote
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub pushed: usize,
    pub adopted_remote: usize,
    pub failed: usize,
    /// Entries whose date had a commit in flight; retried next round.
    pub skipped: usize,
}

/// Reconcile every pending cache entry once.
///
/// # Errors
///
/// Returns an error only if the cache itself cannot be listed; per-record
/// failures are counted in the report and retried next round.
pub async fn sync_pending(state: &AppState) -> Result<SyncReport, StoreError> {
    let mut report = SyncReport::default();
    let Some(cache) = state.repo.cache() else {
        return Ok(report);
    };
    let store = state.repo.store();

    for listed in cache.pending().await? {
        let date = listed.record.date;
        // Commits for the date are refused while the guard is held.
        let Ok(_guard) = PendingGuard::acquire(&state.pending, &date) else {
            debug!(%date, "sync deferred, save in progress");
            report.skipped += 1;
            continue;
        };
        // A commit may have landed since the listing.
        let Some(cached) = cache.load(&date).await?.filter(|cached| cached.pending_sync) else {
            continue;
        };
        let local = cached.record;

        let remote = match store.get(&date).await {
            Ok(remote) => remote,
            Err(e) => {
                debug!(error = %e, %date, "sync skipped, remote unavailable");
                report.failed += 1;
                continue;
            }
        };

        if let Some(remote) = remote
            && resolve_conflict(&local, &remote) == ConflictWinner::Remote
        {
            cache.save(&remote, false).await?;
            adopt_live(state, &remote).await;
            info!(%date, "sync adopted newer remote copy");
            report.adopted_remote += 1;
            continue;
        }

        match store.put(&local).await {
            Ok(()) => {
                cache.mark_synced(&date, local.last_updated).await?;
                info!(%date, "sync pushed offline changes");
                report.pushed += 1;
            }
            Err(e) => {
                warn!(error = %e, %date, "sync push failed");
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

async fn adopt_live(state: &AppState, remote: &DailyRecord) {
    let mut live = state.live.write().await;
    if let Some(current) = live.get_mut(&remote.date)
        && current.last_updated <= remote.last_updated
    {
        current.clone_from(remote);
    }
}

/// Spawn the background sync task. Returns a handle for shutdown.
pub fn spawn_sync_task(state: AppState, interval_ms: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_millis(interval_ms.max(1)));
        loop {
            interval.tick().await;
            match sync_pending(&state).await {
                Ok(report) if report.pushed + report.adopted_remote > 0 => {
                    debug!(?report, "sync round complete");
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "sync round failed"),
            }
        }
    })
}

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;
