//! Optimistic commit of one day's record.
//!
//! DESIGN
//! ======
//! Live records sit in `AppState::live`. A commit claims the date in the
//! pending set, applies the mutation to a copy, stamps `lastUpdated`, and
//! publishes the copy before the repository write. Readers therefore see the
//! change immediately. If the write fails the previous record is put back.
//!
//! A second commit for a date whose save is still in flight is refused
//! rather than queued; the client retries.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use time::{Duration, OffsetDateTime};
use tracing::warn;

use crate::model::DailyRecord;
use crate::services::census::{CensusError, load_live};
use crate::services::repository::SaveOutcome;
use crate::state::AppState;

/// Claim on a date in the pending set. Released on drop.
pub(crate) struct PendingGuard {
    pending: Arc<Mutex<HashSet<String>>>,
    date: String,
}

impl PendingGuard {
    pub(crate) fn acquire(pending: &Arc<Mutex<HashSet<String>>>, date: &str) -> Result<Self, CensusError> {
        let mut set = pending.lock().unwrap_or_else(PoisonError::into_inner);
        if !set.insert(date.to_owned()) {
            return Err(CensusError::SaveInProgress(date.to_owned()));
        }
        Ok(Self { pending: Arc::clone(pending), date: date.to_owned() })
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.date);
    }
}

/// Next `lastUpdated` value. Strictly increases even if the clock does not.
pub(crate) fn next_version(previous: OffsetDateTime) -> OffsetDateTime {
    let now = OffsetDateTime::now_utc();
    if now > previous { now } else { previous + Duration::milliseconds(1) }
}

#[derive(Debug, Clone)]
pub struct Committed<T> {
    pub record: DailyRecord,
    pub value: T,
    pub outcome: SaveOutcome,
}

/// Apply `mutate` to the record for `date` and persist it.
///
/// # Errors
///
/// - [`CensusError::SaveInProgress`] if another commit holds the date.
/// - [`CensusError::NotFound`] if the day does not exist.
/// - Whatever `mutate` returns; nothing is published in that case.
/// - [`CensusError::Store`] if the write fails; the previous record is
///   restored.
pub async fn commit<T, F>(state: &AppState, date: &str, mutate: F) -> Result<Committed<T>, CensusError>
where
    F: FnOnce(&mut DailyRecord) -> Result<T, CensusError>,
{
    let _guard = PendingGuard::acquire(&state.pending, date)?;

    let snapshot = load_live(state, date)
        .await?
        .ok_or_else(|| CensusError::NotFound(date.to_owned()))?;
    let mut next = snapshot.clone();
    let value = mutate(&mut next)?;
    next.last_updated = next_version(snapshot.last_updated);

    state.publish(next.clone()).await;

    match state.repo.save(&next).await {
        Ok(outcome) => Ok(Committed { record: next, value, outcome }),
        Err(e) => {
            warn!(error = %e, %date, "save failed, rolling back");
            state.publish(snapshot).await;
            Err(e.into())
        }
    }
}

#[cfg(test)]
#[path = "optimistic_test.rs"]
mod tests;
