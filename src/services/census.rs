//! Census service: daily record lifecycle and audited edits.
//!
//! DESIGN
//! ======
//! Every day is one `DailyRecord`. Reads go through the live map in
//! `AppState` and fall back to the repository. Edits go through
//! [`optimistic::commit`] and write one audit entry each. Creating a day
//! can copy the beds of the latest earlier record; movements, staff,
//! checklists, novedades and the medical signature always start empty.

use serde::Serialize;
use time::OffsetDateTime;
use tracing::info;

use crate::error::ErrorCode;
use crate::model::{DailyRecord, format_date_key, parse_date_key};
use crate::services::audit::{self, AuditAction, AuditEntry};
use crate::services::auth::Actor;
use crate::services::beds::{self, BedAction, BedChange, BedError};
use crate::services::handoff::HandoffError;
use crate::services::movements::MovementError;
use crate::services::optimistic::{self, Committed, PendingGuard, next_version};
use crate::services::repository::SaveOutcome;
use crate::services::store::StoreError;
use crate::state::{AppState, evict_settled};

#[derive(Debug, thiserror::Error)]
pub enum CensusError {
    #[error("invalid date: {0}")]
    InvalidDate(String),
    #[error("no census record for {0}")]
    NotFound(String),
    #[error("census record for {0} already exists")]
    AlreadyExists(String),
    #[error("a save for {0} is already in progress")]
    SaveInProgress(String),
    #[error(transparent)]
    Bed(#[from] BedError),
    #[error(transparent)]
    Movement(#[from] MovementError),
    #[error(transparent)]
    Handoff(#[from] HandoffError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for CensusError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidDate(_) => "E_INVALID_DATE",
            Self::NotFound(_) => "E_RECORD_NOT_FOUND",
            Self::AlreadyExists(_) => "E_RECORD_EXISTS",
            Self::SaveInProgress(_) => "E_SAVE_IN_PROGRESS",
            Self::Bed(e) => e.error_code(),
            Self::Movement(e) => e.error_code(),
            Self::Handoff(e) => e.error_code(),
            Self::Store(e) => e.error_code(),
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::SaveInProgress(_) => true,
            Self::Store(e) => e.retryable(),
            _ => false,
        }
    }
}

/// Canonical `YYYY-MM-DD` key.
///
/// # Errors
///
/// [`CensusError::InvalidDate`] if `raw` is not a calendar date.
pub fn date_key(raw: &str) -> Result<String, CensusError> {
    parse_date_key(raw)
        .map(format_date_key)
        .ok_or_else(|| CensusError::InvalidDate(raw.trim().to_owned()))
}

/// What an edit did, for the audit log.
#[derive(Debug, Clone, PartialEq)]
pub struct Audited {
    pub action: AuditAction,
    pub entity_type: &'static str,
    pub entity_id: String,
    pub details: serde_json::Value,
}

impl Audited {
    #[must_use]
    pub fn new(action: AuditAction, entity_type: &'static str, entity_id: impl Into<String>) -> Self {
        Self { action, entity_type, entity_id: entity_id.into(), details: serde_json::Value::Null }
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedRecord {
    pub record: DailyRecord,
    pub outcome: SaveOutcome,
}

// =============================================================================
// READS
// =============================================================================

/// Live copy of `date`, loading it from the repository on first access.
pub(crate) async fn load_live(state: &AppState, date: &str) -> Result<Option<DailyRecord>, CensusError> {
    if let Some(record) = state.live.read().await.get(date) {
        return Ok(Some(record.clone()));
    }
    let Some(record) = state.repo.load(date).await? else {
        return Ok(None);
    };
    let mut live = state.live.write().await;
    let current = live.entry(date.to_owned()).or_insert(record).clone();
    evict_settled(&mut live, &state.pending);
    Ok(Some(current))
}

/// # Errors
///
/// Invalid date, unknown day, or a storage failure.
pub async fn get_day(state: &AppState, date: &str) -> Result<DailyRecord, CensusError> {
    let date = date_key(date)?;
    load_live(state, &date).await?.ok_or(CensusError::NotFound(date))
}

/// # Errors
///
/// Storage failure with no cache to answer.
pub async fn list_days(state: &AppState) -> Result<Vec<String>, CensusError> {
    Ok(state.repo.list_dates().await?)
}

/// Latest record strictly before `date`, if any.
///
/// # Errors
///
/// Invalid date or a storage failure.
pub async fn previous_day(state: &AppState, date: &str) -> Result<Option<DailyRecord>, CensusError> {
    let date = date_key(date)?;
    Ok(state.repo.latest_before(&date).await?)
}

// =============================================================================
// LIFECYCLE
// =============================================================================

/// Carry beds forward from `previous` into a fresh record for `date`.
#[must_use]
pub fn copy_forward(previous: &DailyRecord, date: &str) -> DailyRecord {
    let mut record = DailyRecord::empty(date);
    record.beds.clone_from(&previous.beds);
    record.active_extra_beds.clone_from(&previous.active_extra_beds);
    record.ensure_catalogue();
    record
}

/// # Errors
///
/// Invalid date, [`CensusError::AlreadyExists`], a concurrent save, or a
/// storage failure.
pub async fn create_day(
    state: &AppState,
    actor: &Actor,
    date: &str,
    copy_previous: bool,
) -> Result<SavedRecord, CensusError> {
    let date = date_key(date)?;
    let _guard = PendingGuard::acquire(&state.pending, &date)?;

    if load_live(state, &date).await?.is_some() {
        return Err(CensusError::AlreadyExists(date));
    }

    let previous = if copy_previous { state.repo.latest_before(&date).await? } else { None };
    let mut record = match &previous {
        Some(previous) => copy_forward(previous, &date),
        None => DailyRecord::empty(&date),
    };
    record.last_updated = next_version(OffsetDateTime::UNIX_EPOCH);

    let outcome = state.repo.save(&record).await?;
    state.publish(record.clone()).await;
    info!(%date, copied_from = previous.as_ref().map(|p| p.date.as_str()), ?outcome, "census day created");

    let entry = AuditEntry::new(actor, AuditAction::DailyRecordCreated, "dailyRecord", &date)
        .with_record_date(&date)
        .with_details(serde_json::json!({ "copiedFrom": previous.map(|p| p.date) }));
    audit::record(state, entry).await;

    Ok(SavedRecord { record, outcome })
}

/// # Errors
///
/// Invalid date, unknown day, a concurrent save, or a storage failure.
pub async fn delete_day(state: &AppState, actor: &Actor, date: &str) -> Result<(), CensusError> {
    let date = date_key(date)?;
    let _guard = PendingGuard::acquire(&state.pending, &date)?;

    if !state.repo.delete(&date).await? {
        return Err(CensusError::NotFound(date));
    }
    state.live.write().await.remove(&date);
    info!(%date, "census day deleted");

    let entry = AuditEntry::new(actor, AuditAction::DailyRecordDeleted, "dailyRecord", &date).with_record_date(&date);
    audit::record(state, entry).await;
    Ok(())
}

// =============================================================================
// EDITS
// =============================================================================

/// Commit `mutate` for `date` and audit what it reports.
///
/// # Errors
///
/// Whatever the commit or the mutation returns.
pub async fn edit<T, F>(state: &AppState, actor: &Actor, date: &str, mutate: F) -> Result<Committed<T>, CensusError>
where
    F: FnOnce(&mut DailyRecord) -> Result<(T, Audited), CensusError>,
{
    let date = date_key(date)?;
    let committed = optimistic::commit(state, &date, mutate).await?;
    let (value, audited) = committed.value;

    let entry = AuditEntry::new(actor, audited.action, audited.entity_type, &audited.entity_id)
        .with_record_date(&date)
        .with_details(audited.details);
    audit::record(state, entry).await;

    Ok(Committed { record: committed.record, value, outcome: committed.outcome })
}

/// # Errors
///
/// The bed reducer's error, or a commit failure.
pub async fn apply_bed_action(
    state: &AppState,
    actor: &Actor,
    date: &str,
    action: BedAction,
) -> Result<Committed<BedChange>, CensusError> {
    edit(state, actor, date, |record| {
        let change = beds::apply(record, action)?;
        let audited = Audited::new(change.action, "bed", change.bed_id.clone())
            .with_details(serde_json::json!({ "patientName": change.patient_name }));
        Ok((change, audited))
    })
    .await
}

#[cfg(test)]
#[path = "census_test.rs"]
mod tests;
