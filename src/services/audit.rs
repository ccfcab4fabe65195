//! Audit log: who changed what, on which census day.
//!
//! ERROR HANDLING
//! ==============
//! Audit writes are best effort. A failed write is logged and swallowed so a
//! storage hiccup on the audit table never rolls back a clinical change.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use crate::services::auth::Actor;
use crate::state::AppState;

pub const DEFAULT_AUDIT_LIMIT: usize = 100;
pub const MAX_AUDIT_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    DailyRecordCreated,
    DailyRecordDeleted,
    PatientAdmitted,
    PatientModified,
    PatientCleared,
    PatientMoved,
    BedBlocked,
    BedUnblocked,
    ExtraBedToggled,
    ClinicalCribChanged,
    CudyrUpdated,
    PatientDischarged,
    DischargeUndone,
    DischargeModified,
    DischargeDeleted,
    PatientTransferred,
    TransferUndone,
    TransferModified,
    TransferDeleted,
    CmaAdded,
    CmaDeleted,
    HandoffUpdated,
    MedicalHandoffSigned,
    CensusEmailSent,
}

impl AuditAction {
    pub const ALL: [Self; 24] = [
        Self::DailyRecordCreated,
        Self::DailyRecordDeleted,
        Self::PatientAdmitted,
        Self::PatientModified,
        Self::PatientCleared,
        Self::PatientMoved,
        Self::BedBlocked,
        Self::BedUnblocked,
        Self::ExtraBedToggled,
        Self::ClinicalCribChanged,
        Self::CudyrUpdated,
        Self::PatientDischarged,
        Self::DischargeUndone,
        Self::DischargeModified,
        Self::DischargeDeleted,
        Self::PatientTransferred,
        Self::TransferUndone,
        Self::TransferModified,
        Self::TransferDeleted,
        Self::CmaAdded,
        Self::CmaDeleted,
        Self::HandoffUpdated,
        Self::MedicalHandoffSigned,
        Self::CensusEmailSent,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DailyRecordCreated => "DAILY_RECORD_CREATED",
            Self::DailyRecordDeleted => "DAILY_RECORD_DELETED",
            Self::PatientAdmitted => "PATIENT_ADMITTED",
            Self::PatientModified => "PATIENT_MODIFIED",
            Self::PatientCleared => "PATIENT_CLEARED",
            Self::PatientMoved => "PATIENT_MOVED",
            Self::BedBlocked => "BED_BLOCKED",
            Self::BedUnblocked => "BED_UNBLOCKED",
            Self::ExtraBedToggled => "EXTRA_BED_TOGGLED",
            Self::ClinicalCribChanged => "CLINICAL_CRIB_CHANGED",
            Self::CudyrUpdated => "CUDYR_UPDATED",
            Self::PatientDischarged => "PATIENT_DISCHARGED",
            Self::DischargeUndone => "DISCHARGE_UNDONE",
            Self::DischargeModified => "DISCHARGE_MODIFIED",
            Self::DischargeDeleted => "DISCHARGE_DELETED",
            Self::PatientTransferred => "PATIENT_TRANSFERRED",
            Self::TransferUndone => "TRANSFER_UNDONE",
            Self::TransferModified => "TRANSFER_MODIFIED",
            Self::TransferDeleted => "TRANSFER_DELETED",
            Self::CmaAdded => "CMA_ADDED",
            Self::CmaDeleted => "CMA_DELETED",
            Self::HandoffUpdated => "HANDOFF_UPDATED",
            Self::MedicalHandoffSigned => "MEDICAL_HANDOFF_SIGNED",
            Self::CensusEmailSent => "CENSUS_EMAIL_SENT",
        }
    }

    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(raw))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub user_email: Option<String>,
    pub user_role: String,
    pub action: AuditAction,
    pub entity_type: String,
    pub entity_id: String,
    pub record_date: Option<String>,
    pub details: serde_json::Value,
}

impl AuditEntry {
    #[must_use]
    pub fn new(actor: &Actor, action: AuditAction, entity_type: &str, entity_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: OffsetDateTime::now_utc(),
            user_email: actor.email.clone(),
            user_role: actor.role.as_str().to_owned(),
            action,
            entity_type: entity_type.to_owned(),
            entity_id: entity_id.to_owned(),
            record_date: None,
            details: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn with_record_date(mut self, date: &str) -> Self {
        self.record_date = Some(date.to_owned());
        self
    }

    #[must_use]
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditFilter {
    pub date: Option<String>,
    pub action: Option<AuditAction>,
    pub user: Option<String>,
    pub limit: usize,
}

impl AuditFilter {
    #[must_use]
    pub fn matches(&self, entry: &AuditEntry) -> bool {
        if let Some(date) = &self.date
            && entry.record_date.as_deref() != Some(date.as_str())
        {
            return false;
        }
        if let Some(action) = self.action
            && entry.action != action
        {
            return false;
        }
        if let Some(user) = &self.user
            && entry.user_email.as_deref() != Some(user.as_str())
        {
            return false;
        }
        true
    }
}

#[must_use]
pub fn clamp_limit(requested: Option<usize>) -> usize {
    requested.unwrap_or(DEFAULT_AUDIT_LIMIT).clamp(1, MAX_AUDIT_LIMIT)
}

/// Append an entry. Never fails the caller.
pub async fn record(state: &AppState, entry: AuditEntry) {
    if let Err(e) = state.repo.store().append_audit(&entry).await {
        warn!(error = %e, action = entry.action.as_str(), entity_id = %entry.entity_id, "audit write failed");
    }
}

#[cfg(test)]
#[path = "audit_test.rs"]
mod tests;
