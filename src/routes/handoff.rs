//! Handoff routes: nursing handoff edits, medical notes and signature.

use axum::extract::{Path, State};
use axum::response::Json;
use serde::Deserialize;
use time::OffsetDateTime;

use super::CommitResponse;
use super::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{MedicalSignature, Shift};
use crate::services::audit::AuditAction;
use crate::services::auth::Permission;
use crate::services::census::{self, Audited};
use crate::services::handoff::{self, HandoffView, NursingUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalNoteBody {
    pub bed_id: String,
    pub note: String,
    #[serde(default)]
    pub crib: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignBody {
    pub doctor_name: String,
}

/// `GET /api/records/{date}/handoff/{shift}`
pub async fn get_handoff(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, shift)): Path<(String, String)>,
) -> Result<Json<HandoffView>, ApiError> {
    auth.require(Permission::ViewCensus)?;
    let shift = Shift::from_str(&shift).ok_or_else(|| ApiError::bad_request(format!("unknown shift: {shift}")))?;
    let record = census::get_day(&state, &date).await?;
    Ok(Json(handoff::handoff_view(&record, shift)))
}

/// `POST /api/records/{date}/handoff/nursing`
pub async fn update_nursing(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(update): Json<NursingUpdate>,
) -> Result<Json<CommitResponse<()>>, ApiError> {
    auth.require(Permission::EditHandoff)?;
    let entity_id = match &update {
        NursingUpdate::Note { bed_id, .. } => bed_id.clone(),
        NursingUpdate::Staff { .. } => "staff".to_owned(),
        NursingUpdate::Checklist { item, .. } => item.clone(),
        NursingUpdate::Novedades { .. } => "novedades".to_owned(),
    };
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        handoff::apply_nursing(record, update)?;
        Ok(((), Audited::new(AuditAction::HandoffUpdated, "nursingHandoff", entity_id)))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `POST /api/records/{date}/handoff/medical`
pub async fn update_medical_note(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(body): Json<MedicalNoteBody>,
) -> Result<Json<CommitResponse<()>>, ApiError> {
    auth.require(Permission::EditMedicalHandoff)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        handoff::set_medical_note(record, &body.bed_id, &body.note, body.crib)?;
        let audited = Audited::new(AuditAction::HandoffUpdated, "medicalHandoff", body.bed_id.clone())
            .with_details(serde_json::json!({ "crib": body.crib }));
        Ok(((), audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `POST /api/records/{date}/handoff/medical/sign`
pub async fn sign_medical(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(body): Json<SignBody>,
) -> Result<Json<CommitResponse<MedicalSignature>>, ApiError> {
    auth.require(Permission::SignMedicalHandoff)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let signature = handoff::sign_medical_handoff(record, &body.doctor_name, OffsetDateTime::now_utc())?;
        let audited = Audited::new(AuditAction::MedicalHandoffSigned, "medicalHandoff", record.date.clone())
            .with_details(serde_json::json!({ "doctorName": signature.doctor_name }));
        Ok((signature, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

#[cfg(test)]
#[path = "handoff_test.rs"]
mod tests;
