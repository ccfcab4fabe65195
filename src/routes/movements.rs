//! Movement routes: discharges, transfers and day-surgery entries.

use axum::extract::{Path, State};
use axum::response::Json;
use uuid::Uuid;

use super::CommitResponse;
use super::auth::AuthUser;
use crate::error::ApiError;
use crate::model::{CmaData, DischargeData, TransferData};
use crate::services::audit::AuditAction;
use crate::services::auth::Permission;
use crate::services::census::{self, Audited};
use crate::services::movements::{
    self, CmaRequest, DischargePatch, DischargeRequest, TransferPatch, TransferRequest,
};
use crate::state::AppState;

fn discharge_audit(action: AuditAction, entry: &DischargeData) -> Audited {
    Audited::new(action, "discharge", entry.id.to_string()).with_details(serde_json::json!({
        "bedId": entry.bed_id,
        "patientName": entry.patient_name,
        "status": entry.status,
    }))
}

fn transfer_audit(action: AuditAction, entry: &TransferData) -> Audited {
    Audited::new(action, "transfer", entry.id.to_string()).with_details(serde_json::json!({
        "bedId": entry.bed_id,
        "patientName": entry.patient_name,
        "receivingCenter": entry.receiving_center,
    }))
}

fn cma_audit(action: AuditAction, entry: &CmaData) -> Audited {
    Audited::new(action, "cma", entry.id.to_string())
        .with_details(serde_json::json!({ "patientName": entry.patient_name }))
}

// =============================================================================
// DISCHARGES
// =============================================================================

/// `POST /api/records/{date}/discharges`
pub async fn create_discharge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(body): Json<DischargeRequest>,
) -> Result<Json<CommitResponse<DischargeData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::discharge(record, body)?;
        let audited = discharge_audit(AuditAction::PatientDischarged, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `PATCH /api/records/{date}/discharges/{id}`
pub async fn update_discharge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
    Json(patch): Json<DischargePatch>,
) -> Result<Json<CommitResponse<DischargeData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::update_discharge(record, id, patch)?;
        let audited = discharge_audit(AuditAction::DischargeModified, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `DELETE /api/records/{date}/discharges/{id}`
pub async fn delete_discharge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
) -> Result<Json<CommitResponse<DischargeData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::delete_discharge(record, id)?;
        let audited = discharge_audit(AuditAction::DischargeDeleted, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `POST /api/records/{date}/discharges/{id}/undo`
pub async fn undo_discharge(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
) -> Result<Json<CommitResponse<DischargeData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::undo_discharge(record, id)?;
        let audited = discharge_audit(AuditAction::DischargeUndone, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

// =============================================================================
// TRANSFERS
// =============================================================================

/// `POST /api/records/{date}/transfers`
pub async fn create_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(body): Json<TransferRequest>,
) -> Result<Json<CommitResponse<TransferData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::transfer(record, body)?;
        let audited = transfer_audit(AuditAction::PatientTransferred, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `PATCH /api/records/{date}/transfers/{id}`
pub async fn update_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
    Json(patch): Json<TransferPatch>,
) -> Result<Json<CommitResponse<TransferData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::update_transfer(record, id, patch)?;
        let audited = transfer_audit(AuditAction::TransferModified, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `DELETE /api/records/{date}/transfers/{id}`
pub async fn delete_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
) -> Result<Json<CommitResponse<TransferData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::delete_transfer(record, id)?;
        let audited = transfer_audit(AuditAction::TransferDeleted, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `POST /api/records/{date}/transfers/{id}/undo`
pub async fn undo_transfer(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
) -> Result<Json<CommitResponse<TransferData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::undo_transfer(record, id)?;
        let audited = transfer_audit(AuditAction::TransferUndone, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

// =============================================================================
// CMA
// =============================================================================

/// `POST /api/records/{date}/cma`
pub async fn create_cma(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(date): Path<String>,
    Json(body): Json<CmaRequest>,
) -> Result<Json<CommitResponse<CmaData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::add_cma(record, body)?;
        let audited = cma_audit(AuditAction::CmaAdded, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

/// `DELETE /api/records/{date}/cma/{id}`
pub async fn delete_cma(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((date, id)): Path<(String, Uuid)>,
) -> Result<Json<CommitResponse<CmaData>>, ApiError> {
    auth.require(Permission::EditBeds)?;
    let committed = census::edit(&state, &auth.actor, &date, |record| {
        let entry = movements::delete_cma(record, id)?;
        let audited = cma_audit(AuditAction::CmaDeleted, &entry);
        Ok((entry, audited))
    })
    .await?;
    Ok(Json(committed.into()))
}

#[cfg(test)]
#[path = "movements_test.rs"]
mod tests;
