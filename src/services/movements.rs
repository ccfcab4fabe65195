//! Patient movements: discharges, transfers and day-surgery entries.
//!
//! DESIGN
//! ======
//! Discharging or transferring a patient snapshots the bed occupant into the
//! movement entry (`originalData`) and empties the slot. Undo restores that
//! snapshot into the same slot and removes the entry, so an undo followed by
//! the same movement reproduces the original state.
//!
//! A main patient with an attached clinical crib cannot leave on their own:
//! the crib is discharged or transferred first, or removed explicitly.

use serde::Deserialize;
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::model::{
    BedDef, CmaData, DailyRecord, DischargeData, DischargeStatus, PatientData, Specialty, TransferData, find_bed,
    is_valid_clock,
};
use crate::services::beds::{self, BedError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MovementError {
    #[error(transparent)]
    Bed(#[from] BedError),
    #[error("bed {0} still has a clinical crib attached")]
    CribAttached(String),
    #[error("movement entry not found: {0}")]
    EntryNotFound(Uuid),
    #[error("movement entry {0} has no patient snapshot")]
    MissingSnapshot(Uuid),
    #[error("bed {0} is not available for restore")]
    BedNotAvailable(String),
    #[error("invalid time {0:?}, expected HH:MM")]
    InvalidTime(String),
    #[error("missing required field: {0}")]
    MissingField(&'static str),
}

impl ErrorCode for MovementError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Bed(e) => e.error_code(),
            Self::CribAttached(_) => "E_CRIB_ATTACHED",
            Self::EntryNotFound(_) => "E_ENTRY_NOT_FOUND",
            Self::MissingSnapshot(_) => "E_MISSING_SNAPSHOT",
            Self::BedNotAvailable(_) => "E_BED_NOT_AVAILABLE",
            Self::InvalidTime(_) => "E_INVALID_TIME",
            Self::MissingField(_) => "E_MISSING_FIELD",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementTarget {
    #[default]
    Main,
    Crib,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DischargeRequest {
    pub bed_id: String,
    pub status: DischargeStatus,
    pub time: String,
    pub target: MovementTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DischargePatch {
    pub status: Option<DischargeStatus>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferRequest {
    pub bed_id: String,
    pub time: String,
    pub evacuation_method: String,
    pub receiving_center: String,
    pub receiving_center_other: String,
    pub transfer_escort: String,
    pub target: MovementTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferPatch {
    pub time: Option<String>,
    pub evacuation_method: Option<String>,
    pub receiving_center: Option<String>,
    pub receiving_center_other: Option<String>,
    pub transfer_escort: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CmaRequest {
    pub bed_name: String,
    pub patient_name: String,
    pub rut: String,
    pub age: String,
    pub diagnosis: String,
    pub specialty: Option<Specialty>,
    pub intervention_type: String,
    pub department_origin: String,
}

// =============================================================================
// SLOT HELPERS
// =============================================================================

struct Detached {
    bed: &'static BedDef,
    patient: PatientData,
    is_nested: bool,
}

fn check_time(time: &str) -> Result<(), MovementError> {
    if is_valid_clock(time) {
        Ok(())
    } else {
        Err(MovementError::InvalidTime(time.to_owned()))
    }
}

fn detach(record: &mut DailyRecord, bed_id: &str, target: MovementTarget) -> Result<Detached, MovementError> {
    let bed = find_bed(bed_id).ok_or_else(|| BedError::UnknownBed(bed_id.to_owned()))?;
    let slot = beds::slot_mut(record, bed_id)?;
    if !slot.is_occupied() {
        return Err(BedError::NotOccupied(bed_id.to_owned()).into());
    }

    match target {
        MovementTarget::Main => {
            if slot.clinical_crib.as_deref().is_some_and(PatientData::is_occupied) {
                return Err(MovementError::CribAttached(bed_id.to_owned()));
            }
            let patient = slot.occupant_snapshot();
            slot.clear_occupant();
            Ok(Detached { bed, patient, is_nested: false })
        }
        MovementTarget::Crib => {
            if !slot.clinical_crib.as_deref().is_some_and(PatientData::is_occupied) {
                return Err(BedError::NoClinicalCrib(bed_id.to_owned()).into());
            }
            let crib = slot
                .clinical_crib
                .take()
                .ok_or_else(|| BedError::NoClinicalCrib(bed_id.to_owned()))?;
            Ok(Detached { bed, patient: *crib, is_nested: true })
        }
    }
}

fn restore(record: &mut DailyRecord, bed_id: &str, is_nested: bool, original: PatientData) -> Result<(), MovementError> {
    let unavailable = || MovementError::BedNotAvailable(bed_id.to_owned());
    if is_nested {
        let slot = beds::slot_mut(record, bed_id)?;
        if !slot.is_occupied() || slot.clinical_crib.as_deref().is_some_and(PatientData::is_occupied) {
            return Err(unavailable());
        }
        let mut crib = original;
        crib.bed_id = bed_id.to_owned();
        slot.clinical_crib = Some(Box::new(crib));
        return Ok(());
    }

    beds::ensure_usable(record, bed_id).map_err(|_| unavailable())?;
    let slot = beds::slot_mut(record, bed_id)?;
    if slot.is_blocked || slot.is_occupied() {
        return Err(unavailable());
    }
    let location = std::mem::take(&mut slot.location);
    *slot = original;
    slot.bed_id = bed_id.to_owned();
    slot.is_blocked = false;
    slot.blocked_reason.clear();
    if slot.location.is_empty() {
        slot.location = location;
    }
    Ok(())
}

// =============================================================================
// DISCHARGES
// =============================================================================

/// Discharge the occupant (or clinical crib) of a bed.
///
/// # Errors
///
/// Fails if the bed or crib is empty, a crib is still attached, or the time
/// is malformed. The record is unchanged on error.
pub fn discharge(record: &mut DailyRecord, request: DischargeRequest) -> Result<DischargeData, MovementError> {
    check_time(&request.time)?;
    let detached = detach(record, &request.bed_id, request.target)?;
    let patient = detached.patient;
    let entry = DischargeData {
        id: Uuid::new_v4(),
        bed_name: detached.bed.name.to_owned(),
        bed_id: detached.bed.id.to_owned(),
        bed_type: detached.bed.bed_type,
        patient_name: patient.patient_name.clone(),
        rut: patient.rut.clone(),
        diagnosis: patient.pathology.clone(),
        time: request.time.trim().to_owned(),
        status: request.status,
        age: patient.age.clone(),
        is_nested: detached.is_nested,
        original_data: Some(patient),
    };
    record.discharges.push(entry.clone());
    Ok(entry)
}

/// Put a discharged patient back in their bed and drop the entry.
///
/// # Errors
///
/// Fails if the entry is unknown, has no snapshot, or the slot is taken.
pub fn undo_discharge(record: &mut DailyRecord, id: Uuid) -> Result<DischargeData, MovementError> {
    let index = record
        .discharges
        .iter()
        .position(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    let entry = record.discharges[index].clone();
    let original = entry
        .original_data
        .clone()
        .ok_or(MovementError::MissingSnapshot(id))?;
    restore(record, &entry.bed_id, entry.is_nested, original)?;
    record.discharges.remove(index);
    Ok(entry)
}

/// # Errors
///
/// Fails if the entry is unknown or the new time is malformed.
pub fn update_discharge(
    record: &mut DailyRecord,
    id: Uuid,
    patch: DischargePatch,
) -> Result<DischargeData, MovementError> {
    if let Some(time) = &patch.time {
        check_time(time)?;
    }
    let entry = record
        .discharges
        .iter_mut()
        .find(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    if let Some(status) = patch.status {
        entry.status = status;
    }
    if let Some(time) = patch.time {
        entry.time = time.trim().to_owned();
    }
    Ok(entry.clone())
}

/// Remove the entry without restoring the patient.
///
/// # Errors
///
/// Fails if the entry is unknown.
pub fn delete_discharge(record: &mut DailyRecord, id: Uuid) -> Result<DischargeData, MovementError> {
    let index = record
        .discharges
        .iter()
        .position(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    Ok(record.discharges.remove(index))
}

// =============================================================================
// TRANSFERS
// =============================================================================

/// Transfer the occupant (or clinical crib) of a bed to another centre.
///
/// # Errors
///
/// Same as [`discharge`], plus a missing receiving centre.
pub fn transfer(record: &mut DailyRecord, request: TransferRequest) -> Result<TransferData, MovementError> {
    check_time(&request.time)?;
    if request.receiving_center.trim().is_empty() {
        return Err(MovementError::MissingField("receivingCenter"));
    }
    let detached = detach(record, &request.bed_id, request.target)?;
    let patient = detached.patient;
    let entry = TransferData {
        id: Uuid::new_v4(),
        bed_name: detached.bed.name.to_owned(),
        bed_id: detached.bed.id.to_owned(),
        bed_type: detached.bed.bed_type,
        patient_name: patient.patient_name.clone(),
        rut: patient.rut.clone(),
        diagnosis: patient.pathology.clone(),
        time: request.time.trim().to_owned(),
        evacuation_method: request.evacuation_method,
        receiving_center: request.receiving_center.trim().to_owned(),
        receiving_center_other: request.receiving_center_other,
        transfer_escort: request.transfer_escort,
        age: patient.age.clone(),
        is_nested: detached.is_nested,
        original_data: Some(patient),
    };
    record.transfers.push(entry.clone());
    Ok(entry)
}

/// # Errors
///
/// Fails if the entry is unknown, has no snapshot, or the slot is taken.
pub fn undo_transfer(record: &mut DailyRecord, id: Uuid) -> Result<TransferData, MovementError> {
    let index = record
        .transfers
        .iter()
        .position(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    let entry = record.transfers[index].clone();
    let original = entry
        .original_data
        .clone()
        .ok_or(MovementError::MissingSnapshot(id))?;
    restore(record, &entry.bed_id, entry.is_nested, original)?;
    record.transfers.remove(index);
    Ok(entry)
}

/// # Errors
///
/// Fails if the entry is unknown, the time is malformed, or the receiving
/// centre is blanked.
pub fn update_transfer(record: &mut DailyRecord, id: Uuid, patch: TransferPatch) -> Result<TransferData, MovementError> {
    if let Some(time) = &patch.time {
        check_time(time)?;
    }
    if patch
        .receiving_center
        .as_deref()
        .is_some_and(|center| center.trim().is_empty())
    {
        return Err(MovementError::MissingField("receivingCenter"));
    }
    let entry = record
        .transfers
        .iter_mut()
        .find(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    if let Some(time) = patch.time {
        entry.time = time.trim().to_owned();
    }
    if let Some(method) = patch.evacuation_method {
        entry.evacuation_method = method;
    }
    if let Some(center) = patch.receiving_center {
        entry.receiving_center = center.trim().to_owned();
    }
    if let Some(other) = patch.receiving_center_other {
        entry.receiving_center_other = other;
    }
    if let Some(escort) = patch.transfer_escort {
        entry.transfer_escort = escort;
    }
    Ok(entry.clone())
}

/// # Errors
///
/// Fails if the entry is unknown.
pub fn delete_transfer(record: &mut DailyRecord, id: Uuid) -> Result<TransferData, MovementError> {
    let index = record
        .transfers
        .iter()
        .position(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    Ok(record.transfers.remove(index))
}

// =============================================================================
// DAY SURGERY (CMA)
// =============================================================================

/// # Errors
///
/// Fails if the patient name is blank.
pub fn add_cma(record: &mut DailyRecord, request: CmaRequest) -> Result<CmaData, MovementError> {
    if request.patient_name.trim().is_empty() {
        return Err(MovementError::MissingField("patientName"));
    }
    let entry = CmaData {
        id: Uuid::new_v4(),
        bed_name: request.bed_name,
        patient_name: request.patient_name.trim().to_owned(),
        rut: request.rut,
        age: request.age,
        diagnosis: request.diagnosis,
        specialty: request.specialty,
        intervention_type: request.intervention_type,
        department_origin: request.department_origin,
    };
    record.cma.push(entry.clone());
    Ok(entry)
}

/// # Errors
///
/// Fails if the entry is unknown.
pub fn delete_cma(record: &mut DailyRecord, id: Uuid) -> Result<CmaData, MovementError> {
    let index = record
        .cma
        .iter()
        .position(|entry| entry.id == id)
        .ok_or(MovementError::EntryNotFound(id))?;
    Ok(record.cma.remove(index))
}

#[cfg(test)]
#[path = "movements_test.rs"]
mod tests;
