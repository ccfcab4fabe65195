//! Bed-state reducer.
//!
//! DESIGN
//! ======
//! `apply` is a pure function over a `DailyRecord`: it validates the action
//! against the current bed state, mutates the record in place, and reports
//! which audit action the change represents. It never touches storage; the
//! caller runs it inside an optimistic commit.
//!
//! INVARIANTS
//! ==========
//! - A bed is occupied iff its trimmed patient name is non-empty.
//! - A blocked bed has no occupant.
//! - A clinical crib only hangs off an occupied bed.
//! - Inactive extra beds cannot receive patients.

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::model::{BedMode, CudyrScore, DailyRecord, PatientData, PatientStatus, Specialty, find_bed};
use crate::services::audit::AuditAction;
use crate::services::cudyr::{self, CudyrError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BedError {
    #[error("unknown bed: {0}")]
    UnknownBed(String),
    #[error("bed {0} is blocked")]
    BedBlocked(String),
    #[error("bed {0} is occupied")]
    BedOccupied(String),
    #[error("bed {0} is empty")]
    NotOccupied(String),
    #[error("patient name is required")]
    MissingName,
    #[error("bed {0} is not an extra bed")]
    NotExtraBed(String),
    #[error("extra bed {0} is not active")]
    ExtraBedInactive(String),
    #[error("bed {0} has no clinical crib")]
    NoClinicalCrib(String),
    #[error("bed {0} already has a clinical crib")]
    CribPresent(String),
    #[error("source and target bed are the same")]
    SameBed,
    #[error(transparent)]
    Cudyr(#[from] CudyrError),
}

impl ErrorCode for BedError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::UnknownBed(_) => "E_UNKNOWN_BED",
            Self::BedBlocked(_) => "E_BED_BLOCKED",
            Self::BedOccupied(_) => "E_BED_OCCUPIED",
            Self::NotOccupied(_) => "E_BED_EMPTY",
            Self::MissingName => "E_MISSING_NAME",
            Self::NotExtraBed(_) => "E_NOT_EXTRA_BED",
            Self::ExtraBedInactive(_) => "E_EXTRA_BED_INACTIVE",
            Self::NoClinicalCrib(_) => "E_NO_CLINICAL_CRIB",
            Self::CribPresent(_) => "E_CRIB_PRESENT",
            Self::SameBed => "E_SAME_BED",
            Self::Cudyr(e) => e.error_code(),
        }
    }
}

/// Field-level patch. Absent fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientPatch {
    pub patient_name: Option<String>,
    pub rut: Option<String>,
    pub age: Option<String>,
    pub pathology: Option<String>,
    pub specialty: Option<Specialty>,
    pub status: Option<PatientStatus>,
    pub admission_date: Option<String>,
    pub has_wristband: Option<bool>,
    pub devices: Option<Vec<String>>,
    pub surgical_complication: Option<bool>,
    pub is_upc: Option<bool>,
    pub location: Option<String>,
}

impl PatientPatch {
    fn apply_to(self, patient: &mut PatientData) -> Result<(), BedError> {
        if let Some(name) = self.patient_name {
            if name.trim().is_empty() {
                return Err(BedError::MissingName);
            }
            patient.patient_name = name;
        }
        if let Some(rut) = self.rut {
            patient.rut = rut;
        }
        if let Some(age) = self.age {
            patient.age = age;
        }
        if let Some(pathology) = self.pathology {
            patient.pathology = pathology;
        }
        if let Some(specialty) = self.specialty {
            patient.specialty = Some(specialty);
        }
        if let Some(status) = self.status {
            patient.status = Some(status);
        }
        if let Some(admission_date) = self.admission_date {
            patient.admission_date = admission_date;
        }
        if let Some(has_wristband) = self.has_wristband {
            patient.has_wristband = has_wristband;
        }
        if let Some(devices) = self.devices {
            patient.devices = devices;
        }
        if let Some(surgical_complication) = self.surgical_complication {
            patient.surgical_complication = surgical_complication;
        }
        if let Some(is_upc) = self.is_upc {
            patient.is_upc = is_upc;
        }
        if let Some(location) = self.location {
            patient.location = location;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum BedAction {
    Admit {
        bed_id: String,
        patient: PatientData,
    },
    UpdatePatient {
        bed_id: String,
        patch: PatientPatch,
        #[serde(default)]
        crib: bool,
    },
    Clear {
        bed_id: String,
    },
    Block {
        bed_id: String,
        #[serde(default)]
        reason: String,
    },
    Unblock {
        bed_id: String,
    },
    Move {
        from: String,
        to: String,
    },
    ToggleExtraBed {
        bed_id: String,
    },
    SetBedMode {
        bed_id: String,
        mode: BedMode,
    },
    SetCompanionCrib {
        bed_id: String,
        enabled: bool,
    },
    AddClinicalCrib {
        bed_id: String,
        patient: PatientData,
    },
    RemoveClinicalCrib {
        bed_id: String,
    },
    SetCudyr {
        bed_id: String,
        score: Option<CudyrScore>,
        #[serde(default)]
        crib: bool,
    },
}

/// What a successful action changed, for audit and logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BedChange {
    pub action: AuditAction,
    pub bed_id: String,
    pub patient_name: Option<String>,
}

impl BedChange {
    fn new(action: AuditAction, bed_id: &str, patient_name: Option<&str>) -> Self {
        Self { action, bed_id: bed_id.to_owned(), patient_name: patient_name.map(str::to_owned) }
    }
}

/// Look up a catalogue bed's slot, creating it if an older document lacks it.
pub(crate) fn slot_mut<'a>(record: &'a mut DailyRecord, bed_id: &str) -> Result<&'a mut PatientData, BedError> {
    let bed = find_bed(bed_id).ok_or_else(|| BedError::UnknownBed(bed_id.to_owned()))?;
    Ok(record
        .beds
        .entry(bed.id.to_owned())
        .or_insert_with(|| PatientData::empty(bed.id)))
}

pub(crate) fn ensure_usable(record: &DailyRecord, bed_id: &str) -> Result<(), BedError> {
    let bed = find_bed(bed_id).ok_or_else(|| BedError::UnknownBed(bed_id.to_owned()))?;
    if bed.is_extra && !record.is_extra_active(bed.id) {
        return Err(BedError::ExtraBedInactive(bed_id.to_owned()));
    }
    Ok(())
}

fn occupied_mut<'a>(record: &'a mut DailyRecord, bed_id: &str) -> Result<&'a mut PatientData, BedError> {
    let slot = slot_mut(record, bed_id)?;
    if !slot.is_occupied() {
        return Err(BedError::NotOccupied(bed_id.to_owned()));
    }
    Ok(slot)
}

/// CUDYR scores of a patient and of any clinical crib riding along.
fn validate_scores(patient: &PatientData) -> Result<(), BedError> {
    if let Some(score) = &patient.cudyr {
        cudyr::validate(score)?;
    }
    if let Some(score) = patient.clinical_crib.as_deref().and_then(|crib| crib.cudyr.as_ref()) {
        cudyr::validate(score)?;
    }
    Ok(())
}

/// Apply one action to the record.
///
/// # Errors
///
/// Returns a [`BedError`] when the action would break a bed invariant. The
/// record is left unchanged on error.
pub fn apply(record: &mut DailyRecord, action: BedAction) -> Result<BedChange, BedError> {
    let default_admission = record.date.clone();
    match action {
        BedAction::Admit { bed_id, mut patient } => {
            ensure_usable(record, &bed_id)?;
            if !patient.is_occupied() {
                return Err(BedError::MissingName);
            }
            let slot = slot_mut(record, &bed_id)?;
            if slot.is_blocked {
                return Err(BedError::BedBlocked(bed_id));
            }
            if slot.is_occupied() {
                return Err(BedError::BedOccupied(bed_id));
            }
            validate_scores(&patient)?;
            patient.bed_id.clone_from(&bed_id);
            patient.is_blocked = false;
            patient.blocked_reason.clear();
            if patient.admission_date.trim().is_empty() {
                patient.admission_date = default_admission;
            }
            if patient.location.is_empty() {
                patient.location.clone_from(&slot.location);
            }
            if let Some(crib) = patient.clinical_crib.as_deref_mut() {
                crib.bed_id.clone_from(&bed_id);
            }
            let name = patient.patient_name.clone();
            *slot = patient;
            Ok(BedChange::new(AuditAction::PatientAdmitted, &bed_id, Some(name.as_str())))
        }
        BedAction::UpdatePatient { bed_id, patch, crib } => {
            let slot = occupied_mut(record, &bed_id)?;
            let target = if crib {
                slot.clinical_crib
                    .as_deref_mut()
                    .ok_or_else(|| BedError::NoClinicalCrib(bed_id.clone()))?
            } else {
                slot
            };
            // Patch a copy so a rejected field leaves the slot untouched.
            let mut patched = target.clone();
            patch.apply_to(&mut patched)?;
            *target = patched;
            let name = target.patient_name.clone();
            Ok(BedChange::new(AuditAction::PatientModified, &bed_id, Some(name.as_str())))
        }
        BedAction::Clear { bed_id } => {
            let slot = occupied_mut(record, &bed_id)?;
            if slot.clinical_crib.as_deref().is_some_and(PatientData::is_occupied) {
                return Err(BedError::CribPresent(bed_id));
            }
            let name = slot.patient_name.clone();
            slot.clear_occupant();
            Ok(BedChange::new(AuditAction::PatientCleared, &bed_id, Some(name.as_str())))
        }
        BedAction::Block { bed_id, reason } => {
            let slot = slot_mut(record, &bed_id)?;
            if slot.is_occupied() {
                return Err(BedError::BedOccupied(bed_id));
            }
            slot.is_blocked = true;
            slot.blocked_reason = reason.trim().to_owned();
            Ok(BedChange::new(AuditAction::BedBlocked, &bed_id, None))
        }
        BedAction::Unblock { bed_id } => {
            let slot = slot_mut(record, &bed_id)?;
            slot.is_blocked = false;
            slot.blocked_reason.clear();
            Ok(BedChange::new(AuditAction::BedUnblocked, &bed_id, None))
        }
        BedAction::Move { from, to } => {
            if from == to {
                return Err(BedError::SameBed);
            }
            ensure_usable(record, &to)?;
            let source = occupied_mut(record, &from)?.clone();
            let target = slot_mut(record, &to)?;
            if target.is_blocked {
                return Err(BedError::BedBlocked(to));
            }
            if target.is_occupied() {
                return Err(BedError::BedOccupied(to));
            }

            let mut moved = source;
            moved.bed_id.clone_from(&to);
            moved.location.clone_from(&target.location);
            if let Some(crib) = moved.clinical_crib.as_deref_mut() {
                crib.bed_id.clone_from(&to);
            }
            let name = moved.patient_name.clone();
            *target = moved;
            slot_mut(record, &from)?.clear_occupant();
            Ok(BedChange::new(AuditAction::PatientMoved, &to, Some(name.as_str())))
        }
        BedAction::ToggleExtraBed { bed_id } => {
            let bed = find_bed(&bed_id).ok_or_else(|| BedError::UnknownBed(bed_id.clone()))?;
            if !bed.is_extra {
                return Err(BedError::NotExtraBed(bed_id));
            }
            if record.is_extra_active(bed.id) {
                if record.beds.get(bed.id).is_some_and(PatientData::is_occupied) {
                    return Err(BedError::BedOccupied(bed_id));
                }
                record.active_extra_beds.retain(|id| id != bed.id);
            } else {
                record.active_extra_beds.push(bed.id.to_owned());
            }
            Ok(BedChange::new(AuditAction::ExtraBedToggled, &bed_id, None))
        }
        BedAction::SetBedMode { bed_id, mode } => {
            let slot = slot_mut(record, &bed_id)?;
            if slot.is_blocked {
                return Err(BedError::BedBlocked(bed_id));
            }
            slot.bed_mode = mode;
            let name = slot.is_occupied().then(|| slot.patient_name.clone());
            Ok(BedChange::new(AuditAction::PatientModified, &bed_id, name.as_deref()))
        }
        BedAction::SetCompanionCrib { bed_id, enabled } => {
            let slot = occupied_mut(record, &bed_id)?;
            slot.has_companion_crib = enabled;
            let name = slot.patient_name.clone();
            Ok(BedChange::new(AuditAction::PatientModified, &bed_id, Some(name.as_str())))
        }
        BedAction::AddClinicalCrib { bed_id, mut patient } => {
            if !patient.is_occupied() {
                return Err(BedError::MissingName);
            }
            patient.clinical_crib = None;
            validate_scores(&patient)?;
            let slot = occupied_mut(record, &bed_id)?;
            if slot.clinical_crib.as_deref().is_some_and(PatientData::is_occupied) {
                return Err(BedError::CribPresent(bed_id));
            }
            patient.bed_id.clone_from(&bed_id);
            patient.is_blocked = false;
            patient.bed_mode = BedMode::Cuna;
            if patient.admission_date.trim().is_empty() {
                patient.admission_date = default_admission;
            }
            let name = patient.patient_name.clone();
            slot.clinical_crib = Some(Box::new(patient));
            Ok(BedChange::new(AuditAction::ClinicalCribChanged, &bed_id, Some(name.as_str())))
        }
        BedAction::RemoveClinicalCrib { bed_id } => {
            let slot = slot_mut(record, &bed_id)?;
            let crib = slot
                .clinical_crib
                .take()
                .ok_or_else(|| BedError::NoClinicalCrib(bed_id.clone()))?;
            Ok(BedChange::new(AuditAction::ClinicalCribChanged, &bed_id, Some(crib.patient_name.as_str())))
        }
        BedAction::SetCudyr { bed_id, score, crib } => {
            if let Some(score) = &score {
                cudyr::validate(score)?;
            }
            let slot = occupied_mut(record, &bed_id)?;
            let target = if crib {
                slot.clinical_crib
                    .as_deref_mut()
                    .ok_or_else(|| BedError::NoClinicalCrib(bed_id.clone()))?
            } else {
                slot
            };
            target.cudyr = score;
            let name = target.patient_name.clone();
            Ok(BedChange::new(AuditAction::CudyrUpdated, &bed_id, Some(name.as_str())))
        }
    }
}

#[cfg(test)]
#[path = "beds_test.rs"]
mod tests;
