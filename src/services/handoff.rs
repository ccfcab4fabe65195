//! Shift handoff: nursing notes per bed and shift, staff, checklist and
//! novedades, plus the medical handoff with its one-time signature.
//!
//! Once the medical handoff is signed its notes are frozen; nursing notes stay
//! editable.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ErrorCode;
use crate::model::{DailyRecord, MedicalSignature, PatientData, PatientStatus, Shift, active_beds};
use crate::services::beds::{self, BedError};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum HandoffError {
    #[error(transparent)]
    Bed(#[from] BedError),
    #[error("medical handoff already signed")]
    AlreadySigned,
    #[error("doctor name is required")]
    MissingDoctor,
    #[error("checklist item name is required")]
    MissingItem,
}

impl ErrorCode for HandoffError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Bed(e) => e.error_code(),
            Self::AlreadySigned => "E_ALREADY_SIGNED",
            Self::MissingDoctor => "E_MISSING_DOCTOR",
            Self::MissingItem => "E_MISSING_ITEM",
        }
    }
}

fn note_target<'a>(record: &'a mut DailyRecord, bed_id: &str, crib: bool) -> Result<&'a mut PatientData, HandoffError> {
    let slot = beds::slot_mut(record, bed_id)?;
    if !slot.is_occupied() {
        return Err(BedError::NotOccupied(bed_id.to_owned()).into());
    }
    if !crib {
        return Ok(slot);
    }
    slot.clinical_crib
        .as_deref_mut()
        .filter(|crib| crib.is_occupied())
        .ok_or_else(|| BedError::NoClinicalCrib(bed_id.to_owned()).into())
}

/// # Errors
///
/// Fails if the bed (or its clinical crib) is empty.
pub fn set_patient_note(
    record: &mut DailyRecord,
    bed_id: &str,
    shift: Shift,
    note: &str,
    crib: bool,
) -> Result<(), HandoffError> {
    let patient = note_target(record, bed_id, crib)?;
    let slot = match shift {
        Shift::Day => &mut patient.handoff_note_day_shift,
        Shift::Night => &mut patient.handoff_note_night_shift,
    };
    note.clone_into(slot);
    Ok(())
}

/// # Errors
///
/// Fails once the medical handoff is signed, or if the bed is empty.
pub fn set_medical_note(record: &mut DailyRecord, bed_id: &str, note: &str, crib: bool) -> Result<(), HandoffError> {
    if record.medical_signature.is_some() {
        return Err(HandoffError::AlreadySigned);
    }
    let patient = note_target(record, bed_id, crib)?;
    note.clone_into(&mut patient.medical_handoff_note);
    Ok(())
}

/// Replace the shift's nurse and TENS rosters. Blank names are dropped.
pub fn set_staff(record: &mut DailyRecord, shift: Shift, nurses: Vec<String>, tens: Vec<String>) {
    let clean = |names: Vec<String>| -> Vec<String> {
        names
            .into_iter()
            .map(|name| name.trim().to_owned())
            .filter(|name| !name.is_empty())
            .collect()
    };
    *record.nurses.get_mut(shift) = clean(nurses);
    *record.tens.get_mut(shift) = clean(tens);
}

/// # Errors
///
/// Fails if the item name is blank.
pub fn set_checklist_item(record: &mut DailyRecord, shift: Shift, item: &str, checked: bool) -> Result<(), HandoffError> {
    let item = item.trim();
    if item.is_empty() {
        return Err(HandoffError::MissingItem);
    }
    record.handoff_checklist.get_mut(shift).insert(item.to_owned(), checked);
    Ok(())
}

pub fn set_novedades(record: &mut DailyRecord, shift: Shift, text: &str) {
    text.clone_into(record.handoff_novedades.get_mut(shift));
}

/// Sign the medical handoff. A day is signed at most once.
///
/// # Errors
///
/// [`HandoffError::MissingDoctor`] for a blank name,
/// [`HandoffError::AlreadySigned`] if a signature exists.
pub fn sign_medical_handoff(
    record: &mut DailyRecord,
    doctor: &str,
    now: OffsetDateTime,
) -> Result<MedicalSignature, HandoffError> {
    let doctor = doctor.trim();
    if doctor.is_empty() {
        return Err(HandoffError::MissingDoctor);
    }
    if record.medical_signature.is_some() {
        return Err(HandoffError::AlreadySigned);
    }
    let signature = MedicalSignature { doctor_name: doctor.to_owned(), signed_at: now };
    record.medical_handoff_doctor = Some(doctor.to_owned());
    record.medical_signature = Some(signature.clone());
    Ok(signature)
}

// =============================================================================
// VIEW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffEntry {
    pub bed_id: String,
    pub bed_name: String,
    pub is_crib: bool,
    pub patient_name: String,
    pub pathology: String,
    pub status: Option<PatientStatus>,
    pub note: String,
    pub medical_note: String,
}

impl HandoffEntry {
    fn from_patient(bed_id: &str, bed_name: &str, is_crib: bool, patient: &PatientData, shift: Shift) -> Self {
        let note = match shift {
            Shift::Day => &patient.handoff_note_day_shift,
            Shift::Night => &patient.handoff_note_night_shift,
        };
        Self {
            bed_id: bed_id.to_owned(),
            bed_name: bed_name.to_owned(),
            is_crib,
            patient_name: patient.patient_name.clone(),
            pathology: patient.pathology.clone(),
            status: patient.status,
            note: note.clone(),
            medical_note: patient.medical_handoff_note.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HandoffView {
    pub date: String,
    pub shift: Shift,
    pub nurses: Vec<String>,
    pub tens: Vec<String>,
    pub checklist: BTreeMap<String, bool>,
    pub novedades: String,
    pub medical_signature: Option<MedicalSignature>,
    pub entries: Vec<HandoffEntry>,
}

/// Occupied beds in display order, each followed by its clinical crib.
#[must_use]
pub fn handoff_view(record: &DailyRecord, shift: Shift) -> HandoffView {
    let mut entries = Vec::new();
    for bed in active_beds(record) {
        let Some(slot) = record.beds.get(bed.id).filter(|slot| slot.is_occupied()) else {
            continue;
        };
        entries.push(HandoffEntry::from_patient(bed.id, bed.name, false, slot, shift));
        if let Some(crib) = slot.clinical_crib.as_deref().filter(|crib| crib.is_occupied()) {
            entries.push(HandoffEntry::from_patient(bed.id, bed.name, true, crib, shift));
        }
    }
    HandoffView {
        date: record.date.clone(),
        shift,
        nurses: record.nurses.get(shift).clone(),
        tens: record.tens.get(shift).clone(),
        checklist: record.handoff_checklist.get(shift).clone(),
        novedades: record.handoff_novedades.get(shift).clone(),
        medical_signature: record.medical_signature.clone(),
        entries,
    }
}

// =============================================================================
// REQUESTS
// =============================================================================

/// Nursing handoff edit. One request updates one thing.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum NursingUpdate {
    Note {
        bed_id: String,
        shift: Shift,
        note: String,
        #[serde(default)]
        crib: bool,
    },
    Staff {
        shift: Shift,
        #[serde(default)]
        nurses: Vec<String>,
        #[serde(default)]
        tens: Vec<String>,
    },
    Checklist {
        shift: Shift,
        item: String,
        checked: bool,
    },
    Novedades {
        shift: Shift,
        text: String,
    },
}

/// # Errors
///
/// Propagates the error of the underlying edit.
pub fn apply_nursing(record: &mut DailyRecord, update: NursingUpdate) -> Result<(), HandoffError> {
    match update {
        NursingUpdate::Note { bed_id, shift, note, crib } => set_patient_note(record, &bed_id, shift, &note, crib),
        NursingUpdate::Staff { shift, nurses, tens } => {
            set_staff(record, shift, nurses, tens);
            Ok(())
        }
        NursingUpdate::Checklist { shift, item, checked } => set_checklist_item(record, shift, &item, checked),
        NursingUpdate::Novedades { shift, text } => {
            set_novedades(record, shift, &text);
            Ok(())
        }
    }
}

#[cfg(test)]
#[path = "handoff_test.rs"]
mod tests;
