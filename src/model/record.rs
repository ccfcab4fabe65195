//! Census documents as they are persisted.
//!
//! DESIGN
//! ======
//! Records are stored as JSON documents keyed by `YYYY-MM-DD`, so every
//! struct uses camelCase keys and tolerates missing optional fields. Older
//! documents that lack a field deserialize to its default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::beds::{BEDS, BedType};

// =============================================================================
// PATIENT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Specialty {
    #[serde(rename = "Medicina")]
    Medicina,
    #[serde(rename = "Cirugía")]
    Cirugia,
    #[serde(rename = "Traumatología")]
    Traumatologia,
    #[serde(rename = "Ginecobstetricia")]
    Ginecobstetricia,
    #[serde(rename = "Pediatría")]
    Pediatria,
    #[serde(rename = "Psiquiatría")]
    Psiquiatria,
    #[serde(rename = "Otro")]
    Otro,
}

impl Specialty {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Medicina => "Medicina",
            Self::Cirugia => "Cirugía",
            Self::Traumatologia => "Traumatología",
            Self::Ginecobstetricia => "Ginecobstetricia",
            Self::Pediatria => "Pediatría",
            Self::Psiquiatria => "Psiquiatría",
            Self::Otro => "Otro",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PatientStatus {
    #[serde(rename = "Estable")]
    Estable,
    #[serde(rename = "Grave")]
    Grave,
    #[serde(rename = "De cuidado")]
    DeCuidado,
}

impl PatientStatus {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Estable => "Estable",
            Self::Grave => "Grave",
            Self::DeCuidado => "De cuidado",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BedMode {
    #[default]
    Cama,
    Cuna,
}

/// CUDYR item scores, each 0..=3. Scoring lives in `services::cudyr`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CudyrScore {
    pub change_clothes: u8,
    pub mobilization: u8,
    pub feeding: u8,
    pub elimination: u8,
    pub psychosocial: u8,
    pub surveillance: u8,
    pub vital_signs: u8,
    pub fluid_balance: u8,
    pub oxygen: u8,
    pub airway: u8,
    pub pain: u8,
    pub skin_care: u8,
    pub invasive_procedures: u8,
    pub diagnostic_procedures: u8,
}

/// One bed slot. Occupancy is derived from `patient_name`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PatientData {
    pub bed_id: String,
    pub patient_name: String,
    pub rut: String,
    pub age: String,
    pub pathology: String,
    pub specialty: Option<Specialty>,
    pub status: Option<PatientStatus>,
    pub admission_date: String,
    pub has_wristband: bool,
    pub devices: Vec<String>,
    pub surgical_complication: bool,
    pub is_upc: bool,
    pub is_blocked: bool,
    pub blocked_reason: String,
    pub bed_mode: BedMode,
    pub has_companion_crib: bool,
    pub clinical_crib: Option<Box<PatientData>>,
    pub location: String,
    pub handoff_note_day_shift: String,
    pub handoff_note_night_shift: String,
    pub medical_handoff_note: String,
    pub cudyr: Option<CudyrScore>,
}

impl PatientData {
    #[must_use]
    pub fn empty(bed_id: &str) -> Self {
        Self { bed_id: bed_id.to_owned(), ..Self::default() }
    }

    #[must_use]
    pub fn is_occupied(&self) -> bool {
        !self.patient_name.trim().is_empty()
    }

    /// Reset the slot to empty, keeping the bed id, block state and location.
    pub fn clear_occupant(&mut self) {
        let bed_id = std::mem::take(&mut self.bed_id);
        let is_blocked = self.is_blocked;
        let blocked_reason = std::mem::take(&mut self.blocked_reason);
        let location = std::mem::take(&mut self.location);
        *self = Self { bed_id, is_blocked, blocked_reason, location, ..Self::default() };
    }

    /// Occupant fields only, detached from any bed.
    #[must_use]
    pub fn occupant_snapshot(&self) -> Self {
        let mut snapshot = self.clone();
        snapshot.is_blocked = false;
        snapshot.blocked_reason.clear();
        snapshot
    }
}

// =============================================================================
// MOVEMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DischargeStatus {
    #[default]
    Vivo,
    Fallecido,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DischargeData {
    pub id: Uuid,
    pub bed_name: String,
    pub bed_id: String,
    pub bed_type: BedType,
    pub patient_name: String,
    #[serde(default)]
    pub rut: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub status: DischargeStatus,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub is_nested: bool,
    pub original_data: Option<PatientData>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferData {
    pub id: Uuid,
    pub bed_name: String,
    pub bed_id: String,
    pub bed_type: BedType,
    pub patient_name: String,
    #[serde(default)]
    pub rut: String,
    #[serde(default)]
    pub diagnosis: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub evacuation_method: String,
    #[serde(default)]
    pub receiving_center: String,
    #[serde(default)]
    pub receiving_center_other: String,
    #[serde(default)]
    pub transfer_escort: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub is_nested: bool,
    pub original_data: Option<PatientData>,
}

/// Day-surgery (CMA) entry. Does not occupy a census bed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CmaData {
    pub id: Uuid,
    #[serde(default)]
    pub bed_name: String,
    pub patient_name: String,
    #[serde(default)]
    pub rut: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub diagnosis: String,
    pub specialty: Option<Specialty>,
    #[serde(default)]
    pub intervention_type: String,
    #[serde(default)]
    pub department_origin: String,
}

// =============================================================================
// SHIFTS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Shift {
    Day,
    Night,
}

impl Shift {
    #[must_use]
    pub fn from_str(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "day" | "dia" | "día" => Some(Self::Day),
            "night" | "noche" => Some(Self::Night),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShiftPair<T> {
    pub day: T,
    pub night: T,
}

impl<T> ShiftPair<T> {
    pub fn get(&self, shift: Shift) -> &T {
        match shift {
            Shift::Day => &self.day,
            Shift::Night => &self.night,
        }
    }

    pub fn get_mut(&mut self, shift: Shift) -> &mut T {
        match shift {
            Shift::Day => &mut self.day,
            Shift::Night => &mut self.night,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MedicalSignature {
    pub doctor_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub signed_at: OffsetDateTime,
}

// =============================================================================
// DAILY RECORD
// =============================================================================

fn unix_epoch() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH
}

/// One day's census document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    pub date: String,
    #[serde(default)]
    pub beds: BTreeMap<String, PatientData>,
    #[serde(default)]
    pub discharges: Vec<DischargeData>,
    #[serde(default)]
    pub transfers: Vec<TransferData>,
    #[serde(default)]
    pub cma: Vec<CmaData>,
    #[serde(default)]
    pub active_extra_beds: Vec<String>,
    #[serde(default)]
    pub nurses: ShiftPair<Vec<String>>,
    #[serde(default)]
    pub tens: ShiftPair<Vec<String>>,
    #[serde(default)]
    pub handoff_checklist: ShiftPair<BTreeMap<String, bool>>,
    #[serde(default)]
    pub handoff_novedades: ShiftPair<String>,
    #[serde(default)]
    pub medical_handoff_doctor: Option<String>,
    #[serde(default)]
    pub medical_signature: Option<MedicalSignature>,
    #[serde(with = "time::serde::rfc3339", default = "unix_epoch")]
    pub last_updated: OffsetDateTime,
}

impl DailyRecord {
    /// A record with every catalogue bed present and empty.
    #[must_use]
    pub fn empty(date: &str) -> Self {
        let beds = BEDS
            .iter()
            .map(|bed| (bed.id.to_owned(), PatientData::empty(bed.id)))
            .collect();
        Self {
            date: date.to_owned(),
            beds,
            discharges: Vec::new(),
            transfers: Vec::new(),
            cma: Vec::new(),
            active_extra_beds: Vec::new(),
            nurses: ShiftPair::default(),
            tens: ShiftPair::default(),
            handoff_checklist: ShiftPair::default(),
            handoff_novedades: ShiftPair::default(),
            medical_handoff_doctor: None,
            medical_signature: None,
            last_updated: OffsetDateTime::UNIX_EPOCH,
        }
    }

    /// Fill in catalogue beds missing from an older document.
    pub fn ensure_catalogue(&mut self) {
        for bed in BEDS {
            self.beds
                .entry(bed.id.to_owned())
                .or_insert_with(|| PatientData::empty(bed.id));
        }
    }

    #[must_use]
    pub fn is_extra_active(&self, bed_id: &str) -> bool {
        self.active_extra_beds.iter().any(|id| id == bed_id)
    }
}
