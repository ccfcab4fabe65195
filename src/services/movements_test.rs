use super::*;
use crate::services::beds::{BedAction, apply};

fn record_with(beds: &[(&str, &str)]) -> DailyRecord {
    let mut record = DailyRecord::empty("2024-07-15");
    for (bed_id, name) in beds {
        let patient = PatientData {
            patient_name: (*name).into(),
            rut: "11.111.111-1".into(),
            age: "70".into(),
            pathology: "Neumonía".into(),
            ..PatientData::default()
        };
        apply(&mut record, BedAction::Admit { bed_id: (*bed_id).into(), patient }).unwrap();
    }
    record
}

fn add_crib(record: &mut DailyRecord, bed_id: &str, name: &str) {
    let patient = PatientData { patient_name: name.into(), ..PatientData::default() };
    apply(record, BedAction::AddClinicalCrib { bed_id: bed_id.into(), patient }).unwrap();
}

fn discharge_req(bed_id: &str) -> DischargeRequest {
    DischargeRequest { bed_id: bed_id.into(), time: "10:30".into(), ..DischargeRequest::default() }
}

fn transfer_req(bed_id: &str) -> TransferRequest {
    TransferRequest {
        bed_id: bed_id.into(),
        time: "14:00".into(),
        evacuation_method: "Ambulancia".into(),
        receiving_center: "Hospital Regional".into(),
        ..TransferRequest::default()
    }
}

// =============================================================================
// discharge
// =============================================================================

#[test]
fn discharge_snapshots_and_empties_bed() {
    let mut rec = record_with(&[("H2C1", "Juan")]);
    let entry = discharge(&mut rec, discharge_req("H2C1")).unwrap();

    assert_eq!(entry.patient_name, "Juan");
    assert_eq!(entry.bed_name, "H2C1");
    assert_eq!(entry.diagnosis, "Neumonía");
    assert!(!entry.is_nested);
    assert_eq!(entry.original_data.as_ref().map(|p| p.patient_name.as_str()), Some("Juan"));
    assert!(!rec.beds["H2C1"].is_occupied());
    assert_eq!(rec.discharges.len(), 1);
}

#[test]
fn discharge_rejects_empty_bed_and_bad_time() {
    let mut rec = record_with(&[("R1", "Ana")]);
    assert_eq!(
        discharge(&mut rec, discharge_req("R2")),
        Err(MovementError::Bed(BedError::NotOccupied("R2".into())))
    );

    let mut bad = discharge_req("R1");
    bad.time = "25:99".into();
    assert_eq!(discharge(&mut rec, bad), Err(MovementError::InvalidTime("25:99".into())));
    assert!(rec.beds["R1"].is_occupied());
}

#[test]
fn discharge_with_attached_crib_is_rejected_until_crib_leaves() {
    let mut rec = record_with(&[("H3C1", "Madre")]);
    add_crib(&mut rec, "H3C1", "RN Madre");

    assert_eq!(
        discharge(&mut rec, discharge_req("H3C1")),
        Err(MovementError::CribAttached("H3C1".into()))
    );

    let crib_entry =
        discharge(&mut rec, DischargeRequest { target: MovementTarget::Crib, ..discharge_req("H3C1") }).unwrap();
    assert!(crib_entry.is_nested);
    assert_eq!(crib_entry.patient_name, "RN Madre");
    assert!(rec.beds["H3C1"].clinical_crib.is_none());
    assert!(rec.beds["H3C1"].is_occupied());

    discharge(&mut rec, discharge_req("H3C1")).unwrap();
    assert_eq!(rec.discharges.len(), 2);
}

#[test]
fn crib_target_without_crib_fails() {
    let mut rec = record_with(&[("R3", "Ana")]);
    let req = DischargeRequest { target: MovementTarget::Crib, ..discharge_req("R3") };
    assert_eq!(discharge(&mut rec, req), Err(MovementError::Bed(BedError::NoClinicalCrib("R3".into()))));
}

#[test]
fn undo_discharge_restores_patient_and_removes_entry() {
    let mut rec = record_with(&[("H4C2", "Pedro")]);
    let before = rec.beds["H4C2"].clone();
    let entry = discharge(&mut rec, discharge_req("H4C2")).unwrap();

    undo_discharge(&mut rec, entry.id).unwrap();
    assert_eq!(rec.beds["H4C2"], before);
    assert!(rec.discharges.is_empty());
}

#[test]
fn undo_discharge_fails_when_bed_reused_or_blocked() {
    let mut rec = record_with(&[("H5C1", "Pedro")]);
    let entry = discharge(&mut rec, discharge_req("H5C1")).unwrap();
    apply(
        &mut rec,
        BedAction::Admit {
            bed_id: "H5C1".into(),
            patient: PatientData { patient_name: "Otro".into(), ..PatientData::default() },
        },
    )
    .unwrap();
    assert_eq!(undo_discharge(&mut rec, entry.id), Err(MovementError::BedNotAvailable("H5C1".into())));
    assert_eq!(rec.discharges.len(), 1);

    let mut rec = record_with(&[("H5C2", "Luis")]);
    let entry = discharge(&mut rec, discharge_req("H5C2")).unwrap();
    apply(&mut rec, BedAction::Block { bed_id: "H5C2".into(), reason: "Mantención".into() }).unwrap();
    assert_eq!(undo_discharge(&mut rec, entry.id), Err(MovementError::BedNotAvailable("H5C2".into())));
}

#[test]
fn undo_nested_discharge_restores_crib() {
    let mut rec = record_with(&[("H6C1", "Madre")]);
    add_crib(&mut rec, "H6C1", "RN");
    let entry =
        discharge(&mut rec, DischargeRequest { target: MovementTarget::Crib, ..discharge_req("H6C1") }).unwrap();

    undo_discharge(&mut rec, entry.id).unwrap();
    let crib = rec.beds["H6C1"].clinical_crib.as_deref().unwrap();
    assert_eq!(crib.patient_name, "RN");
}

#[test]
fn undo_unknown_entry_fails() {
    let mut rec = record_with(&[]);
    let id = Uuid::new_v4();
    assert_eq!(undo_discharge(&mut rec, id), Err(MovementError::EntryNotFound(id)));
    assert_eq!(undo_transfer(&mut rec, id), Err(MovementError::EntryNotFound(id)));
}

#[test]
fn update_and_delete_discharge() {
    let mut rec = record_with(&[("R4", "Rosa")]);
    let entry = discharge(&mut rec, discharge_req("R4")).unwrap();

    let patch = DischargePatch { status: Some(DischargeStatus::Fallecido), time: Some("11:45".into()) };
    let updated = update_discharge(&mut rec, entry.id, patch).unwrap();
    assert_eq!(updated.status, DischargeStatus::Fallecido);
    assert_eq!(updated.time, "11:45");

    let bad = DischargePatch { time: Some("mañana".into()), ..DischargePatch::default() };
    assert!(matches!(update_discharge(&mut rec, entry.id, bad), Err(MovementError::InvalidTime(_))));

    delete_discharge(&mut rec, entry.id).unwrap();
    assert!(rec.discharges.is_empty());
    assert!(!rec.beds["R4"].is_occupied());
}

// =============================================================================
// transfer
// =============================================================================

#[test]
fn transfer_records_destination_and_undo_restores() {
    let mut rec = record_with(&[("NEO1", "Bebé")]);
    let entry = transfer(&mut rec, transfer_req("NEO1")).unwrap();
    assert_eq!(entry.receiving_center, "Hospital Regional");
    assert_eq!(entry.bed_name, "NEO 1");
    assert!(!rec.beds["NEO1"].is_occupied());

    undo_transfer(&mut rec, entry.id).unwrap();
    assert_eq!(rec.beds["NEO1"].patient_name, "Bebé");
    assert!(rec.transfers.is_empty());
}

#[test]
fn transfer_requires_receiving_center() {
    let mut rec = record_with(&[("R1", "Ana")]);
    let req = TransferRequest { receiving_center: " ".into(), ..transfer_req("R1") };
    assert_eq!(transfer(&mut rec, req), Err(MovementError::MissingField("receivingCenter")));
    assert!(rec.beds["R1"].is_occupied());
}

#[test]
fn update_transfer_patches_fields() {
    let mut rec = record_with(&[("R2", "Ana")]);
    let entry = transfer(&mut rec, transfer_req("R2")).unwrap();
    let patch = TransferPatch {
        transfer_escort: Some("TENS".into()),
        receiving_center: Some("Otro".into()),
        receiving_center_other: Some("Clínica Privada".into()),
        ..TransferPatch::default()
    };
    let updated = update_transfer(&mut rec, entry.id, patch).unwrap();
    assert_eq!(updated.transfer_escort, "TENS");
    assert_eq!(updated.receiving_center_other, "Clínica Privada");
    assert_eq!(updated.evacuation_method, "Ambulancia");

    delete_transfer(&mut rec, entry.id).unwrap();
    assert!(rec.transfers.is_empty());
}

// =============================================================================
// CMA
// =============================================================================

#[test]
fn cma_add_and_delete() {
    let mut rec = record_with(&[]);
    let entry = add_cma(
        &mut rec,
        CmaRequest {
            patient_name: "Carla".into(),
            intervention_type: "Colecistectomía".into(),
            specialty: Some(Specialty::Cirugia),
            ..CmaRequest::default()
        },
    )
    .unwrap();
    assert_eq!(rec.cma.len(), 1);
    assert!(rec.beds.values().all(|bed| !bed.is_occupied()));

    assert_eq!(
        add_cma(&mut rec, CmaRequest::default()),
        Err(MovementError::MissingField("patientName"))
    );

    delete_cma(&mut rec, entry.id).unwrap();
    assert!(rec.cma.is_empty());
    assert_eq!(delete_cma(&mut rec, entry.id), Err(MovementError::EntryNotFound(entry.id)));
}

#[test]
fn discharge_request_deserializes_with_defaults() {
    let req: DischargeRequest = serde_json::from_str(r#"{"bedId":"R1","target":"crib"}"#).unwrap();
    assert_eq!(req.target, MovementTarget::Crib);
    assert_eq!(req.status, DischargeStatus::Vivo);
    assert!(req.time.is_empty());
}
