use super::*;
use crate::model::PatientData;
use crate::services::audit::AuditFilter;
use crate::services::auth::Role;
use crate::services::handoff;
use crate::services::movements::{self, DischargeRequest};
use crate::services::store::RecordStore;
use crate::state::test_helpers;

fn nurse() -> Actor {
    Actor::new(Role::NurseHospital, Some("enfermera@hospital.cl".into()))
}

fn admit(bed_id: &str, name: &str) -> BedAction {
    BedAction::Admit {
        bed_id: bed_id.into(),
        patient: PatientData { patient_name: name.into(), ..PatientData::default() },
    }
}

async fn audit_actions(app: &test_helpers::TestApp) -> Vec<AuditAction> {
    app.store
        .query_audit(&AuditFilter { limit: 100, ..AuditFilter::default() })
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.action)
        .collect()
}

#[test]
fn date_key_normalizes_and_rejects() {
    assert_eq!(date_key(" 2024-07-15 ").unwrap(), "2024-07-15");
    assert!(matches!(date_key("2024-02-30"), Err(CensusError::InvalidDate(_))));
    assert!(matches!(date_key("15-07-2024"), Err(CensusError::InvalidDate(_))));
}

#[tokio::test]
async fn create_day_empty_and_duplicate() {
    let app = test_helpers::test_app();
    let saved = create_day(&app.state, &nurse(), "2024-07-15", false).await.unwrap();
    assert_eq!(saved.outcome, SaveOutcome::Remote);
    assert!(saved.record.beds.values().all(|b| !b.is_occupied()));
    assert!(saved.record.last_updated > OffsetDateTime::UNIX_EPOCH);

    let err = create_day(&app.state, &nurse(), "2024-07-15", true).await.unwrap_err();
    assert!(matches!(err, CensusError::AlreadyExists(_)));
    assert_eq!(audit_actions(&app).await, vec![AuditAction::DailyRecordCreated]);
}

#[tokio::test]
async fn create_day_copies_beds_but_resets_the_rest() {
    let app = test_helpers::test_app();
    let actor = nurse();
    create_day(&app.state, &actor, "2024-07-14", false).await.unwrap();
    apply_bed_action(&app.state, &actor, "2024-07-14", admit("H1C1", "Ana")).await.unwrap();
    apply_bed_action(&app.state, &actor, "2024-07-14", admit("H1C2", "Luis")).await.unwrap();
    apply_bed_action(&app.state, &actor, "2024-07-14", BedAction::ToggleExtraBed { bed_id: "E1".into() })
        .await
        .unwrap();
    edit(&app.state, &actor, "2024-07-14", |record| {
        handoff::set_novedades(record, crate::model::Shift::Day, "Turno tranquilo");
        handoff::set_staff(record, crate::model::Shift::Day, vec!["María".into()], vec![]);
        let entry = movements::discharge(record, DischargeRequest { bed_id: "H1C2".into(), ..DischargeRequest::default() })?;
        Ok(((), Audited::new(AuditAction::PatientDischarged, "discharge", entry.id.to_string())))
    })
    .await
    .unwrap();

    let saved = create_day(&app.state, &actor, "2024-07-15", true).await.unwrap();
    let record = saved.record;
    assert_eq!(record.beds["H1C1"].patient_name, "Ana");
    assert!(!record.beds["H1C2"].is_occupied());
    assert_eq!(record.active_extra_beds, vec!["E1".to_owned()]);
    assert!(record.discharges.is_empty());
    assert!(record.nurses.day.is_empty());
    assert!(record.handoff_novedades.day.is_empty());
    assert!(record.medical_signature.is_none());
}

#[tokio::test]
async fn copy_previous_without_history_gives_empty_day() {
    let app = test_helpers::test_app();
    let saved = create_day(&app.state, &nurse(), "2024-07-15", true).await.unwrap();
    assert!(saved.record.beds.values().all(|b| !b.is_occupied()));
}

#[tokio::test]
async fn get_list_previous_and_delete() {
    let app = test_helpers::test_app();
    let actor = nurse();
    create_day(&app.state, &actor, "2024-07-13", false).await.unwrap();
    create_day(&app.state, &actor, "2024-07-15", false).await.unwrap();

    assert_eq!(get_day(&app.state, "2024-07-15").await.unwrap().date, "2024-07-15");
    assert!(matches!(get_day(&app.state, "2024-07-14").await, Err(CensusError::NotFound(_))));
    assert_eq!(list_days(&app.state).await.unwrap(), vec!["2024-07-13", "2024-07-15"]);
    assert_eq!(previous_day(&app.state, "2024-07-15").await.unwrap().unwrap().date, "2024-07-13");

    delete_day(&app.state, &actor, "2024-07-15").await.unwrap();
    assert!(matches!(get_day(&app.state, "2024-07-15").await, Err(CensusError::NotFound(_))));
    assert!(matches!(delete_day(&app.state, &actor, "2024-07-15").await, Err(CensusError::NotFound(_))));
    assert!(audit_actions(&app).await.contains(&AuditAction::DailyRecordDeleted));
}

#[tokio::test]
async fn get_day_loads_from_store_into_live_map() {
    let app = test_helpers::test_app();
    test_helpers::seed_day(&app, "2024-07-15").await;
    assert!(app.state.live.read().await.is_empty());

    get_day(&app.state, "2024-07-15").await.unwrap();
    assert!(app.state.live.read().await.contains_key("2024-07-15"));
}

#[tokio::test]
async fn bed_actions_are_audited() {
    let app = test_helpers::test_app();
    let actor = nurse();
    create_day(&app.state, &actor, "2024-07-15", false).await.unwrap();

    let committed = apply_bed_action(&app.state, &actor, "2024-07-15", admit("R1", "Ana")).await.unwrap();
    assert_eq!(committed.value.action, AuditAction::PatientAdmitted);

    let err = apply_bed_action(&app.state, &actor, "2024-07-15", admit("R1", "Otra")).await.unwrap_err();
    assert!(matches!(err, CensusError::Bed(BedError::BedOccupied(_))));

    let entries = app
        .store
        .query_audit(&AuditFilter { action: Some(AuditAction::PatientAdmitted), limit: 10, ..AuditFilter::default() })
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].entity_id, "R1");
    assert_eq!(entries[0].user_email.as_deref(), Some("enfermera@hospital.cl"));
    assert_eq!(entries[0].record_date.as_deref(), Some("2024-07-15"));
}

#[test]
fn error_codes_are_stable() {
    assert_eq!(CensusError::SaveInProgress("d".into()).error_code(), "E_SAVE_IN_PROGRESS");
    assert!(CensusError::SaveInProgress("d".into()).retryable());
    assert_eq!(CensusError::Bed(BedError::SameBed).error_code(), "E_SAME_BED");
}
