use super::*;
use crate::model::PatientData;

fn score(dependency: u8, risk: u8) -> CudyrScore {
    CudyrScore {
        change_clothes: dependency,
        mobilization: dependency,
        feeding: dependency,
        elimination: dependency,
        psychosocial: dependency,
        surveillance: dependency,
        vital_signs: risk,
        fluid_balance: risk,
        oxygen: risk,
        airway: risk,
        pain: risk,
        skin_care: risk,
        invasive_procedures: risk,
        diagnostic_procedures: risk,
    }
}

fn admit(record: &mut DailyRecord, bed_id: &str, name: &str, cudyr: Option<CudyrScore>) {
    let slot = record.beds.get_mut(bed_id).unwrap();
    slot.patient_name = name.into();
    slot.cudyr = cudyr;
}

// =============================================================================
// thresholds
// =============================================================================

#[test]
fn risk_thresholds() {
    assert_eq!(risk_level(24), RiskLevel::A);
    assert_eq!(risk_level(19), RiskLevel::A);
    assert_eq!(risk_level(18), RiskLevel::B);
    assert_eq!(risk_level(12), RiskLevel::B);
    assert_eq!(risk_level(11), RiskLevel::C);
    assert_eq!(risk_level(6), RiskLevel::C);
    assert_eq!(risk_level(5), RiskLevel::D);
    assert_eq!(risk_level(0), RiskLevel::D);
}

#[test]
fn dependency_thresholds() {
    assert_eq!(dependency_level(18), DependencyLevel::One);
    assert_eq!(dependency_level(13), DependencyLevel::One);
    assert_eq!(dependency_level(12), DependencyLevel::Two);
    assert_eq!(dependency_level(7), DependencyLevel::Two);
    assert_eq!(dependency_level(6), DependencyLevel::Three);
    assert_eq!(dependency_level(0), DependencyLevel::Three);
}

#[test]
fn categorize_extremes() {
    assert_eq!(categorize(&score(3, 3)).unwrap().to_string(), "A1");
    assert_eq!(categorize(&score(0, 0)).unwrap().to_string(), "D3");
    assert_eq!(categorize(&score(1, 2)).unwrap().to_string(), "B3");
}

#[test]
fn categorize_rejects_out_of_range_item() {
    let mut bad = score(1, 1);
    bad.oxygen = 4;
    assert_eq!(categorize(&bad), Err(CudyrError::InvalidScore { item: "oxygen", value: 4 }));
}

#[test]
fn totals_do_not_overflow_on_garbage() {
    let garbage = score(u8::MAX, u8::MAX);
    assert_eq!(dependency_total(&garbage), 6 * 255);
    assert_eq!(risk_total(&garbage), 8 * 255);
}

#[test]
fn all_categories_has_twelve_in_order() {
    let labels = all_categories().iter().map(ToString::to_string).collect::<Vec<_>>();
    assert_eq!(labels.len(), 12);
    assert_eq!(labels.first().map(String::as_str), Some("A1"));
    assert_eq!(labels.last().map(String::as_str), Some("D3"));
}

#[test]
fn category_serializes_as_label() {
    let category = categorize(&score(2, 2)).unwrap();
    assert_eq!(serde_json::to_value(category).unwrap(), serde_json::json!("B2"));
}

// =============================================================================
// summarize
// =============================================================================

#[test]
fn summary_counts_sum_to_scored() {
    let mut record = DailyRecord::empty("2024-06-01");
    admit(&mut record, "R1", "Uno", Some(score(3, 3)));
    admit(&mut record, "R2", "Dos", Some(score(3, 3)));
    admit(&mut record, "H1C1", "Tres", Some(score(0, 0)));
    admit(&mut record, "H1C2", "Cuatro", None);

    let summary = summarize(&record);
    assert_eq!(summary.occupied, 4);
    assert_eq!(summary.scored, 3);
    assert_eq!(summary.unscored, 1);
    assert_eq!(summary.counts["A1"], 2);
    assert_eq!(summary.counts["D3"], 1);
    assert_eq!(summary.counts.values().sum::<usize>(), summary.scored);
    assert_eq!(summary.counts.len(), 12);
}

#[test]
fn summary_includes_clinical_cribs() {
    let mut record = DailyRecord::empty("2024-06-01");
    admit(&mut record, "H2C1", "Madre", Some(score(1, 1)));
    let mut crib = PatientData::empty("H2C1");
    crib.patient_name = "RN Madre".into();
    crib.cudyr = Some(score(3, 1));
    record.beds.get_mut("H2C1").unwrap().clinical_crib = Some(Box::new(crib));

    let summary = summarize(&record);
    assert_eq!(summary.occupied, 2);
    assert_eq!(summary.scored, 2);
    assert_eq!(summary.dependency_points, 6 + 18);
}

#[test]
fn summary_ignores_inactive_extra_beds() {
    let mut record = DailyRecord::empty("2024-06-01");
    admit(&mut record, "E1", "Fantasma", Some(score(1, 1)));
    assert_eq!(summarize(&record).occupied, 0);

    record.active_extra_beds.push("E1".into());
    assert_eq!(summarize(&record).occupied, 1);
}

#[test]
fn invalid_stored_score_counts_as_unscored() {
    let mut record = DailyRecord::empty("2024-06-01");
    let mut bad = score(1, 1);
    bad.pain = 9;
    admit(&mut record, "R3", "Dolor", Some(bad));
    let summary = summarize(&record);
    assert_eq!(summary.scored, 0);
    assert_eq!(summary.unscored, 1);
}
