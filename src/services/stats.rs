//! Census statistics for one day.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::model::{BedMode, DailyRecord, DischargeStatus, PatientData, active_beds};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CensusStatistics {
    pub occupied_beds: usize,
    /// Occupied beds in crib mode. Also counted in `occupied_beds`.
    pub occupied_cribs: usize,
    pub clinical_cribs: usize,
    pub total_hospitalized: usize,
    pub blocked_beds: usize,
    pub active_beds: usize,
    pub available_capacity: usize,
    pub free_beds: usize,
    /// Percentage, rounded to two decimals.
    pub occupancy_rate: f64,
    pub upc_patients: usize,
    pub discharges: usize,
    pub deaths: usize,
    pub transfers: usize,
    pub cma: usize,
    pub by_specialty: BTreeMap<String, usize>,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn census_statistics(record: &DailyRecord) -> CensusStatistics {
    let mut stats = CensusStatistics::default();
    let empty = PatientData::default();

    for bed in active_beds(record) {
        stats.active_beds += 1;
        let slot = record.beds.get(bed.id).unwrap_or(&empty);

        if slot.is_blocked {
            stats.blocked_beds += 1;
            continue;
        }
        if !slot.is_occupied() {
            continue;
        }

        stats.occupied_beds += 1;
        if slot.bed_mode == BedMode::Cuna {
            stats.occupied_cribs += 1;
        }
        if slot.is_upc {
            stats.upc_patients += 1;
        }
        let specialty = slot.specialty.map_or("Sin especialidad", |s| s.label());
        *stats.by_specialty.entry(specialty.to_owned()).or_default() += 1;

        if slot.clinical_crib.as_deref().is_some_and(PatientData::is_occupied) {
            stats.clinical_cribs += 1;
        }
    }

    stats.total_hospitalized = stats.occupied_beds + stats.clinical_cribs;
    stats.available_capacity = stats.active_beds.saturating_sub(stats.blocked_beds);
    stats.free_beds = stats.available_capacity.saturating_sub(stats.occupied_beds);
    stats.occupancy_rate = if stats.available_capacity == 0 {
        0.0
    } else {
        round2(stats.occupied_beds as f64 / stats.available_capacity as f64 * 100.0)
    };

    stats.discharges = record.discharges.len();
    stats.deaths = record
        .discharges
        .iter()
        .filter(|d| d.status == DischargeStatus::Fallecido)
        .count();
    stats.transfers = record.transfers.len();
    stats.cma = record.cma.len();
    stats
}

#[cfg(test)]
#[path = "stats_test.rs"]
mod tests;
