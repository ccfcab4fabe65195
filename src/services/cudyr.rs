//! CUDYR dependency/risk scoring.
//!
//! DESIGN
//! ======
//! Each patient carries fourteen item scores (0..=3): six dependency items
//! and eight risk items. The risk total (0..=24) maps to a letter A..D and
//! the dependency total (0..=18) to a digit 1..3; the pair is the category
//! (A1 = highest risk and dependency, D3 = lowest).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Serialize, Serializer};

use crate::error::ErrorCode;
use crate::model::{CudyrScore, DailyRecord, PatientData, active_beds};

pub const MAX_ITEM_SCORE: u8 = 3;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CudyrError {
    #[error("CUDYR item {item} out of range: {value} (max {MAX_ITEM_SCORE})")]
    InvalidScore { item: &'static str, value: u8 },
}

impl ErrorCode for CudyrError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidScore { .. } => "E_CUDYR_INVALID_SCORE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RiskLevel {
    A,
    B,
    C,
    D,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DependencyLevel {
    One,
    Two,
    Three,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CudyrCategory {
    pub risk: RiskLevel,
    pub dependency: DependencyLevel,
}

impl fmt::Display for CudyrCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.risk {
            RiskLevel::A => 'A',
            RiskLevel::B => 'B',
            RiskLevel::C => 'C',
            RiskLevel::D => 'D',
        };
        let digit = match self.dependency {
            DependencyLevel::One => '1',
            DependencyLevel::Two => '2',
            DependencyLevel::Three => '3',
        };
        write!(f, "{letter}{digit}")
    }
}

impl Serialize for CudyrCategory {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn dependency_items(score: &CudyrScore) -> [(&'static str, u8); 6] {
    [
        ("changeClothes", score.change_clothes),
        ("mobilization", score.mobilization),
        ("feeding", score.feeding),
        ("elimination", score.elimination),
        ("psychosocial", score.psychosocial),
        ("surveillance", score.surveillance),
    ]
}

fn risk_items(score: &CudyrScore) -> [(&'static str, u8); 8] {
    [
        ("vitalSigns", score.vital_signs),
        ("fluidBalance", score.fluid_balance),
        ("oxygen", score.oxygen),
        ("airway", score.airway),
        ("pain", score.pain),
        ("skinCare", score.skin_care),
        ("invasiveProcedures", score.invasive_procedures),
        ("diagnosticProcedures", score.diagnostic_procedures),
    ]
}

/// Reject any item above [`MAX_ITEM_SCORE`].
///
/// # Errors
///
/// Returns the first out-of-range item.
pub fn validate(score: &CudyrScore) -> Result<(), CudyrError> {
    let items = dependency_items(score).into_iter().chain(risk_items(score));
    for (item, value) in items {
        if value > MAX_ITEM_SCORE {
            return Err(CudyrError::InvalidScore { item, value });
        }
    }
    Ok(())
}

#[must_use]
pub fn dependency_total(score: &CudyrScore) -> u16 {
    dependency_items(score).iter().map(|(_, value)| u16::from(*value)).sum()
}

#[must_use]
pub fn risk_total(score: &CudyrScore) -> u16 {
    risk_items(score).iter().map(|(_, value)| u16::from(*value)).sum()
}

#[must_use]
pub fn risk_level(total: u16) -> RiskLevel {
    match total {
        19.. => RiskLevel::A,
        12..=18 => RiskLevel::B,
        6..=11 => RiskLevel::C,
        _ => RiskLevel::D,
    }
}

#[must_use]
pub fn dependency_level(total: u16) -> DependencyLevel {
    match total {
        13.. => DependencyLevel::One,
        7..=12 => DependencyLevel::Two,
        _ => DependencyLevel::Three,
    }
}

/// Classify a score.
///
/// # Errors
///
/// Returns [`CudyrError::InvalidScore`] when any item is out of range.
pub fn categorize(score: &CudyrScore) -> Result<CudyrCategory, CudyrError> {
    validate(score)?;
    Ok(CudyrCategory {
        risk: risk_level(risk_total(score)),
        dependency: dependency_level(dependency_total(score)),
    })
}

/// Every category in A1..D3 order.
#[must_use]
pub fn all_categories() -> Vec<CudyrCategory> {
    let risks = [RiskLevel::A, RiskLevel::B, RiskLevel::C, RiskLevel::D];
    let dependencies = [DependencyLevel::One, DependencyLevel::Two, DependencyLevel::Three];
    risks
        .into_iter()
        .flat_map(|risk| dependencies.into_iter().map(move |dependency| CudyrCategory { risk, dependency }))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CudyrSummary {
    pub counts: BTreeMap<String, usize>,
    pub scored: usize,
    pub unscored: usize,
    pub occupied: usize,
    pub dependency_points: u32,
    pub risk_points: u32,
}

/// Category counts over every patient in active beds, clinical cribs included.
/// Patients with a missing or invalid score count as unscored.
#[must_use]
pub fn summarize(record: &DailyRecord) -> CudyrSummary {
    let mut counts: BTreeMap<String, usize> =
        all_categories().iter().map(|category| (category.to_string(), 0)).collect();
    let mut summary = CudyrSummary {
        counts: BTreeMap::new(),
        scored: 0,
        unscored: 0,
        occupied: 0,
        dependency_points: 0,
        risk_points: 0,
    };

    let patients = active_beds(record)
        .into_iter()
        .filter_map(|bed| record.beds.get(bed.id))
        .filter(|slot| slot.is_occupied())
        .flat_map(|slot| std::iter::once(slot).chain(slot.clinical_crib.as_deref().filter(|crib| crib.is_occupied())));

    for patient in patients {
        summary.occupied += 1;
        match scored_category(patient) {
            Some((category, score)) => {
                summary.scored += 1;
                summary.dependency_points += u32::from(dependency_total(&score));
                summary.risk_points += u32::from(risk_total(&score));
                *counts.entry(category.to_string()).or_default() += 1;
            }
            None => summary.unscored += 1,
        }
    }

    summary.counts = counts;
    summary
}

fn scored_category(patient: &PatientData) -> Option<(CudyrCategory, CudyrScore)> {
    let score = patient.cudyr?;
    categorize(&score).ok().map(|category| (category, score))
}

#[cfg(test)]
#[path = "cudyr_test.rs"]
mod tests;
