//! Fixed bed catalogue for the ward.
//!
//! The catalogue is static: every daily record carries one slot per bed.
//! Extra beds (`E*`) exist in every record but only count towards capacity
//! when listed in `active_extra_beds` for that day.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BedType {
    #[serde(rename = "UTI")]
    Uti,
    #[serde(rename = "MEDIA")]
    Media,
    #[serde(rename = "NEO")]
    Neonatologia,
    #[serde(rename = "EXTRA")]
    Extra,
}

impl BedType {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Uti => "UTI",
            Self::Media => "MEDIA",
            Self::Neonatologia => "NEO",
            Self::Extra => "EXTRA",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BedDef {
    pub id: &'static str,
    pub name: &'static str,
    pub bed_type: BedType,
    pub is_extra: bool,
}

const fn bed(id: &'static str, name: &'static str, bed_type: BedType) -> BedDef {
    BedDef { id, name, bed_type, is_extra: matches!(bed_type, BedType::Extra) }
}

/// Catalogue in display order.
pub const BEDS: &[BedDef] = &[
    bed("R1", "R1", BedType::Uti),
    bed("R2", "R2", BedType::Uti),
    bed("R3", "R3", BedType::Uti),
    bed("R4", "R4", BedType::Uti),
    bed("NEO1", "NEO 1", BedType::Neonatologia),
    bed("NEO2", "NEO 2", BedType::Neonatologia),
    bed("H1C1", "H1C1", BedType::Media),
    bed("H1C2", "H1C2", BedType::Media),
    bed("H2C1", "H2C1", BedType::Media),
    bed("H2C2", "H2C2", BedType::Media),
    bed("H3C1", "H3C1", BedType::Media),
    bed("H3C2", "H3C2", BedType::Media),
    bed("H4C1", "H4C1", BedType::Media),
    bed("H4C2", "H4C2", BedType::Media),
    bed("H5C1", "H5C1", BedType::Media),
    bed("H5C2", "H5C2", BedType::Media),
    bed("H6C1", "H6C1", BedType::Media),
    bed("H6C2", "H6C2", BedType::Media),
    bed("E1", "Extra 1", BedType::Extra),
    bed("E2", "Extra 2", BedType::Extra),
    bed("E3", "Extra 3", BedType::Extra),
    bed("E4", "Extra 4", BedType::Extra),
    bed("E5", "Extra 5", BedType::Extra),
];

#[must_use]
pub fn find_bed(id: &str) -> Option<&'static BedDef> {
    BEDS.iter().find(|bed| bed.id == id)
}
