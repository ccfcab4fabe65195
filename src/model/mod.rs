//! Census domain model: bed catalogue, patient slots, movements and the
//! daily record document.

pub mod beds;
pub mod record;

pub use beds::{BEDS, BedDef, find_bed};
pub use record::{
    BedMode, CmaData, CudyrScore, DailyRecord, DischargeData, DischargeStatus, MedicalSignature, PatientData,
    PatientStatus, Shift, Specialty, TransferData,
};

use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, Time};

const DATE_KEY_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");
const DISPLAY_DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[day]-[month]-[year]");
const CLOCK_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[hour]:[minute]");

/// Parse a `YYYY-MM-DD` record key.
#[must_use]
pub fn parse_date_key(raw: &str) -> Option<Date> {
    Date::parse(raw.trim(), DATE_KEY_FORMAT).ok()
}

#[must_use]
pub fn format_date_key(date: Date) -> String {
    date.format(DATE_KEY_FORMAT).unwrap_or_default()
}

/// `YYYY-MM-DD` → `DD-MM-YYYY`, as used in sheet names and email subjects.
#[must_use]
pub fn display_date(key: &str) -> String {
    parse_date_key(key)
        .and_then(|date| date.format(DISPLAY_DATE_FORMAT).ok())
        .unwrap_or_else(|| key.to_owned())
}

/// Accepts empty or `HH:MM`.
#[must_use]
pub fn is_valid_clock(raw: &str) -> bool {
    let raw = raw.trim();
    raw.is_empty() || Time::parse(raw, CLOCK_FORMAT).is_ok()
}

/// Beds that count towards capacity for this record: fixed beds plus
/// activated extras, in display order.
#[must_use]
pub fn active_beds(record: &DailyRecord) -> Vec<&'static BedDef> {
    BEDS.iter()
        .filter(|bed| !bed.is_extra || record.is_extra_active(bed.id))
        .collect()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
