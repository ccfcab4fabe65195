//! Census Excel workbooks.
//!
//! One worksheet per day, named `DD-MM-YYYY`: a title, a summary block, the
//! bed table, the movement sections and the staff line. The workbook is
//! built in memory and returned as bytes.

use rust_xlsxwriter::{Color, Format, FormatBorder, Workbook, Worksheet, XlsxError};

use crate::error::ErrorCode;
use crate::model::{DailyRecord, DischargeStatus, PatientData, active_beds, display_date};
use crate::services::stats::census_statistics;

pub const BED_HEADERS: [&str; 13] = [
    "Cama",
    "Tipo",
    "Paciente",
    "RUT",
    "Edad",
    "Diagnóstico",
    "Especialidad",
    "Estado",
    "Fecha Ingreso",
    "Brazalete",
    "Dispositivos",
    "Comp. Qx",
    "UPC",
];

const LAST_COL: u16 = 12;

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("no records to export")]
    NoRecords,
    #[error("workbook generation failed: {0}")]
    Xlsx(#[from] XlsxError),
}

impl ErrorCode for ReportError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoRecords => "E_NO_RECORDS",
            Self::Xlsx(_) => "E_XLSX",
        }
    }
}

#[must_use]
pub fn report_filename(date: &str) -> String {
    format!("Censo_HHR_{}.xlsx", display_date(date))
}

// =============================================================================
// ROWS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Patient,
    Crib,
    Blocked,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedRow {
    pub kind: RowKind,
    pub cells: [String; 13],
}

fn yes_no(flag: bool) -> String {
    if flag { "Sí".to_owned() } else { "No".to_owned() }
}

fn patient_cells(bed_label: String, bed_type: &str, patient: &PatientData) -> [String; 13] {
    [
        bed_label,
        bed_type.to_owned(),
        patient.patient_name.clone(),
        patient.rut.clone(),
        patient.age.clone(),
        patient.pathology.clone(),
        patient.specialty.map(|s| s.label().to_owned()).unwrap_or_default(),
        patient.status.map(|s| s.label().to_owned()).unwrap_or_default(),
        display_date(&patient.admission_date),
        yes_no(patient.has_wristband),
        patient.devices.join(", "),
        yes_no(patient.surgical_complication),
        yes_no(patient.is_upc),
    ]
}

/// Bed table rows in display order. Clinical cribs follow their bed.
#[must_use]
pub fn bed_rows(record: &DailyRecord) -> Vec<BedRow> {
    let mut rows = Vec::new();
    for bed in active_beds(record) {
        let bed_type = bed.bed_type.label();
        let Some(slot) = record.beds.get(bed.id) else {
            continue;
        };

        if slot.is_blocked {
            let mut cells: [String; 13] = Default::default();
            cells[0] = bed.name.to_owned();
            cells[1] = bed_type.to_owned();
            cells[2] = "BLOQUEADA".to_owned();
            cells[5].clone_from(&slot.blocked_reason);
            rows.push(BedRow { kind: RowKind::Blocked, cells });
            continue;
        }
        if !slot.is_occupied() {
            let mut cells: [String; 13] = Default::default();
            cells[0] = bed.name.to_owned();
            cells[1] = bed_type.to_owned();
            rows.push(BedRow { kind: RowKind::Empty, cells });
            continue;
        }

        rows.push(BedRow { kind: RowKind::Patient, cells: patient_cells(bed.name.to_owned(), bed_type, slot) });
        if let Some(crib) = slot.clinical_crib.as_deref().filter(|c| c.is_occupied()) {
            rows.push(BedRow { kind: RowKind::Crib, cells: patient_cells(format!("  Cuna {}", bed.name), "CUNA", crib) });
        }
    }
    rows
}

#[must_use]
pub fn staff_line(record: &DailyRecord) -> String {
    let join = |names: &[String]| if names.is_empty() { "-".to_owned() } else { names.join(", ") };
    format!(
        "Enfermería día: {} | Enfermería noche: {} | TENS día: {} | TENS noche: {}",
        join(&record.nurses.day),
        join(&record.nurses.night),
        join(&record.tens.day),
        join(&record.tens.night),
    )
}

// =============================================================================
// WORKBOOK
// =============================================================================

struct Formats {
    title: Format,
    section: Format,
    header: Format,
    cell: Format,
    blocked: Format,
    crib: Format,
}

impl Formats {
    fn new() -> Self {
        let header = Format::new()
            .set_bold()
            .set_background_color(Color::RGB(0x00D9_E1F2))
            .set_border(FormatBorder::Thin);
        Self {
            title: Format::new().set_bold().set_font_size(14),
            section: Format::new().set_bold().set_font_size(12),
            header,
            cell: Format::new().set_border(FormatBorder::Thin),
            blocked: Format::new()
                .set_border(FormatBorder::Thin)
                .set_background_color(Color::RGB(0x00E7_E6E6))
                .set_italic(),
            crib: Format::new().set_border(FormatBorder::Thin).set_font_color(Color::RGB(0x0044_546A)),
        }
    }
}

fn write_row(sheet: &mut Worksheet, row: u32, cells: &[String], format: &Format) -> Result<(), XlsxError> {
    for (col, value) in (0u16..).zip(cells) {
        sheet.write_string_with_format(row, col, value, format)?;
    }
    Ok(())
}

fn write_headers(sheet: &mut Worksheet, row: u32, headers: &[&str], format: &Format) -> Result<(), XlsxError> {
    for (col, value) in (0u16..).zip(headers) {
        sheet.write_string_with_format(row, col, *value, format)?;
    }
    Ok(())
}

#[allow(clippy::cast_precision_loss)]
fn write_sheet(sheet: &mut Worksheet, record: &DailyRecord, formats: &Formats) -> Result<(), XlsxError> {
    let date = display_date(&record.date);
    sheet.set_name(&date)?;
    for (col, width) in (0u16..).zip([14.0, 8.0, 28.0, 14.0, 6.0, 30.0, 16.0, 12.0, 13.0, 10.0, 22.0, 10.0, 6.0]) {
        sheet.set_column_width(col, width)?;
    }

    sheet.merge_range(
        0,
        0,
        0,
        LAST_COL,
        &format!("Censo diario de pacientes hospitalizados - {date}"),
        &formats.title,
    )?;

    let stats = census_statistics(record);
    let summary = [
        ("Camas ocupadas", stats.occupied_beds as f64),
        ("Cunas clínicas", stats.clinical_cribs as f64),
        ("Total hospitalizados", stats.total_hospitalized as f64),
        ("Camas bloqueadas", stats.blocked_beds as f64),
        ("Capacidad disponible", stats.available_capacity as f64),
        ("Camas libres", stats.free_beds as f64),
        ("Ocupación (%)", stats.occupancy_rate),
        ("Altas", stats.discharges as f64),
        ("Traslados", stats.transfers as f64),
        ("CMA", stats.cma as f64),
    ];
    let mut row = 2u32;
    for (label, value) in summary {
        sheet.write_string_with_format(row, 0, label, &formats.header)?;
        sheet.write_number_with_format(row, 1, value, &formats.cell)?;
        row += 1;
    }

    row += 1;
    write_headers(sheet, row, &BED_HEADERS, &formats.header)?;
    row += 1;
    for bed_row in bed_rows(record) {
        let format = match bed_row.kind {
            RowKind::Blocked => &formats.blocked,
            RowKind::Crib => &formats.crib,
            RowKind::Patient | RowKind::Empty => &formats.cell,
        };
        write_row(sheet, row, &bed_row.cells, format)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "Altas", &formats.section)?;
    row += 1;
    write_headers(
        sheet,
        row,
        &["Cama", "Paciente", "RUT", "Edad", "Diagnóstico", "Hora", "Estado"],
        &formats.header,
    )?;
    row += 1;
    for d in &record.discharges {
        let status = match d.status {
            DischargeStatus::Vivo => "Vivo",
            DischargeStatus::Fallecido => "Fallecido",
        };
        let cells = [
            d.bed_name.clone(),
            d.patient_name.clone(),
            d.rut.clone(),
            d.age.clone(),
            d.diagnosis.clone(),
            d.time.clone(),
            status.to_owned(),
        ];
        write_row(sheet, row, &cells, &formats.cell)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "Traslados", &formats.section)?;
    row += 1;
    write_headers(
        sheet,
        row,
        &["Cama", "Paciente", "RUT", "Edad", "Diagnóstico", "Hora", "Medio", "Centro receptor", "Acompañante"],
        &formats.header,
    )?;
    row += 1;
    for t in &record.transfers {
        let center = if t.receiving_center_other.trim().is_empty() {
            t.receiving_center.clone()
        } else {
            format!("{} ({})", t.receiving_center, t.receiving_center_other)
        };
        let cells = [
            t.bed_name.clone(),
            t.patient_name.clone(),
            t.rut.clone(),
            t.age.clone(),
            t.diagnosis.clone(),
            t.time.clone(),
            t.evacuation_method.clone(),
            center,
            t.transfer_escort.clone(),
        ];
        write_row(sheet, row, &cells, &formats.cell)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "Hospitalización Diurna (CMA)", &formats.section)?;
    row += 1;
    write_headers(
        sheet,
        row,
        &["Cama", "Paciente", "RUT", "Edad", "Diagnóstico", "Especialidad", "Intervención", "Servicio origen"],
        &formats.header,
    )?;
    row += 1;
    for c in &record.cma {
        let cells = [
            c.bed_name.clone(),
            c.patient_name.clone(),
            c.rut.clone(),
            c.age.clone(),
            c.diagnosis.clone(),
            c.specialty.map(|s| s.label().to_owned()).unwrap_or_default(),
            c.intervention_type.clone(),
            c.department_origin.clone(),
        ];
        write_row(sheet, row, &cells, &formats.cell)?;
        row += 1;
    }

    row += 1;
    sheet.write_string(row, 0, staff_line(record))?;
    Ok(())
}

/// Build the workbook for `records`, one sheet per distinct date, oldest
/// first.
///
/// # Errors
///
/// [`ReportError::NoRecords`] for empty input; [`ReportError::Xlsx`] if
/// the writer rejects the content.
pub fn build_census_workbook(records: &[DailyRecord]) -> Result<Vec<u8>, ReportError> {
    let mut sorted: Vec<&DailyRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.date.cmp(&b.date));
    sorted.dedup_by(|a, b| a.date == b.date);
    if sorted.is_empty() {
        return Err(ReportError::NoRecords);
    }

    let formats = Formats::new();
    let mut workbook = Workbook::new();
    for record in sorted {
        let sheet = workbook.add_worksheet();
        write_sheet(sheet, record, &formats)?;
    }
    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
#[path = "report_test.rs"]
mod tests;
