//! Excel helpers: reads Caneco exports and writes Multidoc workbooks.
//!
//! Provides:
//! - Read a worksheet (xlsx, xlsm, xls, ods, or csv) as raw rows
//! - Write rows to a new xlsx workbook
//! - Default output naming next to the input file

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use encoding_rs::WINDOWS_1252;
use rust_xlsxwriter::{Format, Workbook};
use tracing::{debug, info};

use crate::error::ExcelError;
use crate::parser::trim_blank_rows;
use crate::types::{CellValue, RawSheet};

/// Name of the worksheet written for Multidoc.
pub const OUTPUT_SHEET_NAME: &str = "Multidoc";

// ─────────────────────────────────────────────────────────────────────────────
// Cell Conversion
// ─────────────────────────────────────────────────────────────────────────────

impl From<&Data> for CellValue {
    #[allow(clippy::cast_precision_loss)]
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty | Data::Error(_) => Self::Empty,
            Data::Int(i) => Self::Number(*i as f64),
            Data::Float(f) => Self::Number(*f),
            Data::String(s) | Data::DurationIso(s) => Self::Text(s.clone()),
            Data::Bool(b) => Self::Text(b.to_string()),
            Data::DateTime(dt) => {
                if dt.is_duration() {
                    Self::Number(dt.as_f64())
                } else {
                    dt.as_datetime()
                        .map_or_else(|| Self::Number(dt.as_f64()), Self::Date)
                }
            }
            Data::DateTimeIso(s) => parse_iso_datetime(s).map_or_else(|| Self::Text(s.clone()), Self::Date),
        }
    }
}

fn parse_iso_datetime(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

// ─────────────────────────────────────────────────────────────────────────────
// Reading
// ─────────────────────────────────────────────────────────────────────────────

fn is_csv(path: &Path) -> bool {
    path.extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Reads one worksheet as raw rows, blank rows trimmed at both ends.
///
/// Without a sheet name the first worksheet is used. CSV files have a single
/// implicit sheet and ignore the name.
pub fn read_sheet_rows(path: &Path, sheet: Option<&str>) -> Result<RawSheet, ExcelError> {
    info!(path = %path.display(), sheet = sheet.unwrap_or(""), "reading sheet");
    if !path.exists() {
        return Err(ExcelError::NotFound(path.to_path_buf()));
    }

    let rows = if is_csv(path) {
        read_csv_rows(path)?
    } else {
        read_workbook_rows(path, sheet)?
    };

    let rows = trim_blank_rows(&rows).to_vec();
    info!(rows = rows.len(), "sheet read");
    Ok(rows)
}

fn read_workbook_rows(path: &Path, sheet: Option<&str>) -> Result<RawSheet, ExcelError> {
    let mut workbook = open_workbook_auto(path).map_err(|source| ExcelError::Open {
        path: path.to_path_buf(),
        source,
    })?;

    let names = workbook.sheet_names();
    debug!(sheets = names.len(), "workbook opened");
    let name = match sheet {
        Some(wanted) => names
            .into_iter()
            .find(|n| n == wanted)
            .ok_or_else(|| ExcelError::SheetNotFound(wanted.to_string()))?,
        None => names.into_iter().next().ok_or(ExcelError::NoSheet)?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|source| ExcelError::Sheet {
            name: name.clone(),
            source,
        })?;

    // Ranges start at the first used cell; pad so column A stays index 0.
    let first_col = range.start().map_or(0, |(_, col)| col as usize);
    let rows = range
        .rows()
        .map(|row| {
            let mut cells = vec![CellValue::Empty; first_col];
            cells.extend(row.iter().map(CellValue::from));
            cells
        })
        .collect();
    Ok(rows)
}

/// Picks the CSV delimiter from the first line: `;`, tab or `,`.
fn sniff_delimiter(first_line: &str) -> u8 {
    [b';', b'\t', b',']
        .into_iter()
        .max_by_key(|d| first_line.bytes().filter(|b| b == d).count())
        .filter(|d| first_line.as_bytes().contains(d))
        .unwrap_or(b',')
}

/// Decodes CSV bytes as UTF-8, falling back to Windows-1252 (French Excel
/// "CSV (séparateur: point-virgule)" exports).
fn decode_csv(bytes: &[u8]) -> Cow<'_, str> {
    match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text.strip_prefix('\u{feff}').unwrap_or(text)),
        Err(_) => {
            let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
            debug!(had_errors, "csv is not utf-8, decoded as windows-1252");
            text
        }
    }
}

fn read_csv_rows(path: &Path) -> Result<RawSheet, ExcelError> {
    let bytes = fs::read(path)?;
    let text = decode_csv(&bytes);
    let delimiter = sniff_delimiter(text.lines().next().unwrap_or(""));
    debug!(delimiter = %char::from(delimiter), "reading csv");

    let csv_error = |source: csv::Error| ExcelError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(delimiter)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        rows.push(record.iter().map(CellValue::text).collect());
    }
    Ok(rows)
}

/// Gets the sheet names from a workbook.
pub fn sheet_names(path: &Path) -> Result<Vec<String>, ExcelError> {
    if is_csv(path) {
        return Ok(vec![path
            .file_stem()
            .map_or_else(String::new, |s| s.to_string_lossy().to_string())]);
    }
    let workbook = open_workbook_auto(path).map_err(|source| ExcelError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(workbook.sheet_names())
}

// ─────────────────────────────────────────────────────────────────────────────
// Writing
// ─────────────────────────────────────────────────────────────────────────────

/// Writes rows to a new single-sheet workbook.
///
/// Empty cells are left unwritten. With `has_header` the first row is bold.
#[allow(clippy::cast_possible_truncation)]
pub fn write_sheet_rows<R: AsRef<[CellValue]>>(
    path: &Path,
    sheet_name: &str,
    rows: &[R],
    has_header: bool,
) -> Result<(), ExcelError> {
    info!(path = %path.display(), sheet = sheet_name, rows = rows.len(), "writing workbook");
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name(sheet_name)?;

    let bold = Format::new().set_bold();
    let plain = Format::new();
    let date = Format::new().set_num_format("dd/mm/yyyy");

    for (r, row) in rows.iter().enumerate() {
        let format = if has_header && r == 0 { &bold } else { &plain };
        let r = r as u32;
        for (c, cell) in row.as_ref().iter().enumerate() {
            let c = c as u16;
            match cell {
                CellValue::Empty => {}
                CellValue::Text(s) => {
                    sheet.write_string_with_format(r, c, s, format)?;
                }
                CellValue::Number(n) => {
                    sheet.write_number_with_format(r, c, *n, format)?;
                }
                CellValue::Date(dt) => {
                    sheet.write_datetime_with_format(r, c, dt, &date)?;
                }
            }
        }
    }

    // Title column holds long descriptions
    sheet.set_column_width(1, 90)?;

    workbook.save(path)?;
    info!(path = %path.display(), "workbook written");
    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Output Paths
// ─────────────────────────────────────────────────────────────────────────────

/// `<dir>/<stem> - MULTIDOC.xlsx` next to the input file.
pub fn default_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "export".to_string(), |s| s.to_string_lossy().to_string());
    input.with_file_name(format!("{stem} - MULTIDOC.xlsx"))
}

/// Forces the `.xlsx` extension.
pub fn normalize_output_path(path: &Path) -> PathBuf {
    if path
        .extension()
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx"))
    {
        path.to_path_buf()
    } else {
        path.with_extension("xlsx")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
