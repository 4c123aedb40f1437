//! Cell normalization shared by the parser and the mapper.

use unicode_normalization::UnicodeNormalization;

use crate::types::CellValue;

/// Text form of a cell, trimmed. Empty cells give an empty string.
pub fn normalize_text(value: &CellValue) -> String {
    match value {
        CellValue::Empty => String::new(),
        CellValue::Text(s) => s.trim().to_string(),
        other => other.to_string().trim().to_string(),
    }
}

/// Numeric form of a cell.
///
/// Text is parsed after replacing the first decimal comma with a dot. When the
/// text is not a finite number the original value is kept untouched.
pub fn normalize_number(value: &CellValue) -> CellValue {
    match value {
        CellValue::Text(s) if s.is_empty() => CellValue::Empty,
        CellValue::Text(s) => parse_decimal(s).map_or_else(|| value.clone(), CellValue::Number),
        other => other.clone(),
    }
}

/// Parses `12,5` and `12.5` alike. Blank text reads as zero.
fn parse_decimal(raw: &str) -> Option<f64> {
    let candidate = raw.replacen(',', ".", 1);
    let candidate = candidate.trim();
    if candidate.is_empty() {
        return Some(0.0);
    }
    // `inf` and `nan` parse in Rust but are not amounts
    candidate.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Folds a header label for comparison: lowercase, no accents, single spaces.
pub fn normalize_label(value: &CellValue) -> String {
    normalize_text(value)
        .to_lowercase()
        .nfd()
        .filter(|c| !unicode_normalization::char::is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
