//! Common types for caneflow

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Cell Values
// ─────────────────────────────────────────────────────────────────────────────

/// A single spreadsheet cell, as handed over by the workbook reader.
///
/// Rich cells (formulas, hyperlinks, rich text) are already collapsed to
/// their displayed value by the time they reach this type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Empty cell.
    #[default]
    Empty,
    /// Numeric value.
    Number(f64),
    /// String value.
    Text(String),
    /// Date or date-time value.
    Date(NaiveDateTime),
}

impl CellValue {
    /// Builds a text cell, or an empty one for an empty string.
    pub fn text(value: impl Into<String>) -> Self {
        let value = value.into();
        if value.is_empty() {
            Self::Empty
        } else {
            Self::Text(value)
        }
    }

    /// Returns true for [`CellValue::Empty`].
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns the numeric value if this is a number.
    pub const fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => Ok(()),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
            Self::Date(dt) => {
                if dt.time() == chrono::NaiveTime::MIN {
                    write!(f, "{}", dt.format("%Y-%m-%d"))
                } else {
                    write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S"))
                }
            }
        }
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// A raw worksheet: ordered rows of ordered cells.
pub type RawSheet = Vec<Vec<CellValue>>;

// ─────────────────────────────────────────────────────────────────────────────
// Cable Records
// ─────────────────────────────────────────────────────────────────────────────

/// One Caneco row after normalization.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CableRecord {
    /// Upstream reference (the feeding switchboard).
    pub amont: String,
    /// Circuit designator.
    pub repere: String,
    /// Cable length; a number, empty, or the unparsable source value.
    pub longueur: CellValue,
    /// Phase conductor descriptor.
    pub cable: String,
    /// Neutral conductor descriptor.
    pub neutre: String,
    /// Protective-earth conductor descriptor.
    pub pe: String,
    /// Cable type (e.g. `U1000 R2V`).
    pub type_cable: String,
    /// Per-record unit price. No column feeds it yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<CellValue>,
    /// Per-record tax rate. No column feeds it yet.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tva: Option<CellValue>,
}

impl CableRecord {
    /// True when the record carries nothing worth exporting.
    ///
    /// `amont` alone does not make a record meaningful.
    pub fn is_blank(&self) -> bool {
        self.repere.is_empty()
            && self.cable.is_empty()
            && self.neutre.is_empty()
            && self.pe.is_empty()
            && self.type_cable.is_empty()
            && self.longueur.is_empty()
    }

    /// True when the length is numerically zero.
    #[allow(clippy::float_cmp)]
    pub fn has_zero_length(&self) -> bool {
        self.longueur.as_number() == Some(0.0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Projections
// ─────────────────────────────────────────────────────────────────────────────

/// Summary of one record for the review screen.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    /// 1-based position among surviving records.
    pub line_number: usize,
    pub title: String,
    pub quantity: CellValue,
    pub repere: String,
    /// Group key (`cable | type`), not the bare cable type.
    pub type_cable: String,
}

/// A distinct group key with the number of lines carrying it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CableGroup {
    pub key: String,
    pub count: usize,
}

impl CableGroup {
    /// Label shown for a group; the empty key gets a placeholder.
    pub fn label(&self) -> &str {
        if self.key.is_empty() {
            "(empty cable/type)"
        } else {
            &self.key
        }
    }
}

/// Number of columns in a Multidoc row.
pub const EXPORT_COLUMNS: usize = 8;

/// One Multidoc output row.
pub type ExportRow = [CellValue; EXPORT_COLUMNS];

/// Progress notification emitted while mapping records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
    pub percent: u32,
}

/// Outcome of a conversion written to disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub output_path: std::path::PathBuf,
    /// Data rows written, header excluded.
    pub row_count: usize,
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
