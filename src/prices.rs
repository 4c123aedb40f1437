//! Price book: the pricing choices of a review session, stored as YAML.
//!
//! ```yaml
//! mode: per-cable
//! default_unit_price: "0"
//! tva: "20"
//! unit: ml
//! include_headers: true
//! by_type:
//!   3G2.5 | U1000 R2V: "12,5"
//! by_line: []
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::PriceBookError;
use crate::mapper::{ExportOptions, DEFAULT_UNIT};
use crate::types::{CableGroup, CellValue, PreviewItem};

// ─────────────────────────────────────────────────────────────────────────────
// Price Mode
// ─────────────────────────────────────────────────────────────────────────────

/// How unit prices are assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceMode {
    /// One price per cable group.
    #[default]
    PerCable,
    /// One price per line.
    PerLine,
}

impl PriceMode {
    /// Returns the display label for this mode.
    pub const fn label(self) -> &'static str {
        match self {
            Self::PerCable => "Per cable",
            Self::PerLine => "Per line",
        }
    }

    /// The other mode.
    pub const fn toggle(self) -> Self {
        match self {
            Self::PerCable => Self::PerLine,
            Self::PerLine => Self::PerCable,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Price Book
// ─────────────────────────────────────────────────────────────────────────────

/// Prices and export settings for one conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceBook {
    pub mode: PriceMode,
    pub default_unit_price: CellValue,
    pub tva: CellValue,
    pub unit: String,
    pub include_headers: bool,
    /// Prices by group key, used in per-cable mode.
    pub by_type: BTreeMap<String, CellValue>,
    /// Prices by line position, used in per-line mode.
    pub by_line: Vec<CellValue>,
}

impl Default for PriceBook {
    fn default() -> Self {
        Self {
            mode: PriceMode::default(),
            default_unit_price: CellValue::from("0"),
            tva: CellValue::from("0"),
            unit: DEFAULT_UNIT.to_string(),
            include_headers: true,
            by_type: BTreeMap::new(),
            by_line: Vec::new(),
        }
    }
}

impl PriceBook {
    /// Loads a price book from a YAML file.
    pub fn load(path: &Path) -> Result<Self, PriceBookError> {
        let content = fs::read_to_string(path).map_err(|source| PriceBookError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let book: Self =
            serde_yaml_ng::from_str(&content).map_err(|source| PriceBookError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        info!(
            path = %path.display(),
            groups = book.by_type.len(),
            lines = book.by_line.len(),
            "price book loaded"
        );
        Ok(book)
    }

    /// Writes the price book as YAML.
    pub fn save(&self, path: &Path) -> Result<(), PriceBookError> {
        let yaml = serde_yaml_ng::to_string(self).map_err(PriceBookError::Serialize)?;
        fs::write(path, yaml).map_err(|source| PriceBookError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "price book saved");
        Ok(())
    }

    /// Export settings for this book. Only the active mode's prices apply.
    pub fn to_export_options(&self) -> ExportOptions {
        let (unit_prices, unit_prices_by_type) = match self.mode {
            PriceMode::PerCable => (None, Some(self.by_type.clone())),
            PriceMode::PerLine => (Some(self.by_line.clone()), None),
        };
        ExportOptions {
            default_unit_price: self.default_unit_price.clone(),
            default_tva: self.tva.clone(),
            default_unit: self.unit.clone(),
            include_headers: self.include_headers,
            unit_prices,
            unit_prices_by_type,
        }
    }

    /// Aligns prices with a freshly loaded preview.
    ///
    /// Known groups and line positions keep their price, new ones get the
    /// default price, and stale groups or trailing lines are dropped.
    pub fn sync_with_preview(&mut self, preview: &[PreviewItem], groups: &[CableGroup]) {
        let mut by_type = BTreeMap::new();
        for group in groups {
            let price = self
                .by_type
                .remove(&group.key)
                .unwrap_or_else(|| self.default_unit_price.clone());
            by_type.insert(group.key.clone(), price);
        }
        self.by_type = by_type;

        self.by_line.truncate(preview.len());
        self.by_line
            .resize(preview.len(), self.default_unit_price.clone());
    }

    /// Sets every price of the active mode to the default price.
    pub fn apply_default(&mut self) {
        let default = self.default_unit_price.clone();
        match self.mode {
            PriceMode::PerCable => self.by_type.values_mut().for_each(|p| *p = default.clone()),
            PriceMode::PerLine => self.by_line.iter_mut().for_each(|p| *p = default.clone()),
        }
    }

    /// Price of a group, if one is set.
    pub fn group_price(&self, key: &str) -> Option<&CellValue> {
        self.by_type.get(key)
    }

    /// Price of a line (0-based), if one is set.
    pub fn line_price(&self, index: usize) -> Option<&CellValue> {
        self.by_line.get(index)
    }

    pub fn set_group_price(&mut self, key: &str, price: CellValue) {
        self.by_type.insert(key.to_string(), price);
    }

    pub fn set_line_price(&mut self, index: usize, price: CellValue) {
        if index >= self.by_line.len() {
            self.by_line
                .resize(index + 1, self.default_unit_price.clone());
        }
        self.by_line[index] = price;
    }
}

/// `<dir>/<stem>.prices.yaml` next to the input file.
pub fn default_price_book_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map_or_else(|| "caneflow".to_string(), |s| s.to_string_lossy().to_string());
    input.with_file_name(format!("{stem}.prices.yaml"))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
