//! Conversion pipeline - Caneco workbook in, Multidoc workbook out.
//!
//! Orchestrates the stages:
//! 1. Read the input worksheet as raw rows
//! 2. Parse rows into cable records
//! 3. Map records to preview items or Multidoc rows
//! 4. Write the Multidoc workbook
//!
//! Every call re-reads the input; nothing is cached between calls.

use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::info;

use crate::excel::{
    default_output_path, normalize_output_path, read_sheet_rows, write_sheet_rows,
    OUTPUT_SHEET_NAME,
};
use crate::mapper::{build_export, build_preview, cable_groups, ExportOptions};
use crate::parser::parse_rows;
use crate::types::{CableGroup, CableRecord, ConversionResult, PreviewItem};

// ─────────────────────────────────────────────────────────────────────────────
// Converter
// ─────────────────────────────────────────────────────────────────────────────

/// Converts one Caneco cable schedule.
pub struct Converter {
    /// Path to the Caneco export.
    input: PathBuf,
    /// Worksheet to read; first sheet when unset.
    sheet: Option<String>,
}

impl Converter {
    /// Creates a converter for an existing input file.
    pub fn new(input: PathBuf, sheet: Option<String>) -> anyhow::Result<Self> {
        if !input.exists() {
            anyhow::bail!("Input file does not exist: {}", input.display());
        }
        Ok(Self { input, sheet })
    }

    /// Returns the input path.
    pub fn input(&self) -> &Path {
        &self.input
    }

    /// Reads and parses the input worksheet.
    pub fn load_records(&self) -> anyhow::Result<Vec<CableRecord>> {
        let rows = read_sheet_rows(&self.input, self.sheet.as_deref())
            .with_context(|| format!("Failed to read {}", self.input.display()))?;
        let records = parse_rows(&rows);
        info!(rows = rows.len(), records = records.len(), "records loaded");
        Ok(records)
    }

    /// Preview items for the review screen.
    pub fn preview(&self) -> anyhow::Result<Vec<PreviewItem>> {
        let preview = build_preview(&self.load_records()?);
        info!(count = preview.len(), "preview built");
        Ok(preview)
    }

    /// Preview items together with their ordered cable groups.
    pub fn preview_with_groups(&self) -> anyhow::Result<(Vec<PreviewItem>, Vec<CableGroup>)> {
        let preview = self.preview()?;
        let groups = cable_groups(&preview);
        Ok((preview, groups))
    }

    /// The output path used when none is requested.
    pub fn default_output(&self) -> PathBuf {
        default_output_path(&self.input)
    }

    /// Converts the input and writes the Multidoc workbook.
    ///
    /// The output always gets an `.xlsx` extension. The returned row count
    /// excludes the header row.
    pub fn convert(
        &self,
        output: Option<&Path>,
        options: &ExportOptions,
    ) -> anyhow::Result<ConversionResult> {
        let output_path = normalize_output_path(
            &output.map_or_else(|| self.default_output(), Path::to_path_buf),
        );
        info!(
            input = %self.input.display(),
            output = %output_path.display(),
            by_type = options.unit_prices_by_type.as_ref().map_or(0, |p| p.len()),
            by_line = options.unit_prices.as_ref().map_or(0, Vec::len),
            "conversion started"
        );

        let records = self.load_records()?;
        let rows = build_export(&records, options);
        write_sheet_rows(&output_path, OUTPUT_SHEET_NAME, &rows, options.include_headers)
            .with_context(|| format!("Failed to write {}", output_path.display()))?;

        let row_count = if options.include_headers {
            rows.len().saturating_sub(1)
        } else {
            rows.len()
        };
        info!(output = %output_path.display(), rows = row_count, "conversion done");
        Ok(ConversionResult {
            output_path,
            row_count,
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
