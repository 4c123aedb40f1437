//! Multidoc row mapper.
//!
//! Projects parsed [`CableRecord`]s into preview items for the review screen
//! and into the 8-column rows of a Multidoc import sheet.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::normalize::{normalize_label, normalize_number};
use crate::types::{CableGroup, CableRecord, CellValue, ExportRow, PreviewItem, Progress};

/// Unit label used when none is configured.
pub const DEFAULT_UNIT: &str = "ml";

/// Literal header row expected by the Multidoc import.
pub const EXPORT_HEADER: [&str; 8] = [
    "N°",
    "Titre",
    "Unité",
    "Quantité",
    "Prix unitaire",
    "",
    "TVA",
    "Descriptif",
];

// ─────────────────────────────────────────────────────────────────────────────
// Titles and Keys
// ─────────────────────────────────────────────────────────────────────────────

/// Builds the Multidoc line title of a record.
pub fn derive_title(record: &CableRecord) -> String {
    let mut title = format!(
        "Fourniture, pose et raccordement \"{}\" - en câble : {}",
        record.repere, record.cable
    );

    let mut extras = Vec::new();
    if !record.neutre.is_empty() {
        extras.push(record.neutre.clone());
    }
    if !record.pe.is_empty() {
        extras.push(format!("PE {}", record.pe));
    }
    if !extras.is_empty() {
        title.push_str(" + ");
        title.push_str(&extras.join(" + "));
    }
    if !record.type_cable.is_empty() {
        title.push_str(" - ");
        title.push_str(&record.type_cable);
    }
    title
}

/// Group key of a record: `cable | type`, or whichever half is present.
pub fn derive_group_key(record: &CableRecord) -> String {
    let cable = record.cable.trim();
    let type_cable = record.type_cable.trim();
    match (cable.is_empty(), type_cable.is_empty()) {
        (false, false) => format!("{cable} | {type_cable}"),
        (false, true) => cable.to_string(),
        (true, false) => type_cable.to_string(),
        (true, true) => String::new(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Progress
// ─────────────────────────────────────────────────────────────────────────────

/// Emits a [`Progress`] only when the rounded percentage changes.
#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    last_percent: Option<u32>,
}

impl ProgressTracker {
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            last_percent: None,
        }
    }

    /// Records that `current` items are done.
    #[allow(clippy::cast_possible_truncation)]
    pub fn advance(&mut self, current: usize) -> Option<Progress> {
        if self.total == 0 {
            return None;
        }
        // round half up, in integers
        let percent = ((current * 200 + self.total) / (self.total * 2)) as u32;
        if self.last_percent == Some(percent) {
            return None;
        }
        self.last_percent = Some(percent);
        Some(Progress {
            current,
            total: self.total,
            percent,
        })
    }
}

fn trace_progress(progress: Progress) {
    trace!(
        current = progress.current,
        total = progress.total,
        percent = progress.percent,
        "mapping records"
    );
}

// ─────────────────────────────────────────────────────────────────────────────
// Preview
// ─────────────────────────────────────────────────────────────────────────────

/// Builds one preview item per record.
pub fn build_preview(records: &[CableRecord]) -> Vec<PreviewItem> {
    build_preview_with_progress(records, &mut trace_progress)
}

/// Same as [`build_preview`], reporting progress as records are mapped.
pub fn build_preview_with_progress(
    records: &[CableRecord],
    on_progress: &mut dyn FnMut(Progress),
) -> Vec<PreviewItem> {
    let mut tracker = ProgressTracker::new(records.len());
    records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let item = PreviewItem {
                line_number: index + 1,
                title: derive_title(record),
                quantity: record.longueur.clone(),
                repere: record.repere.clone(),
                type_cable: derive_group_key(record),
            };
            if let Some(progress) = tracker.advance(index + 1) {
                on_progress(progress);
            }
            item
        })
        .collect()
}

/// Distinct group keys of a preview, with their line counts.
///
/// Named groups come first in case- and accent-insensitive order; the empty
/// key, if any, comes last.
pub fn cable_groups(preview: &[PreviewItem]) -> Vec<CableGroup> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for item in preview {
        *counts.entry(item.type_cable.as_str()).or_default() += 1;
    }

    let mut groups: Vec<CableGroup> = counts
        .into_iter()
        .map(|(key, count)| CableGroup {
            key: key.to_string(),
            count,
        })
        .collect();
    groups.sort_by(|a, b| compare_group_keys(&a.key, &b.key));
    groups
}

fn compare_group_keys(a: &str, b: &str) -> Ordering {
    match (a.is_empty(), b.is_empty()) {
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        _ => {
            let fold = |key: &str| normalize_label(&CellValue::from(key));
            fold(a).cmp(&fold(b)).then_with(|| a.cmp(b))
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Export
// ─────────────────────────────────────────────────────────────────────────────

/// Settings for building Multidoc rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Price used when no override applies.
    pub default_unit_price: CellValue,
    /// Tax rate applied to every line.
    pub default_tva: CellValue,
    /// Unit label written in the `Unité` column.
    pub default_unit: String,
    /// Whether the literal header row is written first.
    pub include_headers: bool,
    /// Per-line prices, by record position.
    pub unit_prices: Option<Vec<CellValue>>,
    /// Per-group prices, by group key.
    pub unit_prices_by_type: Option<BTreeMap<String, CellValue>>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            default_unit_price: CellValue::Empty,
            default_tva: CellValue::Empty,
            default_unit: DEFAULT_UNIT.to_string(),
            include_headers: true,
            unit_prices: None,
            unit_prices_by_type: None,
        }
    }
}

/// Where a unit price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    /// Price set for the record's cable group.
    Group,
    /// Price set for the record's line.
    Line,
    /// Price carried by the record itself.
    Record,
    /// Global default price.
    Default,
}

impl PriceTier {
    /// Tiers in resolution order; the first one holding a value wins.
    pub const ORDER: [Self; 4] = [Self::Group, Self::Line, Self::Record, Self::Default];

    /// Display label for this tier.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Group => "cable group",
            Self::Line => "line",
            Self::Record => "record",
            Self::Default => "default",
        }
    }

    fn lookup<'a>(
        self,
        options: &'a ExportOptions,
        record: &'a CableRecord,
        index: usize,
        group_key: &str,
    ) -> Option<&'a CellValue> {
        match self {
            Self::Group => options
                .unit_prices_by_type
                .as_ref()
                .and_then(|prices| prices.get(group_key)),
            Self::Line => options
                .unit_prices
                .as_ref()
                .and_then(|prices| prices.get(index)),
            Self::Record => record.unit_price.as_ref(),
            Self::Default => Some(&options.default_unit_price),
        }
    }
}

/// Resolves the raw unit price of the record at `index`, with its tier.
pub fn resolve_unit_price<'a>(
    options: &'a ExportOptions,
    record: &'a CableRecord,
    index: usize,
) -> (PriceTier, &'a CellValue) {
    let group_key = derive_group_key(record);
    PriceTier::ORDER
        .iter()
        .find_map(|tier| {
            tier.lookup(options, record, index, &group_key)
                .map(|value| (*tier, value))
        })
        .unwrap_or((PriceTier::Default, &options.default_unit_price))
}

/// Resolves the raw tax rate of a record.
pub fn resolve_tva<'a>(options: &'a ExportOptions, record: &'a CableRecord) -> &'a CellValue {
    record.tva.as_ref().unwrap_or(&options.default_tva)
}

/// The literal Multidoc header row.
pub fn header_row() -> ExportRow {
    EXPORT_HEADER.map(CellValue::text)
}

/// Builds the Multidoc rows for `records`.
pub fn build_export(records: &[CableRecord], options: &ExportOptions) -> Vec<ExportRow> {
    build_export_with_progress(records, options, &mut trace_progress)
}

/// Same as [`build_export`], reporting progress as records are mapped.
#[allow(clippy::cast_precision_loss)]
pub fn build_export_with_progress(
    records: &[CableRecord],
    options: &ExportOptions,
    on_progress: &mut dyn FnMut(Progress),
) -> Vec<ExportRow> {
    let mut rows = Vec::with_capacity(records.len() + 1);
    if options.include_headers {
        rows.push(header_row());
    }

    let mut tracker = ProgressTracker::new(records.len());
    for (index, record) in records.iter().enumerate() {
        let (_, unit_price) = resolve_unit_price(options, record, index);
        let tva = resolve_tva(options, record);
        let line_number = index + 1;

        rows.push([
            CellValue::Number(line_number as f64),
            CellValue::Text(derive_title(record)),
            CellValue::text(options.default_unit.clone()),
            record.longueur.clone(),
            normalize_number(unit_price),
            CellValue::Empty,
            normalize_number(tva),
            CellValue::Empty,
        ]);

        if let Some(progress) = tracker.advance(line_number) {
            on_progress(progress);
        }
    }

    debug!(
        records = records.len(),
        rows = rows.len(),
        headers = options.include_headers,
        "built multidoc rows"
    );
    rows
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_rows;
    use pretty_assertions::assert_eq;

    fn record(repere: &str, cable: &str, type_cable: &str, longueur: f64) -> CableRecord {
        CableRecord {
            amont: "TGBT".to_string(),
            repere: repere.to_string(),
            longueur: CellValue::Number(longueur),
            cable: cable.to_string(),
            type_cable: type_cable.to_string(),
            ..CableRecord::default()
        }
    }

    fn reference_records() -> Vec<CableRecord> {
        let text = |cells: &[&str]| -> Vec<CellValue> { cells.iter().map(|c| CellValue::from(*c)).collect() };
        parse_rows(&vec![
            text(&[
                "Amont",
                "Repere",
                "Longueur",
                "Cable",
                "Neutre",
                "PE ou PEN",
                "Type de cable",
            ]),
            text(&["TGBT", "Q1", "12", "3G2.5", "", "6", "U1000 R2V"]),
            text(&["", "", "", "", "", "", ""]),
        ])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Title / Key Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn reference_title_and_key() {
        let records = reference_records();
        assert_eq!(records.len(), 1);
        assert_eq!(derive_group_key(&records[0]), "3G2.5 | U1000 R2V");
        assert_eq!(
            derive_title(&records[0]),
            "Fourniture, pose et raccordement \"Q1\" - en câble : 3G2.5 + PE 6 - U1000 R2V"
        );
    }

    #[test]
    fn title_with_neutral_and_pe() {
        let mut rec = record("C2", "3x16", "", 20.0);
        rec.neutre = "1x16".to_string();
        rec.pe = "16".to_string();
        assert_eq!(
            derive_title(&rec),
            "Fourniture, pose et raccordement \"C2\" - en câble : 3x16 + 1x16 + PE 16"
        );
    }

    #[test]
    fn bare_title() {
        let rec = record("C3", "5G6", "", 1.0);
        assert_eq!(
            derive_title(&rec),
            "Fourniture, pose et raccordement \"C3\" - en câble : 5G6"
        );
    }

    #[test]
    fn group_key_fallbacks() {
        assert_eq!(derive_group_key(&record("a", "5G6", "", 1.0)), "5G6");
        assert_eq!(derive_group_key(&record("a", "", "H07RN-F", 1.0)), "H07RN-F");
        assert_eq!(derive_group_key(&record("a", "", "", 1.0)), "");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Progress Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn progress_fires_on_percent_change_only() {
        let mut tracker = ProgressTracker::new(400);
        let fired = (1..=400).filter_map(|i| tracker.advance(i)).count();
        // 0.25% steps: percentages 0 (i=1) through 100
        assert_eq!(fired, 101);
    }

    #[test]
    fn progress_rounds_half_up() {
        let mut tracker = ProgressTracker::new(3);
        let percents: Vec<u32> = (1..=3)
            .filter_map(|i| tracker.advance(i))
            .map(|p| p.percent)
            .collect();
        assert_eq!(percents, vec![33, 67, 100]);
    }

    #[test]
    fn progress_is_silent_for_empty_input() {
        let mut tracker = ProgressTracker::new(0);
        assert_eq!(tracker.advance(0), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Preview Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn preview_maps_one_to_one() {
        let records = vec![
            record("Q1", "3G2.5", "U1000 R2V", 12.0),
            record("Q2", "5G6", "", 4.0),
        ];
        let preview = build_preview(&records);
        assert_eq!(preview.len(), 2);
        assert_eq!(preview[0].line_number, 1);
        assert_eq!(preview[1].line_number, 2);
        assert_eq!(preview[0].type_cable, "3G2.5 | U1000 R2V");
        assert_eq!(preview[1].quantity, CellValue::Number(4.0));
        assert_eq!(preview[1].repere, "Q2");
    }

    #[test]
    fn preview_reports_progress() {
        let records = vec![record("Q1", "a", "", 1.0), record("Q2", "b", "", 1.0)];
        let mut seen = Vec::new();
        build_preview_with_progress(&records, &mut |p| seen.push(p.percent));
        assert_eq!(seen, vec![50, 100]);
    }

    #[test]
    fn preview_is_idempotent() {
        let records = reference_records();
        assert_eq!(build_preview(&records), build_preview(&records));
        assert!(build_preview(&[]).is_empty());
    }

    #[test]
    fn groups_sorted_with_empty_last() {
        let records = vec![
            record("1", "", "", 1.0),
            record("2", "b", "", 1.0),
            record("3", "Ä", "", 1.0),
            record("4", "b", "", 1.0),
            record("5", "c", "", 1.0),
        ];
        let groups = cable_groups(&build_preview(&records));
        let keys: Vec<(&str, usize)> = groups.iter().map(|g| (g.key.as_str(), g.count)).collect();
        assert_eq!(keys, vec![("Ä", 1), ("b", 2), ("c", 1), ("", 1)]);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Export Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn reference_export_row() {
        let records = reference_records();
        let options = ExportOptions {
            default_unit_price: CellValue::from("10"),
            default_tva: CellValue::from("20"),
            ..ExportOptions::default()
        };
        let rows = build_export(&records, &options);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], header_row());
        assert_eq!(
            rows[1],
            [
                CellValue::Number(1.0),
                CellValue::Text(derive_title(&records[0])),
                CellValue::from("ml"),
                CellValue::Number(12.0),
                CellValue::Number(10.0),
                CellValue::Empty,
                CellValue::Number(20.0),
                CellValue::Empty,
            ]
        );
    }

    #[test]
    fn header_literals() {
        let header: Vec<String> = header_row().iter().map(ToString::to_string).collect();
        assert_eq!(
            header,
            vec!["N°", "Titre", "Unité", "Quantité", "Prix unitaire", "", "TVA", "Descriptif"]
        );
    }

    #[test]
    fn header_toggle_row_counts() {
        let records = vec![record("Q1", "a", "", 1.0), record("Q2", "b", "", 2.0)];
        let with = build_export(&records, &ExportOptions::default());
        let without = build_export(
            &records,
            &ExportOptions {
                include_headers: false,
                ..ExportOptions::default()
            },
        );
        assert_eq!(with.len(), records.len() + 1);
        assert_eq!(without.len(), records.len());
        assert_eq!(without[0][0], CellValue::Number(1.0));
    }

    #[test]
    fn empty_records_export() {
        assert_eq!(build_export(&[], &ExportOptions::default()), vec![header_row()]);
        let options = ExportOptions {
            include_headers: false,
            ..ExportOptions::default()
        };
        assert!(build_export(&[], &options).is_empty());
    }

    #[test]
    fn group_price_wins_over_line_and_default() {
        let records = vec![
            record("Q1", "3G2.5", "U1000 R2V", 12.0),
            record("Q2", "5G6", "", 3.0),
        ];
        let options = ExportOptions {
            default_unit_price: CellValue::from("1"),
            unit_prices: Some(vec![CellValue::from("2"), CellValue::from("3")]),
            unit_prices_by_type: Some(BTreeMap::from([(
                "3G2.5 | U1000 R2V".to_string(),
                CellValue::from("9,5"),
            )])),
            ..ExportOptions::default()
        };
        let rows = build_export(&records, &options);
        assert_eq!(rows[1][4], CellValue::Number(9.5));
        assert_eq!(rows[2][4], CellValue::Number(3.0));

        assert_eq!(resolve_unit_price(&options, &records[0], 0).0, PriceTier::Group);
        assert_eq!(resolve_unit_price(&options, &records[1], 1).0, PriceTier::Line);
    }

    #[test]
    fn present_empty_group_price_still_wins() {
        let records = vec![record("Q1", "5G6", "", 3.0)];
        let options = ExportOptions {
            default_unit_price: CellValue::from("1"),
            unit_prices_by_type: Some(BTreeMap::from([("5G6".to_string(), CellValue::Empty)])),
            ..ExportOptions::default()
        };
        let (tier, value) = resolve_unit_price(&options, &records[0], 0);
        assert_eq!(tier, PriceTier::Group);
        assert_eq!(value, &CellValue::Empty);
        assert_eq!(build_export(&records, &options)[1][4], CellValue::Empty);
    }

    #[test]
    fn short_line_prices_fall_back_to_default() {
        let records = vec![record("Q1", "a", "", 1.0), record("Q2", "b", "", 1.0)];
        let options = ExportOptions {
            default_unit_price: CellValue::Number(4.0),
            unit_prices: Some(vec![CellValue::from("7")]),
            ..ExportOptions::default()
        };
        let rows = build_export(&records, &options);
        assert_eq!(rows[1][4], CellValue::Number(7.0));
        assert_eq!(rows[2][4], CellValue::Number(4.0));
    }

    #[test]
    fn record_override_sits_between_line_and_default() {
        let mut rec = record("Q1", "a", "", 1.0);
        rec.unit_price = Some(CellValue::Number(8.0));
        rec.tva = Some(CellValue::Number(5.5));
        let options = ExportOptions {
            default_unit_price: CellValue::Number(4.0),
            default_tva: CellValue::Number(20.0),
            ..ExportOptions::default()
        };
        let rows = build_export(std::slice::from_ref(&rec), &options);
        assert_eq!(rows[1][4], CellValue::Number(8.0));
        assert_eq!(rows[1][6], CellValue::Number(5.5));
    }

    #[test]
    fn invalid_prices_pass_through() {
        let records = vec![record("Q1", "a", "", 1.0)];
        let options = ExportOptions {
            default_unit_price: CellValue::from("sur devis"),
            default_tva: CellValue::from("20 %"),
            default_unit: "u".to_string(),
            ..ExportOptions::default()
        };
        let rows = build_export(&records, &options);
        assert_eq!(rows[1][2], CellValue::from("u"));
        assert_eq!(rows[1][4], CellValue::from("sur devis"));
        assert_eq!(rows[1][6], CellValue::from("20 %"));
    }

    #[test]
    fn export_is_idempotent_and_reports_progress() {
        let records = vec![record("Q1", "a", "", 1.0), record("Q2", "b", "", 2.0)];
        let options = ExportOptions::default();
        let mut seen = Vec::new();
        let first = build_export_with_progress(&records, &options, &mut |p| seen.push(p));
        assert_eq!(first, build_export(&records, &options));
        assert_eq!(seen.last().map(|p| (p.current, p.total, p.percent)), Some((2, 2, 100)));
    }
}
