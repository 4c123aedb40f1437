//! Caneco row parser.
//!
//! Turns a raw worksheet into [`CableRecord`]s:
//! 1. Trim blank rows at both ends of the sheet
//! 2. Detect an optional header row and remap columns from its labels
//! 3. Normalize each data row into a record
//! 4. Drop blank records and zero-length records
//!
//! Malformed rows are filtered, never reported.

use tracing::debug;

use crate::normalize::{normalize_label, normalize_number, normalize_text};
use crate::types::{CableRecord, CellValue, RawSheet};

// ─────────────────────────────────────────────────────────────────────────────
// Columns
// ─────────────────────────────────────────────────────────────────────────────

/// Semantic columns of a Caneco cable schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Amont,
    Repere,
    Longueur,
    Cable,
    Neutre,
    Pe,
    TypeCable,
}

impl Field {
    /// All fields, in default column order.
    pub const ALL: [Self; 7] = [
        Self::Amont,
        Self::Repere,
        Self::Longueur,
        Self::Cable,
        Self::Neutre,
        Self::Pe,
        Self::TypeCable,
    ];

    const fn slot(self) -> usize {
        self as usize
    }
}

/// Recognized header labels, already folded by [`normalize_label`].
pub const HEADER_SYNONYMS: &[(&str, Field)] = &[
    ("amont", Field::Amont),
    ("repere", Field::Repere),
    ("longueur", Field::Longueur),
    ("cable", Field::Cable),
    ("neutre", Field::Neutre),
    ("pe ou pen", Field::Pe),
    ("type de cable", Field::TypeCable),
];

/// Looks up the field a folded header label stands for.
pub fn field_for_label(label: &str) -> Option<Field> {
    HEADER_SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == label)
        .map(|(_, field)| *field)
}

/// Column position of every field within a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndex([usize; 7]);

impl Default for ColumnIndex {
    fn default() -> Self {
        Self(Field::ALL.map(Field::slot))
    }
}

impl ColumnIndex {
    /// Builds the index from a header row. Unknown labels are ignored and
    /// fields without a label keep their default position.
    pub fn from_header(header: &[CellValue]) -> Self {
        let mut index = Self::default();
        for (position, cell) in header.iter().enumerate() {
            if let Some(field) = field_for_label(&normalize_label(cell)) {
                index.0[field.slot()] = position;
            }
        }
        index
    }

    /// Column position of `field`.
    pub const fn get(&self, field: Field) -> usize {
        self.0[field.slot()]
    }

    fn cell<'a>(&self, row: &'a [CellValue], field: Field) -> &'a CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        row.get(self.get(field)).unwrap_or(&EMPTY)
    }
}

/// True when the row names both the `amont` and `repere` columns.
pub fn is_header_row(row: &[CellValue]) -> bool {
    let labels: Vec<String> = row.iter().map(normalize_label).collect();
    labels.iter().any(|l| l == "amont") && labels.iter().any(|l| l == "repere")
}

// ─────────────────────────────────────────────────────────────────────────────
// Rows
// ─────────────────────────────────────────────────────────────────────────────

/// True when every cell of the row is empty (or blank text).
pub fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(|cell| match cell {
        CellValue::Empty => true,
        CellValue::Text(s) => s.is_empty(),
        CellValue::Number(_) | CellValue::Date(_) => false,
    })
}

/// Returns the rows between the first and last non-blank rows.
pub fn trim_blank_rows(rows: &[Vec<CellValue>]) -> &[Vec<CellValue>] {
    let Some(start) = rows.iter().position(|r| !is_blank_row(r)) else {
        return &[];
    };
    let end = rows
        .iter()
        .rposition(|r| !is_blank_row(r))
        .map_or(start, |i| i + 1);
    &rows[start..end]
}

/// Normalizes one data row with the given column positions.
pub fn record_from_row(row: &[CellValue], columns: &ColumnIndex) -> CableRecord {
    let text = |field| normalize_text(columns.cell(row, field));
    CableRecord {
        amont: text(Field::Amont),
        repere: text(Field::Repere),
        longueur: normalize_number(columns.cell(row, Field::Longueur)),
        cable: text(Field::Cable),
        neutre: text(Field::Neutre),
        pe: text(Field::Pe),
        type_cable: text(Field::TypeCable),
        unit_price: None,
        tva: None,
    }
}

/// Parses a raw worksheet into cable records.
pub fn parse_rows(sheet: &RawSheet) -> Vec<CableRecord> {
    let rows = trim_blank_rows(sheet);
    let Some(first) = rows.first() else {
        return Vec::new();
    };

    let (columns, data) = if is_header_row(first) {
        let columns = ColumnIndex::from_header(first);
        debug!(?columns, "header row detected");
        (columns, &rows[1..])
    } else {
        (ColumnIndex::default(), rows)
    };

    let records: Vec<CableRecord> = data
        .iter()
        .filter(|row| !row.is_empty())
        .map(|row| record_from_row(row, &columns))
        .filter(|record| !record.is_blank() && !record.has_zero_length())
        .collect();

    debug!(
        rows = data.len(),
        records = records.len(),
        "parsed cable schedule"
    );
    records
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn row(cells: &[&str]) -> Vec<CellValue> {
        cells.iter().map(|c| CellValue::from(*c)).collect()
    }

    fn header() -> Vec<CellValue> {
        row(&[
            "Amont",
            "Repere",
            "Longueur",
            "Cable",
            "Neutre",
            "PE ou PEN",
            "Type de cable",
        ])
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Header Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn header_detection_is_case_and_accent_insensitive() {
        assert!(is_header_row(&row(&["AMONT", "Repère"])));
        assert!(is_header_row(&row(&["x", " repere ", "amont"])));
        assert!(!is_header_row(&row(&["Amont", "Longueur"])));
        assert!(!is_header_row(&[]));
    }

    #[test]
    fn default_columns_follow_field_order() {
        let columns = ColumnIndex::default();
        let positions: Vec<usize> = Field::ALL.iter().map(|f| columns.get(*f)).collect();
        assert_eq!(positions, vec![0, 1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn column_index_follows_header() {
        let header = row(&["Type de câble", "Repère", "Amont", "Longueur", "Câble"]);
        let columns = ColumnIndex::from_header(&header);
        assert_eq!(columns.get(Field::TypeCable), 0);
        assert_eq!(columns.get(Field::Repere), 1);
        assert_eq!(columns.get(Field::Amont), 2);
        assert_eq!(columns.get(Field::Longueur), 3);
        assert_eq!(columns.get(Field::Cable), 4);
        // no label: default positions
        assert_eq!(columns.get(Field::Neutre), 4);
        assert_eq!(columns.get(Field::Pe), 5);
    }

    #[test]
    fn unknown_labels_are_ignored() {
        let header = row(&["Amont", "Repere", "Section", "Commentaire"]);
        let columns = ColumnIndex::from_header(&header);
        assert_eq!(columns, ColumnIndex::default());
    }

    #[test]
    fn synonym_table_lookup() {
        assert_eq!(field_for_label("pe ou pen"), Some(Field::Pe));
        assert_eq!(field_for_label("type de cable"), Some(Field::TypeCable));
        assert_eq!(field_for_label("pe"), None);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Trim Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn trim_removes_boundary_blank_rows_only() {
        let rows = vec![
            row(&["", ""]),
            row(&["a"]),
            row(&["", ""]),
            row(&["b"]),
            vec![],
            row(&[""]),
        ];
        let trimmed = trim_blank_rows(&rows);
        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed[0], row(&["a"]));
        assert_eq!(trimmed[2], row(&["b"]));
    }

    #[test]
    fn trim_all_blank_gives_nothing() {
        let rows = vec![row(&[""]), vec![CellValue::Empty]];
        assert!(trim_blank_rows(&rows).is_empty());
    }

    #[test]
    fn header_found_after_leading_blank_rows() {
        let sheet = vec![
            row(&["", "", ""]),
            header(),
            row(&["TGBT", "Q1", "12", "3G2.5", "", "6", "U1000 R2V"]),
        ];
        let records = parse_rows(&sheet);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repere, "Q1");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Parse Tests
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn parse_empty_sheet() {
        assert!(parse_rows(&Vec::new()).is_empty());
    }

    #[test]
    fn parse_reference_sheet() {
        let sheet = vec![
            header(),
            row(&["TGBT", "Q1", "12", "3G2.5", "", "6", "U1000 R2V"]),
            row(&["", "", "", "", "", "", ""]),
        ];
        let records = parse_rows(&sheet);
        assert_eq!(
            records,
            vec![CableRecord {
                amont: "TGBT".to_string(),
                repere: "Q1".to_string(),
                longueur: CellValue::Number(12.0),
                cable: "3G2.5".to_string(),
                neutre: String::new(),
                pe: "6".to_string(),
                type_cable: "U1000 R2V".to_string(),
                unit_price: None,
                tva: None,
            }]
        );
    }

    #[test]
    fn parse_without_header_uses_default_columns() {
        let sheet = vec![
            row(&["TD1", "C3", "8,5", "5G6", "", "", "H07RN-F"]),
            row(&["TD1", "C4", "4", "3G1.5"]),
        ];
        let records = parse_rows(&sheet);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].longueur, CellValue::Number(8.5));
        assert_eq!(records[0].type_cable, "H07RN-F");
        // short row: missing cells read as empty
        assert_eq!(records[1].type_cable, "");
        assert_eq!(records[1].pe, "");
    }

    #[test]
    fn parse_with_reordered_header() {
        let sheet = vec![
            row(&["Repère", "Câble", "Longueur", "Amont"]),
            row(&["Q7", "4G10", "30", "TGBT"]),
        ];
        let records = parse_rows(&sheet);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repere, "Q7");
        assert_eq!(records[0].cable, "4G10");
        assert_eq!(records[0].amont, "TGBT");
        assert_eq!(records[0].longueur, CellValue::Number(30.0));
    }

    #[test]
    fn zero_length_rows_are_dropped() {
        let sheet = vec![
            row(&["TGBT", "Q1", "0", "3G2.5"]),
            vec![
                CellValue::from("TGBT"),
                CellValue::from("Q2"),
                CellValue::Number(0.0),
                CellValue::from("3G2.5"),
            ],
            row(&["TGBT", "Q3", "0,0", "3G2.5"]),
            row(&["TGBT", "Q4", "1", "3G2.5"]),
        ];
        let records = parse_rows(&sheet);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repere, "Q4");
    }

    #[test]
    fn amont_only_rows_are_dropped() {
        let sheet = vec![row(&["TGBT"]), row(&["TGBT", "Q1"])];
        let records = parse_rows(&sheet);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].repere, "Q1");
        assert_eq!(records[0].longueur, CellValue::Empty);
    }

    #[test]
    fn unparsable_length_is_kept() {
        let sheet = vec![row(&["TGBT", "Q1", "env. 12", "3G2.5"])];
        let records = parse_rows(&sheet);
        assert_eq!(records[0].longueur, CellValue::from("env. 12"));
    }

    #[test]
    fn numeric_text_cells_become_text() {
        let sheet = vec![vec![
            CellValue::from("TGBT"),
            CellValue::Number(12.0),
            CellValue::Number(5.0),
            CellValue::from("3G2.5"),
            CellValue::Empty,
            CellValue::Number(2.5),
        ]];
        let records = parse_rows(&sheet);
        assert_eq!(records[0].repere, "12");
        assert_eq!(records[0].pe, "2.5");
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Properties
    // ─────────────────────────────────────────────────────────────────────────

    fn cell_strategy() -> impl Strategy<Value = CellValue> {
        prop_oneof![
            Just(CellValue::Empty),
            Just(CellValue::from("")),
            Just(CellValue::from("0")),
            (0u32..50).prop_map(|n| CellValue::Number(f64::from(n))),
            "[A-Z][0-9]{1,2}".prop_map(CellValue::Text),
        ]
    }

    fn sheet_strategy() -> impl Strategy<Value = RawSheet> {
        prop::collection::vec(prop::collection::vec(cell_strategy(), 0..8), 0..20)
    }

    proptest! {
        #[test]
        fn no_blank_or_zero_records(sheet in sheet_strategy()) {
            for record in parse_rows(&sheet) {
                prop_assert!(!record.is_blank());
                prop_assert!(!record.has_zero_length());
            }
        }

        #[test]
        fn records_keep_source_order(sheet in sheet_strategy()) {
            // Tag each row with a unique amont so records map back to rows.
            let tagged: RawSheet = sheet
                .into_iter()
                .enumerate()
                .map(|(i, mut r)| {
                    if r.is_empty() {
                        r.push(CellValue::Empty);
                    }
                    r[0] = CellValue::Text(format!("row{i}"));
                    r
                })
                .collect();
            let positions: Vec<usize> = parse_rows(&tagged)
                .iter()
                .map(|r| r.amont[3..].parse().unwrap())
                .collect();
            prop_assert!(positions.windows(2).all(|w| w[0] < w[1]));
        }

        #[test]
        fn parsing_is_deterministic(sheet in sheet_strategy()) {
            prop_assert_eq!(parse_rows(&sheet), parse_rows(&sheet));
        }
    }
}
