//! TUI application state - App struct and all its methods.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use ratatui::widgets::ListState;

use super::state::{ActivePanel, EditTarget, InputMode};
use crate::mapper::{build_preview, cable_groups, resolve_unit_price, ExportOptions, PriceTier};
use crate::normalize::{normalize_label, normalize_number};
use crate::prices::{PriceBook, PriceMode};
use crate::types::{CableGroup, CableRecord, CellValue, ConversionResult, PreviewItem};

/// Duration to show status messages.
const STATUS_MESSAGE_DURATION: Duration = Duration::from_secs(3);

/// Counts of resolved unit prices across all lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriceSummary {
    pub numeric: usize,
    pub text: usize,
    pub empty: usize,
}

/// Main application state for the TUI.
pub struct App {
    /// Input workbook.
    pub(super) input: PathBuf,
    /// Output workbook written on export.
    pub(super) output: PathBuf,
    /// Where the price book is saved.
    pub(super) price_book_path: PathBuf,
    /// Parsed records, in sheet order.
    records: Vec<CableRecord>,
    /// Preview items, one per record.
    pub(super) preview: Vec<PreviewItem>,
    /// Ordered cable groups of the preview.
    pub(super) groups: Vec<CableGroup>,
    /// Prices being edited.
    pub(super) prices: PriceBook,
    /// Currently active panel.
    pub(super) active_panel: ActivePanel,
    /// State for the list (selection, scroll offset).
    pub(super) list_state: ListState,
    /// Indices into `groups` or `preview`, depending on the price mode.
    pub(super) filtered_indices: Vec<usize>,
    /// Current input mode.
    pub(super) input_mode: InputMode,
    /// Search query string.
    pub(super) search_query: String,
    /// Text typed while editing a price.
    pub(super) edit_buffer: String,
    /// Status message to display (with expiration time).
    status_message: Option<(String, Instant)>,
    /// Result of the most recent export.
    pub(super) last_export: Option<ConversionResult>,
}

impl App {
    pub fn new(input: PathBuf, output: PathBuf, price_book_path: PathBuf, prices: PriceBook) -> Self {
        Self {
            input,
            output,
            price_book_path,
            records: Vec::new(),
            preview: Vec::new(),
            groups: Vec::new(),
            prices,
            active_panel: ActivePanel::default(),
            list_state: ListState::default(),
            filtered_indices: Vec::new(),
            input_mode: InputMode::default(),
            search_query: String::new(),
            edit_buffer: String::new(),
            status_message: None,
            last_export: None,
        }
    }

    /// Replaces the records and realigns prices with them.
    pub fn load(&mut self, records: Vec<CableRecord>) {
        self.preview = build_preview(&records);
        self.groups = cable_groups(&self.preview);
        self.records = records;
        self.prices.sync_with_preview(&self.preview, &self.groups);
        self.refresh_list();
    }

    pub fn records(&self) -> &[CableRecord] {
        &self.records
    }

    pub fn export_options(&self) -> ExportOptions {
        self.prices.to_export_options()
    }

    pub const fn mode(&self) -> PriceMode {
        self.prices.mode
    }

    pub fn toggle_mode(&mut self) {
        self.prices.mode = self.prices.mode.toggle();
        self.refresh_list();
        self.set_status(format!("Price mode: {}", self.prices.mode.label()));
    }

    /// Sets every price of the active mode to the default.
    pub fn apply_default(&mut self) {
        self.prices.apply_default();
        self.set_status(format!(
            "Default price {} applied to all",
            self.prices.default_unit_price
        ));
    }

    // ─────────────────────────────────────────────────────────────────────
    // List and selection
    // ─────────────────────────────────────────────────────────────────────

    fn update_filtered_indices(&mut self) {
        let query = normalize_label(&CellValue::text(self.search_query.as_str()));
        let matches = |text: &str| normalize_label(&CellValue::text(text)).contains(&query);
        self.filtered_indices = match self.prices.mode {
            PriceMode::PerCable => self
                .groups
                .iter()
                .enumerate()
                .filter(|(_, group)| query.is_empty() || matches(group.key.as_str()))
                .map(|(i, _)| i)
                .collect(),
            PriceMode::PerLine => self
                .preview
                .iter()
                .enumerate()
                .filter(|(_, item)| {
                    query.is_empty()
                        || matches(item.repere.as_str())
                        || matches(item.type_cable.as_str())
                        || matches(item.title.as_str())
                })
                .map(|(i, _)| i)
                .collect(),
        };
    }

    fn refresh_list(&mut self) {
        self.update_filtered_indices();
        if self.filtered_indices.is_empty() {
            self.list_state.select(None);
        } else {
            self.list_state.select(Some(0));
        }
    }

    pub fn select_previous(&mut self) {
        if self.filtered_indices.is_empty() {
            return;
        }
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| i.saturating_sub(1));
        self.list_state.select(Some(i));
    }

    pub fn select_next(&mut self) {
        if self.filtered_indices.is_empty() {
            return;
        }
        let max_idx = self.filtered_indices.len().saturating_sub(1);
        let i = self
            .list_state
            .selected()
            .map_or(0, |i| (i + 1).min(max_idx));
        self.list_state.select(Some(i));
    }

    fn selected_index(&self) -> Option<usize> {
        self.list_state
            .selected()
            .and_then(|i| self.filtered_indices.get(i))
            .copied()
    }

    /// Selected group, in per-cable mode.
    pub fn selected_group(&self) -> Option<&CableGroup> {
        match self.prices.mode {
            PriceMode::PerCable => self.selected_index().and_then(|i| self.groups.get(i)),
            PriceMode::PerLine => None,
        }
    }

    /// Selected line with its 0-based position, in per-line mode.
    pub fn selected_line(&self) -> Option<(usize, &PreviewItem)> {
        match self.prices.mode {
            PriceMode::PerLine => self
                .selected_index()
                .and_then(|i| self.preview.get(i).map(|item| (i, item))),
            PriceMode::PerCable => None,
        }
    }

    /// Lines belonging to a group, in sheet order.
    pub fn lines_in_group<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a PreviewItem> {
        self.preview.iter().filter(move |item| item.type_cable == key)
    }

    /// Raw price and its tier for the line at `index`.
    pub fn resolved_price(&self, index: usize) -> Option<(PriceTier, CellValue)> {
        let options = self.export_options();
        self.records.get(index).map(|record| {
            let (tier, value) = resolve_unit_price(&options, record, index);
            (tier, value.clone())
        })
    }

    /// How many lines would export a numeric, textual, or empty unit price.
    pub fn price_summary(&self) -> PriceSummary {
        let options = self.export_options();
        self.records
            .iter()
            .enumerate()
            .fold(PriceSummary::default(), |mut summary, (index, record)| {
                match normalize_number(resolve_unit_price(&options, record, index).1) {
                    CellValue::Number(_) => summary.numeric += 1,
                    CellValue::Empty => summary.empty += 1,
                    CellValue::Text(_) | CellValue::Date(_) => summary.text += 1,
                }
                summary
            })
    }

    pub const fn next_panel(&mut self) {
        self.active_panel = self.active_panel.next();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Search
    // ─────────────────────────────────────────────────────────────────────

    pub fn enter_search_mode(&mut self) {
        self.status_message = None;
        self.input_mode = InputMode::Search;
    }

    pub fn exit_search_mode(&mut self) {
        self.input_mode = InputMode::Normal;
        self.search_query.clear();
        self.refresh_list();
    }

    pub fn search_push(&mut self, c: char) {
        self.search_query.push(c);
        self.refresh_list();
    }

    pub fn search_pop(&mut self) {
        self.search_query.pop();
        self.refresh_list();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Editing
    // ─────────────────────────────────────────────────────────────────────

    fn current_value(&self, target: EditTarget) -> Option<&CellValue> {
        match target {
            EditTarget::DefaultPrice => Some(&self.prices.default_unit_price),
            EditTarget::Tva => Some(&self.prices.tva),
            EditTarget::SelectedPrice => match self.prices.mode {
                PriceMode::PerCable => self
                    .selected_group()
                    .and_then(|group| self.prices.group_price(&group.key)),
                PriceMode::PerLine => self
                    .selected_line()
                    .and_then(|(index, _)| self.prices.line_price(index)),
            },
        }
    }

    /// Starts editing `target`, pre-filled with its current value.
    pub fn begin_edit(&mut self, target: EditTarget) {
        let has_selection = match self.prices.mode {
            PriceMode::PerCable => self.selected_group().is_some(),
            PriceMode::PerLine => self.selected_line().is_some(),
        };
        if target == EditTarget::SelectedPrice && !has_selection {
            self.set_status("Nothing selected");
            return;
        }
        self.edit_buffer = self
            .current_value(target)
            .map(ToString::to_string)
            .unwrap_or_default();
        self.status_message = None;
        self.input_mode = InputMode::Edit(target);
    }

    pub fn edit_push(&mut self, c: char) {
        self.edit_buffer.push(c);
    }

    pub fn edit_pop(&mut self) {
        self.edit_buffer.pop();
    }

    pub fn cancel_edit(&mut self) {
        self.edit_buffer.clear();
        self.input_mode = InputMode::Normal;
    }

    /// Stores the typed value as entered; normalization happens on export.
    pub fn commit_edit(&mut self) {
        let InputMode::Edit(target) = self.input_mode else {
            return;
        };
        let value = CellValue::text(self.edit_buffer.trim());
        match target {
            EditTarget::DefaultPrice => self.prices.default_unit_price = value,
            EditTarget::Tva => self.prices.tva = value,
            EditTarget::SelectedPrice => {
                if let Some(key) = self.selected_group().map(|group| group.key.clone()) {
                    self.prices.set_group_price(&key, value);
                } else if let Some(index) = self.selected_line().map(|(index, _)| index) {
                    self.prices.set_line_price(index, value);
                }
            }
        }
        self.cancel_edit();
    }

    // ─────────────────────────────────────────────────────────────────────
    // Status and persistence
    // ─────────────────────────────────────────────────────────────────────

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status_message = Some((message.into(), Instant::now()));
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_ref().and_then(|(msg, created)| {
            if created.elapsed() < STATUS_MESSAGE_DURATION {
                Some(msg.as_str())
            } else {
                None
            }
        })
    }

    pub fn save_price_book(&mut self) {
        match self.prices.save(&self.price_book_path) {
            Ok(()) => {
                let message = format!("Prices saved to {}", self.price_book_path.display());
                self.set_status(message);
            }
            Err(e) => self.set_status(format!("Error: {e}")),
        }
    }

    pub fn export_done(&mut self, result: ConversionResult) {
        self.set_status(format!(
            "Exported {} rows to {}",
            result.row_count,
            result.output_path.display()
        ));
        self.output.clone_from(&result.output_path);
        self.last_export = Some(result);
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    pub fn into_last_export(self) -> Option<ConversionResult> {
        self.last_export
    }
}
