//! TUI state types - enums for input mode, edit target, and active panel.

use ratatui::style::Color;

use crate::types::CellValue;

// ─────────────────────────────────────────────────────────────────────────────
// Input Mode
// ─────────────────────────────────────────────────────────────────────────────

/// The current input mode for the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Normal navigation mode.
    #[default]
    Normal,
    /// Search mode - typing filters the list.
    Search,
    /// Typing a new value for a price field.
    Edit(EditTarget),
}

/// The value being edited in [`InputMode::Edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditTarget {
    /// Price of the selected group or line.
    SelectedPrice,
    /// Default unit price.
    DefaultPrice,
    /// Tax rate.
    Tva,
}

impl EditTarget {
    /// Prompt shown in the footer while editing.
    pub const fn prompt(self) -> &'static str {
        match self {
            Self::SelectedPrice => "Unit price: ",
            Self::DefaultPrice => "Default unit price: ",
            Self::Tva => "TVA: ",
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Price Colors
// ─────────────────────────────────────────────────────────────────────────────

/// Color for a normalized price: numbers are fine, text is suspicious, empty
/// is missing.
pub const fn price_color(value: &CellValue) -> Color {
    match value {
        CellValue::Number(_) => Color::Green,
        CellValue::Text(_) | CellValue::Date(_) => Color::Yellow,
        CellValue::Empty => Color::Red,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Active Panel
// ─────────────────────────────────────────────────────────────────────────────

/// The currently active panel in the TUI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActivePanel {
    /// The group or line list.
    #[default]
    List,
    /// The detail pane for the selection.
    Details,
}

impl ActivePanel {
    /// Cycle to the other panel.
    pub const fn next(self) -> Self {
        match self {
            Self::List => Self::Details,
            Self::Details => Self::List,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn active_panel_next_cycles() {
        assert_eq!(ActivePanel::List.next(), ActivePanel::Details);
        assert_eq!(ActivePanel::Details.next(), ActivePanel::List);
    }

    #[test]
    fn active_panel_default() {
        assert_eq!(ActivePanel::default(), ActivePanel::List);
    }

    #[test]
    fn input_mode_default() {
        assert_eq!(InputMode::default(), InputMode::Normal);
    }

    #[test]
    fn edit_prompts() {
        assert_eq!(EditTarget::Tva.prompt(), "TVA: ");
        assert_eq!(EditTarget::DefaultPrice.prompt(), "Default unit price: ");
    }

    #[test]
    fn price_colors() {
        assert_eq!(price_color(&CellValue::Number(10.0)), Color::Green);
        assert_eq!(price_color(&CellValue::from("sur devis")), Color::Yellow);
        assert_eq!(price_color(&CellValue::Empty), Color::Red);
    }
}
