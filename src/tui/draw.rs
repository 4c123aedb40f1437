//! TUI drawing functions - renders all UI components.

use std::fmt::Write as _;

use super::app::App;
use super::state::{price_color, ActivePanel, InputMode};
use crate::normalize::normalize_number;
use crate::prices::PriceMode;
use crate::types::{CableGroup, CellValue, PreviewItem};
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

/// Repères listed in a group's detail before eliding the rest.
const MAX_GROUP_REPERES: usize = 12;

pub fn draw_ui(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(3),
        ])
        .split(area);

    draw_title(frame, main_chunks[0]);
    draw_summary(frame, main_chunks[1], app);

    let content_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(main_chunks[2]);

    let right_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(8), Constraint::Length(4)])
        .split(content_chunks[1]);

    draw_list(frame, content_chunks[0], app);
    draw_details(frame, right_chunks[0], app);
    draw_stats(frame, right_chunks[1], app);
    draw_footer(frame, main_chunks[3], app);
}

fn border_style(active: bool) -> Style {
    if active {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

fn draw_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new("CaneFlow: Caneco → Multidoc")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn draw_summary(frame: &mut Frame, area: Rect, app: &App) {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(Color::DarkGray));
    let line1 = Line::from(vec![
        label("Input: "),
        Span::raw(app.input.display().to_string()),
        label("  →  "),
        Span::raw(app.output().display().to_string()),
    ]);
    let line2 = Line::from(vec![
        label("Lines: "),
        Span::raw(app.preview.len().to_string()),
        label(" │ Groups: "),
        Span::raw(app.groups.len().to_string()),
        label(" │ Mode: "),
        Span::styled(app.mode().label(), Style::default().fg(Color::Cyan)),
        label(" │ Default: "),
        Span::raw(app.prices.default_unit_price.to_string()),
        label(" │ TVA: "),
        Span::raw(app.prices.tva.to_string()),
        label(" │ Unit: "),
        Span::raw(app.prices.unit.clone()),
    ]);
    let widget = Paragraph::new(vec![line1, line2]).block(
        Block::default()
            .title(" Summary ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );
    frame.render_widget(widget, area);
}

fn draw_list(frame: &mut Frame, area: Rect, app: &mut App) {
    let title = match app.mode() {
        PriceMode::PerCable => format!(" Cable groups ({}) ", app.filtered_indices.len()),
        PriceMode::PerLine => format!(" Lines ({}) ", app.filtered_indices.len()),
    };
    let items: Vec<ListItem> = app
        .filtered_indices
        .iter()
        .filter_map(|&i| match app.mode() {
            PriceMode::PerCable => app.groups.get(i).map(|group| {
                let price = app.prices.group_price(&group.key);
                format_group_item(group, price.unwrap_or(&CellValue::Empty))
            }),
            PriceMode::PerLine => app.preview.get(i).map(|item| {
                let price = app.prices.line_price(i);
                format_line_item(item, price.unwrap_or(&CellValue::Empty))
            }),
        })
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(border_style(app.active_panel == ActivePanel::List)),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn price_span(price: &CellValue) -> Span<'static> {
    let shown = if price.is_empty() {
        "—".to_string()
    } else {
        price.to_string()
    };
    Span::styled(shown, Style::default().fg(price_color(&normalize_number(price))))
}

fn format_group_item(group: &CableGroup, price: &CellValue) -> ListItem<'static> {
    let line = Line::from(vec![
        Span::raw(" "),
        Span::raw(group.label().to_string()),
        Span::styled(format!(" ×{}", group.count), Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        price_span(price),
    ]);
    ListItem::new(line)
}

fn format_line_item(item: &PreviewItem, price: &CellValue) -> ListItem<'static> {
    let line = Line::from(vec![
        Span::styled(
            format!("{:>4} ", item.line_number),
            Style::default().fg(Color::DarkGray),
        ),
        Span::raw(format!("{:<8} ", item.repere)),
        Span::raw(item.type_cable.clone()),
        Span::styled(format!("  {}", item.quantity), Style::default().fg(Color::DarkGray)),
        Span::raw("  "),
        price_span(price),
    ]);
    ListItem::new(line)
}

fn draw_details(frame: &mut Frame, area: Rect, app: &App) {
    let content = match app.mode() {
        PriceMode::PerCable => app
            .selected_group()
            .map(|group| format_group_detail(app, group)),
        PriceMode::PerLine => app
            .selected_line()
            .map(|(index, item)| format_line_detail(app, index, item)),
    }
    .unwrap_or_else(|| "Nothing selected.\n\nUse ↑/↓ or j/k to navigate.".to_string());
    let detail = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .title(" Details ")
            .borders(Borders::ALL)
            .border_style(border_style(app.active_panel == ActivePanel::Details)),
    );
    frame.render_widget(detail, area);
}

fn format_group_detail(app: &App, group: &CableGroup) -> String {
    let price = app
        .prices
        .group_price(&group.key)
        .map_or_else(String::new, ToString::to_string);
    let mut s = format!(
        "Group: {}\n\nLines: {}\nUnit price: {price}\n\nRepères:",
        group.label(),
        group.count
    );
    let mut reperes = app.lines_in_group(&group.key).map(|item| item.repere.as_str());
    for repere in reperes.by_ref().take(MAX_GROUP_REPERES) {
        let _ = write!(s, "\n  {repere}");
    }
    let rest = reperes.count();
    if rest > 0 {
        let _ = write!(s, "\n  … and {rest} more");
    }
    s
}

fn format_line_detail(app: &App, index: usize, item: &PreviewItem) -> String {
    let mut s = format!(
        "Line {}\n\nTitle:\n  {}\n\nQuantity: {}\nRepère: {}\nGroup: {}",
        item.line_number, item.title, item.quantity, item.repere, item.type_cable
    );
    if let Some(record) = app.records().get(index) {
        if !record.amont.is_empty() {
            let _ = write!(s, "\nFrom: {}", record.amont);
        }
    }
    if let Some((tier, price)) = app.resolved_price(index) {
        let _ = write!(
            s,
            "\n\nUnit price: {price} ({})\nExported as: {}",
            tier.label(),
            normalize_number(&price)
        );
    }
    s
}

fn draw_stats(frame: &mut Frame, area: Rect, app: &App) {
    let summary = app.price_summary();
    let line1 = Line::from(vec![
        Span::raw("Prices: "),
        Span::styled(summary.numeric.to_string(), Style::default().fg(Color::Green)),
        Span::raw(" numeric, "),
        Span::styled(summary.text.to_string(), Style::default().fg(Color::Yellow)),
        Span::raw(" text, "),
        Span::styled(summary.empty.to_string(), Style::default().fg(Color::Red)),
        Span::raw(" empty"),
    ]);
    let line2 = app.last_export.as_ref().map_or_else(
        || Line::styled("Not exported yet", Style::default().fg(Color::DarkGray)),
        |result| {
            Line::styled(
                format!("Last export: {} rows", result.row_count),
                Style::default().fg(Color::Green),
            )
        },
    );
    let widget = Paragraph::new(vec![line1, line2])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(" Stats ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );
    frame.render_widget(widget, area);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(status) = app
        .status_message()
        .filter(|_| app.input_mode == InputMode::Normal)
    {
        let footer = Paragraph::new(status)
            .style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, area);
        return;
    }
    let (content, style) = match app.input_mode {
        InputMode::Search => (
            Line::from(vec![
                Span::styled("Search: ", Style::default().fg(Color::Cyan)),
                Span::raw(&app.search_query),
                Span::styled("█", Style::default().fg(Color::Cyan)),
                Span::raw(" │ Enter:confirm │ Esc:cancel"),
            ]),
            Style::default().fg(Color::Cyan),
        ),
        InputMode::Edit(target) => (
            Line::from(vec![
                Span::styled(target.prompt(), Style::default().fg(Color::Yellow)),
                Span::raw(&app.edit_buffer),
                Span::styled("█", Style::default().fg(Color::Yellow)),
                Span::raw(" │ Enter:save │ Esc:cancel"),
            ]),
            Style::default().fg(Color::Yellow),
        ),
        InputMode::Normal => (
            Line::from(
                "↑/↓:nav │ Tab:panel │ m:mode │ Enter:price │ d:default │ t:tva │ a:apply │ /:search │ x:export │ s:save │ r:reload │ q:quit",
            ),
            Style::default().fg(Color::DarkGray),
        ),
    };
    let footer = Paragraph::new(content)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}
