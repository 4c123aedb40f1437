//! Interactive price review using ratatui.
//!
//! Shows the parsed cable schedule, lets the user set unit prices per cable
//! group or per line, then exports the Multidoc workbook.

mod app;
mod draw;
mod state;

pub use app::App;
pub use state::{EditTarget, InputMode};

use std::io::{self, stdout};
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::prelude::*;
use tracing::{info, warn};

use crate::converter::Converter;
use crate::types::ConversionResult;
use draw::draw_ui;

/// Runs the review UI until the user quits. Returns the last export, if any.
pub fn run(converter: &Converter, mut app: App) -> anyhow::Result<Option<ConversionResult>> {
    app.load(converter.load_records()?);

    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
    let result = run_app(&mut terminal, converter, &mut app);
    let _ = disable_raw_mode();
    let _ = stdout().execute(LeaveAlternateScreen);
    result?;
    Ok(app.into_last_export())
}

fn export(converter: &Converter, app: &mut App) {
    let output = app.output().to_path_buf();
    match converter.convert(Some(&output), &app.export_options()) {
        Ok(result) => app.export_done(result),
        Err(e) => {
            warn!(error = %format!("{e:#}"), "export failed");
            app.set_status(format!("Error: {e:#}"));
        }
    }
}

fn reload(converter: &Converter, app: &mut App) {
    match converter.load_records() {
        Ok(records) => {
            let count = records.len();
            app.load(records);
            info!(count, "input reloaded");
            app.set_status(format!("Reloaded {count} lines"));
        }
        Err(e) => app.set_status(format!("Error: {e:#}")),
    }
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    converter: &Converter,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|frame| draw_ui(frame, app))?;
        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                KeyCode::Up | KeyCode::Char('k') => app.select_previous(),
                KeyCode::Down | KeyCode::Char('j') => app.select_next(),
                KeyCode::Tab | KeyCode::BackTab => app.next_panel(),
                KeyCode::Char('m') => app.toggle_mode(),
                KeyCode::Enter | KeyCode::Char('e') => app.begin_edit(EditTarget::SelectedPrice),
                KeyCode::Char('d') => app.begin_edit(EditTarget::DefaultPrice),
                KeyCode::Char('t') => app.begin_edit(EditTarget::Tva),
                KeyCode::Char('a') => app.apply_default(),
                KeyCode::Char('/') => app.enter_search_mode(),
                KeyCode::Char('x') => {
                    app.set_status("Exporting...");
                    terminal.draw(|frame| draw_ui(frame, app))?;
                    export(converter, app);
                }
                KeyCode::Char('s') => app.save_price_book(),
                KeyCode::Char('r') => reload(converter, app),
                _ => {}
            },
            InputMode::Search => match key.code {
                KeyCode::Esc => app.exit_search_mode(),
                KeyCode::Enter => app.input_mode = InputMode::Normal,
                KeyCode::Backspace => app.search_pop(),
                KeyCode::Char(c) => app.search_push(c),
                KeyCode::Up => app.select_previous(),
                KeyCode::Down => app.select_next(),
                _ => {}
            },
            InputMode::Edit(_) => match key.code {
                KeyCode::Esc => app.cancel_edit(),
                KeyCode::Enter => app.commit_edit(),
                KeyCode::Backspace => app.edit_pop(),
                KeyCode::Char(c) => app.edit_push(c),
                _ => {}
            },
        }
    }
}
