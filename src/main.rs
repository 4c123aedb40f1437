//! caneflow: converts Caneco cable schedules into Multidoc quote workbooks.
//!
//! Default: TUI price review | --preview: print the parsed lines |
//! --convert: write the Multidoc workbook without the TUI

mod converter;
mod error;
mod excel;
mod logging;
mod mapper;
mod normalize;
mod parser;
mod prices;
mod tui;
mod types;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use tracing::warn;

use crate::converter::Converter;
use crate::logging::{init_logging, LogConfig, LogFormat, LogTarget};
use crate::prices::{default_price_book_path, PriceBook};
use crate::types::{CableGroup, CellValue, ConversionResult, PreviewItem};

// ─────────────────────────────────────────────────────────────────────────────
// CLI
// ─────────────────────────────────────────────────────────────────────────────

/// CLI arguments for caneflow.
#[derive(Parser)]
#[command(name = "caneflow")]
#[command(about = "Convert Caneco cable schedules into Multidoc quote workbooks")]
#[command(version)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// Caneco export (.xlsx, .xls, .ods or .csv).
    input: PathBuf,

    /// Output workbook [default: "<input> - MULTIDOC.xlsx"].
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Worksheet to read [default: first sheet].
    #[arg(long)]
    sheet: Option<String>,

    /// Default unit price.
    #[arg(long)]
    price: Option<String>,

    /// Tax rate.
    #[arg(long)]
    tva: Option<String>,

    /// Unit written on every line.
    #[arg(long)]
    unit: Option<String>,

    /// Omit the Multidoc header row.
    #[arg(long)]
    no_headers: bool,

    /// Price book [default: "<input>.prices.yaml"].
    #[arg(long)]
    prices: Option<PathBuf>,

    /// List the worksheets of the input and exit.
    #[arg(long)]
    list_sheets: bool,

    /// Print the parsed lines and cable groups without starting the TUI.
    #[arg(long)]
    preview: bool,

    /// Convert without starting the TUI.
    #[arg(long)]
    convert: bool,

    /// Print --preview or --convert output as JSON.
    #[arg(long)]
    json: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log output format.
    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Write logs to this file instead of stderr.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

impl Cli {
    const fn headless(&self) -> bool {
        self.preview || self.convert || self.list_sheets
    }

    fn log_config(&self) -> LogConfig {
        let target = match (&self.log_file, self.headless()) {
            (Some(path), _) => LogTarget::File(path.clone()),
            (None, true) => LogTarget::Stderr,
            (None, false) => LogTarget::Silent,
        };
        LogConfig::from_verbosity(self.verbose)
            .with_format(self.log_format)
            .with_target(target)
    }

    fn price_book_path(&self) -> PathBuf {
        self.prices
            .clone()
            .unwrap_or_else(|| default_price_book_path(&self.input))
    }

    /// Price book from disk, with command-line overrides applied.
    fn load_price_book(&self) -> PriceBook {
        let path = self.price_book_path();
        let mut book = if path.exists() {
            PriceBook::load(&path).unwrap_or_else(|e| {
                warn!(error = %e, "ignoring price book");
                PriceBook::default()
            })
        } else {
            PriceBook::default()
        };
        if let Some(price) = &self.price {
            book.default_unit_price = CellValue::text(price.as_str());
        }
        if let Some(tva) = &self.tva {
            book.tva = CellValue::text(tva.as_str());
        }
        if let Some(unit) = &self.unit {
            book.unit.clone_from(unit);
        }
        if self.no_headers {
            book.include_headers = false;
        }
        book
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(&cli.log_config()) {
        eprintln!("{} Failed to open log file: {e}", "ERROR:".red().bold());
        return ExitCode::FAILURE;
    }

    if cli.list_sheets {
        return run_list_sheets(&cli.input);
    }

    let converter = match Converter::new(cli.input.clone(), cli.sheet.clone()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {e}", "ERROR:".red().bold());
            return ExitCode::FAILURE;
        }
    };
    let book = cli.load_price_book();

    let result = if cli.preview {
        run_preview_mode(&converter, &book, cli.json)
    } else if cli.convert {
        run_convert_mode(&converter, book, cli.output.as_deref(), cli.json)
    } else {
        run_tui_mode(&converter, book, &cli)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", "ERROR:".red().bold());
            ExitCode::FAILURE
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Run Modes
// ─────────────────────────────────────────────────────────────────────────────

fn run_list_sheets(input: &Path) -> ExitCode {
    match excel::sheet_names(input) {
        Ok(names) => {
            for name in names {
                println!("{name}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{} {e}", "ERROR:".red().bold());
            ExitCode::FAILURE
        }
    }
}

/// Prints the parsed lines and cable groups.
fn run_preview_mode(converter: &Converter, book: &PriceBook, json: bool) -> anyhow::Result<()> {
    let (preview, groups) = converter.preview_with_groups()?;

    if json {
        let output = serde_json::json!({
            "input": converter.input(),
            "items": &preview,
            "groups": &groups,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!();
    println!("{}", "═".repeat(70).cyan());
    println!(
        "{}",
        format!("  caneflow: {}", converter.input().display())
            .cyan()
            .bold()
    );
    println!("{}", "═".repeat(70).cyan());
    print_preview(&preview);
    print_groups(&groups, book);
    println!();
    Ok(())
}

fn print_preview(preview: &[PreviewItem]) {
    println!();
    for item in preview {
        println!(
            "  {} {} {} {}",
            format!("{:>4}", item.line_number).dimmed(),
            format!("{:<8}", item.repere).white().bold(),
            item.quantity.to_string().green(),
            item.type_cable.yellow()
        );
        println!("       {}", item.title.dimmed());
    }
}

fn print_groups(groups: &[CableGroup], book: &PriceBook) {
    println!();
    println!("  {}", "Cable groups".cyan().bold());
    for group in groups {
        let price = book
            .group_price(&group.key)
            .unwrap_or(&book.default_unit_price)
            .to_string();
        println!(
            "  {} {} {}",
            group.label().white(),
            format!("×{}", group.count).dimmed(),
            price.green()
        );
    }
}

/// Writes the Multidoc workbook and prints a summary.
fn run_convert_mode(
    converter: &Converter,
    mut book: PriceBook,
    output: Option<&Path>,
    json: bool,
) -> anyhow::Result<()> {
    let (preview, groups) = converter.preview_with_groups()?;
    book.sync_with_preview(&preview, &groups);
    let result = converter.convert(output, &book.to_export_options())?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_conversion(&result);
    }
    Ok(())
}

fn print_conversion(result: &ConversionResult) {
    println!(
        "  {} {} rows written to {}",
        "SUCCESS:".green().bold(),
        result.row_count.to_string().green(),
        result.output_path.display().to_string().white().bold()
    );
}

/// Runs the interactive price review.
fn run_tui_mode(converter: &Converter, book: PriceBook, cli: &Cli) -> anyhow::Result<()> {
    let output = cli
        .output
        .clone()
        .unwrap_or_else(|| converter.default_output());
    let app = tui::App::new(
        converter.input().to_path_buf(),
        excel::normalize_output_path(&output),
        cli.price_book_path(),
        book,
    );
    if let Some(result) = tui::run(converter, app)? {
        print_conversion(&result);
    }
    Ok(())
}
