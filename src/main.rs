//! sheetconv - Typed spreadsheet tables to configuration files

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tabled::settings::Style;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};
use tracing_subscriber::EnvFilter;

use sheetconv::config::Config;
use sheetconv::runner::{run, RunReport};
use sheetconv::session::RunStatus;

/// Convert typed spreadsheet tables (Excel, CSV) into configuration files
#[derive(Parser, Debug)]
#[command(name = "sheetconv")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON configuration file
    config: PathBuf,

    /// Input file or directory, replacing IncludeFilesAndPath (repeatable)
    #[arg(short, long = "input")]
    inputs: Vec<PathBuf>,

    /// Skip type and validator checks on data cells
    #[arg(long)]
    no_type_check: bool,

    /// Print a table of converted sheets
    #[arg(long)]
    summary: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "sheetconv=debug"
    } else {
        "sheetconv=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    match convert(cli).await {
        Ok(RunStatus::Clean) => ExitCode::SUCCESS,
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

async fn convert(cli: Cli) -> Result<RunStatus> {
    let mut config = Config::load(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    if !cli.inputs.is_empty() {
        config = config.with_inputs(cli.inputs);
    }
    if cli.no_type_check {
        config = config.with_type_check(false);
    }

    let report = run(&config).await?;

    if cli.summary {
        print_summary(&report);
    }
    print_status(&report)?;
    Ok(report.status)
}

fn print_summary(report: &RunReport) {
    if report.tables.is_empty() {
        println!("No table converted.");
        return;
    }
    let mut table = tabled::Table::new(&report.tables);
    table.with(Style::modern());
    println!("{}", table);
}

fn print_status(report: &RunReport) -> Result<()> {
    let mut stdout = StandardStream::stdout(ColorChoice::Auto);
    let (color, label) = match report.status {
        RunStatus::Clean => (Color::Green, "[SUCCESS]"),
        RunStatus::CompletedWithErrors(_) => (Color::Yellow, "[WARNING]"),
    };
    stdout.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    write!(stdout, "{}", label)?;
    stdout.reset()?;
    writeln!(
        stdout,
        " {} tables, {} files written, {} rows dropped",
        report.tables.len(),
        report.artifacts.len(),
        report.errors.len()
    )?;
    Ok(())
}
