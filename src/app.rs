//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - builds the FRED client from the environment
//! - dispatches client operations and report runs
//! - prints formatted results

use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::{CleanArgs, Command, FetchArgs, ReportArgs, SearchArgs};
use crate::data::{FetchRequest, FredClient, clean};
use crate::domain::{Catalog, DataDirs, Destination, ReportConfig, SeriesId};
use crate::error::AppError;
use crate::io::{persist, read_table, table_path};
use crate::report::{
    SummaryView, format_report_summary, format_search_hits, format_series_info, format_table_head,
};

pub mod pipeline;

/// Entry point for the `ftrend` binary.
pub fn run() -> Result<(), AppError> {
    init_tracing();

    // `ftrend` and `ftrend demographic` should run a report without further flags.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::Search(args) => handle_search(args),
        Command::Fetch(args) => handle_fetch(args),
        Command::Clean(args) => handle_clean(args),
        Command::Info(args) => {
            let client = FredClient::from_env()?;
            let info = client.metadata(&SeriesId::new(args.series_id))?;
            print!("{}", format_series_info(&info));
            Ok(())
        }
        Command::Json(args) => {
            let client = FredClient::from_env()?;
            let body = client.fetch_raw_json(&SeriesId::new(args.series_id), args.start, args.end)?;
            let pretty = serde_json::to_string_pretty(&body)
                .map_err(|e| AppError::parse(format!("Failed to format JSON: {e}")))?;
            println!("{pretty}");
            Ok(())
        }
        Command::Report(args) => handle_report(args),
    }
}

/// Logs go to stderr so stdout stays usable for piping results.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_search(args: SearchArgs) -> Result<(), AppError> {
    let client = FredClient::from_env()?;
    let hits = client.search(&args.keyword, args.category.as_deref(), args.limit)?;
    print!("{}", format_search_hits(&hits));
    Ok(())
}

fn handle_fetch(args: FetchArgs) -> Result<(), AppError> {
    let client = FredClient::from_env()?;
    let request = FetchRequest::new(args.series_id.as_str())
        .window(args.start, args.end)
        .frequency(args.frequency)
        .units(args.units);
    let table = client.fetch(&request)?;

    println!("Retrieved {} observations for {}", table.len(), request.series_id);
    print!("{}", format_table_head(&table, args.head));

    let dirs = DataDirs::default();
    if !args.no_save {
        persist(&table, request.series_id.as_str(), Destination::Raw, args.format, &dirs)?;
    }

    if let Some(method) = &args.clean {
        let cleaned = clean(&table, method)?;
        println!("After cleaning ({method}): {} observations", cleaned.len());
        if !args.no_save {
            persist(&cleaned, request.series_id.as_str(), Destination::Clean, args.format, &dirs)?;
        }
    }

    Ok(())
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let dirs = DataDirs::default();
    let raw_path = table_path(&dirs, &args.key, Destination::Raw, args.format);
    let table = read_table(&raw_path)?;

    let cleaned = clean(&table, &args.method)?;
    let path = persist(&cleaned, &args.key, Destination::Clean, args.format, &dirs)?;
    println!(
        "Cleaned {} -> {} ({} of {} rows kept)",
        raw_path.display(),
        path.display(),
        cleaned.len(),
        table.len()
    );
    Ok(())
}

fn handle_report(args: ReportArgs) -> Result<(), AppError> {
    let config = report_config_from_args(&args);
    let catalog = match &config.catalog_path {
        Some(path) => Catalog::load(path)?,
        None => Catalog::builtin(config.kind)?,
    };
    let start = config.start_date()?;
    let client = FredClient::from_env()?;

    info!(
        report = ?config.kind,
        series = catalog.entries.len(),
        %start,
        end = %config.end_date,
        "starting report"
    );
    let out = pipeline::run_report(&client, &catalog, &config)?;

    let profile = config.kind.profile();
    let view = SummaryView {
        profile: &profile,
        years_back: config.years_back,
        series_analyzed: out.series_analyzed,
        records: &out.records,
        insights: &out.insights,
        raw_dir: &config.data_dirs.raw,
        clean_dir: &config.data_dirs.clean,
        stats_path: out.stats_path.as_deref(),
        chart_path: out.chart_path.as_deref(),
    };
    println!("{}", format_report_summary(&view));
    Ok(())
}

pub fn report_config_from_args(args: &ReportArgs) -> ReportConfig {
    let mut config = ReportConfig::new(args.kind, Local::now().date_naive());
    config.years_back = args.years;
    config.format = args.format;
    config.catalog_path = args.catalog.clone();
    if let Some(dir) = &args.report_dir {
        config.report_dir = dir.clone();
    }
    config
}

/// Rewrite argv so the report entry points need no subcommand.
///
/// Rules:
/// - `ftrend`                        -> `ftrend report unemployment`
/// - `ftrend unemployment ...`       -> `ftrend report unemployment ...`
/// - `ftrend demographic ...`        -> `ftrend report demographic ...`
/// - `ftrend --years 5`              -> `ftrend report --years 5`
/// - `ftrend --help/--version/-h`    -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("report".to_string());
        argv.push("unemployment".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    if matches!(arg1.as_str(), "unemployment" | "demographic") {
        argv.insert(1, "report".to_string());
        return argv;
    }

    // Bare flags are report flags.
    if arg1.starts_with('-') {
        argv.insert(1, "report".to_string());
        return argv;
    }

    argv
}
