//! divstats - grouped replicate statistics for simulation output
//!
//! Loads the per-replicate tables written after a simulation parameter
//! sweep and reports the mean, sample variance and coefficient of
//! variation of a diversity column for each parameter combination.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Any error (bad arguments, config, missing columns, bad values)

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod report;
mod scanner;
mod table;

use analysis::{AggregateSpec, Aggregator};
use anyhow::{Context, Result};
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use report::RenderOptions;
use scanner::{InputScanner, ScanConfig};
use std::io::Write;
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("divstats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Summary failed: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .divstats.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "{} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("Created {} with default settings.", DEFAULT_CONFIG_FILE);
    Ok(())
}

/// Initialize logging on stderr; stdout carries the rendered table.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Load, aggregate and render.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    debug!("Effective config: {:?}", config);

    let options = RenderOptions::from(&config.output);
    options.check_columns(&config.aggregate.group_by)?;

    // Step 1: Find the input tables
    let scanner = InputScanner::new(ScanConfig::from(&config.input));
    let sources = scanner.discover(&args.inputs)?;
    info!("Reading {} input table(s)", sources.len());

    // Step 2: Load every table before aggregating
    let mut tables = Vec::with_capacity(sources.len());
    for source in &sources {
        let table = table::read_source(source, config.input.delimiter)?;
        debug!("Loaded {} records from {}", table.len(), table.source);
        tables.push(table);
    }

    // Step 3: Group and summarize
    let aggregator = Aggregator::new(AggregateSpec::from(&config.aggregate))?;
    let summary = aggregator.aggregate(&tables)?;

    if summary.groups.is_empty() {
        warn!("No records found; the summary is empty");
    }

    // Step 4: Render and write
    let rendered = report::render(&summary, &options)?;

    match args.output {
        Some(ref path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("Failed to write summary to {}", path.display()))?;
            info!("Summary saved to: {}", path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(rendered.as_bytes())
                .context("Failed to write summary to standard output")?;
            stdout.flush()?;
        }
    }

    info!(
        "Summarized {} records into {} groups in {:.2}s",
        summary.records,
        summary.groups.len(),
        start_time.elapsed().as_secs_f64()
    );

    Ok(())
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", DEFAULT_CONFIG_FILE);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {:#}", e);
            Ok(Config::default())
        }
    }
}
