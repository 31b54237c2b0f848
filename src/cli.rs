//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Options that also live in the config file are
//! optional here so that only explicit flags override it.

use crate::models::SingletonPolicy;
use crate::report::OutputFormat;
use crate::table::Delimiter;
use clap::Parser;
use std::path::PathBuf;

/// divstats - grouped replicate statistics for simulation output
///
/// Reads one or more header-described tables (one replicate per row),
/// groups rows by parameter columns and reports the mean, sample variance
/// and coefficient of variation of a diversity column per group.
///
/// Examples:
///   divstats sweep.txt
///   divstats output/ --format csv -o summary.csv
///   divstats moran.txt --group-by ''
///   cat sweep.txt | divstats - --count
///   divstats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Input tables or directories of tables; `-` reads standard input
    ///
    /// With no inputs, standard input is read.
    #[arg(value_name = "INPUT")]
    pub inputs: Vec<PathBuf>,

    /// Grouping columns (comma-separated)
    ///
    /// An empty string summarizes all records as one group.
    /// Default: N,p,recrate
    #[arg(short, long, value_name = "COLUMNS")]
    pub group_by: Option<String>,

    /// Numeric column to summarize. Default: div
    #[arg(short, long, value_name = "COLUMN")]
    pub target: Option<String>,

    /// Input field separator
    #[arg(short, long, value_name = "DELIM")]
    pub delimiter: Option<Delimiter>,

    /// Output format
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Output file path (default: standard output)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Policy for groups with fewer than two replicates
    #[arg(long, value_name = "POLICY")]
    pub singleton: Option<SingletonPolicy>,

    /// Suffix of the statistic columns. Default: pi (mean_pi, var_pi, cv_pi)
    #[arg(long, value_name = "SUFFIX")]
    pub stat_suffix: Option<String>,

    /// Include the group size as an `n` column
    #[arg(long)]
    pub count: bool,

    /// Number of decimal places for statistics
    #[arg(long, value_name = "DIGITS")]
    pub precision: Option<usize>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .divstats.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "DIVSTATS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (errors only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default .divstats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Grouping columns from `--group-by`, if given.
    pub fn group_by_columns(&self) -> Option<Vec<String>> {
        self.group_by.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect()
        })
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref target) = self.target {
            if target.trim().is_empty() {
                return Err("Target column name cannot be empty".to_string());
            }
        }

        if let Some(ref suffix) = self.stat_suffix {
            if suffix.trim().is_empty() {
                return Err("Statistic suffix cannot be empty".to_string());
            }
        }

        if let Some(precision) = self.precision {
            if precision > 17 {
                return Err("Precision must be between 0 and 17".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
