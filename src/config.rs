//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.divstats.toml` files.

use crate::models::SingletonPolicy;
use crate::report::OutputFormat;
use crate::table::Delimiter;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".divstats.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Input settings.
    #[serde(default)]
    pub input: InputConfig,

    /// Grouping settings.
    #[serde(default)]
    pub aggregate: AggregateConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// How input tables are found and read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputConfig {
    /// Field separator.
    #[serde(default)]
    pub delimiter: Delimiter,

    /// Extensions picked up when an input is a directory.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            delimiter: Delimiter::Auto,
            extensions: default_extensions(),
        }
    }
}

fn default_extensions() -> Vec<String> {
    vec!["txt", "tsv", "csv", "dat"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Which columns are grouped and summarized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateConfig {
    /// Key columns. An empty list summarizes all records as one group.
    #[serde(default = "default_group_by")]
    pub group_by: Vec<String>,

    /// Numeric column to summarize.
    #[serde(default = "default_target")]
    pub target: String,

    /// Handling of groups with a single replicate.
    #[serde(default)]
    pub singleton: SingletonPolicy,
}

impl Default for AggregateConfig {
    fn default() -> Self {
        Self {
            group_by: default_group_by(),
            target: default_target(),
            singleton: SingletonPolicy::Nan,
        }
    }
}

fn default_group_by() -> Vec<String> {
    vec!["N", "p", "recrate"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_target() -> String {
    "div".to_string()
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Output format.
    #[serde(default)]
    pub format: OutputFormat,

    /// Suffix of the statistic columns (`mean_<suffix>` and so on).
    #[serde(default = "default_stat_suffix")]
    pub stat_suffix: String,

    /// Add an `n` column with the group size.
    #[serde(default)]
    pub include_count: bool,

    /// Fixed number of decimal places for statistics.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<usize>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            stat_suffix: default_stat_suffix(),
            include_count: false,
            precision: None,
        }
    }
}

fn default_stat_suffix() -> String {
    "pi".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only arguments that were given on the command line override the
    /// config file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(delimiter) = args.delimiter {
            self.input.delimiter = delimiter;
        }

        if let Some(group_by) = args.group_by_columns() {
            self.aggregate.group_by = group_by;
        }
        if let Some(ref target) = args.target {
            self.aggregate.target = target.trim().to_string();
        }
        if let Some(singleton) = args.singleton {
            self.aggregate.singleton = singleton;
        }

        if let Some(format) = args.format {
            self.output.format = format;
        }
        if let Some(ref suffix) = args.stat_suffix {
            self.output.stat_suffix = suffix.trim().to_string();
        }
        if args.count {
            self.output.include_count = true;
        }
        if args.precision.is_some() {
            self.output.precision = args.precision;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
