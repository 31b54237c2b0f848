//! Report rendering for summary tables.

pub mod generator;

pub use generator::{render, RenderOptions};

use serde::{Deserialize, Serialize};

/// Output format for the summary table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Space-separated columns (default)
    #[default]
    Text,
    /// Comma-separated values
    Csv,
    /// Tab-separated values
    Tsv,
    /// Markdown report
    Markdown,
    /// JSON document
    Json,
}
