//! Delimited table loading.
//!
//! Tables are small header-described text files written by the simulation
//! post-processing step, one replicate per row.

pub mod reader;

pub use reader::read_source;

use serde::{Deserialize, Serialize};

/// Field separator for input tables.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Delimiter {
    /// Decide from the header line (default)
    #[default]
    Auto,
    /// Comma-separated values
    Comma,
    /// Tab-separated values
    Tab,
    /// Runs of spaces or tabs
    Whitespace,
}

impl Delimiter {
    /// Resolve `Auto` against a header line. Other variants are returned as-is.
    pub fn detect(self, header_line: &str) -> Self {
        match self {
            Delimiter::Auto if header_line.contains(',') => Delimiter::Comma,
            Delimiter::Auto if header_line.contains('\t') => Delimiter::Tab,
            Delimiter::Auto => Delimiter::Whitespace,
            other => other,
        }
    }

    /// The single-byte separator for `csv`-backed formats.
    pub fn byte(self) -> Option<u8> {
        match self {
            Delimiter::Comma => Some(b','),
            Delimiter::Tab => Some(b'\t'),
            Delimiter::Auto | Delimiter::Whitespace => None,
        }
    }
}

/// One data row with its physical line number in the source.
#[derive(Debug, Clone)]
pub struct Row {
    pub line: usize,
    pub fields: Vec<String>,
}

/// A loaded table: header names plus data rows, all cells trimmed.
#[derive(Debug, Clone)]
pub struct Table {
    /// Where the table came from (file path or `<stdin>`).
    pub source: String,
    pub header: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Position of a named column. The first match wins on duplicate names.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.header.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
