use thiserror::Error;

/// Error type for loading and aggregating replicate tables.
#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("{input}: missing required column(s) {missing:?}; available columns: {available:?}")]
    Schema {
        input: String,
        missing: Vec<String>,
        available: Vec<String>,
    },

    #[error("{input}:{line}: column '{column}' has non-numeric value '{value}'")]
    Parse {
        input: String,
        line: usize,
        column: String,
        value: String,
    },

    #[error("group {key} has {count} member(s); a sample variance needs at least 2")]
    InsufficientData { key: String, count: usize },

    #[error("{input}: no header line")]
    MissingHeader { input: String },

    #[error("{input}:{line}: expected {expected} fields, found {found}")]
    RaggedRow {
        input: String,
        line: usize,
        expected: usize,
        found: usize,
    },

    #[error("invalid column selection: {0}")]
    InvalidColumns(String),

    #[error("failed to read {input}: {error}")]
    Io {
        input: String,
        #[source]
        error: std::io::Error,
    },

    #[error("failed to parse {input}: {error}")]
    Csv {
        input: String,
        #[source]
        error: csv::Error,
    },
}
