//! Data models for replicate summaries.
//!
//! This module contains the core data structures used throughout the
//! application: parsed group keys, per-group summaries and the final
//! summary table.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Value type of a grouping column, inferred over all of its cells.
///
/// Kinds widen in declaration order: a column holding any float is a float
/// column, and a column holding any non-numeric cell is a text column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ColumnKind {
    #[default]
    Int,
    Float,
    Text,
}

impl ColumnKind {
    /// Narrowest kind that can hold a raw (already trimmed) cell.
    pub fn of(cell: &str) -> Self {
        if cell.parse::<i64>().is_ok() {
            ColumnKind::Int
        } else if cell.parse::<f64>().is_ok() {
            ColumnKind::Float
        } else {
            ColumnKind::Text
        }
    }

    /// Widen to a kind that also holds `cell`.
    pub fn widen(self, cell: &str) -> Self {
        self.max(Self::of(cell))
    }
}

/// A parsed value from a grouping column.
///
/// Every cell of a column is parsed as that column's [`ColumnKind`], so
/// `0` and `0.0` in a float column are the same key. Float equality is
/// bitwise (`total_cmp`).
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum KeyValue {
    Int(i64),
    Float(f64),
    Text(String),
}

impl KeyValue {
    /// Parse a raw (already trimmed) cell as a value of `kind`.
    ///
    /// A cell that does not fit `kind` falls back to its own narrowest kind.
    pub fn parse_as(cell: &str, kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Int => match cell.parse::<i64>() {
                Ok(i) => KeyValue::Int(i),
                Err(_) => Self::parse_as(cell, ColumnKind::Float),
            },
            ColumnKind::Float => match cell.parse::<f64>() {
                Ok(f) => KeyValue::Float(f),
                Err(_) => KeyValue::Text(cell.to_string()),
            },
            ColumnKind::Text => KeyValue::Text(cell.to_string()),
        }
    }
}

impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use KeyValue::*;
        match (self, other) {
            (Int(a), Int(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.total_cmp(b),
            // Numeric tie between variants: integers sort first.
            (Int(a), Float(b)) => (*a as f64).total_cmp(b).then(Ordering::Less),
            (Float(a), Int(b)) => a.total_cmp(&(*b as f64)).then(Ordering::Greater),
            (Text(a), Text(b)) => a.cmp(b),
            (Text(_), _) => Ordering::Greater,
            (_, Text(_)) => Ordering::Less,
        }
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for KeyValue {}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyValue::Int(i) => write!(f, "{}", i),
            // Debug keeps the decimal point: 0.0 rather than 0.
            KeyValue::Float(x) => write!(f, "{:?}", x),
            KeyValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// Ordered tuple of grouping values identifying one output row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct GroupKey(pub Vec<KeyValue>);

impl GroupKey {
    /// Render the key as `name=value` pairs for messages.
    pub fn describe(&self, columns: &[String]) -> String {
        if self.0.is_empty() {
            return "(all records)".to_string();
        }
        let pairs: Vec<String> = columns
            .iter()
            .zip(&self.0)
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();
        format!("({})", pairs.join(", "))
    }
}

/// What to do with groups that have fewer than two members.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SingletonPolicy {
    /// Report variance and CV as NaN (default)
    #[default]
    Nan,
    /// Abort with an insufficient-data error
    Error,
}

impl fmt::Display for SingletonPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SingletonPolicy::Nan => write!(f, "nan"),
            SingletonPolicy::Error => write!(f, "error"),
        }
    }
}

/// Summary statistics of the target column over one group.
#[derive(Debug, Clone, Serialize)]
pub struct GroupSummary {
    /// Grouping values shared by every member.
    pub key: GroupKey,
    /// Number of replicates in the group.
    pub count: usize,
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample variance (n - 1 denominator). NaN for degenerate groups.
    pub variance: f64,
    /// Standard deviation over mean. NaN when the mean is zero.
    pub cv: f64,
}

/// The complete result of one aggregation run.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryTable {
    /// Grouping column names, in key order.
    pub group_by: Vec<String>,
    /// Name of the summarized column.
    pub target: String,
    /// Degenerate-group policy that was applied.
    pub singleton: SingletonPolicy,
    /// Names of the tables the records came from.
    pub sources: Vec<String>,
    /// Total number of records aggregated.
    pub records: usize,
    /// One summary per distinct key, sorted ascending by key.
    pub groups: Vec<GroupSummary>,
}

impl SummaryTable {
    /// Look up the summary for a key.
    #[allow(dead_code)] // Used by tests and library-style callers
    pub fn get(&self, key: &GroupKey) -> Option<&GroupSummary> {
        self.groups
            .binary_search_by(|g| g.key.cmp(key))
            .ok()
            .map(|i| &self.groups[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(cell: &str) -> KeyValue {
        KeyValue::parse_as(cell, ColumnKind::of(cell))
    }

    #[test]
    fn test_column_kind_inference() {
        assert_eq!(ColumnKind::of("500"), ColumnKind::Int);
        assert_eq!(ColumnKind::of("0.1"), ColumnKind::Float);
        assert_eq!(ColumnKind::of("1e-8"), ColumnKind::Float);
        assert_eq!(ColumnKind::of("wf"), ColumnKind::Text);

        let kind = ["0", "1", "0.5"]
            .iter()
            .fold(ColumnKind::default(), |kind, cell| kind.widen(cell));
        assert_eq!(kind, ColumnKind::Float);
        assert_eq!(kind.widen("moran"), ColumnKind::Text);
    }

    #[test]
    fn test_key_value_parse_as_column_kind() {
        assert_eq!(KeyValue::parse_as("500", ColumnKind::Int), KeyValue::Int(500));
        assert_eq!(KeyValue::parse_as("0", ColumnKind::Float), KeyValue::Float(0.0));
        assert_eq!(
            KeyValue::parse_as("0", ColumnKind::Float),
            KeyValue::parse_as("0.0", ColumnKind::Float)
        );
        assert_eq!(
            KeyValue::parse_as("10", ColumnKind::Text),
            KeyValue::Text("10".to_string())
        );
        assert_eq!(parse("0.10"), parse("0.1"));
    }

    #[test]
    fn test_key_value_ordering() {
        let mut values = vec![
            parse("b"),
            parse("2.5"),
            parse("10"),
            parse("a"),
            parse("2"),
        ];
        values.sort();
        let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        assert_eq!(rendered, vec!["2", "2.5", "10", "a", "b"]);
        assert!(KeyValue::Int(0) < KeyValue::Float(0.0));
    }

    #[test]
    fn test_float_display_keeps_decimal_point() {
        assert_eq!(KeyValue::Float(0.0).to_string(), "0.0");
        assert_eq!(KeyValue::Float(0.1).to_string(), "0.1");
        assert_eq!(KeyValue::Int(1000).to_string(), "1000");
    }

    #[test]
    fn test_group_key_describe() {
        let columns = vec!["N".to_string(), "p".to_string()];
        let key = GroupKey(vec![KeyValue::Int(500), KeyValue::Float(0.1)]);
        assert_eq!(key.describe(&columns), "(N=500, p=0.1)");
        assert_eq!(GroupKey(vec![]).describe(&[]), "(all records)");
    }
}
