//! Summary table rendering.
//!
//! Every format shares the same column layout: the grouping columns, an
//! optional `n` column, then `mean_<suffix>`, `var_<suffix>` and
//! `cv_<suffix>`.

use super::OutputFormat;
use crate::error::AggregateError;
use crate::models::{GroupSummary, KeyValue, SingletonPolicy, SummaryTable};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// How to render a summary table.
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub format: OutputFormat,
    /// Suffix of the statistic column names.
    pub stat_suffix: String,
    /// Insert an `n` column before the statistics.
    pub include_count: bool,
    /// Fixed decimal places; shortest round-trip form when `None`.
    pub precision: Option<usize>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Text,
            stat_suffix: "pi".to_string(),
            include_count: false,
            precision: None,
        }
    }
}

impl From<&crate::config::OutputConfig> for RenderOptions {
    fn from(config: &crate::config::OutputConfig) -> Self {
        Self {
            format: config.format,
            stat_suffix: config.stat_suffix.clone(),
            include_count: config.include_count,
            precision: config.precision,
        }
    }
}

impl RenderOptions {
    fn stat_columns(&self) -> [String; 3] {
        [
            format!("mean_{}", self.stat_suffix),
            format!("var_{}", self.stat_suffix),
            format!("cv_{}", self.stat_suffix),
        ]
    }

    /// Names the renderer adds next to the grouping columns.
    fn reserved_columns(&self) -> Vec<String> {
        let mut reserved = self.stat_columns().to_vec();
        // JSON rows always carry the group size.
        if self.include_count || self.format == OutputFormat::Json {
            reserved.push("n".to_string());
        }
        reserved
    }

    /// Reject grouping columns that would share a name with an output column.
    pub fn check_columns(&self, group_by: &[String]) -> Result<(), AggregateError> {
        let reserved = self.reserved_columns();
        match group_by.iter().find(|c| reserved.contains(c)) {
            Some(column) => Err(AggregateError::InvalidColumns(format!(
                "grouping column '{}' clashes with an output column of the same name",
                column
            ))),
            None => Ok(()),
        }
    }
}

/// Render a summary table in the requested format.
pub fn render(table: &SummaryTable, options: &RenderOptions) -> Result<String> {
    options.check_columns(&table.group_by)?;

    match options.format {
        OutputFormat::Text => generate_text_report(table, options),
        OutputFormat::Csv => generate_delimited_report(table, options, b','),
        OutputFormat::Tsv => generate_delimited_report(table, options, b'\t'),
        OutputFormat::Markdown => Ok(generate_markdown_report(table, options)),
        OutputFormat::Json => generate_json_report(table, options),
    }
}

/// Header names in output order.
fn header(table: &SummaryTable, options: &RenderOptions) -> Vec<String> {
    let mut columns = table.group_by.clone();
    if options.include_count {
        columns.push("n".to_string());
    }
    columns.extend(options.stat_columns());
    columns
}

fn format_stat(value: f64, precision: Option<usize>) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    match precision {
        Some(digits) => format!("{:.*}", digits, value),
        None => value.to_string(),
    }
}

/// One group as rendered cells, in header order.
fn cells(group: &GroupSummary, options: &RenderOptions) -> Vec<String> {
    let mut row: Vec<String> = group.key.0.iter().map(|v| v.to_string()).collect();
    if options.include_count {
        row.push(group.count.to_string());
    }
    for stat in [group.mean, group.variance, group.cv] {
        row.push(format_stat(stat, options.precision));
    }
    row
}

/// Whitespace-separated fields cannot hold blanks or be empty.
fn fits_text_field(field: &str) -> bool {
    !field.is_empty() && !field.chars().any(char::is_whitespace)
}

/// Space-separated table, readable by the same tool.
///
/// Names or key values containing whitespace would not read back as the
/// same fields, so they are rejected; csv and tsv handle them.
fn generate_text_report(table: &SummaryTable, options: &RenderOptions) -> Result<String> {
    let columns = header(table, options);
    if let Some(name) = columns.iter().find(|c| !fits_text_field(c)) {
        anyhow::bail!(
            "Column name '{}' cannot be written as text; use --format csv or tsv",
            name
        );
    }

    let mut output = String::new();
    output.push_str(&columns.join(" "));
    output.push('\n');

    for group in &table.groups {
        let blank = group.key.0.iter().find_map(|value| match value {
            KeyValue::Text(s) if !fits_text_field(s) => Some(s),
            _ => None,
        });
        if let Some(value) = blank {
            anyhow::bail!(
                "Key value '{}' of group {} cannot be written as text; use --format csv or tsv",
                value,
                group.key.describe(&table.group_by)
            );
        }

        output.push_str(&cells(group, options).join(" "));
        output.push('\n');
    }

    Ok(output)
}

fn generate_delimited_report(
    table: &SummaryTable,
    options: &RenderOptions,
    delimiter: u8,
) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());

    writer.write_record(header(table, options))?;
    for group in &table.groups {
        writer.write_record(cells(group, options))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush table: {}", e))?;
    String::from_utf8(bytes).context("Rendered table is not valid UTF-8")
}

/// Generate a Markdown report.
fn generate_markdown_report(table: &SummaryTable, options: &RenderOptions) -> String {
    let mut output = String::new();

    output.push_str("# Replicate Summary\n\n");

    // Metadata
    output.push_str(&format!("- **Target column:** `{}`\n", table.target));
    if table.group_by.is_empty() {
        output.push_str("- **Grouped by:** (none)\n");
    } else {
        output.push_str(&format!(
            "- **Grouped by:** {}\n",
            table
                .group_by
                .iter()
                .map(|c| format!("`{}`", c))
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    output.push_str(&format!("- **Records:** {}\n", table.records));
    output.push_str(&format!("- **Groups:** {}\n", table.groups.len()));
    if !table.sources.is_empty() {
        output.push_str(&format!("- **Sources:** {}\n", table.sources.len()));
    }
    output.push('\n');

    // Table
    let columns = header(table, options);
    output.push_str(&format!("| {} |\n", columns.join(" | ")));
    output.push_str(&format!(
        "|{}\n",
        columns.iter().map(|_| "---:|").collect::<String>()
    ));
    for group in &table.groups {
        output.push_str(&format!("| {} |\n", cells(group, options).join(" | ")));
    }
    output.push('\n');

    // Degenerate-group note
    let singletons = table.groups.iter().filter(|g| g.count < 2).count();
    if singletons > 0 && table.singleton == SingletonPolicy::Nan {
        output.push_str(&format!(
            "> {} group(s) have a single replicate; their variance and CV are reported as NaN.\n\n",
            singletons
        ));
    }

    output.push_str(&format!(
        "*Generated by divstats v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    output
}

/// Metadata block of the JSON report.
#[derive(Debug, Serialize)]
struct ReportMetadata<'a> {
    tool_version: &'static str,
    generated_at: DateTime<Utc>,
    sources: &'a [String],
    records: usize,
    groups: usize,
    target: &'a str,
    group_by: &'a [String],
    singleton: SingletonPolicy,
}

#[derive(Debug, Serialize)]
struct JsonReport<'a> {
    metadata: ReportMetadata<'a>,
    groups: Vec<Value>,
}

/// Generate a JSON report. NaN statistics become `null`.
fn generate_json_report(table: &SummaryTable, options: &RenderOptions) -> Result<String> {
    let [mean_col, var_col, cv_col] = options.stat_columns();

    let groups = table
        .groups
        .iter()
        .map(|group| -> Result<Value, serde_json::Error> {
            let mut object = Map::new();
            for (name, value) in table.group_by.iter().zip(&group.key.0) {
                object.insert(name.clone(), serde_json::to_value(value)?);
            }
            object.insert("n".to_string(), Value::from(group.count));
            object.insert(mean_col.clone(), Value::from(group.mean));
            object.insert(var_col.clone(), Value::from(group.variance));
            object.insert(cv_col.clone(), Value::from(group.cv));
            Ok(Value::Object(object))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let report = JsonReport {
        metadata: ReportMetadata {
            tool_version: env!("CARGO_PKG_VERSION"),
            generated_at: Utc::now(),
            sources: &table.sources,
            records: table.records,
            groups: table.groups.len(),
            target: &table.target,
            group_by: &table.group_by,
            singleton: table.singleton,
        },
        groups,
    };

    serde_json::to_string_pretty(&report).map_err(Into::into)
}
