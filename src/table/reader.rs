//! Readers for comma, tab and whitespace separated tables.

use super::{Delimiter, Row, Table};
use crate::error::AggregateError;
use crate::scanner::InputSource;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Load a table from a discovered input.
pub fn read_source(source: &InputSource, delimiter: Delimiter) -> Result<Table, AggregateError> {
    match source {
        InputSource::Stdin => read_table(&source.name(), std::io::stdin().lock(), delimiter),
        InputSource::File(path) => read_path(path, delimiter),
    }
}

/// Load a table from a file on disk.
pub fn read_path(path: &Path, delimiter: Delimiter) -> Result<Table, AggregateError> {
    let name = path.display().to_string();
    let file = std::fs::File::open(path).map_err(|error| AggregateError::Io {
        input: name.clone(),
        error,
    })?;
    read_table(&name, file, delimiter)
}

/// Load a table from any reader. `name` identifies the source in errors.
pub fn read_table<R: Read>(
    name: &str,
    mut reader: R,
    delimiter: Delimiter,
) -> Result<Table, AggregateError> {
    let mut text = String::new();
    reader
        .read_to_string(&mut text)
        .map_err(|error| AggregateError::Io {
            input: name.to_string(),
            error,
        })?;

    let header_line = text
        .lines()
        .find(|line| !line.trim().is_empty())
        .ok_or_else(|| AggregateError::MissingHeader {
            input: name.to_string(),
        })?;

    let resolved = delimiter.detect(header_line);
    debug!("Reading {} as {:?}-delimited", name, resolved);

    let table = match resolved.byte() {
        Some(byte) => read_delimited(name, &text, byte)?,
        None => read_whitespace(name, &text)?,
    };

    debug!(
        "{}: {} columns, {} rows",
        name,
        table.header.len(),
        table.rows.len()
    );
    Ok(table)
}

fn read_delimited(name: &str, text: &str, delimiter: u8) -> Result<Table, AggregateError> {
    // The csv reader only skips empty lines, not whitespace-only ones, so
    // blank lines are dropped up front. `physical[i]` is the source line of
    // the (i + 1)-th kept line.
    let mut physical = Vec::new();
    let mut kept = String::with_capacity(text.len());
    for (index, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        physical.push(index + 1);
        kept.push_str(line);
        kept.push('\n');
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .trim(csv::Trim::All)
        .has_headers(true)
        .flexible(false)
        .from_reader(kept.as_bytes());

    let header: Vec<String> = reader
        .headers()
        .map_err(|e| csv_error(name, e, &physical))?
        .iter()
        .map(String::from)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| csv_error(name, e, &physical))?;
        rows.push(Row {
            line: physical_line(&physical, record.position()),
            fields: record.iter().map(String::from).collect(),
        });
    }

    Ok(Table {
        source: name.to_string(),
        header,
        rows,
    })
}

fn physical_line(physical: &[usize], pos: Option<&csv::Position>) -> usize {
    pos.and_then(|p| physical.get((p.line() as usize).checked_sub(1)?))
        .copied()
        .unwrap_or(0)
}

fn read_whitespace(name: &str, text: &str) -> Result<Table, AggregateError> {
    let mut lines = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let header: Vec<String> = match lines.next() {
        Some((_, line)) => line.split_whitespace().map(String::from).collect(),
        None => {
            return Err(AggregateError::MissingHeader {
                input: name.to_string(),
            })
        }
    };

    let mut rows = Vec::new();
    for (index, line) in lines {
        let fields: Vec<String> = line.split_whitespace().map(String::from).collect();
        if fields.len() != header.len() {
            return Err(AggregateError::RaggedRow {
                input: name.to_string(),
                line: index + 1,
                expected: header.len(),
                found: fields.len(),
            });
        }
        rows.push(Row {
            line: index + 1,
            fields,
        });
    }

    Ok(Table {
        source: name.to_string(),
        header,
        rows,
    })
}

/// Map a `csv` error, pulling ragged rows out into their own variant.
fn csv_error(name: &str, error: csv::Error, physical: &[usize]) -> AggregateError {
    if let csv::ErrorKind::UnequalLengths {
        pos,
        expected_len,
        len,
    } = error.kind()
    {
        return AggregateError::RaggedRow {
            input: name.to_string(),
            line: physical_line(physical, pos.as_ref()),
            expected: *expected_len as usize,
            found: *len as usize,
        };
    }
    AggregateError::Csv {
        input: name.to_string(),
        error,
    }
}
