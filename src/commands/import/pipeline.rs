use std::fmt;
use std::io::BufRead;

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::Value;
use tracing::warn;

use super::batch::{BatchWriter, ConflictPolicy};
use super::feeds::{ColumnKind, ColumnSpec, FeedSpec, RecordFormat};
use super::parse::{split_quoted_comma, split_tab_literal, unquote_field};
use crate::model::ImportStats;

#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    FieldCount { expected: usize, found: usize },
    NotNumeric { column: &'static str, value: String },
    MissingKey { column: &'static str },
    NotUtf8,
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FieldCount { expected, found } => {
                write!(f, "expected {expected} fields, found {found}")
            }
            Self::NotNumeric { column, value } => {
                write!(f, "column {column} is not numeric: {value:?}")
            }
            Self::MissingKey { column } => write!(f, "key column {column} is absent"),
            Self::NotUtf8 => write!(f, "line is not valid UTF-8"),
        }
    }
}

/// Reads a header line plus data lines and writes accepted rows in batches.
///
/// Rows that fail conversion, including lines that are not UTF-8, are
/// skipped and counted; only I/O and storage failures abort the run.
pub fn import_records<R: BufRead>(
    connection: &mut Connection,
    mut reader: R,
    feed: &FeedSpec,
    policy: ConflictPolicy,
    batch_size: usize,
) -> Result<ImportStats> {
    let mut stats = ImportStats::default();
    let mut writer = BatchWriter::new(connection, feed, policy, batch_size);

    let mut buffer = Vec::new();
    reader
        .read_until(b'\n', &mut buffer)
        .with_context(|| format!("failed to read header of {}", feed.name))?;

    let mut line_number: usize = 1;
    loop {
        buffer.clear();
        let read = reader
            .read_until(b'\n', &mut buffer)
            .with_context(|| format!("failed to read line from {}", feed.name))?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let raw = trim_line_ending(&buffer);
        if raw.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        stats.lines_read += 1;

        let converted = match std::str::from_utf8(raw) {
            Ok(line) => convert_record(feed, line),
            Err(_) => Err(RecordError::NotUtf8),
        };
        match converted {
            Ok(row) => {
                stats.accepted += 1;
                writer.push(row)?;
            }
            Err(RecordError::FieldCount { .. }) => {
                stats.rejected_shape += 1;
            }
            Err(err) => {
                stats.skipped_invalid += 1;
                warn!(
                    source = feed.name,
                    line_number,
                    reason = %err,
                    line = %String::from_utf8_lossy(raw),
                    "skipping invalid row"
                );
            }
        }
    }

    let batch = writer.finish()?;
    stats.inserted = batch.inserted;
    stats.ignored_duplicates = batch.ignored_duplicates;
    stats.batches_committed = batch.batches_committed;

    Ok(stats)
}

fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// Turns one raw line into bind values for the feed's insert statement.
pub fn convert_record(feed: &FeedSpec, line: &str) -> Result<Vec<Value>, RecordError> {
    match feed.format {
        RecordFormat::QuotedComma => {
            let fields = split_quoted_comma(line);
            if fields.len() != feed.column_count() {
                return Err(RecordError::FieldCount {
                    expected: feed.column_count(),
                    found: fields.len(),
                });
            }
            feed.columns
                .iter()
                .zip(fields)
                .map(|(column, raw)| convert_value(column, &unquote_field(raw)))
                .collect()
        }
        RecordFormat::TabLiteral => {
            let mut fields = split_tab_literal(line);
            fields.resize(feed.column_count(), None);
            feed.columns
                .iter()
                .zip(fields)
                .map(|(column, raw)| match raw {
                    Some(raw) => convert_value(column, raw),
                    None if column.key => Err(RecordError::MissingKey {
                        column: column.name,
                    }),
                    None => Ok(Value::Null),
                })
                .collect()
        }
    }
}

fn convert_value(column: &ColumnSpec, raw: &str) -> Result<Value, RecordError> {
    let not_numeric = || RecordError::NotNumeric {
        column: column.name,
        value: raw.to_string(),
    };

    match column.kind {
        ColumnKind::Text => Ok(Value::Text(raw.to_string())),
        ColumnKind::Integer => raw
            .trim()
            .parse::<i64>()
            .map(Value::Integer)
            .map_err(|_| not_numeric()),
        ColumnKind::Real => match raw.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(Value::Real(value)),
            _ => Err(not_numeric()),
        },
    }
}
