use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use chrono::{NaiveTime, TimeZone, Utc};
use tracing::info;

use crate::error::{EtlError, Result};
use crate::types::{parse_scalar, RecordBatch, Value};

/// Where a batch comes from. Materialization is dispatched on the variant,
/// so an unsupported shape is unrepresentable.
#[derive(Debug, Clone)]
pub enum Source {
    /// A delimited or spreadsheet file on disk, detected by extension
    FilePath(PathBuf),
    /// An in-memory literal list of records, each a JSON object
    Inline(Vec<serde_json::Value>),
}

impl Source {
    /// Produce a record batch from this source. Column names are trimmed;
    /// anything further (upper-casing) is the calling stage's contract.
    pub fn materialize(&self) -> Result<RecordBatch> {
        match self {
            Source::FilePath(path) => {
                info!("Reading source file from {}", path.display());
                read_table(path)
            }
            Source::Inline(records) => {
                info!("Building batch from {} inline records", records.len());
                from_inline(records)
            }
        }
    }
}

/// Read a tabular file, picking the reader from the file extension.
pub fn read_table(path: &Path) -> Result<RecordBatch> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_delimited(path),
        "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => read_spreadsheet(path),
        other => Err(EtlError::UnsupportedFormat(format!(
            "'{}' ({})",
            other,
            path.display()
        ))),
    }
}

/// Comma-separated reader. Handles a UTF-8 byte-order mark on the first
/// header and trims header names and fields.
pub fn read_delimited(path: &Path) -> Result<RecordBatch> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(BufReader::new(file));

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    let mut batch = RecordBatch::new(columns);
    for record in reader.records() {
        let record = record?;
        let row = record.iter().map(parse_scalar).collect();
        batch.push_row(row)?;
    }

    info!("Read {} rows from {}", batch.len(), path.display());
    Ok(batch)
}

/// Spreadsheet reader over the first worksheet; the first row is the header.
pub fn read_spreadsheet(path: &Path) -> Result<RecordBatch> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| EtlError::Config(format!("no worksheets in {}", path.display())))??;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .ok_or_else(|| EtlError::Config(format!("{} has no header row", path.display())))?
        .iter()
        .map(|cell| cell.to_string().trim().to_string())
        .collect();

    let mut batch = RecordBatch::new(columns);
    for row in rows {
        let values = row.iter().map(cell_to_value).collect();
        batch.push_row(values)?;
    }

    info!("Read {} rows from {}", batch.len(), path.display());
    Ok(batch)
}

fn cell_to_value(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Null,
        Data::String(s) => parse_scalar(s),
        Data::Float(f) => Value::Float(*f),
        Data::Int(i) => Value::Int(*i),
        Data::Bool(b) => Value::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) if naive.time() == NaiveTime::MIN => Value::Date(naive.date()),
            Some(naive) => Value::Timestamp(Utc.from_utc_datetime(&naive)),
            None => Value::Null,
        },
        Data::DateTimeIso(s) => parse_scalar(s),
        Data::DurationIso(s) => Value::Text(s.clone()),
        Data::Error(_) => Value::Null,
    }
}

/// Build a batch from inline JSON objects. Columns follow first-seen key
/// order across the records; keys absent from a record become null cells.
fn from_inline(records: &[serde_json::Value]) -> Result<RecordBatch> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        let object = record.as_object().ok_or_else(|| {
            EtlError::Config("inline source records must be JSON objects".to_string())
        })?;
        for key in object.keys() {
            let trimmed = key.trim().to_string();
            if !columns.contains(&trimmed) {
                columns.push(trimmed);
            }
        }
    }

    let mut batch = RecordBatch::new(columns.clone());
    for record in records {
        let object = record.as_object().expect("checked above");
        let row = columns
            .iter()
            .map(|column| {
                object
                    .iter()
                    .find(|(key, _)| key.trim() == column)
                    .map(|(_, value)| json_to_value(value))
                    .unwrap_or(Value::Null)
            })
            .collect();
        batch.push_row(row)?;
    }
    Ok(batch)
}

fn json_to_value(value: &serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::String(s) => Value::Text(s.clone()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int(i)
            } else {
                n.as_f64().map(Value::Float).unwrap_or(Value::Null)
            }
        }
        serde_json::Value::Bool(b) => Value::Text(b.to_string()),
        other => Value::Text(other.to_string()),
    }
}
