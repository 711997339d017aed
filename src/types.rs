use crate::error::{EtlError, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A single cell in a record batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Text(String),
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Timestamp(DateTime<Utc>),
    Null,
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the value; integers widen to float
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }
}

/// Parse a raw textual cell into a typed value. Empty or whitespace-only
/// input is missing; integers and floats are inferred, everything else
/// stays text.
pub fn parse_scalar(raw: &str) -> Value {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = trimmed.parse::<i64>() {
        return Value::Int(i);
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        return Value::Float(f);
    }
    Value::Text(trimmed.to_string())
}

/// An ordered set of named columns plus rows of cells. Every row carries
/// exactly one value per column; `push_row` rejects anything else, so a
/// constructed batch always has a uniform field set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordBatch {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl RecordBatch {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(EtlError::RowShape {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Value at (row, column name), if both exist
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Rewrite one column cell-by-cell
    pub fn map_column<F>(&mut self, column: &str, mut f: F) -> Result<()>
    where
        F: FnMut(&Value) -> Value,
    {
        let idx = self
            .column_index(column)
            .ok_or_else(|| EtlError::ColumnNotFound(column.to_string()))?;
        for row in &mut self.rows {
            row[idx] = f(&row[idx]);
        }
        Ok(())
    }

    /// Append a derived column; the value vector must match the row count
    pub fn add_column(&mut self, name: &str, values: Vec<Value>) -> Result<()> {
        if values.len() != self.rows.len() {
            return Err(EtlError::RowShape {
                expected: self.rows.len(),
                got: values.len(),
            });
        }
        self.columns.push(name.to_string());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    /// Upper-case every column name in place
    pub fn uppercase_columns(&mut self) {
        for column in &mut self.columns {
            *column = column.trim().to_uppercase();
        }
    }

    /// Keep only the rows the predicate accepts
    pub fn filter<F>(self, mut predicate: F) -> Self
    where
        F: FnMut(&[Value]) -> bool,
    {
        let rows = self
            .rows
            .into_iter()
            .filter(|row| predicate(row))
            .collect();
        Self {
            columns: self.columns,
            rows,
        }
    }

    /// Stack another batch underneath this one. Columns are aligned by name;
    /// the result carries the union of both column sets and cells absent from
    /// a side become null.
    pub fn concat(&self, other: &RecordBatch) -> RecordBatch {
        let mut columns = self.columns.clone();
        for column in &other.columns {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }

        let mut out = RecordBatch::new(columns);
        for source in [self, other] {
            for row in &source.rows {
                let aligned = out
                    .columns
                    .iter()
                    .map(|name| match source.column_index(name) {
                        Some(idx) => row[idx].clone(),
                        None => Value::Null,
                    })
                    .collect();
                out.rows.push(aligned);
            }
        }
        out
    }
}
