use std::collections::HashMap;

use chrono::NaiveDate;
use tracing::info;

use crate::constants::{
    ADULT_AGE_THRESHOLD, AGE_COLUMN, DISPLAY_DATE_FORMAT, DOB_COLUMN, USER_JOIN_KEY,
};
use crate::error::{EtlError, Result};
use crate::types::{RecordBatch, Value};

/// Suffixes applied to colliding non-key column names, tagging which
/// source a column came from
const LEFT_SUFFIX: &str = "_CSV";
const RIGHT_SUFFIX: &str = "_XLSX";

/// Inner-join two batches on a shared key. Rows with no counterpart on the
/// other side are dropped silently; duplicate keys produce one output row
/// per matching pair. The key is not assumed unique.
pub fn inner_join(left: &RecordBatch, right: &RecordBatch, key: &str) -> Result<RecordBatch> {
    let left_key = left
        .column_index(key)
        .ok_or_else(|| EtlError::ColumnNotFound(key.to_string()))?;
    let right_key = right
        .column_index(key)
        .ok_or_else(|| EtlError::ColumnNotFound(key.to_string()))?;

    // output columns: key once, then each side's remaining columns with
    // collision suffixes
    let mut columns = vec![key.to_string()];
    for column in left.columns() {
        if column == key {
            continue;
        }
        if right.column_index(column).is_some() {
            columns.push(format!("{column}{LEFT_SUFFIX}"));
        } else {
            columns.push(column.clone());
        }
    }
    for column in right.columns() {
        if column == key {
            continue;
        }
        if left.column_index(column).is_some() {
            columns.push(format!("{column}{RIGHT_SUFFIX}"));
        } else {
            columns.push(column.clone());
        }
    }

    // index the right side by key; null keys never match
    let mut right_rows: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows().iter().enumerate() {
        if let Some(repr) = join_key_repr(&row[right_key]) {
            right_rows.entry(repr).or_default().push(idx);
        }
    }

    let mut merged = RecordBatch::new(columns);
    for left_row in left.rows() {
        let Some(repr) = join_key_repr(&left_row[left_key]) else {
            continue;
        };
        let Some(matches) = right_rows.get(&repr) else {
            continue;
        };
        for &right_idx in matches {
            let right_row = &right.rows()[right_idx];
            let mut out = Vec::with_capacity(merged.columns().len());
            out.push(left_row[left_key].clone());
            for (idx, _) in left.columns().iter().enumerate() {
                if idx != left_key {
                    out.push(left_row[idx].clone());
                }
            }
            for (idx, _) in right.columns().iter().enumerate() {
                if idx != right_key {
                    out.push(right_row[idx].clone());
                }
            }
            merged.push_row(out)?;
        }
    }
    Ok(merged)
}

/// Canonical key text used for matching. Integer-valued floats collapse to
/// the same representation as integers so a key read as 101 on one side
/// and 101.0 on the other still joins.
fn join_key_repr(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::Text(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(format!("{f}")),
        Value::Date(d) => Some(d.format("%Y-%m-%d").to_string()),
        Value::Timestamp(t) => Some(t.to_rfc3339()),
    }
}

/// Whole years from a display-format date-of-birth string. Uses the fixed
/// 365-day year, so the result can be off by a day's worth around
/// birthdays; that imprecision is part of the established output contract.
/// Anything not in the display format is missing.
pub fn derive_age(dob: &Value, today: NaiveDate) -> Value {
    let parsed = match dob {
        Value::Text(s) => NaiveDate::parse_from_str(s.trim(), DISPLAY_DATE_FORMAT).ok(),
        _ => None,
    };
    match parsed {
        Some(date) => Value::Int((today - date).num_days().div_euclid(365)),
        None => Value::Null,
    }
}

/// Join the two normalized source batches, derive AGE, and keep only the
/// records strictly above the adult threshold.
pub fn build_final_layer(
    left: &RecordBatch,
    right: &RecordBatch,
    today: NaiveDate,
) -> Result<RecordBatch> {
    let mut merged = inner_join(left, right, USER_JOIN_KEY)?;

    // DOB gets a source suffix when both sides carry it
    let suffixed = format!("{DOB_COLUMN}{LEFT_SUFFIX}");
    let dob_column = if merged.column_index(&suffixed).is_some() {
        suffixed
    } else {
        DOB_COLUMN.to_string()
    };
    let dob_idx = merged
        .column_index(&dob_column)
        .ok_or_else(|| EtlError::ColumnNotFound(DOB_COLUMN.to_string()))?;

    let ages: Vec<Value> = merged
        .rows()
        .iter()
        .map(|row| derive_age(&row[dob_idx], today))
        .collect();
    merged.add_column(AGE_COLUMN, ages)?;

    let age_idx = merged
        .column_index(AGE_COLUMN)
        .expect("AGE column was just added");
    let filtered =
        merged.filter(|row| matches!(row[age_idx], Value::Int(age) if age > ADULT_AGE_THRESHOLD));

    info!("Final layer built with {} rows", filtered.len());
    Ok(filtered)
}
