use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use tracing::info;

use crate::constants::{
    DISPLAY_DATE_FORMAT, DOB_COLUMN, GENDER_COLUMN, INPUT_DATETIME_FORMATS, INPUT_DATE_FORMATS,
    LOAD_TIMESTAMP_COLUMN,
};
use crate::error::Result;
use crate::types::{RecordBatch, Value};

/// Fold a free-text gender value into the canonical M/F/O codes.
/// Missing input stays missing; anything unrecognized lands in the
/// "other" bucket rather than failing.
pub fn standardize_gender(value: &Value) -> Value {
    let raw = match value {
        Value::Null => return Value::Null,
        Value::Text(s) => s,
        // a non-missing value of the wrong type is still "other"
        _ => return Value::Text("O".to_string()),
    };

    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Value::Null;
    }

    let code = match trimmed.to_lowercase().as_str() {
        "male" | "m" => "M",
        "female" | "f" => "F",
        _ => "O",
    };
    Value::Text(code.to_string())
}

/// Try the expected input formats in order; date-only formats first, then
/// datetime formats with the time discarded.
pub fn parse_date_flexible(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    for format in INPUT_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    for format in INPUT_DATETIME_FORMATS {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(datetime.date());
        }
    }
    None
}

/// Reparse a source date and serialize it to the fixed display format.
/// Unparseable values degrade to missing so downstream derivations can
/// skip them.
pub fn reformat_date(value: &Value) -> Value {
    let parsed = match value {
        Value::Date(date) => Some(*date),
        Value::Timestamp(ts) => Some(ts.date_naive()),
        Value::Text(s) => parse_date_flexible(s),
        _ => None,
    };
    match parsed {
        Some(date) => Value::Text(date.format(DISPLAY_DATE_FORMAT).to_string()),
        None => Value::Null,
    }
}

/// Apply the per-field cleanup rules to one extracted user batch:
/// gender codes standardized, DOB rewritten to the display format.
/// Both columns are required; their absence is a data-shape error.
pub fn normalize_user_batch(mut batch: RecordBatch) -> Result<RecordBatch> {
    batch.map_column(GENDER_COLUMN, standardize_gender)?;
    batch.map_column(DOB_COLUMN, reformat_date)?;
    Ok(batch)
}

/// Concatenate the normalized source batches into the raw layer and stamp
/// every record with the single batch-wide capture instant.
pub fn build_raw_layer(
    left: &RecordBatch,
    right: &RecordBatch,
    captured_at: DateTime<Utc>,
) -> RecordBatch {
    let mut raw = left.concat(right);
    let stamps = vec![Value::Timestamp(captured_at); raw.len()];
    raw.add_column(LOAD_TIMESTAMP_COLUMN, stamps)
        .expect("stamp column matches row count");
    info!("Raw layer built with {} rows", raw.len());
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> Value {
        Value::Text(s.to_string())
    }

    #[test]
    fn test_gender_synonyms_standardize() {
        for input in ["male", "M", "Male", " m "] {
            assert_eq!(standardize_gender(&text(input)), text("M"));
        }
        for input in ["female", "f", "FEMALE"] {
            assert_eq!(standardize_gender(&text(input)), text("F"));
        }
        for input in ["nonbinary", "x", "unknown"] {
            assert_eq!(standardize_gender(&text(input)), text("O"));
        }
    }

    #[test]
    fn test_gender_missing_stays_missing() {
        assert_eq!(standardize_gender(&Value::Null), Value::Null);
        assert_eq!(standardize_gender(&text("")), Value::Null);
        assert_eq!(standardize_gender(&text("   ")), Value::Null);
    }

    #[test]
    fn test_gender_non_text_buckets_to_other() {
        assert_eq!(standardize_gender(&Value::Int(1)), text("O"));
    }

    #[test]
    fn test_reformat_date_round_trips_calendar_date() {
        let reformatted = reformat_date(&text("1990-05-14"));
        assert_eq!(reformatted, text("14-05-1990"));

        // already in display format round-trips to itself
        assert_eq!(reformat_date(&text("14-05-1990")), text("14-05-1990"));
    }

    #[test]
    fn test_reformat_date_unparseable_becomes_missing() {
        assert_eq!(reformat_date(&text("not a date")), Value::Null);
        assert_eq!(reformat_date(&text("14/05/90/oops")), Value::Null);
        assert_eq!(reformat_date(&Value::Null), Value::Null);
    }

    #[test]
    fn test_reformat_date_accepts_temporal_values() {
        let date = NaiveDate::from_ymd_opt(2001, 12, 3).unwrap();
        assert_eq!(reformat_date(&Value::Date(date)), text("03-12-2001"));
    }

    #[test]
    fn test_raw_layer_single_timestamp_for_whole_batch() {
        let mut left = RecordBatch::new(vec!["USER_ID".to_string()]);
        left.push_row(vec![Value::Int(1)]).unwrap();
        let mut right = RecordBatch::new(vec!["USER_ID".to_string()]);
        right.push_row(vec![Value::Int(2)]).unwrap();

        let captured_at = Utc::now();
        let raw = build_raw_layer(&left, &right, captured_at);

        assert_eq!(raw.len(), 2);
        for row_idx in 0..raw.len() {
            assert_eq!(
                raw.get(row_idx, LOAD_TIMESTAMP_COLUMN),
                Some(&Value::Timestamp(captured_at))
            );
        }
    }

    #[test]
    fn test_normalize_user_batch_requires_columns() {
        let batch = RecordBatch::new(vec!["USER_ID".to_string()]);
        assert!(normalize_user_batch(batch).is_err());
    }
}
