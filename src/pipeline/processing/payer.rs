use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::constants::{
    ANTHEM_ADJUSTMENT, ANTHEM_TABLE, CIGNA_TABLE, CLAIM_AMOUNT_COLUMN, MANUAL_TABLE,
    REQUIRED_CLAIM_COLUMNS, SERVICE_DATE_COLUMN,
};
use crate::error::{EtlError, Result};
use crate::pipeline::processing::normalize::parse_date_flexible;
use crate::types::{RecordBatch, Value};
use crate::warehouse::{ColumnDef, TableSchema};

/// The closed set of payer identities. Parsing is the only way in, so an
/// invalid identity is rejected before any extraction or load I/O.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Payer {
    Anthem,
    Cigna,
    Manual,
}

/// Destination table per payer, loaded once and read-only thereafter
static TABLE_MAPPING: Lazy<HashMap<Payer, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (Payer::Anthem, ANTHEM_TABLE),
        (Payer::Cigna, CIGNA_TABLE),
        (Payer::Manual, MANUAL_TABLE),
    ])
});

impl Payer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Payer::Anthem => "anthem",
            Payer::Cigna => "cigna",
            Payer::Manual => "manual",
        }
    }

    /// The warehouse table this payer's claims land in
    pub fn table_name(&self) -> &'static str {
        TABLE_MAPPING
            .get(self)
            .copied()
            .expect("every payer identity is mapped to a table")
    }

    /// True for the identity whose source is the built-in inline record
    /// set rather than a file
    pub fn is_inline(&self) -> bool {
        matches!(self, Payer::Manual)
    }
}

impl fmt::Display for Payer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Payer {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "anthem" => Ok(Payer::Anthem),
            "cigna" => Ok(Payer::Cigna),
            "manual" => Ok(Payer::Manual),
            other => Err(EtlError::Config(format!("unknown payer: {other}"))),
        }
    }
}

/// Apply the payer business rules to a materialized claims batch:
/// required-column validation (all missing names reported at once),
/// service-date reparsing, the per-payer amount adjustment, and the final
/// upper-casing of column names. Pure function of (batch, payer).
pub fn transform_claims(mut batch: RecordBatch, payer: Payer) -> Result<RecordBatch> {
    info!("Applying claim transformations for payer {payer}");

    let missing: Vec<String> = REQUIRED_CLAIM_COLUMNS
        .iter()
        .filter(|column| batch.column_index(column).is_none())
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(EtlError::MissingColumns {
            missing,
            found: batch.columns().to_vec(),
        });
    }

    batch.map_column(SERVICE_DATE_COLUMN, reparse_service_date)?;

    if payer == Payer::Anthem {
        info!("Applying Anthem-specific adjustment (+2%)");
        batch.map_column(CLAIM_AMOUNT_COLUMN, |value| match value.as_f64() {
            Some(amount) => Value::Float(amount * ANTHEM_ADJUSTMENT),
            None => value.clone(),
        })?;
    }

    batch.uppercase_columns();
    Ok(batch)
}

/// Fixed claims DDL for a payer's destination table. The ingestion
/// timestamp is stamped by the warehouse itself at insert time.
pub fn claims_table(payer: Payer) -> TableSchema {
    TableSchema {
        name: payer.table_name().to_string(),
        columns: vec![
            ColumnDef::new("MEMBER_ID", "TEXT"),
            ColumnDef::new("CLAIM_ID", "TEXT"),
            ColumnDef::new("CLAIM_AMOUNT", "REAL"),
            ColumnDef::new("SERVICE_DATE", "DATE"),
            ColumnDef::new("PAYER_NAME", "TEXT"),
            ColumnDef::with_default("INGESTION_TIMESTAMP", "TIMESTAMP", "CURRENT_TIMESTAMP"),
        ],
    }
}

/// Service dates become calendar dates; unparseable values degrade to
/// missing rather than aborting the batch.
fn reparse_service_date(value: &Value) -> Value {
    match value {
        Value::Date(date) => Value::Date(*date),
        Value::Timestamp(ts) => Value::Date(ts.date_naive()),
        Value::Text(s) => match parse_date_flexible(s) {
            Some(date) => Value::Date(date),
            None => Value::Null,
        },
        _ => Value::Null,
    }
}
