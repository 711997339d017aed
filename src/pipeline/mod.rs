// Batch pipelines: ingestion, processing, and the load orchestration

pub mod ingestion;
pub mod processing;

use chrono::Utc;
use serde::Serialize;
use std::path::Path;
use tracing::info;
use uuid::Uuid;

use crate::constants::{FINAL_USER_TABLE, RAW_USER_TABLE};
use crate::error::Result;
use crate::warehouse::{Warehouse, WriteReport};
use self::ingestion::Source;
use self::processing::payer::{claims_table, transform_claims, Payer};
use self::processing::{merge, normalize};

/// Result of a complete user-data ETL run
#[derive(Debug, Serialize)]
pub struct UserEtlSummary {
    pub run_id: Uuid,
    pub extracted_rows: usize,
    pub raw_report: WriteReport,
    pub final_report: WriteReport,
}

/// Result of a complete payer load run
#[derive(Debug, Serialize)]
pub struct PayerRunSummary {
    pub run_id: Uuid,
    pub payer: Payer,
    pub report: WriteReport,
}

/// Run the user demographics pipeline: extract both sources, build the raw
/// and final layers, and load each into its table.
pub fn run_user_pipeline(
    csv_path: &Path,
    spreadsheet_path: &Path,
    warehouse: &mut dyn Warehouse,
) -> Result<UserEtlSummary> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("user_etl", run_id = %run_id);
    let _enter = span.enter();

    info!("Starting user data ETL");

    // Step 1: extract both sources with canonical upper-case headers
    let mut csv_batch = ingestion::read_table(csv_path)?;
    csv_batch.uppercase_columns();
    let mut sheet_batch = ingestion::read_table(spreadsheet_path)?;
    sheet_batch.uppercase_columns();
    let extracted_rows = csv_batch.len() + sheet_batch.len();

    // Step 2: per-field normalization on each source
    let csv_batch = normalize::normalize_user_batch(csv_batch)?;
    let sheet_batch = normalize::normalize_user_batch(sheet_batch)?;

    // Step 3: raw and final layers
    let raw_layer = normalize::build_raw_layer(&csv_batch, &sheet_batch, Utc::now());
    let final_layer =
        merge::build_final_layer(&csv_batch, &sheet_batch, Utc::now().date_naive())?;

    // Step 4: load both layers
    let raw_report = warehouse.write(&raw_layer, RAW_USER_TABLE)?;
    info!("Loaded {} rows into {}", raw_report.rows, RAW_USER_TABLE);
    let final_report = warehouse.write(&final_layer, FINAL_USER_TABLE)?;
    info!("Loaded {} rows into {}", final_report.rows, FINAL_USER_TABLE);

    Ok(UserEtlSummary {
        run_id,
        extracted_rows,
        raw_report,
        final_report,
    })
}

/// Run the payer load: materialize the source, apply the payer rules, and
/// append into the payer's mapped table.
pub fn run_payer_pipeline(
    source: &Source,
    payer: Payer,
    warehouse: &mut dyn Warehouse,
) -> Result<PayerRunSummary> {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("payer_load", run_id = %run_id, payer = %payer);
    let _enter = span.enter();

    info!("Starting payer load");

    let batch = source.materialize()?;
    info!("Columns detected: {:?}", batch.columns());

    let transformed = transform_claims(batch, payer)?;

    warehouse.ensure_table(&claims_table(payer))?;
    let report = warehouse.write(&transformed, payer.table_name())?;
    info!("Loaded {} rows into {}", report.rows, report.table);

    Ok(PayerRunSummary {
        run_id,
        payer,
        report,
    })
}
