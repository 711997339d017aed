use clap::{Parser, Subcommand};
use serde_json::json;
use std::path::PathBuf;
use tracing::error;

use claims_etl::config::WarehouseConfig;
use claims_etl::db::SqliteWarehouse;
use claims_etl::error::EtlError;
use claims_etl::logging;
use claims_etl::pipeline;
use claims_etl::pipeline::ingestion::Source;
use claims_etl::pipeline::processing::payer::Payer;

#[derive(Parser)]
#[command(name = "claims_etl")]
#[command(about = "Batch ETL pipelines for member and payer claims warehouse loading")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the user demographics ETL over a delimited and a spreadsheet source
    UserData {
        /// Path to the delimited source file
        #[arg(long)]
        csv: PathBuf,
        /// Path to the spreadsheet source file
        #[arg(long)]
        spreadsheet: PathBuf,
    },
    /// Load a payer claims source into its mapped warehouse table
    Payer {
        /// Payer name
        #[arg(long, value_enum)]
        payer: Payer,
        /// Path to source CSV file (required for file-based payers)
        #[arg(long)]
        source: Option<PathBuf>,
    },
}

/// The built-in record set used when the payer identity is "manual"
fn manual_claims() -> Source {
    Source::Inline(vec![json!({
        "member_id": "M900",
        "claim_id": "C9001",
        "claim_amount": 500.0,
        "service_date": "2025-02-01",
        "payer_name": "manual",
    })])
}

fn resolve_source(payer: Payer, source: Option<PathBuf>) -> Result<Source, EtlError> {
    if payer.is_inline() {
        return Ok(manual_claims());
    }
    match source {
        Some(path) => Ok(Source::FilePath(path)),
        None => Err(EtlError::Config(
            "source file must be provided for file-based load".to_string(),
        )),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let cli = Cli::parse();

    match cli.command {
        Commands::UserData { csv, spreadsheet } => {
            println!("🚀 Running user data ETL...");

            let config = WarehouseConfig::from_env()?;
            let mut warehouse = SqliteWarehouse::open(&config)?;

            match pipeline::run_user_pipeline(&csv, &spreadsheet, &mut warehouse) {
                Ok(summary) => {
                    println!("\n📊 ETL Results (run {}):", summary.run_id);
                    println!("   Extracted rows: {}", summary.extracted_rows);
                    println!(
                        "   {}: {} rows in {} chunks",
                        summary.raw_report.table,
                        summary.raw_report.rows,
                        summary.raw_report.chunks
                    );
                    println!(
                        "   {}: {} rows in {} chunks",
                        summary.final_report.table,
                        summary.final_report.rows,
                        summary.final_report.chunks
                    );
                    println!("✅ ETL pipeline completed successfully");
                }
                Err(e) => {
                    error!("ETL pipeline failed: {e}");
                    println!("❌ ETL pipeline failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Commands::Payer { payer, source } => {
            println!("🚀 Running payer load for {payer}...");

            // resolve the source before touching configuration or the
            // warehouse, so a bad invocation fails before any I/O
            let source = resolve_source(payer, source)?;

            let config = WarehouseConfig::from_env()?;
            let mut warehouse = SqliteWarehouse::open(&config)?;

            match pipeline::run_payer_pipeline(&source, payer, &mut warehouse) {
                Ok(summary) => {
                    println!("\n📊 Load Results (run {}):", summary.run_id);
                    println!(
                        "   {}: {} rows in {} chunks",
                        summary.report.table, summary.report.rows, summary.report.chunks
                    );
                    println!("✅ Payer load completed successfully");
                }
                Err(e) => {
                    error!("Payer load failed: {e}");
                    println!("❌ Payer load failed: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
    Ok(())
}
