use std::path::Path;

use rusqlite::types::{ToSqlOutput, ValueRef};
use rusqlite::{Connection, ToSql};
use tracing::{debug, info};

use crate::config::WarehouseConfig;
use crate::constants::WRITE_CHUNK_SIZE;
use crate::error::Result;
use crate::types::{RecordBatch, Value};
use crate::warehouse::{TableSchema, Warehouse, WriteReport};

/// Embedded SQL warehouse. The connection is scoped to this value and
/// released on every exit path when it drops.
pub struct SqliteWarehouse {
    conn: Connection,
}

impl SqliteWarehouse {
    /// Open the warehouse described by the environment configuration. The
    /// database name picks the on-disk file; the remaining session settings
    /// are logged so a run can be traced back to its target.
    pub fn open(config: &WarehouseConfig) -> Result<Self> {
        info!(
            "Connecting to warehouse {} as {} (role {}, warehouse {}, database {}, schema {})",
            config.account,
            config.user,
            config.role,
            config.warehouse,
            config.database,
            config.schema
        );
        Self::open_at(format!("{}.db", config.database.to_lowercase()))
    }

    /// Open a warehouse file directly, creating it if absent
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }
}

impl Warehouse for SqliteWarehouse {
    fn ensure_table(&mut self, schema: &TableSchema) -> Result<()> {
        self.conn.execute_batch(&schema.ddl())?;
        info!("Table {} verified/created successfully", schema.name);
        Ok(())
    }

    fn write(&mut self, batch: &RecordBatch, table: &str) -> Result<WriteReport> {
        // auto-create from an inferred schema when ensure was skipped
        self.conn
            .execute_batch(&TableSchema::infer_from_batch(table, batch).ddl())?;

        let column_list = batch.columns().join(", ");
        let placeholders = (1..=batch.columns().len())
            .map(|n| format!("?{n}"))
            .collect::<Vec<_>>()
            .join(", ");
        let insert_sql = format!("INSERT INTO {table} ({column_list}) VALUES ({placeholders})");

        let mut chunks = 0;
        let mut rows = 0;
        for chunk in batch.rows().chunks(WRITE_CHUNK_SIZE) {
            let tx = self.conn.transaction()?;
            {
                let mut stmt = tx.prepare(&insert_sql)?;
                for row in chunk {
                    stmt.execute(rusqlite::params_from_iter(row.iter()))?;
                    rows += 1;
                }
            }
            tx.commit()?;
            chunks += 1;
            debug!("Committed chunk {} ({} rows so far)", chunks, rows);
        }

        Ok(WriteReport {
            table: table.to_string(),
            success: true,
            rows,
            chunks,
        })
    }
}

impl ToSql for Value {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Value::Text(s) => ToSqlOutput::Borrowed(ValueRef::Text(s.as_bytes())),
            Value::Int(i) => ToSqlOutput::Owned(rusqlite::types::Value::Integer(*i)),
            Value::Float(f) => ToSqlOutput::Owned(rusqlite::types::Value::Real(*f)),
            Value::Date(d) => {
                ToSqlOutput::Owned(rusqlite::types::Value::Text(d.format("%Y-%m-%d").to_string()))
            }
            Value::Timestamp(t) => {
                ToSqlOutput::Owned(rusqlite::types::Value::Text(t.to_rfc3339()))
            }
            Value::Null => ToSqlOutput::Owned(rusqlite::types::Value::Null),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::warehouse::ColumnDef;

    fn claims_schema() -> TableSchema {
        TableSchema {
            name: "GENERIC_CLAIMS".to_string(),
            columns: vec![
                ColumnDef::new("MEMBER_ID", "TEXT"),
                ColumnDef::new("CLAIM_AMOUNT", "REAL"),
                ColumnDef::with_default("INGESTION_TIMESTAMP", "TIMESTAMP", "CURRENT_TIMESTAMP"),
            ],
        }
    }

    fn sample_batch() -> RecordBatch {
        let mut batch = RecordBatch::new(vec![
            "MEMBER_ID".to_string(),
            "CLAIM_AMOUNT".to_string(),
        ]);
        batch
            .push_row(vec![Value::Text("M900".to_string()), Value::Float(500.0)])
            .unwrap();
        batch
    }

    #[test]
    fn test_ensure_then_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut warehouse = SqliteWarehouse::open_at(dir.path().join("wh.db")).unwrap();

        warehouse.ensure_table(&claims_schema()).unwrap();
        let report = warehouse.write(&sample_batch(), "GENERIC_CLAIMS").unwrap();

        assert!(report.success);
        assert_eq!(report.rows, 1);
        assert_eq!(report.chunks, 1);

        let count: i64 = warehouse
            .conn
            .query_row("SELECT COUNT(*) FROM GENERIC_CLAIMS", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        // the default fires for columns absent from the batch
        let stamp: Option<String> = warehouse
            .conn
            .query_row(
                "SELECT INGESTION_TIMESTAMP FROM GENERIC_CLAIMS",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert!(stamp.is_some());
    }

    #[test]
    fn test_write_auto_creates_when_ensure_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let mut warehouse = SqliteWarehouse::open_at(dir.path().join("wh.db")).unwrap();

        let report = warehouse.write(&sample_batch(), "RAW_USER_DATA").unwrap();
        assert_eq!(report.rows, 1);

        let count: i64 = warehouse
            .conn
            .query_row("SELECT COUNT(*) FROM RAW_USER_DATA", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_ensure_table_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut warehouse = SqliteWarehouse::open_at(dir.path().join("wh.db")).unwrap();

        warehouse.ensure_table(&claims_schema()).unwrap();
        warehouse.write(&sample_batch(), "GENERIC_CLAIMS").unwrap();
        warehouse.ensure_table(&claims_schema()).unwrap();

        let count: i64 = warehouse
            .conn
            .query_row("SELECT COUNT(*) FROM GENERIC_CLAIMS", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }

    #[test]
    fn test_null_and_date_values_bind() {
        let dir = tempfile::tempdir().unwrap();
        let mut warehouse = SqliteWarehouse::open_at(dir.path().join("wh.db")).unwrap();

        let mut batch = RecordBatch::new(vec!["D".to_string(), "N".to_string()]);
        batch
            .push_row(vec![
                Value::Date(chrono::NaiveDate::from_ymd_opt(2025, 2, 1).unwrap()),
                Value::Null,
            ])
            .unwrap();

        let report = warehouse.write(&batch, "T").unwrap();
        assert_eq!(report.rows, 1);

        let d: String = warehouse
            .conn
            .query_row("SELECT D FROM T", [], |row| row.get(0))
            .unwrap();
        assert_eq!(d, "2025-02-01");
    }
}
