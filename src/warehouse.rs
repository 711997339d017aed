use std::collections::HashMap;

use serde::Serialize;
use tracing::debug;

use crate::constants::WRITE_CHUNK_SIZE;
use crate::error::Result;
use crate::types::{RecordBatch, Value};

/// One column of a destination table
#[derive(Debug, Clone)]
pub struct ColumnDef {
    pub name: String,
    pub sql_type: String,
    pub default: Option<String>,
}

impl ColumnDef {
    pub fn new(name: &str, sql_type: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            default: None,
        }
    }

    pub fn with_default(name: &str, sql_type: &str, default: &str) -> Self {
        Self {
            name: name.to_string(),
            sql_type: sql_type.to_string(),
            default: Some(default.to_string()),
        }
    }
}

/// Destination table descriptor: name plus column schema
#[derive(Debug, Clone)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableSchema {
    /// Derive a schema from a batch, typing each column by its first
    /// non-null value. All-null columns fall back to TEXT.
    pub fn infer_from_batch(name: &str, batch: &RecordBatch) -> Self {
        let columns = batch
            .columns()
            .iter()
            .enumerate()
            .map(|(idx, column)| {
                let sql_type = batch
                    .rows()
                    .iter()
                    .map(|row| &row[idx])
                    .find(|value| !value.is_null())
                    .map(sql_type_for)
                    .unwrap_or("TEXT");
                ColumnDef::new(column, sql_type)
            })
            .collect();
        Self {
            name: name.to_string(),
            columns,
        }
    }

    /// Idempotent create statement for this table
    pub fn ddl(&self) -> String {
        let columns = self
            .columns
            .iter()
            .map(|column| match &column.default {
                Some(default) => {
                    format!("{} {} DEFAULT {}", column.name, column.sql_type, default)
                }
                None => format!("{} {}", column.name, column.sql_type),
            })
            .collect::<Vec<_>>()
            .join(", ");
        format!("CREATE TABLE IF NOT EXISTS {} ({})", self.name, columns)
    }
}

fn sql_type_for(value: &Value) -> &'static str {
    match value {
        Value::Text(_) => "TEXT",
        Value::Int(_) => "INTEGER",
        Value::Float(_) => "REAL",
        Value::Date(_) => "DATE",
        Value::Timestamp(_) => "TIMESTAMP",
        Value::Null => "TEXT",
    }
}

/// Outcome of one warehouse write
#[derive(Debug, Clone, Serialize)]
pub struct WriteReport {
    pub table: String,
    pub success: bool,
    pub rows: usize,
    pub chunks: usize,
}

/// Capability contract for warehouse strategies. `ensure_table` is an
/// idempotent create; `write` appends and auto-creates from an inferred
/// schema when the explicit ensure step was skipped.
pub trait Warehouse {
    fn ensure_table(&mut self, schema: &TableSchema) -> Result<()>;
    fn write(&mut self, batch: &RecordBatch, table: &str) -> Result<WriteReport>;
}

pub fn chunk_count(rows: usize) -> usize {
    rows.div_ceil(WRITE_CHUNK_SIZE)
}

/// In-memory warehouse for development and tests
pub struct InMemoryWarehouse {
    tables: HashMap<String, RecordBatch>,
}

impl InMemoryWarehouse {
    pub fn new() -> Self {
        Self {
            tables: HashMap::new(),
        }
    }

    pub fn table(&self, name: &str) -> Option<&RecordBatch> {
        self.tables.get(name)
    }

    pub fn row_count(&self, name: &str) -> usize {
        self.tables.get(name).map(|t| t.len()).unwrap_or(0)
    }
}

impl Default for InMemoryWarehouse {
    fn default() -> Self {
        Self::new()
    }
}

impl Warehouse for InMemoryWarehouse {
    fn ensure_table(&mut self, schema: &TableSchema) -> Result<()> {
        self.tables.entry(schema.name.clone()).or_insert_with(|| {
            debug!("Created table {}", schema.name);
            RecordBatch::new(schema.columns.iter().map(|c| c.name.clone()).collect())
        });
        Ok(())
    }

    fn write(&mut self, batch: &RecordBatch, table: &str) -> Result<WriteReport> {
        let stored = self
            .tables
            .entry(table.to_string())
            .or_insert_with(|| RecordBatch::new(batch.columns().to_vec()));

        // append aligned by column name; cells the table does not know
        // about are dropped, cells the batch lacks become null
        let target_columns = stored.columns().to_vec();
        for (row_idx, _) in batch.rows().iter().enumerate() {
            let aligned = target_columns
                .iter()
                .map(|column| batch.get(row_idx, column).cloned().unwrap_or(Value::Null))
                .collect();
            stored.push_row(aligned)?;
        }

        debug!("Appended {} rows to {}", batch.len(), table);
        Ok(WriteReport {
            table: table.to_string(),
            success: true,
            rows: batch.len(),
            chunks: chunk_count(batch.len()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_with_rows(n: usize) -> RecordBatch {
        let mut batch = RecordBatch::new(vec!["ID".to_string()]);
        for i in 0..n {
            batch.push_row(vec![Value::Int(i as i64)]).unwrap();
        }
        batch
    }

    #[test]
    fn test_write_auto_creates_table() {
        let mut warehouse = InMemoryWarehouse::new();
        let report = warehouse.write(&batch_with_rows(3), "T").unwrap();

        assert!(report.success);
        assert_eq!(report.rows, 3);
        assert_eq!(report.chunks, 1);
        assert_eq!(warehouse.row_count("T"), 3);
    }

    #[test]
    fn test_ensure_table_is_idempotent() {
        let mut warehouse = InMemoryWarehouse::new();
        let schema = TableSchema {
            name: "T".to_string(),
            columns: vec![ColumnDef::new("ID", "INTEGER")],
        };

        warehouse.ensure_table(&schema).unwrap();
        warehouse.write(&batch_with_rows(2), "T").unwrap();
        warehouse.ensure_table(&schema).unwrap();

        // re-ensuring never clobbers existing rows
        assert_eq!(warehouse.row_count("T"), 2);
    }

    #[test]
    fn test_successive_writes_append() {
        let mut warehouse = InMemoryWarehouse::new();
        warehouse.write(&batch_with_rows(2), "T").unwrap();
        warehouse.write(&batch_with_rows(3), "T").unwrap();
        assert_eq!(warehouse.row_count("T"), 5);
    }

    #[test]
    fn test_infer_schema_types_from_values() {
        let mut batch = RecordBatch::new(vec![
            "NAME".to_string(),
            "AMOUNT".to_string(),
            "EMPTY".to_string(),
        ]);
        batch
            .push_row(vec![
                Value::Text("x".to_string()),
                Value::Float(1.5),
                Value::Null,
            ])
            .unwrap();

        let schema = TableSchema::infer_from_batch("T", &batch);
        let types: Vec<&str> = schema.columns.iter().map(|c| c.sql_type.as_str()).collect();
        assert_eq!(types, vec!["TEXT", "REAL", "TEXT"]);
    }

    #[test]
    fn test_ddl_renders_defaults() {
        let schema = TableSchema {
            name: "T".to_string(),
            columns: vec![
                ColumnDef::new("ID", "TEXT"),
                ColumnDef::with_default("STAMP", "TIMESTAMP", "CURRENT_TIMESTAMP"),
            ],
        };
        assert_eq!(
            schema.ddl(),
            "CREATE TABLE IF NOT EXISTS T (ID TEXT, STAMP TIMESTAMP DEFAULT CURRENT_TIMESTAMP)"
        );
    }
}
