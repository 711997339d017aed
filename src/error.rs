use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV read failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("spreadsheet read failed: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("warehouse error: {0}")]
    Warehouse(#[from] rusqlite::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("missing required columns: {missing:?}. Columns found: {found:?}")]
    MissingColumns {
        missing: Vec<String>,
        found: Vec<String>,
    },

    #[error("column '{0}' not found in batch")]
    ColumnNotFound(String),

    #[error("unsupported source file type: {0}")]
    UnsupportedFormat(String),

    #[error("row has {got} values but batch has {expected} columns")]
    RowShape { expected: usize, got: usize },
}

pub type Result<T> = std::result::Result<T, EtlError>;
