// src/utils/error.rs
use std::ops::Range;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error: {0}")]
    Http(reqwest::StatusCode), // e.g., 404 Not Found, 403 Forbidden

    #[error("Invalid spreadsheet url: {0}")]
    InvalidUrl(String),

    #[error("Failed to read workbook: {0}")]
    Workbook(#[from] calamine::XlsxError),

    #[error("Workbook is missing [{0}] sheet")]
    SheetNotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    #[error("Schema mismatch for {table}: {declared} output columns declared, {expected} emitted")]
    SchemaMismatch {
        table: String,
        declared: usize,
        expected: usize,
    },

    #[error("Invalid table definition {table}: {reason}")]
    InvalidDefinition { table: String, reason: String },

    #[error("Column range {start}..{end} exceeds grid width {width}")]
    ColumnOutOfRange { start: usize, end: usize, width: usize },
}

impl ExtractError {
    pub fn column_out_of_range(range: &Range<usize>, width: usize) -> Self {
        ExtractError::ColumnOutOfRange {
            start: range.start,
            end: range.end,
            width,
        }
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    #[error("Invalid link lifetime: {0}s")]
    InvalidLinkTtl(i64),
}

impl From<csv::Error> for StorageError {
    fn from(e: csv::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(e: serde_json::Error) -> Self {
        StorageError::SerializationError(e.to_string())
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("Spreadsheet acquisition failed: {0}")]
    Sheet(#[from] SheetError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}
