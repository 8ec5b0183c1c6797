// src/storage/tsv.rs
use crate::extractors::table::ExtractedTable;
use crate::extractors::Grid;
use crate::utils::error::StorageError;

/// Serializes a table as tab-separated text with a header row.
/// Absent values become empty fields.
pub fn to_tsv(table: &ExtractedTable) -> Result<Vec<u8>, StorageError> {
    let mut writer = tsv_writer();
    writer.write_record(&table.columns)?;
    for record in table.records() {
        writer.write_record(record.values().iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    finish(writer)
}

/// Dumps a whole grid, used for debugging sheet layout changes.
pub fn grid_to_tsv(grid: &Grid) -> Result<Vec<u8>, StorageError> {
    let mut writer = tsv_writer();
    for row in grid.rows() {
        writer.write_record(row.iter().map(|v| v.as_deref().unwrap_or("")))?;
    }
    finish(writer)
}

fn tsv_writer() -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_writer(Vec::new())
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<Vec<u8>, StorageError> {
    writer
        .into_inner()
        .map_err(|e| StorageError::SerializationError(e.to_string()))
}
