// src/sheets/client.rs
use crate::utils::error::SheetError;
use reqwest::header;
use std::path::Path;
use std::time::Duration;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(3);
// Connect budget plus 10s for the export body.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(13);

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Creates a reqwest client configured for the sheet export endpoint.
fn build_sheets_client() -> Result<reqwest::Client, reqwest::Error> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .build()
}

/// Downloads the exported workbook into memory.
pub async fn download_workbook(url: &str) -> Result<Vec<u8>, SheetError> {
    let client = build_sheets_client()?;

    tracing::info!("Downloading workbook from: {}", url);

    let response = client
        .get(url)
        .header(header::ACCEPT, format!("{},*/*", XLSX_MIME))
        .send()
        .await?; // Propagates reqwest::Error as SheetError::Network

    let status = response.status();
    if !status.is_success() {
        tracing::error!("HTTP error status: {} for URL: {}", status, url);
        return Err(SheetError::Http(status));
    }

    let body = response.bytes().await?;
    tracing::debug!("Successfully downloaded {} bytes from {}", body.len(), url);

    Ok(body.to_vec())
}

/// Reads a workbook exported earlier from disk.
pub async fn read_workbook_file(path: &Path) -> Result<Vec<u8>, SheetError> {
    tracing::info!("Reading workbook from: {}", path.display());
    let bytes = tokio::fs::read(path).await?;
    tracing::debug!("Read {} bytes from {}", bytes.len(), path.display());
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_workbook_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Finances.xlsx");
        std::fs::write(&path, b"PK\x03\x04").unwrap();

        let bytes = tokio_test::block_on(read_workbook_file(&path)).unwrap();
        assert_eq!(bytes, b"PK\x03\x04");
    }

    #[test]
    fn test_read_missing_workbook_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = tokio_test::block_on(read_workbook_file(&dir.path().join("missing.xlsx")));
        assert!(matches!(result, Err(SheetError::Io(_))));
    }
}
