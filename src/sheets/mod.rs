// src/sheets/mod.rs
pub mod client;
pub mod url;
pub mod workbook;

pub use url::ExportFormat;
