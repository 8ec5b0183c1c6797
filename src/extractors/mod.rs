// src/extractors/mod.rs
pub mod grid;
pub mod schema;
pub mod table;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use grid::{Cell, Grid};
#[allow(unused_imports)]
pub use schema::{SchemaRegistry, TableDefinition, TableLayout, TableName};
#[allow(unused_imports)]
pub use table::{ExtractedTable, ExtractionReport, ExtractionWarning, TableExtractor};
