// src/extractors/table.rs

// --- Imports ---
use crate::extractors::grid::{Cell, Grid};
use crate::extractors::schema::{
    SchemaRegistry, SectionRule, TableDefinition, TableLayout, TableName, DATA_START_ROW,
    HEADER_ROW,
};
use crate::utils::error::ExtractError;
use serde::Serialize;
use std::collections::BTreeMap;

// --- Data Structures ---

/// One output row; values line up positionally with the table's columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    values: Vec<Cell>,
}

impl Record {
    pub fn values(&self) -> &[Cell] {
        &self.values
    }
}

/// Normalized result of extracting one logical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedTable {
    pub name: TableName,
    pub columns: Vec<&'static str>,
    records: Vec<Record>,
}

impl ExtractedTable {
    pub fn new(name: TableName, columns: Vec<&'static str>) -> Self {
        Self {
            name,
            columns,
            records: Vec::new(),
        }
    }

    /// Appends a record, rejecting any whose width differs from the columns.
    pub fn push(&mut self, values: Vec<Cell>) -> Result<(), ExtractError> {
        if values.len() != self.columns.len() {
            return Err(ExtractError::SchemaMismatch {
                table: self.name.to_string(),
                declared: self.columns.len(),
                expected: values.len(),
            });
        }
        self.records.push(Record { values });
        Ok(())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Value of `field` in record `row`; `None` for absent values and unknown fields.
    #[allow(dead_code)]
    pub fn get(&self, row: usize, field: &str) -> Option<&str> {
        let column = self.columns.iter().position(|c| *c == field)?;
        self.records.get(row)?.values.get(column)?.as_deref()
    }
}

/// Effective / expiration pair parsed from a `DD.MM.YYYY - DD.MM.YYYY` token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DateRange {
    pub effective_date: Option<String>,
    pub expiration_date: Option<String>,
}

impl DateRange {
    /// Splits `token` on its first `-`. The second value of the tuple is
    /// `false` when no separator was present.
    pub fn parse(token: Option<&str>) -> (Self, bool) {
        let token = token.map(str::trim).unwrap_or_default();
        let mut parts = token.splitn(2, '-');
        let effective_date = parts.next().and_then(non_blank);
        let expiration_date = parts.next().and_then(non_blank);
        let well_formed = token.contains('-');
        (
            Self {
                effective_date,
                expiration_date,
            },
            well_formed,
        )
    }
}

fn non_blank(part: &str) -> Option<String> {
    let part = part.trim();
    (!part.is_empty()).then(|| part.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractionWarning {
    /// A section marker row whose date token had no `-` separator.
    MalformedDateRange {
        table: TableName,
        row: usize,
        token: Option<String>,
    },
    /// The table's region held no data rows.
    EmptyTable { table: TableName },
}

/// Per-table outcome of a full extraction run.
#[derive(Debug, Default)]
pub struct ExtractionReport {
    pub tables: BTreeMap<TableName, Result<ExtractedTable, ExtractError>>,
    pub warnings: Vec<ExtractionWarning>,
}

impl ExtractionReport {
    pub fn successes(&self) -> impl Iterator<Item = &ExtractedTable> {
        self.tables.values().filter_map(|r| r.as_ref().ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = (TableName, &ExtractError)> {
        self.tables
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (*name, e)))
    }
}

/// How a row's leading cell classifies it.
enum RowKind {
    SectionMarker,
    Skip,
    Data,
}

// --- Main Extractor Structure ---
pub struct TableExtractor;

impl TableExtractor {
    pub fn new() -> Self {
        Self {}
    }

    /// Extracts every table in `registry`. One table failing does not stop the others.
    pub fn extract_all(&self, grid: &Grid, registry: &SchemaRegistry) -> ExtractionReport {
        let mut report = ExtractionReport::default();

        for definition in registry.iter() {
            let result = self.extract(grid, definition, &mut report.warnings);
            match &result {
                Ok(table) if table.is_empty() => {
                    tracing::warn!("Table {} yielded zero data rows", definition.name);
                    report.warnings.push(ExtractionWarning::EmptyTable {
                        table: definition.name,
                    });
                }
                Ok(table) => {
                    tracing::info!(
                        "Extracted {} records for table {}",
                        table.len(),
                        definition.name
                    );
                }
                Err(e) => {
                    tracing::error!("Failed to extract table {}: {}", definition.name, e);
                }
            }
            report.tables.insert(definition.name, result);
        }

        report
    }

    /// Dispatches on the definition's layout.
    pub fn extract(
        &self,
        grid: &Grid,
        definition: &TableDefinition,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Result<ExtractedTable, ExtractError> {
        definition.validate()?;

        if let Some(headers) = grid.row(HEADER_ROW) {
            if let Some(headers) = headers.get(definition.column_range.clone()) {
                tracing::trace!("Sheet headers for {}: {:?}", definition.name, headers);
            }
        }

        match &definition.layout {
            TableLayout::Simple => self.extract_simple_table(grid, definition),
            TableLayout::MultiSection(rule) => {
                self.extract_multi_section_table(grid, definition, rule, warnings)
            }
        }
    }

    /// Emits one record per data row of a contiguous block, cells taken positionally.
    pub fn extract_simple_table(
        &self,
        grid: &Grid,
        definition: &TableDefinition,
    ) -> Result<ExtractedTable, ExtractError> {
        let mut table = ExtractedTable::new(definition.name, definition.output_columns.clone());

        for (row_index, cells) in grid.region(DATA_START_ROW, definition.column_range.clone())? {
            if Grid::is_blank_row(cells) {
                continue;
            }
            match self.classify(cells, definition, None) {
                RowKind::Data => table.push(cells.to_vec())?,
                _ => {
                    tracing::trace!("Skipping non-data row {} in {}", row_index, definition.name);
                }
            }
        }

        Ok(table)
    }

    /// Walks a table whose records are grouped under section marker rows,
    /// stamping each record with the most recent date range.
    pub fn extract_multi_section_table(
        &self,
        grid: &Grid,
        definition: &TableDefinition,
        rule: &SectionRule,
        warnings: &mut Vec<ExtractionWarning>,
    ) -> Result<ExtractedTable, ExtractError> {
        let mut table = ExtractedTable::new(definition.name, definition.output_columns.clone());
        // No active range until the first marker row.
        let mut current = DateRange::default();

        for (row_index, cells) in grid.region(DATA_START_ROW, definition.column_range.clone())? {
            if Grid::is_blank_row(cells) {
                continue;
            }
            match self.classify(cells, definition, Some(rule)) {
                RowKind::SectionMarker => {
                    let token = cells.get(rule.date_field_offset).cloned().flatten();
                    let (range, well_formed) = DateRange::parse(token.as_deref());
                    if !well_formed {
                        tracing::warn!(
                            "Malformed date range {:?} at row {} in {}",
                            token,
                            row_index,
                            definition.name
                        );
                        warnings.push(ExtractionWarning::MalformedDateRange {
                            table: definition.name,
                            row: row_index,
                            token,
                        });
                    }
                    tracing::debug!(
                        "Date range {:?} active from row {} in {}",
                        range,
                        row_index,
                        definition.name
                    );
                    current = range;
                }
                RowKind::Skip => {
                    tracing::trace!("Skipping non-data row {} in {}", row_index, definition.name);
                }
                RowKind::Data => {
                    let mut values = cells.to_vec();
                    values.push(current.effective_date.clone());
                    values.push(current.expiration_date.clone());
                    table.push(values)?;
                }
            }
        }

        Ok(table)
    }

    fn classify(
        &self,
        cells: &[Cell],
        definition: &TableDefinition,
        rule: Option<&SectionRule>,
    ) -> RowKind {
        // Blank and `nan` cells were already collapsed to None by the grid.
        let Some(first) = cells.first().and_then(|c| c.as_deref()).map(str::trim) else {
            return RowKind::Skip;
        };
        if rule.is_some_and(|r| first == r.section_marker) {
            RowKind::SectionMarker
        } else if definition.is_skip_marker(first) {
            RowKind::Skip
        } else {
            RowKind::Data
        }
    }
}
