// src/extractors/schema.rs
//
// Table layout of the "Finances" sheet, pinned by absolute 0-based column
// index (A=0 ... Z=25, AA=26 ... AW=48).
//
// Row 0: empty filler row
// Row 1: table name annotations
// Row 2: date range annotations
// Row 3: column headers (documentation only, never matched against)
// Row 4+: data rows

use crate::utils::error::ExtractError;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::str::FromStr;

pub const HEADER_ROW: usize = 3;
pub const DATA_START_ROW: usize = 4;

/// Derived columns appended to every multi-section record.
pub const DERIVED_DATE_COLUMNS: [&str; 2] = ["effective_date", "expiration_date"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TableName {
    #[serde(rename = "var_expenses")]
    VariableExpenses,
    FixedCosts,
    Investments,
    Income,
    NewFoodItems,
}

impl TableName {
    pub const ALL: [TableName; 5] = [
        TableName::VariableExpenses,
        TableName::FixedCosts,
        TableName::Investments,
        TableName::Income,
        TableName::NewFoodItems,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TableName::VariableExpenses => "var_expenses",
            TableName::FixedCosts => "fixed_costs",
            TableName::Investments => "investments",
            TableName::Income => "income",
            TableName::NewFoodItems => "new_food_items",
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TableName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = TableName::ALL.iter().map(TableName::as_str).collect();
                format!("unknown table '{}', expected one of: {}", s, known.join(", "))
            })
    }
}

/// Where the date range of a multi-section table lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionRule {
    /// First-cell token that introduces a date range row, e.g. `Date:`.
    pub section_marker: &'static str,
    /// Offset within the span of the cell holding `DD.MM.YYYY - DD.MM.YYYY`.
    pub date_field_offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableLayout {
    /// One contiguous block of records.
    Simple,
    /// Records grouped under embedded date range rows.
    MultiSection(SectionRule),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub name: TableName,
    /// Absolute grid columns, end exclusive.
    pub column_range: Range<usize>,
    pub output_columns: Vec<&'static str>,
    /// Trimmed first-cell values marking non-data rows.
    pub skip_markers: HashSet<&'static str>,
    pub layout: TableLayout,
}

impl TableDefinition {
    pub fn span_width(&self) -> usize {
        self.column_range.len()
    }

    /// Number of values every emitted record carries.
    pub fn record_width(&self) -> usize {
        match self.layout {
            TableLayout::Simple => self.span_width(),
            TableLayout::MultiSection(_) => self.span_width() + DERIVED_DATE_COLUMNS.len(),
        }
    }

    pub fn is_skip_marker(&self, value: &str) -> bool {
        self.skip_markers.contains(value)
    }

    pub fn validate(&self) -> Result<(), ExtractError> {
        if self.column_range.is_empty() {
            return Err(self.invalid(format!(
                "empty column range {}..{}",
                self.column_range.start, self.column_range.end
            )));
        }

        if let TableLayout::MultiSection(rule) = &self.layout {
            if rule.section_marker.trim().is_empty() {
                return Err(self.invalid("blank section marker".to_string()));
            }
            if rule.date_field_offset >= self.span_width() {
                return Err(self.invalid(format!(
                    "date field offset {} outside span of width {}",
                    rule.date_field_offset,
                    self.span_width()
                )));
            }
        }

        if self.output_columns.len() != self.record_width() {
            return Err(ExtractError::SchemaMismatch {
                table: self.name.to_string(),
                declared: self.output_columns.len(),
                expected: self.record_width(),
            });
        }

        Ok(())
    }

    fn invalid(&self, reason: String) -> ExtractError {
        ExtractError::InvalidDefinition {
            table: self.name.to_string(),
            reason,
        }
    }
}

/// Table definitions keyed by name.
///
/// Names are unique. A definition that fails `validate` is kept so that
/// extraction reports it as that table's failure.
#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    definitions: Vec<TableDefinition>,
}

impl SchemaRegistry {
    pub fn new(definitions: Vec<TableDefinition>) -> Result<Self, ExtractError> {
        let mut seen = HashSet::new();
        for definition in &definitions {
            if let Err(e) = definition.validate() {
                tracing::warn!("Keeping invalid definition {}: {}", definition.name, e);
            }
            if !seen.insert(definition.name) {
                return Err(definition.invalid("duplicate table definition".to_string()));
            }
        }
        Ok(Self { definitions })
    }

    /// The five tables of the "Finances" sheet.
    pub fn finances() -> Result<Self, ExtractError> {
        Self::new(vec![
            // B:I
            TableDefinition {
                name: TableName::VariableExpenses,
                column_range: 1..9,
                output_columns: vec![
                    "description",
                    "category",
                    "store",
                    "cost",
                    "purchasing_date",
                    "is_planned",
                    "contains_indulgence",
                    "sensitivities",
                ],
                skip_markers: HashSet::from(["description", "border"]),
                layout: TableLayout::Simple,
            },
            // K:O
            TableDefinition {
                name: TableName::FixedCosts,
                column_range: 10..15,
                output_columns: with_derived_dates(&[
                    "category",
                    "description",
                    "monthly_interval",
                    "billed_cost",
                    "monthly_cost",
                ]),
                skip_markers: HashSet::from(["category", "SUM", "border"]),
                layout: TableLayout::MultiSection(SectionRule {
                    section_marker: "Date:",
                    date_field_offset: 1,
                }),
            },
            // Q:AB
            TableDefinition {
                name: TableName::Investments,
                column_range: 16..28,
                output_columns: vec![
                    "execution_type",
                    "description",
                    "isin",
                    "investment_type",
                    "marketplace",
                    "units",
                    "price_per_unit",
                    "total_price",
                    "fees",
                    "execution_date",
                    "pct_of_profit_taxed",
                    "profit_amt",
                ],
                skip_markers: HashSet::from(["execution_type", "border"]),
                layout: TableLayout::Simple,
            },
            // AJ:AM
            TableDefinition {
                name: TableName::Income,
                column_range: 35..39,
                output_columns: with_derived_dates(&[
                    "description",
                    "type",
                    "monthly_interval",
                    "value",
                ]),
                skip_markers: HashSet::from(["description", "border"]),
                layout: TableLayout::MultiSection(SectionRule {
                    section_marker: "Date:",
                    date_field_offset: 1,
                }),
            },
            // AP:AW
            TableDefinition {
                name: TableName::NewFoodItems,
                column_range: 41..49,
                output_columns: vec![
                    "food_item",
                    "brand",
                    "store",
                    "main_macro",
                    "kcal_amount",
                    "weight",
                    "price",
                    "last_update",
                ],
                skip_markers: HashSet::from(["food_item", "[100 grams]", "border"]),
                layout: TableLayout::Simple,
            },
        ])
    }

    #[allow(dead_code)]
    pub fn get(&self, name: TableName) -> Option<&TableDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TableDefinition> {
        self.definitions.iter()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Keeps only the named tables; an empty selection keeps everything.
    pub fn select(self, names: &[TableName]) -> Self {
        if names.is_empty() {
            return self;
        }
        Self {
            definitions: self
                .definitions
                .into_iter()
                .filter(|d| names.contains(&d.name))
                .collect(),
        }
    }
}

fn with_derived_dates(columns: &[&'static str]) -> Vec<&'static str> {
    columns
        .iter()
        .copied()
        .chain(DERIVED_DATE_COLUMNS)
        .collect()
}
