// src/extractors/grid.rs
use crate::utils::error::ExtractError;
use std::ops::Range;

/// A single worksheet cell. `None` is the only "no value" representation.
pub type Cell = Option<String>;

/// Placeholder some sheet loaders emit for blank cells.
const NAN_SENTINEL: &str = "nan";

/// Immutable, fixed-width 2-D snapshot of one worksheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Grid {
    rows: Vec<Vec<Cell>>,
    width: usize,
}

impl Grid {
    /// Builds a grid from raw rows, padding ragged rows with `None` and
    /// collapsing blank / `nan` cells to `None`.
    pub fn from_rows<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = Cell>,
    {
        let mut rows: Vec<Vec<Cell>> = rows
            .into_iter()
            .map(|row| row.into_iter().map(normalize_cell).collect())
            .collect();
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        for row in &mut rows {
            row.resize(width, None);
        }
        Self { rows, width }
    }

    /// Convenience constructor for literal string rows.
    pub fn from_strings<R, C, S>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::from_rows(
            rows.into_iter()
                .map(|row| row.into_iter().map(|s| Some(s.into())).collect::<Vec<Cell>>()),
        )
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().map(Vec::as_slice)
    }

    pub fn row(&self, index: usize) -> Option<&[Cell]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    #[allow(dead_code)]
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col)?.as_deref()
    }

    /// Slices the grid to rows `>= first_row` and the given column span.
    /// Each item carries the absolute row index alongside the sliced cells.
    pub fn region(
        &self,
        first_row: usize,
        columns: Range<usize>,
    ) -> Result<Vec<(usize, &[Cell])>, ExtractError> {
        if columns.start >= columns.end || columns.end > self.width {
            return Err(ExtractError::column_out_of_range(&columns, self.width));
        }

        Ok(self
            .rows
            .iter()
            .enumerate()
            .skip(first_row)
            .map(|(index, row)| (index, &row[columns.clone()]))
            .collect())
    }

    pub fn is_blank_row(cells: &[Cell]) -> bool {
        cells.iter().all(Option::is_none)
    }
}

fn normalize_cell(cell: Cell) -> Cell {
    cell.filter(|value| {
        let trimmed = value.trim();
        !trimmed.is_empty() && trimmed != NAN_SENTINEL
    })
}
