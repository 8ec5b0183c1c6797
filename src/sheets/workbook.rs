// src/sheets/workbook.rs
use crate::extractors::grid::{Cell, Grid};
use crate::utils::error::SheetError;
use calamine::{Data, Reader, Xlsx};
use chrono::Timelike;
use std::io::Cursor;

pub const DEFAULT_SHEET_NAME: &str = "Finances";

/// Parses an in-memory xlsx workbook and materializes `sheet_name` as a grid
/// anchored at cell A1.
pub fn load_grid(bytes: &[u8], sheet_name: &str) -> Result<Grid, SheetError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;

    let sheet_names = workbook.sheet_names();
    tracing::debug!("Workbook sheets: {:?}", sheet_names);
    if !sheet_names.iter().any(|name| name == sheet_name) {
        return Err(SheetError::SheetNotFound(sheet_name.to_string()));
    }

    let range = workbook.worksheet_range(sheet_name)?;
    // calamine trims the used range; put the leading rows/columns back so
    // absolute column indices stay valid.
    let (row_offset, col_offset) = range
        .start()
        .map(|(row, col)| (row as usize, col as usize))
        .unwrap_or((0, 0));

    let leading_rows = std::iter::repeat_with(Vec::new).take(row_offset);
    let body = range.rows().map(|row| {
        std::iter::repeat(None)
            .take(col_offset)
            .chain(row.iter().map(render_cell))
            .collect::<Vec<Cell>>()
    });
    let grid = Grid::from_rows(leading_rows.chain(body));

    tracing::info!(
        "Loaded sheet [{}] into a {}x{} grid",
        sheet_name,
        grid.height(),
        grid.width()
    );
    Ok(grid)
}

/// Renders a cell the way it reads in the sheet; no numeric or date typing
/// survives past this point.
fn render_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => None,
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => Some(s.clone()),
        Data::Int(i) => Some(i.to_string()),
        Data::Float(f) => Some(f.to_string()),
        Data::Bool(b) => Some(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Data::Error(e) => Some(e.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(value) if value.time().num_seconds_from_midnight() == 0 => {
                Some(value.format("%Y-%m-%d").to_string())
            }
            Some(value) => Some(value.format("%Y-%m-%d %H:%M:%S").to_string()),
            None => Some(dt.as_f64().to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::CellErrorType;

    #[test]
    fn test_render_scalar_cells() {
        assert_eq!(render_cell(&Data::Empty), None);
        assert_eq!(render_cell(&Data::String("Coffee".into())), Some("Coffee".to_string()));
        assert_eq!(render_cell(&Data::Int(42)), Some("42".to_string()));
        assert_eq!(render_cell(&Data::Float(3.5)), Some("3.5".to_string()));
        assert_eq!(render_cell(&Data::Bool(true)), Some("TRUE".to_string()));
        assert_eq!(render_cell(&Data::Error(CellErrorType::Div0)), Some("#DIV/0!".to_string()));
    }

    /// Workbook whose "Finances" used range starts at B2, behind a
    /// leading "Notes" sheet.
    fn offset_workbook() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        workbook
            .add_worksheet()
            .set_name("Notes")
            .unwrap()
            .write_string(0, 0, "ignore me")
            .unwrap();

        let date = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd");
        let timestamp = rust_xlsxwriter::Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        let sheet = workbook.add_worksheet();
        sheet.set_name(DEFAULT_SHEET_NAME).unwrap();
        sheet.write_string(1, 1, "Coffee").unwrap();
        sheet.write_number(1, 2, 3.5).unwrap();
        // 45292 = 2024-01-01 in the 1900 date system
        sheet.write_number_with_format(1, 3, 45292.0, &date).unwrap();
        sheet.write_number_with_format(2, 3, 45292.5, &timestamp).unwrap();
        sheet.write_string(2, 4, "nan").unwrap();

        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_grid_is_anchored_at_a1() {
        let grid = load_grid(&offset_workbook(), DEFAULT_SHEET_NAME).unwrap();

        assert_eq!(grid.height(), 3);
        assert_eq!(grid.width(), 5);
        assert_eq!(grid.row(0).unwrap(), &[None, None, None, None, None]);
        assert_eq!(grid.cell(1, 0), None);
        assert_eq!(grid.cell(1, 1), Some("Coffee"));
        assert_eq!(grid.cell(1, 2), Some("3.5"));
        assert_eq!(grid.cell(2, 4), None);
    }

    #[test]
    fn test_date_cells_render_as_iso_dates() {
        let grid = load_grid(&offset_workbook(), DEFAULT_SHEET_NAME).unwrap();

        assert_eq!(grid.cell(1, 3), Some("2024-01-01"));
        assert_eq!(grid.cell(2, 3), Some("2024-01-01 12:00:00"));
    }

    #[test]
    fn test_missing_sheet_is_reported() {
        let result = load_grid(&offset_workbook(), "Budget");
        assert!(matches!(result, Err(SheetError::SheetNotFound(name)) if name == "Budget"));
    }

    #[test]
    fn test_invalid_workbook_bytes_are_rejected() {
        let result = load_grid(b"not a zip archive", DEFAULT_SHEET_NAME);
        assert!(matches!(result, Err(SheetError::Workbook(_))));
    }
}
