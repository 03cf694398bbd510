//! Spreadsheet reading through calamine.

use std::io::{Cursor, Read, Seek};
use std::path::Path;

use calamine::{Data, Reader, Sheets, open_workbook_auto, open_workbook_auto_from_rs};
use voyage_model::{CellValue, Table};

use crate::error::{IngestError, Result};
use crate::header::build_column_names;
use crate::options::IngestOptions;

/// Reads the source sheet of a workbook file (XLSX, XLSM, XLSB, XLS or ODS).
pub fn read_workbook_table(path: &Path, options: &IngestOptions) -> Result<Table> {
    let workbook = open_workbook_auto(path)?;
    read_sheet(workbook, options)
}

/// Reads the source sheet of an in-memory workbook, sniffing its format.
pub fn read_workbook_bytes(bytes: &[u8], options: &IngestOptions) -> Result<Table> {
    let workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;
    read_sheet(workbook, options)
}

fn read_sheet<RS: Read + Seek>(mut workbook: Sheets<RS>, options: &IngestOptions) -> Result<Table> {
    let sheet_names = workbook.sheet_names();
    let sheet = match &options.sheet {
        Some(name) if sheet_names.iter().any(|candidate| candidate == name) => name.clone(),
        Some(name) => {
            return Err(IngestError::SheetNotFound {
                sheet: name.clone(),
                available: sheet_names,
            });
        }
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| IngestError::Workbook {
                message: "workbook has no sheets".to_string(),
            })?,
    };

    let range = workbook.worksheet_range(&sheet)?;
    let rows: Vec<Vec<CellValue>> = range
        .rows()
        .map(|row| row.iter().map(cell_from_data).collect())
        .collect();
    tracing::debug!(
        sheet = %sheet,
        rows = rows.len(),
        columns = range.width(),
        "Read source sheet"
    );
    table_from_rows(&sheet, rows, options)
}

/// Builds a table from raw sheet rows: the first non-empty row is the header.
///
/// NA tokens become missing, trailing blank rows are dropped and interior
/// blank rows are kept so row positions stay aligned.
pub fn table_from_rows(
    sheet: &str,
    rows: Vec<Vec<CellValue>>,
    options: &IngestOptions,
) -> Result<Table> {
    let mut rows = rows.into_iter().skip_while(|row| is_blank(row));
    let header = rows.next().ok_or_else(|| IngestError::EmptySheet {
        sheet: sheet.to_string(),
    })?;

    let mut table = Table::new(build_column_names(&header));
    let mut data: Vec<Vec<CellValue>> = rows
        .map(|row| row.into_iter().map(|cell| options.normalize(cell)).collect())
        .collect();
    while data.last().is_some_and(|row| is_blank(row)) {
        data.pop();
    }
    for row in data {
        table.push_row(row);
    }
    Ok(table)
}

fn is_blank(row: &[CellValue]) -> bool {
    row.iter().all(|cell| match cell {
        CellValue::Text(text) => text.trim().is_empty(),
        other => other.is_missing(),
    })
}

fn cell_from_data(data: &Data) -> CellValue {
    match data {
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Float(value) => CellValue::Number(*value),
        Data::String(value) => CellValue::Text(value.clone()),
        Data::Bool(value) => CellValue::Bool(*value),
        Data::DateTime(value) => CellValue::DateTime(value.as_f64()),
        Data::DateTimeIso(value) | Data::DurationIso(value) => CellValue::Text(value.clone()),
        Data::Error(_) | Data::Empty => CellValue::Missing,
    }
}
