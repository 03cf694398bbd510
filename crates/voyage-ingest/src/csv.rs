//! CSV source reading through Polars.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use polars::prelude::{AnyValue, CsvParseOptions, CsvReadOptions, DataFrame, NullValues, SerReader};
use voyage_model::{CellValue, Table};

use crate::error::{IngestError, Result};
use crate::header::{build_column_names, parse_csv_line};
use crate::options::IngestOptions;

/// Reads a CSV file with a single header row into a table.
///
/// Column names come from the raw header line, so blank and repeated
/// headers are named the same way as in workbooks.
pub fn read_csv_table(path: &Path, options: &IngestOptions) -> Result<Table> {
    let header = read_header_line(path)?;
    let null_values = NullValues::AllColumns(options.na_values().map(Into::into).collect());
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .with_parse_options(CsvParseOptions::default().with_null_values(Some(null_values)))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?
        .finish()
        .map_err(|e| IngestError::CsvParse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    tracing::debug!(
        path = %path.display(),
        rows = df.height(),
        columns = df.width(),
        "Read CSV source"
    );
    if header.len() == df.width() {
        let header: Vec<CellValue> = header.into_iter().map(CellValue::Text).collect();
        table_with_header(&df, &header, options)
    } else {
        // A header spanning several lines; fall back to the parsed names.
        tracing::debug!(
            path = %path.display(),
            fields = header.len(),
            columns = df.width(),
            "Header line does not match parsed columns"
        );
        table_from_dataframe(&df, options)
    }
}

/// Converts a DataFrame into a table, row by row.
pub fn table_from_dataframe(df: &DataFrame, options: &IngestOptions) -> Result<Table> {
    let header: Vec<CellValue> = df
        .get_column_names()
        .iter()
        .map(|name| CellValue::from(name.as_str()))
        .collect();
    table_with_header(df, &header, options)
}

fn table_with_header(df: &DataFrame, header: &[CellValue], options: &IngestOptions) -> Result<Table> {
    let mut table = Table::new(build_column_names(header));
    for row in 0..df.height() {
        let mut cells = Vec::with_capacity(df.width());
        for column in df.get_columns() {
            let value = column.get(row)?;
            cells.push(options.normalize(cell_from_any(&value)));
        }
        table.push_row(cells);
    }
    Ok(table)
}

/// Fields of the first line of the file, without a byte order mark.
fn read_header_line(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            IngestError::FileNotFound {
                path: path.to_path_buf(),
            }
        } else {
            IngestError::FileRead {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })?;
    let mut line = String::new();
    BufReader::new(file)
        .read_line(&mut line)
        .map_err(|e| IngestError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
    let line = line.strip_prefix('\u{feff}').unwrap_or(&line);
    Ok(parse_csv_line(line.trim_end_matches(['\r', '\n'])))
}

fn cell_from_any(value: &AnyValue<'_>) -> CellValue {
    match value {
        AnyValue::Null => CellValue::Missing,
        AnyValue::Boolean(value) => CellValue::Bool(*value),
        AnyValue::String(value) => CellValue::Text((*value).to_string()),
        AnyValue::StringOwned(value) => CellValue::Text(value.to_string()),
        AnyValue::Int32(value) => CellValue::Number(f64::from(*value)),
        AnyValue::Int64(value) => CellValue::Number(*value as f64),
        AnyValue::UInt32(value) => CellValue::Number(f64::from(*value)),
        AnyValue::UInt64(value) => CellValue::Number(*value as f64),
        AnyValue::Float32(value) => CellValue::Number(f64::from(*value)),
        AnyValue::Float64(value) => CellValue::Number(*value),
        other => CellValue::Text(other.to_string()),
    }
}
