//! Source table ingestion.
//!
//! Loads the consumption report that feeds the column mapper into a
//! [`voyage_model::Table`].
//!
//! # Features
//!
//! - **Workbooks**: XLSX, XLSM, XLSB, XLS and ODS through calamine
//! - **CSV**: single-header CSV through Polars
//! - **Headers**: trimmed, blank headers named by position, duplicates suffixed
//! - **Missing values**: empty cells, error cells and NA tokens read as missing
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use voyage_ingest::{IngestOptions, read_source_table};
//!
//! let table = read_source_table(Path::new("consumption.xlsx"), &IngestOptions::default())?;
//! ```

mod csv;
mod error;
mod header;
mod options;
mod workbook;

use std::path::Path;

use voyage_model::Table;

// === Error Types ===
pub use error::{IngestError, Result};

// === Options ===
pub use options::{DEFAULT_NA_VALUES, IngestOptions};

// === Readers ===
pub use csv::{read_csv_table, table_from_dataframe};
pub use header::{build_column_names, normalize_header};
pub use workbook::{read_workbook_bytes, read_workbook_table, table_from_rows};

/// Reads the source table from a file, choosing the reader by extension.
pub fn read_source_table(path: &Path, options: &IngestOptions) -> Result<Table> {
    if !path.is_file() {
        return Err(IngestError::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    let table = if is_csv {
        read_csv_table(path, options)?
    } else {
        read_workbook_table(path, options)?
    };
    tracing::info!(
        path = %path.display(),
        rows = table.height(),
        columns = table.width(),
        "Loaded source table"
    );
    Ok(table)
}

/// Reads the source table from workbook bytes (e.g. an upload).
pub fn read_source_bytes(bytes: &[u8], options: &IngestOptions) -> Result<Table> {
    read_workbook_bytes(bytes, options)
}
