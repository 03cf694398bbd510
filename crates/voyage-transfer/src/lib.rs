//! Column mapping and XLSX transfer for the voyage column mapper.
//!
//! [`transfer`] projects a source [`voyage_model::Table`] onto a
//! [`voyage_model::ColumnMapping`] and writes the result into a named sheet
//! of an existing workbook, starting on row 2 under the matching headers.
//!
//! The workbook is patched at the package level: only the target worksheet
//! changes, plus the stylesheet when dates need a format and the
//! calculation chain when formulas are overwritten. Every other zip entry
//! is copied unchanged.

mod cell_ref;
mod error;
mod mapper;
mod package;
mod sheet;
mod styles;
mod transfer;
mod xml;

// === Error Types ===
pub use error::{Result, TransferError};

// === Mapping ===
pub use mapper::{map_columns, missing_columns};

// === Workbook ===
pub use cell_ref::{
    CellRef, MAX_COLUMN, MAX_ROW, cell_reference, column_index, column_letters, parse_cell_reference,
};
pub use package::{PackageEdit, WorkbookPackage};
pub use sheet::{
    DateFormat, HeaderLookup, MatchedColumn, PatchedSheet, WritePlan, patch_sheet,
    read_header_row, resolve_columns,
};
pub use styles::{CellStyles, DATE_TIME_FORMAT_ID};

// === Transfer ===
pub use transfer::{
    FIRST_DATA_ROW, HEADER_ROW, OutputDocument, TransferOptions, TransferOutcome, TransferReport,
    transfer,
};
