//! The column transfer: map the source table and write it into the target sheet.

use std::path::Path;

use serde::Serialize;
use voyage_model::{
    ColumnMapping, DEFAULT_OUTPUT_FILE_NAME, DEFAULT_TARGET_SHEET, MapperConfig, Table,
    XLSX_CONTENT_TYPE,
};

use crate::error::{Result, TransferError};
use crate::mapper::map_columns;
use crate::package::{PackageEdit, WorkbookPackage};
use crate::sheet::{
    DateFormat, MatchedColumn, WritePlan, patch_sheet, read_header_row, resolve_columns,
};

/// Row of the target sheet holding column headers.
pub const HEADER_ROW: u32 = 1;

/// First row of the target sheet that receives data.
pub const FIRST_DATA_ROW: u32 = 2;

/// Transfer settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOptions {
    /// Sheet of the target workbook to write into, matched exactly.
    pub sheet_name: String,
    /// File name attached to the output document.
    pub output_file_name: String,
}

impl Default for TransferOptions {
    fn default() -> Self {
        Self {
            sheet_name: DEFAULT_TARGET_SHEET.to_string(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
        }
    }
}

impl TransferOptions {
    pub fn from_config(config: &MapperConfig) -> Self {
        Self {
            sheet_name: config.target_sheet.clone(),
            output_file_name: config.output_file_name.clone(),
        }
    }
}

/// The modified workbook.
#[derive(Debug, Clone)]
pub struct OutputDocument {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub content_type: &'static str,
}

impl OutputDocument {
    /// Writes the document to `path`.
    pub fn write_to(&self, path: &Path) -> Result<()> {
        std::fs::write(path, &self.bytes)?;
        Ok(())
    }
}

/// What a transfer did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferReport {
    pub sheet: String,
    pub rows_written: usize,
    pub cells_written: usize,
    pub matched_columns: Vec<MatchedColumn>,
    /// Mapped columns the target header lacks.
    pub skipped_columns: Vec<String>,
    pub formulas_replaced: usize,
    pub calc_chain_dropped: bool,
    /// Date-time cells given the date format added to the stylesheet.
    pub dates_formatted: usize,
}

/// Result of a successful transfer.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub document: OutputDocument,
    pub mapped: Table,
    pub report: TransferReport,
}

/// Copies the mapped columns of `source` into the target workbook.
///
/// Mapped row `i` lands on sheet row `i + 2`, in the column whose header
/// (row 1) equals the mapped name. Missing values are written as `0`.
/// Mapped columns without a header are skipped. Date-time values shown
/// without a date format get a date-time cell format, added to the
/// stylesheet once. Everything the write does not touch is carried over
/// unchanged.
///
/// # Errors
///
/// - [`TransferError::MissingColumns`] if the source lacks mapping columns
/// - [`TransferError::MissingSheet`] if the target has no sheet with the configured name
/// - package, XML and I/O errors for a malformed target
pub fn transfer(
    source: &Table,
    target: &[u8],
    mapping: &ColumnMapping,
    options: &TransferOptions,
) -> Result<TransferOutcome> {
    let span = tracing::info_span!("transfer", sheet = %options.sheet_name);
    let _guard = span.enter();

    let mapped = map_columns(source, mapping)?;

    let mut package = WorkbookPackage::open(target)?;
    let Some(sheet_part) = package.sheet_part(&options.sheet_name).map(str::to_string) else {
        return Err(TransferError::MissingSheet {
            sheet: options.sheet_name.clone(),
            available: package.sheet_names(),
        });
    };

    let shared = package.shared_strings()?;
    let sheet_xml = package.read_part(&sheet_part)?;
    let lookup = read_header_row(&sheet_xml, HEADER_ROW, &shared)?;
    let (matched_columns, skipped_columns) = resolve_columns(&mapped, &lookup);
    for column in &skipped_columns {
        tracing::warn!(column = %column, sheet = %options.sheet_name, "Mapped column not found in target header, skipping");
    }

    let plan = WritePlan::from_table(&mapped, &lookup, FIRST_DATA_ROW)?;
    let mut edit = PackageEdit::default();
    let mut report = TransferReport {
        sheet: options.sheet_name.clone(),
        rows_written: plan.row_count(),
        cells_written: 0,
        matched_columns,
        skipped_columns,
        formulas_replaced: 0,
        calc_chain_dropped: false,
        dates_formatted: 0,
    };

    if !plan.is_empty() {
        let styles = if plan.has_dates() {
            Some(package.cell_styles()?)
        } else {
            None
        };
        let dates = styles.as_ref().map(|styles| DateFormat {
            styles,
            style_index: styles.date_style_index(),
        });
        let patched = patch_sheet(&sheet_xml, &plan, dates)?;
        report.cells_written = patched.cells_written;
        report.formulas_replaced = patched.formulas_replaced;
        report.dates_formatted = patched.dates_formatted;
        edit.replace(sheet_part.clone(), patched.xml);
        if let Some(styles) = &styles
            && patched.dates_formatted > 0
        {
            tracing::debug!(
                existing = styles.len(),
                index = styles.date_style_index(),
                cells = patched.dates_formatted,
                "Adding date-time cell format"
            );
            package.add_date_format(styles, &mut edit)?;
        }
        if patched.formulas_replaced > 0 {
            tracing::warn!(
                cells = patched.formulas_replaced,
                "Overwrote formula cells; dependent shared formulas may need review"
            );
            report.calc_chain_dropped = package.drop_calc_chain(&mut edit)?;
        }
    }

    let bytes = if edit.is_empty() {
        target.to_vec()
    } else {
        package.write(&edit)?
    };

    tracing::info!(
        part = %sheet_part,
        rows = report.rows_written,
        cells = report.cells_written,
        skipped = report.skipped_columns.len(),
        "Transfer complete"
    );

    Ok(TransferOutcome {
        document: OutputDocument {
            bytes,
            file_name: options.output_file_name.clone(),
            content_type: XLSX_CONTENT_TYPE,
        },
        mapped,
        report,
    })
}
