//! Error types for the column transfer.

use thiserror::Error;

/// Errors raised by [`crate::transfer`] and the workbook helpers it uses.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransferError {
    // =========================================================================
    // MAPPING ERRORS
    // =========================================================================
    /// Mapping keys absent from the source table, in mapping order.
    #[error("missing columns in source file: {}", .columns.join(", "))]
    MissingColumns { columns: Vec<String> },

    // =========================================================================
    // TARGET WORKBOOK ERRORS
    // =========================================================================
    /// The target workbook has no sheet with the requested name.
    #[error("the sheet named '{sheet}' does not exist in the target file")]
    MissingSheet {
        sheet: String,
        /// Sheet names that do exist, in workbook order.
        available: Vec<String>,
    },

    /// A package part referenced by the workbook is not in the archive.
    #[error("workbook part not found: {path}")]
    MissingPart { path: String },

    /// The workbook structure could not be understood.
    #[error("invalid workbook: {reason}")]
    InvalidWorkbook { reason: String },

    // =========================================================================
    // DECODING / ENCODING ERRORS
    // =========================================================================
    #[error("zip archive error: {0}")]
    Package(#[from] zip::result::ZipError),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML escape error: {0}")]
    XmlEscape(#[from] quick_xml::escape::EscapeError),

    #[error("invalid UTF-8 in workbook: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl TransferError {
    /// True for the two conditions reported to the user as input problems.
    pub fn is_input_error(&self) -> bool {
        matches!(self, Self::MissingColumns { .. } | Self::MissingSheet { .. })
    }
}

/// Result type for transfer operations.
pub type Result<T> = std::result::Result<T, TransferError>;
