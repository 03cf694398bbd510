//! Error types for model construction and configuration loading.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building a column mapping or loading configuration.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The same source column appears twice in a mapping.
    #[error("source column '{column}' is mapped more than once")]
    DuplicateSourceColumn { column: String },

    /// A mapping must contain at least one entry.
    #[error("column mapping is empty")]
    EmptyMapping,

    /// A mapping entry has a blank source or target name.
    #[error("mapping entry {index} has an empty {side} column name")]
    BlankColumnName { index: usize, side: &'static str },

    /// Configuration file could not be read.
    #[error("failed to read config {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration file is not valid TOML for [`crate::MapperConfig`].
    #[error("invalid config: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, ModelError>;
