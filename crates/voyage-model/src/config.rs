//! Runtime configuration loaded from TOML.
//!
//! Every field is optional; an empty file yields the built-in defaults.
//!
//! ```toml
//! target_sheet = "VOYAGE"
//! output_file_name = "Mapped_VOYAGE_File.xlsx"
//! source_sheet = "Consumption"
//! na_values = ["-"]
//!
//! [[mapping]]
//! source = "Event"
//! target = "EVENT_TYPE"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::mapping::{ColumnMapping, ColumnPair};

/// Sheet of the target workbook that receives mapped values.
pub const DEFAULT_TARGET_SHEET: &str = "VOYAGE";

/// File name offered for the modified workbook.
pub const DEFAULT_OUTPUT_FILE_NAME: &str = "Mapped_VOYAGE_File.xlsx";

/// MIME type of the modified workbook.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MapperConfig {
    pub target_sheet: String,
    pub output_file_name: String,
    /// Source sheet to read; `None` reads the first sheet.
    pub source_sheet: Option<String>,
    /// Extra text values treated as missing on ingestion.
    pub na_values: Vec<String>,
    /// Whether the built-in NA tokens apply in addition to `na_values`.
    pub keep_default_na: bool,
    /// Replaces the built-in mapping when non-empty.
    pub mapping: Vec<ColumnPair>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            target_sheet: DEFAULT_TARGET_SHEET.to_string(),
            output_file_name: DEFAULT_OUTPUT_FILE_NAME.to_string(),
            source_sheet: None,
            na_values: Vec::new(),
            keep_default_na: true,
            mapping: Vec::new(),
        }
    }
}

impl MapperConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        // Validate the mapping up front so a bad file fails before any I/O.
        config.column_mapping()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ModelError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Loads `path` when given, otherwise returns the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// The configured mapping, or the built-in `VOYAGE` mapping.
    pub fn column_mapping(&self) -> Result<ColumnMapping> {
        if self.mapping.is_empty() {
            Ok(ColumnMapping::voyage())
        } else {
            ColumnMapping::from_pairs(self.mapping.clone())
        }
    }
}
