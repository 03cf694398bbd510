//! Data model for the voyage column mapper.
//!
//! - [`CellValue`] and [`Table`]: the in-memory form of source and mapped data
//! - [`ColumnMapping`]: the ordered `source -> target` column table
//! - [`MapperConfig`]: optional TOML configuration layered over the defaults

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod mapping;
pub mod table;
pub mod value;

pub use config::{
    DEFAULT_OUTPUT_FILE_NAME, DEFAULT_TARGET_SHEET, MapperConfig, XLSX_CONTENT_TYPE,
};
pub use error::{ModelError, Result};
pub use mapping::{ColumnMapping, ColumnPair, VOYAGE_COLUMN_MAPPING};
pub use table::Table;
pub use value::{CellValue, FILL_VALUE, format_number};
