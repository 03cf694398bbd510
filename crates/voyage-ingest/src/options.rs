//! Ingestion options and missing-value tokens.

use std::collections::HashSet;

use voyage_model::{CellValue, MapperConfig};

/// Text values read as missing unless `keep_default_na` is turned off.
pub const DEFAULT_NA_VALUES: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// How a source table is read.
#[derive(Debug, Clone)]
pub struct IngestOptions {
    /// Sheet to read; `None` reads the first sheet.
    pub sheet: Option<String>,
    na_values: HashSet<String>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self::new(None, &[], true)
    }
}

impl IngestOptions {
    pub fn new(sheet: Option<String>, extra_na: &[String], keep_default_na: bool) -> Self {
        let mut na_values: HashSet<String> = extra_na.iter().cloned().collect();
        if keep_default_na {
            na_values.extend(DEFAULT_NA_VALUES.iter().map(|value| (*value).to_string()));
        }
        Self { sheet, na_values }
    }

    pub fn from_config(config: &MapperConfig) -> Self {
        Self::new(
            config.source_sheet.clone(),
            &config.na_values,
            config.keep_default_na,
        )
    }

    #[must_use]
    pub fn with_sheet(mut self, sheet: impl Into<String>) -> Self {
        self.sheet = Some(sheet.into());
        self
    }

    pub fn na_values(&self) -> impl Iterator<Item = &str> {
        self.na_values.iter().map(String::as_str)
    }

    pub fn is_na(&self, text: &str) -> bool {
        self.na_values.contains(text)
    }

    /// Turns NA text tokens into [`CellValue::Missing`].
    pub fn normalize(&self, value: CellValue) -> CellValue {
        match value {
            CellValue::Text(text) if self.is_na(&text) => CellValue::Missing,
            other => other,
        }
    }
}
