//! Source-to-target column mapping.

use std::collections::HashSet;

use crate::error::{ModelError, Result};

/// Built-in mapping from consumption report columns to `VOYAGE` sheet headers.
///
/// Order matters: it is the column order of the mapped table.
pub const VOYAGE_COLUMN_MAPPING: [(&str, &str); 16] = [
    ("UTC Date & Time", "TIMESTAMP"),
    ("Event", "EVENT_TYPE"),
    ("From Port", "PORT"),
    ("Steaming time (HRS)", "DUR_SEA"),
    ("Obs distance (NM)", "DIST"),
    ("Time Spent at Anchorage (Hrs)", "DUR_ANC"),
    ("Time Spent at Drifting (Hrs)", "DUR_DRIFT"),
    ("Total cargo on board (MT)", "CARGO_MT"),
    ("AE LS MGO consumption (MT)", "AE_MGO_CONS"),
    ("ME LS MGO consumption (MT)", "ME_MGO_CONS"),
    ("BLR LS MGO consumption (MT)", "Boiler_MGO_CONS"),
    ("AE VLSFO consumption (MT)", "AE_HFO_CONS"),
    ("ME VLSFO consumption (MT)", "ME_HFO_CONS"),
    ("BLR VLSFO consumption (MT)", "Boiler_HFO_CONS"),
    ("ROB LS MGO", "MGO_ROB"),
    ("ROB VLSFO", "HFO_ROB"),
];

/// One `source -> target` pair.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ColumnPair {
    pub source: String,
    pub target: String,
}

/// Ordered mapping with unique source column names.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ColumnMapping {
    pairs: Vec<ColumnPair>,
}

impl ColumnMapping {
    /// Builds a mapping, rejecting empty names, empty mappings and repeated source columns.
    pub fn new<I, S, T>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, T)>,
        S: Into<String>,
        T: Into<String>,
    {
        let pairs: Vec<ColumnPair> = pairs
            .into_iter()
            .map(|(source, target)| ColumnPair {
                source: source.into(),
                target: target.into(),
            })
            .collect();
        Self::from_pairs(pairs)
    }

    pub fn from_pairs(pairs: Vec<ColumnPair>) -> Result<Self> {
        if pairs.is_empty() {
            return Err(ModelError::EmptyMapping);
        }
        let mut seen = HashSet::with_capacity(pairs.len());
        for (index, pair) in pairs.iter().enumerate() {
            if pair.source.is_empty() {
                return Err(ModelError::BlankColumnName {
                    index,
                    side: "source",
                });
            }
            if pair.target.is_empty() {
                return Err(ModelError::BlankColumnName {
                    index,
                    side: "target",
                });
            }
            if !seen.insert(pair.source.as_str()) {
                return Err(ModelError::DuplicateSourceColumn {
                    column: pair.source.clone(),
                });
            }
        }
        Ok(Self { pairs })
    }

    /// The built-in `VOYAGE` mapping.
    pub fn voyage() -> Self {
        Self {
            pairs: VOYAGE_COLUMN_MAPPING
                .iter()
                .map(|(source, target)| ColumnPair {
                    source: (*source).to_string(),
                    target: (*target).to_string(),
                })
                .collect(),
        }
    }

    pub fn pairs(&self) -> &[ColumnPair] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Source column names in mapping order.
    pub fn sources(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|pair| pair.source.as_str())
    }

    /// Target column names in mapping order.
    pub fn targets(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|pair| pair.target.as_str())
    }
}

impl Default for ColumnMapping {
    fn default() -> Self {
        Self::voyage()
    }
}
