//! Cell values shared by the source table, the mapped table and the sheet writer.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};

/// Value written into cells that are missing after mapping.
pub const FILL_VALUE: CellValue = CellValue::Number(0.0);

/// A single spreadsheet cell.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CellValue {
    Text(String),
    Number(f64),
    Bool(bool),
    /// Excel serial date (days since 1899-12-30, fractional part is the time).
    DateTime(f64),
    Missing,
}

impl CellValue {
    /// Returns true for absent values, including non-finite numbers.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Missing => true,
            Self::Number(value) | Self::DateTime(value) => !value.is_finite(),
            Self::Text(_) | Self::Bool(_) => false,
        }
    }

    /// Returns the value, or [`FILL_VALUE`] when it is missing.
    #[must_use]
    pub fn or_fill(self) -> Self {
        if self.is_missing() { FILL_VALUE } else { self }
    }

    /// Converts an Excel serial date into a calendar timestamp.
    pub fn as_datetime(&self) -> Option<NaiveDateTime> {
        match self {
            Self::DateTime(serial) => excel_serial_to_datetime(*serial),
            _ => None,
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(value) => f.write_str(value),
            Self::Number(value) => f.write_str(&format_number(*value)),
            Self::Bool(true) => f.write_str("TRUE"),
            Self::Bool(false) => f.write_str("FALSE"),
            Self::DateTime(serial) => match self.as_datetime() {
                Some(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
                None => f.write_str(&format_number(*serial)),
            },
            Self::Missing => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Formats a number the way it is stored in a cell `<v>` element.
///
/// Integral values drop the fractional part; non-finite values become `0`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    if value == 0.0 {
        // Avoid "-0".
        return "0".to_string();
    }
    format!("{value}")
}

fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let millis = (serial * 86_400_000.0).round() as i64;
    epoch.checked_add_signed(TimeDelta::try_milliseconds(millis)?)
}
