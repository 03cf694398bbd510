//! A1-style cell references.

/// Last column of a worksheet (`XFD`).
pub const MAX_COLUMN: u32 = 16_384;

/// Last row of a worksheet.
pub const MAX_ROW: u32 = 1_048_576;

/// 1-based row and column of a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CellRef {
    pub row: u32,
    pub column: u32,
}

impl CellRef {
    pub fn new(row: u32, column: u32) -> Self {
        Self { row, column }
    }
}

impl std::fmt::Display for CellRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", column_letters(self.column), self.row)
    }
}

/// Column letters for a 1-based column index (`1 -> A`, `27 -> AA`).
pub fn column_letters(column: u32) -> String {
    let mut letters = Vec::with_capacity(3);
    let mut remaining = column;
    while remaining > 0 {
        let offset = ((remaining - 1) % 26) as u8;
        letters.push(char::from(b'A' + offset));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// 1-based column index for column letters; case-insensitive.
pub fn column_index(letters: &str) -> Option<u32> {
    if letters.is_empty() || letters.len() > 3 {
        return None;
    }
    let mut index: u32 = 0;
    for byte in letters.bytes() {
        if !byte.is_ascii_alphabetic() {
            return None;
        }
        index = index * 26 + u32::from(byte.to_ascii_uppercase() - b'A' + 1);
    }
    (index <= MAX_COLUMN).then_some(index)
}

/// `B12`-style reference for a 1-based row and column.
pub fn cell_reference(row: u32, column: u32) -> String {
    CellRef::new(row, column).to_string()
}

/// Parses `B12` or `$B$12`.
pub fn parse_cell_reference(reference: &str) -> Option<CellRef> {
    let reference = reference.trim();
    let split = reference
        .char_indices()
        .find(|(_, ch)| ch.is_ascii_digit())
        .map(|(index, _)| index)?;
    let (letters, digits) = reference.split_at(split);
    let letters = letters.replace('$', "");
    let column = column_index(&letters)?;
    let row: u32 = digits.parse().ok()?;
    (1..=MAX_ROW).contains(&row).then_some(CellRef::new(row, column))
}

/// Parses `A1:P20` or a single `A1`.
pub fn parse_range(range: &str) -> Option<(CellRef, CellRef)> {
    match range.split_once(':') {
        Some((start, end)) => Some((parse_cell_reference(start)?, parse_cell_reference(end)?)),
        None => {
            let cell = parse_cell_reference(range)?;
            Some((cell, cell))
        }
    }
}

/// Formats a range, collapsing single-cell ranges to one reference.
pub fn format_range(start: CellRef, end: CellRef) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}:{end}")
    }
}
