//! Header row normalization.

use std::collections::{HashMap, HashSet};

use voyage_model::CellValue;

/// Normalizes a header value by trimming whitespace.
pub fn normalize_header(value: &str) -> String {
    value.trim().to_string()
}

/// Splits one CSV line into trimmed fields, honoring quotes and `""` escapes.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if !in_quotes => in_quotes = true,
            '"' => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            ',' if !in_quotes => {
                fields.push(normalize_header(&current));
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(normalize_header(&current));
    fields
}

/// Builds unique column names from a header row.
///
/// Blank headers become `Unnamed: {index}`; repeats get a `.{n}` suffix
/// (`Event`, `Event.1`, `Event.2`).
pub fn build_column_names(header: &[CellValue]) -> Vec<String> {
    let mut used: HashSet<String> = HashSet::with_capacity(header.len());
    let mut suffixes: HashMap<String, usize> = HashMap::new();
    let mut names = Vec::with_capacity(header.len());
    for (index, cell) in header.iter().enumerate() {
        let mut name = normalize_header(&cell.to_string());
        if name.is_empty() {
            name = format!("Unnamed: {index}");
        }
        if used.contains(&name) {
            let base = name.clone();
            let mut suffix = suffixes.get(&base).copied().unwrap_or(0);
            loop {
                suffix += 1;
                name = format!("{base}.{suffix}");
                if !used.contains(&name) {
                    break;
                }
            }
            suffixes.insert(base, suffix);
        }
        used.insert(name.clone());
        names.push(name);
    }
    names
}
