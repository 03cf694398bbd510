//! Worksheet header lookup and in-place cell patching.
//!
//! Both passes stream the worksheet XML. The header pass reads the header
//! row and stops; the patch pass copies every event it does not change, so
//! cells outside the write plan keep their exact bytes.

use std::collections::{BTreeMap, HashMap, btree_map};
use std::iter::Peekable;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde::Serialize;
use voyage_model::{CellValue, Table, format_number};

use crate::cell_ref::{
    CellRef, MAX_ROW, cell_reference, column_letters, format_range, parse_cell_reference,
    parse_range,
};
use crate::error::{Result, TransferError};
use crate::styles::CellStyles;
use crate::xml::{
    append_text, attr_value, element_prefix, is_element, skip_element_watching, without_attribute,
};

// =============================================================================
// Header lookup
// =============================================================================

/// Header name to 1-based column position, built from one header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderLookup {
    columns: HashMap<String, u32>,
}

impl HeaderLookup {
    /// Records a header; a later column with the same name replaces an earlier one.
    pub fn insert(&mut self, name: impl Into<String>, column: u32) {
        self.columns.insert(name.into(), column);
    }

    pub fn column_of(&self, name: &str) -> Option<u32> {
        self.columns.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// Reads the text headers of `header_row`.
///
/// Shared strings, inline strings and cached formula strings count as text;
/// numbers, booleans and empty cells are ignored. Names are matched exactly,
/// without trimming.
pub fn read_header_row(xml: &[u8], header_row: u32, shared: &[String]) -> Result<HeaderLookup> {
    let mut reader = Reader::from_reader(xml);
    let mut lookup = HeaderLookup::default();
    let mut last_row = 0u32;
    let mut in_header = false;
    let mut last_column = 0u32;

    loop {
        match reader.read_event()? {
            Event::Start(element) if is_element(&element, b"row") => {
                let row = row_number(&element, last_row)?;
                last_row = row;
                if row > header_row {
                    break;
                }
                in_header = row == header_row;
                last_column = 0;
            }
            Event::Empty(element) if is_element(&element, b"row") => {
                let row = row_number(&element, last_row)?;
                last_row = row;
                if row >= header_row {
                    break;
                }
            }
            Event::End(element) if in_header && element.local_name().as_ref() == b"row" => break,
            Event::Start(element) if in_header && is_element(&element, b"c") => {
                let column = cell_column(&element, last_column)?;
                last_column = column;
                let kind = attr_value(&element, b"t")?;
                let body = read_cell_body(&mut reader)?;
                let text = match kind.as_deref() {
                    Some("s") => body
                        .value
                        .trim()
                        .parse::<usize>()
                        .ok()
                        .and_then(|index| shared.get(index).cloned()),
                    Some("inlineStr") => body.inline,
                    Some("str") => Some(body.value),
                    _ => None,
                };
                if let Some(name) = text.filter(|name| !name.is_empty()) {
                    lookup.insert(name, column);
                }
            }
            Event::Empty(element) if in_header && is_element(&element, b"c") => {
                last_column = cell_column(&element, last_column)?;
            }
            Event::End(element) if element.local_name().as_ref() == b"sheetData" => break,
            Event::Eof => break,
            _ => {}
        }
    }

    tracing::debug!(row = header_row, headers = lookup.len(), "Read target header row");
    Ok(lookup)
}

#[derive(Debug, Default)]
struct CellBody {
    value: String,
    inline: Option<String>,
}

/// Reads `<v>` and `<is>` text up to the end of the current `<c>`.
fn read_cell_body(reader: &mut Reader<&[u8]>) -> Result<CellBody> {
    let mut body = CellBody::default();
    let mut depth = 1usize;
    let mut in_value = false;
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(element) => {
                depth += 1;
                match element.local_name().as_ref() {
                    b"v" => in_value = true,
                    b"is" => body.inline = Some(String::new()),
                    b"rPh" => in_phonetic = true,
                    b"t" => in_text = !in_phonetic && body.inline.is_some(),
                    _ => {}
                }
            }
            Event::Empty(element) if is_element(element, b"is") => {
                body.inline = Some(String::new());
            }
            Event::End(element) => {
                depth -= 1;
                if depth == 0 {
                    return Ok(body);
                }
                match element.local_name().as_ref() {
                    b"v" => in_value = false,
                    b"rPh" => in_phonetic = false,
                    b"t" => in_text = false,
                    _ => {}
                }
            }
            Event::Eof => {
                return Err(TransferError::InvalidWorkbook {
                    reason: "worksheet ends inside a cell".to_string(),
                });
            }
            _ => {
                if in_value {
                    append_text(&event, &mut body.value)?;
                } else if in_text && let Some(inline) = body.inline.as_mut() {
                    append_text(&event, inline)?;
                }
            }
        }
    }
}

fn row_number(element: &BytesStart<'_>, previous: u32) -> Result<u32> {
    match attr_value(element, b"r")? {
        Some(value) => value
            .trim()
            .parse::<u32>()
            .ok()
            .filter(|row| (1..=MAX_ROW).contains(row))
            .ok_or_else(|| TransferError::InvalidWorkbook {
                reason: format!("invalid row number '{value}'"),
            }),
        None => Ok(previous + 1),
    }
}

fn cell_column(element: &BytesStart<'_>, previous: u32) -> Result<u32> {
    match attr_value(element, b"r")? {
        Some(reference) => parse_cell_reference(&reference)
            .map(|cell| cell.column)
            .ok_or_else(|| TransferError::InvalidWorkbook {
                reason: format!("invalid cell reference '{reference}'"),
            }),
        None => Ok(previous + 1),
    }
}

// =============================================================================
// Write plan
// =============================================================================

/// A mapped column that was found in the target header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchedColumn {
    pub name: String,
    /// 1-based column position in the target sheet.
    pub column: u32,
    pub letter: String,
}

/// Splits the mapped columns into those the header has and those it lacks.
pub fn resolve_columns(mapped: &Table, lookup: &HeaderLookup) -> (Vec<MatchedColumn>, Vec<String>) {
    let mut matched = Vec::new();
    let mut skipped = Vec::new();
    for name in mapped.columns() {
        match lookup.column_of(name) {
            Some(column) => matched.push(MatchedColumn {
                name: name.clone(),
                column,
                letter: column_letters(column),
            }),
            None => skipped.push(name.clone()),
        }
    }
    (matched, skipped)
}

/// Cells to write, keyed by row then column (both 1-based).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WritePlan {
    rows: BTreeMap<u32, BTreeMap<u32, CellValue>>,
}

impl WritePlan {
    /// Plans every column of `mapped` found in `lookup`, row `i` going to `first_data_row + i`.
    pub fn from_table(mapped: &Table, lookup: &HeaderLookup, first_data_row: u32) -> Result<Self> {
        let mut plan = Self::default();
        let positions: Vec<(usize, u32)> = mapped
            .columns()
            .iter()
            .enumerate()
            .filter_map(|(index, name)| lookup.column_of(name).map(|column| (index, column)))
            .collect();
        if positions.is_empty() {
            return Ok(plan);
        }
        for (offset, cells) in mapped.rows().iter().enumerate() {
            let row = u32::try_from(offset)
                .ok()
                .and_then(|offset| first_data_row.checked_add(offset))
                .filter(|row| *row <= MAX_ROW)
                .ok_or_else(|| TransferError::InvalidWorkbook {
                    reason: format!("{} data rows do not fit in a worksheet", mapped.height()),
                })?;
            for &(index, column) in &positions {
                plan.insert(row, column, cells[index].clone());
            }
        }
        Ok(plan)
    }

    pub fn insert(&mut self, row: u32, column: u32, value: CellValue) {
        self.rows.entry(row).or_default().insert(column, value);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn cell_count(&self) -> usize {
        self.rows.values().map(BTreeMap::len).sum()
    }

    /// True if any planned value is a date or time.
    pub fn has_dates(&self) -> bool {
        self.rows
            .values()
            .flat_map(BTreeMap::values)
            .any(|value| matches!(value, CellValue::DateTime(_)))
    }

    /// Top-left and bottom-right cells covered by the plan.
    pub fn bounds(&self) -> Option<(CellRef, CellRef)> {
        let first_row = *self.rows.keys().next()?;
        let last_row = *self.rows.keys().next_back()?;
        let columns = self.rows.values().flat_map(BTreeMap::keys);
        let first_column = columns.clone().min().copied()?;
        let last_column = columns.max().copied()?;
        Some((
            CellRef::new(first_row, first_column),
            CellRef::new(last_row, last_column),
        ))
    }
}

// =============================================================================
// Patching
// =============================================================================

/// Cell format given to date-time values whose cell has no date format.
#[derive(Debug, Clone, Copy)]
pub struct DateFormat<'s> {
    pub styles: &'s CellStyles,
    /// Value of the `s` attribute that selects the date-time format.
    pub style_index: u32,
}

/// Worksheet XML after applying a [`WritePlan`].
#[derive(Debug, Clone)]
pub struct PatchedSheet {
    pub xml: Vec<u8>,
    pub cells_written: usize,
    /// Overwritten cells that held a formula.
    pub formulas_replaced: usize,
    /// Date-time cells that were given the [`DateFormat`] style.
    pub dates_formatted: usize,
}

type PlannedRows<'p> = Peekable<btree_map::Iter<'p, u32, BTreeMap<u32, CellValue>>>;
type PlannedCells<'p> = Peekable<btree_map::Iter<'p, u32, CellValue>>;

/// Streams `xml`, writing the planned cells into it.
///
/// Date-time values keep a date style already on the cell; otherwise they
/// get `dates` when given, and are plain serial numbers when not.
pub fn patch_sheet(xml: &[u8], plan: &WritePlan, dates: Option<DateFormat<'_>>) -> Result<PatchedSheet> {
    let mut patcher = SheetPatcher {
        writer: Writer::new(Vec::with_capacity(xml.len() + plan.cell_count() * 32)),
        rows: plan.rows.iter().peekable(),
        bounds: plan.bounds(),
        dates,
        date_style: dates.map(|dates| dates.style_index.to_string()),
        prefix: None,
        in_sheet_data: false,
        saw_sheet_data: false,
        in_row: false,
        open_cells: None,
        row: 0,
        last_row: 0,
        last_column: 0,
        cells_written: 0,
        formulas_replaced: 0,
        dates_formatted: 0,
    };

    let mut reader = Reader::from_reader(xml);
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Start(element) => patcher.start(&mut reader, element, false)?,
            Event::Empty(element) => patcher.start(&mut reader, element, true)?,
            Event::End(element) => patcher.end(element)?,
            event => patcher.writer.write_event(event)?,
        }
    }

    if !patcher.saw_sheet_data {
        return Err(TransferError::InvalidWorkbook {
            reason: "worksheet has no sheetData element".to_string(),
        });
    }

    Ok(PatchedSheet {
        cells_written: patcher.cells_written,
        formulas_replaced: patcher.formulas_replaced,
        dates_formatted: patcher.dates_formatted,
        xml: patcher.writer.into_inner(),
    })
}

struct SheetPatcher<'p> {
    writer: Writer<Vec<u8>>,
    rows: PlannedRows<'p>,
    bounds: Option<(CellRef, CellRef)>,
    dates: Option<DateFormat<'p>>,
    date_style: Option<String>,
    /// Namespace prefix of `sheetData`, reused for emitted elements.
    prefix: Option<String>,
    in_sheet_data: bool,
    saw_sheet_data: bool,
    in_row: bool,
    /// Planned cells of the current row, if it has any.
    open_cells: Option<PlannedCells<'p>>,
    row: u32,
    last_row: u32,
    last_column: u32,
    cells_written: usize,
    formulas_replaced: usize,
    dates_formatted: usize,
}

impl<'p> SheetPatcher<'p> {
    fn start(&mut self, reader: &mut Reader<&[u8]>, element: BytesStart<'_>, empty: bool) -> Result<()> {
        let local = element.local_name().as_ref().to_vec();
        match local.as_slice() {
            b"dimension" if !self.in_sheet_data => {
                let widened = self.widen_dimension(&element)?;
                self.write_element(widened, empty)
            }
            b"sheetData" if !self.in_sheet_data => {
                self.prefix = element_prefix(&element);
                self.saw_sheet_data = true;
                self.writer.write_event(Event::Start(element.borrow()))?;
                if empty {
                    self.flush_rows_before(None)?;
                    self.writer.write_event(Event::End(element.to_end()))?;
                } else {
                    self.in_sheet_data = true;
                }
                Ok(())
            }
            b"row" if self.in_sheet_data && !self.in_row => self.start_row(element, empty),
            b"c" if self.in_row => self.start_cell(reader, element, empty),
            _ => self.write_element(element, empty),
        }
    }

    fn end(&mut self, element: BytesEnd<'_>) -> Result<()> {
        match element.local_name().as_ref() {
            b"row" if self.in_row => {
                self.flush_cells_before(None)?;
                self.in_row = false;
                self.open_cells = None;
            }
            b"sheetData" if self.in_sheet_data => {
                self.flush_rows_before(None)?;
                self.in_sheet_data = false;
            }
            _ => {}
        }
        self.writer.write_event(Event::End(element))?;
        Ok(())
    }

    fn start_row(&mut self, element: BytesStart<'_>, empty: bool) -> Result<()> {
        let row = row_number(&element, self.last_row)?;
        self.last_row = row;
        self.flush_rows_before(Some(row))?;

        let planned = self.rows.next_if(|(number, _)| **number == row);
        let Some((_, cells)) = planned else {
            if !empty {
                self.in_row = true;
                self.row = row;
                self.last_column = 0;
            }
            return self.write_element(element, empty);
        };

        // The cell span hint may no longer be accurate.
        let start = without_attribute(&element, b"spans")?;
        self.writer.write_event(Event::Start(start.borrow()))?;
        self.row = row;
        self.last_column = 0;
        self.open_cells = Some(cells.iter().peekable());
        if empty {
            self.flush_cells_before(None)?;
            self.open_cells = None;
            self.writer.write_event(Event::End(start.to_end()))?;
        } else {
            self.in_row = true;
        }
        Ok(())
    }

    fn start_cell(&mut self, reader: &mut Reader<&[u8]>, element: BytesStart<'_>, empty: bool) -> Result<()> {
        let column = cell_column(&element, self.last_column)?;
        self.last_column = column;
        self.flush_cells_before(Some(column))?;

        let planned = self
            .open_cells
            .as_mut()
            .and_then(|cells| cells.next_if(|(number, _)| **number == column));
        let Some((_, value)) = planned else {
            return self.write_element(element, empty);
        };

        let style = attr_value(&element, b"s")?;
        if !empty && skip_element_watching(reader, b"f")? {
            self.formulas_replaced += 1;
            tracing::debug!(cell = %cell_reference(self.row, column), "Overwriting formula cell");
        }
        self.write_cell(self.row, column, style.as_deref(), value)
    }

    /// Emits planned rows numbered below `limit` (all remaining rows for `None`).
    fn flush_rows_before(&mut self, limit: Option<u32>) -> Result<()> {
        while let Some((row, cells)) = self
            .rows
            .next_if(|(number, _)| limit.is_none_or(|limit| **number < limit))
        {
            let mut start = BytesStart::new(self.qualified("row"));
            start.push_attribute(("r", row.to_string().as_str()));
            self.writer.write_event(Event::Start(start.borrow()))?;
            for (column, value) in cells {
                self.write_cell(*row, *column, None, value)?;
            }
            self.writer.write_event(Event::End(start.to_end()))?;
        }
        Ok(())
    }

    /// Emits planned cells of the open row with columns below `limit`.
    fn flush_cells_before(&mut self, limit: Option<u32>) -> Result<()> {
        let Some(mut cells) = self.open_cells.take() else {
            return Ok(());
        };
        while let Some((column, value)) =
            cells.next_if(|(number, _)| limit.is_none_or(|limit| **number < limit))
        {
            self.write_cell(self.row, *column, None, value)?;
        }
        self.open_cells = Some(cells);
        Ok(())
    }

    fn write_cell(&mut self, row: u32, column: u32, style: Option<&str>, value: &CellValue) -> Result<()> {
        let mut cell = BytesStart::new(self.qualified("c"));
        cell.push_attribute(("r", cell_reference(row, column).as_str()));
        let keeps_date_style = |styles: &CellStyles| style.is_some_and(|style| styles.is_date_style(style));
        let style = match (value, self.dates, self.date_style.as_deref()) {
            (CellValue::DateTime(_), Some(dates), Some(date_style)) if !keeps_date_style(dates.styles) => {
                self.dates_formatted += 1;
                Some(date_style)
            }
            _ => style,
        };
        if let Some(style) = style {
            cell.push_attribute(("s", style));
        }

        match value {
            CellValue::Text(text) => {
                cell.push_attribute(("t", "inlineStr"));
                self.writer.write_event(Event::Start(cell.borrow()))?;
                let inline = BytesStart::new(self.qualified("is"));
                self.writer.write_event(Event::Start(inline.borrow()))?;
                let mut run = BytesStart::new(self.qualified("t"));
                if text.trim() != text {
                    run.push_attribute(("xml:space", "preserve"));
                }
                self.writer.write_event(Event::Start(run.borrow()))?;
                self.writer.write_event(Event::Text(BytesText::new(text)))?;
                self.writer.write_event(Event::End(run.to_end()))?;
                self.writer.write_event(Event::End(inline.to_end()))?;
            }
            CellValue::Bool(flag) => {
                cell.push_attribute(("t", "b"));
                self.writer.write_event(Event::Start(cell.borrow()))?;
                self.write_value(if *flag { "1" } else { "0" })?;
            }
            CellValue::Number(number) | CellValue::DateTime(number) => {
                self.writer.write_event(Event::Start(cell.borrow()))?;
                self.write_value(&format_number(*number))?;
            }
            CellValue::Missing => {
                self.writer.write_event(Event::Start(cell.borrow()))?;
                self.write_value(&format_number(0.0))?;
            }
        }

        self.writer.write_event(Event::End(cell.to_end()))?;
        self.cells_written += 1;
        Ok(())
    }

    fn write_value(&mut self, text: &str) -> Result<()> {
        let value = BytesStart::new(self.qualified("v"));
        self.writer.write_event(Event::Start(value.borrow()))?;
        self.writer.write_event(Event::Text(BytesText::new(text)))?;
        self.writer.write_event(Event::End(value.to_end()))?;
        Ok(())
    }

    fn write_element(&mut self, element: BytesStart<'_>, empty: bool) -> Result<()> {
        let event = if empty {
            Event::Empty(element)
        } else {
            Event::Start(element)
        };
        self.writer.write_event(event)?;
        Ok(())
    }

    fn widen_dimension(&self, element: &BytesStart<'_>) -> Result<BytesStart<'static>> {
        let current = attr_value(element, b"ref")?;
        let mut widened = without_attribute(element, b"ref")?;
        let range = match (current.as_deref().and_then(parse_range), self.bounds) {
            (Some((start, end)), Some((first, last))) => format_range(
                CellRef::new(start.row.min(first.row), start.column.min(first.column)),
                CellRef::new(end.row.max(last.row), end.column.max(last.column)),
            ),
            (None, Some((first, last))) => format_range(first, last),
            (_, None) => current.unwrap_or_else(|| "A1".to_string()),
        };
        widened.push_attribute(("ref", range.as_str()));
        Ok(widened)
    }

    fn qualified(&self, local: &str) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}:{local}"),
            None => local.to_string(),
        }
    }
}
