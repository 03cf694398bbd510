//! Cell formats from the workbook stylesheet.
//!
//! Only the parts needed to write dates are read: the number format of each
//! `cellXfs` entry and the custom number formats that show a date or time.

use std::collections::BTreeSet;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::error::{Result, TransferError};
use crate::xml::{attr_value, element_prefix, is_element, without_attribute};

/// Built-in number format `m/d/yy h:mm`.
pub const DATE_TIME_FORMAT_ID: u32 = 22;

/// Stylesheet written into workbooks that have none.
const MINIMAL_STYLESHEET: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
    r#"<fonts count="1"><font><sz val="11"/><name val="Calibri"/><family val="2"/></font></fonts>"#,
    r#"<fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills>"#,
    r#"<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>"#,
    r#"<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>"#,
    r#"<cellXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/></cellXfs>"#,
    r#"<cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles>"#,
    r#"</styleSheet>"#,
);

/// Children of `styleSheet` that come after `cellXfs`.
const AFTER_CELL_XFS: [&[u8]; 5] = [b"cellStyles", b"dxfs", b"tableStyles", b"colors", b"extLst"];

/// Number formats of the workbook's cell formats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CellStyles {
    /// `numFmtId` of each `cellXfs` entry, by index.
    formats: Vec<u32>,
    /// Custom format ids whose code shows a date or time.
    date_formats: BTreeSet<u32>,
}

impl CellStyles {
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let mut reader = Reader::from_reader(xml);
        let mut styles = Self::default();
        let mut in_cell_xfs = false;
        loop {
            match reader.read_event()? {
                Event::Start(element) | Event::Empty(element) => match element.local_name().as_ref() {
                    b"numFmt" => {
                        let id = attr_value(&element, b"numFmtId")?.and_then(|id| id.parse().ok());
                        let code = attr_value(&element, b"formatCode")?.unwrap_or_default();
                        if let Some(id) = id
                            && is_date_format_code(&code)
                        {
                            styles.date_formats.insert(id);
                        }
                    }
                    b"cellXfs" => in_cell_xfs = true,
                    b"xf" if in_cell_xfs => {
                        let id = attr_value(&element, b"numFmtId")?
                            .and_then(|id| id.parse().ok())
                            .unwrap_or(0);
                        styles.formats.push(id);
                    }
                    _ => {}
                },
                Event::End(element) if element.local_name().as_ref() == b"cellXfs" => {
                    in_cell_xfs = false;
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(styles)
    }

    pub fn len(&self) -> usize {
        self.formats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.formats.is_empty()
    }

    /// True if the `s` attribute value names a cell format that shows a date or time.
    pub fn is_date_style(&self, style: &str) -> bool {
        style
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|index| self.formats.get(index))
            .is_some_and(|id| is_builtin_date_format(*id) || self.date_formats.contains(id))
    }

    /// Index the date-time format gets once [`Self::with_date_format`] appends it.
    pub fn date_style_index(&self) -> u32 {
        // An empty cellXfs is given a default entry first.
        u32::try_from(self.formats.len().max(1)).unwrap_or(u32::MAX)
    }

    /// Appends a date-time entry to `cellXfs` of `xml`, creating the list if needed.
    pub fn with_date_format(&self, xml: &[u8]) -> Result<Vec<u8>> {
        let mut reader = Reader::from_reader(xml);
        let mut writer = Writer::new(Vec::with_capacity(xml.len() + 128));
        let mut prefix = None;
        let mut depth = 0usize;
        let mut in_cell_xfs = false;
        let mut appended = false;

        loop {
            let event = reader.read_event()?;
            match event {
                Event::Eof => break,
                Event::Start(element) => {
                    depth += 1;
                    if depth == 1 {
                        prefix = element_prefix(&element);
                    } else if depth == 2 && !appended {
                        if is_element(&element, b"cellXfs") {
                            let count = (self.date_style_index() + 1).to_string();
                            let mut start = without_attribute(&element, b"count")?;
                            start.push_attribute(("count", count.as_str()));
                            writer.write_event(Event::Start(start))?;
                            in_cell_xfs = true;
                            continue;
                        }
                        if is_after_cell_xfs(&element) {
                            self.write_cell_xfs(&mut writer, prefix.as_deref())?;
                            appended = true;
                        }
                    }
                    writer.write_event(Event::Start(element))?;
                }
                Event::Empty(element) => {
                    if depth == 1 && !appended {
                        if is_element(&element, b"cellXfs") {
                            self.write_cell_xfs(&mut writer, prefix.as_deref())?;
                            appended = true;
                            continue;
                        }
                        if is_after_cell_xfs(&element) {
                            self.write_cell_xfs(&mut writer, prefix.as_deref())?;
                            appended = true;
                        }
                    }
                    writer.write_event(Event::Empty(element))?;
                }
                Event::End(element) => {
                    if in_cell_xfs && depth == 2 {
                        if self.is_empty() {
                            writer.write_event(Event::Empty(default_xf(prefix.as_deref())))?;
                        }
                        writer.write_event(Event::Empty(date_xf(prefix.as_deref())))?;
                        in_cell_xfs = false;
                        appended = true;
                    } else if depth == 1 && !appended {
                        self.write_cell_xfs(&mut writer, prefix.as_deref())?;
                        appended = true;
                    }
                    depth = depth.saturating_sub(1);
                    writer.write_event(Event::End(element))?;
                }
                event => writer.write_event(event)?,
            }
        }

        if !appended {
            return Err(TransferError::InvalidWorkbook {
                reason: "stylesheet has no styleSheet element".to_string(),
            });
        }
        Ok(writer.into_inner())
    }

    /// A complete `cellXfs` list: a default entry followed by the date-time entry.
    fn write_cell_xfs(&self, writer: &mut Writer<Vec<u8>>, prefix: Option<&str>) -> Result<()> {
        let mut start = BytesStart::new(qualified(prefix, "cellXfs"));
        start.push_attribute(("count", "2"));
        writer.write_event(Event::Start(start.borrow()))?;
        writer.write_event(Event::Empty(default_xf(prefix)))?;
        writer.write_event(Event::Empty(date_xf(prefix)))?;
        writer.write_event(Event::End(start.to_end()))?;
        Ok(())
    }
}

/// Stylesheet for a workbook without one, already holding the date-time format.
pub fn minimal_stylesheet() -> Result<Vec<u8>> {
    let xml = MINIMAL_STYLESHEET.as_bytes();
    CellStyles::parse(xml)?.with_date_format(xml)
}

fn is_after_cell_xfs(element: &BytesStart<'_>) -> bool {
    AFTER_CELL_XFS.iter().any(|local| is_element(element, local))
}

fn default_xf(prefix: Option<&str>) -> BytesStart<'static> {
    let mut xf = BytesStart::new(qualified(prefix, "xf"));
    xf.extend_attributes([
        ("numFmtId", "0"),
        ("fontId", "0"),
        ("fillId", "0"),
        ("borderId", "0"),
        ("xfId", "0"),
    ]);
    xf
}

fn date_xf(prefix: Option<&str>) -> BytesStart<'static> {
    let id = DATE_TIME_FORMAT_ID.to_string();
    let mut xf = BytesStart::new(qualified(prefix, "xf"));
    xf.extend_attributes([
        ("numFmtId", id.as_str()),
        ("fontId", "0"),
        ("fillId", "0"),
        ("borderId", "0"),
        ("xfId", "0"),
        ("applyNumberFormat", "1"),
    ]);
    xf
}

fn qualified(prefix: Option<&str>, local: &str) -> String {
    match prefix {
        Some(prefix) => format!("{prefix}:{local}"),
        None => local.to_string(),
    }
}

fn is_builtin_date_format(id: u32) -> bool {
    matches!(id, 14..=22 | 45..=47)
}

/// True if a number format code contains date or time placeholders.
///
/// Quoted literals, escaped characters and bracketed colors or locales are
/// skipped; elapsed-time brackets such as `[h]` count as time.
fn is_date_format_code(code: &str) -> bool {
    let mut chars = code.chars();
    let mut in_quotes = false;
    while let Some(ch) = chars.next() {
        match ch {
            '"' => in_quotes = !in_quotes,
            _ if in_quotes => {}
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let section: String = chars.by_ref().take_while(|c| *c != ']').collect();
                if !section.is_empty()
                    && section
                        .chars()
                        .all(|c| matches!(c.to_ascii_lowercase(), 'h' | 'm' | 's'))
                {
                    return true;
                }
            }
            'd' | 'D' | 'm' | 'M' | 'y' | 'Y' | 'h' | 'H' | 's' | 'S' => return true,
            _ => {}
        }
    }
    false
}
