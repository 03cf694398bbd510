//! XLSX package access.
//!
//! A workbook is a zip of XML parts tied together by relationship files.
//! [`WorkbookPackage`] resolves sheet names to their worksheet parts and
//! writes a new package in which only the replaced parts are re-encoded;
//! every other entry is copied byte for byte.

use std::collections::{BTreeMap, BTreeSet};
use std::io::{Cursor, Read, Write};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

use crate::error::{Result, TransferError};
use crate::styles::{CellStyles, minimal_stylesheet};
use crate::xml::{append_child, append_text, attr_value, is_element, remove_elements};

const ROOT_RELS: &str = "_rels/.rels";
const CONTENT_TYPES: &str = "[Content_Types].xml";
const DEFAULT_WORKBOOK_PART: &str = "xl/workbook.xml";
const STYLES_RELATIONSHIP: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const STYLES_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml";

/// A relationship from a `.rels` part.
#[derive(Debug, Clone)]
struct Relationship {
    id: String,
    kind: String,
    target: String,
    external: bool,
}

impl Relationship {
    fn is_kind(&self, suffix: &str) -> bool {
        self.kind.rsplit('/').next() == Some(suffix)
    }
}

/// A sheet declared in `workbook.xml`.
#[derive(Debug, Clone)]
struct SheetEntry {
    name: String,
    part: String,
}

/// Parts to replace or remove when writing the package.
#[derive(Debug, Default)]
pub struct PackageEdit {
    pub replacements: BTreeMap<String, Vec<u8>>,
    pub removed: BTreeSet<String>,
}

impl PackageEdit {
    pub fn replace(&mut self, part: impl Into<String>, bytes: Vec<u8>) {
        self.replacements.insert(part.into(), bytes);
    }

    pub fn remove(&mut self, part: impl Into<String>) {
        let part = part.into();
        self.replacements.remove(&part);
        self.removed.insert(part);
    }

    pub fn is_empty(&self) -> bool {
        self.replacements.is_empty() && self.removed.is_empty()
    }
}

/// An opened XLSX package, borrowing the original bytes.
pub struct WorkbookPackage<'a> {
    archive: ZipArchive<Cursor<&'a [u8]>>,
    workbook_dir: String,
    workbook_rels_part: String,
    sheets: Vec<SheetEntry>,
    shared_strings_part: Option<String>,
    styles_part: Option<String>,
    calc_chain_part: Option<String>,
}

impl<'a> WorkbookPackage<'a> {
    /// Opens the package and resolves its workbook, sheets and shared parts.
    pub fn open(bytes: &'a [u8]) -> Result<Self> {
        let mut archive = ZipArchive::new(Cursor::new(bytes))?;

        let workbook_part = match read_entry(&mut archive, ROOT_RELS) {
            Ok(rels) => parse_relationships(&rels)?
                .into_iter()
                .find(|rel| rel.is_kind("officeDocument") && !rel.external)
                .map(|rel| resolve_target("", &rel.target))
                .unwrap_or_else(|| DEFAULT_WORKBOOK_PART.to_string()),
            Err(TransferError::MissingPart { .. }) => DEFAULT_WORKBOOK_PART.to_string(),
            Err(err) => return Err(err),
        };

        let workbook_dir = part_directory(&workbook_part);
        let workbook_rels_part = rels_part_for(&workbook_part);
        let relationships = parse_relationships(&read_entry(&mut archive, &workbook_rels_part)?)?;

        let mut targets = BTreeMap::new();
        let mut shared_strings_part = None;
        let mut styles_part = None;
        let mut calc_chain_part = None;
        for rel in relationships.iter().filter(|rel| !rel.external) {
            let target = resolve_target(workbook_dir, &rel.target);
            if rel.is_kind("sharedStrings") {
                shared_strings_part = Some(target.clone());
            } else if rel.is_kind("styles") {
                styles_part = Some(target.clone());
            } else if rel.is_kind("calcChain") {
                calc_chain_part = Some(target.clone());
            }
            targets.insert(rel.id.clone(), (rel.is_kind("worksheet"), target));
        }

        let workbook_xml = read_entry(&mut archive, &workbook_part)?;
        let mut sheets = Vec::new();
        for (name, rel_id) in parse_sheet_list(&workbook_xml)? {
            // Chartsheets and dialog sheets have no cell grid to patch.
            if let Some((true, part)) = targets.get(&rel_id) {
                sheets.push(SheetEntry {
                    name,
                    part: part.clone(),
                });
            }
        }
        if sheets.is_empty() {
            return Err(TransferError::InvalidWorkbook {
                reason: format!("{workbook_part} declares no worksheets"),
            });
        }

        tracing::debug!(
            workbook = %workbook_part,
            sheets = sheets.len(),
            shared_strings = shared_strings_part.is_some(),
            styles = styles_part.is_some(),
            calc_chain = calc_chain_part.is_some(),
            "Opened workbook package"
        );

        Ok(Self {
            archive,
            workbook_dir: workbook_dir.to_string(),
            workbook_rels_part,
            sheets,
            shared_strings_part,
            styles_part,
            calc_chain_part,
        })
    }

    /// Worksheet names in workbook order.
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|sheet| sheet.name.clone()).collect()
    }

    /// Zip entry name of the worksheet called `name` (exact match).
    pub fn sheet_part(&self, name: &str) -> Option<&str> {
        self.sheets
            .iter()
            .find(|sheet| sheet.name == name)
            .map(|sheet| sheet.part.as_str())
    }

    /// Reads a part's bytes.
    pub fn read_part(&mut self, path: &str) -> Result<Vec<u8>> {
        read_entry(&mut self.archive, path)
    }

    /// A part's bytes with earlier edits applied.
    fn edited_part(&mut self, edit: &PackageEdit, path: &str) -> Result<Vec<u8>> {
        match edit.replacements.get(path) {
            Some(bytes) => Ok(bytes.clone()),
            None => self.read_part(path),
        }
    }

    /// The shared string table, or an empty table if the workbook has none.
    pub fn shared_strings(&mut self) -> Result<Vec<String>> {
        match self.shared_strings_part.clone() {
            Some(part) => parse_shared_strings(&self.read_part(&part)?),
            None => Ok(Vec::new()),
        }
    }

    /// Cell formats of the stylesheet, or none if the workbook has no stylesheet.
    pub fn cell_styles(&mut self) -> Result<CellStyles> {
        match self.styles_part.clone() {
            Some(part) => CellStyles::parse(&self.read_part(&part)?),
            None => Ok(CellStyles::default()),
        }
    }

    /// Records the edits that add a date-time cell format at
    /// [`CellStyles::date_style_index`] of `styles`.
    ///
    /// A workbook without a stylesheet gets a new one, registered in the
    /// workbook relationships and the content types.
    pub fn add_date_format(&mut self, styles: &CellStyles, edit: &mut PackageEdit) -> Result<()> {
        if let Some(part) = self.styles_part.clone() {
            let xml = self.read_part(&part)?;
            edit.replace(part, styles.with_date_format(&xml)?);
            return Ok(());
        }

        let part = format!("{}styles.xml", self.workbook_dir);
        let rels_part = self.workbook_rels_part.clone();
        let rels = self.edited_part(edit, &rels_part)?;
        let id = unused_relationship_id(&parse_relationships(&rels)?);
        let rels = append_child(
            &rels,
            b"Relationships",
            "Relationship",
            &[
                ("Id", id.as_str()),
                ("Type", STYLES_RELATIONSHIP),
                ("Target", "styles.xml"),
            ],
        )?;
        edit.replace(rels_part, rels);

        let part_name = format!("/{part}");
        match self.edited_part(edit, CONTENT_TYPES) {
            Ok(types) => {
                let types = append_child(
                    &types,
                    b"Types",
                    "Override",
                    &[
                        ("PartName", part_name.as_str()),
                        ("ContentType", STYLES_CONTENT_TYPE),
                    ],
                )?;
                edit.replace(CONTENT_TYPES, types);
            }
            Err(TransferError::MissingPart { .. }) => {}
            Err(err) => return Err(err),
        }

        tracing::debug!(part = %part, "Adding stylesheet to workbook");
        edit.replace(part.clone(), minimal_stylesheet()?);
        self.styles_part = Some(part);
        Ok(())
    }

    /// Records the edits that remove the calculation chain: the part itself,
    /// its workbook relationship and its content-type override.
    ///
    /// Returns false when the workbook has no calculation chain.
    pub fn drop_calc_chain(&mut self, edit: &mut PackageEdit) -> Result<bool> {
        let Some(part) = self.calc_chain_part.clone() else {
            return Ok(false);
        };

        let rels_part = self.workbook_rels_part.clone();
        let rels = self.edited_part(edit, &rels_part)?;
        let rels = remove_elements(&rels, b"Relationship", |element| {
            Ok(attr_value(element, b"Type")?.is_some_and(|kind| kind.ends_with("/calcChain")))
        })?;
        edit.replace(rels_part, rels);

        let part_name = format!("/{part}");
        match self.edited_part(edit, CONTENT_TYPES) {
            Ok(types) => {
                let types = remove_elements(&types, b"Override", |element| {
                    Ok(attr_value(element, b"PartName")?
                        .is_some_and(|name| name.eq_ignore_ascii_case(&part_name)))
                })?;
                edit.replace(CONTENT_TYPES, types);
            }
            Err(TransferError::MissingPart { .. }) => {}
            Err(err) => return Err(err),
        }

        edit.remove(part);
        Ok(true)
    }

    /// Writes a new package with `edit` applied.
    ///
    /// Untouched entries are copied raw. Replaced entries keep their name,
    /// position, modification time and compression family; new parts go at
    /// the end with a fixed timestamp. The same inputs always produce the
    /// same bytes.
    pub fn write(mut self, edit: &PackageEdit) -> Result<Vec<u8>> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        let mut existing = BTreeSet::new();
        for index in 0..self.archive.len() {
            let entry = self.archive.by_index_raw(index)?;
            let name = entry.name().to_string();
            existing.insert(name.clone());
            if edit.removed.contains(&name) {
                continue;
            }
            match edit.replacements.get(&name) {
                Some(bytes) => {
                    let compression = match entry.compression() {
                        CompressionMethod::Stored => CompressionMethod::Stored,
                        _ => CompressionMethod::Deflated,
                    };
                    let options = SimpleFileOptions::default()
                        .compression_method(compression)
                        .last_modified_time(entry.last_modified().unwrap_or_default());
                    drop(entry);
                    writer.start_file(name, options)?;
                    writer.write_all(bytes)?;
                }
                None => writer.raw_copy_file(entry)?,
            }
        }

        let options = SimpleFileOptions::default()
            .compression_method(CompressionMethod::Deflated)
            .last_modified_time(DateTime::default());
        for (name, bytes) in &edit.replacements {
            if !existing.contains(name) {
                writer.start_file(name.as_str(), options)?;
                writer.write_all(bytes)?;
            }
        }
        Ok(writer.finish()?.into_inner())
    }
}

fn read_entry(archive: &mut ZipArchive<Cursor<&[u8]>>, path: &str) -> Result<Vec<u8>> {
    let mut file = match archive.by_name(path) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => {
            return Err(TransferError::MissingPart {
                path: path.to_string(),
            });
        }
        Err(err) => return Err(err.into()),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    Ok(bytes)
}

/// First `rId{n}` not taken by `relationships`.
fn unused_relationship_id(relationships: &[Relationship]) -> String {
    let taken: BTreeSet<&str> = relationships.iter().map(|rel| rel.id.as_str()).collect();
    (1..)
        .map(|n| format!("rId{n}"))
        .find(|id| !taken.contains(id.as_str()))
        .unwrap_or_default()
}

/// Directory of a part, including the trailing slash (`xl/`).
fn part_directory(part: &str) -> &str {
    part.rfind('/').map_or("", |index| &part[..=index])
}

/// `xl/workbook.xml` -> `xl/_rels/workbook.xml.rels`.
fn rels_part_for(part: &str) -> String {
    let (dir, file) = part.rsplit_once('/').map_or(("", part), |(dir, file)| (dir, file));
    if dir.is_empty() {
        format!("_rels/{file}.rels")
    } else {
        format!("{dir}/_rels/{file}.rels")
    }
}

/// Resolves a relationship target against the source part's directory.
fn resolve_target(base_dir: &str, target: &str) -> String {
    let joined = match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("{base_dir}{target}"),
    };
    let mut segments: Vec<&str> = Vec::new();
    for segment in joined.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

fn parse_relationships(xml: &[u8]) -> Result<Vec<Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut relationships = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element)
                if is_element(&element, b"Relationship") =>
            {
                let (Some(id), Some(kind), Some(target)) = (
                    attr_value(&element, b"Id")?,
                    attr_value(&element, b"Type")?,
                    attr_value(&element, b"Target")?,
                ) else {
                    continue;
                };
                let external = attr_value(&element, b"TargetMode")?
                    .is_some_and(|mode| mode.eq_ignore_ascii_case("External"));
                relationships.push(Relationship {
                    id,
                    kind,
                    target,
                    external,
                });
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(relationships)
}

/// `(name, relationship id)` for each `<sheet>` in `workbook.xml`.
fn parse_sheet_list(xml: &[u8]) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_reader(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(element) | Event::Empty(element) if is_element(&element, b"sheet") => {
                if let (Some(name), Some(id)) =
                    (attr_value(&element, b"name")?, attr_value(&element, b"id")?)
                {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// Plain text of every `<si>`; phonetic runs are ignored.
fn parse_shared_strings(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut strings = Vec::new();
    let mut current: Option<String> = None;
    let mut in_text = false;
    let mut in_phonetic = false;
    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"si" => current = Some(String::new()),
                b"rPh" => in_phonetic = true,
                b"t" => in_text = !in_phonetic,
                _ => {}
            },
            Event::Empty(element) if is_element(element, b"si") => strings.push(String::new()),
            Event::End(element) => match element.local_name().as_ref() {
                b"si" => strings.push(current.take().unwrap_or_default()),
                b"rPh" => in_phonetic = false,
                b"t" => in_text = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {
                if in_text && let Some(buffer) = current.as_mut() {
                    append_text(&event, buffer)?;
                }
            }
        }
    }
    Ok(strings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("xl/", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl/", "/xl/worksheets/sheet2.xml"), "xl/worksheets/sheet2.xml");
        assert_eq!(resolve_target("xl/sub/", "../sharedStrings.xml"), "xl/sharedStrings.xml");
        assert_eq!(resolve_target("", "xl/workbook.xml"), "xl/workbook.xml");
        assert_eq!(resolve_target("xl/", "./styles.xml"), "xl/styles.xml");
    }

    #[test]
    fn test_rels_part_for() {
        assert_eq!(rels_part_for("xl/workbook.xml"), "xl/_rels/workbook.xml.rels");
        assert_eq!(rels_part_for("workbook.xml"), "_rels/workbook.xml.rels");
        assert_eq!(part_directory("xl/workbook.xml"), "xl/");
        assert_eq!(part_directory("workbook.xml"), "");
    }

    #[test]
    fn test_parse_relationships() {
        let xml = br#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>
            <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com" TargetMode="External"/>
        </Relationships>"#;
        let rels = parse_relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels[0].is_kind("worksheet"));
        assert!(!rels[0].external);
        assert!(rels[1].external);
    }

    #[test]
    fn test_unused_relationship_id() {
        let xml = br#"<Relationships>
            <Relationship Id="rId1" Type="t/worksheet" Target="worksheets/sheet1.xml"/>
            <Relationship Id="rId3" Type="t/worksheet" Target="worksheets/sheet2.xml"/>
        </Relationships>"#;
        assert_eq!(unused_relationship_id(&parse_relationships(xml).unwrap()), "rId2");
        assert_eq!(unused_relationship_id(&[]), "rId1");
    }

    #[test]
    fn test_parse_sheet_list() {
        let xml = br#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
            <sheets><sheet name="Summary" sheetId="1" r:id="rId1"/><sheet name="VOYAGE" sheetId="2" r:id="rId2"/></sheets>
        </workbook>"#;
        assert_eq!(
            parse_sheet_list(xml).unwrap(),
            vec![
                ("Summary".to_string(), "rId1".to_string()),
                ("VOYAGE".to_string(), "rId2".to_string())
            ]
        );
    }

    #[test]
    fn test_parse_shared_strings() {
        let xml = br#"<sst count="4" uniqueCount="4">
            <si><t>PORT</t></si>
            <si><r><t>EVENT</t></r><r><t xml:space="preserve">_TYPE</t></r></si>
            <si><t>Tokyo</t><rPh sb="0" eb="2"><t>TOKYO</t></rPh></si>
            <si/>
            <si><t>A &amp; B</t></si>
        </sst>"#;
        assert_eq!(
            parse_shared_strings(xml).unwrap(),
            vec!["PORT", "EVENT_TYPE", "Tokyo", "", "A & B"]
        );
    }
}
