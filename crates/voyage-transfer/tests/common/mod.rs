//! XLSX fixtures assembled with the zip writer.

#![allow(dead_code)]

use std::io::{Cursor, Read, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipArchive, ZipWriter};

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Builds a minimal workbook package.
#[derive(Default)]
pub struct WorkbookBuilder {
    sheets: Vec<(String, String)>,
    shared: Option<Vec<String>>,
    styles: Option<String>,
    calc_chain: bool,
}

impl WorkbookBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a sheet whose `<sheetData>` content is `rows`.
    pub fn sheet(mut self, name: &str, rows: &str) -> Self {
        self.sheets.push((name.to_string(), worksheet(rows)));
        self
    }

    /// Adds a sheet with complete worksheet XML.
    pub fn raw_sheet(mut self, name: &str, xml: &str) -> Self {
        self.sheets.push((name.to_string(), xml.to_string()));
        self
    }

    pub fn shared_strings(mut self, strings: &[&str]) -> Self {
        self.shared = Some(strings.iter().map(|s| (*s).to_string()).collect());
        self
    }

    /// Adds `xl/styles.xml` with these `cellXfs` entries.
    pub fn styles(mut self, cell_xfs: &[&str]) -> Self {
        let entries: String = cell_xfs.iter().map(|xf| format!("<xf {xf}/>")).collect();
        self.styles = Some(format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{MAIN_NS}"><fonts count="1"><font/></fonts><fills count="1"><fill/></fills><borders count="1"><border/></borders><cellStyleXfs count="1"><xf numFmtId="0"/></cellStyleXfs><cellXfs count="{}">{entries}</cellXfs></styleSheet>"#,
            cell_xfs.len()
        ));
        self
    }

    pub fn calc_chain(mut self) -> Self {
        self.calc_chain = true;
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
        );
        let mut workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );

        let mut entries: Vec<(String, String)> = Vec::new();
        for (index, (name, xml)) in self.sheets.iter().enumerate() {
            let number = index + 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{number}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
            workbook.push_str(&format!(
                r#"<sheet name="{name}" sheetId="{number}" r:id="rId{number}"/>"#
            ));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{number}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{number}.xml"/>"#
            ));
            entries.push((format!("xl/worksheets/sheet{number}.xml"), xml.clone()));
        }
        workbook.push_str("</sheets></workbook>");

        if let Some(shared) = &self.shared {
            content_types.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
            rels.push_str(&format!(
                r#"<Relationship Id="rId100" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/>"#
            ));
            let items: String = shared
                .iter()
                .map(|text| format!("<si><t>{}</t></si>", escape(text)))
                .collect();
            entries.push((
                "xl/sharedStrings.xml".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><sst xmlns="{MAIN_NS}" count="{0}" uniqueCount="{0}">{items}</sst>"#,
                    shared.len()
                ),
            ));
        }
        if let Some(styles) = &self.styles {
            content_types.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
            rels.push_str(&format!(
                r#"<Relationship Id="rId102" Type="{REL_NS}/styles" Target="styles.xml"/>"#
            ));
            entries.push(("xl/styles.xml".to_string(), styles.clone()));
        }
        if self.calc_chain {
            content_types.push_str(r#"<Override PartName="/xl/calcChain.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.calcChain+xml"/>"#);
            rels.push_str(&format!(
                r#"<Relationship Id="rId101" Type="{REL_NS}/calcChain" Target="calcChain.xml"/>"#
            ));
            entries.push((
                "xl/calcChain.xml".to_string(),
                format!(r#"<calcChain xmlns="{MAIN_NS}"><c r="C2" i="1"/></calcChain>"#),
            ));
        }
        content_types.push_str("</Types>");
        rels.push_str("</Relationships>");

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types),
            (
                "_rels/.rels".to_string(),
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
                ),
            ),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), rels),
        ];
        parts.extend(entries);
        zip_entries(&parts)
    }
}

/// Wraps `<row>` elements in a worksheet.
pub fn worksheet(rows: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}"><sheetData>{rows}</sheetData></worksheet>"#
    )
}

/// An inline-string cell.
pub fn text_cell(reference: &str, text: &str) -> String {
    let text = escape(text);
    format!(r#"<c r="{reference}" t="inlineStr"><is><t>{text}</t></is></c>"#)
}

pub fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A numeric cell with a cell format index.
pub fn styled_number_cell(reference: &str, style: u32, value: &str) -> String {
    format!(r#"<c r="{reference}" s="{style}"><v>{value}</v></c>"#)
}

/// A numeric cell.
pub fn number_cell(reference: &str, value: &str) -> String {
    format!(r#"<c r="{reference}"><v>{value}</v></c>"#)
}

/// A header row of inline strings starting at column A.
pub fn header_row(headers: &[&str]) -> String {
    let cells: String = headers
        .iter()
        .enumerate()
        .map(|(index, header)| text_cell(&format!("{}1", column(index)), header))
        .collect();
    format!(r#"<row r="1">{cells}</row>"#)
}

/// Column letter for a 0-based index below 26.
pub fn column(index: usize) -> char {
    char::from(b'A' + u8::try_from(index).unwrap())
}

/// Zips `(name, contents)` pairs with fixed timestamps.
pub fn zip_entries(parts: &[(String, String)]) -> Vec<u8> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    for (name, contents) in parts {
        writer.start_file(name.as_str(), options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Contents of a zip entry as text, or `None` if absent.
pub fn read_entry(bytes: &[u8], name: &str) -> Option<String> {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).ok()?;
    let mut contents = String::new();
    file.read_to_string(&mut contents).unwrap();
    Some(contents)
}

/// Entry names in archive order.
pub fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.file_names().map(str::to_string).collect()
}
