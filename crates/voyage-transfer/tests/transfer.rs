//! End-to-end transfers into assembled workbooks.

mod common;

use common::{
    WorkbookBuilder, entry_names, header_row, number_cell, read_entry, styled_number_cell,
    text_cell,
};
use voyage_ingest::{IngestOptions, read_source_bytes};
use voyage_model::{CellValue, ColumnMapping, Table, VOYAGE_COLUMN_MAPPING};
use voyage_transfer::{TransferError, TransferOptions, transfer};

const SHEET_PART: &str = "xl/worksheets/sheet2.xml";

fn two_column_mapping() -> ColumnMapping {
    ColumnMapping::new([("Event", "EVENT_TYPE"), ("From Port", "PORT")]).unwrap()
}

fn source(rows: &[(&str, Option<&str>)]) -> Table {
    let mut table = Table::new(vec!["Event".to_string(), "From Port".to_string()]);
    for (event, port) in rows {
        table.push_row(vec![
            (*event).into(),
            port.map_or(CellValue::Missing, CellValue::from),
        ]);
    }
    table
}

/// A workbook with a `Summary` sheet and a `VOYAGE` sheet built from `rows`.
fn target(rows: &str) -> Vec<u8> {
    WorkbookBuilder::new()
        .sheet("Summary", &header_row(&["Vessel"]))
        .sheet("VOYAGE", rows)
        .build()
}

#[test]
fn writes_mapped_values_under_matching_headers() {
    let rows = format!(
        r#"{}<row r="2">{}</row>"#,
        header_row(&["EVENT_TYPE", "PORT", "OTHER"]),
        number_cell("C2", "42")
    );
    let outcome = transfer(
        &source(&[("LOAD", None)]),
        &target(&rows),
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let sheet = read_entry(&outcome.document.bytes, SHEET_PART).unwrap();
    assert!(sheet.contains(
        r#"<row r="2"><c r="A2" t="inlineStr"><is><t>LOAD</t></is></c><c r="B2"><v>0</v></c><c r="C2"><v>42</v></c></row>"#
    ));

    assert_eq!(outcome.mapped.columns(), ["EVENT_TYPE", "PORT"]);
    assert_eq!(outcome.mapped.cell(0, "PORT"), Some(&CellValue::Number(0.0)));
    assert_eq!(outcome.report.rows_written, 1);
    assert_eq!(outcome.report.cells_written, 2);
    assert!(outcome.report.skipped_columns.is_empty());
    assert_eq!(outcome.document.file_name, "Mapped_VOYAGE_File.xlsx");
    assert_eq!(
        outcome.document.content_type,
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
}

#[test]
fn output_reads_back_through_calamine() {
    let rows = format!(
        r#"{}<row r="2">{}</row>"#,
        header_row(&["EVENT_TYPE", "PORT", "OTHER"]),
        number_cell("C2", "42")
    );
    let outcome = transfer(
        &source(&[("LOAD", None), ("DISCHARGE", Some("Rotterdam"))]),
        &target(&rows),
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let table = read_source_bytes(
        &outcome.document.bytes,
        &IngestOptions::default().with_sheet("VOYAGE"),
    )
    .unwrap();
    assert_eq!(table.columns(), ["EVENT_TYPE", "PORT", "OTHER"]);
    assert_eq!(table.height(), 2);
    assert_eq!(table.cell(0, "EVENT_TYPE"), Some(&CellValue::from("LOAD")));
    assert_eq!(table.cell(0, "PORT"), Some(&CellValue::Number(0.0)));
    assert_eq!(table.cell(0, "OTHER"), Some(&CellValue::Number(42.0)));
    assert_eq!(table.cell(1, "PORT"), Some(&CellValue::from("Rotterdam")));
    assert_eq!(table.cell(1, "OTHER"), Some(&CellValue::Missing));
}

#[test]
fn missing_source_columns_fail_before_writing() {
    let mut table = Table::new(vec!["Event".to_string()]);
    table.push_row(vec!["LOAD".into()]);
    let err = transfer(
        &table,
        &target(&header_row(&["EVENT_TYPE", "PORT"])),
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap_err();

    assert!(err.is_input_error());
    match err {
        TransferError::MissingColumns { columns } => assert_eq!(columns, ["From Port"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn missing_target_sheet_lists_available_sheets() {
    let workbook = WorkbookBuilder::new()
        .sheet("Summary", &header_row(&["EVENT_TYPE"]))
        .sheet("voyage", &header_row(&["EVENT_TYPE"]))
        .build();
    let err = transfer(
        &source(&[("LOAD", None)]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap_err();

    match err {
        TransferError::MissingSheet { sheet, available } => {
            assert_eq!(sheet, "VOYAGE");
            assert_eq!(available, ["Summary", "voyage"]);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn rows_are_offset_past_the_header() {
    let rows = format!(
        r#"{}<row r="3">{}</row>"#,
        header_row(&["PORT", "EVENT_TYPE"]),
        text_cell("C3", "keep")
    );
    let outcome = transfer(
        &source(&[("A", Some("p1")), ("B", Some("p2")), ("C", Some("p3"))]),
        &target(&rows),
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let sheet = read_entry(&outcome.document.bytes, SHEET_PART).unwrap();
    let row2 = sheet.find(r#"<row r="2">"#).unwrap();
    let row3 = sheet.find(r#"<row r="3">"#).unwrap();
    let row4 = sheet.find(r#"<row r="4">"#).unwrap();
    assert!(row2 < row3 && row3 < row4);
    assert!(sheet.contains(
        r#"<row r="3"><c r="A3" t="inlineStr"><is><t>p2</t></is></c><c r="B3" t="inlineStr"><is><t>B</t></is></c><c r="C3" t="inlineStr"><is><t>keep</t></is></c></row>"#
    ));
    assert_eq!(outcome.report.rows_written, 3);
    assert_eq!(outcome.report.cells_written, 6);
}

#[test]
fn last_duplicate_header_wins() {
    let outcome = transfer(
        &source(&[("LOAD", Some("Oslo"))]),
        &target(&header_row(&["PORT", "EVENT_TYPE", "PORT"])),
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let sheet = read_entry(&outcome.document.bytes, SHEET_PART).unwrap();
    assert!(sheet.contains(r#"<c r="C2" t="inlineStr"><is><t>Oslo</t></is></c>"#));
    assert!(!sheet.contains(r#"<c r="A2""#));
    let report = serde_json::to_value(&outcome.report).unwrap();
    assert_eq!(
        report["matched_columns"][1],
        serde_json::json!({ "name": "PORT", "column": 3, "letter": "C" })
    );
}

#[test]
fn unmatched_columns_are_skipped_and_reported() {
    let mapping = ColumnMapping::new([("Event", "EVENT_TYPE"), ("From Port", "NOT_IN_SHEET")]).unwrap();
    let outcome = transfer(
        &source(&[("LOAD", Some("Oslo"))]),
        &target(&header_row(&["EVENT_TYPE"])),
        &mapping,
        &TransferOptions::default(),
    )
    .unwrap();

    assert_eq!(outcome.report.skipped_columns, ["NOT_IN_SHEET"]);
    assert_eq!(outcome.report.cells_written, 1);
    // The mapped table still carries every mapped column.
    assert_eq!(outcome.mapped.width(), 2);
}

#[test]
fn untouched_cells_and_parts_are_unchanged() {
    let original_row = r#"<row r="2" spans="1:3" ht="20" customHeight="1"><c r="C2" s="2"><v>3.14159</v></c></row>"#;
    let rows = format!(r#"{}{original_row}"#, header_row(&["EVENT_TYPE", "PORT", "OTHER"]));
    let workbook = target(&rows);
    let outcome = transfer(
        &source(&[("LOAD", Some("Oslo"))]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();
    let output = &outcome.document.bytes;

    let sheet = read_entry(output, SHEET_PART).unwrap();
    assert!(sheet.contains(r#"<c r="C2" s="2"><v>3.14159</v></c>"#));
    assert!(sheet.contains(r#"<row r="2" ht="20" customHeight="1">"#));
    assert!(sheet.contains(&header_row(&["EVENT_TYPE", "PORT", "OTHER"])));

    assert_eq!(entry_names(output), entry_names(&workbook));
    for name in entry_names(&workbook) {
        if name != SHEET_PART {
            assert_eq!(read_entry(output, &name), read_entry(&workbook, &name), "{name}");
        }
    }
}

#[test]
fn repeated_transfers_are_byte_identical() {
    let rows = format!(
        r#"{}<row r="2">{}</row>"#,
        header_row(&["EVENT_TYPE", "PORT"]),
        number_cell("B2", "1")
    );
    let workbook = target(&rows);
    let table = source(&[("LOAD", None), ("SEA", Some("Oslo"))]);
    let run = || {
        transfer(&table, &workbook, &two_column_mapping(), &TransferOptions::default())
            .unwrap()
            .document
            .bytes
    };
    assert_eq!(run(), run());
}

#[test]
fn nothing_to_write_returns_the_target_unchanged() {
    let workbook = target(&header_row(&["SOMETHING_ELSE"]));
    let outcome = transfer(
        &source(&[("LOAD", None)]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.document.bytes, workbook);
    assert_eq!(outcome.report.cells_written, 0);
    assert_eq!(outcome.report.skipped_columns.len(), 2);
}

#[test]
fn shared_string_headers_are_resolved() {
    let rows = r#"<row r="1"><c r="A1" t="s"><v>1</v></c><c r="B1" t="s"><v>0</v></c></row>"#;
    let workbook = WorkbookBuilder::new()
        .shared_strings(&["EVENT_TYPE", "PORT"])
        .sheet("VOYAGE", rows)
        .build();
    let outcome = transfer(
        &source(&[("LOAD", Some("Oslo"))]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let sheet = read_entry(&outcome.document.bytes, "xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains(
        r#"<row r="2"><c r="A2" t="inlineStr"><is><t>Oslo</t></is></c><c r="B2" t="inlineStr"><is><t>LOAD</t></is></c></row>"#
    ));
}

#[test]
fn overwritten_formulas_drop_the_calc_chain() {
    let rows = format!(
        r#"{}<row r="2"><c r="A2" s="1"><f>1+1</f><v>2</v></c></row>"#,
        header_row(&["EVENT_TYPE", "PORT"])
    );
    let workbook = WorkbookBuilder::new()
        .sheet("VOYAGE", &rows)
        .calc_chain()
        .build();
    let outcome = transfer(
        &source(&[("LOAD", None)]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();
    let output = &outcome.document.bytes;

    assert_eq!(outcome.report.formulas_replaced, 1);
    assert!(outcome.report.calc_chain_dropped);
    assert!(read_entry(output, "xl/calcChain.xml").is_none());
    assert!(!read_entry(output, "xl/_rels/workbook.xml.rels").unwrap().contains("calcChain"));
    assert!(!read_entry(output, "[Content_Types].xml").unwrap().contains("calcChain"));

    let sheet = read_entry(output, "xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains(r#"<c r="A2" s="1" t="inlineStr"><is><t>LOAD</t></is></c>"#));
    assert!(!sheet.contains("<f>"));
}

#[test]
fn calc_chain_kept_when_no_formula_is_touched() {
    let rows = format!(
        r#"{}<row r="2"><c r="C2"><f>1+1</f><v>2</v></c></row>"#,
        header_row(&["EVENT_TYPE", "PORT"])
    );
    let workbook = WorkbookBuilder::new()
        .sheet("VOYAGE", &rows)
        .calc_chain()
        .build();
    let outcome = transfer(
        &source(&[("LOAD", None)]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    assert!(!outcome.report.calc_chain_dropped);
    assert!(read_entry(&outcome.document.bytes, "xl/calcChain.xml").is_some());
}

#[test]
fn prefixed_worksheet_markup_is_patched() {
    let xml = r#"<?xml version="1.0" encoding="UTF-8"?><x:worksheet xmlns:x="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><x:dimension ref="A1:B1"/><x:sheetData><x:row r="1"><x:c r="A1" t="inlineStr"><x:is><x:t>EVENT_TYPE</x:t></x:is></x:c><x:c r="B1" t="inlineStr"><x:is><x:t>PORT</x:t></x:is></x:c></x:row></x:sheetData></x:worksheet>"#;
    let workbook = WorkbookBuilder::new().raw_sheet("VOYAGE", xml).build();
    let outcome = transfer(
        &source(&[("LOAD", Some("Oslo"))]),
        &workbook,
        &two_column_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let sheet = read_entry(&outcome.document.bytes, "xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains(r#"<x:dimension ref="A1:B2"/>"#));
    assert!(sheet.contains(
        r#"<x:row r="2"><x:c r="A2" t="inlineStr"><x:is><x:t>LOAD</x:t></x:is></x:c><x:c r="B2" t="inlineStr"><x:is><x:t>Oslo</x:t></x:is></x:c></x:row></x:sheetData>"#
    ));
}

#[test]
fn custom_sheet_name_and_output_name() {
    let workbook = WorkbookBuilder::new()
        .sheet("Voyage Log", &header_row(&["EVENT_TYPE"]))
        .build();
    let options = TransferOptions {
        sheet_name: "Voyage Log".to_string(),
        output_file_name: "voyage-out.xlsx".to_string(),
    };
    let outcome = transfer(
        &source(&[("LOAD", None)]),
        &workbook,
        &two_column_mapping(),
        &options,
    )
    .unwrap();
    assert_eq!(outcome.report.sheet, "Voyage Log");
    assert_eq!(outcome.document.file_name, "voyage-out.xlsx");
}

#[test]
fn full_voyage_mapping_from_an_ingested_workbook() {
    let sources: Vec<&str> = VOYAGE_COLUMN_MAPPING.iter().map(|(source, _)| *source).collect();
    let mut source_rows = header_row(&sources);
    let mut data = String::new();
    for (index, _) in sources.iter().enumerate() {
        let reference = format!("{}2", common::column(index));
        match index {
            1 => data.push_str(&text_cell(&reference, "NOON")),
            // `From Port` left as an NA token.
            2 => data.push_str(&text_cell(&reference, "NA")),
            _ => data.push_str(&number_cell(&reference, &format!("{}.5", index))),
        }
    }
    source_rows.push_str(&format!(r#"<row r="2">{data}</row>"#));
    let source_workbook = WorkbookBuilder::new()
        .sheet("Consumption", &source_rows)
        .build();
    let table = read_source_bytes(&source_workbook, &IngestOptions::default()).unwrap();

    // Target headers in reverse order.
    let mut targets: Vec<&str> = VOYAGE_COLUMN_MAPPING.iter().map(|(_, target)| *target).collect();
    targets.reverse();
    let target_workbook = WorkbookBuilder::new()
        .sheet("VOYAGE", &header_row(&targets))
        .build();

    let outcome = transfer(
        &table,
        &target_workbook,
        &ColumnMapping::voyage(),
        &TransferOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.report.cells_written, 16);
    assert_eq!(outcome.report.matched_columns.len(), 16);

    let written = read_source_bytes(
        &outcome.document.bytes,
        &IngestOptions::default().with_sheet("VOYAGE"),
    )
    .unwrap();
    assert_eq!(written.cell(0, "EVENT_TYPE"), Some(&CellValue::from("NOON")));
    assert_eq!(written.cell(0, "PORT"), Some(&CellValue::Number(0.0)));
    assert_eq!(written.cell(0, "HFO_ROB"), Some(&CellValue::Number(15.5)));
    assert_eq!(written.cell(0, "TIMESTAMP"), Some(&CellValue::Number(0.5)));
}

fn timestamp_source() -> Table {
    let rows = format!(
        r#"{}<row r="2">{}</row>"#,
        header_row(&["UTC Date & Time"]),
        styled_number_cell("A2", 1, "45306.5")
    );
    let workbook = WorkbookBuilder::new()
        .styles(&[r#"numFmtId="0""#, r#"numFmtId="22" applyNumberFormat="1""#])
        .sheet("Consumption", &rows)
        .build();
    read_source_bytes(&workbook, &IngestOptions::default()).unwrap()
}

fn timestamp_mapping() -> ColumnMapping {
    ColumnMapping::new([("UTC Date & Time", "TIMESTAMP")]).unwrap()
}

#[test]
fn dates_keep_a_date_format_without_a_stylesheet() {
    let source = timestamp_source();
    assert_eq!(
        source.cell(0, "UTC Date & Time"),
        Some(&CellValue::DateTime(45306.5))
    );

    let target = WorkbookBuilder::new()
        .sheet("VOYAGE", &header_row(&["TIMESTAMP"]))
        .build();
    let outcome = transfer(
        &source,
        &target,
        &timestamp_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();
    assert_eq!(outcome.report.dates_formatted, 1);

    let sheet = read_entry(&outcome.document.bytes, "xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains(r#"<row r="2"><c r="A2" s="1"><v>45306.5</v></c></row>"#));
    assert!(entry_names(&outcome.document.bytes).contains(&"xl/styles.xml".to_string()));
    let types = read_entry(&outcome.document.bytes, "[Content_Types].xml").unwrap();
    assert!(types.contains(r#"PartName="/xl/styles.xml""#));
    let rels = read_entry(&outcome.document.bytes, "xl/_rels/workbook.xml.rels").unwrap();
    assert!(rels.contains(r#"Target="styles.xml""#));

    let written = read_source_bytes(
        &outcome.document.bytes,
        &IngestOptions::default().with_sheet("VOYAGE"),
    )
    .unwrap();
    assert_eq!(
        written.cell(0, "TIMESTAMP"),
        Some(&CellValue::DateTime(45306.5))
    );
}

#[test]
fn dates_extend_an_existing_stylesheet_once() {
    let rows = format!(
        r#"{}<row r="2">{}</row>"#,
        header_row(&["TIMESTAMP", "NOTE"]),
        styled_number_cell("B2", 1, "3")
    );
    let target = WorkbookBuilder::new()
        .styles(&[r#"numFmtId="0""#, r#"numFmtId="4""#])
        .sheet("VOYAGE", &rows)
        .build();
    let outcome = transfer(
        &timestamp_source(),
        &target,
        &timestamp_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();

    let styles = read_entry(&outcome.document.bytes, "xl/styles.xml").unwrap();
    assert!(styles.contains(r#"<cellXfs count="3">"#));
    assert!(styles.contains(r#"<xf numFmtId="22" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs>"#));
    let sheet = read_entry(&outcome.document.bytes, "xl/worksheets/sheet1.xml").unwrap();
    assert!(sheet.contains(r#"<c r="A2" s="2"><v>45306.5</v></c><c r="B2" s="1"><v>3</v></c>"#));

    // Writing again over the output finds the date format already in place.
    let again = transfer(
        &timestamp_source(),
        &outcome.document.bytes,
        &timestamp_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();
    assert_eq!(again.report.dates_formatted, 0);
    assert_eq!(
        read_entry(&again.document.bytes, "xl/styles.xml").unwrap(),
        styles
    );
}

#[test]
fn stylesheet_and_calc_chain_edits_combine() {
    let rows = format!(
        r#"{}<row r="2"><c r="A2"><f>NOW()</f><v>45000</v></c></row>"#,
        header_row(&["TIMESTAMP"])
    );
    let target = WorkbookBuilder::new()
        .sheet("VOYAGE", &rows)
        .calc_chain()
        .build();
    let outcome = transfer(
        &timestamp_source(),
        &target,
        &timestamp_mapping(),
        &TransferOptions::default(),
    )
    .unwrap();
    assert!(outcome.report.calc_chain_dropped);
    assert_eq!(outcome.report.dates_formatted, 1);

    let rels = read_entry(&outcome.document.bytes, "xl/_rels/workbook.xml.rels").unwrap();
    assert!(rels.contains("/styles"));
    assert!(!rels.contains("/calcChain"));
    let types = read_entry(&outcome.document.bytes, "[Content_Types].xml").unwrap();
    assert!(types.contains("/xl/styles.xml"));
    assert!(!types.contains("/xl/calcChain.xml"));
    assert!(read_entry(&outcome.document.bytes, "xl/calcChain.xml").is_none());
}
