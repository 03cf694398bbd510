use comfy_table::modifiers::{UTF8_ROUND_CORNERS, UTF8_SOLID_INNER_BORDERS};
use comfy_table::presets::{UTF8_FULL, UTF8_FULL_CONDENSED};
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use voyage_cli::pipeline::TransferRun;
use voyage_model::{CellValue, ColumnMapping};
use voyage_transfer::TransferReport;

pub fn print_summary(run: &TransferRun, preview_rows: usize) {
    let report = &run.outcome.report;
    println!("Sheet: {}", report.sheet);
    match &run.written_to {
        Some(path) => println!("Output: {}", path.display()),
        None => println!("Output: (dry run, not written)"),
    }
    if preview_rows > 0 {
        print_preview(&run.outcome.mapped, preview_rows);
    }
    print_column_table(report);
    print_totals(run);
}

pub fn print_json(run: &TransferRun) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&run.outcome.report)?);
    Ok(())
}

pub fn print_mapping(mapping: &ColumnMapping) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("#"),
        header_cell("Source column"),
        header_cell("Target header"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 0, CellAlignment::Right);
    for (index, pair) in mapping.pairs().iter().enumerate() {
        table.add_row(vec![
            dim_cell(index + 1),
            Cell::new(&pair.source),
            Cell::new(&pair.target)
                .fg(Color::Blue)
                .add_attribute(Attribute::Bold),
        ]);
    }
    println!("{table}");
}

fn print_preview(mapped: &voyage_model::Table, limit: usize) {
    let mut table = Table::new();
    table.set_header(mapped.columns().iter().map(|name| header_cell(name)));
    apply_table_style(&mut table);
    for row in mapped.rows().iter().take(limit) {
        table.add_row(row.iter().map(value_cell));
    }
    println!();
    println!(
        "Preview ({} of {} rows):",
        limit.min(mapped.height()),
        mapped.height()
    );
    println!("{table}");
}

fn print_column_table(report: &TransferReport) {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Target header"),
        header_cell("Column"),
        header_cell("Status"),
    ]);
    apply_summary_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Center);
    align_column(&mut table, 2, CellAlignment::Center);
    for column in &report.matched_columns {
        table.add_row(vec![
            Cell::new(&column.name),
            Cell::new(&column.letter),
            Cell::new("✓")
                .fg(Color::Green)
                .add_attribute(Attribute::Bold),
        ]);
    }
    for name in &report.skipped_columns {
        table.add_row(vec![
            Cell::new(name).fg(Color::DarkGrey),
            dim_cell("-"),
            Cell::new("skipped").fg(Color::Yellow),
        ]);
    }
    println!();
    println!("{table}");
}

fn print_totals(run: &TransferRun) {
    let report = &run.outcome.report;
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Source rows"),
        header_cell("Rows written"),
        header_cell("Cells written"),
        header_cell("Skipped columns"),
        header_cell("Formulas replaced"),
    ]);
    apply_summary_table_style(&mut table);
    for index in 0..5 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    table.add_row(vec![
        Cell::new(run.source_rows),
        Cell::new(report.rows_written).add_attribute(Attribute::Bold),
        Cell::new(report.cells_written).add_attribute(Attribute::Bold),
        count_cell(report.skipped_columns.len(), Color::Yellow),
        count_cell(report.formulas_replaced, Color::Red),
    ]);
    println!("{table}");
    if report.dates_formatted > 0 {
        println!(
            "Date-time format applied to {} cells without one.",
            report.dates_formatted
        );
    }
    if report.calc_chain_dropped {
        println!("Calculation chain removed; it is rebuilt when the workbook is next opened.");
    }
}

fn value_cell(value: &CellValue) -> Cell {
    match value {
        CellValue::Number(_) | CellValue::DateTime(_) => {
            Cell::new(value).set_alignment(CellAlignment::Right)
        }
        CellValue::Bool(_) => Cell::new(value).set_alignment(CellAlignment::Center),
        CellValue::Text(_) => Cell::new(value),
        CellValue::Missing => dim_cell("-"),
    }
}

fn count_cell(count: usize, color: Color) -> Cell {
    if count > 0 {
        Cell::new(count).fg(color).add_attribute(Attribute::Bold)
    } else {
        dim_cell(count)
    }
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(160);
}

fn apply_summary_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .apply_modifier(UTF8_SOLID_INNER_BORDERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_width(120);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value).fg(Color::DarkGrey)
}
