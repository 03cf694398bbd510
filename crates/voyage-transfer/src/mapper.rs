//! Projection of the source table onto the mapped columns.

use voyage_model::{CellValue, ColumnMapping, Table};

use crate::error::{Result, TransferError};

/// Mapping source columns absent from `source`, in mapping order.
pub fn missing_columns(source: &Table, mapping: &ColumnMapping) -> Vec<String> {
    mapping
        .sources()
        .filter(|column| !source.has_column(column))
        .map(str::to_string)
        .collect()
}

/// Selects the mapped columns in mapping order, renames them and fills
/// missing cells with zero.
pub fn map_columns(source: &Table, mapping: &ColumnMapping) -> Result<Table> {
    let missing = missing_columns(source, mapping);
    if !missing.is_empty() {
        return Err(TransferError::MissingColumns { columns: missing });
    }

    let indices: Vec<usize> = mapping
        .sources()
        .filter_map(|column| source.column_index(column))
        .collect();
    let mut mapped = Table::new(mapping.targets().map(str::to_string).collect());
    for row in source.rows() {
        mapped.push_row(
            indices
                .iter()
                .map(|&index| row[index].clone().or_fill())
                .collect::<Vec<CellValue>>(),
        );
    }

    tracing::debug!(
        rows = mapped.height(),
        columns = mapped.width(),
        "Mapped source columns"
    );
    Ok(mapped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use voyage_model::FILL_VALUE;

    fn source() -> Table {
        let mut table = Table::new(vec![
            "Unused".to_string(),
            "From Port".to_string(),
            "Event".to_string(),
        ]);
        table.push_row(vec!["x".into(), CellValue::Missing, "LOAD".into()]);
        table.push_row(vec!["y".into(), "Rotterdam".into(), CellValue::Number(f64::NAN)]);
        table
    }

    fn mapping() -> ColumnMapping {
        ColumnMapping::new([("Event", "EVENT_TYPE"), ("From Port", "PORT")]).unwrap()
    }

    #[test]
    fn test_map_columns_orders_renames_and_fills() {
        let mapped = map_columns(&source(), &mapping()).unwrap();
        assert_eq!(mapped.columns(), ["EVENT_TYPE", "PORT"]);
        assert_eq!(mapped.rows()[0], vec!["LOAD".into(), FILL_VALUE]);
        assert_eq!(mapped.rows()[1], vec![FILL_VALUE, "Rotterdam".into()]);
        assert_eq!(mapped.missing_count(), 0);
    }

    #[test]
    fn test_missing_columns_in_mapping_order() {
        let mapping = ColumnMapping::new([
            ("ROB VLSFO", "HFO_ROB"),
            ("Event", "EVENT_TYPE"),
            ("ROB LS MGO", "MGO_ROB"),
        ])
        .unwrap();
        assert_eq!(missing_columns(&source(), &mapping), ["ROB VLSFO", "ROB LS MGO"]);
        let err = map_columns(&source(), &mapping).unwrap_err();
        assert!(matches!(err, TransferError::MissingColumns { ref columns } if columns.len() == 2));
    }

    #[test]
    fn test_map_empty_source_keeps_columns() {
        let table = Table::new(vec!["Event".to_string(), "From Port".to_string()]);
        let mapped = map_columns(&table, &mapping()).unwrap();
        assert_eq!(mapped.width(), 2);
        assert_eq!(mapped.height(), 0);
    }
}
