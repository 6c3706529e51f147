//! CSV ingestion and export for the offline pipeline stages.
//!
//! Cells are typed on read: parseable numbers become numeric, empty cells and
//! the usual NA spellings become missing, anything else stays text. Column
//! order is preserved so each stage's output is diffable against its input.

use csv::{ReaderBuilder, WriterBuilder};
use std::path::Path;

use crate::errors::{RiskError, RiskResult};
use crate::record::{FieldValue, Record, RecordSet};

/// Cell spellings treated as a missing value on read.
const NA_SPELLINGS: [&str; 4] = ["", "NA", "NaN", "nan"];

fn parse_cell(raw: &str) -> FieldValue {
    let trimmed = raw.trim();
    if NA_SPELLINGS.contains(&trimmed) {
        return FieldValue::Missing;
    }
    match trimmed.parse::<f64>() {
        Ok(n) => FieldValue::Num(n),
        Err(_) => FieldValue::Text(trimmed.to_string()),
    }
}

/// Load a CSV file into a typed record set.
pub fn load_csv(path: &Path) -> RiskResult<RecordSet> {
    let mut reader = ReaderBuilder::new()
        .flexible(false)
        .from_path(path)
        .map_err(|e| RiskError::data("csv", format!("{}: {e}", path.display())))?;

    let columns: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut set = RecordSet::new(columns.clone());
    for result in reader.records() {
        let row = result?;
        let mut record = Record::new();
        for (column, cell) in columns.iter().zip(row.iter()) {
            record.insert(column.clone(), parse_cell(cell));
        }
        set.rows.push(record);
    }
    Ok(set)
}

/// Write a record set back out as CSV. Missing values become empty cells.
pub fn save_csv(set: &RecordSet, path: &Path) -> RiskResult<()> {
    let mut writer = WriterBuilder::new()
        .from_path(path)
        .map_err(|e| RiskError::data("csv", format!("{}: {e}", path.display())))?;

    writer.write_record(&set.columns)?;
    for row in &set.rows {
        let cells: Vec<String> = set
            .columns
            .iter()
            .map(|column| match row.get(column) {
                Some(FieldValue::Missing) | None => String::new(),
                Some(value) => value.coerce_text(),
            })
            .collect();
        writer.write_record(&cells)?;
    }
    writer.flush()?;
    Ok(())
}
