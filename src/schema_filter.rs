//! Column allow-listing and target filtering over raw record sets.
//!
//! The raw export carries far more columns than the model consumes. Only the
//! recognized inputs and the target label survive this stage; rows with no
//! target value are unusable for supervised training and are dropped here.

use crate::record::{FieldValue, Record, RecordSet};

/// Columns retained from the raw dataset, target last.
pub const KEEP_COLS: [&str; 10] = [
    "loan_amnt",
    "term",
    "int_rate",
    "installment",
    "annual_inc",
    "dti",
    "home_ownership",
    "purpose",
    "verification_status",
    "loan_status",
];

/// The supervised target column.
pub const TARGET_COL: &str = "loan_status";

/// Retain only allow-listed columns present in the input and drop rows
/// lacking a target value. Pure: the input set is untouched.
pub fn filter_records(set: &RecordSet, keep_cols: &[&str], target: &str) -> RecordSet {
    let columns: Vec<String> = keep_cols
        .iter()
        .filter(|c| set.has_column(c))
        .map(|c| c.to_string())
        .collect();

    let mut out = RecordSet::new(columns.clone());
    for row in &set.rows {
        let has_target = row
            .get(target)
            .map(|v| !v.is_missing())
            .unwrap_or(false);
        if !has_target {
            continue;
        }

        let mut filtered: Record = Record::new();
        for col in &columns {
            let value = row.get(col).cloned().unwrap_or(FieldValue::Missing);
            filtered.insert(col.clone(), value);
        }
        out.rows.push(filtered);
    }
    out
}
