//! Missing-value handling after schema filtering.
//!
//! Numeric gaps are filled with the column median computed over the same
//! dataset; categorical columns are coerced to text so downstream encoding
//! sees a total function. A numeric column with no present values at all has
//! no defined median and aborts the batch.

use crate::errors::{RiskError, RiskResult};
use crate::record::{FieldValue, RecordSet};

/// Numeric columns eligible for median imputation.
pub const NUMERIC_IMPUTE_FIELDS: [&str; 2] = ["annual_inc", "dti"];

/// Columns coerced to text before encoding. The raw term string rides along
/// so its digits can still be extracted later.
pub const TEXT_COERCE_FIELDS: [&str; 4] =
    ["term", "home_ownership", "purpose", "verification_status"];

/// Median of the present values; None when the slice is empty.
fn median(values: &mut Vec<f64>) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 1 {
        Some(values[mid])
    } else {
        Some((values[mid - 1] + values[mid]) / 2.0)
    }
}

/// Fill numeric gaps with column medians and coerce categorical columns to
/// text, in place. After this pass the covered fields carry no missing values.
pub fn impute(
    set: &mut RecordSet,
    numeric_fields: &[&str],
    text_fields: &[&str],
) -> RiskResult<()> {
    for field in numeric_fields {
        if !set.has_column(field) {
            continue;
        }

        let mut present: Vec<f64> = set
            .rows
            .iter()
            .filter_map(|row| row.get(*field).and_then(FieldValue::as_num))
            .collect();

        let any_missing = set.rows.iter().any(|row| {
            row.get(*field)
                .map(|v| v.as_num().is_none())
                .unwrap_or(true)
        });
        if !any_missing {
            continue;
        }

        let fill = median(&mut present).ok_or_else(|| {
            RiskError::data(
                *field,
                "median undefined: every value in the column is missing",
            )
        })?;

        for row in &mut set.rows {
            let needs_fill = row
                .get(*field)
                .map(|v| v.as_num().is_none())
                .unwrap_or(true);
            if needs_fill {
                row.insert(field.to_string(), FieldValue::Num(fill));
            }
        }
    }

    for field in text_fields {
        if !set.has_column(field) {
            continue;
        }
        for row in &mut set.rows {
            let coerced = row
                .get(*field)
                .map(FieldValue::coerce_text)
                .unwrap_or_else(|| "nan".to_string());
            row.insert(field.to_string(), FieldValue::Text(coerced));
        }
    }

    Ok(())
}
