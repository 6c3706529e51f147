//! The canonical feature-order contract.
//!
//! The classifier sees positions, not names, so the assembled vector's order
//! is part of the model artifact's identity. Both the training matrix and
//! every serving request pass through this one function; a record missing any
//! canonical field is rejected outright rather than silently filled.

use crate::errors::{RiskError, RiskResult};
use crate::record::{FieldValue, Record};

/// Canonical field order consumed by the classifier.
pub const CANONICAL_ORDER: [&str; 7] = [
    "installment",
    "dti",
    "home_ownership",
    "purpose",
    "verification_status",
    "term_num",
    "int_rate_num",
];

/// Fixed-length feature vector in canonical order.
pub type FeatureVector = [f64; CANONICAL_ORDER.len()];

/// Select and order the canonical fields from a derived, encoded record.
/// Fields outside the canonical set (raw loan amount, raw income, the
/// auxiliary ratios) are dropped. Any absent canonical field is a schema
/// violation naming the field.
pub fn assemble(record: &Record) -> RiskResult<FeatureVector> {
    let mut vector: FeatureVector = [0.0; CANONICAL_ORDER.len()];
    for (i, field) in CANONICAL_ORDER.iter().enumerate() {
        let value = record
            .get(*field)
            .and_then(FieldValue::as_num)
            .ok_or_else(|| RiskError::schema(*field))?;
        vector[i] = value;
    }
    Ok(vector)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded_record() -> Record {
        let mut row = Record::new();
        row.insert("installment".into(), FieldValue::Num(408.0));
        row.insert("dti".into(), FieldValue::Num(18.0));
        row.insert("home_ownership".into(), FieldValue::Num(0.0));
        row.insert("purpose".into(), FieldValue::Num(2.0));
        row.insert("verification_status".into(), FieldValue::Num(1.0));
        row.insert("term_num".into(), FieldValue::Num(36.0));
        row.insert("int_rate_num".into(), FieldValue::Num(13.5));
        // Superseded raw fields must be ignored, not leak into the vector.
        row.insert("loan_amnt".into(), FieldValue::Num(12000.0));
        row.insert("annual_inc".into(), FieldValue::Num(60000.0));
        row.insert("payment_to_income".into(), FieldValue::Num(0.08));
        row
    }

    #[test]
    fn vector_follows_canonical_order() {
        let vector = assemble(&encoded_record()).unwrap();
        assert_eq!(vector, [408.0, 18.0, 0.0, 2.0, 1.0, 36.0, 13.5]);
    }

    #[test]
    fn missing_canonical_field_is_a_schema_error() {
        let mut row = encoded_record();
        row.remove("term_num");
        let err = assemble(&row).unwrap_err();
        match err {
            RiskError::Schema { field } => assert_eq!(field, "term_num"),
            other => panic!("expected schema error, got {other}"),
        }
    }

    #[test]
    fn missing_cell_is_a_schema_error() {
        let mut row = encoded_record();
        row.insert("int_rate_num".into(), FieldValue::Missing);
        assert!(matches!(
            assemble(&row),
            Err(RiskError::Schema { .. })
        ));
    }
}
