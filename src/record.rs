//! Tabular value and record types shared by the training and serving paths.

use std::collections::HashMap;

/// A single cell in a tabular record: numeric, text, or absent.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Num(f64),
    Text(String),
    Missing,
}

impl FieldValue {
    pub fn is_missing(&self) -> bool {
        matches!(self, FieldValue::Missing)
    }

    /// Numeric view of the value. Text that parses as a float counts.
    pub fn as_num(&self) -> Option<f64> {
        match self {
            FieldValue::Num(n) => Some(*n),
            FieldValue::Text(t) => t.trim().parse::<f64>().ok(),
            FieldValue::Missing => None,
        }
    }

    /// Textual view of the value. Numbers are stringified the way they
    /// round-trip through CSV; a missing value becomes the literal "nan"
    /// placeholder so categorical coercion is total.
    pub fn coerce_text(&self) -> String {
        match self {
            FieldValue::Text(t) => t.clone(),
            FieldValue::Num(n) => format_num(*n),
            FieldValue::Missing => "nan".to_string(),
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// Render a float without a trailing `.0` when it is integral.
pub fn format_num(n: f64) -> String {
    if n.fract() == 0.0 && n.is_finite() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

/// One applicant row: field name to value.
pub type Record = HashMap<String, FieldValue>;

/// An ordered set of records: the column order is preserved from the source
/// and extended as derivations add fields.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    pub columns: Vec<String>,
    pub rows: Vec<Record>,
}

impl RecordSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Register a column appended by a derivation. Idempotent.
    pub fn add_column(&mut self, name: &str) {
        if !self.has_column(name) {
            self.columns.push(name.to_string());
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
