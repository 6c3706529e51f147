//! Categorical value encoding with a stable integer code per observed value.
//!
//! The table is the single train/serve contract for categorical fields: codes
//! assigned at training time must resolve identically at serving time. The
//! transitions are pure with respect to storage; persistence and versioning
//! live in `encoder_store`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Code returned for a value the field's mapping has never seen.
pub const UNSEEN_SENTINEL: i64 = -1;

/// Per-field mapping from observed text value to a contiguous integer code,
/// together with the optimistic-concurrency version of the persisted unit.
///
/// Codes for a field start at 0 and are assigned in first-seen order, so the
/// next free code is always the mapping's length.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderTable {
    /// Version of the persisted snapshot this table was loaded from.
    /// 0 means "never persisted".
    #[serde(default)]
    pub version: u64,
    mappings: BTreeMap<String, BTreeMap<String, i64>>,
}

impl EncoderTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_field(&self, field: &str) -> bool {
        self.mappings.contains_key(field)
    }

    /// Number of distinct codes assigned for a field.
    pub fn code_count(&self, field: &str) -> usize {
        self.mappings.get(field).map(BTreeMap::len).unwrap_or(0)
    }

    /// Resolve a single value read-only. Unseen values (or an absent field
    /// mapping) resolve to the sentinel, never an error.
    pub fn resolve(&self, field: &str, value: &str) -> i64 {
        self.mappings
            .get(field)
            .and_then(|m| m.get(value))
            .copied()
            .unwrap_or(UNSEEN_SENTINEL)
    }

    /// Translate values through the stored mapping without mutating it.
    pub fn apply(&self, field: &str, values: &[String]) -> Vec<i64> {
        values.iter().map(|v| self.resolve(field, v)).collect()
    }

    /// Translate values, assigning fresh contiguous codes to any value the
    /// field has not seen before. An absent field mapping is created. Returns
    /// the codes and whether the table changed.
    pub fn fit_or_extend(&mut self, field: &str, values: &[String]) -> (Vec<i64>, bool) {
        let mapping = self.mappings.entry(field.to_string()).or_default();
        let before = mapping.len();

        let codes = values
            .iter()
            .map(|value| {
                let next = mapping.len() as i64;
                *mapping.entry(value.clone()).or_insert(next)
            })
            .collect();

        (codes, mapping.len() != before)
    }
}
