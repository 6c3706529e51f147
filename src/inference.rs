//! Single-request scoring: the one externally invoked entry point of the
//! serving path.
//!
//! A request flows derive -> encode -> persist encoder state -> assemble ->
//! predict -> tier. The encoder table is re-read and the encode step re-run
//! whenever a concurrent request wins the compare-and-swap, so a category
//! assigned by another writer is observed rather than overwritten.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::assembler::{assemble, FeatureVector};
use crate::classifier::RiskClassifier;
use crate::encoder_store::SledEncoderStore;
use crate::errors::{RiskError, RiskResult};
use crate::record::{FieldValue, Record};
use crate::risk_tier::RiskTier;

/// Categorical request fields, in the order they are encoded.
pub const CATEGORICAL_FIELDS: [&str; 3] = ["home_ownership", "purpose", "verification_status"];

/// Attempts at the load-encode-save cycle before giving up.
const MAX_SAVE_ATTEMPTS: usize = 5;

/// One applicant, as received from the HTTP layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoreRequest {
    pub annual_inc: f64,
    pub loan_amnt: f64,
    pub term_num: f64,
    pub int_rate_num: f64,
    pub dti: f64,
    pub home_ownership: String,
    pub purpose: String,
    pub verification_status: String,
}

/// The verdict returned to the caller.
#[derive(Debug, Clone, Copy)]
pub struct Scored {
    pub tier: RiskTier,
    pub probability: f64,
}

/// Orchestrates feature derivation, encoding, persistence, scoring and the
/// tier verdict for single requests.
pub struct InferenceService<C: RiskClassifier> {
    classifier: C,
    store: SledEncoderStore,
}

impl<C: RiskClassifier> InferenceService<C> {
    pub fn new(classifier: C, store: SledEncoderStore) -> Self {
        Self { classifier, store }
    }

    /// Score one applicant. Encoder extensions introduced by this request are
    /// durable before the verdict is returned.
    pub fn score(&self, request: &ScoreRequest) -> RiskResult<Scored> {
        let vector = self.encode_request(request)?;
        let probability = self.classifier.predict_proba(&[vector])?[0];
        let tier = RiskTier::from_probability(probability)?;
        debug!(probability, tier = %tier, "scored applicant");
        Ok(Scored { tier, probability })
    }

    /// Build the canonical feature vector, extending and persisting the
    /// encoder table as needed. Retries the whole cycle on write conflicts.
    fn encode_request(&self, request: &ScoreRequest) -> RiskResult<FeatureVector> {
        for attempt in 0..MAX_SAVE_ATTEMPTS {
            let mut table = self.store.load()?;

            let mut record = derive_serving_record(request);
            let mut extended = false;
            for field in CATEGORICAL_FIELDS {
                let raw = match record.get(field).and_then(FieldValue::as_text) {
                    Some(text) => vec![text.to_string()],
                    None => return Err(RiskError::schema(field)),
                };
                let (codes, changed) = table.fit_or_extend(field, &raw);
                extended |= changed;
                record.insert(field.to_string(), FieldValue::Num(codes[0] as f64));
            }

            if extended {
                if !self.store.save_if_current(&table)? {
                    warn!(attempt, "encoder table version conflict, retrying");
                    continue;
                }
            }

            return assemble(&record);
        }

        Err(RiskError::persistence(
            "save_encoder_table",
            format!("version conflict persisted across {MAX_SAVE_ATTEMPTS} attempts"),
        ))
    }
}

/// Serving-side feature derivation: the installment is reconstructed from the
/// loan amount and term, after which the raw loan amount and income are
/// dropped from the feature set.
pub fn derive_serving_record(request: &ScoreRequest) -> Record {
    let mut record = Record::new();
    let installment = request.loan_amnt / (request.term_num + 1e-6);
    record.insert("installment".into(), FieldValue::Num(installment));
    record.insert("dti".into(), FieldValue::Num(request.dti));
    record.insert("term_num".into(), FieldValue::Num(request.term_num));
    record.insert("int_rate_num".into(), FieldValue::Num(request.int_rate_num));
    record.insert(
        "home_ownership".into(),
        FieldValue::Text(request.home_ownership.clone()),
    );
    record.insert("purpose".into(), FieldValue::Text(request.purpose.clone()));
    record.insert(
        "verification_status".into(),
        FieldValue::Text(request.verification_status.clone()),
    );
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::{GbdtClassifier, GbdtParams, RiskClassifier};
    use tempfile::tempdir;

    fn sample_request() -> ScoreRequest {
        ScoreRequest {
            annual_inc: 60000.0,
            loan_amnt: 12000.0,
            term_num: 36.0,
            int_rate_num: 13.5,
            dti: 18.0,
            home_ownership: "RENT".into(),
            purpose: "debt_consolidation".into(),
            verification_status: "Verified".into(),
        }
    }

    fn trained_classifier() -> GbdtClassifier {
        let params = GbdtParams {
            max_depth: 3,
            iterations: 20,
            shrinkage: 0.1,
            data_sample_ratio: 1.0,
            feature_sample_ratio: 1.0,
        };
        let mut clf = GbdtClassifier::new(params);
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..20 {
            let jitter = (i % 4) as f64;
            features.push([850.0 + jitter, 32.0, 0.0, 1.0, 0.0, 60.0, 24.0]);
            labels.push(1);
            features.push([150.0 + jitter, 9.0, 1.0, 0.0, 1.0, 36.0, 7.0]);
            labels.push(0);
        }
        clf.fit(&features, &labels).unwrap();
        clf
    }

    #[test]
    fn serving_derivation_reconstructs_installment_and_drops_raws() {
        let record = derive_serving_record(&sample_request());
        let installment = record.get("installment").unwrap().as_num().unwrap();
        assert!((installment - 12000.0 / 36.000001).abs() < 1e-6);
        assert!(record.get("loan_amnt").is_none());
        assert!(record.get("annual_inc").is_none());
    }

    #[test]
    fn score_returns_probability_and_consistent_tier() {
        let dir = tempdir().expect("temp dir");
        let store = SledEncoderStore::open(dir.path()).expect("open store");

        // Pre-seed the encoder with the request's categories.
        let mut table = store.load().unwrap();
        table.fit_or_extend("home_ownership", &["RENT".to_string(), "OWN".to_string()]);
        table.fit_or_extend("purpose", &["debt_consolidation".to_string()]);
        table.fit_or_extend("verification_status", &["Verified".to_string()]);
        store.save_if_current(&table).unwrap();

        let service = InferenceService::new(trained_classifier(), store);
        let scored = service.score(&sample_request()).unwrap();

        assert!((0.0..=1.0).contains(&scored.probability));
        assert_eq!(
            scored.tier,
            RiskTier::from_probability(scored.probability).unwrap()
        );
    }

    #[test]
    fn unseen_category_extends_and_persists_the_table() {
        let dir = tempdir().expect("temp dir");

        {
            let store = SledEncoderStore::open(dir.path()).expect("open store");
            let service = InferenceService::new(trained_classifier(), store);
            service.score(&sample_request()).unwrap();
        }

        // A fresh handle observes the codes this request introduced.
        let store = SledEncoderStore::open(dir.path()).expect("reopen store");
        let table = store.load().unwrap();
        assert_eq!(table.resolve("home_ownership", "RENT"), 0);
        assert_eq!(table.resolve("purpose", "debt_consolidation"), 0);
        assert_eq!(table.resolve("verification_status", "Verified"), 0);
        assert_eq!(table.version, 1);
    }

    #[test]
    fn known_categories_do_not_rewrite_the_table() {
        let dir = tempdir().expect("temp dir");

        {
            let store = SledEncoderStore::open(dir.path()).expect("open store");
            let service = InferenceService::new(trained_classifier(), store);
            service.score(&sample_request()).unwrap();
            // Second request with already-known categories: no extension, no
            // version bump.
            service.score(&sample_request()).unwrap();
        }

        let store = SledEncoderStore::open(dir.path()).expect("reopen store");
        assert_eq!(store.load().unwrap().version, 1);
    }
}
