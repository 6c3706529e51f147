//! The trainable scoring function behind the pipeline.
//!
//! The pipeline only needs two capabilities from a classifier: fit a model on
//! a labeled feature matrix, and return the probability of default for new
//! vectors. Everything about the learner's internals stays behind the trait;
//! the default implementation is gradient boosted decision trees from the
//! `gbdt` crate, persisted as an opaque artifact.

use gbdt::config::Config;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::assembler::{FeatureVector, CANONICAL_ORDER};
use crate::errors::{RiskError, RiskResult};

/// A trainable scorer: fit on a labeled matrix, then produce the probability
/// of the positive (default) class per row.
pub trait RiskClassifier {
    fn fit(&mut self, features: &[FeatureVector], labels: &[u8]) -> RiskResult<()>;
    fn predict_proba(&self, features: &[FeatureVector]) -> RiskResult<Vec<f64>>;
}

/// Boosting hyperparameters, passed through opaquely to the learner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GbdtParams {
    pub max_depth: u32,
    pub iterations: usize,
    pub shrinkage: f64,
    pub data_sample_ratio: f64,
    pub feature_sample_ratio: f64,
}

impl Default for GbdtParams {
    fn default() -> Self {
        Self {
            max_depth: 5,
            iterations: 200,
            shrinkage: 0.1,
            data_sample_ratio: 0.8,
            feature_sample_ratio: 0.8,
        }
    }
}

/// Gradient-boosted-trees implementation of [`RiskClassifier`].
pub struct GbdtClassifier {
    params: GbdtParams,
    model: Option<GBDT>,
}

impl GbdtClassifier {
    pub fn new(params: GbdtParams) -> Self {
        Self {
            params,
            model: None,
        }
    }

    /// Load a previously trained model artifact.
    pub fn load(path: &Path) -> RiskResult<Self> {
        let path_str = path.to_string_lossy();
        let model = GBDT::load_model(&path_str).map_err(|e| {
            RiskError::persistence("load_model", format!("{path_str}: {e}"))
        })?;
        Ok(Self {
            params: GbdtParams::default(),
            model: Some(model),
        })
    }

    /// Save the trained model artifact. The file format belongs to the
    /// learner; callers treat it as opaque.
    pub fn save(&self, path: &Path) -> RiskResult<()> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| RiskError::internal("no trained model to save"))?;
        let path_str = path.to_string_lossy();
        model
            .save_model(&path_str)
            .map_err(|e| RiskError::persistence("save_model", format!("{path_str}: {e}")))
    }

    fn config(&self, feature_size: usize) -> Config {
        let mut cfg = Config::new();
        cfg.set_feature_size(feature_size);
        cfg.set_max_depth(self.params.max_depth);
        cfg.set_iterations(self.params.iterations);
        cfg.set_shrinkage(self.params.shrinkage as f32);
        cfg.set_data_sample_ratio(self.params.data_sample_ratio);
        cfg.set_feature_sample_ratio(self.params.feature_sample_ratio);
        // Binary log-likelihood loss: predictions come back as probabilities.
        cfg.set_loss("LogLikelyhood");
        cfg.set_debug(false);
        cfg.set_training_optimization_level(2);
        cfg
    }
}

impl RiskClassifier for GbdtClassifier {
    fn fit(&mut self, features: &[FeatureVector], labels: &[u8]) -> RiskResult<()> {
        if features.is_empty() {
            return Err(RiskError::data("features", "empty training matrix"));
        }
        if features.len() != labels.len() {
            return Err(RiskError::data(
                "labels",
                format!(
                    "label count {} does not match row count {}",
                    labels.len(),
                    features.len()
                ),
            ));
        }

        let mut train: DataVec = features
            .iter()
            .zip(labels.iter())
            .map(|(row, &label)| {
                let feature: Vec<f32> = row.iter().map(|v| *v as f32).collect();
                // Log-likelihood loss trains on +1/-1 targets.
                let target = if label == 1 { 1.0 } else { -1.0 };
                Data::new_training_data(feature, 1.0, target, None)
            })
            .collect();

        let mut model = GBDT::new(&self.config(CANONICAL_ORDER.len()));
        model.fit(&mut train);
        self.model = Some(model);
        Ok(())
    }

    fn predict_proba(&self, features: &[FeatureVector]) -> RiskResult<Vec<f64>> {
        let model = self
            .model
            .as_ref()
            .ok_or_else(|| RiskError::internal("classifier has no trained model"))?;

        let test: DataVec = features
            .iter()
            .map(|row| {
                let feature: Vec<f32> = row.iter().map(|v| *v as f32).collect();
                Data::new_test_data(feature, None)
            })
            .collect();

        let predictions = model.predict(&test);
        Ok(predictions.into_iter().map(f64::from).collect())
    }
}
