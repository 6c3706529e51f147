//! Offline pipeline: cleaning, feature engineering, model fitting.
//!
//! Training is a batch, single-threaded pass over an immutable dataset
//! snapshot. The same assembler that serves requests builds the training
//! matrix, so the matrix column order and the serving vector order cannot
//! drift apart.

use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;
use tracing::info;

use crate::assembler::{assemble, FeatureVector, CANONICAL_ORDER};
use crate::classifier::{GbdtClassifier, GbdtParams, RiskClassifier};
use crate::dataset::{load_csv, save_csv};
use crate::encoder::EncoderTable;
use crate::encoder_store::SledEncoderStore;
use crate::errors::{RiskError, RiskResult};
use crate::evaluation::roc_auc;
use crate::feature_derive::{derive_features, derive_risk_flag, RISK_FLAG};
use crate::imputer::{impute, NUMERIC_IMPUTE_FIELDS, TEXT_COERCE_FIELDS};
use crate::inference::CATEGORICAL_FIELDS;
use crate::record::{FieldValue, RecordSet};
use crate::schema_filter::{filter_records, KEEP_COLS, TARGET_COL};

/// Holdout fraction for the fit-time quality check.
const TEST_FRACTION: f64 = 0.2;

/// Summary of a completed training run.
#[derive(Debug, Clone, Serialize)]
pub struct TrainOutcome {
    pub rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub auc: f64,
    pub accuracy: f64,
}

/// Manifest written next to the model artifact.
#[derive(Serialize, Debug)]
struct ModelManifest {
    model_file: String,
    sha256: String,
    feature_order: Vec<String>,
    params: GbdtParams,
    trained_rows: usize,
    auc: f64,
    timestamp: DateTime<Utc>,
}

/// Stage 1: retain recognized columns, drop unlabeled rows, fill gaps.
pub fn prepare(input: &Path, output: &Path) -> RiskResult<usize> {
    let raw = load_csv(input)?;
    let mut filtered = filter_records(&raw, &KEEP_COLS, TARGET_COL);
    impute(&mut filtered, &NUMERIC_IMPUTE_FIELDS, &TEXT_COERCE_FIELDS)?;
    save_csv(&filtered, output)?;
    info!(
        rows_in = raw.len(),
        rows_out = filtered.len(),
        "prepared dataset"
    );
    Ok(filtered.len())
}

/// Stage 2: derived numeric features plus the supervised target.
pub fn engineer(input: &Path, output: &Path) -> RiskResult<usize> {
    let mut set = load_csv(input)?;
    derive_features(&mut set);
    derive_risk_flag(&mut set)?;
    save_csv(&set, output)?;
    info!(rows = set.len(), "engineered features");
    Ok(set.len())
}

/// Pull labels out of the engineered set; every row must carry the flag.
fn labels_of(set: &RecordSet) -> RiskResult<Vec<u8>> {
    if !set.has_column(RISK_FLAG) {
        return Err(RiskError::data(
            RISK_FLAG,
            "dataset must contain a derivable status field",
        ));
    }
    set.rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            row.get(RISK_FLAG)
                .and_then(FieldValue::as_num)
                .map(|f| if f >= 0.5 { 1u8 } else { 0u8 })
                .ok_or_else(|| RiskError::data(RISK_FLAG, format!("missing label at row {i}")))
        })
        .collect()
}

/// Encode the categorical columns in place with a freshly fit table.
fn encode_training_set(set: &mut RecordSet) -> RiskResult<EncoderTable> {
    let mut table = EncoderTable::new();
    for field in CATEGORICAL_FIELDS {
        if !set.has_column(field) {
            return Err(RiskError::schema(field));
        }
        let values: Vec<String> = set
            .rows
            .iter()
            .map(|row| {
                row.get(field)
                    .map(FieldValue::coerce_text)
                    .unwrap_or_else(|| "nan".to_string())
            })
            .collect();
        let (codes, _) = table.fit_or_extend(field, &values);
        for (row, code) in set.rows.iter_mut().zip(codes) {
            row.insert(field.to_string(), FieldValue::Num(code as f64));
        }
    }
    Ok(table)
}

/// Assemble the full matrix; a row whose derivation left a canonical field
/// missing aborts the run naming the field and row.
fn build_matrix(set: &RecordSet) -> RiskResult<Vec<FeatureVector>> {
    set.rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            assemble(row).map_err(|e| match e {
                RiskError::Schema { field } => RiskError::data(
                    field,
                    format!("row {i} has no usable value for this canonical field"),
                ),
                other => other,
            })
        })
        .collect()
}

/// Seeded shuffle split of row indices into (train, test).
fn split_indices(rows: usize, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..rows).collect();
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    let test_len = ((rows as f64) * TEST_FRACTION).round() as usize;
    let test = indices[..test_len].to_vec();
    let train = indices[test_len..].to_vec();
    (train, test)
}

fn hash_file(path: &Path) -> RiskResult<String> {
    let data = fs::read(path)?;
    let mut hasher = Sha256::new();
    hasher.update(&data);
    Ok(format!("{:x}", hasher.finalize()))
}

fn write_manifest(
    model_path: &Path,
    sha: &str,
    params: &GbdtParams,
    trained_rows: usize,
    auc: f64,
) -> RiskResult<()> {
    let manifest = ModelManifest {
        model_file: model_path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string(),
        sha256: sha.to_string(),
        feature_order: CANONICAL_ORDER.iter().map(|s| s.to_string()).collect(),
        params: params.clone(),
        trained_rows,
        auc,
        timestamp: Utc::now(),
    };

    let manifest_path = model_path.with_extension("manifest.json");
    let manifest_json = serde_json::to_string_pretty(&manifest)
        .map_err(|e| RiskError::serialization("encode_manifest", e))?;
    fs::write(&manifest_path, manifest_json)?;
    Ok(())
}

/// Stage 3: fit the classifier on the engineered dataset and persist the
/// model artifact, its manifest, and the encoder table.
pub fn train(
    input: &Path,
    model_path: &Path,
    encoder_db: &Path,
    params: GbdtParams,
    seed: u64,
) -> RiskResult<TrainOutcome> {
    let mut set = load_csv(input)?;
    let labels = labels_of(&set)?;
    let table = encode_training_set(&mut set)?;
    let matrix = build_matrix(&set)?;

    let (train_idx, test_idx) = split_indices(matrix.len(), seed);
    if train_idx.is_empty() {
        return Err(RiskError::data("dataset", "not enough rows to train on"));
    }

    let train_x: Vec<FeatureVector> = train_idx.iter().map(|&i| matrix[i]).collect();
    let train_y: Vec<u8> = train_idx.iter().map(|&i| labels[i]).collect();
    let test_x: Vec<FeatureVector> = test_idx.iter().map(|&i| matrix[i]).collect();
    let test_y: Vec<u8> = test_idx.iter().map(|&i| labels[i]).collect();

    let mut classifier = GbdtClassifier::new(params.clone());
    classifier.fit(&train_x, &train_y)?;

    let (auc, accuracy) = if test_x.is_empty() {
        (f64::NAN, f64::NAN)
    } else {
        let probs = classifier.predict_proba(&test_x)?;
        let auc = roc_auc(&test_y, &probs);
        let correct = probs
            .iter()
            .zip(test_y.iter())
            .filter(|(p, y)| (**p >= 0.5) == (**y == 1))
            .count();
        (auc, correct as f64 / test_y.len() as f64)
    };

    classifier.save(model_path)?;
    let sha = hash_file(model_path)?;
    write_manifest(model_path, &sha, &params, train_x.len(), auc)?;

    let store = SledEncoderStore::open(encoder_db)?;
    store.save(&table)?;

    info!(
        auc,
        accuracy,
        rows = matrix.len(),
        model = %model_path.display(),
        "training complete"
    );

    Ok(TrainOutcome {
        rows: matrix.len(),
        train_rows: train_x.len(),
        test_rows: test_x.len(),
        auc,
        accuracy,
    })
}
