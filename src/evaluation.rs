//! Offline model quality report.
//!
//! Scores an engineered dataset with a stored model and encoder table and
//! reports ranking quality (AUC), per-class precision/recall/F1, and the raw
//! confusion matrix as one JSON document.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::classifier::RiskClassifier;
use crate::encoder::EncoderTable;
use crate::errors::{RiskError, RiskResult};
use crate::record::{FieldValue, RecordSet};

/// Decision threshold used to turn probabilities into hard labels.
const DECISION_THRESHOLD: f64 = 0.5;

/// Per-class slice of the classification report.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ClassMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// The full evaluation document, serialized as the offline report.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationReport {
    pub auc: f64,
    pub accuracy: f64,
    pub classification_report: BTreeMap<String, ClassMetrics>,
    /// Rows are true class (0 then 1), columns predicted class.
    pub confusion_matrix: [[usize; 2]; 2],
    pub rows: usize,
}

/// Area under the ROC curve by the Mann-Whitney rank statistic, with the
/// midrank correction for tied scores. Degenerate single-class inputs score
/// 0.5 rather than erroring.
pub fn roc_auc(labels: &[u8], scores: &[f64]) -> f64 {
    let n = labels.len();
    debug_assert_eq!(n, scores.len());

    let positives = labels.iter().filter(|&&y| y == 1).count();
    let negatives = n - positives;
    if positives == 0 || negatives == 0 {
        return 0.5;
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| {
        scores[a]
            .partial_cmp(&scores[b])
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    // Midranks over tied score runs.
    let mut ranks = vec![0.0f64; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && scores[order[j + 1]] == scores[order[i]] {
            j += 1;
        }
        let midrank = ((i + 1 + j + 1) as f64) / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = midrank;
        }
        i = j + 1;
    }

    let positive_rank_sum: f64 = labels
        .iter()
        .zip(ranks.iter())
        .filter(|(&y, _)| y == 1)
        .map(|(_, r)| r)
        .sum();

    let p = positives as f64;
    let q = negatives as f64;
    (positive_rank_sum - p * (p + 1.0) / 2.0) / (p * q)
}

/// 2x2 confusion matrix: `matrix[true][predicted]`.
pub fn confusion_matrix(labels: &[u8], predictions: &[u8]) -> [[usize; 2]; 2] {
    let mut matrix = [[0usize; 2]; 2];
    for (&y, &p) in labels.iter().zip(predictions.iter()) {
        matrix[y.min(1) as usize][p.min(1) as usize] += 1;
    }
    matrix
}

/// Per-class precision/recall/F1 with support, from the confusion matrix.
pub fn classification_report(matrix: &[[usize; 2]; 2]) -> BTreeMap<String, ClassMetrics> {
    let mut report = BTreeMap::new();
    for class in 0..2 {
        let tp = matrix[class][class];
        let predicted: usize = (0..2).map(|t| matrix[t][class]).sum();
        let actual: usize = matrix[class].iter().sum();

        let precision = if predicted > 0 {
            tp as f64 / predicted as f64
        } else {
            0.0
        };
        let recall = if actual > 0 {
            tp as f64 / actual as f64
        } else {
            0.0
        };
        let f1 = if precision + recall > 0.0 {
            2.0 * precision * recall / (precision + recall)
        } else {
            0.0
        };

        report.insert(
            class.to_string(),
            ClassMetrics {
                precision,
                recall,
                f1,
                support: actual,
            },
        );
    }
    report
}

/// Encode an engineered dataset with a stored table (unseen values take the
/// sentinel, exactly as serving would) and extract the labels.
fn encode_with_table(set: &mut RecordSet, table: &EncoderTable) -> RiskResult<Vec<u8>> {
    use crate::feature_derive::RISK_FLAG;
    use crate::inference::CATEGORICAL_FIELDS;

    if !set.has_column(RISK_FLAG) {
        return Err(RiskError::data(
            RISK_FLAG,
            "dataset must contain a derivable status field",
        ));
    }

    for field in CATEGORICAL_FIELDS {
        for row in &mut set.rows {
            let text = row
                .get(field)
                .map(FieldValue::coerce_text)
                .unwrap_or_else(|| "nan".to_string());
            let code = table.resolve(field, &text);
            row.insert(field.to_string(), FieldValue::Num(code as f64));
        }
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

/// Score every row of an engineered dataset and build the report.
pub fn evaluate<C: RiskClassifier>(
    classifier: &C,
    table: &EncoderTable,
    mut set: RecordSet,
) -> RiskResult<EvaluationReport> {
    let labels = encode_with_table(&mut set, table)?;

    let matrix: Vec<crate::assembler::FeatureVector> = set
        .rows
        .iter()
        .map(crate::assembler::assemble)
        .collect::<RiskResult<_>>()?;

    let probabilities = classifier.predict_proba(&matrix)?;
    let predictions: Vec<u8> = probabilities
        .iter()
        .map(|&p| if p >= DECISION_THRESHOLD { 1 } else { 0 })
        .collect();

    let auc = roc_auc(&labels, &probabilities);
    let confusion = confusion_matrix(&labels, &predictions);
    let correct = confusion[0][0] + confusion[1][1];
    let accuracy = if labels.is_empty() {
        0.0
    } else {
        correct as f64 / labels.len() as f64
    };

    Ok(EvaluationReport {
        auc,
        accuracy,
        classification_report: classification_report(&confusion),
        confusion_matrix: confusion,
        rows: labels.len(),
    })
}

/// Serialize the report to disk as pretty JSON.
pub fn write_report(report: &EvaluationReport, path: &Path) -> RiskResult<()> {
    let json = serde_json::to_string_pretty(report)
        .map_err(|e| RiskError::serialization("encode_report", e))?;
    fs::write(path, json)?;
    info!(path = %path.display(), auc = report.auc, "evaluation report written");
    Ok(())
}
