//! Integration tests for the offline pipeline: report shape and the
//! train/serve encoding contract.

use std::fs;
use std::path::Path;
use tempfile::TempDir;

use credrisk::assembler::CANONICAL_ORDER;
use credrisk::classifier::{GbdtClassifier, GbdtParams};
use credrisk::dataset::load_csv;
use credrisk::encoder_store::SledEncoderStore;
use credrisk::evaluation::{evaluate, write_report};
use credrisk::inference::{derive_serving_record, ScoreRequest};
use credrisk::record::FieldValue;
use credrisk::training;

fn write_raw_dataset(path: &Path) {
    let mut csv = String::from(
        "loan_amnt,term,int_rate,installment,annual_inc,dti,home_ownership,purpose,verification_status,loan_status\n",
    );
    for i in 0..25 {
        csv.push_str(&format!(
            "24000,60 months,24.5%,{},30000,32.0,RENT,small_business,Not Verified,Default\n",
            860 + i
        ));
        csv.push_str(&format!(
            "6000,36 months,6.5%,{},90000,9.0,MORTGAGE,credit_card,Verified,Fully Paid\n",
            160 + i
        ));
    }
    fs::write(path, csv).expect("write raw dataset");
}

struct Artifacts {
    dir: TempDir,
}

impl Artifacts {
    fn engineered(&self) -> std::path::PathBuf {
        self.dir.path().join("features.csv")
    }
    fn model(&self) -> std::path::PathBuf {
        self.dir.path().join("risk.model")
    }
    fn encoders(&self) -> std::path::PathBuf {
        self.dir.path().join("encoders")
    }
}

fn run_pipeline() -> Artifacts {
    let artifacts = Artifacts {
        dir: TempDir::new().expect("temp dir"),
    };
    let raw = artifacts.dir.path().join("raw.csv");
    let clean = artifacts.dir.path().join("clean.csv");

    write_raw_dataset(&raw);
    training::prepare(&raw, &clean).expect("prep");
    training::engineer(&clean, &artifacts.engineered()).expect("engineer");

    let params = GbdtParams {
        max_depth: 3,
        iterations: 30,
        shrinkage: 0.1,
        data_sample_ratio: 1.0,
        feature_sample_ratio: 1.0,
    };
    training::train(
        &artifacts.engineered(),
        &artifacts.model(),
        &artifacts.encoders(),
        params,
        42,
    )
    .expect("train");
    artifacts
}

#[test]
fn evaluation_report_has_the_fixed_keys() {
    let artifacts = run_pipeline();

    let classifier = GbdtClassifier::load(&artifacts.model()).expect("load model");
    let store = SledEncoderStore::open(&artifacts.encoders()).expect("open store");
    let table = store.load().expect("load table");
    let set = load_csv(&artifacts.engineered()).expect("load engineered");

    let report = evaluate(&classifier, &table, set).expect("evaluate");
    assert!(report.auc > 0.9, "auc was {}", report.auc);
    assert_eq!(report.rows, 50);

    let report_path = artifacts.dir.path().join("report.json");
    write_report(&report, &report_path).expect("write report");

    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&report_path).unwrap()).unwrap();
    assert!(parsed["auc"].is_number());
    assert!(parsed["classification_report"]["0"]["precision"].is_number());
    assert!(parsed["classification_report"]["1"]["recall"].is_number());
    assert_eq!(parsed["confusion_matrix"].as_array().unwrap().len(), 2);
}

#[test]
fn manifest_records_the_canonical_feature_order() {
    let artifacts = run_pipeline();

    let manifest_path = artifacts.model().with_extension("manifest.json");
    let parsed: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&manifest_path).unwrap()).unwrap();

    let order: Vec<&str> = parsed["feature_order"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap())
        .collect();
    assert_eq!(order, CANONICAL_ORDER.to_vec());
    assert!(parsed["sha256"].as_str().unwrap().len() == 64);
}

#[test]
fn serving_encoding_matches_training_codes() {
    let artifacts = run_pipeline();

    let store = SledEncoderStore::open(&artifacts.encoders()).expect("open store");
    let table = store.load().expect("load table");

    // Codes follow first-seen order of the training dataset.
    assert_eq!(table.resolve("home_ownership", "RENT"), 0);
    assert_eq!(table.resolve("home_ownership", "MORTGAGE"), 1);
    assert_eq!(table.resolve("verification_status", "Not Verified"), 0);
    assert_eq!(table.resolve("verification_status", "Verified"), 1);

    // A serving record for a training-time category encodes to those codes.
    let request = ScoreRequest {
        annual_inc: 90000.0,
        loan_amnt: 6000.0,
        term_num: 36.0,
        int_rate_num: 6.5,
        dti: 9.0,
        home_ownership: "MORTGAGE".into(),
        purpose: "credit_card".into(),
        verification_status: "Verified".into(),
    };
    let record = derive_serving_record(&request);
    let text = record
        .get("home_ownership")
        .and_then(FieldValue::as_text)
        .unwrap();
    assert_eq!(table.resolve("home_ownership", text), 1);
}
