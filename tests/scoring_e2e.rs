//! End-to-end tests for the scoring path: a model trained through the real
//! offline pipeline, served through the real router, with encoder state on a
//! temporary store.

use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use serde_json::json;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use credrisk::classifier::{GbdtClassifier, GbdtParams};
use credrisk::encoder_store::SledEncoderStore;
use credrisk::inference::InferenceService;
use credrisk::risk_tier::RiskTier;
use credrisk::server::{build_router, AppState};
use credrisk::training;

/// Write a raw dataset with two clearly separated applicant profiles.
fn write_raw_dataset(path: &Path) {
    let mut csv = String::from(
        "loan_amnt,term,int_rate,installment,annual_inc,dti,home_ownership,purpose,verification_status,loan_status\n",
    );
    for i in 0..25 {
        csv.push_str(&format!(
            "24000,60 months,24.5%,{},30000,32.0,RENT,debt_consolidation,Not Verified,Charged Off\n",
            860 + i
        ));
        csv.push_str(&format!(
            "6000,36 months,6.5%,{},90000,9.0,MORTGAGE,credit_card,Verified,Fully Paid\n",
            160 + i
        ));
    }
    // One applicant profile the serving tests will reuse.
    csv.push_str(
        "12000,36 months,13.5%,405,60000,18.0,RENT,debt_consolidation,Verified,Fully Paid\n",
    );
    fs::write(path, csv).expect("write raw dataset");
}

/// Run prep + engineer + train into a temp dir and return the served state.
fn trained_state(dir: &TempDir) -> Arc<AppState> {
    let raw = dir.path().join("raw.csv");
    let clean = dir.path().join("clean.csv");
    let engineered = dir.path().join("features.csv");
    let model = dir.path().join("risk.model");
    let encoders = dir.path().join("encoders");

    write_raw_dataset(&raw);
    training::prepare(&raw, &clean).expect("prep");
    training::engineer(&clean, &engineered).expect("engineer");

    let params = GbdtParams {
        max_depth: 3,
        iterations: 30,
        shrinkage: 0.1,
        data_sample_ratio: 1.0,
        feature_sample_ratio: 1.0,
    };
    training::train(&engineered, &model, &encoders, params, 42).expect("train");

    let classifier = GbdtClassifier::load(&model).expect("load model");
    let store = SledEncoderStore::open(&encoders).expect("open encoder store");
    Arc::new(AppState {
        service: InferenceService::new(classifier, store),
    })
}

fn score_request_body() -> serde_json::Value {
    json!({
        "annual_inc": 60000.0,
        "loan_amnt": 12000.0,
        "term_num": 36.0,
        "int_rate_num": 13.5,
        "dti": 18.0,
        "home_ownership": "RENT",
        "purpose": "debt_consolidation",
        "verification_status": "Verified"
    })
}

#[tokio::test]
async fn score_endpoint_returns_tier_and_probability() {
    let dir = TempDir::new().expect("temp dir");
    let app = build_router(trained_state(&dir));

    let request = Request::builder()
        .method("POST")
        .uri("/api/risk/score")
        .header("content-type", "application/json")
        .body(Body::from(score_request_body().to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();

    let risk = parsed["risk"].as_str().expect("risk label");
    assert!(["no-risk", "less-risk", "high-risk"].contains(&risk));

    let probability: f64 = parsed["probability"]
        .as_str()
        .expect("probability string")
        .parse()
        .expect("probability parses");
    assert!((0.0..=1.0).contains(&probability));

    // The label must be the one the threshold policy dictates for the
    // reported probability.
    let expected = RiskTier::from_probability(probability).unwrap();
    assert_eq!(risk, expected.label());
}

#[tokio::test]
async fn probability_is_formatted_to_two_decimals() {
    let dir = TempDir::new().expect("temp dir");
    let app = build_router(trained_state(&dir));

    let request = Request::builder()
        .method("POST")
        .uri("/v1/risk/score")
        .header("content-type", "application/json")
        .body(Body::from(score_request_body().to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
    let probability = parsed["probability"].as_str().unwrap();

    let decimals = probability.split('.').nth(1).unwrap_or("");
    assert_eq!(decimals.len(), 2, "got {probability}");
}

#[tokio::test]
async fn unseen_category_is_scored_not_rejected() {
    let dir = TempDir::new().expect("temp dir");
    let app = build_router(trained_state(&dir));

    let mut body = score_request_body();
    body["purpose"] = json!("hot_air_balloon");

    let request = Request::builder()
        .method("POST")
        .uri("/api/risk/score")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn malformed_request_is_a_client_error() {
    let dir = TempDir::new().expect("temp dir");
    let app = build_router(trained_state(&dir));

    let request = Request::builder()
        .method("POST")
        .uri("/api/risk/score")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"annual_inc": "not a number"}"#))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn health_endpoints_respond() {
    let dir = TempDir::new().expect("temp dir");
    let app = build_router(trained_state(&dir));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/readyz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
