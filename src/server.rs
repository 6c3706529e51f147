//! HTTP surface for the scoring service.
//!
//! The request/response plumbing stays thin: handlers parse JSON, delegate to
//! the inference service, and format the verdict. Scoring errors map to
//! status codes through `RiskError`'s `IntoResponse`.

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;
use uuid::Uuid;

use crate::classifier::GbdtClassifier;
use crate::errors::RiskError;
use crate::inference::{InferenceService, ScoreRequest};

/// Shared state handed to every handler.
pub struct AppState {
    pub service: InferenceService<GbdtClassifier>,
}

#[derive(Debug, Serialize)]
pub struct ScoreResponse {
    /// One of the three fixed tier labels.
    pub risk: String,
    /// Probability of default, formatted to two decimal places.
    pub probability: String,
}

/// Build the scoring router with versioned alias and health endpoints.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/risk/score", post(score))
        // versioned alias
        .route("/v1/risk/score", post(score))
        // health endpoints
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[axum::debug_handler]
async fn score(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<ScoreResponse>, RiskError> {
    let request_id = Uuid::new_v4();
    let scored = state.service.score(&request)?;
    info!(
        %request_id,
        tier = %scored.tier,
        probability = scored.probability,
        "scored request"
    );

    Ok(Json(ScoreResponse {
        risk: scored.tier.label().to_string(),
        probability: format!("{:.2}", scored.probability),
    }))
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn readyz(State(_state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    // State construction already required a loaded model and open store.
    Json(serde_json::json!({ "ready": true }))
}
