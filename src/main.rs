//! Scoring server bootstrap: config, model artifact, encoder store, then the
//! HTTP listener.

use anyhow::Context;
use std::sync::Arc;
use tracing::info;

use credrisk::classifier::GbdtClassifier;
use credrisk::config::load_config;
use credrisk::encoder_store::SledEncoderStore;
use credrisk::inference::InferenceService;
use credrisk::server::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = load_config().context("loading configuration")?;
    info!(
        bind_addr = %config.bind_addr,
        model = %config.model_path.display(),
        "starting credrisk server"
    );

    let classifier = GbdtClassifier::load(&config.model_path)
        .with_context(|| format!("loading model from {}", config.model_path.display()))?;
    let store = SledEncoderStore::open(&config.encoder_db)
        .with_context(|| format!("opening encoder store at {}", config.encoder_db.display()))?;

    let state = Arc::new(AppState {
        service: InferenceService::new(classifier, store),
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("binding {}", config.bind_addr))?;
    info!("listening on {}", config.bind_addr);

    axum::serve(listener, build_router(state))
        .await
        .context("serving")?;

    Ok(())
}
