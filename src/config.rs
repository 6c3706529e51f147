//! Runtime configuration for the scoring server.
//!
//! Defaults are merged with `credrisk.toml` and `CREDRISK_`-prefixed
//! environment variables; the environment wins.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Address the scoring API binds to.
    pub bind_addr: String,
    /// Trained model artifact.
    pub model_path: PathBuf,
    /// Encoder table database directory.
    pub encoder_db: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            model_path: PathBuf::from("models/credrisk.model"),
            encoder_db: PathBuf::from("models/encoders"),
        }
    }
}

pub fn load_config() -> Result<ServerConfig, figment::Error> {
    let figment = Figment::from(Serialized::defaults(ServerConfig::default()))
        .merge(Toml::file("credrisk.toml"))
        .merge(Env::prefixed("CREDRISK_"));

    figment.extract()
}
