use std::path::PathBuf;

use serde::Deserialize;

use crate::config::EngineConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Debug, Default)]
pub struct AppState {
    pub config: EngineConfig,
    /// File the current config was loaded from, if any.
    pub config_path: Option<PathBuf>,
}
