use crate::config::{self, EngineConfig};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use serde_json::json;
use std::path::PathBuf;

fn config_result(state: &AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!(state.config))
}

fn handle_config_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    config_result(state, req)
}

fn handle_config_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(patch) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };
    if let Err(message) = state.config.apply_patch(patch) {
        return err(&req.id, "bad_params", message, None);
    }
    tracing::info!(config = ?state.config, "config updated");
    config_result(state, req)
}

fn handle_config_load(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };
    match config::load_config_file(&path) {
        Ok(cfg) => {
            tracing::info!(path = %path.display(), "config loaded");
            state.config = cfg;
            state.config_path = Some(path);
            config_result(state, req)
        }
        Err(e) => err(
            &req.id,
            "config_load_failed",
            format!("{e:#}"),
            Some(json!({ "path": path.to_string_lossy() })),
        ),
    }
}

fn handle_config_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.config = EngineConfig::default();
    state.config_path = None;
    config_result(state, req)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "config.get" => Some(handle_config_get(state, req)),
        "config.update" => Some(handle_config_update(state, req)),
        "config.load" => Some(handle_config_load(state, req)),
        "config.reset" => Some(handle_config_reset(state, req)),
        _ => None,
    }
}
