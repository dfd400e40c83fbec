use serde::de::DeserializeOwned;
use serde_json::json;

use crate::calc::{AssessmentScore, RoundingPolicy};
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};

pub fn required_str(req: &Request, key: &str) -> Result<String, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|v| v.to_string())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {}", key), None))
}

pub fn optional_str(req: &Request, key: &str) -> Result<Option<String>, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be string", key), None)),
    }
}

pub fn required_i64(req: &Request, key: &str) -> Result<i64, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing integer {}", key), None))
}

pub fn optional_bool(req: &Request, key: &str) -> Result<bool, serde_json::Value> {
    match req.params.get(key) {
        None => Ok(false),
        Some(v) if v.is_null() => Ok(false),
        Some(v) => v
            .as_bool()
            .ok_or_else(|| err(&req.id, "bad_params", format!("{} must be boolean", key), None)),
    }
}

/// Explicit `rounding` param, else the configured default.
pub fn rounding_param(
    state: &AppState,
    req: &Request,
) -> Result<RoundingPolicy, serde_json::Value> {
    let Some(name) = optional_str(req, "rounding")? else {
        return Ok(state.config.rounding);
    };
    RoundingPolicy::parse(&name).ok_or_else(|| {
        err(
            &req.id,
            "bad_params",
            "rounding must be one of: raw, oneDecimal, truncateOneDecimal, ceiling",
            Some(json!({ "rounding": name })),
        )
    })
}

/// Deserializes `params[key]` as an array of records.
pub fn records_param<T: DeserializeOwned>(
    req: &Request,
    key: &str,
) -> Result<Vec<T>, serde_json::Value> {
    let Some(raw) = req.params.get(key) else {
        return Err(err(&req.id, "bad_params", format!("missing {}", key), None));
    };
    if !raw.is_array() {
        return Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an array", key),
            None,
        ));
    }
    serde_json::from_value(raw.clone()).map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("invalid {}: {}", key, e),
            None,
        )
    })
}

/// Marks must be finite and within [0, 20]; out-of-range input is rejected, not clamped.
pub fn validate_scores<'a, I>(req: &Request, key: &str, scores: I) -> Result<(), serde_json::Value>
where
    I: IntoIterator<Item = &'a AssessmentScore>,
{
    for (index, s) in scores.into_iter().enumerate() {
        if let Some((field, value)) = s.first_invalid_field() {
            return Err(err(
                &req.id,
                "bad_params",
                format!("{}[{}].{} must be within 0..=20", key, index, field),
                Some(json!({
                    "index": index,
                    "field": field,
                    "value": value,
                })),
            ));
        }
    }
    Ok(())
}
