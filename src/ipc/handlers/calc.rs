use crate::calc::{self, AssessmentScore};
use crate::classify::{self, ClassifyInput};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    optional_bool, records_param, required_i64, rounding_param, validate_scores,
};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn scores_param(req: &Request) -> Result<Vec<AssessmentScore>, serde_json::Value> {
    let scores: Vec<AssessmentScore> = records_param(req, "scores")?;
    validate_scores(req, "scores", &scores)?;
    Ok(scores)
}

fn handle_period_averages(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scores = match scores_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rounding = match rounding_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let period_averages: Vec<calc::PeriodAverage> = calc::period_averages(&scores)
        .iter()
        .map(|p| p.rounded(rounding))
        .collect();
    ok(
        &req.id,
        json!({
            "rounding": rounding,
            "periodAverages": period_averages,
        }),
    )
}

fn handle_annual_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scores = match scores_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grade_level = match required_i64(req, "gradeLevel") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year_active = match optional_bool(req, "yearActive") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rounding = match rounding_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let summary = calc::compute_annual_summary(&scores, grade_level, year_active, &state.config);
    let mut payload = json!(summary.rounded(rounding));
    if let Some(obj) = payload.as_object_mut() {
        obj.insert("rounding".to_string(), json!(rounding));
    }
    ok(&req.id, payload)
}

fn handle_classify(state: &mut AppState, req: &Request) -> serde_json::Value {
    let average = match req.params.get("average") {
        None => None,
        Some(v) if v.is_null() => None,
        Some(v) => match v.as_f64() {
            Some(n) => Some(n),
            None => return err(&req.id, "bad_params", "average must be number or null", None),
        },
    };
    let grade_level = match required_i64(req, "gradeLevel") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let year_active = match optional_bool(req, "yearActive") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let evaluated_periods = match req.params.get("evaluatedPeriods").and_then(|v| v.as_u64()) {
        Some(n) => n as usize,
        None => {
            return err(
                &req.id,
                "bad_params",
                "missing non-negative integer evaluatedPeriods",
                None,
            )
        }
    };

    let rules = state.config.classification_rules();
    let classification = classify::classify(
        &ClassifyInput {
            average,
            grade_level,
            year_active,
            evaluated_periods,
        },
        &rules,
    );
    ok(
        &req.id,
        json!({
            "classification": classification,
            "label": classification.label(),
            "color": classification.color(),
            "examBearing": rules.is_exam_bearing(grade_level),
        }),
    )
}

fn handle_legend(_state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, json!({ "entries": classify::legend() }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "calc.periodAverages" => Some(handle_period_averages(state, req)),
        "calc.annualSummary" => Some(handle_annual_summary(state, req)),
        "calc.classify" => Some(handle_classify(state, req)),
        "classifications.legend" => Some(handle_legend(state, req)),
        _ => None,
    }
}
