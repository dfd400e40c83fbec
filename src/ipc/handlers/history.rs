use crate::history::{self, AcademicYearRecord, Enrollment, GradeRecord};
use crate::ipc::error::ok;
use crate::ipc::helpers::{optional_str, records_param, rounding_param, validate_scores};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_history_build(state: &mut AppState, req: &Request) -> serde_json::Value {
    let enrollments: Vec<Enrollment> = match records_param(req, "enrollments") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let grades: Vec<GradeRecord> = match records_param(req, "grades") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(e) = validate_scores(req, "grades", grades.iter().map(|g| &g.score)) {
        return e;
    }
    let active_year_id = match optional_str(req, "activeYearId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let rounding = match rounding_param(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let years: Vec<AcademicYearRecord> = history::build_history(
        &enrollments,
        &grades,
        active_year_id.as_deref(),
        &state.config,
    )
    .iter()
    .map(|r| r.rounded(rounding))
    .collect();
    ok(
        &req.id,
        json!({
            "rounding": rounding,
            "years": years,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "history.build" => Some(handle_history_build(state, req)),
        _ => None,
    }
}
