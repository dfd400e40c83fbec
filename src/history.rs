use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::calc::{self, AssessmentScore, RoundingPolicy};
use crate::classify::{self, Classification, ClassifyInput};
use crate::config::EngineConfig;

/// A student's enrollment in one academic year.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub academic_year_id: String,
    #[serde(default)]
    pub academic_year_label: Option<String>,
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    pub grade_level: i64,
    pub class_label: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeRecord {
    pub academic_year_id: String,
    #[serde(flatten)]
    pub score: AssessmentScore,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYearRecord {
    pub academic_year_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub academic_year_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    pub grade_level: i64,
    pub class_label: String,
    pub active: bool,
    pub subject_count: usize,
    pub grade_record_count: usize,
    pub evaluated_periods: usize,
    pub overall_average: Option<f64>,
    pub classification: Classification,
    pub progressed_to_grade_level: Option<i64>,
}

impl AcademicYearRecord {
    pub fn rounded(&self, policy: RoundingPolicy) -> Self {
        Self {
            overall_average: policy.apply_opt(self.overall_average),
            ..self.clone()
        }
    }
}

/// One-per-year enrollments in timeline order. The first enrollment seen for a year wins.
fn ordered_enrollments(enrollments: &[Enrollment]) -> Vec<&Enrollment> {
    let mut seen: BTreeSet<&str> = BTreeSet::new();
    let mut years: Vec<&Enrollment> = Vec::with_capacity(enrollments.len());
    for e in enrollments {
        if seen.insert(e.academic_year_id.as_str()) {
            years.push(e);
        } else {
            tracing::debug!(
                academic_year_id = %e.academic_year_id,
                "ignoring duplicate enrollment for academic year"
            );
        }
    }

    if years.iter().all(|e| e.start_date.is_some()) {
        years.sort_by(|a, b| {
            a.start_date
                .cmp(&b.start_date)
                .then_with(|| a.academic_year_id.cmp(&b.academic_year_id))
        });
    } else {
        years.sort_by(|a, b| a.academic_year_id.cmp(&b.academic_year_id));
    }
    years
}

/// Chronological academic record for one student. Every enrolled year appears, graded
/// or not; grades for years without an enrollment are dropped.
pub fn build_history(
    enrollments: &[Enrollment],
    grades: &[GradeRecord],
    active_year_id: Option<&str>,
    cfg: &EngineConfig,
) -> Vec<AcademicYearRecord> {
    let rules = cfg.classification_rules();
    let years = ordered_enrollments(enrollments);

    let mut by_year: HashMap<&str, Vec<AssessmentScore>> = HashMap::new();
    for g in grades {
        by_year
            .entry(g.academic_year_id.as_str())
            .or_default()
            .push(g.score.clone());
    }
    for (year_id, rows) in &by_year {
        if !years.iter().any(|e| e.academic_year_id == *year_id) {
            tracing::debug!(
                academic_year_id = %year_id,
                grade_records = rows.len(),
                "dropping grades for a year without enrollment"
            );
        }
    }

    let mut out: Vec<AcademicYearRecord> = years
        .iter()
        .map(|e| {
            let rows = by_year
                .get(e.academic_year_id.as_str())
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let figures = calc::compute_year_figures(rows);
            let active = active_year_id == Some(e.academic_year_id.as_str());
            let classification = classify::classify(
                &ClassifyInput {
                    average: figures.overall_average,
                    grade_level: e.grade_level,
                    year_active: active,
                    evaluated_periods: figures.evaluated_periods,
                },
                &rules,
            );
            AcademicYearRecord {
                academic_year_id: e.academic_year_id.clone(),
                academic_year_label: e.academic_year_label.clone(),
                start_date: e.start_date,
                grade_level: e.grade_level,
                class_label: e.class_label.clone(),
                active,
                subject_count: figures.subject_count,
                grade_record_count: rows.len(),
                evaluated_periods: figures.evaluated_periods,
                overall_average: figures.overall_average,
                classification,
                progressed_to_grade_level: None,
            }
        })
        .collect();

    let next_levels: Vec<Option<i64>> = out
        .iter()
        .skip(1)
        .map(|r| Some(r.grade_level))
        .chain(std::iter::once(None))
        .collect();
    for (record, next) in out.iter_mut().zip(next_levels) {
        if record.classification == Classification::Approved {
            record.progressed_to_grade_level = next;
        }
    }
    out
}
