use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::classify::{self, Classification, ClassificationRules};
use crate::config::EngineConfig;

/// Share of the formative sub-average (MAS) in a period average.
pub const FORMATIVE_WEIGHT: f64 = 0.4;
/// Share of the summative assessment (AT) in a period average.
pub const SUMMATIVE_WEIGHT: f64 = 0.6;

pub const MIN_SCORE: f64 = 0.0;
pub const MAX_SCORE: f64 = 20.0;

/// One (student, subject, period) row of raw marks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentScore {
    pub subject_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub period_id: String,
    #[serde(default)]
    pub as1: Option<f64>,
    #[serde(default)]
    pub as2: Option<f64>,
    #[serde(default)]
    pub as3: Option<f64>,
    #[serde(default)]
    pub at: Option<f64>,
    #[serde(default)]
    pub locked: bool,
}

impl AssessmentScore {
    /// First mark outside `[0, 20]` (or not finite), with its field name.
    pub fn first_invalid_field(&self) -> Option<(&'static str, f64)> {
        [
            ("as1", self.as1),
            ("as2", self.as2),
            ("as3", self.as3),
            ("at", self.at),
        ]
        .into_iter()
        .find_map(|(field, v)| match v {
            Some(x) if !x.is_finite() || !(MIN_SCORE..=MAX_SCORE).contains(&x) => Some((field, x)),
            _ => None,
        })
    }

    pub fn period_average(&self) -> PeriodAverage {
        let sub = sub_period_average(self.as1, self.as2, self.as3);
        PeriodAverage {
            subject_id: self.subject_id.clone(),
            subject_name: self.subject_name.clone(),
            period_id: self.period_id.clone(),
            sub_period_average: sub,
            period_average: period_average(sub, self.at),
            locked: self.locked,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodAverage {
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub period_id: String,
    pub sub_period_average: Option<f64>,
    pub period_average: Option<f64>,
    pub locked: bool,
}

impl PeriodAverage {
    pub fn rounded(&self, policy: RoundingPolicy) -> Self {
        Self {
            sub_period_average: policy.apply_opt(self.sub_period_average),
            period_average: policy.apply_opt(self.period_average),
            ..self.clone()
        }
    }
}

/// Mean of the values that are present. `None` when nothing is present; a missing
/// mark is never read as zero.
pub fn mean_present<I>(values: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    let mut sum = 0.0_f64;
    let mut count: usize = 0;
    for v in values.into_iter().flatten() {
        sum += v;
        count += 1;
    }
    if count > 0 {
        Some(sum / (count as f64))
    } else {
        None
    }
}

/// MAS: mean of the present formative marks.
pub fn sub_period_average(as1: Option<f64>, as2: Option<f64>, as3: Option<f64>) -> Option<f64> {
    mean_present([as1, as2, as3])
}

/// MT: `MAS * 0.4 + AT * 0.6`. Both components are required.
pub fn period_average(sub_period_average: Option<f64>, summative: Option<f64>) -> Option<f64> {
    match (sub_period_average, summative) {
        (Some(mas), Some(at)) => Some(mas * FORMATIVE_WEIGHT + at * SUMMATIVE_WEIGHT),
        _ => None,
    }
}

/// Annual average of one subject over its present period averages.
pub fn subject_annual_average<I>(period_averages: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    mean_present(period_averages)
}

/// Equal-weighted mean across subjects, however many periods fed each one.
pub fn overall_annual_average<I>(subject_averages: I) -> Option<f64>
where
    I: IntoIterator<Item = Option<f64>>,
{
    mean_present(subject_averages)
}

/// Period averages for a batch of rows, ordered by subject then period. A later row
/// for the same (subject, period) replaces an earlier one.
pub fn period_averages(scores: &[AssessmentScore]) -> Vec<PeriodAverage> {
    let mut by_key: BTreeMap<(&str, &str), PeriodAverage> = BTreeMap::new();
    for s in scores {
        by_key.insert(
            (s.subject_id.as_str(), s.period_id.as_str()),
            s.period_average(),
        );
    }
    by_key.into_values().collect()
}

/// Output-boundary rounding. Computations always run on raw values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RoundingPolicy {
    Raw,
    #[default]
    OneDecimal,
    TruncateOneDecimal,
    Ceiling,
}

impl RoundingPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "raw" => Some(Self::Raw),
            "oneDecimal" => Some(Self::OneDecimal),
            "truncateOneDecimal" => Some(Self::TruncateOneDecimal),
            "ceiling" => Some(Self::Ceiling),
            _ => None,
        }
    }

    pub fn apply(self, x: f64) -> f64 {
        match self {
            Self::Raw => x,
            Self::OneDecimal => round_off_1_decimal(x),
            Self::TruncateOneDecimal => snap(10.0 * x).trunc() / 10.0,
            Self::Ceiling => snap(x).ceil(),
        }
    }

    pub fn apply_opt(self, x: Option<f64>) -> Option<f64> {
        x.map(|v| self.apply(v))
    }
}

/// Half-up 1-decimal rounding: `floor(10*x + 0.5) / 10`.
pub fn round_off_1_decimal(x: f64) -> f64 {
    (snap(10.0 * x) + 0.5).floor() / 10.0
}

/// Drops binary representation error below 1e-9, so a weighted mean such as
/// `6*0.4 + 1*0.6` (3.0000000000000004) lands on 3 before any cut at a whole
/// or tenth boundary.
pub fn snap(x: f64) -> f64 {
    (x * 1e9).round() / 1e9
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectSummary {
    pub subject_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_name: Option<String>,
    pub periods: Vec<PeriodAverage>,
    pub annual_average: Option<f64>,
    pub evaluated_periods: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period_id: String,
    pub average: Option<f64>,
    pub subject_count: usize,
    pub classification: Classification,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnualSummary {
    pub grade_level: i64,
    pub exam_bearing: bool,
    pub year_active: bool,
    pub subjects: Vec<SubjectSummary>,
    pub periods: Vec<PeriodSummary>,
    pub overall_average: Option<f64>,
    pub evaluated_periods: usize,
    pub classification: Classification,
}

impl AnnualSummary {
    pub fn rounded(&self, policy: RoundingPolicy) -> Self {
        Self {
            subjects: self
                .subjects
                .iter()
                .map(|s| SubjectSummary {
                    periods: s.periods.iter().map(|p| p.rounded(policy)).collect(),
                    annual_average: policy.apply_opt(s.annual_average),
                    ..s.clone()
                })
                .collect(),
            periods: self
                .periods
                .iter()
                .map(|p| PeriodSummary {
                    average: policy.apply_opt(p.average),
                    ..p.clone()
                })
                .collect(),
            overall_average: policy.apply_opt(self.overall_average),
            ..self.clone()
        }
    }
}

/// Figures shared by the annual summary and the history timeline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct YearFigures {
    pub overall_average: Option<f64>,
    pub evaluated_periods: usize,
    /// Subjects with an annual average, i.e. the ones the overall average is taken over.
    pub subject_count: usize,
}

fn subject_summaries(averages: Vec<PeriodAverage>) -> Vec<SubjectSummary> {
    let mut out: Vec<SubjectSummary> = Vec::new();
    // `averages` arrives ordered by subject, so each subject is one contiguous run.
    for p in averages {
        if let Some(last) = out.last_mut().filter(|l| l.subject_id == p.subject_id) {
            if last.subject_name.is_none() {
                last.subject_name = p.subject_name.clone();
            }
            last.periods.push(p);
            continue;
        }
        out.push(SubjectSummary {
            subject_id: p.subject_id.clone(),
            subject_name: p.subject_name.clone(),
            periods: vec![p],
            annual_average: None,
            evaluated_periods: 0,
        });
    }
    for s in &mut out {
        s.annual_average = subject_annual_average(s.periods.iter().map(|p| p.period_average));
        s.evaluated_periods = s
            .periods
            .iter()
            .filter(|p| p.period_average.is_some())
            .count();
    }
    out
}

fn year_figures(subjects: &[SubjectSummary]) -> YearFigures {
    let evaluated: BTreeSet<&str> = subjects
        .iter()
        .flat_map(|s| s.periods.iter())
        .filter(|p| p.period_average.is_some())
        .map(|p| p.period_id.as_str())
        .collect();
    YearFigures {
        overall_average: overall_annual_average(subjects.iter().map(|s| s.annual_average)),
        evaluated_periods: evaluated.len(),
        subject_count: subjects.iter().filter(|s| s.annual_average.is_some()).count(),
    }
}

/// Overall average and count of evaluated periods for one student-year.
pub fn compute_year_figures(scores: &[AssessmentScore]) -> YearFigures {
    year_figures(&subject_summaries(period_averages(scores)))
}

fn period_summaries(
    subjects: &[SubjectSummary],
    grade_level: i64,
    rules: &ClassificationRules,
) -> Vec<PeriodSummary> {
    let mut by_period: BTreeMap<&str, Vec<Option<f64>>> = BTreeMap::new();
    for p in subjects.iter().flat_map(|s| s.periods.iter()) {
        by_period
            .entry(p.period_id.as_str())
            .or_default()
            .push(p.period_average);
    }
    by_period
        .into_iter()
        .map(|(period_id, values)| {
            let average = mean_present(values.iter().copied());
            PeriodSummary {
                period_id: period_id.to_string(),
                average,
                subject_count: values.iter().filter(|v| v.is_some()).count(),
                classification: classify::classify_period(average, grade_level, rules),
            }
        })
        .collect()
}

/// Full evaluation of one student-year: per-subject rows, per-period averages,
/// overall annual average and its classification.
pub fn compute_annual_summary(
    scores: &[AssessmentScore],
    grade_level: i64,
    year_active: bool,
    cfg: &EngineConfig,
) -> AnnualSummary {
    let rules = cfg.classification_rules();
    let subjects = subject_summaries(period_averages(scores));
    let figures = year_figures(&subjects);
    let periods = period_summaries(&subjects, grade_level, &rules);
    let classification = classify::classify(
        &classify::ClassifyInput {
            average: figures.overall_average,
            grade_level,
            year_active,
            evaluated_periods: figures.evaluated_periods,
        },
        &rules,
    );

    AnnualSummary {
        grade_level,
        exam_bearing: rules.is_exam_bearing(grade_level),
        year_active,
        subjects,
        periods,
        overall_average: figures.overall_average,
        evaluated_periods: figures.evaluated_periods,
        classification,
    }
}
