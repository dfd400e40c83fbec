use serde::Serialize;
use std::collections::BTreeSet;

use crate::calc;

/// Lowest average that passes outright.
pub const APPROVED_MIN: f64 = 10.0;
/// Lowest average of the exam / progression band.
pub const RECOVERY_MIN: f64 = 7.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Classification {
    Approved,
    ExamTrack,
    Failed,
    Progresses,
    Retained,
    Pending,
    InProgress,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusColor {
    Green,
    Amber,
    Red,
    Blue,
}

impl Classification {
    pub const ALL: [Classification; 7] = [
        Classification::Approved,
        Classification::ExamTrack,
        Classification::Progresses,
        Classification::Pending,
        Classification::Failed,
        Classification::Retained,
        Classification::InProgress,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Classification::Approved => "Aprovado",
            Classification::ExamTrack => "Exame",
            Classification::Failed => "Reprovado",
            Classification::Progresses => "Transita",
            Classification::Retained => "Retido",
            Classification::Pending => "Pendente",
            Classification::InProgress => "Em curso",
        }
    }

    pub fn color(self) -> StatusColor {
        match self {
            Classification::Approved => StatusColor::Green,
            Classification::ExamTrack | Classification::Pending | Classification::Progresses => {
                StatusColor::Amber
            }
            Classification::Failed | Classification::Retained => StatusColor::Red,
            Classification::InProgress => StatusColor::Blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LegendEntry {
    pub classification: Classification,
    pub label: &'static str,
    pub color: StatusColor,
}

pub fn legend() -> Vec<LegendEntry> {
    Classification::ALL
        .iter()
        .map(|c| LegendEntry {
            classification: *c,
            label: c.label(),
            color: c.color(),
        })
        .collect()
}

/// The school/region specific part of the rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationRules {
    pub exam_grade_levels: BTreeSet<i64>,
    pub min_evaluated_periods: usize,
}

impl ClassificationRules {
    pub fn is_exam_bearing(&self, grade_level: i64) -> bool {
        self.exam_grade_levels.contains(&grade_level)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyInput {
    pub average: Option<f64>,
    pub grade_level: i64,
    pub year_active: bool,
    pub evaluated_periods: usize,
}

fn band(average: f64, exam_bearing: bool) -> Classification {
    let average = calc::snap(average);
    if average >= APPROVED_MIN {
        Classification::Approved
    } else if average >= RECOVERY_MIN {
        if exam_bearing {
            Classification::ExamTrack
        } else {
            Classification::Progresses
        }
    } else if exam_bearing {
        Classification::Failed
    } else {
        Classification::Retained
    }
}

/// Year-level status. First match wins: active year, too few evaluated periods,
/// no average, then the average bands.
pub fn classify(input: &ClassifyInput, rules: &ClassificationRules) -> Classification {
    if input.year_active {
        return Classification::InProgress;
    }
    if input.evaluated_periods < rules.min_evaluated_periods {
        return Classification::Pending;
    }
    match input.average {
        None => Classification::Pending,
        Some(avg) => band(avg, rules.is_exam_bearing(input.grade_level)),
    }
}

/// Status of a single period average; not gated by year activity or period count.
pub fn classify_period(
    average: Option<f64>,
    grade_level: i64,
    rules: &ClassificationRules,
) -> Classification {
    match average {
        None => Classification::Pending,
        Some(avg) => band(avg, rules.is_exam_bearing(grade_level)),
    }
}
