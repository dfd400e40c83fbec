use anyhow::Context;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::path::Path;

use crate::calc::RoundingPolicy;
use crate::classify::ClassificationRules;

pub const DEFAULT_EXAM_GRADE_LEVELS: [i64; 3] = [9, 10, 12];
pub const DEFAULT_MIN_EVALUATED_PERIODS: usize = 3;

const GRADE_LEVEL_RANGE: (i64, i64) = (1, 13);
const MIN_EVALUATED_PERIODS_RANGE: (i64, i64) = (1, 12);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct EngineConfig {
    pub exam_grade_levels: BTreeSet<i64>,
    pub min_evaluated_periods: usize,
    pub rounding: RoundingPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exam_grade_levels: DEFAULT_EXAM_GRADE_LEVELS.into_iter().collect(),
            min_evaluated_periods: DEFAULT_MIN_EVALUATED_PERIODS,
            rounding: RoundingPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn classification_rules(&self) -> ClassificationRules {
        ClassificationRules {
            exam_grade_levels: self.exam_grade_levels.clone(),
            min_evaluated_periods: self.min_evaluated_periods,
        }
    }

    /// Field-by-field validation of a config document.
    pub fn validate(&self) -> Result<(), String> {
        for level in &self.exam_grade_levels {
            check_range(*level, "examGradeLevels[]", GRADE_LEVEL_RANGE)?;
        }
        check_range(
            self.min_evaluated_periods as i64,
            "minEvaluatedPeriods",
            MIN_EVALUATED_PERIODS_RANGE,
        )?;
        Ok(())
    }

    /// Applies a partial update. On error `self` is left untouched.
    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "examGradeLevels" => {
                    let items = v
                        .as_array()
                        .ok_or_else(|| format!("{} must be an array of integers", k))?;
                    let mut levels = BTreeSet::new();
                    for item in items {
                        levels.insert(parse_i64_range(
                            item,
                            "examGradeLevels[]",
                            GRADE_LEVEL_RANGE,
                        )?);
                    }
                    next.exam_grade_levels = levels;
                }
                "minEvaluatedPeriods" => {
                    next.min_evaluated_periods =
                        parse_i64_range(v, k, MIN_EVALUATED_PERIODS_RANGE)? as usize;
                }
                "rounding" => {
                    let s = v.as_str().ok_or_else(|| format!("{} must be string", k))?;
                    next.rounding = RoundingPolicy::parse(s).ok_or_else(|| {
                        "rounding must be one of: raw, oneDecimal, truncateOneDecimal, ceiling"
                            .to_string()
                    })?;
                }
                _ => return Err(format!("unknown config field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }
}

fn check_range(n: i64, key: &str, (min, max): (i64, i64)) -> Result<i64, String> {
    if !(min..=max).contains(&n) {
        return Err(format!("{} must be in {}..={}", key, min, max));
    }
    Ok(n)
}

fn parse_i64_range(v: &Value, key: &str, range: (i64, i64)) -> Result<i64, String> {
    let n = v
        .as_i64()
        .ok_or_else(|| format!("{} must be integer", key))?;
    check_range(n, key, range)
}

/// Reads a JSON config document; absent fields fall back to defaults.
pub fn load_config_file(path: &Path) -> anyhow::Result<EngineConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("read config file {}", path.display()))?;
    let cfg: EngineConfig = serde_json::from_str(&text)
        .with_context(|| format!("parse config file {}", path.display()))?;
    cfg.validate()
        .map_err(anyhow::Error::msg)
        .with_context(|| format!("validate config file {}", path.display()))?;
    Ok(cfg)
}
