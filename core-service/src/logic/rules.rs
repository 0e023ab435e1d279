//! Safety Rules - fixed gas ceilings, independent of any model
//!
//! Each rule watches one flattened metric path. A reading at or above the
//! ceiling is a violation; a reading that is absent or not numeric is
//! skipped, never flagged.

use serde::{Deserialize, Serialize};

use crate::constants::{get_eco2_ppm_limit, get_tvoc_ppb_limit, DEFAULT_ECO2_PPM_LIMIT, DEFAULT_TVOC_PPB_LIMIT};
use crate::logic::features::{coerce_numeric, layout, FlatRecord};

// ============================================================================
// RULES
// ============================================================================

/// `metric >= threshold` ⇒ violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdRule {
    /// Display name used in the violation text
    pub label: String,
    /// Flattened path of the metric
    pub path: String,
    pub unit: String,
    pub threshold: f64,
}

impl ThresholdRule {
    pub fn new(label: &str, path: &str, unit: &str, threshold: f64) -> Self {
        Self {
            label: label.to_string(),
            path: path.to_string(),
            unit: unit.to_string(),
            threshold,
        }
    }

    /// Violation text, or `None` when the reading is fine or unusable
    pub fn check(&self, flat: &FlatRecord) -> Option<String> {
        let value = flat.get(&self.path).and_then(coerce_numeric)?;

        // NaN compares false and is skipped along with absent readings
        if value >= self.threshold {
            Some(format!(
                "{} high: {} {} (>= {})",
                self.label, value, self.unit, self.threshold
            ))
        } else {
            None
        }
    }
}

/// Ordered collection of threshold rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<ThresholdRule>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::with_limits(DEFAULT_ECO2_PPM_LIMIT, DEFAULT_TVOC_PPB_LIMIT)
    }
}

impl RuleSet {
    /// Standard gas rules with custom ceilings
    pub fn with_limits(eco2_ppm: f64, tvoc_ppb: f64) -> Self {
        Self {
            rules: vec![
                ThresholdRule::new("eCO2", layout::ECO2_PPM, "ppm", eco2_ppm),
                ThresholdRule::new("TVOC", layout::TVOC_PPB, "ppb", tvoc_ppb),
            ],
        }
    }

    /// Standard gas rules, ceilings taken from the environment
    pub fn from_env() -> Self {
        Self::with_limits(get_eco2_ppm_limit(), get_tvoc_ppb_limit())
    }

    /// Append a rule; evaluation order follows insertion order
    pub fn push(&mut self, rule: ThresholdRule) {
        self.rules.push(rule);
    }

    /// All violations for this record, in rule order
    pub fn evaluate(&self, flat: &FlatRecord) -> Vec<String> {
        self.rules.iter().filter_map(|rule| rule.check(flat)).collect()
    }
}
