//! Scorer - feature vector × model artifact → verdict
//!
//! Pure: borrows the artifact read-only and never fails. Every problem
//! (no model, no columns, unknown tag, classifier error) degrades to a
//! neutral "no score" result with the cause recorded in `details`.

use serde::{Deserialize, Serialize};

use crate::logic::features::{extract, FeatureVector, FlatRecord};
use super::artifact::{IsolationModel, ModelArtifact, RobustZModel};
use super::threshold::{anomaly_probability, robust_z, ANOMALY_PROB_CUTOFF, MAD_FLOOR};

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Why no score was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoScoreReason {
    NoModel,
    NoFeatureCols,
    UnknownModelType,
}

/// Diagnostic detail attached to every score
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreDetails {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub algo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<NoScoreReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// RobustZ: largest per-feature z
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zmax: Option<f64>,
    /// RobustZ: cut-off used
    #[serde(skip_serializing_if = "Option::is_none")]
    pub k: Option<f64>,
    /// RobustZ: column that produced `zmax`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature: Option<String>,
}

/// Scoring output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: Option<f64>,
    pub anomaly_prob: Option<f64>,
    pub is_anomaly: bool,
    pub details: ScoreDetails,
}

impl ScoreResult {
    /// Neutral result for a first-class "cannot score" state
    pub fn no_score(reason: NoScoreReason) -> Self {
        Self {
            score: None,
            anomaly_prob: None,
            is_anomaly: false,
            details: ScoreDetails {
                reason: Some(reason),
                ..Default::default()
            },
        }
    }

    /// Neutral result for a caught evaluation failure
    pub fn failed(algo: &str, error: impl ToString) -> Self {
        Self {
            score: None,
            anomaly_prob: None,
            is_anomaly: false,
            details: ScoreDetails {
                algo: Some(algo.to_string()),
                error: Some(error.to_string()),
                ..Default::default()
            },
        }
    }

    /// Algorithm that produced this result, if any
    pub fn algo(&self) -> Option<&str> {
        self.details.algo.as_deref()
    }
}

// ============================================================================
// SCORING
// ============================================================================

/// Score a flat record against an optional model
pub fn score_record(flat: &FlatRecord, model: Option<&ModelArtifact>) -> ScoreResult {
    match model {
        None => ScoreResult::no_score(NoScoreReason::NoModel),
        Some(model) => {
            let features = extract(flat, model.cols());
            score(&features, model)
        }
    }
}

/// Score a feature vector built for `model.cols()`
pub fn score(features: &FeatureVector, model: &ModelArtifact) -> ScoreResult {
    if model.cols().is_empty() {
        return ScoreResult::no_score(NoScoreReason::NoFeatureCols);
    }

    match model {
        ModelArtifact::Isolation(m) => score_isolation(features, m),
        ModelArtifact::RobustZ(m) => score_robust_z(features, m),
        ModelArtifact::Unknown { tag, .. } => {
            log::debug!("Cannot score with unknown model type {:?}", tag);
            ScoreResult::no_score(NoScoreReason::UnknownModelType)
        }
    }
}

fn score_isolation(features: &FeatureVector, model: &IsolationModel) -> ScoreResult {
    let algo = super::artifact::TAG_ISOLATION_FOREST;

    if let Err(e) = features.validate(&model.cols) {
        return ScoreResult::failed(algo, e);
    }

    match model.clf.decision_function(features.as_slice()) {
        Ok(raw) => {
            let prob = anomaly_probability(raw);
            ScoreResult {
                score: Some(raw),
                anomaly_prob: Some(prob),
                is_anomaly: prob > ANOMALY_PROB_CUTOFF,
                details: ScoreDetails {
                    algo: Some(algo.to_string()),
                    ..Default::default()
                },
            }
        }
        Err(e) => {
            log::debug!("IsolationForest evaluation failed: {} {}", e, features.to_log_entry());
            ScoreResult::failed(algo, e)
        }
    }
}

fn score_robust_z(features: &FeatureVector, model: &RobustZModel) -> ScoreResult {
    let algo = super::artifact::TAG_ROBUST_Z;

    if let Err(e) = features.validate(&model.cols) {
        return ScoreResult::failed(algo, e);
    }

    let mut zmax = 0.0;
    let mut worst: Option<&str> = None;

    for (name, value) in features.iter() {
        let median = model.median.get(name).copied().unwrap_or(0.0);
        let mad = model.mad.get(name).copied().unwrap_or(MAD_FLOOR);
        let z = robust_z(value, median, mad);
        if z > zmax {
            zmax = z;
            worst = Some(name);
        }
    }

    ScoreResult {
        score: Some(zmax),
        anomaly_prob: None,
        is_anomaly: zmax >= model.k,
        details: ScoreDetails {
            algo: Some(algo.to_string()),
            zmax: Some(zmax),
            k: Some(model.k),
            feature: worst.map(str::to_string),
            ..Default::default()
        },
    }
}
