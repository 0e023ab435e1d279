//! Scoring Thresholds
//!
//! Constants that turn raw model statistics into a yes/no decision.
//! The RobustZ cut-off `k` travels with the model artifact; everything
//! else is fixed here.

// ============================================================================
// ISOLATION FOREST
// ============================================================================

/// Steepness of the logistic squash applied to the decision statistic
pub const LOGISTIC_SLOPE: f64 = 5.0;

/// `anomaly_prob` strictly above this flags an anomaly
pub const ANOMALY_PROB_CUTOFF: f64 = 0.6;

// ============================================================================
// ROBUST Z
// ============================================================================

/// Scale factor making MAD a consistent estimator of the normal std-dev
pub const MAD_SCALE: f64 = 1.4826;

/// Floor applied to MAD so a constant training column never divides by zero
pub const MAD_FLOOR: f64 = 1e-6;

/// Default z cut-off when the artifact does not carry one
pub const DEFAULT_Z_THRESHOLD: f64 = 6.0;

/// Map the isolation decision statistic (higher = more normal) to a
/// probability-like anomaly score in (0, 1).
pub fn anomaly_probability(raw: f64) -> f64 {
    1.0 / (1.0 + (LOGISTIC_SLOPE * raw).exp())
}

/// Robust z-score of one value. NaN input scores 0 and never alerts on its own.
pub fn robust_z(value: f64, median: f64, mad: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    (value - median).abs() / (MAD_SCALE * mad.max(MAD_FLOOR))
}
