//! Feature Layout - Known telemetry paths and column hashing
//!
//! Models declare their own ordered feature columns, so the layout is not a
//! fixed array here. What stays fixed:
//! 1. The standard metric paths a field sensor reports (`METRIC_LAYOUT`)
//! 2. How an ordered column list is hashed, so a vector built for one model
//!    is never scored against another

use crc32fast::Hasher;
use thiserror::Error;

// ============================================================================
// STANDARD METRICS
// ============================================================================

/// Ambient temperature (°C)
pub const AMBIENT_TEMP_C: &str = "metrics.ambient_temp_c";
/// Relative humidity (%)
pub const AMBIENT_RH_PCT: &str = "metrics.ambient_rh_pct";
/// Barometric pressure (hPa)
pub const PRESSURE_HPA: &str = "metrics.pressure_hpa";
/// Equivalent CO2 (ppm)
pub const ECO2_PPM: &str = "metrics.eco2_ppm";
/// Total volatile organic compounds (ppb)
pub const TVOC_PPB: &str = "metrics.tvoc_ppb";

/// Flattened paths of the metrics every sensor sends, in display order.
/// Alert samples snapshot exactly these keys.
pub const METRIC_LAYOUT: &[&str] = &[
    AMBIENT_TEMP_C,
    AMBIENT_RH_PCT,
    PRESSURE_HPA,
    ECO2_PPM,
    TVOC_PPB,
];

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// CRC32 over the ordered column names
pub fn layout_hash<S: AsRef<str>>(cols: &[S]) -> u32 {
    let mut hasher = Hasher::new();

    for name in cols {
        hasher.update(name.as_ref().as_bytes());
        hasher.update(&[0]); // Separator
    }

    hasher.finalize()
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Vector and model disagree on the feature columns
#[derive(Debug, Clone, Error)]
#[error("feature layout mismatch: expected {expected_count} cols (hash: {expected_hash:08x}), got {actual_count} cols (hash: {actual_hash:08x})")]
pub struct LayoutMismatchError {
    pub expected_hash: u32,
    pub expected_count: usize,
    pub actual_hash: u32,
    pub actual_count: usize,
}

/// Validate that a vector's layout matches the model's columns
pub fn validate_layout(
    expected_cols: &[String],
    actual_hash: u32,
    actual_count: usize,
) -> Result<(), LayoutMismatchError> {
    let expected_hash = layout_hash(expected_cols);

    if expected_hash != actual_hash || expected_cols.len() != actual_count {
        return Err(LayoutMismatchError {
            expected_hash,
            expected_count: expected_cols.len(),
            actual_hash,
            actual_count,
        });
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
