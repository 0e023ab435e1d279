//! Feature Vector - Core data structure for model input
//!
//! Built from a flat record and the model's ordered column list. A column
//! that is absent or not numeric becomes `MISSING` (NaN); extraction never
//! fails and always yields exactly one value per column.

use serde::Serialize;
use serde_json::Value;

use super::flatten::FlatRecord;
use super::layout::{layout_hash, validate_layout, LayoutMismatchError};

/// Sentinel for an absent or non-numeric feature
pub const MISSING: f64 = f64::NAN;

// ============================================================================
// FEATURE VECTOR
// ============================================================================

/// Ordered `(name, value)` pairs matching a model's declared columns
#[derive(Debug, Clone, Serialize)]
pub struct FeatureVector {
    /// CRC32 of the column names this vector was built for
    pub layout_hash: u32,
    names: Vec<String>,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Values in column order
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| self.get(i))
    }

    /// Iterate `(name, value)` pairs in column order
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }

    /// Number of columns that fell back to the missing sentinel
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_nan()).count()
    }

    /// Check that this vector was built for exactly these columns
    pub fn validate(&self, cols: &[String]) -> Result<(), LayoutMismatchError> {
        validate_layout(cols, self.layout_hash, self.values.len())
    }

    /// JSON-friendly form for debug logging (NaN rendered as null)
    pub fn to_log_entry(&self) -> Value {
        let named: serde_json::Map<String, Value> = self
            .iter()
            .map(|(name, v)| {
                let value = serde_json::Number::from_f64(v)
                    .map(Value::Number)
                    .unwrap_or(Value::Null);
                (name.to_string(), value)
            })
            .collect();

        serde_json::json!({
            "layout_hash": self.layout_hash,
            "missing": self.missing_count(),
            "named_values": named,
        })
    }
}

// ============================================================================
// EXTRACTION
// ============================================================================

/// Pull `cols` out of a flat record, in order, coercing each to f64.
///
/// Output length always equals `cols.len()`.
pub fn extract(flat: &FlatRecord, cols: &[String]) -> FeatureVector {
    let values = cols
        .iter()
        .map(|col| flat.get(col).and_then(coerce_numeric).unwrap_or(MISSING))
        .collect();

    FeatureVector {
        layout_hash: layout_hash(cols),
        names: cols.to_vec(),
        values,
    }
}

/// Lenient numeric coercion of a raw telemetry value.
///
/// Numbers pass through, booleans map to 1/0, numeric strings are parsed.
/// Null, arrays, objects and unparseable strings yield `None`.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}
