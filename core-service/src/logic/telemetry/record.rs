//! Telemetry Record
//!
//! One timestamped reading bundle from a field device, as received.
//! The request text is kept untouched for the telemetry log; the typed
//! fields are extracted leniently for alert assembly.

use serde_json::Value;
use thiserror::Error;

use crate::logic::features::{flatten, FlatRecord};

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("bad json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("bad json: payload must be an object, got {0}")]
    NotAnObject(&'static str),
}

/// Immutable telemetry record; lives for one ingest call
#[derive(Debug, Clone)]
pub struct TelemetryRecord {
    pub device_id: Option<String>,
    pub site_id: Option<String>,
    /// Unix seconds as reported by the device
    pub ts: Option<f64>,
    raw: Value,
    /// Document text as it should appear in the telemetry log
    source: String,
}

impl TelemetryRecord {
    /// Parse a request body. The body text itself is what gets logged.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, PayloadError> {
        let value: Value = serde_json::from_slice(bytes)?;
        let mut record = Self::from_value(value)?;

        // Valid JSON is UTF-8 outside of strings too, but keep the
        // re-serialized form if that ever fails
        if let Ok(text) = std::str::from_utf8(bytes) {
            record.source = text.trim().to_string();
        }
        Ok(record)
    }

    /// Accept any JSON object; extra fields are preserved
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        let object = match &value {
            Value::Object(map) => map,
            other => return Err(PayloadError::NotAnObject(json_kind(other))),
        };

        let device_id = object.get("device_id").and_then(Value::as_str).map(str::to_string);
        let site_id = object.get("site_id").and_then(Value::as_str).map(str::to_string);
        let ts = object.get("ts").and_then(Value::as_f64);

        let source = value.to_string();
        Ok(Self { device_id, site_id, ts, raw: value, source })
    }

    /// Document exactly as received
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    /// Text for the telemetry log: the request body when parsed from one,
    /// the compact serialization otherwise
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Dotted-path view of the whole document
    pub fn flatten(&self) -> FlatRecord {
        match &self.raw {
            Value::Object(map) => flatten(map),
            _ => FlatRecord::new(),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
