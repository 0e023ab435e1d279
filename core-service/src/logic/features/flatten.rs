//! Flattener - nested telemetry → dotted key/value map
//!
//! `{"metrics": {"eco2_ppm": 600}}` becomes `{"metrics.eco2_ppm": 600}`.
//! Only objects are recursed into; arrays and scalars are emitted as-is.

use std::collections::BTreeMap;
use serde_json::{Map, Value};

/// Key separator for nested paths
pub const PATH_SEPARATOR: char = '.';

/// Flat view of a telemetry record, keyed by dotted path
pub type FlatRecord = BTreeMap<String, Value>;

/// Flatten a JSON object depth-first into dotted paths.
///
/// Total: never fails. Empty child objects contribute no keys.
pub fn flatten(object: &Map<String, Value>) -> FlatRecord {
    let mut out = FlatRecord::new();
    flatten_into(object, None, &mut out);
    out
}

/// Flatten any JSON value. Non-object roots yield an empty record.
pub fn flatten_value(value: &Value) -> FlatRecord {
    match value {
        Value::Object(map) => flatten(map),
        _ => FlatRecord::new(),
    }
}

fn flatten_into(object: &Map<String, Value>, prefix: Option<&str>, out: &mut FlatRecord) {
    for (key, value) in object {
        let path = match prefix {
            Some(parent) => format!("{}{}{}", parent, PATH_SEPARATOR, key),
            None => key.clone(),
        };

        match value {
            Value::Object(child) => flatten_into(child, Some(&path), out),
            other => {
                out.insert(path, other.clone());
            }
        }
    }
}
