//! Alert Module - merge model and rule verdicts into one record
//!
//! An alert exists iff the model flagged an anomaly OR at least one safety
//! rule fired. Its severity is derived once, at assembly time.

pub mod types;

pub use types::{AlertDetails, AlertRecord, Severity};

use std::collections::BTreeMap;

use crate::logic::features::{coerce_numeric, FlatRecord, METRIC_LAYOUT};
use crate::logic::model::ScoreResult;
use crate::logic::telemetry::TelemetryRecord;

/// Algo label used when no model produced a verdict
pub const NO_ALGO: &str = "none";

/// Suffix marking rule involvement in `details.algo`
pub const RULES_SUFFIX: &str = "+Rules";

/// Build the alert for one reading, or `None` if nothing fired.
///
/// `received_at` (unix seconds) stands in when the device sent no `ts`.
pub fn assemble(
    record: &TelemetryRecord,
    flat: &FlatRecord,
    score: &ScoreResult,
    rule_alerts: &[String],
    received_at: f64,
) -> Option<AlertRecord> {
    let severity = Severity::derive(score.is_anomaly, rule_alerts.len())?;

    let base = score.algo().unwrap_or(NO_ALGO);
    let algo = if rule_alerts.is_empty() {
        base.to_string()
    } else {
        format!("{}{}", base, RULES_SUFFIX)
    };

    Some(AlertRecord {
        ts: record.ts.unwrap_or(received_at),
        device_id: record.device_id.clone(),
        site_id: record.site_id.clone(),
        severity,
        score: score.score,
        details: AlertDetails {
            algo,
            score: score.score,
            anomaly_prob: score.anomaly_prob,
            is_anomaly: score.is_anomaly,
            rule_alerts: rule_alerts.to_vec(),
        },
        sample: sample(flat),
    })
}

/// Snapshot of the standard metrics actually present and numeric
pub fn sample(flat: &FlatRecord) -> BTreeMap<String, f64> {
    METRIC_LAYOUT
        .iter()
        .filter_map(|path| {
            let value = flat.get(*path).and_then(coerce_numeric)?;
            if value.is_finite() {
                let name = path.rsplit('.').next().unwrap_or(path);
                Some((name.to_string(), value))
            } else {
                None
            }
        })
        .collect()
}
