use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Alert ranking for display. Variants are ordered low → high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Medium,   // Model anomaly only
    High,     // Single safety rule breached
    Critical, // Model + rules agree, or several rules breached
}

impl Severity {
    /// `None` when neither signal fired
    pub fn derive(is_anomaly: bool, rule_hits: usize) -> Option<Self> {
        match (is_anomaly, rule_hits) {
            (false, 0) => None,
            (true, 0) => Some(Severity::Medium),
            (false, 1) => Some(Severity::High),
            _ => Some(Severity::Critical),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model + rule verdicts as stored with the alert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertDetails {
    /// Model algorithm tag, suffixed `+Rules` when rules fired
    pub algo: String,
    pub score: Option<f64>,
    pub anomaly_prob: Option<f64>,
    pub is_anomaly: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rule_alerts: Vec<String>,
}

/// One line of the alert log. Never updated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Unix seconds
    pub ts: f64,
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
    pub severity: Severity,
    pub score: Option<f64>,
    pub details: AlertDetails,
    /// Standard metrics present in the reading, keyed by short name
    pub sample: BTreeMap<String, f64>,
}
