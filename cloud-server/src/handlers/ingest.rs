//! Telemetry ingest handler

use axum::{body::Bytes, extract::State, Json};
use serde::Serialize;

use gasguard_core::{Evaluation, Severity, TelemetryRecord};

use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    status: &'static str,
    score: Option<f64>,
    anomaly_prob: Option<f64>,
    is_anomaly: bool,
    rule_alerts: Vec<String>,
    alerted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    severity: Option<Severity>,
}

impl From<Evaluation> for IngestResponse {
    fn from(eval: Evaluation) -> Self {
        Self {
            status: "ok",
            score: eval.score.score,
            anomaly_prob: eval.score.anomaly_prob,
            is_anomaly: eval.score.is_anomaly,
            severity: eval.alert.as_ref().map(|a| a.severity),
            alerted: eval.alert.is_some(),
            rule_alerts: eval.rule_alerts,
        }
    }
}

/// Accept one reading. The body is parsed here so that malformed payloads
/// are rejected before anything is logged.
pub async fn ingest(
    State(state): State<AppState>,
    body: Bytes,
) -> AppResult<Json<IngestResponse>> {
    let record = TelemetryRecord::from_slice(&body)?;

    let pipeline = state.pipeline.clone();
    let evaluation = super::blocking(move || pipeline.ingest(&record)).await??;

    if let Some(alert) = &evaluation.alert {
        tracing::info!(
            device = alert.device_id.as_deref().unwrap_or("-"),
            severity = %alert.severity,
            algo = %alert.details.algo,
            "Alert raised"
        );
    }

    Ok(Json(evaluation.into()))
}
