//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;

use crate::{AppResult, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
    timestamp: i64,
    model_loaded: bool,
}

#[derive(Serialize)]
pub struct NowResponse {
    now: f64,
}

pub async fn check(State(state): State<AppState>) -> AppResult<Json<HealthResponse>> {
    let pipeline = state.pipeline.clone();
    let status = super::blocking(move || pipeline.model_status()).await?;

    Ok(Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
        model_loaded: status.loaded,
    }))
}

/// Server clock, unix seconds. Devices without RTC sync against this.
pub async fn now() -> Json<NowResponse> {
    Json(NowResponse {
        now: chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0,
    })
}
