//! Alert query handler

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use gasguard_core::AlertRecord;

use crate::{AppError, AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct AlertQuery {
    #[validate(range(min = 1))]
    pub limit: Option<usize>,
}

/// Most recent alerts, oldest first
pub async fn list(
    State(state): State<AppState>,
    query: Result<Query<AlertQuery>, QueryRejection>,
) -> AppResult<Json<Vec<AlertRecord>>> {
    let Query(query) = query?;
    query.validate()?;

    let max = state.config.alert_query_max_limit;
    let limit = query.limit.unwrap_or(state.config.alert_query_default_limit);
    if limit > max {
        return Err(AppError::ValidationError(format!("limit must be at most {}", max)));
    }

    let pipeline = state.pipeline.clone();
    let alerts = super::blocking(move || pipeline.recent_alerts(limit)).await??;
    Ok(Json(alerts))
}
