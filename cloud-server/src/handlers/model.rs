//! Model status handlers

use axum::{extract::State, Json};

use gasguard_core::ModelStatus;

use crate::{AppResult, AppState};

pub async fn status(State(state): State<AppState>) -> AppResult<Json<ModelStatus>> {
    let pipeline = state.pipeline.clone();
    Ok(Json(super::blocking(move || pipeline.model_status()).await?))
}

/// Drop the cached model and read the artifact again
pub async fn reload(State(state): State<AppState>) -> AppResult<Json<ModelStatus>> {
    let pipeline = state.pipeline.clone();
    let status = super::blocking(move || pipeline.reload_model()).await?;

    tracing::info!(loaded = status.loaded, algo = ?status.algo, "Model reloaded");
    Ok(Json(status))
}
