//! HTTP handlers

pub mod alerts;
pub mod health;
pub mod ingest;
pub mod model;

use crate::AppResult;

/// Run a synchronous pipeline call off the async workers.
/// File I/O (log appends, model reloads) happens inside.
pub async fn blocking<T, F>(f: F) -> AppResult<T>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(f).await?)
}

/// Fallback for unknown routes
pub async fn not_found(uri: axum::http::Uri) -> crate::AppError {
    crate::AppError::NotFound(format!("No route for {}", uri.path()))
}
