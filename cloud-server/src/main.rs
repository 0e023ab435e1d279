//! GasGuard Cloud Server
//!
//! Ingest endpoint and query API in front of the GasGuard scoring pipeline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    GASGUARD CLOUD                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌─────────────────────────────────────────┐ │
//! │  │  API      │  │  Pipeline (gasguard-core)               │ │
//! │  │  Gateway  │─▶│  flatten → score → rules → alert        │ │
//! │  │  (Axum)   │  │  (blocking pool)                        │ │
//! │  └───────────┘  └──────────────┬──────────────────────────┘ │
//! │                                ▼                            │
//! │        model.bin      telemetry.jsonl      alerts.jsonl     │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod handlers;
mod error;


use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gasguard_core::Pipeline;

pub use error::{AppError, AppResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    init_tracing();

    let config = config::Config::from_env();

    tracing::info!("GasGuard Cloud Server starting ({})...", config.environment);
    tracing::info!("Data directory: {:?}", config.pipeline.data_dir);
    tracing::info!("Model artifact: {:?}", config.pipeline.model_path);

    let pipeline_config = config.pipeline.clone();
    let (pipeline, model) = tokio::task::spawn_blocking(move || {
        Pipeline::open(pipeline_config).map(|p| {
            let status = p.model_status();
            (p, status)
        })
    })
    .await?
    .context("Failed to open data directory")?;

    if model.loaded {
        tracing::info!("Model ready: {}", model.algo.as_deref().unwrap_or("?"));
    } else {
        tracing::warn!("No usable model; only safety rules will raise alerts");
    }

    // Build application state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        config: config.clone(),
    };

    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gasguard_cloud=debug,gasguard_core=info,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    // Device-facing routes
    let device_routes = Router::new()
        .route("/health", get(handlers::health::check))
        .route("/now", get(handlers::health::now))
        .route("/ingest", post(handlers::ingest::ingest));

    // Operator routes
    let api_routes = Router::new()
        .route("/api/v1/alerts", get(handlers::alerts::list))
        .route("/api/v1/model", get(handlers::model::status))
        .route("/api/v1/model/reload", post(handlers::model::reload));

    Router::new()
        .merge(device_routes)
        .merge(api_routes)
        .fallback(handlers::not_found)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
