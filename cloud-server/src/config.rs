//! Configuration module

use std::env;

use gasguard_core::PipelineConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Alerts returned when the query has no `limit`
    pub alert_query_default_limit: usize,

    /// Upper bound on `limit`
    pub alert_query_max_limit: usize,

    /// Data directory, model path, rule ceilings (`GASGUARD_*`)
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let alert_query_max_limit = env::var("ALERT_QUERY_MAX_LIMIT")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|v: &usize| *v > 0)
            .unwrap_or(1000);

        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8080),

            environment: env::var("ENVIRONMENT")
                .unwrap_or_else(|_| "development".to_string()),

            alert_query_default_limit: env::var("ALERT_QUERY_DEFAULT_LIMIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v: &usize| *v > 0)
                .unwrap_or(100)
                .min(alert_query_max_limit),

            alert_query_max_limit,

            pipeline: PipelineConfig::from_env(),
        }
    }

    /// Defaults around an explicit pipeline config
    #[cfg(test)]
    pub fn with_pipeline(pipeline: PipelineConfig) -> Self {
        Self {
            port: 8080,
            environment: "development".to_string(),
            alert_query_default_limit: 100,
            alert_query_max_limit: 1000,
            pipeline,
        }
    }
}
