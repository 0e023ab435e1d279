//! Central Configuration Constants
//!
//! Single source of truth for all configuration defaults.
//! Every value can be overridden through the environment; the `get_*`
//! helpers below read the variable and fall back to the default.

use std::path::PathBuf;

/// Default data directory (telemetry log, alert log, model artifact)
pub const DEFAULT_DATA_DIR: &str = "data";

/// Model artifact file name inside the data directory
pub const MODEL_FILE_NAME: &str = "model.bin";

/// Telemetry log file name inside the data directory
pub const TELEMETRY_FILE_NAME: &str = "telemetry.jsonl";

/// Alert log file name inside the data directory
pub const ALERTS_FILE_NAME: &str = "alerts.jsonl";

/// How long a loaded model is trusted before the file is stat'ed again (seconds)
pub const DEFAULT_MODEL_CACHE_TTL_SECS: u64 = 5;

/// eCO2 ceiling (ppm)
pub const DEFAULT_ECO2_PPM_LIMIT: f64 = 2000.0;

/// TVOC ceiling (ppb)
pub const DEFAULT_TVOC_PPB_LIMIT: f64 = 1000.0;

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// App name
pub const APP_NAME: &str = "GasGuard";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Get data directory from environment or use default
pub fn get_data_dir() -> PathBuf {
    std::env::var("GASGUARD_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Get model artifact path from environment, or `<data_dir>/model.bin`
pub fn get_model_path(data_dir: &std::path::Path) -> PathBuf {
    std::env::var("GASGUARD_MODEL_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| data_dir.join(MODEL_FILE_NAME))
}

/// Get model cache TTL from environment or use default
pub fn get_model_cache_ttl_secs() -> u64 {
    std::env::var("GASGUARD_MODEL_CACHE_TTL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MODEL_CACHE_TTL_SECS)
}

/// Get eCO2 rule threshold from environment or use default
pub fn get_eco2_ppm_limit() -> f64 {
    std::env::var("GASGUARD_RULE_ECO2_PPM")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_ECO2_PPM_LIMIT)
}

/// Get TVOC rule threshold from environment or use default
pub fn get_tvoc_ppb_limit() -> f64 {
    std::env::var("GASGUARD_RULE_TVOC_PPB")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_TVOC_PPB_LIMIT)
}
