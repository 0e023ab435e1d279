//! Pipeline Configuration
//!
//! Where the logs and the model artifact live, how long a loaded model is
//! trusted, and which safety ceilings apply. Defaults come from
//! `crate::constants`; `from_env` applies the `GASGUARD_*` overrides.

use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    get_data_dir, get_model_cache_ttl_secs, get_model_path, ALERTS_FILE_NAME, DEFAULT_DATA_DIR,
    DEFAULT_MODEL_CACHE_TTL_SECS, MODEL_FILE_NAME, TELEMETRY_FILE_NAME,
};
use crate::logic::rules::RuleSet;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub model_path: PathBuf,
    pub telemetry_file: PathBuf,
    pub alerts_file: PathBuf,
    pub model_cache_ttl: Duration,
    pub rules: RuleSet,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::in_dir(DEFAULT_DATA_DIR)
    }
}

impl PipelineConfig {
    /// Standard file names under `data_dir`, default rules and TTL
    pub fn in_dir(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            model_path: data_dir.join(MODEL_FILE_NAME),
            telemetry_file: data_dir.join(TELEMETRY_FILE_NAME),
            alerts_file: data_dir.join(ALERTS_FILE_NAME),
            model_cache_ttl: Duration::from_secs(DEFAULT_MODEL_CACHE_TTL_SECS),
            rules: RuleSet::default(),
            data_dir,
        }
    }

    pub fn from_env() -> Self {
        let data_dir = get_data_dir();
        Self {
            model_path: get_model_path(&data_dir),
            telemetry_file: data_dir.join(TELEMETRY_FILE_NAME),
            alerts_file: data_dir.join(ALERTS_FILE_NAME),
            model_cache_ttl: Duration::from_secs(get_model_cache_ttl_secs()),
            rules: RuleSet::from_env(),
            data_dir,
        }
    }

    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    pub fn with_model_cache_ttl(mut self, ttl: Duration) -> Self {
        self.model_cache_ttl = ttl;
        self
    }

    pub fn with_rules(mut self, rules: RuleSet) -> Self {
        self.rules = rules;
        self
    }
}
