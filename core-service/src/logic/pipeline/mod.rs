//! Pipeline - one telemetry record in, at most one alert out
//!
//! Flatten → extract → score → rules → assemble. Scoring never fails; only
//! the two append-only logs can return an error, and that error reaches the
//! caller.

#[cfg(test)]
mod tests;

use serde::Serialize;

use crate::constants::{APP_NAME, APP_VERSION};
use crate::logic::alert::{self, AlertRecord};
use crate::logic::config::PipelineConfig;
use crate::logic::model::{score_record, ModelStatus, ModelStore, ScoreResult};
use crate::logic::rules::RuleSet;
use crate::logic::telemetry::{read_tail, JsonlLog, StoreError, TelemetryRecord};

/// Verdict for one record
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub score: ScoreResult,
    pub rule_alerts: Vec<String>,
    pub alert: Option<AlertRecord>,
}

impl Evaluation {
    pub fn alerted(&self) -> bool {
        self.alert.is_some()
    }
}

/// Model + rules, no logs attached. Used directly for offline replay.
pub struct Evaluator {
    models: ModelStore,
    rules: RuleSet,
}

impl Evaluator {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            models: ModelStore::new(&config.model_path, config.model_cache_ttl),
            rules: config.rules.clone(),
        }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Score + rules + alert assembly
    pub fn evaluate(&self, record: &TelemetryRecord) -> Evaluation {
        let flat = record.flatten();
        let model = self.models.load();
        let score = score_record(&flat, model.as_deref());
        let rule_alerts = self.rules.evaluate(&flat);
        let alert = alert::assemble(record, &flat, &score, &rule_alerts, unix_now());

        Evaluation { score, rule_alerts, alert }
    }

    pub fn model_status(&self) -> ModelStatus {
        self.models.status()
    }

    pub fn reload_model(&self) -> ModelStatus {
        self.models.reload();
        self.models.status()
    }
}

pub struct Pipeline {
    config: PipelineConfig,
    evaluator: Evaluator,
    telemetry: JsonlLog,
    alerts: JsonlLog,
}

impl Pipeline {
    /// Open both logs (creating the data directory) and set up the model cache.
    /// The model file itself is not required to exist.
    pub fn open(config: PipelineConfig) -> Result<Self, StoreError> {
        let telemetry = JsonlLog::open(&config.telemetry_file)?;
        let alerts = JsonlLog::open(&config.alerts_file)?;
        let evaluator = Evaluator::new(&config);

        log::info!(
            "{} v{} pipeline ready: model={:?} telemetry={:?} alerts={:?} rules={}",
            APP_NAME,
            APP_VERSION,
            config.model_path,
            config.telemetry_file,
            config.alerts_file,
            config.rules.rules.len()
        );

        Ok(Self { config, evaluator, telemetry, alerts })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Touches no log
    pub fn evaluate(&self, record: &TelemetryRecord) -> Evaluation {
        self.evaluator.evaluate(record)
    }

    /// Log the record verbatim, evaluate it, log the alert if one was raised
    pub fn ingest(&self, record: &TelemetryRecord) -> Result<Evaluation, StoreError> {
        self.telemetry.append_raw(record.source())?;

        let evaluation = self.evaluator.evaluate(record);

        if let Some(alert) = &evaluation.alert {
            self.alerts.append(alert)?;
            log::info!(
                "[{}] alert device={} algo={} rules={}",
                alert.severity,
                alert.device_id.as_deref().unwrap_or("-"),
                alert.details.algo,
                alert.details.rule_alerts.len()
            );
        } else if let Some(error) = &evaluation.score.details.error {
            log::debug!("Scoring degraded for {:?}: {}", record.device_id, error);
        }

        Ok(evaluation)
    }

    /// Last `limit` alerts, oldest first
    pub fn recent_alerts(&self, limit: usize) -> Result<Vec<AlertRecord>, StoreError> {
        read_tail(self.alerts.path(), limit)
    }

    pub fn model_status(&self) -> ModelStatus {
        self.evaluator.model_status()
    }

    pub fn reload_model(&self) -> ModelStatus {
        self.evaluator.reload_model()
    }
}

fn unix_now() -> f64 {
    chrono::Utc::now().timestamp_micros() as f64 / 1_000_000.0
}
