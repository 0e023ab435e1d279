//! GasGuard core - telemetry anomaly scoring and alerting
//!
//! Everything here is synchronous; callers in async contexts should run
//! `Pipeline` calls on a blocking thread.

pub mod constants;
pub mod logic;

pub use logic::alert::{AlertRecord, Severity};
pub use logic::config::PipelineConfig;
pub use logic::model::{ModelArtifact, ModelStatus, ScoreResult};
pub use logic::pipeline::{Evaluation, Evaluator, Pipeline};
pub use logic::rules::RuleSet;
pub use logic::telemetry::{PayloadError, StoreError, TelemetryRecord};
