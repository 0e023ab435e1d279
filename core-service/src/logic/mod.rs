//! Logic Module - Scoring & alerting engines
//!
//! - `features/` - flatten + feature extraction
//! - `model/` - artifact store, IsolationForest / RobustZ scoring
//! - `rules.rs` - fixed safety ceilings
//! - `alert/` - verdict merge, severity
//! - `telemetry/` - payload parsing, JSONL logs
//! - `pipeline/` - ties the above together per ingest call

pub mod alert;
pub mod config;
pub mod features;
pub mod model;
pub mod pipeline;
pub mod rules;
pub mod telemetry;
