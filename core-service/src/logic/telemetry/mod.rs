//! Telemetry Module
//!
//! Incoming readings and the append-only JSONL files they end up in.
//!
//! ## Structure
//! - `record.rs` - TelemetryRecord (immutable, one per ingest call)
//! - `recorder.rs` - Append-only JSONL writer (thread-safe) + tail reader

pub mod record;
pub mod recorder;

pub use record::{PayloadError, TelemetryRecord};
pub use recorder::{read_tail, JsonlLog, StoreError};
