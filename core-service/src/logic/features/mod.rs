//! Features Module - Telemetry → model input
//!
//! - `flatten.rs` - nested record → dotted key/value map
//! - `layout.rs` - standard metric paths, column hashing
//! - `vector.rs` - ordered feature vector with missing-value sentinel

pub mod flatten;
pub mod layout;
pub mod vector;


// Re-export common types
pub use flatten::{flatten, flatten_value, FlatRecord};
pub use layout::{layout_hash, LayoutMismatchError, METRIC_LAYOUT};
pub use vector::{coerce_numeric, extract, FeatureVector, MISSING};
