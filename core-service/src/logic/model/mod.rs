//! Model Module - Artifact loading and scoring
//!
//! Loading is separated from scoring so the artifact can be hot-swapped on
//! disk without touching the request path.
//!
//! - `artifact.rs` - tagged union over IsolationForest / RobustZ
//! - `isolation.rs` - isolation tree ensemble evaluation
//! - `store.rs` - mtime-keyed cache over the artifact file
//! - `scorer.rs` - feature vector × artifact → `ScoreResult`
//! - `threshold.rs` - decision constants

pub mod artifact;
pub mod isolation;
pub mod scorer;
pub mod store;
pub mod threshold;

#[cfg(test)]
mod tests;

// Re-export common types
pub use artifact::{ArtifactError, IsolationModel, ModelArtifact, RobustZModel};
pub use isolation::{IsolationError, IsolationForest, IsolationTree, TreeNode};
pub use scorer::{score, score_record, NoScoreReason, ScoreDetails, ScoreResult};
pub use store::{ModelStatus, ModelStore};
