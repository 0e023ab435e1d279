//! Isolation Forest - serialized ensemble evaluation
//!
//! The trained classifier is a set of isolation trees stored as flat node
//! arrays. Scoring follows the usual convention: anomalies are isolated in
//! fewer splits, so their average path length is short.
//!
//! ```text
//! score_samples(x)     = -2^(-E[h(x)] / c(max_samples))
//! decision_function(x) = score_samples(x) - offset      (higher = more normal)
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Euler–Mascheroni constant
const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// One node of an isolation tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TreeNode {
    /// Go left when `row[feature] <= threshold`
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    /// Terminal node holding `size` training samples
    Leaf { size: usize },
}

/// Flat node array; index 0 is the root
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationTree {
    pub nodes: Vec<TreeNode>,
}

/// Trained ensemble
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsolationForest {
    pub trees: Vec<IsolationTree>,
    /// Sub-sample size each tree was grown on
    pub max_samples: usize,
    /// Subtracted from `score_samples` so the decision boundary sits at 0
    #[serde(default = "default_offset")]
    pub offset: f64,
    /// Expected row width
    pub n_features: usize,
}

fn default_offset() -> f64 {
    -0.5
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, Error)]
pub enum IsolationError {
    #[error("X has {actual} features, but IsolationForest is expecting {expected} features as input")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("Input X contains NaN (feature {index})")]
    MissingValue { index: usize },

    #[error("IsolationForest has no trees")]
    EmptyForest,

    #[error("malformed tree {tree}: node {node} out of range")]
    BadNode { tree: usize, node: usize },

    #[error("malformed tree {tree}: split on feature {feature} out of range")]
    BadFeature { tree: usize, feature: usize },
}

// ============================================================================
// EVALUATION
// ============================================================================

/// Average path length of an unsuccessful BST search over `n` points
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

impl IsolationTree {
    /// Depth at which `row` lands, plus the expected remaining depth of its leaf
    fn path_length(&self, tree_index: usize, row: &[f64]) -> Result<f64, IsolationError> {
        let mut index = 0usize;
        let mut depth = 0.0;

        // A well-formed tree never visits more nodes than it has
        for _ in 0..=self.nodes.len() {
            let node = self.nodes.get(index).ok_or(IsolationError::BadNode {
                tree: tree_index,
                node: index,
            })?;

            match *node {
                TreeNode::Leaf { size } => return Ok(depth + average_path_length(size)),
                TreeNode::Split { feature, threshold, left, right } => {
                    let value = *row.get(feature).ok_or(IsolationError::BadFeature {
                        tree: tree_index,
                        feature,
                    })?;
                    index = if value <= threshold { left } else { right };
                    depth += 1.0;
                }
            }
        }

        Err(IsolationError::BadNode { tree: tree_index, node: index })
    }
}

impl IsolationForest {
    fn check_row(&self, row: &[f64]) -> Result<(), IsolationError> {
        if row.len() != self.n_features {
            return Err(IsolationError::ShapeMismatch {
                expected: self.n_features,
                actual: row.len(),
            });
        }
        if let Some(index) = row.iter().position(|v| v.is_nan()) {
            return Err(IsolationError::MissingValue { index });
        }
        if self.trees.is_empty() {
            return Err(IsolationError::EmptyForest);
        }
        Ok(())
    }

    /// Opposite of the anomaly score: in [-1, 0), lower = more abnormal
    pub fn score_samples(&self, row: &[f64]) -> Result<f64, IsolationError> {
        self.check_row(row)?;

        let mut total = 0.0;
        for (i, tree) in self.trees.iter().enumerate() {
            total += tree.path_length(i, row)?;
        }
        let mean_depth = total / self.trees.len() as f64;

        let normalizer = average_path_length(self.max_samples);
        let normalized = if normalizer > 0.0 { mean_depth / normalizer } else { 0.0 };

        Ok(-(2f64.powf(-normalized)))
    }

    /// Decision statistic: positive for inliers, negative for outliers
    pub fn decision_function(&self, row: &[f64]) -> Result<f64, IsolationError> {
        Ok(self.score_samples(row)? - self.offset)
    }
}
