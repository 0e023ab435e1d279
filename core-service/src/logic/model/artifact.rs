//! Model Artifact - tagged union over the two scoring algorithms
//!
//! On disk the artifact is a self-describing document with a `model` tag:
//!
//! ```text
//! {"model": "IsolationForest", "clf": {...}, "cols": [...]}
//! {"model": "RobustZ", "params": {"median": {...}, "mad": {...}, "k": 6.0, "cols": [...]}}
//! ```
//!
//! `cols` may sit at the top level or under `params`; the top level wins
//! when both are present and non-empty. The same document is accepted as
//! MessagePack (primary) or JSON (fallback).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use super::isolation::IsolationForest;
use super::threshold::DEFAULT_Z_THRESHOLD;

/// Tag value selecting the isolation variant
pub const TAG_ISOLATION_FOREST: &str = "IsolationForest";

/// Tag value selecting the robust-z variant
pub const TAG_ROBUST_Z: &str = "RobustZ";

// ============================================================================
// DATA STRUCTURES
// ============================================================================

/// Isolation-based model
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationModel {
    pub clf: IsolationForest,
    pub cols: Vec<String>,
}

/// Median/MAD parameters as stored under `params`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobustZParams {
    #[serde(default)]
    pub median: HashMap<String, f64>,
    #[serde(default)]
    pub mad: HashMap<String, f64>,
    #[serde(default = "default_k")]
    pub k: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cols: Vec<String>,
}

fn default_k() -> f64 {
    DEFAULT_Z_THRESHOLD
}

/// Robust z-score model
#[derive(Debug, Clone, PartialEq)]
pub struct RobustZModel {
    pub median: HashMap<String, f64>,
    pub mad: HashMap<String, f64>,
    pub k: f64,
    pub cols: Vec<String>,
}

/// A loaded model. `Unknown` keeps the tag it was given so the scorer can
/// report it rather than silently falling through.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelArtifact {
    Isolation(IsolationModel),
    RobustZ(RobustZModel),
    Unknown { tag: Option<String>, cols: Vec<String> },
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact is neither MessagePack ({msgpack}) nor JSON ({json})")]
    Undecodable { msgpack: String, json: String },

    #[error("artifact root must be a map")]
    NotAMap,

    #[error("invalid {field} for {tag} model: {source}")]
    InvalidField {
        tag: &'static str,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{tag} model is missing `{field}`")]
    MissingField { tag: &'static str, field: &'static str },
}

// ============================================================================
// DECODING
// ============================================================================

impl ModelArtifact {
    /// Decode raw file bytes: MessagePack first, then JSON
    pub fn decode(bytes: &[u8]) -> Result<Self, ArtifactError> {
        // JSON text also parses as a (meaningless) MessagePack scalar, so only
        // a map counts as a successful primary decode.
        let value = match rmp_serde::from_slice::<Value>(bytes) {
            Ok(value @ Value::Object(_)) => value,
            primary => match serde_json::from_slice::<Value>(bytes) {
                Ok(value) => value,
                Err(json_err) => {
                    let msgpack = match primary {
                        Ok(_) => "root is not a map".to_string(),
                        Err(e) => e.to_string(),
                    };
                    return Err(ArtifactError::Undecodable {
                        msgpack,
                        json: json_err.to_string(),
                    });
                }
            },
        };
        Self::from_value(value)
    }

    /// Build the typed artifact from a decoded document
    pub fn from_value(mut value: Value) -> Result<Self, ArtifactError> {
        let doc = value.as_object_mut().ok_or(ArtifactError::NotAMap)?;

        let top_cols = string_list(doc.get("cols"));
        let tag = doc.get("model").and_then(Value::as_str).map(str::to_string);

        match tag.as_deref() {
            Some(TAG_ISOLATION_FOREST) => {
                let raw = doc.remove("clf").ok_or(ArtifactError::MissingField {
                    tag: TAG_ISOLATION_FOREST,
                    field: "clf",
                })?;
                let clf = serde_json::from_value::<IsolationForest>(raw).map_err(|source| {
                    ArtifactError::InvalidField { tag: TAG_ISOLATION_FOREST, field: "clf", source }
                })?;
                let cols = pick_cols(top_cols, string_list(doc.get("params").and_then(|p| p.get("cols"))));
                Ok(ModelArtifact::Isolation(IsolationModel { clf, cols }))
            }
            Some(TAG_ROBUST_Z) => {
                let raw = doc.remove("params").ok_or(ArtifactError::MissingField {
                    tag: TAG_ROBUST_Z,
                    field: "params",
                })?;
                let params = serde_json::from_value::<RobustZParams>(raw).map_err(|source| {
                    ArtifactError::InvalidField { tag: TAG_ROBUST_Z, field: "params", source }
                })?;
                let cols = pick_cols(top_cols, params.cols);
                Ok(ModelArtifact::RobustZ(RobustZModel {
                    median: params.median,
                    mad: params.mad,
                    k: params.k,
                    cols,
                }))
            }
            _ => {
                let cols = pick_cols(top_cols, string_list(doc.get("params").and_then(|p| p.get("cols"))));
                Ok(ModelArtifact::Unknown { tag, cols })
            }
        }
    }

    /// Serialize to the JSON document shape
    pub fn to_value(&self) -> Value {
        match self {
            ModelArtifact::Isolation(m) => serde_json::json!({
                "model": TAG_ISOLATION_FOREST,
                "clf": m.clf,
                "cols": m.cols,
            }),
            ModelArtifact::RobustZ(m) => serde_json::json!({
                "model": TAG_ROBUST_Z,
                "params": RobustZParams {
                    median: m.median.clone(),
                    mad: m.mad.clone(),
                    k: m.k,
                    cols: m.cols.clone(),
                },
            }),
            ModelArtifact::Unknown { tag, cols } => serde_json::json!({
                "model": tag,
                "cols": cols,
            }),
        }
    }

    /// Encode in the primary (MessagePack) format
    pub fn to_msgpack(&self) -> Result<Vec<u8>, rmp_serde::encode::Error> {
        rmp_serde::to_vec_named(&self.to_value())
    }

    /// Feature columns the model was trained on
    pub fn cols(&self) -> &[String] {
        match self {
            ModelArtifact::Isolation(m) => &m.cols,
            ModelArtifact::RobustZ(m) => &m.cols,
            ModelArtifact::Unknown { cols, .. } => cols,
        }
    }

    /// Algorithm tag as written in the artifact
    pub fn algo(&self) -> &str {
        match self {
            ModelArtifact::Isolation(_) => TAG_ISOLATION_FOREST,
            ModelArtifact::RobustZ(_) => TAG_ROBUST_Z,
            ModelArtifact::Unknown { tag, .. } => tag.as_deref().unwrap_or("unknown"),
        }
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn pick_cols(top: Vec<String>, nested: Vec<String>) -> Vec<String> {
    if top.is_empty() {
        nested
    } else {
        top
    }
}
