//! Model loading + scoring tests

use std::collections::HashMap;
use std::fs;
use std::time::Duration;

use serde_json::json;

use crate::logic::features::{flatten_value, METRIC_LAYOUT};
use super::artifact::{ModelArtifact, RobustZModel, IsolationModel};
use super::isolation::{IsolationForest, IsolationTree, TreeNode};
use super::scorer::{score_record, NoScoreReason};
use super::store::ModelStore;

// ============================================================================
// FIXTURES
// ============================================================================

fn cols(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn robust_z_x() -> ModelArtifact {
    ModelArtifact::RobustZ(RobustZModel {
        median: HashMap::from([("x".to_string(), 10.0)]),
        mad: HashMap::from([("x".to_string(), 2.0)]),
        k: 6.0,
        cols: cols(&["x"]),
    })
}

/// Every tree splits on eCO2 at 2000 ppm: readings above are isolated at depth 1.
fn eco2_forest(model_cols: Vec<String>) -> ModelArtifact {
    let eco2 = model_cols
        .iter()
        .position(|c| c == "metrics.eco2_ppm")
        .expect("fixture needs eco2 column");
    let tree = IsolationTree {
        nodes: vec![
            TreeNode::Split { feature: eco2, threshold: 2000.0, left: 1, right: 2 },
            TreeNode::Leaf { size: 255 },
            TreeNode::Leaf { size: 1 },
        ],
    };
    ModelArtifact::Isolation(IsolationModel {
        clf: IsolationForest {
            trees: vec![tree; 10],
            max_samples: 256,
            offset: -0.5,
            n_features: model_cols.len(),
        },
        cols: model_cols,
    })
}

// ============================================================================
// ARTIFACT DECODING
// ============================================================================

#[test]
fn test_decode_robust_z_json_with_nested_cols() {
    let doc = json!({
        "model": "RobustZ",
        "params": {
            "median": {"metrics.eco2_ppm": 600.0},
            "mad": {"metrics.eco2_ppm": 40.0},
            "k": 4.5,
            "cols": ["metrics.eco2_ppm"]
        }
    });
    let artifact = ModelArtifact::decode(doc.to_string().as_bytes()).unwrap();

    match &artifact {
        ModelArtifact::RobustZ(m) => {
            assert_eq!(m.k, 4.5);
            assert_eq!(m.median["metrics.eco2_ppm"], 600.0);
        }
        other => panic!("expected RobustZ, got {:?}", other),
    }
    assert_eq!(artifact.cols(), &cols(&["metrics.eco2_ppm"])[..]);
    assert_eq!(artifact.algo(), "RobustZ");
}

#[test]
fn test_decode_robust_z_defaults_k_and_prefers_top_level_cols() {
    let doc = json!({
        "model": "RobustZ",
        "cols": ["a", "b"],
        "params": {"median": {}, "mad": {}, "cols": ["ignored"]}
    });
    let artifact = ModelArtifact::decode(doc.to_string().as_bytes()).unwrap();

    let ModelArtifact::RobustZ(m) = &artifact else { panic!("expected RobustZ") };
    assert_eq!(m.k, 6.0);
    assert_eq!(m.cols, cols(&["a", "b"]));
}

#[test]
fn test_decode_isolation_msgpack() {
    let original = eco2_forest(cols(METRIC_LAYOUT));
    let bytes = original.to_msgpack().unwrap();

    let decoded = ModelArtifact::decode(&bytes).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_decode_isolation_json_fallback() {
    let original = eco2_forest(cols(METRIC_LAYOUT));
    let text = original.to_value().to_string();

    let decoded = ModelArtifact::decode(text.as_bytes()).unwrap();
    assert_eq!(decoded, original);
}

#[test]
fn test_decode_unknown_tag() {
    let doc = json!({"model": "OneClassSVM", "cols": ["x"]});
    let artifact = ModelArtifact::decode(doc.to_string().as_bytes()).unwrap();
    assert_eq!(
        artifact,
        ModelArtifact::Unknown { tag: Some("OneClassSVM".to_string()), cols: cols(&["x"]) }
    );
}

#[test]
fn test_decode_rejects_garbage() {
    assert!(ModelArtifact::decode(b"\xc1\xc1 not a model").is_err());
    assert!(ModelArtifact::decode(b"[1, 2, 3]").is_err());
}

#[test]
fn test_decode_isolation_missing_clf() {
    let doc = json!({"model": "IsolationForest", "cols": ["x"]});
    assert!(ModelArtifact::decode(doc.to_string().as_bytes()).is_err());
}

// ============================================================================
// SCORING
// ============================================================================

#[test]
fn test_robust_z_at_median_is_normal() {
    let flat = flatten_value(&json!({"x": 10}));
    let result = score_record(&flat, Some(&robust_z_x()));

    assert_eq!(result.score, Some(0.0));
    assert!(!result.is_anomaly);
    assert_eq!(result.anomaly_prob, None);
}

#[test]
fn test_robust_z_far_value_is_anomaly() {
    let flat = flatten_value(&json!({"x": 100}));
    let result = score_record(&flat, Some(&robust_z_x()));

    let z = result.score.unwrap();
    assert!((z - 90.0 / (1.4826 * 2.0)).abs() < 1e-9);
    assert!((z - 30.36).abs() < 0.01);
    assert!(result.is_anomaly);
    assert_eq!(result.details.algo.as_deref(), Some("RobustZ"));
    assert_eq!(result.details.feature.as_deref(), Some("x"));
    assert_eq!(result.details.k, Some(6.0));
}

#[test]
fn test_robust_z_is_deterministic() {
    let flat = flatten_value(&json!({"x": 37.5}));
    let model = robust_z_x();
    assert_eq!(score_record(&flat, Some(&model)), score_record(&flat, Some(&model)));
}

#[test]
fn test_robust_z_threshold_is_inclusive() {
    // z == k exactly → anomaly
    let k = 2.0 / (1.4826 * 1.0);
    let model = ModelArtifact::RobustZ(RobustZModel {
        median: HashMap::from([("x".to_string(), 0.0)]),
        mad: HashMap::from([("x".to_string(), 1.0)]),
        k,
        cols: cols(&["x"]),
    });
    let flat = flatten_value(&json!({"x": 2.0}));
    let result = score_record(&flat, Some(&model));
    assert_eq!(result.score, Some(k));
    assert!(result.is_anomaly);
}

#[test]
fn test_robust_z_missing_value_masks_feature() {
    // Absent reading scores z = 0 and never alerts by itself
    let flat = flatten_value(&json!({"y": 1}));
    let result = score_record(&flat, Some(&robust_z_x()));
    assert_eq!(result.score, Some(0.0));
    assert!(!result.is_anomaly);
}

#[test]
fn test_robust_z_missing_pressure_still_scores() {
    let model_cols = cols(METRIC_LAYOUT);
    let median = model_cols.iter().map(|c| (c.clone(), 100.0)).collect();
    let mad = model_cols.iter().map(|c| (c.clone(), 10.0)).collect();
    let model = ModelArtifact::RobustZ(RobustZModel { median, mad, k: 6.0, cols: model_cols });

    let flat = flatten_value(&json!({
        "metrics": {"ambient_temp_c": 100, "ambient_rh_pct": 100, "eco2_ppm": 100, "tvoc_ppb": 100}
    }));
    let result = score_record(&flat, Some(&model));
    assert_eq!(result.score, Some(0.0));
    assert!(result.details.error.is_none());
}

#[test]
fn test_no_model() {
    let flat = flatten_value(&json!({"x": 1}));
    let result = score_record(&flat, None);

    assert_eq!(result.score, None);
    assert!(!result.is_anomaly);
    assert_eq!(result.details.reason, Some(NoScoreReason::NoModel));
}

#[test]
fn test_no_feature_cols() {
    let model = ModelArtifact::RobustZ(RobustZModel {
        median: HashMap::new(),
        mad: HashMap::new(),
        k: 6.0,
        cols: vec![],
    });
    let result = score_record(&flatten_value(&json!({"x": 1})), Some(&model));
    assert_eq!(result.score, None);
    assert_eq!(result.details.reason, Some(NoScoreReason::NoFeatureCols));
}

#[test]
fn test_unknown_model_type() {
    let model = ModelArtifact::Unknown { tag: Some("Mystery".to_string()), cols: cols(&["x"]) };
    let result = score_record(&flatten_value(&json!({"x": 1})), Some(&model));
    assert_eq!(result.score, None);
    assert!(!result.is_anomaly);
    assert_eq!(result.details.reason, Some(NoScoreReason::UnknownModelType));
}

#[test]
fn test_isolation_flags_gas_spike() {
    let model = eco2_forest(cols(METRIC_LAYOUT));
    let flat = flatten_value(&json!({
        "metrics": {
            "ambient_temp_c": 21.0, "ambient_rh_pct": 40.0, "pressure_hpa": 835.0,
            "eco2_ppm": 4200.0, "tvoc_ppb": 80.0
        }
    }));

    let result = score_record(&flat, Some(&model));
    let raw = result.score.unwrap();
    let prob = result.anomaly_prob.unwrap();
    assert!(raw < 0.0);
    assert!((prob - 1.0 / (1.0 + (5.0 * raw).exp())).abs() < 1e-12);
    assert!(prob > 0.6);
    assert!(result.is_anomaly);
    assert_eq!(result.details.algo.as_deref(), Some("IsolationForest"));
}

#[test]
fn test_isolation_normal_reading() {
    let model = eco2_forest(cols(METRIC_LAYOUT));
    let flat = flatten_value(&json!({
        "metrics": {
            "ambient_temp_c": 21.0, "ambient_rh_pct": 40.0, "pressure_hpa": 835.0,
            "eco2_ppm": 650.0, "tvoc_ppb": 80.0
        }
    }));

    let result = score_record(&flat, Some(&model));
    assert!(result.score.unwrap() > 0.0);
    assert!(!result.is_anomaly);
}

#[test]
fn test_isolation_missing_feature_is_caught() {
    let model = eco2_forest(cols(METRIC_LAYOUT));
    let flat = flatten_value(&json!({"metrics": {"eco2_ppm": 650.0}}));

    let result = score_record(&flat, Some(&model));
    assert_eq!(result.score, None);
    assert!(!result.is_anomaly);
    assert!(result.details.error.as_deref().unwrap().contains("NaN"));
}

#[test]
fn test_isolation_shape_mismatch_is_caught() {
    let mut model = eco2_forest(cols(METRIC_LAYOUT));
    if let ModelArtifact::Isolation(m) = &mut model {
        m.clf.n_features = 3;
    }
    let flat = flatten_value(&json!({
        "metrics": {
            "ambient_temp_c": 21.0, "ambient_rh_pct": 40.0, "pressure_hpa": 835.0,
            "eco2_ppm": 650.0, "tvoc_ppb": 80.0
        }
    }));

    let result = score_record(&flat, Some(&model));
    assert_eq!(result.score, None);
    assert!(result.details.error.as_deref().unwrap().contains("expecting 3 features"));
}

// ============================================================================
// STORE
// ============================================================================

fn robust_z_doc(k: f64) -> String {
    json!({
        "model": "RobustZ",
        "params": {"median": {"x": 10.0}, "mad": {"x": 2.0}, "k": k, "cols": ["x"]}
    })
    .to_string()
}

#[test]
fn test_store_absent_file_is_no_model() {
    let dir = tempfile::tempdir().unwrap();
    let store = ModelStore::new(dir.path().join("model.bin"), Duration::ZERO);

    assert!(store.load().is_none());
    let status = store.status();
    assert!(!status.loaded);
    assert!(status.checksum.is_none());
}

#[test]
fn test_store_loads_json_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    fs::write(&path, robust_z_doc(6.0)).unwrap();

    let store = ModelStore::new(&path, Duration::ZERO);
    let model = store.load().unwrap();
    assert_eq!(model.algo(), "RobustZ");

    let status = store.status();
    assert!(status.loaded);
    assert_eq!(status.cols, vec!["x".to_string()]);
    assert_eq!(status.checksum.unwrap().len(), 64);
}

#[test]
fn test_store_loads_msgpack_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    let artifact = eco2_forest(cols(METRIC_LAYOUT));
    fs::write(&path, artifact.to_msgpack().unwrap()).unwrap();

    let store = ModelStore::new(&path, Duration::from_secs(60));
    assert_eq!(*store.load().unwrap(), artifact);
}

#[test]
fn test_store_picks_up_replaced_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    fs::write(&path, robust_z_doc(6.0)).unwrap();

    let store = ModelStore::new(&path, Duration::ZERO);
    let first = store.load().unwrap();

    // Different length guarantees a different identity even within one mtime tick
    fs::write(&path, robust_z_doc(12.25)).unwrap();
    let second = store.load().unwrap();

    let (ModelArtifact::RobustZ(a), ModelArtifact::RobustZ(b)) = (&*first, &*second) else {
        panic!("expected RobustZ models");
    };
    assert_eq!(a.k, 6.0);
    assert_eq!(b.k, 12.25);
}

#[test]
fn test_store_serves_cached_model_within_ttl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    fs::write(&path, robust_z_doc(6.0)).unwrap();

    let store = ModelStore::new(&path, Duration::from_secs(3600));
    assert!(store.load().is_some());

    fs::remove_file(&path).unwrap();
    assert!(store.load().is_some(), "cached model should survive within TTL");

    // Forced reload sees the deletion
    assert!(store.reload().is_none());
}

#[test]
fn test_store_undecodable_file_is_no_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    fs::write(&path, b"\xc1 definitely not a model").unwrap();

    let store = ModelStore::new(&path, Duration::ZERO);
    assert!(store.load().is_none());
    assert!(!store.status().loaded);
}

#[test]
fn test_store_shared_between_threads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("model.bin");
    fs::write(&path, robust_z_doc(6.0)).unwrap();

    let store = std::sync::Arc::new(ModelStore::new(&path, Duration::ZERO));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = store.clone();
            std::thread::spawn(move || store.load().map(|m| m.cols().len()))
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), Some(1));
    }
}
