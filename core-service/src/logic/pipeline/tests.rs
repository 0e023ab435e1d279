//! End-to-end ingest tests against a temp data directory

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tempfile::TempDir;

use super::*;
use crate::logic::alert::Severity;
use crate::logic::features::METRIC_LAYOUT;
use crate::logic::model::{IsolationForest, IsolationModel, IsolationTree, ModelArtifact, TreeNode};
use crate::logic::telemetry::read_tail;

// ============================================================================
// FIXTURES
// ============================================================================

fn open(dir: &TempDir) -> Pipeline {
    let config = PipelineConfig::in_dir(dir.path()).with_model_cache_ttl(Duration::ZERO);
    Pipeline::open(config).unwrap()
}

fn reading(eco2: f64) -> TelemetryRecord {
    TelemetryRecord::from_value(json!({
        "device_id": "m5-03",
        "site_id": "LS-1",
        "ts": 1_700_000_000.0,
        "metrics": {
            "ambient_temp_c": 23.1,
            "ambient_rh_pct": 40.0,
            "pressure_hpa": 835.2,
            "eco2_ppm": eco2,
            "tvoc_ppb": 60.0
        }
    }))
    .unwrap()
}

/// Median/MAD for every standard metric; eCO2 centred on 600 ± 40
fn write_robust_z(path: &Path) {
    let doc = json!({
        "model": "RobustZ",
        "params": {
            "median": {
                "metrics.ambient_temp_c": 23.0, "metrics.ambient_rh_pct": 40.0,
                "metrics.pressure_hpa": 835.0, "metrics.eco2_ppm": 600.0, "metrics.tvoc_ppb": 60.0
            },
            "mad": {
                "metrics.ambient_temp_c": 1.0, "metrics.ambient_rh_pct": 5.0,
                "metrics.pressure_hpa": 2.0, "metrics.eco2_ppm": 40.0, "metrics.tvoc_ppb": 10.0
            },
            "k": 6.0,
            "cols": METRIC_LAYOUT
        }
    });
    fs::write(path, doc.to_string()).unwrap();
}

fn write_isolation_msgpack(path: &Path) {
    let cols: Vec<String> = METRIC_LAYOUT.iter().map(|s| s.to_string()).collect();
    let eco2 = cols.iter().position(|c| c == "metrics.eco2_ppm").unwrap();
    let tree = IsolationTree {
        nodes: vec![
            TreeNode::Split { feature: eco2, threshold: 2000.0, left: 1, right: 2 },
            TreeNode::Leaf { size: 255 },
            TreeNode::Leaf { size: 1 },
        ],
    };
    let artifact = ModelArtifact::Isolation(IsolationModel {
        clf: IsolationForest {
            trees: vec![tree; 10],
            max_samples: 256,
            offset: -0.5,
            n_features: cols.len(),
        },
        cols,
    });
    fs::write(path, artifact.to_msgpack().unwrap()).unwrap();
}

fn alert_lines(pipeline: &Pipeline) -> Vec<Value> {
    read_tail(&pipeline.config().alerts_file, 1000).unwrap()
}

// ============================================================================
// NO MODEL
// ============================================================================

#[test]
fn test_no_model_normal_reading_is_quiet() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    let eval = pipeline.ingest(&reading(640.0)).unwrap();

    assert_eq!(eval.score.score, None);
    assert!(!eval.score.is_anomaly);
    assert!(eval.rule_alerts.is_empty());
    assert!(!eval.alerted());
    assert!(alert_lines(&pipeline).is_empty());
}

#[test]
fn test_no_model_still_raises_rule_alerts() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    let eval = pipeline.ingest(&reading(2500.0)).unwrap();
    let alert = eval.alert.unwrap();

    assert_eq!(alert.details.algo, "none+Rules");
    assert_eq!(alert.details.rule_alerts, vec!["eCO2 high: 2500 ppm (>= 2000)".to_string()]);
    assert_eq!(alert.severity, Severity::High);
    assert_eq!(alert.score, None);
    assert_eq!(alert_lines(&pipeline).len(), 1);
}

// ============================================================================
// WITH MODEL
// ============================================================================

#[test]
fn test_robust_z_anomaly_without_rules() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);
    write_robust_z(&pipeline.config().model_path);

    // 1500 ppm: far from the median, still under the safety ceiling
    let eval = pipeline.ingest(&reading(1500.0)).unwrap();
    let alert = eval.alert.clone().unwrap();

    assert!(eval.score.is_anomaly);
    assert!(eval.rule_alerts.is_empty());
    assert_eq!(alert.details.algo, "RobustZ");
    assert_eq!(alert.severity, Severity::Medium);
    assert_eq!(eval.score.details.feature.as_deref(), Some("metrics.eco2_ppm"));
    assert_eq!(alert.sample.len(), 5);
}

#[test]
fn test_robust_z_normal_reading() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);
    write_robust_z(&pipeline.config().model_path);

    let eval = pipeline.ingest(&reading(620.0)).unwrap();
    assert!(eval.score.score.unwrap() < 6.0);
    assert!(!eval.alerted());
}

#[test]
fn test_model_and_rules_combine() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);
    write_robust_z(&pipeline.config().model_path);

    let alert = pipeline.ingest(&reading(2500.0)).unwrap().alert.unwrap();

    assert_eq!(alert.details.algo, "RobustZ+Rules");
    assert_eq!(alert.severity, Severity::Critical);
    assert!(alert.details.is_anomaly);
}

#[test]
fn test_isolation_forest_msgpack_artifact() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);
    write_isolation_msgpack(&pipeline.config().model_path);

    let eval = pipeline.ingest(&reading(4200.0)).unwrap();
    let prob = eval.score.anomaly_prob.unwrap();
    assert!(prob > 0.6, "prob = {}", prob);

    let alert = eval.alert.unwrap();
    assert_eq!(alert.details.algo, "IsolationForest+Rules");
    assert_eq!(alert.details.anomaly_prob, Some(prob));

    let status = pipeline.model_status();
    assert!(status.loaded);
    assert_eq!(status.algo.as_deref(), Some("IsolationForest"));
    assert_eq!(status.checksum.map(|c| c.len()), Some(64));
}

#[test]
fn test_model_appears_without_restart() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    assert_eq!(pipeline.ingest(&reading(1500.0)).unwrap().score.score, None);

    write_robust_z(&pipeline.config().model_path);
    assert!(pipeline.ingest(&reading(1500.0)).unwrap().score.is_anomaly);
}

#[test]
fn test_reload_model_reports_status() {
    let dir = TempDir::new().unwrap();
    let config = PipelineConfig::in_dir(dir.path()).with_model_cache_ttl(Duration::from_secs(3600));
    let pipeline = Pipeline::open(config).unwrap();

    assert!(!pipeline.model_status().loaded);

    write_robust_z(&pipeline.config().model_path);
    let status = pipeline.reload_model();
    assert!(status.loaded);
    assert_eq!(status.algo.as_deref(), Some("RobustZ"));
    assert_eq!(status.cols.len(), 5);
}

#[test]
fn test_missing_metric_is_not_fabricated() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    let record = TelemetryRecord::from_value(json!({
        "device_id": "m5-09",
        "ts": 1_700_000_000.0,
        "metrics": {"ambient_temp_c": 22.0, "eco2_ppm": 2600.0}
    }))
    .unwrap();
    let alert = pipeline.ingest(&record).unwrap().alert.unwrap();

    let line = &alert_lines(&pipeline)[0];
    assert!(line["sample"].get("pressure_hpa").is_none());
    assert_eq!(line["sample"]["eco2_ppm"], json!(2600.0));
    assert_eq!(alert.sample.len(), 2);
}

// ============================================================================
// LOGS
// ============================================================================

#[test]
fn test_telemetry_logged_verbatim() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    let body = br#"{"ts":1700000000.5,"device_id":"m5-03","metrics":{"eco2_ppm":640},"fw":"1.4.2"}"#;
    pipeline.ingest(&TelemetryRecord::from_slice(body).unwrap()).unwrap();

    let content = fs::read_to_string(&pipeline.config().telemetry_file).unwrap();
    assert_eq!(content, format!("{}\n", std::str::from_utf8(body).unwrap()));
}

#[test]
fn test_telemetry_keeps_number_text() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    let body = "{\n  \"device_id\": \"m5-03\",\n  \"counter\": 123456789012345678901234567890,\n  \"metrics\": {\"eco2_ppm\": 6.40e2, \"tvoc_ppb\": 55.0}\n}\n";
    pipeline.ingest(&TelemetryRecord::from_slice(body.as_bytes()).unwrap()).unwrap();

    let content = fs::read_to_string(&pipeline.config().telemetry_file).unwrap();
    assert_eq!(
        content,
        "{   \"device_id\": \"m5-03\",   \"counter\": 123456789012345678901234567890,   \"metrics\": {\"eco2_ppm\": 6.40e2, \"tvoc_ppb\": 55.0} }\n"
    );
    assert_eq!(content.lines().count(), 1);
}

#[test]
fn test_evaluate_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    let eval = pipeline.evaluate(&reading(2500.0));
    assert!(eval.alerted());

    assert!(fs::read_to_string(&pipeline.config().telemetry_file).unwrap().is_empty());
    assert!(alert_lines(&pipeline).is_empty());
}

#[test]
fn test_recent_alerts_newest_last() {
    let dir = TempDir::new().unwrap();
    let pipeline = open(&dir);

    for eco2 in [2100.0, 2200.0, 640.0, 2300.0, 2400.0] {
        pipeline.ingest(&reading(eco2)).unwrap();
    }

    let recent = pipeline.recent_alerts(2).unwrap();
    let values: Vec<f64> = recent.iter().map(|a| a.sample["eco2_ppm"]).collect();
    assert_eq!(values, vec![2300.0, 2400.0]);
    assert_eq!(pipeline.recent_alerts(100).unwrap().len(), 4);
}

#[cfg(target_os = "linux")]
#[test]
fn test_storage_failure_reaches_caller() {
    let full = Path::new("/dev/full");
    if !full.exists() {
        return;
    }
    let dir = TempDir::new().unwrap();
    let mut config = PipelineConfig::in_dir(dir.path());
    config.telemetry_file = full.to_path_buf();
    let pipeline = Pipeline::open(config).unwrap();

    let err = pipeline.ingest(&reading(640.0)).unwrap_err();
    assert!(matches!(err, StoreError::Append { .. }));
}
