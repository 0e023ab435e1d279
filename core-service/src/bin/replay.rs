//! gasguard-replay - Re-evaluate recorded telemetry offline.
//!
//! Reads the telemetry JSONL, scores every record with the current model and
//! safety rules, and prints what would have been alerted. Never writes to
//! either log.
//!
//! Usage:
//!   gasguard-replay --telemetry data/telemetry.jsonl --model data/model.bin
//!   gasguard-replay --limit 500 --print-alerts

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::Value;

use gasguard_core::logic::telemetry::read_tail;
use gasguard_core::{Evaluator, PipelineConfig, Severity, TelemetryRecord};

/// Replay recorded telemetry through the scoring pipeline.
#[derive(Parser)]
#[command(name = "gasguard-replay", version)]
struct Args {
    /// Telemetry log to replay [default: <data dir>/telemetry.jsonl]
    #[arg(long)]
    telemetry: Option<PathBuf>,

    /// Model artifact [default: <data dir>/model.bin]
    #[arg(long, env = "GASGUARD_MODEL_PATH")]
    model: Option<PathBuf>,

    /// Print every would-be alert as one JSON line
    #[arg(long)]
    print_alerts: bool,

    /// Only replay the last N records
    #[arg(long)]
    limit: Option<usize>,
}

#[derive(Default)]
struct Summary {
    records: usize,
    skipped: usize,
    scored: usize,
    anomalies: usize,
    rule_hits: usize,
    alerts: BTreeMap<Severity, usize>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env();
    if let Some(model) = args.model {
        config = config.with_model_path(model);
    }
    let telemetry = args.telemetry.unwrap_or_else(|| config.telemetry_file.clone());

    let lines: Vec<Value> = read_tail(&telemetry, args.limit.unwrap_or(usize::MAX))
        .with_context(|| format!("failed to read telemetry log: {}", telemetry.display()))?;

    let evaluator = Evaluator::new(&config);
    let status = evaluator.model_status();
    log::info!(
        "Replaying {} record(s) from {:?} (model: {})",
        lines.len(),
        telemetry,
        status.algo.as_deref().unwrap_or("none")
    );

    let mut summary = Summary::default();

    for line in lines {
        let record = match TelemetryRecord::from_value(line) {
            Ok(record) => record,
            Err(e) => {
                log::warn!("Skipping record: {}", e);
                summary.skipped += 1;
                continue;
            }
        };
        summary.records += 1;

        let eval = evaluator.evaluate(&record);
        if eval.score.score.is_some() {
            summary.scored += 1;
        }
        if eval.score.is_anomaly {
            summary.anomalies += 1;
        }
        if !eval.rule_alerts.is_empty() {
            summary.rule_hits += 1;
        }

        if let Some(alert) = eval.alert {
            *summary.alerts.entry(alert.severity).or_default() += 1;
            if args.print_alerts {
                println!("{}", serde_json::to_string(&alert)?);
            }
        }
    }

    print_summary(&summary, status.algo.as_deref());
    Ok(())
}

fn print_summary(summary: &Summary, algo: Option<&str>) {
    let total: usize = summary.alerts.values().sum();

    eprintln!("model:      {}", algo.unwrap_or("none"));
    eprintln!("records:    {}", summary.records);
    if summary.skipped > 0 {
        eprintln!("skipped:    {}", summary.skipped);
    }
    eprintln!("scored:     {}", summary.scored);
    eprintln!("anomalies:  {}", summary.anomalies);
    eprintln!("rule hits:  {}", summary.rule_hits);
    eprintln!("alerts:     {}", total);
    for (severity, count) in summary.alerts.iter().rev() {
        eprintln!("  {:<9} {}", severity.as_str(), count);
    }
}
