//! Reporting and export: CSV summaries, equity curves and a JSON manifest.
//!
//! A sweep writes, under its output directory:
//! - `grid_summary.csv`: one row per pair × grid point
//! - `curves/{pair}_{run_id}.csv`: cumulative P&L per combination
//! - `manifest.json`: config, pair provenance and every summary record
//!
//! Undefined metric values are written as empty CSV cells and JSON `null`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{NaiveDateTime, Utc};
use pairlab_core::data::{DataSource, ParquetCache};
use pairlab_core::domain::PairTrade;
use pairlab_core::engine::BacktestTrace;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::SweepConfig;
use crate::data_loader::LoadedPair;
use crate::metrics::MetricKind;
use crate::sweep::{SweepRecord, SweepResults};

/// Current schema version for persisted manifests.
pub const SCHEMA_VERSION: u32 = 1;

const STATIC_COLUMNS: [&str; 7] = ["pair", "entry_z", "exit_z", "window", "abs_floor", "stop_loss", "synthetic"];

fn fmt_opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.6}")).unwrap_or_default()
}

/// File-system safe name for a pair label.
fn pair_slug(pair: &str) -> String {
    pair.split('/').map(ParquetCache::sanitize_symbol).collect::<Vec<_>>().join("_")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Summary table; metric columns follow the first record's metric order.
pub fn export_summary_csv(records: &[SweepRecord]) -> Result<String> {
    let metric_names: Vec<String> = match records.first() {
        Some(r) => r.metrics.names().map(str::to_string).collect(),
        None => MetricKind::ALL.iter().map(|k| k.name().to_string()).collect(),
    };

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header: Vec<String> = STATIC_COLUMNS.iter().map(|c| c.to_string()).collect();
    header.extend(metric_names.iter().cloned());
    header.extend(["adf_statistic", "adf_p_value", "trade_count", "bars", "run_id"].map(String::from));
    wtr.write_record(&header)?;

    for r in records {
        let mut row = vec![
            r.pair.clone(),
            r.params.signal.entry_z.to_string(),
            r.params.signal.exit_z.to_string(),
            r.params.window.to_string(),
            r.params.signal.abs_floor.to_string(),
            r.stop_loss.to_string(),
            r.is_synthetic.to_string(),
        ];
        row.extend(metric_names.iter().map(|name| fmt_opt(r.metrics.get(name))));
        row.push(fmt_opt(r.adf_statistic));
        row.push(fmt_opt(r.adf_p_value));
        row.push(r.trade_count.to_string());
        row.push(r.bar_count.to_string());
        row.push(r.run_id.clone());
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Equity curve of one combination: timestamp, cum_pnl, state.
pub fn export_curve_csv(record: &SweepRecord) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["timestamp", "cum_pnl", "state"])?;
    for p in &record.curve {
        wtr.write_record([p.timestamp.to_string(), format!("{:.6}", p.cum_pnl), p.state.to_string()])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Full per-bar trace of a single run.
pub fn export_trace_csv(trace: &BacktestTrace) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "timestamp",
        trace.symbol_a.as_str(),
        trace.symbol_b.as_str(),
        "state",
        "size_a",
        "size_b",
        "pnl",
        "cum_pnl",
        "exit",
    ])?;
    for r in trace {
        wtr.write_record([
            r.timestamp.to_string(),
            format!("{:.6}", r.price_a),
            format!("{:.6}", r.price_b),
            r.state.to_string(),
            format!("{:.6}", r.size_a),
            format!("{:.6}", r.size_b),
            format!("{:.6}", r.pnl),
            format!("{:.6}", r.cum_pnl),
            r.exit.map(|e| e.to_string()).unwrap_or_default(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Round-trip trade list.
pub fn export_trades_csv(trades: &[PairTrade]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "direction",
        "entry_index",
        "entry_time",
        "entry_price_a",
        "entry_price_b",
        "exit_index",
        "exit_time",
        "exit_price_a",
        "exit_price_b",
        "size_a",
        "size_b",
        "pnl",
        "bars_held",
        "exit_reason",
    ])?;
    for t in trades {
        wtr.write_record([
            t.direction.to_string(),
            t.entry_index.to_string(),
            t.entry_time.to_string(),
            format!("{:.6}", t.entry_price_a),
            format!("{:.6}", t.entry_price_b),
            t.exit_index.to_string(),
            t.exit_time.to_string(),
            format!("{:.6}", t.exit_price_a),
            format!("{:.6}", t.exit_price_b),
            format!("{:.6}", t.size_a),
            format!("{:.6}", t.size_b),
            format!("{:.6}", t.pnl),
            t.bars_held.to_string(),
            t.exit_reason.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Curve file name for a record: `{pair}_{first 12 hex of run_id}.csv`.
pub fn curve_file_name(record: &SweepRecord) -> String {
    let id = record.run_id.get(..12).unwrap_or(&record.run_id);
    format!("{}_{}.csv", pair_slug(&record.pair), id)
}

// ─── JSON manifest ──────────────────────────────────────────────────

/// Provenance of one swept pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairProvenance {
    pub pair: String,
    pub sources: [DataSource; 2],
    pub dataset_hash: String,
    pub bars: usize,
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub is_synthetic: bool,
    pub hedge_ratio: Option<f64>,
    pub adf_statistic: Option<f64>,
    pub adf_p_value: Option<f64>,
}

impl PairProvenance {
    pub fn from_loaded(pair: &LoadedPair) -> Self {
        Self {
            pair: pair.spec.label(),
            sources: pair.sources,
            dataset_hash: pair.dataset_hash.clone(),
            bars: pair.series.len(),
            start: pair.series.timestamps.first().copied(),
            end: pair.series.timestamps.last().copied(),
            is_synthetic: pair.is_synthetic,
            hedge_ratio: pair.cointegration.as_ref().map(|c| c.hedge_ratio),
            adf_statistic: pair.adf_statistic(),
            adf_p_value: pair.adf_p_value(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepManifest {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub created_at: NaiveDateTime,
    pub config: SweepConfig,
    pub pairs: Vec<PairProvenance>,
    pub records: Vec<SweepRecord>,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

pub fn export_manifest_json(manifest: &SweepManifest) -> Result<String> {
    serde_json::to_string_pretty(manifest).context("failed to serialize sweep manifest to JSON")
}

/// Deserialize a manifest, rejecting unknown schema versions.
pub fn import_manifest_json(json: &str) -> Result<SweepManifest> {
    let manifest: SweepManifest = serde_json::from_str(json).context("failed to deserialize sweep manifest")?;
    if manifest.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            manifest.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(manifest)
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for a sweep under `output_dir`.
///
/// Returns the path of the summary CSV.
pub fn save_sweep_artifacts(
    results: &SweepResults,
    pairs: &[LoadedPair],
    config: &SweepConfig,
    output_dir: &Path,
) -> Result<PathBuf> {
    let curves_dir = output_dir.join("curves");
    fs::create_dir_all(&curves_dir).with_context(|| format!("failed to create {}", curves_dir.display()))?;

    let summary_path = output_dir.join("grid_summary.csv");
    fs::write(&summary_path, export_summary_csv(results.all())?)
        .with_context(|| format!("failed to write {}", summary_path.display()))?;

    for record in results.all() {
        let path = curves_dir.join(curve_file_name(record));
        fs::write(&path, export_curve_csv(record)?).with_context(|| format!("failed to write {}", path.display()))?;
    }

    let manifest = SweepManifest {
        schema_version: SCHEMA_VERSION,
        created_at: Utc::now().naive_utc(),
        config: config.clone(),
        pairs: pairs.iter().map(PairProvenance::from_loaded).collect(),
        records: results.records.clone(),
    };
    let manifest_path = output_dir.join("manifest.json");
    fs::write(&manifest_path, export_manifest_json(&manifest)?)
        .with_context(|| format!("failed to write {}", manifest_path.display()))?;

    info!(
        dir = %output_dir.display(),
        rows = results.len(),
        "sweep artifacts saved"
    );
    Ok(summary_path)
}

/// Save a single run's trace and trades as `{pair}_{run_id}_trace.csv` and
/// `{pair}_{run_id}_trades.csv`. Returns the trace path.
pub fn save_run_artifacts(trace: &BacktestTrace, trades: &[PairTrade], run_id: &str, output_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(output_dir).with_context(|| format!("failed to create {}", output_dir.display()))?;
    let stem = format!(
        "{}_{}",
        pair_slug(&format!("{}/{}", trace.symbol_a, trace.symbol_b)),
        run_id.get(..12).unwrap_or(run_id)
    );
    let trace_path = output_dir.join(format!("{stem}_trace.csv"));
    fs::write(&trace_path, export_trace_csv(trace)?).with_context(|| format!("failed to write {}", trace_path.display()))?;
    let trades_path = output_dir.join(format!("{stem}_trades.csv"));
    fs::write(&trades_path, export_trades_csv(trades)?)
        .with_context(|| format!("failed to write {}", trades_path.display()))?;
    Ok(trace_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::compute_metrics;
    use crate::runner::StrategyParams;
    use crate::sweep::CurvePoint;
    use chrono::NaiveDate;
    use pairlab_core::domain::SpreadState;

    fn ts(day: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn record() -> SweepRecord {
        let metrics = compute_metrics(&BacktestTrace::default(), Some(&["sharpe_total", "pct_time_in_market"][..])).unwrap();
        SweepRecord {
            pair: "BTC/USDT".into(),
            run_id: "abcdef0123456789".into(),
            params: StrategyParams::default(),
            stop_loss: 0.05,
            metrics,
            adf_statistic: Some(-3.5),
            adf_p_value: None,
            trade_count: 2,
            bar_count: 2,
            is_synthetic: false,
            curve: vec![
                CurvePoint {
                    timestamp: ts(1),
                    cum_pnl: 0.0,
                    state: SpreadState::Flat,
                },
                CurvePoint {
                    timestamp: ts(2),
                    cum_pnl: 1.5,
                    state: SpreadState::LongSpread,
                },
            ],
        }
    }

    #[test]
    fn summary_leaves_undefined_cells_empty() {
        let csv = export_summary_csv(&[record()]).unwrap();
        let mut lines = csv.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("pair,entry_z,exit_z,window,abs_floor,stop_loss,synthetic,sharpe_total,pct_time_in_market"));
        assert!(header.ends_with("adf_statistic,adf_p_value,trade_count,bars,run_id"));
        let row = lines.next().unwrap();
        // Both metrics are undefined on an empty trace; the p-value is missing.
        assert!(row.starts_with("BTC/USDT,2.5,0.05,50,0,0.05,false,,,-3.500000,,2,2,"));
    }

    #[test]
    fn empty_summary_has_full_header() {
        let csv = export_summary_csv(&[]).unwrap();
        assert_eq!(csv.lines().count(), 1);
        assert!(csv.contains("max_dd_50_50"));
    }

    #[test]
    fn curve_csv_and_name() {
        let r = record();
        let csv = export_curve_csv(&r).unwrap();
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.contains("2024-01-02 00:00:00,1.500000,long"));
        assert_eq!(curve_file_name(&r), "BTC_USDT_abcdef012345.csv");
    }

    #[test]
    fn manifest_roundtrip_and_version_guard() {
        let manifest = SweepManifest {
            schema_version: SCHEMA_VERSION,
            created_at: ts(3),
            config: SweepConfig::default(),
            pairs: vec![],
            records: vec![record()],
        };
        let json = export_manifest_json(&manifest).unwrap();
        let back = import_manifest_json(&json).unwrap();
        assert_eq!(back.records.len(), 1);
        assert_eq!(back.records[0].metrics, manifest.records[0].metrics);
        assert!(back.records[0].curve.is_empty());

        let future = json.replacen("\"schema_version\": 1", "\"schema_version\": 99", 1);
        assert!(import_manifest_json(&future).is_err());
    }

    #[test]
    fn saves_bundle_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let results = SweepResults { records: vec![record()] };
        let summary = save_sweep_artifacts(&results, &[], &SweepConfig::default(), dir.path()).unwrap();
        assert!(summary.exists());
        assert!(dir.path().join("manifest.json").exists());
        assert!(dir.path().join("curves").join("BTC_USDT_abcdef012345.csv").exists());
    }
}
