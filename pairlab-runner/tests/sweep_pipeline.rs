//! End-to-end sweep: config files → offline synthetic pairs → sweep → artifacts.

use std::fs;

use pairlab_core::data::ParquetCache;
use pairlab_runner::{
    export::import_manifest_json, load_pairs, load_pairs_file, resolve_pairs, save_sweep_artifacts, LoadOptions,
    ParamSweep, RunConfigTemplate, SweepConfig,
};

const SWEEP_TOML: &str = r#"
[sweep]
pairs_file = "pairs.yml"
start_date = "2023-01-01"
end_date = "2024-06-30"
stop_loss = 0.05
parallel = true

[grid]
entry_z = [2.0, 2.5]
exit_z = [0.05]
window = [40, 60]
abs_floor = [0.0]
"#;

const PAIRS_YML: &str = "
- type: etf
  symbols: [EEM, VWO]
- type: commodity
  symbols: [GLD, SLV]
- type: crypto
  symbols: [BTCUSDT, ETHUSDT]
";

#[test]
fn offline_synthetic_sweep_writes_all_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("sweep.toml");
    fs::write(&config_path, SWEEP_TOML).unwrap();
    fs::write(dir.path().join("pairs.yml"), PAIRS_YML).unwrap();

    let config = SweepConfig::load(&config_path).unwrap();
    let pairs = resolve_pairs(&load_pairs_file(&config.sweep.pairs_file).unwrap()).unwrap();
    assert_eq!(pairs.len(), 2, "the commodity pair is skipped");

    let cache = ParquetCache::new(dir.path().join("cache"));
    let opts = LoadOptions {
        start: config.sweep.start_date,
        end: config.sweep.end_date,
        interval: config.sweep.interval,
        offline: true,
        synthetic: true,
        force: false,
    };
    let loaded = load_pairs(&pairs, &cache, None, &opts).unwrap();
    assert_eq!(loaded.len(), 2);
    assert!(loaded.iter().all(|p| p.is_synthetic));

    let results = ParamSweep::new(&config.grid, config.backtest_params())
        .with_parallelism(config.sweep.parallel)
        .run(&loaded, &RunConfigTemplate::from_sweep(&config))
        .unwrap();
    assert_eq!(results.len(), 2 * config.grid.size());

    let out = dir.path().join("results");
    let summary = save_sweep_artifacts(&results, &loaded, &config, &out).unwrap();

    let csv = fs::read_to_string(summary).unwrap();
    assert_eq!(csv.lines().count(), 1 + results.len());
    assert!(csv.lines().skip(1).any(|l| l.starts_with("EEM/VWO,")));
    assert!(csv.lines().skip(1).any(|l| l.starts_with("BTCUSDT/ETHUSDT,")));

    let curves = fs::read_dir(out.join("curves")).unwrap().count();
    assert_eq!(curves, results.len());

    let manifest = import_manifest_json(&fs::read_to_string(out.join("manifest.json")).unwrap()).unwrap();
    assert_eq!(manifest.pairs.len(), 2);
    assert_eq!(manifest.records.len(), results.len());
    assert_eq!(manifest.config.grid, config.grid);
}

#[test]
fn sweep_is_deterministic_across_runs() {
    let config = SweepConfig::from_toml(SWEEP_TOML).unwrap();
    let pairs = resolve_pairs(&pairlab_runner::config::parse_pairs(PAIRS_YML).unwrap()).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let cache = ParquetCache::new(dir.path());
    let opts = LoadOptions {
        start: config.sweep.start_date,
        end: config.sweep.end_date,
        offline: true,
        synthetic: true,
        ..Default::default()
    };
    let template = RunConfigTemplate::from_sweep(&config);

    let run = || {
        let loaded = load_pairs(&pairs, &cache, None, &opts).unwrap();
        ParamSweep::new(&config.grid, config.backtest_params())
            .run(&loaded, &template)
            .unwrap()
    };
    let first = run();
    let second = run();
    for (a, b) in first.all().iter().zip(second.all()) {
        assert_eq!(a.run_id, b.run_id);
        assert_eq!(a.metrics, b.metrics);
        assert_eq!(a.curve, b.curve);
    }
}
