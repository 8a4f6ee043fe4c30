//! PairLab Runner: pair loading, single runs, parameter sweeps and export.
//!
//! This crate builds on `pairlab-core` to provide:
//! - Pair loading with cache/download/synthetic fallback and ADF diagnostics
//! - The single-run pipeline (rolling OLS → z-score → signals → engine)
//! - Named performance metrics with `Option` semantics
//! - Parameter grids and parallel sweeps over many pairs
//! - Sweep TOML and pair-list YAML configuration
//! - CSV/JSON artifacts

pub mod config;
pub mod data_loader;
pub mod export;
pub mod metrics;
pub mod runner;
pub mod sweep;

pub use config::{
    load_pairs_file, resolve_pairs, ConfigError, PairEntry, PairSpec, RunConfig, RunId, SweepConfig,
};
pub use data_loader::{download_symbol, load_pair, load_pairs, LoadError, LoadOptions, LoadedPair};
pub use export::{save_run_artifacts, save_sweep_artifacts, SweepManifest};
pub use metrics::{compute_metrics, MetricError, MetricKind, MetricSet};
pub use runner::{run_pair_backtest, PairRunResult, RunError, StrategyParams};
pub use sweep::{ParamGrid, ParamSweep, RunConfigTemplate, SweepRecord, SweepResults};
