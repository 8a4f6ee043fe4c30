//! Single-run pipeline: rolling OLS → z-score → signals → engine → metrics.
//!
//! `run_pair_backtest()` is pure: it takes already-loaded prices and performs
//! no I/O, so the sweep can call it from many threads over the same pair.

use pairlab_core::domain::{PairSeries, PairTrade};
use pairlab_core::engine::{extract_trades, BacktestEngine, BacktestParams, BacktestTrace, EngineError};
use pairlab_core::signals::{generate_signals, SignalError, SignalParams};
use pairlab_core::stats::{rolling_ols, rolling_zscore, StatsError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::ConfigError;
use crate::data_loader::LoadError;
use crate::metrics::{compute_metrics, MetricError, MetricSet};

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("statistics error: {0}")]
    Stats(#[from] StatsError),
    #[error("signal error: {0}")]
    Signal(#[from] SignalError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("metric error: {0}")]
    Metric(#[from] MetricError),
}

/// Strategy parameters varied by the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    /// Trailing window shared by the rolling OLS and the z-score.
    pub window: usize,
    pub signal: SignalParams,
}

impl Default for StrategyParams {
    fn default() -> Self {
        Self {
            window: 50,
            signal: SignalParams::default(),
        }
    }
}

/// Output of one pair × parameter-set backtest.
#[derive(Debug, Clone)]
pub struct PairRunResult {
    pub params: StrategyParams,
    pub trace: BacktestTrace,
    pub metrics: MetricSet,
    pub trades: Vec<PairTrade>,
    /// Bars with a defined z-score.
    pub defined_z: usize,
    /// Bars whose signal requested an entry.
    pub entry_signals: usize,
}

impl PairRunResult {
    pub fn trade_count(&self) -> usize {
        self.trades.len()
    }
}

/// Run the full pipeline on one aligned pair. The rolling slope is used as
/// the hedge ratio for position sizing.
pub fn run_pair_backtest(
    pair: &PairSeries,
    params: &StrategyParams,
    backtest: &BacktestParams,
    metric_names: Option<&[&str]>,
) -> Result<PairRunResult, RunError> {
    params.signal.validate()?;
    let regression = rolling_ols(&pair.price_a, &pair.price_b, params.window)?;
    let z = rolling_zscore(&regression.residual, params.window)?;
    let signals = generate_signals(&z, &regression.residual, &params.signal)?;

    let engine = BacktestEngine::new(pair, *backtest);
    let trace = engine.run(&signals, Some(&regression.slope[..]))?;
    let metrics = compute_metrics(&trace, metric_names)?;
    let trades = extract_trades(&trace);

    let defined_z = z.iter().filter(|v| v.is_some()).count();
    let entry_signals = signals.iter().filter(|s| s.is_entry()).count();
    debug!(
        pair = %pair.label(),
        window = params.window,
        entry_z = params.signal.entry_z,
        exit_z = params.signal.exit_z,
        trades = trades.len(),
        final_pnl = trace.final_cum_pnl(),
        "backtest complete"
    );

    Ok(PairRunResult {
        params: *params,
        trace,
        metrics,
        trades,
        defined_z,
        entry_signals,
    })
}
