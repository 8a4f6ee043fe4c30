//! Parameter sweep: full Cartesian grid over the strategy parameters.
//!
//! The sweep is a pure function of already-loaded pairs: prices are fetched
//! once per pair and reused for every grid point. Grid points are evaluated
//! on the rayon pool unless the sweep is configured as sequential.

use chrono::{NaiveDate, NaiveDateTime};
use pairlab_core::data::Interval;
use pairlab_core::domain::SpreadState;
use pairlab_core::engine::BacktestParams;
use pairlab_core::signals::SignalParams;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{ConfigError, RunConfig, SweepConfig};
use crate::data_loader::LoadedPair;
use crate::metrics::MetricSet;
use crate::runner::{run_pair_backtest, RunError, StrategyParams};

/// Lists of values per parameter; the grid is their Cartesian product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ParamGrid {
    pub entry_z: Vec<f64>,
    pub exit_z: Vec<f64>,
    pub window: Vec<usize>,
    pub abs_floor: Vec<f64>,
}

impl Default for ParamGrid {
    fn default() -> Self {
        Self {
            entry_z: vec![2.0, 2.5, 3.0],
            exit_z: vec![0.05, 0.25],
            window: vec![40, 50, 60],
            abs_floor: vec![0.0, 0.5],
        }
    }
}

impl ParamGrid {
    /// Total number of grid points.
    pub fn size(&self) -> usize {
        self.entry_z.len() * self.exit_z.len() * self.window.len() * self.abs_floor.len()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.entry_z.is_empty() {
            return Err(ConfigError::EmptyGrid("entry_z"));
        }
        if self.exit_z.is_empty() {
            return Err(ConfigError::EmptyGrid("exit_z"));
        }
        if self.window.is_empty() {
            return Err(ConfigError::EmptyGrid("window"));
        }
        if self.abs_floor.is_empty() {
            return Err(ConfigError::EmptyGrid("abs_floor"));
        }
        if let Some(&w) = self.window.iter().find(|&&w| w < 2) {
            return Err(ConfigError::InvalidWindow(w));
        }
        for point in self.points() {
            point.signal.validate()?;
        }
        Ok(())
    }

    /// All grid points, `entry_z` varying slowest and `abs_floor` fastest.
    pub fn points(&self) -> Vec<StrategyParams> {
        let mut points = Vec::with_capacity(self.size());
        for &entry_z in &self.entry_z {
            for &exit_z in &self.exit_z {
                for &window in &self.window {
                    for &abs_floor in &self.abs_floor {
                        points.push(StrategyParams {
                            window,
                            signal: SignalParams::new(entry_z, exit_z, abs_floor),
                        });
                    }
                }
            }
        }
        points
    }
}

/// One cumulative P&L observation of an equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CurvePoint {
    pub timestamp: NaiveDateTime,
    pub cum_pnl: f64,
    pub state: SpreadState,
}

/// One summary row: a pair evaluated at one grid point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepRecord {
    pub pair: String,
    pub run_id: String,
    pub params: StrategyParams,
    pub stop_loss: f64,
    pub metrics: MetricSet,
    pub adf_statistic: Option<f64>,
    pub adf_p_value: Option<f64>,
    pub trade_count: usize,
    pub bar_count: usize,
    pub is_synthetic: bool,
    #[serde(skip)]
    pub curve: Vec<CurvePoint>,
}

/// Sweep over pairs × grid points.
pub struct ParamSweep<'a> {
    grid: &'a ParamGrid,
    backtest: BacktestParams,
    metric_names: Option<Vec<&'a str>>,
    parallel: bool,
}

impl<'a> ParamSweep<'a> {
    pub fn new(grid: &'a ParamGrid, backtest: BacktestParams) -> Self {
        Self {
            grid,
            backtest,
            metric_names: None,
            parallel: true,
        }
    }

    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn with_metrics(mut self, names: Option<Vec<&'a str>>) -> Self {
        self.metric_names = names;
        self
    }

    /// Evaluate every grid point on one pair.
    pub fn run_pair(&self, pair: &LoadedPair, template: &RunConfigTemplate) -> Result<Vec<SweepRecord>, RunError> {
        let points = self.grid.points();
        let eval = |params: &StrategyParams| self.evaluate(pair, params, template);
        if self.parallel {
            points.par_iter().map(eval).collect()
        } else {
            points.iter().map(eval).collect()
        }
    }

    /// Evaluate every grid point on every pair, in pair order.
    pub fn run(&self, pairs: &[LoadedPair], template: &RunConfigTemplate) -> Result<SweepResults, RunError> {
        let mut records = Vec::with_capacity(pairs.len() * self.grid.size());
        for pair in pairs {
            let pair_records = self.run_pair(pair, template)?;
            info!(
                pair = %pair.spec.label(),
                combinations = pair_records.len(),
                synthetic = pair.is_synthetic,
                "pair sweep complete"
            );
            records.extend(pair_records);
        }
        Ok(SweepResults { records })
    }

    fn evaluate(
        &self,
        pair: &LoadedPair,
        params: &StrategyParams,
        template: &RunConfigTemplate,
    ) -> Result<SweepRecord, RunError> {
        let result = run_pair_backtest(&pair.series, params, &self.backtest, self.metric_names.as_deref())?;
        let run_config = RunConfig {
            pair: pair.spec.clone(),
            start_date: template.start_date,
            end_date: template.end_date,
            interval: template.interval,
            window: params.window,
            signal: params.signal,
            backtest: self.backtest,
        };
        let curve = result
            .trace
            .iter()
            .map(|r| CurvePoint {
                timestamp: r.timestamp,
                cum_pnl: r.cum_pnl,
                state: r.state,
            })
            .collect();
        Ok(SweepRecord {
            pair: pair.spec.label(),
            run_id: run_config.run_id(),
            params: *params,
            stop_loss: self.backtest.stop_loss,
            metrics: result.metrics,
            adf_statistic: pair.adf_statistic(),
            adf_p_value: pair.adf_p_value(),
            trade_count: result.trades.len(),
            bar_count: result.trace.len(),
            is_synthetic: pair.is_synthetic,
            curve,
        })
    }
}

/// The request-level fields of a `RunConfig` shared by every grid point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunConfigTemplate {
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub interval: Interval,
}

impl RunConfigTemplate {
    pub fn from_sweep(config: &SweepConfig) -> Self {
        Self {
            start_date: config.sweep.start_date,
            end_date: config.sweep.end_date,
            interval: config.sweep.interval,
        }
    }
}

/// Sweep output, one record per pair × grid point.
#[derive(Debug, Clone, Default)]
pub struct SweepResults {
    pub records: Vec<SweepRecord>,
}

impl SweepResults {
    pub fn all(&self) -> &[SweepRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SweepRecord> {
        self.records.get(index)
    }

    pub fn for_pair<'s>(&'s self, pair: &'s str) -> impl Iterator<Item = &'s SweepRecord> + 's {
        self.records.iter().filter(move |r| r.pair == pair)
    }

    /// Records sorted by `metric`, best (highest) first; undefined values last.
    pub fn sorted_by(&self, metric: &str) -> Vec<&SweepRecord> {
        let mut sorted: Vec<&SweepRecord> = self.records.iter().collect();
        sorted.sort_by(|a, b| {
            match (a.metrics.get(metric), b.metrics.get(metric)) {
                (Some(x), Some(y)) => y.total_cmp(&x),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
        sorted
    }

    pub fn top_n(&self, metric: &str, n: usize) -> Vec<&SweepRecord> {
        let mut sorted = self.sorted_by(metric);
        sorted.truncate(n);
        sorted
    }

    /// Best record with a defined value for `metric`.
    pub fn best(&self, metric: &str) -> Option<&SweepRecord> {
        self.sorted_by(metric)
            .into_iter()
            .next()
            .filter(|r| r.metrics.get(metric).is_some())
    }
}
