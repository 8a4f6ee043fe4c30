//! Performance metrics computed from a backtest trace.
//!
//! Metrics are looked up by name in a fixed registry so a sweep can ask for a
//! subset. Every value is `Option<f64>`: a ratio with a zero denominator is
//! undefined, never zero.
//!
//! Strategy metrics work on absolute P&L (one unit of leg A per trade); the
//! `*_50_50` metrics describe an equal-weight, daily-rebalanced buy-and-hold of
//! both legs over the same bars.

use pairlab_core::engine::BacktestTrace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trading days per year used to annualize Sharpe ratios.
pub const TRADING_DAYS: f64 = 252.0;

/// Standard deviations below this are treated as zero.
const MIN_STD: f64 = 1e-15;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetricError {
    #[error("unknown metric '{name}' (valid: {})", valid.join(", "))]
    UnknownMetric { name: String, valid: Vec<String> },
}

/// The metric registry, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricKind {
    SharpeTotal,
    SharpeInvested,
    PctTimeInMarket,
    MaxDdStrategy,
    TotalReturnPct,
    TotalReturn5050,
    Sharpe5050,
    MaxDd5050,
}

impl MetricKind {
    pub const ALL: [MetricKind; 8] = [
        MetricKind::SharpeTotal,
        MetricKind::SharpeInvested,
        MetricKind::PctTimeInMarket,
        MetricKind::MaxDdStrategy,
        MetricKind::TotalReturnPct,
        MetricKind::TotalReturn5050,
        MetricKind::Sharpe5050,
        MetricKind::MaxDd5050,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetricKind::SharpeTotal => "sharpe_total",
            MetricKind::SharpeInvested => "sharpe_invested",
            MetricKind::PctTimeInMarket => "pct_time_in_market",
            MetricKind::MaxDdStrategy => "max_dd_strategy",
            MetricKind::TotalReturnPct => "total_return_pct",
            MetricKind::TotalReturn5050 => "total_return_50_50",
            MetricKind::Sharpe5050 => "sharpe_50_50",
            MetricKind::MaxDd5050 => "max_dd_50_50",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, MetricError> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.name() == name)
            .ok_or_else(|| MetricError::UnknownMetric {
                name: name.to_string(),
                valid: Self::ALL.iter().map(|k| k.name().to_string()).collect(),
            })
    }

    fn compute(&self, trace: &BacktestTrace, benchmark: &[f64]) -> Option<f64> {
        match self {
            MetricKind::SharpeTotal => sharpe_total(trace),
            MetricKind::SharpeInvested => sharpe_invested(trace),
            MetricKind::PctTimeInMarket => pct_time_in_market(trace),
            MetricKind::MaxDdStrategy => max_dd_strategy(trace),
            MetricKind::TotalReturnPct => total_return_pct(trace),
            MetricKind::TotalReturn5050 => compounded_total_return(benchmark),
            MetricKind::Sharpe5050 => annualized_sharpe(benchmark),
            MetricKind::MaxDd5050 => compounded_max_drawdown(benchmark),
        }
    }
}

/// Ordered `(name, value)` pairs. Immutable once computed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricSet {
    values: Vec<(String, Option<f64>)>,
}

impl MetricSet {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.iter().find(|(n, _)| n == name).and_then(|(_, v)| *v)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.iter().any(|(n, _)| n == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<f64>)> {
        self.values.iter().map(|(n, v)| (n.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Compute the named metrics (all of them when `names` is `None`), in the
/// order requested.
pub fn compute_metrics(trace: &BacktestTrace, names: Option<&[&str]>) -> Result<MetricSet, MetricError> {
    let kinds: Vec<MetricKind> = match names {
        None => MetricKind::ALL.to_vec(),
        Some(names) => names.iter().map(|n| MetricKind::from_name(n)).collect::<Result<_, _>>()?,
    };

    let benchmark = if kinds.iter().any(|k| matches!(k, MetricKind::TotalReturn5050 | MetricKind::Sharpe5050 | MetricKind::MaxDd5050)) {
        benchmark_returns(trace)
    } else {
        Vec::new()
    };

    let values = kinds
        .iter()
        .map(|k| (k.name().to_string(), k.compute(trace, &benchmark)))
        .collect();
    Ok(MetricSet { values })
}

// ─── Strategy metrics ───────────────────────────────────────────────

/// Annualized Sharpe of per-bar realized P&L.
pub fn sharpe_total(trace: &BacktestTrace) -> Option<f64> {
    annualized_sharpe(&trace.pnl())
}

/// Annualized Sharpe of P&L changes on bars entered with an open position.
///
/// The first bar has no predecessor and is excluded, not counted as an
/// invested bar with a zero change. A trace of `n` bars yields at most
/// `n - 1` samples.
pub fn sharpe_invested(trace: &BacktestTrace) -> Option<f64> {
    let changes: Vec<f64> = trace
        .rows
        .windows(2)
        .filter(|w| !w[0].state.is_flat())
        .map(|w| w[1].cum_pnl - w[0].cum_pnl)
        .collect();
    annualized_sharpe(&changes)
}

/// Percentage of bars ending with an open position.
pub fn pct_time_in_market(trace: &BacktestTrace) -> Option<f64> {
    if trace.is_empty() {
        return None;
    }
    let invested = trace.iter().filter(|r| !r.state.is_flat()).count();
    Some(100.0 * invested as f64 / trace.len() as f64)
}

/// Largest drop of cumulative P&L below its running maximum (zero or negative).
pub fn max_dd_strategy(trace: &BacktestTrace) -> Option<f64> {
    max_drawdown(&trace.cum_pnl())
}

/// Final cumulative P&L as a percentage of the peak gross notional held.
pub fn total_return_pct(trace: &BacktestTrace) -> Option<f64> {
    let peak = trace.iter().map(|r| r.invested()).fold(0.0_f64, f64::max);
    if trace.is_empty() || peak == 0.0 {
        return None;
    }
    Some(100.0 * trace.final_cum_pnl() / peak)
}

// ─── Benchmark metrics ──────────────────────────────────────────────

/// Per-bar returns of an equal-weight portfolio rebalanced every bar.
/// Non-finite returns (e.g. a zero previous price) are dropped.
pub fn benchmark_returns(trace: &BacktestTrace) -> Vec<f64> {
    trace
        .rows
        .windows(2)
        .map(|w| {
            let ret_a = w[1].price_a / w[0].price_a - 1.0;
            let ret_b = w[1].price_b / w[0].price_b - 1.0;
            0.5 * (ret_a + ret_b)
        })
        .filter(|r| r.is_finite())
        .collect()
}

/// `100 · (Π(1 + r) − 1)`; `None` without any return.
pub fn compounded_total_return(returns: &[f64]) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }
    let growth: f64 = returns.iter().map(|r| 1.0 + r).product();
    Some(100.0 * (growth - 1.0))
}

/// Max drawdown of the compounded return curve `Π(1 + r) − 1`.
pub fn compounded_max_drawdown(returns: &[f64]) -> Option<f64> {
    let curve: Vec<f64> = returns
        .iter()
        .scan(1.0_f64, |growth, r| {
            *growth *= 1.0 + r;
            Some(*growth - 1.0)
        })
        .collect();
    max_drawdown(&curve)
}

// ─── Shared helpers ─────────────────────────────────────────────────

/// `mean / sample std · √252`; `None` for fewer than two values or zero std.
pub fn annualized_sharpe(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = mean_f64(values);
    let std = std_dev(values);
    if !std.is_finite() || std < MIN_STD {
        return None;
    }
    Some(mean / std * TRADING_DAYS.sqrt())
}

/// `min(curve − running_max(curve))`; `None` for an empty curve.
pub fn max_drawdown(curve: &[f64]) -> Option<f64> {
    let first = *curve.first()?;
    let mut peak = first;
    let mut worst = 0.0_f64;
    for &value in curve {
        peak = peak.max(value);
        worst = worst.min(value - peak);
    }
    Some(worst)
}

fn mean_f64(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (N − 1).
fn std_dev(values: &[f64]) -> f64 {
    let mean = mean_f64(values);
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}
