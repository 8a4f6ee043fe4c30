//! Per-bar backtest output.

use crate::domain::{ExitReason, SpreadState};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// One bar of the backtest trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRow {
    pub timestamp: NaiveDateTime,
    pub price_a: f64,
    pub price_b: f64,
    /// State after this bar's exit and entry decisions.
    pub state: SpreadState,
    pub size_a: f64,
    pub size_b: f64,
    /// Realized P&L booked on this bar.
    pub pnl: f64,
    pub cum_pnl: f64,
    pub exit: Option<ExitReason>,
}

impl TraceRow {
    /// Gross notional held at the end of this bar.
    pub fn invested(&self) -> f64 {
        self.size_a.abs() * self.price_a + self.size_b.abs() * self.price_b
    }
}

/// The full trace of one engine run, one row per input bar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BacktestTrace {
    pub symbol_a: String,
    pub symbol_b: String,
    pub rows: Vec<TraceRow>,
}

impl BacktestTrace {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TraceRow> {
        self.rows.iter()
    }

    pub fn pnl(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.pnl).collect()
    }

    pub fn cum_pnl(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.cum_pnl).collect()
    }

    pub fn states(&self) -> Vec<SpreadState> {
        self.rows.iter().map(|r| r.state).collect()
    }

    pub fn final_cum_pnl(&self) -> f64 {
        self.rows.last().map_or(0.0, |r| r.cum_pnl)
    }

    pub fn exit_count(&self) -> usize {
        self.rows.iter().filter(|r| r.exit.is_some()).count()
    }

    /// Position still open after the last bar, if any.
    pub fn open_at_end(&self) -> Option<SpreadState> {
        self.rows.last().map(|r| r.state).filter(|s| !s.is_flat())
    }
}

impl<'a> IntoIterator for &'a BacktestTrace {
    type Item = &'a TraceRow;
    type IntoIter = std::slice::Iter<'a, TraceRow>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
