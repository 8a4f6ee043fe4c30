//! PairTrade: a completed round trip on the spread.

use super::spread::{ExitReason, SpreadState};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A complete round-trip trade record: entry → exit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairTrade {
    // ── Direction ──
    pub direction: SpreadState,

    // ── Entry ──
    pub entry_index: usize,
    pub entry_time: NaiveDateTime,
    pub entry_price_a: f64,
    pub entry_price_b: f64,

    // ── Exit ──
    pub exit_index: usize,
    pub exit_time: NaiveDateTime,
    pub exit_price_a: f64,
    pub exit_price_b: f64,
    pub exit_reason: ExitReason,

    // ── Size ──
    pub size_a: f64,
    pub size_b: f64,

    // ── PnL ──
    pub pnl: f64,

    pub bars_held: usize,
}

impl PairTrade {
    /// Gross notional at entry: `|size_a|·pa + |size_b|·pb`.
    pub fn entry_notional(&self) -> f64 {
        self.size_a.abs() * self.entry_price_a + self.size_b.abs() * self.entry_price_b
    }

    /// Return on the trade as a fraction of entry notional.
    pub fn return_pct(&self) -> Option<f64> {
        let notional = self.entry_notional();
        if notional == 0.0 {
            return None;
        }
        Some(self.pnl / notional)
    }

    pub fn is_winner(&self) -> bool {
        self.pnl > 0.0
    }
}
