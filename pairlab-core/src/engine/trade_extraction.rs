//! Trade extraction: converts the bar trace into round-trip `PairTrade` entries.
//!
//! Post-processes the trace after the bar loop completes. A trade opens on
//! a bar whose state is non-flat and either follows a flat bar or carries an
//! exit (same-bar re-entry). It closes on the next bar with an exit reason.

use super::trace::BacktestTrace;
use crate::domain::PairTrade;

struct OpenTrade {
    index: usize,
}

/// Extract closed round trips. A position still open at the end is omitted.
pub fn extract_trades(trace: &BacktestTrace) -> Vec<PairTrade> {
    let mut trades = Vec::new();
    let mut open: Option<OpenTrade> = None;

    for (i, row) in trace.rows.iter().enumerate() {
        if let Some(reason) = row.exit {
            if let Some(o) = open.take() {
                let entry = &trace.rows[o.index];
                trades.push(PairTrade {
                    direction: entry.state,
                    entry_index: o.index,
                    entry_time: entry.timestamp,
                    entry_price_a: entry.price_a,
                    entry_price_b: entry.price_b,
                    exit_index: i,
                    exit_time: row.timestamp,
                    exit_price_a: row.price_a,
                    exit_price_b: row.price_b,
                    exit_reason: reason,
                    size_a: entry.size_a,
                    size_b: entry.size_b,
                    pnl: row.pnl,
                    bars_held: i - o.index,
                });
            }
        }

        let was_flat = i == 0 || trace.rows[i - 1].state.is_flat() || row.exit.is_some();
        if !row.state.is_flat() && was_flat {
            open = Some(OpenTrade { index: i });
        }
    }

    trades
}
