//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. cum_pnl only changes on bars that record an exit
//! 2. cum_pnl is the running sum of per-bar pnl
//! 3. Sizes are frozen while a position is held
//! 4. Realized P&L equals the sum of extracted trade P&L

use chrono::{Duration, NaiveDate};
use pairlab_core::domain::PairSeries;
use pairlab_core::engine::{extract_trades, BacktestEngine, BacktestParams, BacktestTrace};
use pairlab_core::signals::SignalRecord;
use proptest::prelude::*;

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_signal() -> impl Strategy<Value = SignalRecord> {
    (any::<bool>(), any::<bool>(), any::<bool>()).prop_map(|(long, short, exit)| SignalRecord { long, short, exit })
}

fn arb_run() -> impl Strategy<Value = (Vec<f64>, Vec<f64>, Vec<SignalRecord>, f64)> {
    (5usize..80).prop_flat_map(|n| {
        (
            prop::collection::vec(20.0..200.0_f64, n),
            prop::collection::vec(20.0..200.0_f64, n),
            prop::collection::vec(arb_signal(), n),
            0.01..0.5_f64,
        )
    })
}

fn run(a: Vec<f64>, b: Vec<f64>, signals: &[SignalRecord], stop_loss: f64) -> BacktestTrace {
    let base = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
    let ts = (0..a.len()).map(|i| base + Duration::days(i as i64)).collect();
    let pair = PairSeries::new("A", "B", ts, a, b).unwrap();
    BacktestEngine::new(&pair, BacktestParams { stop_loss })
        .run(signals, None)
        .unwrap()
}

proptest! {
    #[test]
    fn cum_pnl_constant_between_exits((a, b, signals, stop) in arb_run()) {
        let trace = run(a, b, &signals, stop);
        for w in trace.rows.windows(2) {
            if w[1].exit.is_none() {
                prop_assert_eq!(w[1].cum_pnl, w[0].cum_pnl);
                prop_assert_eq!(w[1].pnl, 0.0);
            }
        }
    }

    #[test]
    fn cum_pnl_is_running_sum((a, b, signals, stop) in arb_run()) {
        let trace = run(a, b, &signals, stop);
        let mut acc = 0.0;
        for row in &trace {
            acc += row.pnl;
            prop_assert!((row.cum_pnl - acc).abs() < 1e-9);
        }
    }

    #[test]
    fn sizes_frozen_while_held((a, b, signals, stop) in arb_run()) {
        let trace = run(a, b, &signals, stop);
        for w in trace.rows.windows(2) {
            let held = !w[0].state.is_flat() && w[1].state == w[0].state && w[1].exit.is_none();
            if held {
                prop_assert_eq!(w[1].size_a, w[0].size_a);
                prop_assert_eq!(w[1].size_b, w[0].size_b);
            }
        }
    }

    #[test]
    fn trades_account_for_all_realized_pnl((a, b, signals, stop) in arb_run()) {
        let trace = run(a, b, &signals, stop);
        let trades = extract_trades(&trace);
        prop_assert_eq!(trades.len(), trace.exit_count());
        let total: f64 = trades.iter().map(|t| t.pnl).sum();
        prop_assert!((total - trace.final_cum_pnl()).abs() < 1e-6);
    }
}
