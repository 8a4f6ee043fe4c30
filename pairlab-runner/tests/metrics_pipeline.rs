//! Metrics computed on real engine output.

use pairlab_core::data::{generate_pair, SyntheticPairConfig};
use pairlab_core::engine::BacktestParams;
use pairlab_core::signals::SignalParams;
use pairlab_runner::{run_pair_backtest, StrategyParams};
use proptest::prelude::*;

#[test]
fn strategy_that_never_trades_has_zero_pnl_metrics() {
    let pair = generate_pair(&SyntheticPairConfig {
        bars: 500,
        ..Default::default()
    })
    .unwrap();
    let params = StrategyParams {
        window: 50,
        signal: SignalParams::new(1_000.0, 0.05, 0.0),
    };
    let result = run_pair_backtest(&pair, &params, &BacktestParams::default(), None).unwrap();

    assert!(result.trades.is_empty());
    assert_eq!(result.trace.final_cum_pnl(), 0.0);
    let m = &result.metrics;
    assert_eq!(m.get("sharpe_total"), None);
    assert_eq!(m.get("sharpe_invested"), None);
    assert_eq!(m.get("total_return_pct"), None);
    assert_eq!(m.get("pct_time_in_market"), Some(0.0));
    assert_eq!(m.get("max_dd_strategy"), Some(0.0));
    // The benchmark does not depend on the strategy.
    assert!(m.get("total_return_50_50").is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn metric_ranges_hold(
        seed in 0u64..10_000,
        window in 20usize..60,
        entry_z in 1.0f64..3.0,
        exit_z in 0.0f64..0.5,
        stop_loss in 0.01f64..0.2,
    ) {
        let pair = generate_pair(&SyntheticPairConfig { bars: 300, seed, ..Default::default() }).unwrap();
        let params = StrategyParams { window, signal: SignalParams::new(entry_z, exit_z, 0.0) };
        let result = run_pair_backtest(&pair, &params, &BacktestParams { stop_loss }, None).unwrap();
        let m = &result.metrics;

        let pct = m.get("pct_time_in_market").unwrap();
        prop_assert!((0.0..=100.0).contains(&pct));
        prop_assert!(m.get("max_dd_strategy").unwrap() <= 0.0);
        if let Some(dd) = m.get("max_dd_50_50") {
            prop_assert!(dd <= 0.0);
        }
        if pct == 0.0 {
            prop_assert_eq!(m.get("sharpe_invested"), None);
        }
        for (_, v) in m.iter() {
            if let Some(v) = v {
                prop_assert!(v.is_finite());
            }
        }
    }
}
