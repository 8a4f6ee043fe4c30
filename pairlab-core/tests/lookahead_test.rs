//! Look-ahead contamination tests for the statistics and signal pipeline.
//!
//! Invariant: no value at bar t may depend on prices from bar t+1 or later.
//!
//! Method: run each stage on a truncated series (bars 0..150) and on the full
//! series (bars 0..300). Bars 0..150 must be identical between both runs.

use pairlab_core::data::{generate_pair, SyntheticPairConfig};
use pairlab_core::signals::{generate_signals, SignalParams};
use pairlab_core::stats::{rolling_ols, rolling_zscore};

const FULL: usize = 300;
const TRUNCATED: usize = 150;
const WINDOW: usize = 30;

fn prices() -> (Vec<f64>, Vec<f64>) {
    let pair = generate_pair(&SyntheticPairConfig {
        bars: FULL,
        seed: 99,
        ..Default::default()
    })
    .unwrap();
    (pair.price_a, pair.price_b)
}

#[test]
fn rolling_ols_has_no_lookahead() {
    let (a, b) = prices();
    let full = rolling_ols(&a, &b, WINDOW).unwrap();
    let cut = rolling_ols(&a[..TRUNCATED], &b[..TRUNCATED], WINDOW).unwrap();
    assert_eq!(&full.slope[..TRUNCATED], &cut.slope[..]);
    assert_eq!(&full.intercept[..TRUNCATED], &cut.intercept[..]);
    assert_eq!(&full.residual[..TRUNCATED], &cut.residual[..]);
}

#[test]
fn zscore_has_no_lookahead() {
    let (a, b) = prices();
    let full = rolling_zscore(&rolling_ols(&a, &b, WINDOW).unwrap().residual, WINDOW).unwrap();
    let cut = rolling_zscore(
        &rolling_ols(&a[..TRUNCATED], &b[..TRUNCATED], WINDOW).unwrap().residual,
        WINDOW,
    )
    .unwrap();
    assert_eq!(&full[..TRUNCATED], &cut[..]);
}

#[test]
fn signals_have_no_lookahead() {
    let (a, b) = prices();
    let params = SignalParams::new(1.5, 0.1, 0.0);
    let run = |n: usize| {
        let reg = rolling_ols(&a[..n], &b[..n], WINDOW).unwrap();
        let z = rolling_zscore(&reg.residual, WINDOW).unwrap();
        generate_signals(&z, &reg.residual, &params).unwrap()
    };
    assert_eq!(&run(FULL)[..TRUNCATED], &run(TRUNCATED)[..]);
}
