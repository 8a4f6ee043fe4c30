//! Seeded synthetic co-integrated pair for offline runs and tests.
//!
//! Leg A is a random walk; leg B = `hedge_ratio · A + noise`, so A regressed
//! on B has a stationary residual.

use super::provider::DataError;
use crate::domain::PairSeries;
use chrono::{Duration, NaiveDate};
use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use statrs::distribution::Normal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticPairConfig {
    pub symbol_a: String,
    pub symbol_b: String,
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDate,
    pub start_price: f64,
    /// Standard deviation of the daily step of leg A.
    pub step_std: f64,
    pub hedge_ratio: f64,
    /// Standard deviation of leg B's deviation from `hedge_ratio · A`.
    pub noise_std: f64,
}

impl Default for SyntheticPairConfig {
    fn default() -> Self {
        Self {
            symbol_a: "SYN_A".into(),
            symbol_b: "SYN_B".into(),
            bars: 1000,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default(),
            start_price: 100.0,
            step_std: 1.0,
            hedge_ratio: 2.0,
            noise_std: 1.0,
        }
    }
}

/// Generate the pair. Leg A is floored at 1% of the start price to stay positive.
pub fn generate_pair(config: &SyntheticPairConfig) -> Result<PairSeries, DataError> {
    let step = Normal::new(0.0, config.step_std)
        .map_err(|e| DataError::Other(format!("synthetic step distribution: {e}")))?;
    let noise = Normal::new(0.0, config.noise_std)
        .map_err(|e| DataError::Other(format!("synthetic noise distribution: {e}")))?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    let floor = config.start_price * 0.01;
    let base = config.start.and_time(chrono::NaiveTime::MIN);
    let mut timestamps = Vec::with_capacity(config.bars);
    let mut price_a = Vec::with_capacity(config.bars);
    let mut price_b = Vec::with_capacity(config.bars);

    let mut a = config.start_price;
    for i in 0..config.bars {
        if i > 0 {
            a = (a + step.sample(&mut rng)).max(floor);
        }
        let b = (config.hedge_ratio * a + noise.sample(&mut rng)).max(floor);
        timestamps.push(base + Duration::days(i as i64));
        price_a.push(a);
        price_b.push(b);
    }

    Ok(PairSeries::new(
        config.symbol_a.clone(),
        config.symbol_b.clone(),
        timestamps,
        price_a,
        price_b,
    )?)
}
