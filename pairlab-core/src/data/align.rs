//! Two-symbol time alignment.
//!
//! Prices are inner-joined on timestamp: a bar missing from either symbol is
//! dropped. There is no forward-fill of tradable prices.

use super::provider::DataError;
use crate::domain::{PairSeries, PriceBar};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Inner-join two close series into a `PairSeries`.
///
/// Duplicate timestamps within one input keep the last observation. Bars
/// with a non-finite or non-positive close are dropped before the join.
pub fn inner_join(
    symbol_a: &str,
    bars_a: &[PriceBar],
    symbol_b: &str,
    bars_b: &[PriceBar],
) -> Result<PairSeries, DataError> {
    let by_ts = |bars: &[PriceBar]| -> BTreeMap<NaiveDateTime, f64> {
        bars.iter().filter(|b| b.is_valid()).map(|b| (b.timestamp, b.close)).collect()
    };
    let a_by_ts = by_ts(bars_a);
    let b_by_ts = by_ts(bars_b);

    let mut timestamps = Vec::with_capacity(a_by_ts.len().min(b_by_ts.len()));
    let mut price_a = Vec::with_capacity(timestamps.capacity());
    let mut price_b = Vec::with_capacity(timestamps.capacity());
    for (ts, a) in &a_by_ts {
        if let Some(b) = b_by_ts.get(ts) {
            timestamps.push(*ts);
            price_a.push(*a);
            price_b.push(*b);
        }
    }

    if timestamps.is_empty() {
        return Err(DataError::NoOverlap {
            symbol_a: symbol_a.to_string(),
            symbol_b: symbol_b.to_string(),
        });
    }

    Ok(PairSeries::new(symbol_a, symbol_b, timestamps, price_a, price_b)?)
}
