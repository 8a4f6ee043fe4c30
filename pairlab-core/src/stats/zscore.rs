//! Rolling z-score of a series with gaps.
//!
//! `z[t] = (v[t] - mean) / std` over the trailing window ending at `t`,
//! using the sample standard deviation (N-1 denominator).

use super::{is_degenerate, StatsError};

/// Standardize `values` over a trailing window.
///
/// A window containing any `None` yields `None`, as does a window whose
/// sample standard deviation is zero.
pub fn rolling_zscore(values: &[Option<f64>], window: usize) -> Result<Vec<Option<f64>>, StatsError> {
    if window < 2 {
        return Err(StatsError::InvalidWindow { window, min: 2 });
    }

    let n = values.len();
    let mut out = vec![None; n];
    if n < window {
        return Ok(out);
    }

    let mut buf = Vec::with_capacity(window);
    for t in (window - 1)..n {
        buf.clear();
        let slice = &values[t + 1 - window..=t];
        if slice.iter().any(|v| !matches!(v, Some(x) if x.is_finite())) {
            continue;
        }
        buf.extend(slice.iter().flatten());

        let m = buf.iter().sum::<f64>() / window as f64;
        let var = buf.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (window - 1) as f64;
        let std = var.sqrt();
        if is_degenerate(std, m) {
            continue;
        }
        out[t] = Some((buf[window - 1] - m) / std);
    }

    Ok(out)
}
