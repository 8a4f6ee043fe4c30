//! Rolling ordinary least squares: `price_a = intercept + slope·price_b + residual`.
//!
//! Each output at index `t` uses only the trailing window `[t-window+1, t]`.
//! Lookback: window - 1 (first defined value at index window-1).

use super::{is_degenerate, StatsError};
use serde::{Deserialize, Serialize};

/// Per-timestamp regression output, aligned with the input prices.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegressionSeries {
    pub intercept: Vec<Option<f64>>,
    pub slope: Vec<Option<f64>>,
    pub residual: Vec<Option<f64>>,
}

impl RegressionSeries {
    fn undefined(n: usize) -> Self {
        Self {
            intercept: vec![None; n],
            slope: vec![None; n],
            residual: vec![None; n],
        }
    }

    pub fn len(&self) -> usize {
        self.residual.len()
    }

    pub fn is_empty(&self) -> bool {
        self.residual.is_empty()
    }

    /// Number of timestamps with a defined fit.
    pub fn defined_count(&self) -> usize {
        self.residual.iter().filter(|r| r.is_some()).count()
    }
}

/// Fit `y` on `x` over every trailing window of `window` observations.
///
/// Windows with fewer than `window` observations, a non-finite value, or a
/// (numerically) constant `x` produce `None` at that timestamp.
pub fn rolling_ols(y: &[f64], x: &[f64], window: usize) -> Result<RegressionSeries, StatsError> {
    if window == 0 {
        return Err(StatsError::InvalidWindow { window, min: 1 });
    }
    if y.len() != x.len() {
        return Err(StatsError::LengthMismatch {
            left: y.len(),
            right: x.len(),
        });
    }

    let n = y.len();
    let mut out = RegressionSeries::undefined(n);
    if n < window {
        return Ok(out);
    }

    for t in (window - 1)..n {
        let start = t + 1 - window;
        if let Some((intercept, slope)) = fit_window(&y[start..=t], &x[start..=t]) {
            out.intercept[t] = Some(intercept);
            out.slope[t] = Some(slope);
            out.residual[t] = Some(y[t] - (intercept + slope * x[t]));
        }
    }

    Ok(out)
}

/// Closed-form OLS on one window. Two-pass centered sums.
pub(crate) fn fit_window(y: &[f64], x: &[f64]) -> Option<(f64, f64)> {
    if y.iter().chain(x).any(|v| !v.is_finite()) {
        return None;
    }
    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        sxx += dx * dx;
        sxy += dx * (yi - y_mean);
    }

    if is_degenerate((sxx / n).sqrt(), x_mean) {
        return None;
    }

    let slope = sxy / sxx;
    Some((y_mean - slope * x_mean, slope))
}
