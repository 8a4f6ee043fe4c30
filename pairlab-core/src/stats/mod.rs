//! Rolling statistics over aligned price series.
//!
//! Every function here is a pure transformation of its inputs. Undefined
//! values (warm-up, degenerate windows) are `None`, never `NaN` or zero.
//!
//! - `rolling_ols`: trailing-window regression of leg A on leg B
//! - `zscore`: rolling standardization of the residual
//! - `cointegration`: static full-sample Engle–Granger diagnostics (ADF)

pub mod cointegration;
pub mod rolling_ols;
pub mod zscore;

pub use cointegration::{adf_test, engle_granger, mackinnon_p_value, AdfResult, CointegrationResult, CriticalValues};
pub use rolling_ols::{rolling_ols, RegressionSeries};
pub use zscore::rolling_zscore;

use thiserror::Error;

/// Relative tolerance below which a dispersion is treated as zero.
pub const ZERO_VARIANCE_TOL: f64 = 1e-12;

#[derive(Debug, Error, PartialEq)]
pub enum StatsError {
    #[error("invalid window {window}: must be at least {min}")]
    InvalidWindow { window: usize, min: usize },

    #[error("input length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("insufficient data: need at least {needed} finite observations, got {got}")]
    InsufficientData { needed: usize, got: usize },

    #[error("regression design matrix is singular")]
    SingularMatrix,
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// A dispersion is degenerate when it vanishes relative to the level of the data.
pub(crate) fn is_degenerate(std: f64, mean: f64) -> bool {
    std <= ZERO_VARIANCE_TOL * mean.abs().max(1.0)
}

#[cfg(test)]
pub(crate) fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}
