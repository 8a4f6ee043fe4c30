//! Static Engle–Granger diagnostics for a pair.
//!
//! 1. Full-sample OLS of leg A on leg B (with constant).
//! 2. Augmented Dickey–Fuller test (constant, no trend) on the residual.
//!    The lag order is chosen by AIC over `0..=maxlag` on a common sample,
//!    `maxlag = ceil(12·(n/100)^(1/4))` capped at `n/2 - 2`.
//! 3. MacKinnon (1994) approximate p-value and MacKinnon (2010) finite
//!    sample critical values for the single-series constant case.

use super::rolling_ols::fit_window;
use super::StatsError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;

// MacKinnon (1994) response surface, regression "c", one series.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value polynomials in 1/n.
const CRIT_1: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Smallest residual length for which an ADF regression is attempted.
pub const MIN_ADF_OBS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalValues {
    pub one_pct: f64,
    pub five_pct: f64,
    pub ten_pct: f64,
}

impl CriticalValues {
    pub fn for_nobs(nobs: usize) -> Self {
        let inv = 1.0 / nobs as f64;
        let eval = |c: &[f64; 4]| c[0] + inv * (c[1] + inv * (c[2] + inv * c[3]));
        Self {
            one_pct: eval(&CRIT_1),
            five_pct: eval(&CRIT_5),
            ten_pct: eval(&CRIT_10),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdfResult {
    /// t-statistic on the lagged level.
    pub statistic: f64,
    pub p_value: f64,
    /// Number of lagged differences in the chosen regression.
    pub used_lag: usize,
    /// Observations in the chosen regression.
    pub nobs: usize,
    pub critical_values: CriticalValues,
    /// AIC of the chosen lag on the common selection sample.
    pub ic_best: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CointegrationResult {
    pub intercept: f64,
    pub hedge_ratio: f64,
    pub adf: AdfResult,
}

impl CointegrationResult {
    pub fn is_cointegrated(&self, significance: f64) -> bool {
        self.adf.p_value < significance
    }
}

/// Engle–Granger step: static regression of `a` on `b`, then ADF on the residual.
///
/// Bars where either price is non-finite are dropped before fitting.
pub fn engle_granger(a: &[f64], b: &[f64]) -> Result<CointegrationResult, StatsError> {
    if a.len() != b.len() {
        return Err(StatsError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let (ya, xb): (Vec<f64>, Vec<f64>) = a
        .iter()
        .zip(b)
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .map(|(x, y)| (*x, *y))
        .unzip();
    if ya.len() < MIN_ADF_OBS {
        return Err(StatsError::InsufficientData {
            needed: MIN_ADF_OBS,
            got: ya.len(),
        });
    }

    let (intercept, hedge_ratio) = fit_window(&ya, &xb).ok_or(StatsError::SingularMatrix)?;
    let residual: Vec<f64> = ya
        .iter()
        .zip(&xb)
        .map(|(y, x)| y - (intercept + hedge_ratio * x))
        .collect();

    Ok(CointegrationResult {
        intercept,
        hedge_ratio,
        adf: adf_test(&residual)?,
    })
}

/// Augmented Dickey–Fuller test with a constant and AIC lag selection.
pub fn adf_test(series: &[f64]) -> Result<AdfResult, StatsError> {
    let n = series.len();
    if n < MIN_ADF_OBS {
        return Err(StatsError::InsufficientData {
            needed: MIN_ADF_OBS,
            got: n,
        });
    }

    let schwert = (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize;
    let maxlag = schwert.min(n / 2 - 2);

    let diff: Vec<f64> = series.windows(2).map(|w| w[1] - w[0]).collect();

    // Lag selection on the sample that the longest lag allows.
    let (y_sel, x_sel) = adf_design(series, &diff, maxlag);
    let mut best: Option<(f64, usize)> = None;
    for lag in 0..=maxlag {
        let cols = 2 + lag;
        let x = x_sel.columns(0, cols).into_owned();
        let Some(fit) = ols(&y_sel, &x) else { continue };
        let aic = fit.aic();
        if best.map_or(true, |(b, _)| aic < b) {
            best = Some((aic, lag));
        }
    }
    let (ic_best, used_lag) = best.ok_or(StatsError::SingularMatrix)?;

    // Refit on the full sample available to the chosen lag.
    let (y, x) = adf_design(series, &diff, used_lag);
    let fit = ols(&y, &x).ok_or(StatsError::SingularMatrix)?;
    let statistic = fit.t_value(1);
    let nobs = y.len();

    Ok(AdfResult {
        statistic,
        p_value: mackinnon_p_value(statistic),
        used_lag,
        nobs,
        critical_values: CriticalValues::for_nobs(nobs),
        ic_best,
    })
}

/// Approximate asymptotic p-value of an ADF statistic (constant, one series).
pub fn mackinnon_p_value(stat: f64) -> f64 {
    if stat > TAU_MAX {
        return 1.0;
    }
    if stat < TAU_MIN {
        return 0.0;
    }
    let poly = if stat <= TAU_STAR {
        horner(&TAU_SMALL_P, stat)
    } else {
        horner(&TAU_LARGE_P, stat)
    };
    normal_cdf(poly)
}

fn horner(coefs: &[f64], x: f64) -> f64 {
    coefs.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / std::f64::consts::SQRT_2)
}

/// Regression of `Δy[t]` on `[1, y[t-1], Δy[t-1], …, Δy[t-lag]]`.
fn adf_design(series: &[f64], diff: &[f64], lag: usize) -> (DVector<f64>, DMatrix<f64>) {
    let rows = diff.len() - lag;
    let cols = 2 + lag;
    let mut x = DMatrix::zeros(rows, cols);
    let mut y = DVector::zeros(rows);
    for r in 0..rows {
        let t = r + lag;
        y[r] = diff[t];
        x[(r, 0)] = 1.0;
        x[(r, 1)] = series[t];
        for k in 1..=lag {
            x[(r, 1 + k)] = diff[t - k];
        }
    }
    (y, x)
}

struct OlsFit {
    beta: DVector<f64>,
    xtx_inv: DMatrix<f64>,
    ssr: f64,
    nobs: usize,
}

impl OlsFit {
    fn aic(&self) -> f64 {
        let n = self.nobs as f64;
        let llf = -n / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / n).ln() + 1.0);
        -2.0 * llf + 2.0 * self.beta.len() as f64
    }

    fn t_value(&self, col: usize) -> f64 {
        let dof = self.nobs.saturating_sub(self.beta.len()).max(1) as f64;
        let sigma2 = self.ssr / dof;
        self.beta[col] / (sigma2 * self.xtx_inv[(col, col)]).sqrt()
    }
}

fn ols(y: &DVector<f64>, x: &DMatrix<f64>) -> Option<OlsFit> {
    if x.nrows() <= x.ncols() {
        return None;
    }
    let xt = x.transpose();
    let xtx_inv = (&xt * x).try_inverse()?;
    let beta = &xtx_inv * (&xt * y);
    let resid = y - x * &beta;
    let ssr = resid.dot(&resid);
    Some(OlsFit {
        beta,
        xtx_inv,
        ssr,
        nobs: y.len(),
    })
}
