//! Bar-by-bar loop: folds `EngineState` over the aligned inputs.
//!
//! Per bar, in order:
//! 1. If a position is held: stop-loss check against entry prices
//! 2. Exit on signal or stop, booking realized P&L
//! 3. If flat: enter on the long flag, else the short flag
//! 4. Record state, sizes, P&L and running cumulative P&L

use super::state::{BacktestParams, BarInput, EngineState, HedgeRatio};
use super::trace::{BacktestTrace, TraceRow};
use crate::domain::PairSeries;
use crate::signals::SignalRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum EngineError {
    #[error("{series} length {got} does not match price length {expected}")]
    LengthMismatch {
        series: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("undefined price at bar {index} (a = {price_a}, b = {price_b}) while a position is open or opening")]
    UndefinedPrice { index: usize, price_a: f64, price_b: f64 },

    #[error("undefined hedge ratio at entry bar {index}")]
    UndefinedHedgeRatio { index: usize },

    #[error("invalid stop loss {0}: must be finite and positive")]
    InvalidStopLoss(f64),
}

/// Runs the spread state machine over one pair.
#[derive(Debug, Clone)]
pub struct BacktestEngine<'a> {
    pair: &'a PairSeries,
    params: BacktestParams,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(pair: &'a PairSeries, params: BacktestParams) -> Self {
        Self { pair, params }
    }

    pub fn params(&self) -> &BacktestParams {
        &self.params
    }

    /// Simulate the strategy.
    ///
    /// `beta`, when given, sizes leg B on each entry bar; otherwise beta = 1.
    /// Positions still open after the last bar stay open and their
    /// unrealized P&L is not booked.
    pub fn run(
        &self,
        signals: &[SignalRecord],
        beta: Option<&[Option<f64>]>,
    ) -> Result<BacktestTrace, EngineError> {
        self.params.validate()?;
        let n = self.pair.len();
        if signals.len() != n {
            return Err(EngineError::LengthMismatch {
                series: "signal",
                expected: n,
                got: signals.len(),
            });
        }
        if let Some(b) = beta {
            if b.len() != n {
                return Err(EngineError::LengthMismatch {
                    series: "hedge ratio",
                    expected: n,
                    got: b.len(),
                });
            }
        }

        let mut state = EngineState::new();
        let mut rows = Vec::with_capacity(n);
        let mut cum_pnl = 0.0;

        for t in 0..n {
            let bar = BarInput {
                index: t,
                price_a: self.pair.price_a[t],
                price_b: self.pair.price_b[t],
                signal: signals[t],
                hedge: beta.map_or(HedgeRatio::Unit, |b| HedgeRatio::Series(b[t])),
            };
            let outcome = state.step(&bar, &self.params)?;
            cum_pnl += outcome.pnl;

            rows.push(TraceRow {
                timestamp: self.pair.timestamps[t],
                price_a: bar.price_a,
                price_b: bar.price_b,
                state: state.state,
                size_a: state.size_a,
                size_b: state.size_b,
                pnl: outcome.pnl,
                cum_pnl,
                exit: outcome.exit,
            });
        }

        Ok(BacktestTrace {
            symbol_a: self.pair.symbol_a.clone(),
            symbol_b: self.pair.symbol_b.clone(),
            rows,
        })
    }
}
