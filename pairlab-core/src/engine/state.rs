//! Backtest parameters and the per-run mutable state machine.

use super::loop_runner::EngineError;
use super::sizing::position_sizes;
use crate::domain::{ExitReason, SpreadState};
use crate::signals::SignalRecord;
use serde::{Deserialize, Serialize};

/// Configuration for a single backtest run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestParams {
    /// Fractional adverse move on either leg that forces an exit.
    pub stop_loss: f64,
}

impl Default for BacktestParams {
    fn default() -> Self {
        Self { stop_loss: 0.05 }
    }
}

impl BacktestParams {
    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.stop_loss.is_finite() || self.stop_loss <= 0.0 {
            return Err(EngineError::InvalidStopLoss(self.stop_loss));
        }
        Ok(())
    }
}

/// Hedge ratio available to the sizing rule on one bar.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HedgeRatio {
    /// No series was supplied: size leg B at beta = 1.
    Unit,
    /// Value of the supplied series on this bar.
    Series(Option<f64>),
}

impl HedgeRatio {
    fn resolve(&self) -> Option<f64> {
        match self {
            HedgeRatio::Unit => Some(1.0),
            HedgeRatio::Series(v) => v.filter(|b| b.is_finite()),
        }
    }
}

/// Immutable per-bar input to the state machine.
#[derive(Debug, Clone, Copy)]
pub struct BarInput {
    pub index: usize,
    pub price_a: f64,
    pub price_b: f64,
    pub signal: SignalRecord,
    pub hedge: HedgeRatio,
}

impl BarInput {
    fn prices_valid(&self) -> bool {
        [self.price_a, self.price_b]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }

    fn undefined_price(&self) -> EngineError {
        EngineError::UndefinedPrice {
            index: self.index,
            price_a: self.price_a,
            price_b: self.price_b,
        }
    }
}

/// What happened on one bar.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StepOutcome {
    /// Realized P&L booked on this bar (non-zero only on exits).
    pub pnl: f64,
    pub exit: Option<ExitReason>,
    /// A new position was opened on this bar.
    pub entered: bool,
}

/// Mutable state that evolves bar-by-bar during one engine run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub state: SpreadState,
    pub size_a: f64,
    pub size_b: f64,
    pub entry_price_a: f64,
    pub entry_price_b: f64,
    pub entry_index: Option<usize>,
}

impl EngineState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance one bar: stop check, exit, then entry.
    pub fn step(&mut self, bar: &BarInput, params: &BacktestParams) -> Result<StepOutcome, EngineError> {
        let mut outcome = StepOutcome::default();

        if !self.state.is_flat() {
            if !bar.prices_valid() {
                return Err(bar.undefined_price());
            }
            let stop = self.stop_triggered(bar.price_a, bar.price_b, params.stop_loss);
            if stop || bar.signal.exit {
                outcome.pnl = self.realized_pnl(bar.price_a, bar.price_b);
                outcome.exit = Some(if stop { ExitReason::StopLoss } else { ExitReason::Signal });
                self.flatten();
            }
        }

        if self.state.is_flat() {
            let next = if bar.signal.long {
                SpreadState::LongSpread
            } else if bar.signal.short {
                SpreadState::ShortSpread
            } else {
                SpreadState::Flat
            };
            if !next.is_flat() {
                self.enter(next, bar)?;
                outcome.entered = true;
            }
        }

        Ok(outcome)
    }

    fn stop_triggered(&self, price_a: f64, price_b: f64, stop_loss: f64) -> bool {
        let sign = self.state.sign_f64();
        let pnl_pct_a = sign * (price_a - self.entry_price_a) / self.entry_price_a;
        let pnl_pct_b = sign * (self.entry_price_b - price_b) / self.entry_price_b;
        pnl_pct_a < -stop_loss || pnl_pct_b < -stop_loss
    }

    fn realized_pnl(&self, price_a: f64, price_b: f64) -> f64 {
        (price_a - self.entry_price_a) * self.size_a + (price_b - self.entry_price_b) * self.size_b
    }

    fn flatten(&mut self) {
        self.state = SpreadState::Flat;
        self.size_a = 0.0;
        self.size_b = 0.0;
        self.entry_index = None;
    }

    fn enter(&mut self, state: SpreadState, bar: &BarInput) -> Result<(), EngineError> {
        if !bar.prices_valid() {
            return Err(bar.undefined_price());
        }
        let beta = bar
            .hedge
            .resolve()
            .ok_or(EngineError::UndefinedHedgeRatio { index: bar.index })?;
        let (size_a, size_b) = position_sizes(state, bar.price_a, bar.price_b, beta);
        self.state = state;
        self.size_a = size_a;
        self.size_b = size_b;
        self.entry_price_a = bar.price_a;
        self.entry_price_b = bar.price_b;
        self.entry_index = Some(bar.index);
        Ok(())
    }
}
