//! Backtest engine: the only stateful component.
//!
//! The engine consumes an aligned `PairSeries`, per-bar signal records and an
//! optional hedge-ratio series, then folds `EngineState` over the bars to
//! produce a `BacktestTrace`. Runs are single-threaded and own their state.

pub mod loop_runner;
pub mod sizing;
pub mod state;
pub mod trace;
pub mod trade_extraction;

pub use loop_runner::{BacktestEngine, EngineError};
pub use sizing::{position_sizes, unit_sizes};
pub use state::{BacktestParams, BarInput, EngineState, HedgeRatio, StepOutcome};
pub use trace::{BacktestTrace, TraceRow};
pub use trade_extraction::extract_trades;
