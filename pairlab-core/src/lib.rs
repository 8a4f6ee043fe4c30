//! PairLab Core: price data, rolling statistics, signals and the spread engine.
//!
//! This crate contains the heart of the pairs backtester:
//! - Domain types (price series, spread state, round-trip trades)
//! - Price providers (Yahoo, Binance), inner-join alignment, Parquet cache
//! - Rolling OLS hedge ratio, rolling z-score, static ADF diagnostics
//! - Memoryless z-score threshold signals
//! - Bar-by-bar spread state machine with a fixed-fraction stop-loss

pub mod data;
pub mod domain;
pub mod engine;
pub mod signals;
pub mod stats;

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: everything a sweep worker touches is Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        // Domain types
        require_send::<domain::PairSeries>();
        require_sync::<domain::PairSeries>();
        require_send::<domain::PairTrade>();
        require_sync::<domain::PairTrade>();
        require_send::<domain::SpreadState>();
        require_sync::<domain::SpreadState>();

        // Statistics
        require_send::<stats::RegressionSeries>();
        require_sync::<stats::RegressionSeries>();
        require_send::<stats::CointegrationResult>();
        require_sync::<stats::CointegrationResult>();

        // Signals and engine
        require_send::<signals::SignalParams>();
        require_sync::<signals::SignalParams>();
        require_send::<signals::SignalRecord>();
        require_sync::<signals::SignalRecord>();
        require_send::<engine::BacktestParams>();
        require_sync::<engine::BacktestParams>();
        require_send::<engine::BacktestTrace>();
        require_sync::<engine::BacktestTrace>();
        require_send::<engine::EngineError>();
        require_sync::<engine::EngineError>();

        // Data layer
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::ParquetCache>();
        require_sync::<data::ParquetCache>();
        require_send::<data::PairSource>();
        require_sync::<data::PairSource>();
    }

    /// Signals only see z-score and residual, never position state.
    /// Compiling this is the check.
    #[allow(dead_code)]
    fn signal_evaluation_takes_no_position_state(
        params: &signals::SignalParams,
        z: Option<f64>,
        r: Option<f64>,
    ) -> signals::SignalRecord {
        params.evaluate(z, r)
    }
}
