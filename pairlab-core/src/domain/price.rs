//! Price series: a single symbol's closes and the aligned two-leg pair.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One close price observation for a single symbol.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

impl PriceBar {
    pub fn new(timestamp: NaiveDateTime, close: f64) -> Self {
        Self { timestamp, close }
    }

    /// A close is usable when it is finite and strictly positive.
    pub fn is_valid(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Errors raised while building a [`PairSeries`].
#[derive(Debug, Error, PartialEq)]
pub enum PairError {
    #[error("expected exactly two price columns, got {0}")]
    WrongColumnCount(usize),

    #[error("column length mismatch: {timestamps} timestamps, {a} prices for leg A, {b} for leg B")]
    LengthMismatch { timestamps: usize, a: usize, b: usize },

    #[error("timestamps must be strictly increasing (violated at index {index})")]
    UnorderedTimestamps { index: usize },
}

/// Two price series on a shared, strictly increasing timestamp index.
///
/// Leg A is the regression's dependent variable, leg B the regressor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairSeries {
    pub symbol_a: String,
    pub symbol_b: String,
    pub timestamps: Vec<NaiveDateTime>,
    pub price_a: Vec<f64>,
    pub price_b: Vec<f64>,
}

impl PairSeries {
    pub fn new(
        symbol_a: impl Into<String>,
        symbol_b: impl Into<String>,
        timestamps: Vec<NaiveDateTime>,
        price_a: Vec<f64>,
        price_b: Vec<f64>,
    ) -> Result<Self, PairError> {
        if timestamps.len() != price_a.len() || timestamps.len() != price_b.len() {
            return Err(PairError::LengthMismatch {
                timestamps: timestamps.len(),
                a: price_a.len(),
                b: price_b.len(),
            });
        }
        if let Some(index) = timestamps.windows(2).position(|w| w[1] <= w[0]) {
            return Err(PairError::UnorderedTimestamps { index: index + 1 });
        }
        Ok(Self {
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
            timestamps,
            price_a,
            price_b,
        })
    }

    /// Build a pair from a set of named price columns.
    ///
    /// The column order decides which symbol is leg A. Anything other than
    /// exactly two columns is a configuration error.
    pub fn from_columns(
        timestamps: Vec<NaiveDateTime>,
        columns: Vec<(String, Vec<f64>)>,
    ) -> Result<Self, PairError> {
        let count = columns.len();
        let mut iter = columns.into_iter();
        match (iter.next(), iter.next(), iter.next()) {
            (Some((sym_a, a)), Some((sym_b, b)), None) => Self::new(sym_a, sym_b, timestamps, a, b),
            _ => Err(PairError::WrongColumnCount(count)),
        }
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    /// Display label, e.g. `EEM/VWO`.
    pub fn label(&self) -> String {
        format!("{}/{}", self.symbol_a, self.symbol_b)
    }

    /// Deterministic BLAKE3 hash over symbols, timestamps and prices.
    pub fn dataset_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.symbol_a.as_bytes());
        hasher.update(self.symbol_b.as_bytes());
        for ((ts, a), b) in self
            .timestamps
            .iter()
            .zip(&self.price_a)
            .zip(&self.price_b)
        {
            hasher.update(&ts.and_utc().timestamp_millis().to_le_bytes());
            hasher.update(&a.to_le_bytes());
            hasher.update(&b.to_le_bytes());
        }
        hasher.finalize().to_hex().to_string()
    }
}
