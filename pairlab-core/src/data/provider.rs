//! Price provider trait, request types and structured error types.
//!
//! The `PriceProvider` trait abstracts over price sources (Yahoo chart API,
//! Binance klines API) so we can swap implementations and mock for tests.
//! The cache layer sits above this trait; providers don't know about the cache.

use crate::domain::{PairError, PriceBar};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bar interval shared by all providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "4h")]
    H4,
    #[serde(rename = "1d")]
    D1,
    #[serde(rename = "1w")]
    W1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M1 => "1m",
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::H4 => "4h",
            Interval::D1 => "1d",
            Interval::W1 => "1w",
        }
    }

    pub fn duration(&self) -> Duration {
        match self {
            Interval::M1 => Duration::minutes(1),
            Interval::M5 => Duration::minutes(5),
            Interval::M15 => Duration::minutes(15),
            Interval::M30 => Duration::minutes(30),
            Interval::H1 => Duration::hours(1),
            Interval::H4 => Duration::hours(4),
            Interval::D1 => Duration::days(1),
            Interval::W1 => Duration::weeks(1),
        }
    }

    /// Daily and coarser bars are keyed by calendar date.
    pub fn is_daily_or_coarser(&self) -> bool {
        matches!(self, Interval::D1 | Interval::W1)
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = DataConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(Interval::M1),
            "5m" => Ok(Interval::M5),
            "15m" => Ok(Interval::M15),
            "30m" => Ok(Interval::M30),
            "1h" | "60m" => Ok(Interval::H1),
            "4h" => Ok(Interval::H4),
            "1d" => Ok(Interval::D1),
            "1w" | "1wk" => Ok(Interval::W1),
            other => Err(DataConfigError::InvalidInterval(other.to_string())),
        }
    }
}

/// One symbol's price request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub symbol: String,
    pub start: NaiveDate,
    /// Inclusive end date; `None` means "up to today".
    pub end: Option<NaiveDate>,
    pub interval: Interval,
}

impl FetchRequest {
    pub fn new(symbol: impl Into<String>, start: NaiveDate, end: Option<NaiveDate>, interval: Interval) -> Self {
        Self {
            symbol: symbol.into(),
            start,
            end,
            interval,
        }
    }

    pub fn end_or_today(&self) -> NaiveDate {
        self.end
            .unwrap_or_else(|| chrono::Utc::now().date_naive())
    }

    /// Number of bars the date range spans at this interval (at least 1).
    pub fn expected_bars(&self) -> usize {
        let span = self.end_or_today().signed_duration_since(self.start);
        let per = self.interval.duration().num_seconds().max(1);
        (span.num_seconds().max(0) / per) as usize + 1
    }
}

/// Configuration mistakes: fatal, never retried.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DataConfigError {
    #[error("exactly two symbols required, got {0}")]
    WrongSymbolCount(usize),

    #[error("unsupported asset class '{0}' (use 'etf' or 'crypto')")]
    UnsupportedAssetClass(String),

    #[error("invalid interval '{0}'")]
    InvalidInterval(String),

    #[error("interval {interval} is not offered by {provider}")]
    UnsupportedInterval { provider: &'static str, interval: Interval },

    #[error("start date {start} is after end date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
}

/// Structured error types for data operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("configuration error: {0}")]
    Config(#[from] DataConfigError),

    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("no overlapping timestamps between {symbol_a} and {symbol_b}")]
    NoOverlap { symbol_a: String, symbol_b: String },

    #[error("invalid pair: {0}")]
    Pair(#[from] PairError),

    #[error("cache error: {0}")]
    CacheError(String),

    #[error("parquet I/O error: {0}")]
    ParquetError(String),

    #[error("no cached data for symbol '{symbol}' at interval {interval}")]
    NoCachedData { symbol: String, interval: Interval },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Configuration errors abort the run instead of falling back.
    pub fn is_config_error(&self) -> bool {
        matches!(self, DataError::Config(_))
    }
}

/// Where the data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataSource {
    Yahoo,
    Binance,
    Cache,
    Synthetic,
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataSource::Yahoo => "yahoo",
            DataSource::Binance => "binance",
            DataSource::Cache => "cache",
            DataSource::Synthetic => "synthetic",
        };
        f.write_str(s)
    }
}

/// Result of a successful fetch for a single symbol.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub bars: Vec<PriceBar>,
    pub source: DataSource,
}

/// Trait for price providers.
pub trait PriceProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch close prices for one symbol, sorted by timestamp ascending.
    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError>;

    /// Check if the provider is currently available (not rate-limited, not blocked).
    fn is_available(&self) -> bool;
}
