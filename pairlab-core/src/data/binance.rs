//! Binance spot klines provider for crypto pairs.
//!
//! One request returns at most `MAX_BARS` candles. Longer ranges are clamped
//! to the first `MAX_BARS` bars from the start date and logged as a warning.

use super::circuit_breaker::CircuitBreaker;
use super::http::RetryingClient;
use super::provider::{DataError, DataSource, FetchRequest, FetchResult, PriceProvider};
use super::yahoo::bar_timestamp;
use crate::domain::PriceBar;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

/// Per-request candle limit of the klines endpoint.
pub const MAX_BARS: usize = 1000;

const BASE_URL: &str = "https://api.binance.com/api/v3/klines";

pub struct BinanceProvider {
    http: RetryingClient,
}

impl BinanceProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: RetryingClient::new(circuit_breaker)?,
        })
    }

    /// `BTC/USDT` → `BTCUSDT`.
    pub fn market_symbol(symbol: &str) -> String {
        symbol.chars().filter(|c| *c != '/' && *c != '-').collect::<String>().to_uppercase()
    }

    /// Bars to request, clamped to the endpoint limit.
    pub fn request_limit(request: &FetchRequest) -> usize {
        let wanted = request.expected_bars();
        if wanted > MAX_BARS {
            warn!(
                symbol = %request.symbol,
                requested = wanted,
                limit = MAX_BARS,
                "crypto history is limited to {MAX_BARS} bars per request; \
                 reduce the date range or use a coarser interval"
            );
        }
        wanted.min(MAX_BARS)
    }

    fn klines_url(request: &FetchRequest, limit: usize) -> String {
        let start_ms = request
            .start
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp_millis();
        format!(
            "{BASE_URL}?symbol={}&interval={}&startTime={start_ms}&limit={limit}",
            Self::market_symbol(&request.symbol),
            request.interval.as_str()
        )
    }

    /// Rows are `[openTime, open, high, low, close, volume, ...]` with prices as strings.
    fn parse_klines(symbol: &str, request: &FetchRequest, rows: Vec<Vec<Value>>) -> Result<Vec<PriceBar>, DataError> {
        let mut bars = Vec::with_capacity(rows.len());
        for row in rows {
            let open_ms = row
                .first()
                .and_then(Value::as_i64)
                .ok_or_else(|| DataError::ResponseFormatChanged("kline without open time".into()))?;
            let close = row
                .get(4)
                .and_then(|v| match v {
                    Value::String(s) => s.parse::<f64>().ok(),
                    Value::Number(n) => n.as_f64(),
                    _ => None,
                })
                .ok_or_else(|| DataError::ResponseFormatChanged("kline without close price".into()))?;
            let ts = bar_timestamp(open_ms.div_euclid(1000), request.interval)?;
            if let Some(end) = request.end {
                if ts.date() > end {
                    break;
                }
            }
            bars.push(PriceBar::new(ts, close));
        }
        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        Ok(bars)
    }
}

impl PriceProvider for BinanceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        let limit = Self::request_limit(request);
        let url = Self::klines_url(request, limit);
        let rows: Vec<Vec<Value>> = self.http.get_json(&url, &request.symbol)?;
        let bars = Self::parse_klines(&request.symbol, request, rows)?;
        Ok(FetchResult {
            symbol: request.symbol.clone(),
            bars,
            source: DataSource::Binance,
        })
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::Interval;
    use chrono::NaiveDate;

    fn request(days: i64) -> FetchRequest {
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        FetchRequest::new("BTC/USDT", start, Some(start + chrono::Duration::days(days)), Interval::D1)
    }

    #[test]
    fn symbol_is_normalized() {
        assert_eq!(BinanceProvider::market_symbol("btc/usdt"), "BTCUSDT");
        assert_eq!(BinanceProvider::market_symbol("ETH-USDT"), "ETHUSDT");
    }

    #[test]
    fn long_ranges_are_clamped_not_rejected() {
        assert_eq!(BinanceProvider::request_limit(&request(99)), 100);
        assert_eq!(BinanceProvider::request_limit(&request(2000)), MAX_BARS);
    }

    #[test]
    fn url_contains_start_and_limit() {
        let url = BinanceProvider::klines_url(&request(9), 10);
        assert!(url.starts_with(BASE_URL));
        assert!(url.contains("symbol=BTCUSDT"));
        assert!(url.contains("interval=1d"));
        assert!(url.contains("startTime=1640995200000"));
        assert!(url.ends_with("limit=10"));
    }

    #[test]
    fn parses_string_closes_and_stops_at_end() {
        let rows: Vec<Vec<Value>> = serde_json::from_str(
            r#"[[1640995200000,"46000.0","47000.0","45000.0","46500.5","1.0"],
                [1641081600000,"46500.5","48000.0","46000.0","47100.0","1.0"],
                [1641168000000,"47100.0","47500.0","46000.0","46200.0","1.0"]]"#,
        )
        .unwrap();
        let bars = BinanceProvider::parse_klines("BTC/USDT", &request(1), rows).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 46500.5);
        assert_eq!(bars[1].timestamp.date(), NaiveDate::from_ymd_opt(2022, 1, 2).unwrap());
    }

    #[test]
    fn malformed_row_is_format_error() {
        let rows: Vec<Vec<Value>> = serde_json::from_str(r#"[["x"]]"#).unwrap();
        assert!(matches!(
            BinanceProvider::parse_klines("BTC/USDT", &request(1), rows),
            Err(DataError::ResponseFormatChanged(_))
        ));
    }
}
