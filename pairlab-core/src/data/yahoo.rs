//! Yahoo Finance provider for ETFs and equities.
//!
//! Fetches closes from Yahoo's v8 chart API, preferring the adjusted close.
//! Yahoo has no official API and is subject to unannounced format changes.

use super::circuit_breaker::CircuitBreaker;
use super::http::RetryingClient;
use super::provider::{DataConfigError, DataError, DataSource, FetchRequest, FetchResult, Interval, PriceProvider};
use crate::domain::PriceBar;
use chrono::{DateTime, NaiveDateTime};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

pub struct YahooProvider {
    http: RetryingClient,
}

impl YahooProvider {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        Ok(Self {
            http: RetryingClient::new(circuit_breaker)?,
        })
    }

    fn interval_param(interval: Interval) -> Result<&'static str, DataError> {
        match interval {
            Interval::M1 => Ok("1m"),
            Interval::M5 => Ok("5m"),
            Interval::M15 => Ok("15m"),
            Interval::M30 => Ok("30m"),
            Interval::H1 => Ok("60m"),
            Interval::D1 => Ok("1d"),
            Interval::W1 => Ok("1wk"),
            Interval::H4 => Err(DataConfigError::UnsupportedInterval {
                provider: "yahoo",
                interval,
            }
            .into()),
        }
    }

    fn chart_url(request: &FetchRequest) -> Result<String, DataError> {
        let interval = Self::interval_param(request.interval)?;
        let start_ts = request.start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        let end_ts = request
            .end_or_today()
            .and_hms_opt(23, 59, 59)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(start_ts);
        Ok(format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{}\
             ?period1={start_ts}&period2={end_ts}&interval={interval}\
             &includeAdjustedClose=true",
            request.symbol
        ))
    }

    fn parse_response(
        symbol: &str,
        interval: Interval,
        resp: ChartResponse,
    ) -> Result<Vec<PriceBar>, DataError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => DataError::ResponseFormatChanged(format!("{}: {}", err.code, err.description)),
            None => DataError::ResponseFormatChanged("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("result array is empty".into()))?;
        let timestamps = data
            .timestamp
            .ok_or_else(|| DataError::ResponseFormatChanged("no timestamps".into()))?;
        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::ResponseFormatChanged("no quote data".into()))?;
        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        let mut bars = Vec::with_capacity(timestamps.len());
        for (i, &ts) in timestamps.iter().enumerate() {
            let close = adj_closes
                .as_ref()
                .and_then(|v| v.get(i).copied().flatten())
                .or_else(|| quote.close.get(i).copied().flatten());
            // Holidays and halted sessions come back as nulls.
            let Some(close) = close else { continue };
            bars.push(PriceBar::new(bar_timestamp(ts, interval)?, close));
        }

        if bars.is_empty() {
            return Err(DataError::SymbolNotFound {
                symbol: symbol.to_string(),
            });
        }
        bars.sort_by_key(|b| b.timestamp);
        Ok(bars)
    }
}

/// Seconds since epoch to a bar key; daily and weekly bars land on midnight.
pub(crate) fn bar_timestamp(secs: i64, interval: Interval) -> Result<NaiveDateTime, DataError> {
    let dt = DateTime::from_timestamp(secs, 0)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| DataError::ResponseFormatChanged(format!("invalid timestamp: {secs}")))?;
    if interval.is_daily_or_coarser() {
        Ok(dt.date().and_time(chrono::NaiveTime::MIN))
    } else {
        Ok(dt)
    }
}

impl PriceProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo"
    }

    fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
        let url = Self::chart_url(request)?;
        let chart: ChartResponse = self.http.get_json(&url, &request.symbol)?;
        let bars = Self::parse_response(&request.symbol, request.interval, chart)?;
        Ok(FetchResult {
            symbol: request.symbol.clone(),
            bars,
            source: DataSource::Yahoo,
        })
    }

    fn is_available(&self) -> bool {
        self.http.is_available()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn parse(json: &str) -> Result<Vec<PriceBar>, DataError> {
        let resp: ChartResponse = serde_json::from_str(json).unwrap();
        YahooProvider::parse_response("EEM", Interval::D1, resp)
    }

    #[test]
    fn prefers_adjusted_close_and_skips_nulls() {
        // 2024-01-02 14:30 UTC, 2024-01-03 14:30 UTC, 2024-01-04 14:30 UTC
        let json = r#"{"chart":{"result":[{"timestamp":[1704205800,1704292200,1704378600],
            "indicators":{"quote":[{"close":[40.0,null,41.0]}],
            "adjclose":[{"adjclose":[39.5,null,null]}]}}],"error":null}}"#;
        let bars = parse(json).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 39.5);
        assert_eq!(bars[1].close, 41.0, "falls back to raw close");
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(bars[0].timestamp, day);
    }

    #[test]
    fn not_found_maps_to_symbol_error() {
        let json = r#"{"chart":{"result":null,"error":{"code":"Not Found","description":"No data found"}}}"#;
        assert!(matches!(parse(json), Err(DataError::SymbolNotFound { .. })));
    }

    #[test]
    fn four_hour_interval_is_unsupported() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let req = FetchRequest::new("EEM", start, None, Interval::H4);
        let err = YahooProvider::chart_url(&req).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn chart_url_carries_interval() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let url = YahooProvider::chart_url(&FetchRequest::new("VWO", start, Some(end), Interval::W1)).unwrap();
        assert!(url.contains("/chart/VWO?"));
        assert!(url.contains("interval=1wk"));
        assert!(url.contains("period1=1704067200"));
    }
}
