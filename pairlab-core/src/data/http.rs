//! Blocking HTTP client with retry, exponential backoff and the circuit breaker.
//!
//! Both price providers go through `RetryingClient::get_json`, so ban and
//! rate-limit handling is identical across sources.

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub struct RetryingClient {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingClient {
    pub fn new(circuit_breaker: Arc<CircuitBreaker>) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    pub fn with_retries(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.base_delay = base_delay;
        self
    }

    pub fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }

    /// GET `url` and decode the JSON body.
    ///
    /// 403 trips the breaker; 429 and 5xx are retried with backoff;
    /// 400/404 mean the symbol is unknown and are not retried.
    pub fn get_json<T: DeserializeOwned>(&self, url: &str, symbol: &str) -> Result<T, DataError> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                debug!(symbol, attempt, delay_ms = delay.as_millis() as u64, "retrying request");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(DataError::CircuitBreakerTripped);
            }

            let resp = match self.client.get(url).send() {
                Ok(resp) => resp,
                Err(e) if e.is_connect() || e.is_timeout() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::NetworkUnreachable(e.to_string()));
                    continue;
                }
                Err(e) => return Err(DataError::NetworkUnreachable(e.to_string())),
            };

            let status = resp.status();
            match status {
                StatusCode::FORBIDDEN => {
                    self.circuit_breaker.trip();
                    return Err(DataError::CircuitBreakerTripped);
                }
                StatusCode::TOO_MANY_REQUESTS | StatusCode::IM_A_TEAPOT => {
                    self.circuit_breaker.record_failure();
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    warn!(symbol, retry_after, "rate limited by provider");
                    last_error = Some(DataError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                    continue;
                }
                StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND => {
                    return Err(DataError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    });
                }
                s if !s.is_success() => {
                    self.circuit_breaker.record_failure();
                    last_error = Some(DataError::Other(format!("HTTP {s} for {symbol}")));
                    continue;
                }
                _ => {}
            }

            let body: T = resp.json().map_err(|e| {
                DataError::ResponseFormatChanged(format!("failed to parse response for {symbol}: {e}"))
            })?;
            self.circuit_breaker.record_success();
            return Ok(body);
        }

        Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
    }
}
