//! Pair price source: symbol validation, provider dispatch and alignment.

use super::align::inner_join;
use super::binance::BinanceProvider;
use super::circuit_breaker::CircuitBreaker;
use super::provider::{DataConfigError, DataError, FetchRequest, Interval, PriceProvider};
use super::yahoo::YahooProvider;
use crate::domain::{AssetClass, PairSeries};
use chrono::NaiveDate;
use std::sync::Arc;
use tracing::info;

/// Validate a raw pair definition: exactly two symbols and a known asset class.
pub fn validate_pair_request(symbols: &[String], asset_class: &str) -> Result<AssetClass, DataConfigError> {
    if symbols.len() != 2 {
        return Err(DataConfigError::WrongSymbolCount(symbols.len()));
    }
    asset_class
        .parse::<AssetClass>()
        .map_err(|e| DataConfigError::UnsupportedAssetClass(e.0))
}

/// Dispatches pair requests to the provider for the asset class.
pub struct PairSource {
    etf: Box<dyn PriceProvider>,
    crypto: Box<dyn PriceProvider>,
}

impl PairSource {
    pub fn new(etf: Box<dyn PriceProvider>, crypto: Box<dyn PriceProvider>) -> Self {
        Self { etf, crypto }
    }

    /// Yahoo for ETFs and Binance for crypto, sharing one circuit breaker.
    pub fn live() -> Result<Self, DataError> {
        let breaker = Arc::new(CircuitBreaker::default_provider());
        Ok(Self::new(
            Box::new(YahooProvider::new(Arc::clone(&breaker))?),
            Box::new(BinanceProvider::new(breaker)?),
        ))
    }

    pub fn provider(&self, class: AssetClass) -> &dyn PriceProvider {
        match class {
            AssetClass::Etf => self.etf.as_ref(),
            AssetClass::Crypto => self.crypto.as_ref(),
        }
    }

    pub fn fetch_pair(
        &self,
        symbols: &[String],
        asset_class: &str,
        start: NaiveDate,
        end: Option<NaiveDate>,
        interval: Interval,
    ) -> Result<PairSeries, DataError> {
        let class = validate_pair_request(symbols, asset_class)?;
        if let Some(end) = end {
            if end < start {
                return Err(DataConfigError::InvalidDateRange { start, end }.into());
            }
        }

        let provider = self.provider(class);
        let a = provider.fetch(&FetchRequest::new(&symbols[0], start, end, interval))?;
        let b = provider.fetch(&FetchRequest::new(&symbols[1], start, end, interval))?;
        let pair = inner_join(&a.symbol, &a.bars, &b.symbol, &b.bars)?;
        info!(
            pair = %pair.label(),
            provider = provider.name(),
            bars = pair.len(),
            dropped_a = a.bars.len().saturating_sub(pair.len()),
            dropped_b = b.bars.len().saturating_sub(pair.len()),
            "fetched pair prices"
        );
        Ok(pair)
    }
}

/// Fetch and align the closes of two symbols from the live providers.
pub fn fetch_pair_prices(
    symbols: &[String],
    asset_class: &str,
    start: NaiveDate,
    end: Option<NaiveDate>,
    interval: Interval,
) -> Result<PairSeries, DataError> {
    validate_pair_request(symbols, asset_class)?;
    PairSource::live()?.fetch_pair(symbols, asset_class, start, end, interval)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{DataSource, FetchResult};
    use crate::domain::PriceBar;

    struct MockProvider {
        name: &'static str,
    }

    impl PriceProvider for MockProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, DataError> {
            let base = request.start.and_time(chrono::NaiveTime::MIN);
            // Leg "B" skips the second bar to exercise the join.
            let bars = (0..5)
                .filter(|i| !(request.symbol == "B" && *i == 1))
                .map(|i| PriceBar::new(base + chrono::Duration::days(i), 10.0 + i as f64))
                .collect();
            Ok(FetchResult {
                symbol: request.symbol.clone(),
                bars,
                source: DataSource::Synthetic,
            })
        }

        fn is_available(&self) -> bool {
            true
        }
    }

    fn source() -> PairSource {
        PairSource::new(
            Box::new(MockProvider { name: "etf-mock" }),
            Box::new(MockProvider { name: "crypto-mock" }),
        )
    }

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
    }

    #[test]
    fn wrong_symbol_count_is_config_error() {
        let one = vec!["A".to_string()];
        let err = source().fetch_pair(&one, "etf", start(), None, Interval::D1).unwrap_err();
        assert!(matches!(err, DataError::Config(DataConfigError::WrongSymbolCount(1))));
    }

    #[test]
    fn unknown_asset_class_is_config_error() {
        let syms = vec!["A".to_string(), "B".to_string()];
        let err = source().fetch_pair(&syms, "bond", start(), None, Interval::D1).unwrap_err();
        assert!(err.is_config_error());
    }

    #[test]
    fn fetch_joins_both_legs() {
        let syms = vec!["A".to_string(), "B".to_string()];
        let pair = source().fetch_pair(&syms, "crypto", start(), None, Interval::D1).unwrap();
        assert_eq!(pair.len(), 4);
        assert_eq!(pair.symbol_a, "A");
        assert_eq!(source().provider(AssetClass::Crypto).name(), "crypto-mock");
    }

    #[test]
    fn reversed_dates_rejected() {
        let syms = vec!["A".to_string(), "B".to_string()];
        let end = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let err = source().fetch_pair(&syms, "etf", start(), Some(end), Interval::D1).unwrap_err();
        assert!(matches!(err, DataError::Config(DataConfigError::InvalidDateRange { .. })));
    }
}
