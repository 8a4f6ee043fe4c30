//! Price data: providers, alignment, caching and the synthetic generator.

pub mod align;
pub mod binance;
pub mod cache;
pub mod circuit_breaker;
pub mod http;
pub mod pair_source;
pub mod provider;
pub mod synthetic;
pub mod yahoo;

pub use align::inner_join;
pub use binance::BinanceProvider;
pub use cache::{CacheMeta, CoverageResult, ParquetCache};
pub use circuit_breaker::CircuitBreaker;
pub use pair_source::{fetch_pair_prices, validate_pair_request, PairSource};
pub use provider::{DataConfigError, DataError, DataSource, FetchRequest, FetchResult, Interval, PriceProvider};
pub use synthetic::{generate_pair, SyntheticPairConfig};
pub use yahoo::YahooProvider;
