//! Pair loading and data resolution for the runner.
//!
//! Each leg is resolved independently, then the two are inner-joined:
//! 1. Cached data covering the range → use it (offline: any cached data)
//! 2. Otherwise, with a provider → fetch, cache, use
//! 3. If either leg failed and synthetic fallback is on → synthetic pair (tagged)
//! 4. Otherwise → fail with a clear error
//!
//! Configuration errors (bad symbol count, unknown asset class, unsupported
//! interval) always abort, even with the synthetic fallback enabled.

use chrono::{Duration, NaiveDate, Utc};
use pairlab_core::data::{
    generate_pair, inner_join, CoverageResult, DataConfigError, DataError, DataSource, FetchRequest, Interval,
    PairSource, ParquetCache, SyntheticPairConfig,
};
use pairlab_core::domain::{AssetClass, PairSeries, PriceBar};
use pairlab_core::stats::{engle_granger, CointegrationResult};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::{default_start_date, PairSpec};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no cached data for '{symbol}' and no network access (use --synthetic for synthetic data)")]
    NoCachedDataOffline { symbol: String },

    #[error("no cached data for '{symbol}' and download failed: {reason}")]
    DownloadFailed { symbol: String, reason: String },

    #[error("invalid request: {0}")]
    Config(#[from] DataConfigError),

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

/// Options controlling how pairs are loaded.
#[derive(Debug, Clone)]
pub struct LoadOptions {
    pub start: NaiveDate,
    /// Inclusive end date; today when absent.
    pub end: Option<NaiveDate>,
    pub interval: Interval,
    /// Never make network requests.
    pub offline: bool,
    /// Generate a synthetic pair when real data is unavailable.
    pub synthetic: bool,
    /// Refetch even if cached.
    pub force: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            start: default_start_date(),
            end: None,
            interval: Interval::D1,
            offline: false,
            synthetic: false,
            force: false,
        }
    }
}

impl LoadOptions {
    fn request(&self, symbol: &str) -> FetchRequest {
        FetchRequest::new(symbol, self.start, self.end, self.interval)
    }
}

/// An aligned pair plus provenance and static diagnostics.
#[derive(Debug, Clone)]
pub struct LoadedPair {
    pub spec: PairSpec,
    pub series: PairSeries,
    /// Source of leg A and leg B.
    pub sources: [DataSource; 2],
    /// BLAKE3 over the aligned prices.
    pub dataset_hash: String,
    pub is_synthetic: bool,
    /// Full-sample Engle–Granger diagnostics; `None` if the test could not run.
    pub cointegration: Option<CointegrationResult>,
}

impl LoadedPair {
    /// Wrap an already aligned series, computing hash and diagnostics.
    pub fn from_series(spec: PairSpec, series: PairSeries, sources: [DataSource; 2]) -> Self {
        let cointegration = match engle_granger(&series.price_a, &series.price_b) {
            Ok(result) => {
                debug!(
                    pair = %spec.label(),
                    hedge_ratio = result.hedge_ratio,
                    adf = result.adf.statistic,
                    p_value = result.adf.p_value,
                    "cointegration diagnostics"
                );
                Some(result)
            }
            Err(e) => {
                warn!(pair = %spec.label(), error = %e, "cointegration test unavailable");
                None
            }
        };
        let is_synthetic = sources.contains(&DataSource::Synthetic);
        Self {
            dataset_hash: series.dataset_hash(),
            spec,
            series,
            sources,
            is_synthetic,
            cointegration,
        }
    }

    pub fn adf_statistic(&self) -> Option<f64> {
        self.cointegration.as_ref().map(|c| c.adf.statistic)
    }

    pub fn adf_p_value(&self) -> Option<f64> {
        self.cointegration.as_ref().map(|c| c.adf.p_value)
    }
}

/// Resolve one pair through cache → provider → synthetic.
pub fn load_pair(
    spec: &PairSpec,
    cache: &ParquetCache,
    source: Option<&PairSource>,
    opts: &LoadOptions,
) -> Result<LoadedPair, LoadError> {
    if let Some(end) = opts.end {
        if end < opts.start {
            return Err(DataConfigError::InvalidDateRange { start: opts.start, end }.into());
        }
    }

    let legs = load_leg(&spec.symbol_a, spec, cache, source, opts)
        .and_then(|a| load_leg(&spec.symbol_b, spec, cache, source, opts).map(|b| (a, b)));

    let ((bars_a, source_a), (bars_b, source_b)) = match legs {
        Ok(legs) => legs,
        Err(e) if is_fatal(&e) => return Err(e),
        Err(e) if opts.synthetic => {
            warn!(pair = %spec.label(), error = %e, "real data unavailable, using synthetic pair");
            return synthetic_pair(spec, opts);
        }
        Err(e) => return Err(e),
    };

    let series = inner_join(&spec.symbol_a, &bars_a, &spec.symbol_b, &bars_b)?;
    info!(
        pair = %spec.label(),
        bars = series.len(),
        source_a = %source_a,
        source_b = %source_b,
        "pair loaded"
    );
    Ok(LoadedPair::from_series(spec.clone(), series, [source_a, source_b]))
}

/// Load every pair, skipping (with a warning) those that fail for data
/// reasons. Configuration errors abort.
pub fn load_pairs(
    specs: &[PairSpec],
    cache: &ParquetCache,
    source: Option<&PairSource>,
    opts: &LoadOptions,
) -> Result<Vec<LoadedPair>, LoadError> {
    let mut loaded = Vec::with_capacity(specs.len());
    for spec in specs {
        match load_pair(spec, cache, source, opts) {
            Ok(pair) => loaded.push(pair),
            Err(e) if is_fatal(&e) => return Err(e),
            Err(e) => warn!(pair = %spec.label(), error = %e, "skipping pair"),
        }
    }
    Ok(loaded)
}

/// Fetch one symbol's bars and write them to the cache, regardless of what
/// is already cached.
pub fn download_symbol(
    symbol: &str,
    asset_class: AssetClass,
    cache: &ParquetCache,
    source: &PairSource,
    opts: &LoadOptions,
) -> Result<usize, LoadError> {
    let fetched = source.provider(asset_class).fetch(&opts.request(symbol))?;
    cache.write(symbol, opts.interval, &fetched.bars, fetched.source)?;
    Ok(fetched.bars.len())
}

fn is_fatal(e: &LoadError) -> bool {
    match e {
        LoadError::Config(_) => true,
        LoadError::Data(d) => d.is_config_error(),
        _ => false,
    }
}

/// Oldest cached end date that still counts as up to date.
///
/// An explicit end must be covered exactly. An open-ended request accepts a
/// cache that stops short of `today` by the usual gap to the last completed
/// bar: a long weekend for daily bars, one bar for weekly, a day intraday.
fn required_cache_end(end: Option<NaiveDate>, interval: Interval, today: NaiveDate) -> NaiveDate {
    if let Some(end) = end {
        return end;
    }
    let slack = match interval {
        Interval::D1 => Duration::days(4),
        Interval::W1 => Duration::weeks(1),
        _ => Duration::days(1),
    };
    today - slack
}

fn load_leg(
    symbol: &str,
    spec: &PairSpec,
    cache: &ParquetCache,
    source: Option<&PairSource>,
    opts: &LoadOptions,
) -> Result<(Vec<PriceBar>, DataSource), LoadError> {
    let end = required_cache_end(opts.end, opts.interval, Utc::now().date_naive());

    if !opts.force {
        let usable = opts.offline
            || matches!(cache.covers_range(symbol, opts.interval, opts.start, end), CoverageResult::FullyCovered);
        if usable {
            if let Ok(bars) = cache.load_range(symbol, opts.interval, opts.start, opts.end) {
                debug!(symbol, bars = bars.len(), "cache hit");
                return Ok((bars, DataSource::Cache));
            }
        }
    }

    let provider = match source {
        Some(source) if !opts.offline => source.provider(spec.asset_class),
        _ => {
            return Err(LoadError::NoCachedDataOffline {
                symbol: symbol.to_string(),
            })
        }
    };

    match provider.fetch(&opts.request(symbol)) {
        Ok(fetched) => {
            if let Err(e) = cache.write(symbol, opts.interval, &fetched.bars, fetched.source) {
                warn!(symbol, error = %e, "failed to cache fetched prices");
            }
            Ok((fetched.bars, fetched.source))
        }
        Err(e) if e.is_config_error() => Err(e.into()),
        Err(e) => Err(LoadError::DownloadFailed {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        }),
    }
}

/// Seeded synthetic pair named after the requested symbols.
fn synthetic_pair(spec: &PairSpec, opts: &LoadOptions) -> Result<LoadedPair, LoadError> {
    let seed_bytes = blake3::hash(spec.label().as_bytes());
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&seed_bytes.as_bytes()[..8]);

    let config = SyntheticPairConfig {
        symbol_a: spec.symbol_a.clone(),
        symbol_b: spec.symbol_b.clone(),
        bars: opts.request(&spec.symbol_a).expected_bars().max(2),
        seed: u64::from_le_bytes(seed),
        start: opts.start,
        ..Default::default()
    };
    let series = generate_pair(&config)?;
    Ok(LoadedPair::from_series(
        spec.clone(),
        series,
        [DataSource::Synthetic, DataSource::Synthetic],
    ))
}
