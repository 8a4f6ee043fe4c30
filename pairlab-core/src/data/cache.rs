//! Parquet cache of close prices with Hive-style partitioning.
//!
//! Layout: `{cache_dir}/symbol={SYMBOL}/interval={INTERVAL}/prices.parquet`
//!
//! - Atomic writes (write to .tmp, rename into place)
//! - Integrity validation on load (schema check, row count > 0)
//! - Quarantine for corrupt files (`prices.parquet.quarantined`)
//! - Metadata sidecar per symbol and interval (hash, range, source)

use super::provider::{DataError, DataSource, Interval};
use crate::domain::PriceBar;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const PRICES_FILE: &str = "prices.parquet";

/// Metadata sidecar for a cached symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheMeta {
    pub symbol: String,
    pub interval: Interval,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub bar_count: usize,
    pub data_hash: String,
    pub source: DataSource,
    pub cached_at: NaiveDateTime,
}

/// How well the cache covers a requested date range.
#[derive(Debug, Clone, PartialEq)]
pub enum CoverageResult {
    NotCached,
    FullyCovered,
    PartiallyCovered { cached_start: NaiveDate, cached_end: NaiveDate },
}

pub struct ParquetCache {
    cache_dir: PathBuf,
}

impl ParquetCache {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// `BTC/USDT` → `BTC-USDT` so crypto symbols stay one path segment.
    pub fn sanitize_symbol(symbol: &str) -> String {
        symbol
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '^' || c == '_' { c } else { '-' })
            .collect()
    }

    fn partition_dir(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.cache_dir
            .join(format!("symbol={}", Self::sanitize_symbol(symbol)))
            .join(format!("interval={interval}"))
    }

    fn prices_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.partition_dir(symbol, interval).join(PRICES_FILE)
    }

    fn meta_path(&self, symbol: &str, interval: Interval) -> PathBuf {
        self.partition_dir(symbol, interval).join("meta.json")
    }

    /// Replace the cached series for `symbol` at `interval`.
    pub fn write(
        &self,
        symbol: &str,
        interval: Interval,
        bars: &[PriceBar],
        source: DataSource,
    ) -> Result<CacheMeta, DataError> {
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Err(DataError::CacheError("no bars to cache".into()));
        };

        let dir = self.partition_dir(symbol, interval);
        fs::create_dir_all(&dir).map_err(|e| DataError::CacheError(format!("failed to create dir: {e}")))?;

        let mut df = bars_to_dataframe(bars)?;
        let path = self.prices_path(symbol, interval);
        let tmp_path = path.with_extension("parquet.tmp");
        write_parquet(&mut df, &tmp_path)?;
        fs::rename(&tmp_path, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            DataError::CacheError(format!("atomic rename failed: {e}"))
        })?;

        let meta = CacheMeta {
            symbol: symbol.to_string(),
            interval,
            start: first.timestamp,
            end: last.timestamp,
            bar_count: bars.len(),
            data_hash: hash_bars(bars),
            source,
            cached_at: chrono::Utc::now().naive_utc(),
        };
        let meta_json = serde_json::to_string_pretty(&meta)
            .map_err(|e| DataError::CacheError(format!("meta serialization: {e}")))?;
        fs::write(self.meta_path(symbol, interval), meta_json)
            .map_err(|e| DataError::CacheError(format!("meta write: {e}")))?;

        debug!(symbol, %interval, bars = bars.len(), "cached prices");
        Ok(meta)
    }

    /// Load cached bars sorted by timestamp. A corrupt file is quarantined.
    pub fn load(&self, symbol: &str, interval: Interval) -> Result<Vec<PriceBar>, DataError> {
        let path = self.prices_path(symbol, interval);
        let no_data = || DataError::NoCachedData {
            symbol: symbol.to_string(),
            interval,
        };
        if !path.exists() {
            return Err(no_data());
        }

        match load_and_validate_parquet(&path) {
            Ok(mut bars) => {
                bars.sort_by_key(|b| b.timestamp);
                Ok(bars)
            }
            Err(e) => {
                let quarantine = path.with_extension("parquet.quarantined");
                warn!(path = %path.display(), error = %e, "quarantining corrupt cache file");
                let _ = fs::rename(&path, &quarantine);
                Err(no_data())
            }
        }
    }

    /// Cached bars restricted to `[start, end]` (inclusive, by date).
    pub fn load_range(
        &self,
        symbol: &str,
        interval: Interval,
        start: NaiveDate,
        end: Option<NaiveDate>,
    ) -> Result<Vec<PriceBar>, DataError> {
        let bars: Vec<PriceBar> = self
            .load(symbol, interval)?
            .into_iter()
            .filter(|b| b.timestamp.date() >= start && end.map_or(true, |e| b.timestamp.date() <= e))
            .collect();
        if bars.is_empty() {
            return Err(DataError::NoCachedData {
                symbol: symbol.to_string(),
                interval,
            });
        }
        Ok(bars)
    }

    pub fn get_meta(&self, symbol: &str, interval: Interval) -> Option<CacheMeta> {
        let content = fs::read_to_string(self.meta_path(symbol, interval)).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn covers_range(&self, symbol: &str, interval: Interval, start: NaiveDate, end: NaiveDate) -> CoverageResult {
        match self.get_meta(symbol, interval) {
            None => CoverageResult::NotCached,
            Some(meta) if meta.start.date() <= start && meta.end.date() >= end => CoverageResult::FullyCovered,
            Some(meta) => CoverageResult::PartiallyCovered {
                cached_start: meta.start.date(),
                cached_end: meta.end.date(),
            },
        }
    }
}

fn hash_bars(bars: &[PriceBar]) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(&bar.timestamp.and_utc().timestamp_millis().to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
    }
    hasher.finalize().to_hex().to_string()
}

// ── Parquet I/O helpers ─────────────────────────────────────────────

fn bars_to_dataframe(bars: &[PriceBar]) -> Result<DataFrame, DataError> {
    let millis: Vec<i64> = bars.iter().map(|b| b.timestamp.and_utc().timestamp_millis()).collect();
    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

    DataFrame::new(vec![
        Column::new("timestamp".into(), millis),
        Column::new("close".into(), closes),
    ])
    .map_err(|e| DataError::ParquetError(format!("dataframe creation: {e}")))
}

fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<(), DataError> {
    let file = fs::File::create(path).map_err(|e| DataError::ParquetError(format!("create file: {e}")))?;
    ParquetWriter::new(file)
        .finish(df)
        .map_err(|e| DataError::ParquetError(format!("write parquet: {e}")))?;
    Ok(())
}

fn load_and_validate_parquet(path: &Path) -> Result<Vec<PriceBar>, DataError> {
    let file = fs::File::open(path).map_err(|e| DataError::ParquetError(format!("open: {e}")))?;
    let df = ParquetReader::new(file)
        .finish()
        .map_err(|e| DataError::ParquetError(format!("read: {e}")))?;

    if df.height() == 0 {
        return Err(DataError::CacheError("empty parquet file".into()));
    }

    let map_err = |e: PolarsError| DataError::ParquetError(format!("column read: {e}"));
    let ts_ca = df
        .column("timestamp")
        .map_err(map_err)?
        .i64()
        .map_err(|e| DataError::ParquetError(format!("timestamp column type: {e}")))?;
    let close_ca = df
        .column("close")
        .map_err(map_err)?
        .f64()
        .map_err(|e| DataError::ParquetError(format!("close column type: {e}")))?;

    let mut bars = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let ms = ts_ca
            .get(i)
            .ok_or_else(|| DataError::ParquetError(format!("null timestamp at row {i}")))?;
        let ts = DateTime::from_timestamp_millis(ms)
            .map(|dt| dt.naive_utc())
            .ok_or_else(|| DataError::ParquetError(format!("invalid timestamp {ms} at row {i}")))?;
        bars.push(PriceBar::new(ts, close_ca.get(i).unwrap_or(f64::NAN)));
    }
    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn sample_bars() -> Vec<PriceBar> {
        vec![PriceBar::new(day(2), 101.0), PriceBar::new(day(3), 102.0), PriceBar::new(day(4), 103.5)]
    }

    #[test]
    fn write_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());

        cache.write("BTC/USDT", Interval::D1, &sample_bars(), DataSource::Binance).unwrap();
        let loaded = cache.load("BTC/USDT", Interval::D1).unwrap();
        assert_eq!(loaded, sample_bars());
        assert!(dir.path().join("symbol=BTC-USDT/interval=1d/prices.parquet").exists());
    }

    #[test]
    fn intervals_are_separate_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("EEM", Interval::D1, &sample_bars(), DataSource::Yahoo).unwrap();
        assert!(matches!(
            cache.load("EEM", Interval::W1),
            Err(DataError::NoCachedData { .. })
        ));
    }

    #[test]
    fn load_range_filters_by_date() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("EEM", Interval::D1, &sample_bars(), DataSource::Yahoo).unwrap();
        let bars = cache
            .load_range("EEM", Interval::D1, day(3).date(), Some(day(3).date()))
            .unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 102.0);
    }

    #[test]
    fn meta_and_coverage() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        let written = cache.write("VWO", Interval::D1, &sample_bars(), DataSource::Yahoo).unwrap();
        let meta = cache.get_meta("VWO", Interval::D1).unwrap();
        assert_eq!(meta, written);
        assert_eq!(meta.bar_count, 3);

        assert_eq!(
            cache.covers_range("VWO", Interval::D1, day(2).date(), day(4).date()),
            CoverageResult::FullyCovered
        );
        assert!(matches!(
            cache.covers_range("VWO", Interval::D1, day(1).date(), day(4).date()),
            CoverageResult::PartiallyCovered { .. }
        ));
        assert_eq!(
            cache.covers_range("QQQ", Interval::D1, day(2).date(), day(4).date()),
            CoverageResult::NotCached
        );
    }

    #[test]
    fn corrupt_file_is_quarantined() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        cache.write("EEM", Interval::D1, &sample_bars(), DataSource::Yahoo).unwrap();
        let path = dir.path().join("symbol=EEM/interval=1d/prices.parquet");
        fs::write(&path, b"not parquet").unwrap();

        assert!(cache.load("EEM", Interval::D1).is_err());
        assert!(!path.exists());
        assert!(path.with_extension("parquet.quarantined").exists());
    }

    #[test]
    fn empty_write_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cache = ParquetCache::new(dir.path());
        assert!(cache.write("EEM", Interval::D1, &[], DataSource::Yahoo).is_err());
    }
}
