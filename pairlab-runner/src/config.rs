//! Sweep configuration (TOML), pair lists (YAML) and run identity.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use pairlab_core::data::Interval;
use pairlab_core::domain::AssetClass;
use pairlab_core::engine::{BacktestParams, EngineError};
use pairlab_core::signals::{SignalError, SignalParams};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::metrics::{MetricError, MetricKind};
use crate::sweep::ParamGrid;

/// Unique identifier for a backtest run (content-addressable hash).
pub type RunId = String;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sweep config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid pair list: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("pair #{index} ({symbols}) has {count} symbols, exactly 2 are required")]
    WrongSymbolCount { index: usize, symbols: String, count: usize },
    #[error("grid parameter '{0}' has no values")]
    EmptyGrid(&'static str),
    #[error("rolling window {0} is too small (minimum 2)")]
    InvalidWindow(usize),
    #[error("end date {end} is before start date {start}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("no supported pairs to run")]
    NoPairs,
    #[error(transparent)]
    Signal(#[from] SignalError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Metric(#[from] MetricError),
}

// ─── Sweep TOML ─────────────────────────────────────────────────────

/// Top-level sweep configuration.
///
/// ```toml
/// [sweep]
/// pairs_file = "pairs.yml"
/// start_date = "2023-01-01"
/// interval = "1d"
/// stop_loss = 0.05
///
/// [grid]
/// entry_z = [2.0, 2.5]
/// window = [50]
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    #[serde(default)]
    pub sweep: SweepSection,
    #[serde(default)]
    pub grid: ParamGrid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct SweepSection {
    /// Pair list, resolved relative to the config file.
    pub pairs_file: PathBuf,
    pub start_date: NaiveDate,
    /// Inclusive end date; today when absent.
    pub end_date: Option<NaiveDate>,
    pub interval: Interval,
    pub stop_loss: f64,
    pub output_dir: PathBuf,
    pub cache_dir: PathBuf,
    /// Evaluate grid points on the rayon pool.
    pub parallel: bool,
    /// Subset of metrics to report; all when absent.
    pub metrics: Option<Vec<String>>,
}

impl Default for SweepSection {
    fn default() -> Self {
        Self {
            pairs_file: PathBuf::from("pairs.yml"),
            start_date: default_start_date(),
            end_date: None,
            interval: Interval::D1,
            stop_loss: BacktestParams::default().stop_loss,
            output_dir: PathBuf::from("results"),
            cache_dir: PathBuf::from("data"),
            parallel: true,
            metrics: None,
        }
    }
}

/// Sweeps start on 2023-01-01 unless configured otherwise.
pub fn default_start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default()
}

impl SweepConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: SweepConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A relative `pairs_file` is resolved against the
    /// config file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = read_file(path)?;
        let mut config = Self::from_toml(&content)?;
        if config.sweep.pairs_file.is_relative() {
            if let Some(dir) = path.parent() {
                config.sweep.pairs_file = dir.join(&config.sweep.pairs_file);
            }
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.grid.validate()?;
        self.backtest_params().validate()?;
        if let Some(end) = self.sweep.end_date {
            if end < self.sweep.start_date {
                return Err(ConfigError::InvalidDateRange {
                    start: self.sweep.start_date,
                    end,
                });
            }
        }
        if let Some(names) = &self.sweep.metrics {
            for name in names {
                MetricKind::from_name(name)?;
            }
        }
        Ok(())
    }

    pub fn backtest_params(&self) -> BacktestParams {
        BacktestParams {
            stop_loss: self.sweep.stop_loss,
        }
    }

    pub fn metric_names(&self) -> Option<Vec<&str>> {
        self.sweep.metrics.as_ref().map(|m| m.iter().map(String::as_str).collect())
    }
}

// ─── Pair list YAML ─────────────────────────────────────────────────

/// One raw entry of `pairs.yml`: `{type: etf, symbols: [EEM, VWO]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub symbols: Vec<String>,
}

/// A validated pair: two symbols of a supported asset class.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairSpec {
    pub asset_class: AssetClass,
    pub symbol_a: String,
    pub symbol_b: String,
}

impl PairSpec {
    pub fn new(asset_class: AssetClass, symbol_a: impl Into<String>, symbol_b: impl Into<String>) -> Self {
        Self {
            asset_class,
            symbol_a: symbol_a.into(),
            symbol_b: symbol_b.into(),
        }
    }

    pub fn symbols(&self) -> [String; 2] {
        [self.symbol_a.clone(), self.symbol_b.clone()]
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.symbol_a, self.symbol_b)
    }
}

pub fn parse_pairs(content: &str) -> Result<Vec<PairEntry>, ConfigError> {
    Ok(serde_yaml::from_str(content)?)
}

pub fn load_pairs_file(path: &Path) -> Result<Vec<PairEntry>, ConfigError> {
    parse_pairs(&read_file(path)?)
}

/// Validate raw entries. The type is checked first: unsupported asset
/// classes are skipped with a warning whatever their symbols. A supported
/// entry with a wrong symbol count is fatal.
pub fn resolve_pairs(entries: &[PairEntry]) -> Result<Vec<PairSpec>, ConfigError> {
    let mut pairs = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        let class: AssetClass = match entry.kind.parse() {
            Ok(class) => class,
            Err(_) => {
                warn!(index, kind = %entry.kind, symbols = ?entry.symbols, "skipping pair with unsupported type");
                continue;
            }
        };
        match entry.symbols.as_slice() {
            [a, b] => pairs.push(PairSpec::new(class, a, b)),
            _ => {
                return Err(ConfigError::WrongSymbolCount {
                    index,
                    symbols: entry.symbols.join(","),
                    count: entry.symbols.len(),
                })
            }
        }
    }
    if pairs.is_empty() {
        return Err(ConfigError::NoPairs);
    }
    Ok(pairs)
}

// ─── Single-run identity ────────────────────────────────────────────

/// Everything needed to reproduce one pair × grid-point backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    pub pair: PairSpec,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub interval: Interval,
    pub window: usize,
    pub signal: SignalParams,
    pub backtest: BacktestParams,
}

impl RunConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window < 2 {
            return Err(ConfigError::InvalidWindow(self.window));
        }
        self.signal.validate()?;
        self.backtest.validate()?;
        Ok(())
    }

    /// Deterministic BLAKE3 hash of the serialized config.
    ///
    /// Two runs with identical configs share a RunId, which names their
    /// curve files.
    pub fn run_id(&self) -> RunId {
        let bytes = serde_json::to_vec(self).unwrap_or_else(|_| format!("{self:?}").into_bytes());
        blake3::hash(&bytes).to_hex().to_string()
    }

    /// First 12 hex characters of the run id.
    pub fn short_id(&self) -> String {
        self.run_id()[..12].to_string()
    }
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[sweep]
pairs_file = "pairs.yml"
start_date = "2023-06-01"
end_date = "2024-06-01"
interval = "1h"
stop_loss = 0.1
parallel = false

[grid]
entry_z = [2.0, 3.0]
exit_z = [0.1]
window = [30, 60]
abs_floor = [0.0]
"#;

    #[test]
    fn parses_full_config() {
        let cfg = SweepConfig::from_toml(SAMPLE).unwrap();
        assert_eq!(cfg.sweep.start_date, NaiveDate::from_ymd_opt(2023, 6, 1).unwrap());
        assert_eq!(cfg.sweep.interval, Interval::H1);
        assert!(!cfg.sweep.parallel);
        assert_eq!(cfg.backtest_params().stop_loss, 0.1);
        assert_eq!(cfg.grid.size(), 4);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let cfg = SweepConfig::from_toml("").unwrap();
        assert_eq!(cfg.sweep.start_date, default_start_date());
        assert_eq!(cfg.sweep.interval, Interval::D1);
        assert_eq!(cfg.sweep.output_dir, PathBuf::from("results"));
        assert_eq!(cfg.grid, ParamGrid::default());
        assert_eq!(cfg.grid.size(), 36);
    }

    #[test]
    fn unknown_grid_key_rejected() {
        let err = SweepConfig::from_toml("[grid]\nlookback = [10]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn unknown_section_rejected() {
        assert!(SweepConfig::from_toml("[strategy]\nname = \"x\"\n").is_err());
    }

    #[test]
    fn bad_window_rejected() {
        let err = SweepConfig::from_toml("[grid]\nwindow = [1, 50]\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWindow(1)));
    }

    #[test]
    fn unknown_metric_rejected() {
        let err = SweepConfig::from_toml("[sweep]\nmetrics = [\"calmar\"]\n").unwrap_err();
        assert!(matches!(err, ConfigError::Metric(_)));
    }

    #[test]
    fn reversed_dates_rejected() {
        let err = SweepConfig::from_toml("[sweep]\nstart_date = \"2024-01-01\"\nend_date = \"2023-01-01\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDateRange { .. }));
    }

    #[test]
    fn pairs_skip_unsupported_type() {
        let yaml = "
- type: etf
  symbols: [EEM, VWO]
- type: futures
  symbols: [ES, NQ]
- type: crypto
  symbols: [BTCUSDT, ETHUSDT]
";
        let pairs = resolve_pairs(&parse_pairs(yaml).unwrap()).unwrap();
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[0], PairSpec::new(AssetClass::Etf, "EEM", "VWO"));
        assert_eq!(pairs[1].asset_class, AssetClass::Crypto);
        assert_eq!(pairs[1].label(), "BTCUSDT/ETHUSDT");
    }

    #[test]
    fn unsupported_type_is_skipped_before_symbol_count() {
        let yaml = "- {type: bond, symbols: [TLT]}\n- {type: etf, symbols: [EEM, VWO]}\n";
        let pairs = resolve_pairs(&parse_pairs(yaml).unwrap()).unwrap();
        assert_eq!(pairs, vec![PairSpec::new(AssetClass::Etf, "EEM", "VWO")]);
    }

    #[test]
    fn pairs_with_three_symbols_are_fatal() {
        let yaml = "- type: etf\n  symbols: [A, B, C]\n";
        let err = resolve_pairs(&parse_pairs(yaml).unwrap()).unwrap_err();
        assert!(matches!(err, ConfigError::WrongSymbolCount { count: 3, .. }));
    }

    #[test]
    fn all_pairs_skipped_is_an_error() {
        let yaml = "- type: bonds\n  symbols: [TLT, IEF]\n";
        assert!(matches!(resolve_pairs(&parse_pairs(yaml).unwrap()), Err(ConfigError::NoPairs)));
    }

    fn run_config() -> RunConfig {
        RunConfig {
            pair: PairSpec::new(AssetClass::Etf, "EEM", "VWO"),
            start_date: default_start_date(),
            end_date: None,
            interval: Interval::D1,
            window: 50,
            signal: SignalParams::default(),
            backtest: BacktestParams::default(),
        }
    }

    #[test]
    fn run_id_is_deterministic_and_sensitive() {
        let a = run_config();
        let mut b = run_config();
        assert_eq!(a.run_id(), b.run_id());
        assert_eq!(a.run_id().len(), 64);
        b.window = 60;
        assert_ne!(a.run_id(), b.run_id());
        assert_eq!(a.short_id().len(), 12);
    }

    #[test]
    fn run_config_validation() {
        let mut cfg = run_config();
        assert!(cfg.validate().is_ok());
        cfg.window = 1;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidWindow(1))));
    }

    #[test]
    fn relative_pairs_file_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sweep.toml");
        fs::write(&path, "[sweep]\npairs_file = \"lists/pairs.yml\"\n").unwrap();
        let cfg = SweepConfig::load(&path).unwrap();
        assert_eq!(cfg.sweep.pairs_file, dir.path().join("lists/pairs.yml"));
    }
}
