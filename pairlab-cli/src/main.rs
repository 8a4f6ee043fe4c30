//! PairLab CLI: download, single-run and sweep commands.
//!
//! Commands:
//! - `download`: fetch closes for one or more symbols and cache them as Parquet
//! - `run`: backtest one pair at one parameter set
//! - `sweep`: backtest every pair of a pair list over a parameter grid

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use pairlab_core::data::{validate_pair_request, Interval, PairSource, ParquetCache};
use pairlab_core::domain::AssetClass;
use pairlab_core::engine::BacktestParams;
use pairlab_core::signals::SignalParams;
use pairlab_runner::{
    download_symbol, load_pair, load_pairs, load_pairs_file, resolve_pairs, run_pair_backtest, save_run_artifacts,
    save_sweep_artifacts, LoadOptions, LoadedPair, PairRunResult, PairSpec, ParamSweep, RunConfig, RunConfigTemplate,
    StrategyParams, SweepConfig, SweepResults,
};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pairlab", about = "PairLab CLI: pairs-trading backtester")]
struct Cli {
    /// Log progress (info level).
    #[arg(long, global = true)]
    verbose: bool,

    /// Log everything (debug level).
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch closes and cache them as Parquet.
    Download {
        /// Symbols to download (e.g., EEM VWO).
        #[arg(required = true)]
        symbols: Vec<String>,

        /// Asset class: etf or crypto.
        #[arg(long = "type", default_value = "etf")]
        asset_class: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,
    },
    /// Backtest one pair at one parameter set.
    Run {
        /// The two symbols of the pair: leg A (regressed) then leg B.
        #[arg(num_args = 2, required = true)]
        symbols: Vec<String>,

        /// Asset class: etf or crypto.
        #[arg(long = "type", default_value = "etf")]
        asset_class: String,

        #[command(flatten)]
        range: RangeArgs,

        /// Rolling window for the regression and the z-score.
        #[arg(long, default_value_t = 50)]
        window: usize,

        #[arg(long, default_value_t = 2.5)]
        entry_z: f64,

        #[arg(long, default_value_t = 0.05)]
        exit_z: f64,

        /// Minimum |residual| required to enter.
        #[arg(long, default_value_t = 0.0)]
        abs_floor: f64,

        /// Fixed-fraction stop-loss per leg.
        #[arg(long, default_value_t = 0.05)]
        stop_loss: f64,

        #[command(flatten)]
        load: LoadArgs,

        /// Cache directory.
        #[arg(long, default_value = "data")]
        cache_dir: PathBuf,

        /// Output directory for trace and trade CSVs.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Backtest a pair list over a parameter grid.
    Sweep {
        /// Path to the sweep TOML config.
        #[arg(long, default_value = "sweep.toml")]
        config: PathBuf,

        #[command(flatten)]
        load: LoadArgs,

        /// Evaluate grid points on one thread.
        #[arg(long)]
        sequential: bool,

        /// Override the configured output directory.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Rows to print per pair in the summary.
        #[arg(long, default_value_t = 3)]
        top: usize,
    },
}

#[derive(Args)]
struct RangeArgs {
    /// Start date (YYYY-MM-DD). Defaults to 2023-01-01.
    #[arg(long)]
    start: Option<String>,

    /// End date (YYYY-MM-DD). Defaults to today.
    #[arg(long)]
    end: Option<String>,

    /// Bar interval (1m, 5m, 15m, 30m, 1h, 4h, 1d, 1w).
    #[arg(long, default_value = "1d")]
    interval: String,
}

impl RangeArgs {
    fn resolve(&self) -> Result<(NaiveDate, Option<NaiveDate>, Interval)> {
        let start = self
            .start
            .as_deref()
            .map(parse_date)
            .transpose()?
            .unwrap_or_else(pairlab_runner::config::default_start_date);
        let end = self.end.as_deref().map(parse_date).transpose()?;
        let interval: Interval = self.interval.parse()?;
        Ok((start, end, interval))
    }
}

#[derive(Args)]
struct LoadArgs {
    /// Offline mode: no network access.
    #[arg(long)]
    offline: bool,

    /// Use a synthetic pair when real data is unavailable.
    #[arg(long)]
    synthetic: bool,

    /// Refetch even if cached.
    #[arg(long)]
    force: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.debug);

    match cli.command {
        Commands::Download {
            symbols,
            asset_class,
            range,
            cache_dir,
        } => run_download(&symbols, &asset_class, &range, cache_dir),
        Commands::Run {
            symbols,
            asset_class,
            range,
            window,
            entry_z,
            exit_z,
            abs_floor,
            stop_loss,
            load,
            cache_dir,
            output_dir,
        } => {
            let (start, end, interval) = range.resolve()?;
            let class = validate_pair_request(&symbols, &asset_class)?;
            let config = RunConfig {
                pair: PairSpec::new(class, &symbols[0], &symbols[1]),
                start_date: start,
                end_date: end,
                interval,
                window,
                signal: SignalParams::new(entry_z, exit_z, abs_floor),
                backtest: BacktestParams { stop_loss },
            };
            run_single_cmd(&config, &load, cache_dir, output_dir)
        }
        Commands::Sweep {
            config,
            load,
            sequential,
            output_dir,
            top,
        } => run_sweep_cmd(config, &load, sequential, output_dir, top),
    }
}

/// Default level warn; `--verbose` info, `--debug` debug. `RUST_LOG` wins.
fn init_tracing(verbose: bool, debug: bool) {
    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| format!("invalid date '{s}' (expected YYYY-MM-DD)"))
}

fn live_source(offline: bool) -> Result<Option<PairSource>> {
    if offline {
        return Ok(None);
    }
    Ok(Some(PairSource::live()?))
}

fn run_download(symbols: &[String], asset_class: &str, range: &RangeArgs, cache_dir: PathBuf) -> Result<()> {
    let (start, end, interval) = range.resolve()?;
    let class: AssetClass = asset_class.parse()?;
    let cache = ParquetCache::new(cache_dir);
    let source = PairSource::live()?;
    let opts = LoadOptions {
        start,
        end,
        interval,
        ..Default::default()
    };

    let mut failed = 0;
    for symbol in symbols {
        match download_symbol(symbol, class, &cache, &source, &opts) {
            Ok(bars) => println!("{symbol}: {bars} bars cached"),
            Err(e) => {
                eprintln!("Error for {symbol}: {e}");
                failed += 1;
            }
        }
    }
    if failed > 0 {
        bail!("{failed} of {} downloads failed", symbols.len());
    }
    Ok(())
}

fn run_single_cmd(config: &RunConfig, load: &LoadArgs, cache_dir: PathBuf, output_dir: PathBuf) -> Result<()> {
    config.validate()?;
    if load.offline && load.force {
        bail!("--force needs network access; drop --offline");
    }

    let cache = ParquetCache::new(cache_dir);
    let source = live_source(load.offline)?;
    let opts = LoadOptions {
        start: config.start_date,
        end: config.end_date,
        interval: config.interval,
        offline: load.offline,
        synthetic: load.synthetic,
        force: load.force,
    };
    let loaded = load_pair(&config.pair, &cache, source.as_ref(), &opts)?;

    let params = StrategyParams {
        window: config.window,
        signal: config.signal,
    };
    let result = run_pair_backtest(&loaded.series, &params, &config.backtest, None)?;
    let run_id = config.run_id();
    let path = save_run_artifacts(&result.trace, &result.trades, &run_id, &output_dir)?;

    print_run_summary(&loaded, &result, &run_id);
    println!("\nTrace saved to: {}", path.display());
    Ok(())
}

fn run_sweep_cmd(
    config_path: PathBuf,
    load: &LoadArgs,
    sequential: bool,
    output_dir: Option<PathBuf>,
    top: usize,
) -> Result<()> {
    let config = SweepConfig::load(&config_path)?;
    let pairs = resolve_pairs(&load_pairs_file(&config.sweep.pairs_file)?)?;
    info!(pairs = pairs.len(), grid = config.grid.size(), "starting sweep");

    let cache = ParquetCache::new(&config.sweep.cache_dir);
    let source = live_source(load.offline)?;
    let opts = LoadOptions {
        start: config.sweep.start_date,
        end: config.sweep.end_date,
        interval: config.sweep.interval,
        offline: load.offline,
        synthetic: load.synthetic,
        force: load.force,
    };
    let loaded = load_pairs(&pairs, &cache, source.as_ref(), &opts)?;
    if loaded.is_empty() {
        bail!("no pair could be loaded (use --synthetic for synthetic data)");
    }

    let results = ParamSweep::new(&config.grid, config.backtest_params())
        .with_parallelism(config.sweep.parallel && !sequential)
        .with_metrics(config.metric_names())
        .run(&loaded, &RunConfigTemplate::from_sweep(&config))?;

    let output_dir = output_dir.unwrap_or_else(|| config.sweep.output_dir.clone());
    let summary_path = save_sweep_artifacts(&results, &loaded, &config, &output_dir)?;

    print_sweep_summary(&loaded, &results, top);
    println!("\nSummary saved to: {}", summary_path.display());
    Ok(())
}

fn fmt_metric(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.3}")).unwrap_or_else(|| "n/a".into())
}

fn print_pair_header(pair: &LoadedPair) {
    let synthetic = if pair.is_synthetic { " [SYNTHETIC]" } else { "" };
    println!("=== {}{synthetic} ===", pair.spec.label());
    println!("  Bars:           {}", pair.series.len());
    if let (Some(first), Some(last)) = (pair.series.timestamps.first(), pair.series.timestamps.last()) {
        println!("  Period:         {first} to {last}");
    }
    match &pair.cointegration {
        Some(c) => println!(
            "  ADF:            {:.3} (p = {:.4}, hedge ratio {:.4})",
            c.adf.statistic, c.adf.p_value, c.hedge_ratio
        ),
        None => println!("  ADF:            n/a"),
    }
}

fn print_run_summary(pair: &LoadedPair, result: &PairRunResult, run_id: &str) {
    println!();
    print_pair_header(pair);
    println!("  Run ID:         {}", &run_id[..12.min(run_id.len())]);
    println!();
    println!("--- Metrics ---");
    for (name, value) in result.metrics.iter() {
        println!("  {name:<20} {}", fmt_metric(value));
    }
    println!();
    println!("--- Trades ({}) ---", result.trades.len());
    for t in result.trades.iter().take(10) {
        println!(
            "  {:<5} {} -> {}  {:>4} bars  {:>10.4}  {}",
            t.direction, t.entry_time, t.exit_time, t.bars_held, t.pnl, t.exit_reason
        );
    }
    if result.trades.len() > 10 {
        println!("  ... and {} more", result.trades.len() - 10);
    }
    if let Some(open) = result.trace.open_at_end() {
        println!("  Position still open at end: {open}");
    }
}

fn print_sweep_summary(pairs: &[LoadedPair], results: &SweepResults, top: usize) {
    for pair in pairs {
        println!();
        print_pair_header(pair);
        let label = pair.spec.label();
        let mut rows: Vec<_> = results.for_pair(&label).collect();
        rows.sort_by(|a, b| {
            let key = |r: &&pairlab_runner::SweepRecord| r.metrics.get("sharpe_total").unwrap_or(f64::NEG_INFINITY);
            key(b).total_cmp(&key(a))
        });
        println!(
            "  {:>7} {:>7} {:>6} {:>6} {:>10} {:>10} {:>8}",
            "entry_z", "exit_z", "window", "floor", "sharpe", "max_dd", "trades"
        );
        for r in rows.iter().take(top) {
            println!(
                "  {:>7} {:>7} {:>6} {:>6} {:>10} {:>10} {:>8}",
                r.params.signal.entry_z,
                r.params.signal.exit_z,
                r.params.window,
                r.params.signal.abs_floor,
                fmt_metric(r.metrics.get("sharpe_total")),
                fmt_metric(r.metrics.get("max_dd_strategy")),
                r.trade_count
            );
        }
    }
}
