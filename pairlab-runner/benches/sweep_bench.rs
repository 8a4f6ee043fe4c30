//! Criterion benchmarks for the sweep hot path.
//!
//! Run with: `cargo bench -p pairlab-runner`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use pairlab_core::data::{generate_pair, SyntheticPairConfig};
use pairlab_core::engine::BacktestParams;
use pairlab_runner::{compute_metrics, run_pair_backtest, ParamGrid, StrategyParams};

fn bench_single_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("run_pair_backtest");

    for bars in [500usize, 2_000, 10_000] {
        let pair = generate_pair(&SyntheticPairConfig {
            bars,
            ..Default::default()
        })
        .unwrap();
        group.bench_with_input(BenchmarkId::from_parameter(bars), &pair, |b, pair| {
            b.iter(|| {
                let _ = run_pair_backtest(
                    black_box(pair),
                    &StrategyParams::default(),
                    &BacktestParams::default(),
                    None,
                );
            });
        });
    }
    group.finish();
}

fn bench_metrics(c: &mut Criterion) {
    let pair = generate_pair(&SyntheticPairConfig {
        bars: 5_000,
        ..Default::default()
    })
    .unwrap();
    let result = run_pair_backtest(&pair, &StrategyParams::default(), &BacktestParams::default(), None).unwrap();

    c.bench_function("compute_metrics_5000", |b| {
        b.iter(|| {
            let _ = compute_metrics(black_box(&result.trace), None);
        });
    });
}

fn bench_default_grid(c: &mut Criterion) {
    let pair = generate_pair(&SyntheticPairConfig {
        bars: 1_000,
        ..Default::default()
    })
    .unwrap();
    let points = ParamGrid::default().points();

    c.bench_function("default_grid_sequential_1000", |b| {
        b.iter(|| {
            for params in &points {
                let _ = run_pair_backtest(black_box(&pair), params, &BacktestParams::default(), None);
            }
        });
    });
}

criterion_group!(benches, bench_single_run, bench_metrics, bench_default_grid);
criterion_main!(benches);
