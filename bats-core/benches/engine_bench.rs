//! Criterion benchmarks for the hot paths.
//!
//! 1. Indicator engine over a long bar series
//! 2. Full backtest (indicators + bar loop)
//! 3. Signal evaluation on a single row

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use bats_core::domain::{Bar, StrategyState};
use bats_core::engine::{run_backtest, simulate, EngineConfig};
use bats_core::indicators::IndicatorEngine;
use bats_core::signals::SignalEngine;

// ── Helpers ──────────────────────────────────────────────────────────

fn make_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| {
            let close = 20_000.0 + (i as f64 * 0.05).sin() * 2_000.0 + i as f64 * 2.0;
            let open = close - 15.0;
            Bar::new(i as i64 * 3_600_000, open, close + 60.0, open - 60.0, close, 100.0)
        })
        .collect()
}

// ── Benchmarks ───────────────────────────────────────────────────────

fn bench_indicators(c: &mut Criterion) {
    let mut group = c.benchmark_group("indicators");
    let engine = IndicatorEngine::default();
    for n in [1_000usize, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::new("compute", n), &bars, |b, bars| {
            b.iter(|| engine.compute(black_box(bars)))
        });
    }
    group.finish();
}

fn bench_backtest(c: &mut Criterion) {
    let mut group = c.benchmark_group("backtest");
    let config = EngineConfig::default();
    for n in [1_000usize, 10_000] {
        let bars = make_bars(n);
        group.bench_with_input(BenchmarkId::new("run_backtest", n), &bars, |b, bars| {
            b.iter(|| run_backtest(black_box(bars), &config))
        });

        let rows = IndicatorEngine::default().compute(&bars);
        group.bench_with_input(BenchmarkId::new("simulate", n), &rows, |b, rows| {
            b.iter(|| simulate(black_box(rows), 90, &config))
        });
    }
    group.finish();
}

fn bench_signal(c: &mut Criterion) {
    let rows = IndicatorEngine::default().compute(&make_bars(500));
    let engine = SignalEngine::default();
    let price = rows[499].close();
    c.bench_function("signal_evaluate", |b| {
        b.iter(|| {
            let mut state = StrategyState::default();
            engine.evaluate(black_box(&rows), black_box(price), &mut state)
        })
    });
}

criterion_group!(benches, bench_indicators, bench_backtest, bench_signal);
criterion_main!(benches);
