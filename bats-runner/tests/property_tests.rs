//! Property tests for bar loading and summary metrics.
//!
//! 1. Filtering keeps an ordered, in-range suffix no longer than `limit`
//! 2. Synthetic walks always pass bar validation
//! 3. Max drawdown stays within [0, 100] and is 0 on a non-decreasing curve

use bats_core::domain::{Bar, EquityPoint};
use bats_runner::data_loader::{filter_bars, synthetic_bars, validate_bars, LoadOptions};
use bats_runner::metrics::max_drawdown_pct;
use proptest::prelude::*;

const HOUR_MS: i64 = 3_600_000;

fn hourly(count: usize) -> Vec<Bar> {
    (0..count)
        .map(|i| {
            let close = 100.0 + i as f64;
            Bar::new(i as i64 * HOUR_MS, close, close + 1.0, close - 1.0, close, 1.0)
        })
        .collect()
}

fn arb_options() -> impl Strategy<Value = LoadOptions> {
    (
        prop::option::of(0..300_i64),
        prop::option::of(0..300_i64),
        prop::option::of(0..300_usize),
    )
        .prop_map(|(start, end, limit)| LoadOptions {
            start_time: start.map(|h| h * HOUR_MS),
            end_time: end.map(|h| h * HOUR_MS),
            limit,
        })
}

fn arb_curve() -> impl Strategy<Value = Vec<EquityPoint>> {
    prop::collection::vec(1.0..50_000.0_f64, 0..200).prop_map(|values| {
        values
            .into_iter()
            .enumerate()
            .map(|(i, equity)| EquityPoint {
                timestamp: i as i64 * HOUR_MS,
                equity,
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn filter_keeps_newest_in_range_bars(count in 0..250_usize, opts in arb_options()) {
        let bars = hourly(count);
        let kept = filter_bars(bars.clone(), &opts);

        if let Some(limit) = opts.limit {
            prop_assert!(kept.len() <= limit);
        }
        for b in &kept {
            prop_assert!(opts.start_time.map_or(true, |s| b.timestamp >= s));
            prop_assert!(opts.end_time.map_or(true, |e| b.timestamp <= e));
        }
        prop_assert!(kept.windows(2).all(|w| w[0].timestamp < w[1].timestamp));

        // nothing newer than the kept range was dropped
        let in_range = bars
            .iter()
            .filter(|b| opts.start_time.map_or(true, |s| b.timestamp >= s))
            .filter(|b| opts.end_time.map_or(true, |e| b.timestamp <= e))
            .count();
        prop_assert_eq!(kept.len(), opts.limit.map_or(in_range, |l| in_range.min(l)));
        if let (Some(last), Some(newest)) = (kept.last(), bars.iter().rev().find(|b| {
            opts.start_time.map_or(true, |s| b.timestamp >= s)
                && opts.end_time.map_or(true, |e| b.timestamp <= e)
        })) {
            prop_assert_eq!(last.timestamp, newest.timestamp);
        }
    }

    #[test]
    fn synthetic_walk_is_always_valid(count in 1..500_usize, seed in any::<u64>()) {
        let bars = synthetic_bars(count, seed, 20_000.0, 0, HOUR_MS);
        prop_assert_eq!(bars.len(), count);
        prop_assert!(validate_bars(&bars).is_ok());
    }

    #[test]
    fn drawdown_is_a_percentage(initial in 1.0..50_000.0_f64, curve in arb_curve()) {
        let dd = max_drawdown_pct(initial, &curve);
        prop_assert!((0.0..=100.0).contains(&dd));
    }

    #[test]
    fn rising_curve_has_no_drawdown(steps in prop::collection::vec(0.0..100.0_f64, 0..100)) {
        let mut equity = 10_000.0;
        let curve: Vec<EquityPoint> = steps
            .into_iter()
            .enumerate()
            .map(|(i, step)| {
                equity += step;
                EquityPoint { timestamp: i as i64 * HOUR_MS, equity }
            })
            .collect();
        prop_assert_eq!(max_drawdown_pct(10_000.0, &curve), 0.0);
    }
}
