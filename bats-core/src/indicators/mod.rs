//! Indicator implementations and the engine that assembles them into rows.
//!
//! Every indicator is a pure function from a bar series to a value series of
//! the same length. Warm-up values are `f64::NAN`; `IndicatorEngine` maps
//! them onto the neutral defaults carried by `EnrichedRow`.
//!
//! # Look-ahead contamination guard
//! No indicator value at bar t may depend on price data from bar t+1 or later.
//! Donchian channels additionally exclude bar t itself.

pub mod adx;
pub mod atr;
pub mod donchian;
pub mod ema;
pub mod engine;

pub use adx::Adx;
pub use atr::{Atr, NMethod};
pub use donchian::{Donchian, DonchianBand};
pub use ema::Ema;
pub use engine::{IndicatorEngine, IndicatorSettings};

use crate::domain::Bar;

/// A single-series indicator.
pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "atr_20", "donchian_upper_55").
    fn name(&self) -> &str;

    /// Index of the first bar that can carry a defined value.
    fn lookback(&self) -> usize;

    /// Compute the indicator for the entire bar series.
    ///
    /// Returns a `Vec<f64>` of the same length as `bars`, NaN where undefined.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// open = prev_close (or close for the first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let high = open.max(close) + 1.0;
            let low = open.min(close) - 1.0;
            Bar::new(i as i64 * 60_000, open, high, low, close, 1000.0)
        })
        .collect()
}

#[cfg(test)]
pub fn make_ohlc_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    data.iter()
        .enumerate()
        .map(|(i, &(open, high, low, close))| {
            Bar::new(i as i64 * 60_000, open, high, low, close, 1000.0)
        })
        .collect()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
