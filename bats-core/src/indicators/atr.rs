//! True range and N, the volatility unit.
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|), and
//! high-low on the first bar.
//!
//! N averages the true range over `period` bars with one of:
//! - the Turtle recurrence `N = ((period-1) * N_prev + TR) / period`, seeded
//!   by the mean of the first `period` values
//! - a plain trailing mean
//! - an EWMA with `alpha = 2/(period+1)` seeded with TR[0]

use serde::{Deserialize, Serialize};

use super::Indicator;
use crate::domain::Bar;

/// How N averages the true range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NMethod {
    /// Wilder recurrence, alpha = 1/period (published Turtle definition).
    #[default]
    Wilder,
    /// Trailing simple mean of the last `period` true ranges.
    RollingMean,
    /// Exponential mean, alpha = 2/(period+1), seeded with the first TR.
    Ewma,
}

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    method: NMethod,
    name: String,
}

impl Atr {
    pub fn new(period: usize, method: NMethod) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            method,
            name: format!("atr_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    bars.iter()
        .enumerate()
        .map(|(i, bar)| {
            let hl = bar.high - bar.low;
            if i == 0 {
                return hl;
            }
            let pc = bars[i - 1].close;
            if bar.high.is_nan() || bar.low.is_nan() || pc.is_nan() {
                return f64::NAN;
            }
            hl.max((bar.high - pc).abs()).max((bar.low - pc).abs())
        })
        .collect()
}

/// Index of the first run of `period` consecutive finite values.
fn first_full_window(values: &[f64], period: usize) -> Option<usize> {
    let mut run = 0;
    for (i, v) in values.iter().enumerate() {
        if v.is_finite() {
            run += 1;
            if run == period {
                return Some(i + 1 - period);
            }
        } else {
            run = 0;
        }
    }
    None
}

/// Wilder smoothing with alpha = 1/period.
///
/// Seed: mean of the first `period` consecutive finite values, placed at the
/// last index of that window. A NaN after the seed taints the rest of the
/// series.
pub fn wilder_smooth(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    let Some(seed_start) = first_full_window(values, period) else {
        return result;
    };
    let seed_end = seed_start + period;
    let mut prev = values[seed_start..seed_end].iter().sum::<f64>() / period as f64;
    result[seed_end - 1] = prev;

    let alpha = 1.0 / period as f64;
    for i in seed_end..n {
        if values[i].is_nan() {
            break;
        }
        prev = alpha * values[i] + (1.0 - alpha) * prev;
        result[i] = prev;
    }
    result
}

/// Trailing mean over the last `period` values; NaN until the window fills or
/// while it contains a NaN.
pub fn rolling_mean(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 || n < period {
        return result;
    }
    for i in (period - 1)..n {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| v.is_finite()) {
            result[i] = window.iter().sum::<f64>() / period as f64;
        }
    }
    result
}

/// Exponential mean with alpha = 2/(period+1), recursing from `values[0]`.
///
/// The recurrence runs from the first value, but rows before the window
/// fills (index `period - 1`) are reported as NaN like the other methods. A
/// NaN taints the rest of the series.
pub fn ewma(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let mut result = vec![f64::NAN; n];
    if period == 0 {
        return result;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = f64::NAN;
    for (i, &v) in values.iter().enumerate() {
        prev = if i == 0 { v } else { alpha * v + (1.0 - alpha) * prev };
        if i + 1 >= period {
            result[i] = prev;
        }
    }
    result
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let tr = true_range(bars);
        match self.method {
            NMethod::Wilder => wilder_smooth(&tr, self.period),
            NMethod::RollingMean => rolling_mean(&tr, self.period),
            NMethod::Ewma => ewma(&tr, self.period),
        }
    }
}
