//! Donchian channel over the bars strictly before the current one.
//!
//! - Upper at t: max(high[t-period..t])
//! - Lower at t: min(low[t-period..t])
//!
//! The window is truncated to the available history, so only row 0 (empty
//! window) is NaN. Bar t itself never participates, which lets "close breaks
//! the channel" be evaluated on bar t without look-ahead.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DonchianBand {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct Donchian {
    period: usize,
    band: DonchianBand,
    name: String,
}

impl Donchian {
    pub fn upper(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band: DonchianBand::Upper,
            name: format!("dc_high_{period}"),
        }
    }

    pub fn lower(period: usize) -> Self {
        assert!(period >= 1, "Donchian period must be >= 1");
        Self {
            period,
            band: DonchianBand::Lower,
            name: format!("dc_low_{period}"),
        }
    }

    fn extreme(&self, window: &[Bar]) -> f64 {
        let mut acc = match self.band {
            DonchianBand::Upper => f64::NEG_INFINITY,
            DonchianBand::Lower => f64::INFINITY,
        };
        for bar in window {
            let v = match self.band {
                DonchianBand::Upper => bar.high,
                DonchianBand::Lower => bar.low,
            };
            if v.is_nan() {
                return f64::NAN;
            }
            acc = match self.band {
                DonchianBand::Upper => acc.max(v),
                DonchianBand::Lower => acc.min(v),
            };
        }
        acc
    }
}

impl Indicator for Donchian {
    fn name(&self) -> &str {
        &self.name
    }

    /// First index with a full `period`-bar prior window.
    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        (0..bars.len())
            .map(|i| {
                let window = &bars[i.saturating_sub(self.period)..i];
                if window.is_empty() {
                    f64::NAN
                } else {
                    self.extreme(window)
                }
            })
            .collect()
    }
}
