//! Exponential moving average of close.
//!
//! EMA[0] = close[0]; EMA[t] = k * close[t] + (1 - k) * EMA[t-1], k = 2/(period+1).
//! Defined from the first bar, so no warm-up gap.

use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "EMA period must be >= 1");
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }

    pub fn smoothing(&self) -> f64 {
        2.0 / (self.period as f64 + 1.0)
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        0
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let k = self.smoothing();
        let mut result = Vec::with_capacity(bars.len());
        let mut prev = f64::NAN;
        for (i, bar) in bars.iter().enumerate() {
            // NaN propagates: once a close is NaN the remainder is tainted.
            let v = if i == 0 {
                bar.close
            } else {
                k * bar.close + (1.0 - k) * prev
            };
            result.push(v);
            prev = v;
        }
        result
    }
}
