//! Bar: the fundamental market data unit.

use serde::{Deserialize, Serialize};

/// OHLCV candle for a single instrument.
///
/// `timestamp` is the candle open time in epoch milliseconds. Within a series
/// timestamps are strictly ascending and unique.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any OHLCV field is NaN or infinite.
    pub fn is_void(&self) -> bool {
        !(self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite())
    }

    /// Basic OHLC sanity check: high >= low, high >= open/close, low <= open/close.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    pub fn range(&self) -> f64 {
        self.high - self.low
    }
}
