//! EnrichedRow: a bar plus the indicator fields the signal engine reads.

use super::bar::Bar;
use super::state::System;

/// One bar with its derived volatility, trend, and channel fields.
///
/// Channel fields at row `i` are computed from bars strictly before `i`.
/// `true_range`, `n`, `adx`, and `ema_200` are causal recurrences over rows
/// `<= i`. Fields that are not yet defined are `0.0` (`n`, `adx`) or NaN
/// (channels with an empty prior window, which never compare true).
#[derive(Debug, Clone, Copy)]
pub struct EnrichedRow {
    pub bar: Bar,
    pub true_range: f64,
    /// Volatility unit (average true range over 20 bars).
    pub n: f64,
    pub adx: f64,
    pub dc_high_20: f64,
    pub dc_high_55: f64,
    pub dc_high_90: f64,
    pub dc_low_10: f64,
    pub dc_low_20: f64,
    pub dc_low_45: f64,
    pub ema_200: f64,
}

impl EnrichedRow {
    pub fn timestamp(&self) -> i64 {
        self.bar.timestamp
    }

    pub fn close(&self) -> f64 {
        self.bar.close
    }

    /// Breakout threshold for a system's entry window.
    pub fn entry_channel(&self, system: System) -> f64 {
        match system {
            System::S1 => self.dc_high_20,
            System::S2 => self.dc_high_55,
            System::S3 => self.dc_high_90,
        }
    }

    /// Trailing-stop threshold for a system's exit window.
    pub fn exit_channel(&self, system: System) -> f64 {
        match system {
            System::S1 => self.dc_low_10,
            System::S2 => self.dc_low_20,
            System::S3 => self.dc_low_45,
        }
    }

    /// Bitwise equality of every field, NaN included.
    pub fn is_identical(&self, other: &EnrichedRow) -> bool {
        self.fields()
            .iter()
            .zip(other.fields().iter())
            .all(|(a, b)| a.to_bits() == b.to_bits())
            && self.bar.timestamp == other.bar.timestamp
    }

    fn fields(&self) -> [f64; 15] {
        [
            self.bar.open,
            self.bar.high,
            self.bar.low,
            self.bar.close,
            self.bar.volume,
            self.true_range,
            self.n,
            self.adx,
            self.dc_high_20,
            self.dc_high_55,
            self.dc_high_90,
            self.dc_low_10,
            self.dc_low_20,
            self.dc_low_45,
            self.ema_200,
        ]
    }
}

/// Mean `n` over the trailing `window` rows (fewer if the history is shorter).
///
/// Returns 0.0 for an empty slice.
pub fn average_n(rows: &[EnrichedRow], window: usize) -> f64 {
    let start = rows.len().saturating_sub(window);
    let tail = &rows[start..];
    if tail.is_empty() {
        return 0.0;
    }
    tail.iter().map(|r| r.n).sum::<f64>() / tail.len() as f64
}
