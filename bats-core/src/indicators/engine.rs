//! IndicatorEngine: bars in, enriched rows out.
//!
//! Pure and deterministic: the same bar slice always yields the same rows,
//! and any prefix of the input yields the matching prefix of the output.

use serde::{Deserialize, Serialize};

use super::atr::true_range;
use super::{Adx, Atr, Donchian, Ema, Indicator, NMethod};
use crate::domain::{Bar, EnrichedRow, System};

/// Indicator parameters. Channel windows are fixed by the breakout systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSettings {
    pub n_method: NMethod,
    pub n_period: usize,
    pub adx_period: usize,
    pub ema_period: usize,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            n_method: NMethod::Wilder,
            n_period: 20,
            adx_period: 14,
            ema_period: 200,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    n: Atr,
    adx: Adx,
    ema: Ema,
    entry: [Donchian; 3],
    exit: [Donchian; 3],
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(&IndicatorSettings::default())
    }
}

const SYSTEMS: [System; 3] = [System::S1, System::S2, System::S3];

impl IndicatorEngine {
    pub fn new(settings: &IndicatorSettings) -> Self {
        Self {
            n: Atr::new(settings.n_period, settings.n_method),
            adx: Adx::new(settings.adx_period),
            ema: Ema::new(settings.ema_period),
            entry: SYSTEMS.map(|s| Donchian::upper(s.entry_window())),
            exit: SYSTEMS.map(|s| Donchian::lower(s.exit_window())),
        }
    }

    /// First row index at which every channel has a full prior window.
    pub fn warmup(&self) -> usize {
        self.entry
            .iter()
            .chain(self.exit.iter())
            .map(Indicator::lookback)
            .max()
            .unwrap_or(0)
    }

    pub fn compute(&self, bars: &[Bar]) -> Vec<EnrichedRow> {
        if bars.is_empty() {
            return Vec::new();
        }

        let tr = true_range(bars);
        let n = self.n.compute(bars);
        let adx = self.adx.compute(bars);
        let ema = self.ema.compute(bars);
        let highs: Vec<Vec<f64>> = self.entry.iter().map(|d| d.compute(bars)).collect();
        let lows: Vec<Vec<f64>> = self.exit.iter().map(|d| d.compute(bars)).collect();
        let (dh20, dh55, dh90) = (&highs[0], &highs[1], &highs[2]);
        let (dl10, dl20, dl45) = (&lows[0], &lows[1], &lows[2]);

        bars.iter()
            .enumerate()
            .map(|(i, bar)| EnrichedRow {
                bar: *bar,
                true_range: tr[i],
                n: zero_if_nan(n[i]),
                adx: zero_if_nan(adx[i]),
                dc_high_20: dh20[i],
                dc_high_55: dh55[i],
                dc_high_90: dh90[i],
                dc_low_10: dl10[i],
                dc_low_20: dl20[i],
                dc_low_45: dl45[i],
                ema_200: zero_if_nan(ema[i]),
            })
            .collect()
    }
}

/// Warm-up values that feed sizing and filters collapse to 0, which blocks
/// sizing (`n`), fails the regime filter (`adx`) and disables the trend
/// filter (`ema_200`).
fn zero_if_nan(v: f64) -> f64 {
    if v.is_nan() {
        0.0
    } else {
        v
    }
}
