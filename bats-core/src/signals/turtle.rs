//! Turtle breakout engine.
//!
//! IN_POSITION, first match wins:
//! 1. hard stop: price < last_entry - stop_n_multiplier * N
//! 2. trailing stop: price < exit channel of the active system
//! 3. pyramid: units < max_units and price > last_entry + pyramid_step_n * N
//! 4. hold
//!
//! FLAT, first match wins:
//! 1. regime filter: ADX < threshold
//! 2. trend filter: price < EMA200 (skipped while EMA200 is 0)
//! 3. S3, S2, S1 breakouts in that order; S1 is skipped after a win
//! 4. hold

use serde::{Deserialize, Serialize};

use super::{Action, Decision, Reason};
use crate::domain::{EnrichedRow, StrategyState, System, TradeResult};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub use_s1: bool,
    pub use_s2: bool,
    pub use_s3: bool,
    pub adx_filter_threshold: f64,
    /// Hard stop distance below the last entry, in N.
    pub stop_n_multiplier: f64,
    pub max_units: usize,
    /// Pyramid step above the last entry, in N.
    pub pyramid_step_n: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            use_s1: false,
            use_s2: false,
            use_s3: true,
            adx_filter_threshold: 25.0,
            stop_n_multiplier: 5.0,
            max_units: 4,
            pyramid_step_n: 0.5,
        }
    }
}

impl SignalConfig {
    /// The classic two-system setup: S1 and S2 with a 2N stop.
    pub fn classic() -> Self {
        Self {
            use_s1: true,
            use_s2: true,
            use_s3: false,
            stop_n_multiplier: 2.0,
            ..Self::default()
        }
    }

    pub fn enabled(&self, system: System) -> bool {
        match system {
            System::S1 => self.use_s1,
            System::S2 => self.use_s2,
            System::S3 => self.use_s3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignalEngine {
    config: SignalConfig,
}

impl SignalEngine {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SignalConfig {
        &self.config
    }

    /// Action only. See [`SignalEngine::evaluate`].
    pub fn decide(&self, rows: &[EnrichedRow], price: f64, state: &mut StrategyState) -> Action {
        self.evaluate(rows, price, state).action
    }

    /// Decide on the last row of `rows` at `price`.
    ///
    /// `rows` must end at the current bar. Sets `state.active_system` when a
    /// breakout fires.
    pub fn evaluate(
        &self,
        rows: &[EnrichedRow],
        price: f64,
        state: &mut StrategyState,
    ) -> Decision {
        let Some(row) = rows.last() else {
            return Decision::hold(Reason::NoData);
        };
        if state.units_held > 0 {
            self.in_position(row, price, state)
        } else {
            self.flat(row, price, state)
        }
    }

    fn in_position(&self, row: &EnrichedRow, price: f64, state: &StrategyState) -> Decision {
        let n = state.current_n;
        let last_entry = state.last_entry().filter(|_| n > 0.0);

        if let Some(entry) = last_entry {
            if price < entry - self.config.stop_n_multiplier * n {
                return Decision::new(Action::Exit, Reason::HardStop);
            }
        }

        if price < row.exit_channel(state.active_system) {
            return Decision::new(Action::Exit, Reason::TrailingStop);
        }

        if let Some(entry) = last_entry {
            if state.units_held < self.config.max_units
                && price > entry + self.config.pyramid_step_n * n
            {
                return Decision::new(Action::Pyramid, Reason::Pyramid);
            }
        }

        Decision::hold(Reason::Holding)
    }

    fn flat(&self, row: &EnrichedRow, price: f64, state: &mut StrategyState) -> Decision {
        if row.adx < self.config.adx_filter_threshold {
            return Decision::hold(Reason::RegimeFilter);
        }
        if row.ema_200 != 0.0 && price < row.ema_200 {
            return Decision::hold(Reason::TrendFilter);
        }

        for system in [System::S3, System::S2, System::S1] {
            let breaks_out = price > row.entry_channel(system);
            if !self.config.enabled(system) || !breaks_out {
                continue;
            }
            if system == System::S1 && state.last_trade_result == Some(TradeResult::Win) {
                return Decision::hold(Reason::SkipRule);
            }
            state.active_system = system;
            return Decision::new(Action::Buy, Reason::Breakout(system));
        }

        Decision::hold(Reason::NoBreakout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Bar;

    fn row() -> EnrichedRow {
        EnrichedRow {
            bar: Bar::new(0, 100.0, 101.0, 99.0, 100.0, 1.0),
            true_range: 2.0,
            n: 2.0,
            adx: 30.0,
            dc_high_20: 105.0,
            dc_high_55: 110.0,
            dc_high_90: 120.0,
            dc_low_10: 95.0,
            dc_low_20: 90.0,
            dc_low_45: 80.0,
            ema_200: 90.0,
        }
    }

    fn long(entries: &[f64], n: f64, system: System) -> StrategyState {
        StrategyState {
            units_held: entries.len(),
            entry_prices: entries.to_vec(),
            last_trade_result: None,
            current_n: n,
            active_system: system,
        }
    }

    #[test]
    fn empty_history_holds() {
        let engine = SignalEngine::default();
        let mut state = StrategyState::default();
        let d = engine.evaluate(&[], 100.0, &mut state);
        assert_eq!(d, Decision::hold(Reason::NoData));
    }

    #[test]
    fn s3_breakout_sets_active_system() {
        let engine = SignalEngine::default();
        let mut state = StrategyState::default();
        let d = engine.evaluate(&[row()], 121.0, &mut state);
        assert_eq!(d, Decision::new(Action::Buy, Reason::Breakout(System::S3)));
        assert_eq!(state.active_system, System::S3);
    }

    #[test]
    fn default_config_ignores_s1_and_s2() {
        let engine = SignalEngine::default();
        let mut state = StrategyState::default();
        assert_eq!(engine.decide(&[row()], 115.0, &mut state), Action::Hold);
        assert_eq!(state.active_system, System::S1);
    }

    #[test]
    fn regime_filter_blocks_entry() {
        let engine = SignalEngine::default();
        let mut r = row();
        r.adx = 24.9;
        let mut state = StrategyState::default();
        let d = engine.evaluate(&[r], 500.0, &mut state);
        assert_eq!(d.reason, Reason::RegimeFilter);
    }

    #[test]
    fn trend_filter_blocks_entry_below_ema() {
        let engine = SignalEngine::new(SignalConfig {
            use_s1: true,
            ..SignalConfig::default()
        });
        let mut r = row();
        r.ema_200 = 200.0;
        let mut state = StrategyState::default();
        let d = engine.evaluate(&[r], 150.0, &mut state);
        assert_eq!(d.reason, Reason::TrendFilter);
    }

    #[test]
    fn zero_ema_disables_trend_filter() {
        let engine = SignalEngine::default();
        let mut r = row();
        r.ema_200 = 0.0;
        let mut state = StrategyState::default();
        assert_eq!(engine.decide(&[r], 121.0, &mut state), Action::Buy);
    }

    #[test]
    fn nan_channel_never_breaks_out() {
        let engine = SignalEngine::default();
        let mut r = row();
        r.dc_high_90 = f64::NAN;
        let mut state = StrategyState::default();
        let d = engine.evaluate(&[r], 1_000.0, &mut state);
        assert_eq!(d.reason, Reason::NoBreakout);
    }

    #[test]
    fn hard_stop_fires() {
        let engine = SignalEngine::default();
        let mut state = long(&[100.0], 2.0, System::S3);
        // stop at 100 - 5 * 2 = 90; trailing low_45 is 80
        let d = engine.evaluate(&[row()], 89.0, &mut state);
        assert_eq!(d, Decision::new(Action::Exit, Reason::HardStop));
    }

    #[test]
    fn trailing_stop_uses_active_system_channel() {
        let engine = SignalEngine::default();
        // S1 exit channel is 95
        let mut state = long(&[100.0], 2.0, System::S1);
        let d = engine.evaluate(&[row()], 94.0, &mut state);
        assert_eq!(d, Decision::new(Action::Exit, Reason::TrailingStop));

        // S3 exit channel is 80, hard stop at 90
        let mut state = long(&[100.0], 2.0, System::S3);
        assert_eq!(engine.decide(&[row()], 94.0, &mut state), Action::Hold);
    }

    #[test]
    fn pyramid_above_half_n() {
        let engine = SignalEngine::default();
        let mut state = long(&[100.0], 2.0, System::S3);
        assert_eq!(engine.decide(&[row()], 101.0, &mut state), Action::Hold);
        assert_eq!(engine.decide(&[row()], 101.01, &mut state), Action::Pyramid);
    }

    #[test]
    fn pyramid_stops_at_max_units() {
        let engine = SignalEngine::default();
        let mut state = long(&[100.0, 101.0, 102.0, 103.0], 2.0, System::S3);
        let d = engine.evaluate(&[row()], 110.0, &mut state);
        assert_eq!(d, Decision::hold(Reason::Holding));
    }

    #[test]
    fn zero_n_disables_hard_stop_and_pyramid() {
        let engine = SignalEngine::default();
        let mut state = long(&[100.0], 0.0, System::S3);
        assert_eq!(engine.decide(&[row()], 85.0, &mut state), Action::Hold);
        assert_eq!(engine.decide(&[row()], 150.0, &mut state), Action::Hold);
    }

    #[test]
    fn classic_preset() {
        let c = SignalConfig::classic();
        assert!(c.use_s1 && c.use_s2 && !c.use_s3);
        assert_eq!(c.stop_n_multiplier, 2.0);
    }
}
