//! Turtle unit sizer.
//!
//! # Formula
//! ```text
//! unit = (balance * risk_fraction) / N
//! ```
//! halved when N exceeds `1.5 * avg_n20`, rounded to 6 decimals.
//!
//! # Example
//! - Balance: $10,000, risk fraction 1% ($100)
//! - N: $250
//! - Unit: 100 / 250 = 0.4

use serde::{Deserialize, Serialize};

use super::round_qty;

/// Volatility multiple of the 20-row mean N above which a unit is halved.
pub const VOLATILITY_CAP_MULTIPLE: f64 = 1.5;
/// Drawdown fraction per reduction step.
pub const DRAWDOWN_STEP: f64 = 0.10;
/// Multiplier applied to equity per drawdown step.
pub const DRAWDOWN_FACTOR: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskSizer {
    /// Fraction of the account risked per unit of N (e.g. 0.01 = 1%).
    pub risk_fraction: f64,
}

impl Default for RiskSizer {
    fn default() -> Self {
        Self {
            risk_fraction: 0.01,
        }
    }
}

impl RiskSizer {
    pub fn new(risk_fraction: f64) -> Self {
        Self { risk_fraction }
    }

    /// Quantity for one unit. Returns 0.0 when `n` is zero, negative or NaN.
    ///
    /// `avg_n20` enables the volatility cap when given.
    pub fn unit_size(&self, balance: f64, n: f64, avg_n20: Option<f64>) -> f64 {
        if !n.is_finite() || n <= 0.0 || balance.is_nan() || balance <= 0.0 {
            return 0.0;
        }
        let mut qty = balance * self.risk_fraction / n;
        if let Some(avg) = avg_n20 {
            if n > VOLATILITY_CAP_MULTIPLE * avg {
                qty /= 2.0;
            }
        }
        round_qty(qty)
    }

    /// Unit size against a virtual equity reduced 20% per full 10% drawdown
    /// step below `peak_equity`. Steps compound.
    pub fn unit_size_with_drawdown(
        &self,
        equity: f64,
        n: f64,
        peak_equity: Option<f64>,
        avg_n20: Option<f64>,
    ) -> f64 {
        let virtual_equity = equity * DRAWDOWN_FACTOR.powi(drawdown_steps(equity, peak_equity));
        self.unit_size(virtual_equity, n, avg_n20)
    }

    /// Admit an entry only while committed heat stays strictly below `max_heat`.
    pub fn can_enter(current_heat: f64, max_heat: f64) -> bool {
        current_heat < max_heat
    }

    /// Heat carried by `units` open units.
    pub fn heat(&self, units: usize) -> f64 {
        units as f64 * self.risk_fraction
    }
}

/// Full drawdown steps of `equity` below `peak`; 0 at or above the peak.
pub fn drawdown_steps(equity: f64, peak: Option<f64>) -> i32 {
    let Some(peak) = peak.filter(|p| *p > 0.0) else {
        return 0;
    };
    let dd = (peak - equity) / peak;
    if dd.is_nan() || dd <= 0.0 {
        return 0;
    }
    // epsilon absorbs float error at exact step boundaries (e.g. 0.3)
    (dd / DRAWDOWN_STEP + 1e-9).floor() as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "{a} != {b}");
    }

    #[test]
    fn base_formula() {
        let s = RiskSizer::default();
        approx(s.unit_size(10_000.0, 250.0, None), 0.4);
        approx(s.unit_size(100_000.0, 100.0, None), 10.0);
    }

    #[test]
    fn undefined_volatility_blocks_sizing() {
        let s = RiskSizer::default();
        assert_eq!(s.unit_size(10_000.0, 0.0, None), 0.0);
        assert_eq!(s.unit_size(10_000.0, f64::NAN, None), 0.0);
        assert_eq!(s.unit_size(10_000.0, -3.0, None), 0.0);
        assert_eq!(s.unit_size(0.0, 100.0, None), 0.0);
    }

    #[test]
    fn volatility_cap_halves() {
        let s = RiskSizer::default();
        let full = s.unit_size(100_000.0, 100.0, Some(100.0));
        let capped = s.unit_size(100_000.0, 100.0, Some(60.0));
        approx(full, 10.0);
        approx(capped, 5.0);
        // exactly 1.5x is not above the cap
        assert_eq!(s.unit_size(100_000.0, 150.0, Some(100.0)), 6.666_667);
    }

    #[test]
    fn result_is_rounded() {
        let s = RiskSizer::default();
        // 100 / 3 = 33.333333...
        assert_eq!(s.unit_size(10_000.0, 3.0, None), 33.333_333);
    }

    #[test]
    fn one_drawdown_step() {
        let s = RiskSizer::default();
        // 10% drawdown: virtual equity 72_000, unit 720 / 100
        approx(
            s.unit_size_with_drawdown(90_000.0, 100.0, Some(100_000.0), None),
            7.2,
        );
    }

    #[test]
    fn drawdown_steps_compound() {
        assert_eq!(drawdown_steps(65_000.0, Some(100_000.0)), 3);
        assert_eq!(drawdown_steps(70_000.0, Some(100_000.0)), 3);
        assert_eq!(drawdown_steps(95_000.0, Some(100_000.0)), 0);
        assert_eq!(drawdown_steps(120_000.0, Some(100_000.0)), 0);
        assert_eq!(drawdown_steps(50_000.0, None), 0);

        let s = RiskSizer::default();
        // 35% drawdown: 65_000 * 0.512 = 33_280 -> 332.8 / 100
        approx(
            s.unit_size_with_drawdown(65_000.0, 100.0, Some(100_000.0), None),
            3.328,
        );
    }

    #[test]
    fn no_peak_means_no_reduction() {
        let s = RiskSizer::default();
        approx(
            s.unit_size_with_drawdown(50_000.0, 100.0, None, None),
            s.unit_size(50_000.0, 100.0, None),
        );
    }

    #[test]
    fn can_enter_is_strict() {
        assert!(RiskSizer::can_enter(0.01, 0.02));
        assert!(!RiskSizer::can_enter(0.02, 0.02));
        assert!(!RiskSizer::can_enter(0.03, 0.02));
    }

    #[test]
    fn heat_scales_with_units() {
        let s = RiskSizer::default();
        approx(s.heat(3), 0.03);
        assert_eq!(s.heat(0), 0.0);
    }
}
