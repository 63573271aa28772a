//! ADX: Average Directional Index (Wilder).
//!
//! 1. +DM / -DM from consecutive bars (undefined on the first bar)
//! 2. Wilder-smooth +DM, -DM and TR over `period`, all starting at bar 1
//! 3. +DI = 100 * smoothed(+DM) / smoothed(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when the denominator is 0
//! 5. ADX = Wilder-smoothed DX
//!
//! First defined value at index 2 * period - 1.

use super::atr::{true_range, wilder_smooth};
use super::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Adx {
    period: usize,
    name: String,
}

impl Adx {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ADX period must be >= 1");
        Self {
            period,
            name: format!("adx_{period}"),
        }
    }
}

/// Directional movement for bar `i` against bar `i - 1`: (+DM, -DM).
fn directional_movement(prev: &Bar, bar: &Bar) -> (f64, f64) {
    if bar.high.is_nan() || bar.low.is_nan() || prev.high.is_nan() || prev.low.is_nan() {
        return (f64::NAN, f64::NAN);
    }
    let up = bar.high - prev.high;
    let down = prev.low - bar.low;
    let plus = if up > down && up > 0.0 { up } else { 0.0 };
    let minus = if down > up && down > 0.0 { down } else { 0.0 };
    (plus, minus)
}

impl Indicator for Adx {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        2 * self.period - 1
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        if n < 2 {
            return vec![f64::NAN; n];
        }

        let mut plus_dm = vec![f64::NAN; n];
        let mut minus_dm = vec![f64::NAN; n];
        for i in 1..n {
            let (p, m) = directional_movement(&bars[i - 1], &bars[i]);
            plus_dm[i] = p;
            minus_dm[i] = m;
        }

        // TR[0] has no directional counterpart; align all three series at bar 1.
        let mut tr = true_range(bars);
        tr[0] = f64::NAN;

        let smooth_tr = wilder_smooth(&tr, self.period);
        let smooth_plus = wilder_smooth(&plus_dm, self.period);
        let smooth_minus = wilder_smooth(&minus_dm, self.period);

        let dx: Vec<f64> = (0..n)
            .map(|i| {
                let (str_, sp, sm) = (smooth_tr[i], smooth_plus[i], smooth_minus[i]);
                if str_.is_nan() || sp.is_nan() || sm.is_nan() {
                    return f64::NAN;
                }
                if str_ == 0.0 {
                    return 0.0;
                }
                let plus_di = 100.0 * sp / str_;
                let minus_di = 100.0 * sm / str_;
                let di_sum = plus_di + minus_di;
                if di_sum == 0.0 {
                    0.0
                } else {
                    100.0 * (plus_di - minus_di).abs() / di_sum
                }
            })
            .collect();

        wilder_smooth(&dx, self.period)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{assert_approx, make_bars, make_ohlc_bars, DEFAULT_EPSILON};

    #[test]
    fn adx_bounds() {
        let closes: Vec<f64> = (0..80)
            .map(|i| 100.0 + (i as f64 * 0.7).sin() * 8.0 + i as f64 * 0.2)
            .collect();
        let result = Adx::new(14).compute(&make_bars(&closes));
        for (i, &v) in result.iter().enumerate() {
            if !v.is_nan() {
                assert!((0.0..=100.0).contains(&v), "ADX[{i}] = {v} out of bounds");
            }
        }
    }

    #[test]
    fn adx_warmup_boundary() {
        let closes: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let adx = Adx::new(5);
        let result = adx.compute(&make_bars(&closes));
        let first = adx.lookback();
        assert_eq!(first, 9);
        assert!(result[..first].iter().all(|v| v.is_nan()));
        assert!(!result[first].is_nan());
    }

    #[test]
    fn pure_uptrend_is_100() {
        let data: Vec<(f64, f64, f64, f64)> = (0..30)
            .map(|i| {
                let base = 100.0 + i as f64 * 10.0;
                (base, base + 5.0, base - 5.0, base + 2.0)
            })
            .collect();
        let result = Adx::new(5).compute(&make_ohlc_bars(&data));
        assert_approx(result[29], 100.0, DEFAULT_EPSILON);
    }

    #[test]
    fn flat_series_is_zero() {
        let data = vec![(100.0, 100.0, 100.0, 100.0); 30];
        let result = Adx::new(5).compute(&make_ohlc_bars(&data));
        assert_approx(result[29], 0.0, DEFAULT_EPSILON);
    }

    #[test]
    fn short_series_is_all_nan() {
        let result = Adx::new(14).compute(&make_bars(&[100.0]));
        assert_eq!(result.len(), 1);
        assert!(result[0].is_nan());
    }
}
