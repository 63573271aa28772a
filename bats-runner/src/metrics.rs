//! Run summary metrics: pure functions over the trade log and equity curve.

use serde::{Deserialize, Serialize};

use bats_core::domain::{EquityPoint, TradeRecord};
use bats_core::engine::RunResult;

/// Headline numbers of one backtest run. Percentages are in percent, not
/// fractions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub initial_balance: f64,
    pub final_equity: f64,
    pub total_return_pct: f64,
    pub max_drawdown_pct: f64,
    /// Every executed action (BUY, PYRAMID, EXIT).
    pub total_trades: usize,
    pub total_exits: usize,
    pub win_rate_pct: f64,
}

impl Summary {
    pub fn from_result(result: &RunResult) -> Self {
        let final_equity = result.final_equity();
        let exits = result.exits().count();
        Self {
            initial_balance: result.initial_balance,
            final_equity,
            total_return_pct: total_return_pct(result.initial_balance, final_equity),
            max_drawdown_pct: max_drawdown_pct(result.initial_balance, &result.equity_curve),
            total_trades: result.trades.len(),
            total_exits: exits,
            win_rate_pct: win_rate_pct(&result.trades),
        }
    }
}

// ─── Individual metric functions ────────────────────────────────────

pub fn total_return_pct(initial: f64, final_equity: f64) -> f64 {
    if initial <= 0.0 {
        return 0.0;
    }
    (final_equity - initial) / initial * 100.0
}

/// Largest peak-to-trough fall of equity, in percent of the peak.
///
/// The running peak starts at the initial balance, so a curve that only
/// ever sits below it still reports its drawdown.
pub fn max_drawdown_pct(initial: f64, curve: &[EquityPoint]) -> f64 {
    let mut peak = initial;
    let mut worst = 0.0_f64;
    for point in curve {
        peak = peak.max(point.equity);
        if peak > 0.0 {
            worst = worst.max((peak - point.equity) / peak);
        }
    }
    worst * 100.0
}

/// Share of EXIT records with a positive gain. 0 with no exits.
pub fn win_rate_pct(trades: &[TradeRecord]) -> f64 {
    let exits = trades.iter().filter(|t| t.is_exit()).count();
    if exits == 0 {
        return 0.0;
    }
    let wins = trades.iter().filter(|t| t.is_winner()).count();
    wins as f64 / exits as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use bats_core::domain::TradeKind;

    fn point(equity: f64) -> EquityPoint {
        EquityPoint {
            timestamp: 0,
            equity,
        }
    }

    fn exit(gain: f64) -> TradeRecord {
        TradeRecord {
            timestamp: 0,
            symbol: "BTCUSDT".into(),
            kind: TradeKind::Exit,
            price: 1.0,
            units_held: 0,
            balance: 0.0,
            gain: Some(gain),
        }
    }

    #[test]
    fn total_return_basic() {
        assert!((total_return_pct(10_000.0, 11_000.0) - 10.0).abs() < 1e-12);
        assert!((total_return_pct(10_000.0, 9_000.0) + 10.0).abs() < 1e-12);
        assert_eq!(total_return_pct(0.0, 100.0), 0.0);
    }

    #[test]
    fn drawdown_peak_starts_at_initial_balance() {
        let curve = [point(9_000.0), point(9_500.0)];
        assert!((max_drawdown_pct(10_000.0, &curve) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_tracks_new_peaks() {
        let curve = [point(12_000.0), point(9_000.0), point(15_000.0), point(13_500.0)];
        assert!((max_drawdown_pct(10_000.0, &curve) - 25.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_zero_on_monotonic_curve() {
        let curve = [point(10_000.0), point(10_100.0), point(10_200.0)];
        assert_eq!(max_drawdown_pct(10_000.0, &curve), 0.0);
        assert_eq!(max_drawdown_pct(10_000.0, &[]), 0.0);
    }

    #[test]
    fn win_rate_counts_exits_only() {
        let mut buy = exit(0.0);
        buy.kind = TradeKind::Buy;
        buy.gain = None;
        let trades = [buy, exit(10.0), exit(-5.0), exit(0.0), exit(3.0)];
        assert!((win_rate_pct(&trades) - 50.0).abs() < 1e-12);
        assert_eq!(win_rate_pct(&[]), 0.0);
    }
}
