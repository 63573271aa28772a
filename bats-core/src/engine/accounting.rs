//! Applying actions to cash, ledger, strategy state, and the trade log.

use tracing::debug;

use super::state::{EngineConfig, EngineState};
use crate::domain::{average_n, EnrichedRow, EquityPoint, TradeKind, TradeRecord, TradeResult};
use crate::sizers::RiskSizer;

/// Mean-N window used by the volatility cap.
pub const VOLATILITY_CAP_WINDOW: usize = 20;

impl EngineState {
    /// Add one unit at the close of the last row of `rows`.
    ///
    /// Returns false without mutating anything when N is undefined, the
    /// position is full, the heat gate refuses, sizing yields nothing, or the
    /// balance cannot cover the notional.
    pub fn try_enter(&mut self, kind: TradeKind, rows: &[EnrichedRow], config: &EngineConfig) -> bool {
        let Some(row) = rows.last() else {
            return false;
        };
        let (price, n) = (row.close(), row.n);
        let units = self.strategy.units_held;

        if n <= 0.0 || units >= config.max_units() {
            return false;
        }
        if let Some(max_heat) = config.max_heat {
            if !RiskSizer::can_enter(config.sizer.heat(units), max_heat) {
                debug!(units, max_heat, "entry refused by heat limit");
                return false;
            }
        }

        let avg_n = config
            .volatility_cap
            .then(|| average_n(rows, VOLATILITY_CAP_WINDOW));
        let qty = if config.drawdown_scaling {
            config.sizer.unit_size_with_drawdown(
                self.equity_at(price),
                n,
                Some(self.peak_equity),
                avg_n,
            )
        } else {
            config.sizer.unit_size(self.balance, n, avg_n)
        };

        let notional = qty * price;
        if notional <= 0.0 || self.balance < notional {
            debug!(qty, notional, balance = self.balance, "entry not affordable");
            return false;
        }

        self.balance -= notional;
        self.ledger.open(price, notional);
        self.strategy.record_entry(price);
        self.trades.push(TradeRecord {
            timestamp: row.timestamp(),
            symbol: config.symbol.clone(),
            kind,
            price,
            units_held: self.strategy.units_held,
            balance: self.balance,
            gain: None,
        });
        true
    }

    /// Liquidate every open unit at `price`. Returns the realised gain, or
    /// `None` when flat.
    pub fn exit_all(&mut self, timestamp: i64, price: f64, config: &EngineConfig) -> Option<f64> {
        if self.strategy.units_held == 0 {
            return None;
        }
        let liq = self.ledger.liquidate(price);
        self.balance += liq.proceeds;
        self.strategy.close_position(TradeResult::from_gain(liq.gain));
        self.trades.push(TradeRecord {
            timestamp,
            symbol: config.symbol.clone(),
            kind: TradeKind::Exit,
            price,
            units_held: 0,
            balance: self.balance,
            gain: Some(liq.gain),
        });
        Some(liq.gain)
    }

    /// Append the equity point for a processed bar and track the peak.
    pub fn mark(&mut self, timestamp: i64, price: f64) -> f64 {
        let equity = self.equity_at(price);
        self.peak_equity = self.peak_equity.max(equity);
        self.equity_curve.push(EquityPoint { timestamp, equity });
        equity
    }
}
