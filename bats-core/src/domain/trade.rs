//! Trade log and equity curve records produced by the backtest.

use serde::{Deserialize, Serialize};

/// Kind of ledger-changing action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeKind {
    Buy,
    Pyramid,
    Exit,
}

/// Append-only record of one executed action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub timestamp: i64,
    pub symbol: String,
    #[serde(rename = "type")]
    pub kind: TradeKind,
    pub price: f64,
    /// Units held after the action.
    pub units_held: usize,
    /// Cash balance after the action.
    pub balance: f64,
    /// Realised gain, EXIT only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gain: Option<f64>,
}

impl TradeRecord {
    pub fn is_exit(&self) -> bool {
        self.kind == TradeKind::Exit
    }

    pub fn is_winner(&self) -> bool {
        self.gain.is_some_and(|g| g > 0.0)
    }
}

/// Account equity at the close of one processed bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}
