//! StrategyState: the mutable record threaded through every decision.
//!
//! Owned by the driving loop (backtest or live) and passed by `&mut` into the
//! signal engine. Persisted between live ticks by a `StateStore`.
//!
//! Invariants:
//! - `entry_prices.len() == units_held`
//! - `units_held == 0` implies `entry_prices` is empty
//! - `units_held <= max_units` of the configuration driving it

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Breakout system that opened the current position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum System {
    /// 20-bar breakout, 10-bar trailing exit, subject to the skip rule.
    S1,
    /// 55-bar breakout, 20-bar trailing exit.
    S2,
    /// 90-bar breakout, 45-bar trailing exit.
    S3,
}

impl System {
    pub fn entry_window(self) -> usize {
        match self {
            System::S1 => 20,
            System::S2 => 55,
            System::S3 => 90,
        }
    }

    pub fn exit_window(self) -> usize {
        match self {
            System::S1 => 10,
            System::S2 => 20,
            System::S3 => 45,
        }
    }
}

impl std::fmt::Display for System {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            System::S1 => "S1",
            System::S2 => "S2",
            System::S3 => "S3",
        };
        f.write_str(s)
    }
}

/// Outcome of the most recently closed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeResult {
    Win,
    Loss,
}

impl TradeResult {
    pub fn from_gain(gain: f64) -> Self {
        if gain > 0.0 {
            TradeResult::Win
        } else {
            TradeResult::Loss
        }
    }
}

/// Invariant violations. These indicate a logic bug and are never masked.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StateError {
    #[error("entry price count {entries} does not match units held {units_held}")]
    EntryCountMismatch { units_held: usize, entries: usize },

    #[error("units held {units_held} exceeds max units {max_units}")]
    UnitsExceeded { units_held: usize, max_units: usize },
}

/// Per-instrument strategy state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyState {
    #[serde(default)]
    pub units_held: usize,
    /// Entry price per held unit, oldest first.
    #[serde(default)]
    pub entry_prices: Vec<f64>,
    #[serde(default)]
    pub last_trade_result: Option<TradeResult>,
    /// Volatility unit used for stops and pyramiding.
    #[serde(default)]
    pub current_n: f64,
    #[serde(rename = "system_mode", default = "default_system")]
    pub active_system: System,
}

fn default_system() -> System {
    System::S1
}

impl Default for StrategyState {
    fn default() -> Self {
        Self {
            units_held: 0,
            entry_prices: Vec::new(),
            last_trade_result: Some(TradeResult::Loss),
            current_n: 0.0,
            active_system: System::S1,
        }
    }
}

impl StrategyState {
    pub fn is_flat(&self) -> bool {
        self.units_held == 0
    }

    /// Most recent entry price, if a position is open.
    pub fn last_entry(&self) -> Option<f64> {
        self.entry_prices.last().copied()
    }

    /// Record one filled unit (BUY or PYRAMID).
    pub fn record_entry(&mut self, price: f64) {
        self.units_held += 1;
        self.entry_prices.push(price);
    }

    /// Flatten the position and remember how it ended.
    pub fn close_position(&mut self, result: TradeResult) {
        self.units_held = 0;
        self.entry_prices.clear();
        self.last_trade_result = Some(result);
    }

    /// Check the documented invariants against `max_units`.
    pub fn validate(&self, max_units: usize) -> Result<(), StateError> {
        if self.entry_prices.len() != self.units_held {
            return Err(StateError::EntryCountMismatch {
                units_held: self.units_held,
                entries: self.entry_prices.len(),
            });
        }
        if self.units_held > max_units {
            return Err(StateError::UnitsExceeded {
                units_held: self.units_held,
                max_units,
            });
        }
        Ok(())
    }
}
