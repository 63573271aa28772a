//! Engine configuration, mutable state, and run result types.

use serde::{Deserialize, Serialize};

use crate::domain::{EquityPoint, LedgerEntry, PositionLedger, StrategyState, TradeRecord};
use crate::indicators::IndicatorSettings;
use crate::signals::SignalConfig;
use crate::sizers::RiskSizer;

/// Configuration for a single backtest run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub symbol: String,
    pub initial_balance: f64,
    pub signal: SignalConfig,
    pub sizer: RiskSizer,
    pub indicators: IndicatorSettings,
    /// Halve units when N spikes above 1.5x its 20-row mean.
    pub volatility_cap: bool,
    /// Size against drawdown-reduced equity.
    pub drawdown_scaling: bool,
    /// Gate entries on `units_held * risk_fraction < max_heat`.
    pub max_heat: Option<f64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("BTCUSDT", 10_000.0)
    }
}

impl EngineConfig {
    pub fn new(symbol: impl Into<String>, initial_balance: f64) -> Self {
        Self {
            symbol: symbol.into(),
            initial_balance,
            signal: SignalConfig::default(),
            sizer: RiskSizer::default(),
            indicators: IndicatorSettings::default(),
            volatility_cap: false,
            drawdown_scaling: false,
            max_heat: None,
        }
    }

    pub fn max_units(&self) -> usize {
        self.signal.max_units
    }
}

/// Mutable state that evolves bar-by-bar during the simulation.
#[derive(Debug, Clone)]
pub struct EngineState {
    pub balance: f64,
    pub ledger: PositionLedger,
    pub strategy: StrategyState,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    /// Running equity peak, seeded with the initial balance.
    pub peak_equity: f64,
}

impl EngineState {
    pub fn new(initial_balance: f64) -> Self {
        Self {
            balance: initial_balance,
            ledger: PositionLedger::new(),
            strategy: StrategyState::default(),
            trades: Vec::new(),
            equity_curve: Vec::new(),
            peak_equity: initial_balance,
        }
    }

    /// Cash plus open units marked at `price`.
    pub fn equity_at(&self, price: f64) -> f64 {
        self.balance + self.ledger.mark_to_market(price)
    }

    /// Equity at the last recorded point, or the cash balance before any.
    pub fn last_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.balance)
    }
}

/// Complete output of a backtest run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub symbol: String,
    pub initial_balance: f64,
    pub final_balance: f64,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
    pub final_state: StrategyState,
    /// Units still open at the end of the run.
    pub open_units: Vec<LedgerEntry>,
    /// Index of the first simulated row.
    pub start_index: usize,
    pub rows_total: usize,
}

impl RunResult {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_balance)
    }

    pub fn exits(&self) -> impl Iterator<Item = &TradeRecord> {
        self.trades.iter().filter(|t| t.is_exit())
    }

    pub fn bars_simulated(&self) -> usize {
        self.equity_curve.len()
    }
}
