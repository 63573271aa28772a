//! Collaborator traits for the live driver and their error types.
//!
//! Exchange connectivity, order routing, persistence, and chat notification
//! live outside the core. The driver only sees these traits.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Bar, StrategyState, TradeResult};
use crate::signals::Action;

/// Market-data or execution failure. Always recoverable at the tick boundary.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("market data unavailable: {0}")]
    Data(String),

    #[error("no bars returned for {symbol}")]
    Empty { symbol: String },

    #[error("order rejected: {0}")]
    Order(String),

    #[error("balance unavailable for {asset}: {reason}")]
    Balance { asset: String, reason: String },
}

/// State persistence failure.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("state I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state format error: {0}")]
    Format(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Buy,
    Sell,
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Buy => f.write_str("BUY"),
            Side::Sell => f.write_str("SELL"),
        }
    }
}

/// Candle and price source.
pub trait MarketData {
    /// The most recent `limit` closed bars, oldest first.
    fn fetch_bars(&self, symbol: &str, interval: &str, limit: usize)
        -> Result<Vec<Bar>, ProviderError>;

    fn fetch_price(&self, symbol: &str) -> Result<f64, ProviderError>;

    /// Free balance of `asset` in the trading account.
    fn fetch_balance(&self, asset: &str) -> Result<f64, ProviderError>;
}

/// Market order routing.
pub trait OrderExecutor {
    /// Quantity 0 on a SELL liquidates the whole base-asset balance.
    fn execute(&self, symbol: &str, side: Side, quantity: f64) -> Result<(), ProviderError>;
}

pub trait StateStore {
    /// The persisted state, or the default state when none exists.
    fn load(&self) -> Result<StrategyState, StoreError>;

    fn save(&self, state: &StrategyState) -> Result<(), StoreError>;
}

/// An executed action, as reported to the notifier.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub action: Action,
    pub symbol: String,
    pub price: f64,
    pub quantity: f64,
    /// Set on EXIT.
    pub result: Option<TradeResult>,
}

pub trait Notifier {
    fn trade(&self, event: &TradeEvent);

    fn error(&self, message: &str);
}
