//! Live operation: one decision per polling tick.
//!
//! The driver uses the same indicator engine, signal engine and sizer as the
//! backtest, and reaches the outside world only through the traits in
//! [`provider`].

pub mod driver;
pub mod provider;

pub use driver::{LiveSettings, LiveTrader, TickOutcome};
pub use provider::{
    MarketData, Notifier, OrderExecutor, ProviderError, Side, StateStore, StoreError, TradeEvent,
};
