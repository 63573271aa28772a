//! BATS Core: indicators, sizing, breakout signals, backtest loop, live tick driver.
//!
//! This crate contains the decision engine of the trading system:
//! - Domain types (bars, enriched rows, strategy state, position ledger, trades)
//! - Causal indicator computation (N, ADX, Donchian channels, EMA200)
//! - Volatility and drawdown aware unit sizing
//! - The Turtle breakout / exit / pyramid state machine
//! - Bar-by-bar backtest simulation
//! - Single-tick live driver over pluggable market, order, state and
//!   notification collaborators

pub mod domain;
pub mod engine;
pub mod indicators;
pub mod live;
pub mod signals;
pub mod sizers;
