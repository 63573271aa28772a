//! Backtesting engine: replays enriched rows through the signal engine and
//! sizer, bar by bar, exactly as the live driver would.
//!
//! The loop owns the cash balance, the per-unit position ledger, the strategy
//! state, the trade log, and the equity curve. Nothing is shared across runs.

pub mod accounting;
pub mod loop_runner;
pub mod state;

pub use accounting::VOLATILITY_CAP_WINDOW;
pub use loop_runner::{run_backtest, simulate};
pub use state::{EngineConfig, EngineState, RunResult};
