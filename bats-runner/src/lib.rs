//! BATS Runner: configuration, bar loading, backtest orchestration, reports,
//! state persistence, and paper trading.
//!
//! This crate builds on `bats-core` to provide:
//! - Layered TOML configuration with validation
//! - Bar loading from CSV / JSON files or a seeded synthetic walk
//! - Single-backtest runner with summary metrics and a JSON report
//! - JSON-file strategy state store for the live driver
//! - Paper-trading collaborators that replay bars through the live driver

pub mod config;
pub mod data_loader;
pub mod metrics;
pub mod paper;
pub mod report;
pub mod runner;
pub mod state_store;

pub use config::{BacktestConfig, ConfigError, LiveConfig};
pub use data_loader::{load_bars, synthetic_bars, LoadError, LoadOptions};
pub use metrics::Summary;
pub use paper::{PaperBook, PaperExecutor, PaperStats, ReplayFeed, TracingNotifier};
pub use report::{default_report_name, render_text, BacktestReport, ReportError};
pub use runner::{
    run_backtest_from_bars, run_paper, run_single_backtest, BarSource, PaperOptions, PaperOutcome,
    RunError,
};
pub use state_store::JsonStateStore;
