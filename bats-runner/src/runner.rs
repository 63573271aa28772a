//! Run orchestration. Wires config, bar loading, engine, metrics, and the
//! paper-trading collaborators together.
//!
//! Entry points:
//! - `run_single_backtest()`: resolves the bar source, then runs. Used by the CLI.
//! - `run_backtest_from_bars()`: takes pre-loaded bars.
//! - `run_paper()`: replays bars through the live driver.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use bats_core::domain::{Bar, StateError, StrategyState};
use bats_core::engine::run_backtest;
use bats_core::indicators::IndicatorEngine;
use bats_core::live::{LiveTrader, StoreError};

use crate::config::{BacktestConfig, ConfigError, LiveConfig};
use crate::data_loader::{filter_bars, interval_ms, load_bars, synthetic_bars, LoadError};
use crate::paper::{PaperBook, PaperExecutor, PaperStats, ReplayFeed, TracingNotifier};
use crate::report::{BacktestReport, ReportError};
use crate::state_store::JsonStateStore;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("data error: {0}")]
    Data(#[from] LoadError),

    #[error("strategy state invariant violated: {0}")]
    State(#[from] StateError),

    #[error("state store error: {0}")]
    Store(#[from] StoreError),

    #[error("report error: {0}")]
    Report(#[from] ReportError),
}

/// Starting price of the synthetic random walk.
pub const SYNTHETIC_START_PRICE: f64 = 20_000.0;

/// Where backtest bars come from.
#[derive(Debug, Clone, PartialEq)]
pub enum BarSource {
    /// `.csv` or `.json` bar file.
    File(PathBuf),
    /// Seeded random walk of `count` bars.
    Synthetic { count: usize, seed: u64 },
}

/// Resolve `source` into a validated, filtered bar series.
pub fn load_source(config: &BacktestConfig, source: &BarSource) -> Result<Vec<Bar>, RunError> {
    let opts = config.load_options();
    match source {
        BarSource::File(path) => Ok(load_bars(path, &opts)?),
        BarSource::Synthetic { count, seed } => {
            let step = interval_ms(&config.backtest.interval).ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "unknown interval '{}'",
                    config.backtest.interval
                ))
            })?;
            let start = config.backtest.start_time.unwrap_or(0);
            warn!(count, seed, "using synthetic bars");
            let bars = filter_bars(
                synthetic_bars(*count, *seed, SYNTHETIC_START_PRICE, start, step),
                &opts,
            );
            if bars.is_empty() {
                return Err(LoadError::Empty.into());
            }
            Ok(bars)
        }
    }
}

/// Run a backtest from a config and a bar source.
pub fn run_single_backtest(
    config: &BacktestConfig,
    source: &BarSource,
) -> Result<BacktestReport, RunError> {
    config.validate()?;
    let bars = load_source(config, source)?;
    run_backtest_from_bars(config, &bars)
}

/// Run a backtest on pre-loaded bars.
///
/// A series no longer than the indicator warm-up simulates no bars and yields
/// an empty report.
pub fn run_backtest_from_bars(
    config: &BacktestConfig,
    bars: &[Bar],
) -> Result<BacktestReport, RunError> {
    let engine_config = config.to_engine_config();
    let warmup = IndicatorEngine::new(&engine_config.indicators).warmup();
    if bars.len() <= warmup {
        warn!(bars = bars.len(), warmup, "series shorter than warm-up, nothing to simulate");
    }

    let result = run_backtest(bars, &engine_config)?;
    let report = BacktestReport::new(config, &result);
    let s = &report.summary;
    info!(
        symbol = %engine_config.symbol,
        bars = result.bars_simulated(),
        trades = s.total_trades,
        exits = s.total_exits,
        final_equity = s.final_equity,
        total_return_pct = s.total_return_pct,
        max_drawdown_pct = s.max_drawdown_pct,
        "backtest complete"
    );
    Ok(report)
}

// ─── Paper trading ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct PaperOptions {
    /// Quote-asset cash the paper account starts with.
    pub initial_balance: f64,
    /// Stop after this many ticks; `None` replays to the last bar.
    pub ticks: Option<usize>,
    /// Sleep between ticks.
    pub interval: Duration,
}

impl Default for PaperOptions {
    fn default() -> Self {
        Self {
            initial_balance: 10_000.0,
            ticks: None,
            interval: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaperOutcome {
    pub ticks: usize,
    pub stats: PaperStats,
    pub state: StrategyState,
}

/// Replay `bars` through the live driver, one bar per tick.
///
/// The replay starts once `fetch_limit` bars are available (or at the last
/// bar of a shorter series). Strategy state is loaded from and saved to
/// `config.live.state_path`.
pub fn run_paper(
    config: &LiveConfig,
    bars: Vec<Bar>,
    opts: &PaperOptions,
) -> Result<PaperOutcome, RunError> {
    config.validate()?;
    if bars.is_empty() {
        return Err(LoadError::Empty.into());
    }
    let settings = config.to_live_settings();
    let start = settings.fetch_limit.min(bars.len()) - 1;
    let book = PaperBook::new(
        settings.symbol.clone(),
        settings.quote_asset.clone(),
        bars,
        start,
        opts.initial_balance,
    )
    .shared();

    let mut trader = LiveTrader::new(
        settings,
        ReplayFeed::new(book.clone()),
        PaperExecutor::new(book.clone()),
        JsonStateStore::new(&config.live.state_path),
        TracingNotifier,
    )?;

    let mut remaining = opts.ticks;
    let mut started = false;
    let ticks = trader.run(opts.interval, || {
        if let Some(left) = remaining.as_mut() {
            if *left == 0 {
                return false;
            }
            *left -= 1;
        }
        if !started {
            started = true;
            return true;
        }
        book.borrow_mut().advance()
    })?;

    let stats = book.borrow().stats();
    info!(ticks, equity = stats.equity, fills = stats.fills, "paper run complete");
    Ok(PaperOutcome {
        ticks,
        stats,
        state: trader.state().clone(),
    })
}
