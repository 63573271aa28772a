//! Bar-by-bar simulation loop.
//!
//! Per bar, from the warm-up index on:
//! 1. `current_n` takes the row's N
//! 2. the signal engine sees rows `..=i` only
//! 3. the action is applied to cash, ledger and state
//! 4. equity is marked at the bar's close

use tracing::{debug, info};

use super::state::{EngineConfig, EngineState, RunResult};
use crate::domain::{Bar, EnrichedRow, StateError, TradeKind};
use crate::indicators::IndicatorEngine;
use crate::signals::{Action, SignalEngine};

/// Run a backtest on raw bars.
///
/// Indicators are computed once up front; simulation starts at
/// `IndicatorEngine::warmup()`.
pub fn run_backtest(bars: &[Bar], config: &EngineConfig) -> Result<RunResult, StateError> {
    let engine = IndicatorEngine::new(&config.indicators);
    let rows = engine.compute(bars);
    simulate(&rows, engine.warmup(), config)
}

/// Replay precomputed rows from `start` to the end.
///
/// Fails only on a strategy state invariant violation, which indicates a
/// logic bug.
pub fn simulate(
    rows: &[EnrichedRow],
    start: usize,
    config: &EngineConfig,
) -> Result<RunResult, StateError> {
    let signals = SignalEngine::new(config.signal.clone());
    let mut state = EngineState::new(config.initial_balance);
    let max_units = config.max_units();

    info!(
        symbol = %config.symbol,
        rows = rows.len(),
        start,
        initial_balance = config.initial_balance,
        "starting backtest"
    );

    for i in start..rows.len() {
        let history = &rows[..=i];
        let row = &rows[i];
        let price = row.close();

        state.strategy.current_n = row.n;
        let decision = signals.evaluate(history, price, &mut state.strategy);

        let applied = match decision.action {
            Action::Buy => state.try_enter(TradeKind::Buy, history, config),
            Action::Pyramid => state.try_enter(TradeKind::Pyramid, history, config),
            Action::Exit => state.exit_all(row.timestamp(), price, config).is_some(),
            Action::Hold => false,
        };
        if decision.action != Action::Hold {
            debug!(
                index = i,
                timestamp = row.timestamp(),
                price,
                action = %decision.action,
                reason = %decision.reason,
                applied,
                units = state.strategy.units_held,
                "signal"
            );
        }

        state.strategy.validate(max_units)?;
        state.mark(row.timestamp(), price);
    }

    let result = RunResult {
        symbol: config.symbol.clone(),
        initial_balance: config.initial_balance,
        final_balance: state.balance,
        open_units: state.ledger.entries().to_vec(),
        trades: state.trades,
        equity_curve: state.equity_curve,
        final_state: state.strategy,
        start_index: start,
        rows_total: rows.len(),
    };

    info!(
        trades = result.trades.len(),
        final_equity = result.final_equity(),
        open_units = result.open_units.len(),
        "backtest complete"
    );

    Ok(result)
}
