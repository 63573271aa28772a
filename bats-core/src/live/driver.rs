//! LiveTrader: the single-tick driver.
//!
//! A tick is atomic: fetch, decide, execute, then commit and persist. Any
//! fetch or order failure abandons the tick with the committed state
//! untouched. A state invariant violation stops the driver.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use super::provider::{
    MarketData, Notifier, OrderExecutor, ProviderError, Side, StateStore, StoreError, TradeEvent,
};
use crate::domain::{average_n, EnrichedRow, StateError, StrategyState, TradeResult};
use crate::engine::VOLATILITY_CAP_WINDOW;
use crate::indicators::{IndicatorEngine, IndicatorSettings};
use crate::signals::{Action, SignalConfig, SignalEngine};
use crate::sizers::RiskSizer;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSettings {
    pub symbol: String,
    pub interval: String,
    pub fetch_limit: usize,
    /// Asset whose free balance funds new units.
    pub quote_asset: String,
    pub max_heat: f64,
    pub signal: SignalConfig,
    pub sizer: RiskSizer,
    pub indicators: IndicatorSettings,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            interval: "1h".into(),
            fetch_limit: 200,
            quote_asset: "USDT".into(),
            max_heat: 0.2,
            signal: SignalConfig::default(),
            sizer: RiskSizer::default(),
            indicators: IndicatorSettings::default(),
        }
    }
}

/// Result of one tick.
#[derive(Debug)]
pub enum TickOutcome {
    /// An order was executed and the state committed.
    Acted(TradeEvent),
    /// No order this tick (HOLD, or an entry refused by sizing or heat).
    Held,
    /// Tick abandoned on an external failure; state unchanged.
    Skipped(ProviderError),
    /// Strategy state invariant violated; the driver must stop.
    Fatal(StateError),
}

pub struct LiveTrader<M, E, S, N> {
    settings: LiveSettings,
    indicators: IndicatorEngine,
    signals: SignalEngine,
    market: M,
    executor: E,
    store: S,
    notifier: N,
    state: StrategyState,
}

impl<M, E, S, N> LiveTrader<M, E, S, N>
where
    M: MarketData,
    E: OrderExecutor,
    S: StateStore,
    N: Notifier,
{
    /// Build a driver, loading the last persisted state from `store`.
    pub fn new(
        settings: LiveSettings,
        market: M,
        executor: E,
        store: S,
        notifier: N,
    ) -> Result<Self, StoreError> {
        let state = store.load()?;
        info!(
            symbol = %settings.symbol,
            units = state.units_held,
            system = %state.active_system,
            "loaded strategy state"
        );
        Ok(Self {
            indicators: IndicatorEngine::new(&settings.indicators),
            signals: SignalEngine::new(settings.signal.clone()),
            settings,
            market,
            executor,
            store,
            notifier,
            state,
        })
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn settings(&self) -> &LiveSettings {
        &self.settings
    }

    /// Run one polling tick.
    pub fn run_once(&mut self) -> TickOutcome {
        if let Err(e) = self.state.validate(self.settings.signal.max_units) {
            return self.fatal(e);
        }

        let symbol = self.settings.symbol.clone();
        let bars = match self
            .market
            .fetch_bars(&symbol, &self.settings.interval, self.settings.fetch_limit)
        {
            Ok(bars) if bars.is_empty() => return self.skip(ProviderError::Empty { symbol }),
            Ok(bars) => bars,
            Err(e) => return self.skip(e),
        };
        let rows = self.indicators.compute(&bars);
        let price = match self.market.fetch_price(&symbol) {
            Ok(p) => p,
            Err(e) => return self.skip(e),
        };

        let mut next = self.state.clone();
        let decision = self.signals.evaluate(&rows, price, &mut next);
        debug!(price, action = %decision.action, reason = %decision.reason, "tick decision");

        match decision.action {
            Action::Hold => TickOutcome::Held,
            Action::Buy | Action::Pyramid => self.enter(decision.action, &rows, price, next),
            Action::Exit => self.exit(price, next),
        }
    }

    fn enter(
        &mut self,
        action: Action,
        rows: &[EnrichedRow],
        price: f64,
        mut next: StrategyState,
    ) -> TickOutcome {
        let balance = match self.market.fetch_balance(&self.settings.quote_asset) {
            Ok(b) => b,
            Err(e) => return self.skip(e),
        };
        let n = rows.last().map(|r| r.n).unwrap_or(0.0);
        let avg_n = average_n(rows, VOLATILITY_CAP_WINDOW);
        let sizer = &self.settings.sizer;
        let quantity = sizer.unit_size(balance, n, Some(avg_n));
        let heat = sizer.heat(next.units_held);

        if quantity <= 0.0 || !RiskSizer::can_enter(heat, self.settings.max_heat) {
            info!(%action, quantity, heat, max_heat = self.settings.max_heat, "entry refused");
            return TickOutcome::Held;
        }

        if let Err(e) = self
            .executor
            .execute(&self.settings.symbol, Side::Buy, quantity)
        {
            return self.skip(e);
        }

        next.record_entry(price);
        next.current_n = n;
        let event = TradeEvent {
            action,
            symbol: self.settings.symbol.clone(),
            price,
            quantity,
            result: None,
        };
        self.commit(next, event)
    }

    fn exit(&mut self, price: f64, mut next: StrategyState) -> TickOutcome {
        let Some(last_entry) = next.last_entry() else {
            return TickOutcome::Held;
        };
        if let Err(e) = self.executor.execute(&self.settings.symbol, Side::Sell, 0.0) {
            return self.skip(e);
        }

        let result = if price > last_entry {
            TradeResult::Win
        } else {
            TradeResult::Loss
        };
        next.close_position(result);
        next.current_n = 0.0;
        let event = TradeEvent {
            action: Action::Exit,
            symbol: self.settings.symbol.clone(),
            price,
            quantity: 0.0,
            result: Some(result),
        };
        self.commit(next, event)
    }

    fn commit(&mut self, next: StrategyState, event: TradeEvent) -> TickOutcome {
        self.state = next;
        if let Err(e) = self.state.validate(self.settings.signal.max_units) {
            return self.fatal(e);
        }
        if let Err(e) = self.store.save(&self.state) {
            warn!(error = %e, "failed to persist state after order");
            self.notifier.error(&format!("state save failed: {e}"));
        }
        info!(
            action = %event.action,
            price = event.price,
            quantity = event.quantity,
            units = self.state.units_held,
            "executed"
        );
        self.notifier.trade(&event);
        TickOutcome::Acted(event)
    }

    fn skip(&self, e: ProviderError) -> TickOutcome {
        warn!(error = %e, "tick skipped");
        self.notifier.error(&format!("tick skipped: {e}"));
        TickOutcome::Skipped(e)
    }

    fn fatal(&self, e: StateError) -> TickOutcome {
        error!(error = %e, "strategy state invariant violated");
        self.notifier.error(&format!("fatal: {e}"));
        TickOutcome::Fatal(e)
    }

    /// Tick until `keep_running` returns false, sleeping `interval` between
    /// ticks. Returns the number of ticks run, or the invariant violation
    /// that stopped the loop.
    pub fn run(
        &mut self,
        interval: Duration,
        mut keep_running: impl FnMut() -> bool,
    ) -> Result<usize, StateError> {
        info!(symbol = %self.settings.symbol, ?interval, "starting live loop");
        let mut ticks = 0;
        while keep_running() {
            if let TickOutcome::Fatal(e) = self.run_once() {
                return Err(e);
            }
            ticks += 1;
            if !interval.is_zero() {
                std::thread::sleep(interval);
            }
        }
        info!(ticks, "live loop stopped");
        Ok(ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Bar, System};
    use std::cell::{Cell, RefCell};

    /// Rising series with a tight range: ADX 100, every close above the
    /// prior 90-bar high.
    fn trend_bars(count: usize) -> Vec<Bar> {
        (0..count)
            .map(|i| {
                let close = 10_000.0 + 10.0 * i as f64;
                Bar::new(i as i64 * 3_600_000, close - 10.0, close + 5.0, close - 150.0, close, 1.0)
            })
            .collect()
    }

    struct Feed {
        bars: Vec<Bar>,
        price: Cell<f64>,
        fail: Cell<bool>,
    }

    impl MarketData for Feed {
        fn fetch_bars(&self, symbol: &str, _: &str, _: usize) -> Result<Vec<Bar>, ProviderError> {
            if self.fail.get() {
                return Err(ProviderError::Data(format!("{symbol} timeout")));
            }
            Ok(self.bars.clone())
        }

        fn fetch_price(&self, _: &str) -> Result<f64, ProviderError> {
            Ok(self.price.get())
        }

        fn fetch_balance(&self, _: &str) -> Result<f64, ProviderError> {
            Ok(10_000.0)
        }
    }

    #[derive(Default)]
    struct Orders {
        sent: RefCell<Vec<(Side, f64)>>,
        reject: Cell<bool>,
    }

    impl OrderExecutor for &Orders {
        fn execute(&self, _: &str, side: Side, quantity: f64) -> Result<(), ProviderError> {
            if self.reject.get() {
                return Err(ProviderError::Order("insufficient margin".into()));
            }
            self.sent.borrow_mut().push((side, quantity));
            Ok(())
        }
    }

    #[derive(Default)]
    struct Store {
        initial: StrategyState,
        saved: RefCell<Vec<StrategyState>>,
        fail_save: Cell<bool>,
    }

    impl StateStore for &Store {
        fn load(&self) -> Result<StrategyState, StoreError> {
            Ok(self.initial.clone())
        }

        fn save(&self, state: &StrategyState) -> Result<(), StoreError> {
            if self.fail_save.get() {
                return Err(StoreError::Io(std::io::Error::other("disk full")));
            }
            self.saved.borrow_mut().push(state.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct Inbox {
        trades: RefCell<Vec<TradeEvent>>,
        errors: RefCell<Vec<String>>,
    }

    impl Notifier for &Inbox {
        fn trade(&self, event: &TradeEvent) {
            self.trades.borrow_mut().push(event.clone());
        }

        fn error(&self, message: &str) {
            self.errors.borrow_mut().push(message.to_string());
        }
    }

    fn feed(price: f64) -> Feed {
        Feed {
            bars: trend_bars(150),
            price: Cell::new(price),
            fail: Cell::new(false),
        }
    }

    fn last_close() -> f64 {
        10_000.0 + 10.0 * 149.0
    }

    #[test]
    fn breakout_buys_and_persists() {
        let (orders, store, inbox) = (Orders::default(), Store::default(), Inbox::default());
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(last_close()), &orders, &store, &inbox)
                .unwrap();

        let event = match trader.run_once() {
            TickOutcome::Acted(event) => event,
            other => panic!("expected an order, got {other:?}"),
        };
        assert_eq!(event.action, Action::Buy);
        assert!(event.quantity > 0.0);
        assert_eq!(orders.sent.borrow()[0].0, Side::Buy);
        assert_eq!(trader.state().units_held, 1);
        assert_eq!(trader.state().active_system, System::S3);
        assert!(trader.state().current_n > 0.0);
        assert_eq!(store.saved.borrow().len(), 1);
        assert_eq!(inbox.trades.borrow().len(), 1);
    }

    #[test]
    fn fetch_failure_skips_without_mutation() {
        let (orders, store, inbox) = (Orders::default(), Store::default(), Inbox::default());
        let market = feed(last_close());
        market.fail.set(true);
        let mut trader =
            LiveTrader::new(LiveSettings::default(), market, &orders, &store, &inbox).unwrap();

        assert!(matches!(trader.run_once(), TickOutcome::Skipped(ProviderError::Data(_))));
        assert_eq!(trader.state(), &StrategyState::default());
        assert!(orders.sent.borrow().is_empty());
        assert_eq!(inbox.errors.borrow().len(), 1);
    }

    #[test]
    fn rejected_order_leaves_state_untouched() {
        let (orders, store, inbox) = (Orders::default(), Store::default(), Inbox::default());
        orders.reject.set(true);
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(last_close()), &orders, &store, &inbox)
                .unwrap();

        assert!(matches!(trader.run_once(), TickOutcome::Skipped(ProviderError::Order(_))));
        assert!(trader.state().is_flat());
        assert_eq!(trader.state().active_system, System::S1);
        assert!(store.saved.borrow().is_empty());
    }

    #[test]
    fn exit_liquidates_and_scores_loss_below_entry() {
        let (orders, inbox) = (Orders::default(), Inbox::default());
        let store = Store {
            initial: StrategyState {
                units_held: 2,
                entry_prices: vec![11_000.0, 11_500.0],
                last_trade_result: None,
                current_n: 100.0,
                active_system: System::S3,
            },
            ..Store::default()
        };
        // hard stop at 11_500 - 500 = 11_000; 10_000 is below it
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(10_000.0), &orders, &store, &inbox)
                .unwrap();

        let TickOutcome::Acted(event) = trader.run_once() else {
            panic!("expected exit");
        };
        assert_eq!(event.action, Action::Exit);
        assert_eq!(event.result, Some(TradeResult::Loss));
        assert_eq!(orders.sent.borrow()[0], (Side::Sell, 0.0));
        assert!(trader.state().is_flat());
        assert_eq!(trader.state().current_n, 0.0);
        assert_eq!(trader.state().last_trade_result, Some(TradeResult::Loss));
    }

    #[test]
    fn exit_above_mean_but_below_last_entry_is_a_loss() {
        let (orders, inbox) = (Orders::default(), Inbox::default());
        let store = Store {
            initial: StrategyState {
                units_held: 2,
                entry_prices: vec![11_000.0, 11_500.0],
                last_trade_result: None,
                current_n: 30.0,
                active_system: System::S3,
            },
            ..Store::default()
        };
        // hard stop at 11_500 - 5 * 30 = 11_350; mean entry is 11_250
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(11_300.0), &orders, &store, &inbox)
                .unwrap();

        let TickOutcome::Acted(event) = trader.run_once() else {
            panic!("expected exit");
        };
        assert_eq!(event.action, Action::Exit);
        assert_eq!(event.result, Some(TradeResult::Loss));
        assert_eq!(trader.state().last_trade_result, Some(TradeResult::Loss));
    }

    #[test]
    fn exit_above_last_entry_is_a_win() {
        let (orders, inbox) = (Orders::default(), Inbox::default());
        let store = Store {
            initial: StrategyState {
                units_held: 1,
                entry_prices: vec![11_000.0],
                last_trade_result: None,
                current_n: 30.0,
                active_system: System::S1,
            },
            ..Store::default()
        };
        // S1 exits below the 10-bar low of the trend, which sits above 11_000
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(11_200.0), &orders, &store, &inbox)
                .unwrap();

        let TickOutcome::Acted(event) = trader.run_once() else {
            panic!("expected exit");
        };
        assert_eq!(event.action, Action::Exit);
        assert_eq!(event.result, Some(TradeResult::Win));
    }

    #[test]
    fn save_failure_is_notified_but_order_stands() {
        let (orders, store, inbox) = (Orders::default(), Store::default(), Inbox::default());
        store.fail_save.set(true);
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(last_close()), &orders, &store, &inbox)
                .unwrap();

        assert!(matches!(trader.run_once(), TickOutcome::Acted(_)));
        assert_eq!(trader.state().units_held, 1);
        assert!(inbox.errors.borrow()[0].contains("state save failed"));
    }

    #[test]
    fn heat_limit_holds() {
        let (orders, store, inbox) = (Orders::default(), Store::default(), Inbox::default());
        let settings = LiveSettings {
            max_heat: 0.0,
            ..LiveSettings::default()
        };
        let mut trader =
            LiveTrader::new(settings, feed(last_close()), &orders, &store, &inbox).unwrap();
        assert!(matches!(trader.run_once(), TickOutcome::Held));
        assert!(orders.sent.borrow().is_empty());
    }

    #[test]
    fn corrupt_state_is_fatal_and_stops_run() {
        let (orders, inbox) = (Orders::default(), Inbox::default());
        let store = Store {
            initial: StrategyState {
                units_held: 2,
                entry_prices: vec![100.0],
                ..StrategyState::default()
            },
            ..Store::default()
        };
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(last_close()), &orders, &store, &inbox)
                .unwrap();
        let result = trader.run(Duration::ZERO, || true);
        assert!(matches!(result, Err(StateError::EntryCountMismatch { .. })));
    }

    #[test]
    fn run_stops_when_asked() {
        let (orders, store, inbox) = (Orders::default(), Store::default(), Inbox::default());
        let mut trader =
            LiveTrader::new(LiveSettings::default(), feed(5_000.0), &orders, &store, &inbox)
                .unwrap();
        let mut remaining = 3;
        let ticks = trader
            .run(Duration::ZERO, || {
                remaining -= 1;
                remaining >= 0
            })
            .unwrap();
        assert_eq!(ticks, 3);
    }
}
