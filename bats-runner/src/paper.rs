//! Paper trading: replay a bar series through the live driver.
//!
//! `ReplayFeed` and `PaperExecutor` share one [`PaperBook`]: the feed exposes
//! the bars up to the replay cursor and the cursor bar's close as the current
//! price, and the executor fills market orders at that price against the
//! book's cash and base-asset balances. The caller advances the cursor
//! between ticks.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use tracing::{error, info};

use bats_core::domain::Bar;
use bats_core::live::{MarketData, Notifier, OrderExecutor, ProviderError, Side, TradeEvent};

/// One simulated fill.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaperFill {
    pub timestamp: i64,
    pub side: Side,
    pub quantity: f64,
    pub price: f64,
}

/// Replay cursor plus a single-symbol spot account.
#[derive(Debug)]
pub struct PaperBook {
    symbol: String,
    quote_asset: String,
    bars: Vec<Bar>,
    cursor: usize,
    initial_quote: f64,
    quote: f64,
    base: f64,
    fills: Vec<PaperFill>,
    peak_equity: f64,
    max_drawdown: f64,
}

pub type SharedBook = Rc<RefCell<PaperBook>>;

impl PaperBook {
    /// A book positioned at bar `start` (clamped to the last bar).
    pub fn new(
        symbol: impl Into<String>,
        quote_asset: impl Into<String>,
        bars: Vec<Bar>,
        start: usize,
        quote_balance: f64,
    ) -> Self {
        let cursor = start.min(bars.len().saturating_sub(1));
        Self {
            symbol: symbol.into(),
            quote_asset: quote_asset.into(),
            bars,
            cursor,
            initial_quote: quote_balance,
            quote: quote_balance,
            base: 0.0,
            fills: Vec::new(),
            peak_equity: quote_balance,
            max_drawdown: 0.0,
        }
    }

    pub fn shared(self) -> SharedBook {
        Rc::new(RefCell::new(self))
    }

    pub fn current_bar(&self) -> Option<&Bar> {
        self.bars.get(self.cursor)
    }

    pub fn price(&self) -> Option<f64> {
        self.current_bar().map(|b| b.close)
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Step to the next bar. Returns false once the series is exhausted.
    pub fn advance(&mut self) -> bool {
        self.mark();
        if self.cursor + 1 >= self.bars.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    pub fn quote_balance(&self) -> f64 {
        self.quote
    }

    pub fn base_balance(&self) -> f64 {
        self.base
    }

    pub fn fills(&self) -> &[PaperFill] {
        &self.fills
    }

    /// Cash plus base holdings at the cursor price.
    pub fn equity(&self) -> f64 {
        self.quote + self.base * self.price().unwrap_or(0.0)
    }

    fn mark(&mut self) {
        let equity = self.equity();
        self.peak_equity = self.peak_equity.max(equity);
        if self.peak_equity > 0.0 {
            self.max_drawdown = self
                .max_drawdown
                .max((self.peak_equity - equity) / self.peak_equity);
        }
    }

    fn window(&self, limit: usize) -> Vec<Bar> {
        if self.bars.is_empty() {
            return Vec::new();
        }
        let end = self.cursor + 1;
        let start = end.saturating_sub(limit);
        self.bars[start..end].to_vec()
    }

    fn fill(&mut self, side: Side, quantity: f64) -> Result<(), ProviderError> {
        let Some(bar) = self.current_bar().copied() else {
            return Err(ProviderError::Order("no replay bar".into()));
        };
        let price = bar.close;
        let quantity = match side {
            Side::Buy => {
                if quantity.is_nan() || quantity <= 0.0 {
                    return Err(ProviderError::Order(format!("invalid quantity {quantity}")));
                }
                let cost = quantity * price;
                if cost > self.quote + 1e-9 {
                    return Err(ProviderError::Order(format!(
                        "insufficient {}: need {cost:.2}, have {:.2}",
                        self.quote_asset, self.quote
                    )));
                }
                self.quote -= cost;
                self.base += quantity;
                quantity
            }
            Side::Sell => {
                if self.base <= 0.0 {
                    return Err(ProviderError::Order("no base asset to sell".into()));
                }
                // 0 liquidates the whole holding
                let qty = if quantity > 0.0 {
                    quantity.min(self.base)
                } else {
                    self.base
                };
                self.base -= qty;
                self.quote += qty * price;
                qty
            }
        };
        self.fills.push(PaperFill {
            timestamp: bar.timestamp,
            side,
            quantity,
            price,
        });
        Ok(())
    }

    pub fn stats(&self) -> PaperStats {
        let equity = self.equity();
        let peak = self.peak_equity.max(equity);
        let current = if peak > 0.0 { (peak - equity) / peak } else { 0.0 };
        let drawdown = self.max_drawdown.max(current);
        PaperStats {
            symbol: self.symbol.clone(),
            initial_balance: self.initial_quote,
            equity,
            quote_balance: self.quote,
            base_balance: self.base,
            fills: self.fills.len(),
            return_pct: if self.initial_quote > 0.0 {
                (equity - self.initial_quote) / self.initial_quote * 100.0
            } else {
                0.0
            },
            max_drawdown_pct: drawdown * 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaperStats {
    pub symbol: String,
    pub initial_balance: f64,
    pub equity: f64,
    pub quote_balance: f64,
    pub base_balance: f64,
    pub fills: usize,
    pub return_pct: f64,
    pub max_drawdown_pct: f64,
}

impl fmt::Display for PaperStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{:=^50}", " PAPER TRADING ")?;
        writeln!(f, "Symbol:          {}", self.symbol)?;
        writeln!(f, "Initial Balance: {:.2}", self.initial_balance)?;
        writeln!(f, "Equity:          {:.2} ({:+.2}%)", self.equity, self.return_pct)?;
        writeln!(f, "Cash:            {:.2}", self.quote_balance)?;
        writeln!(f, "Holding:         {:.6}", self.base_balance)?;
        writeln!(f, "Fills:           {}", self.fills)?;
        writeln!(f, "Max Drawdown:    {:.2}%", self.max_drawdown_pct)?;
        write!(f, "{:=^50}", "")
    }
}

// ─── Collaborators ──────────────────────────────────────────────────

/// `MarketData` over the shared book.
#[derive(Debug, Clone)]
pub struct ReplayFeed {
    book: SharedBook,
}

impl ReplayFeed {
    pub fn new(book: SharedBook) -> Self {
        Self { book }
    }
}

impl MarketData for ReplayFeed {
    fn fetch_bars(
        &self,
        symbol: &str,
        _interval: &str,
        limit: usize,
    ) -> Result<Vec<Bar>, ProviderError> {
        let book = self.book.borrow();
        if symbol != book.symbol {
            return Err(ProviderError::Data(format!(
                "replay holds {}, not {symbol}",
                book.symbol
            )));
        }
        Ok(book.window(limit))
    }

    fn fetch_price(&self, symbol: &str) -> Result<f64, ProviderError> {
        let book = self.book.borrow();
        if symbol != book.symbol {
            return Err(ProviderError::Data(format!(
                "replay holds {}, not {symbol}",
                book.symbol
            )));
        }
        book.price().ok_or_else(|| ProviderError::Empty {
            symbol: symbol.to_string(),
        })
    }

    fn fetch_balance(&self, asset: &str) -> Result<f64, ProviderError> {
        let book = self.book.borrow();
        if asset == book.quote_asset {
            Ok(book.quote)
        } else if book.symbol.starts_with(asset) {
            Ok(book.base)
        } else {
            Err(ProviderError::Balance {
                asset: asset.to_string(),
                reason: "not held in paper account".into(),
            })
        }
    }
}

/// `OrderExecutor` filling at the replay price.
#[derive(Debug, Clone)]
pub struct PaperExecutor {
    book: SharedBook,
}

impl PaperExecutor {
    pub fn new(book: SharedBook) -> Self {
        Self { book }
    }
}

impl OrderExecutor for PaperExecutor {
    fn execute(&self, symbol: &str, side: Side, quantity: f64) -> Result<(), ProviderError> {
        let mut book = self.book.borrow_mut();
        if symbol != book.symbol {
            return Err(ProviderError::Order(format!("unknown symbol {symbol}")));
        }
        book.fill(side, quantity)
    }
}

/// Notifier that writes to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn trade(&self, event: &TradeEvent) {
        info!(
            action = %event.action,
            symbol = %event.symbol,
            price = event.price,
            quantity = event.quantity,
            result = ?event.result,
            "trade"
        );
    }

    fn error(&self, message: &str) {
        error!(detail = message, "trader error");
    }
}
