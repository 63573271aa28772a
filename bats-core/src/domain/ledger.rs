//! PositionLedger: per-unit notional bookkeeping for the backtest.
//!
//! Each pyramided unit is sized independently, so the ledger keeps the
//! notional committed at entry alongside the entry price. Mark-to-market at
//! price `p` is `sum(notional_k * p / entry_price_k)`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub entry_price: f64,
    pub notional: f64,
}

impl LedgerEntry {
    pub fn value_at(&self, price: f64) -> f64 {
        self.notional * (price / self.entry_price)
    }
}

/// Proceeds of flattening every open unit at one price.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Liquidation {
    pub proceeds: f64,
    pub committed: f64,
    pub gain: f64,
}

#[derive(Debug, Clone, Default)]
pub struct PositionLedger {
    entries: Vec<LedgerEntry>,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, entry_price: f64, notional: f64) {
        self.entries.push(LedgerEntry {
            entry_price,
            notional,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn committed(&self) -> f64 {
        self.entries.iter().map(|e| e.notional).sum()
    }

    pub fn mark_to_market(&self, price: f64) -> f64 {
        self.entries.iter().map(|e| e.value_at(price)).sum()
    }

    /// Close every unit at `price` and empty the ledger.
    pub fn liquidate(&mut self, price: f64) -> Liquidation {
        let proceeds = self.mark_to_market(price);
        let committed = self.committed();
        self.entries.clear();
        Liquidation {
            proceeds,
            committed,
            gain: proceeds - committed,
        }
    }
}
