//! Domain types for BATS

pub mod bar;
pub mod ledger;
pub mod row;
pub mod state;
pub mod trade;

pub use bar::Bar;
pub use ledger::{LedgerEntry, Liquidation, PositionLedger};
pub use row::{average_n, EnrichedRow};
pub use state::{StateError, StrategyState, System, TradeResult};
pub use trade::{EquityPoint, TradeKind, TradeRecord};
