//! Signal generation: the Turtle entry/exit/pyramid state machine.
//!
//! The engine reads the row history and the strategy state and returns an
//! action. It may update `active_system` when it signals a breakout, but
//! position bookkeeping (units, entry prices, trade result) belongs to the
//! caller that applies the action.

pub mod action;
pub mod turtle;

pub use action::{Action, Decision, Reason};
pub use turtle::{SignalConfig, SignalEngine};
