//! Position sizing: volatility units and entry admission.
//!
//! Sizers translate an account value and the current N into a unit quantity.
//! They never decide whether to trade; that is the signal engine's job.

pub mod unit;

pub use unit::RiskSizer;

/// Decimal places kept on every sized quantity.
pub const QTY_PRECISION: i32 = 6;

/// Round a quantity to `QTY_PRECISION` decimal places.
pub fn round_qty(qty: f64) -> f64 {
    let scale = 10f64.powi(QTY_PRECISION);
    (qty * scale).round() / scale
}
