//! Action and the rule that produced it.

use serde::{Deserialize, Serialize};

use crate::domain::System;

/// What the driving loop should do on this bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Buy,
    Pyramid,
    Exit,
    Hold,
}

impl Action {
    /// BUY and PYRAMID both add a unit.
    pub fn is_entry(&self) -> bool {
        matches!(self, Action::Buy | Action::Pyramid)
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Action::Buy => "BUY",
            Action::Pyramid => "PYRAMID",
            Action::Exit => "EXIT",
            Action::Hold => "HOLD",
        };
        f.write_str(s)
    }
}

/// The rule that decided the action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    HardStop,
    TrailingStop,
    Pyramid,
    /// In position, no exit or add.
    Holding,
    RegimeFilter,
    TrendFilter,
    Breakout(System),
    /// S1 breakout suppressed after a winning trade.
    SkipRule,
    NoBreakout,
    /// Empty row history.
    NoData,
}

impl std::fmt::Display for Reason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Reason::HardStop => f.write_str("hard stop"),
            Reason::TrailingStop => f.write_str("trailing stop"),
            Reason::Pyramid => f.write_str("pyramid"),
            Reason::Holding => f.write_str("holding"),
            Reason::RegimeFilter => f.write_str("regime filter"),
            Reason::TrendFilter => f.write_str("trend filter"),
            Reason::Breakout(system) => write!(f, "{system} breakout"),
            Reason::SkipRule => f.write_str("skip rule"),
            Reason::NoBreakout => f.write_str("no breakout"),
            Reason::NoData => f.write_str("no data"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub action: Action,
    pub reason: Reason,
}

impl Decision {
    pub fn new(action: Action, reason: Reason) -> Self {
        Self { action, reason }
    }

    pub fn hold(reason: Reason) -> Self {
        Self::new(Action::Hold, reason)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_serializes_uppercase() {
        assert_eq!(serde_json::to_string(&Action::Pyramid).unwrap(), "\"PYRAMID\"");
        assert_eq!(Action::Exit.to_string(), "EXIT");
    }

    #[test]
    fn entries() {
        assert!(Action::Buy.is_entry());
        assert!(Action::Pyramid.is_entry());
        assert!(!Action::Exit.is_entry());
        assert!(!Action::Hold.is_entry());
    }

    #[test]
    fn reason_display_names_system() {
        assert_eq!(Reason::Breakout(System::S2).to_string(), "S2 breakout");
    }
}
