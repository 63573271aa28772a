//! JSON-file strategy state persistence for the live driver.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use bats_core::domain::StrategyState;
use bats_core::live::{StateStore, StoreError};

/// Stores `StrategyState` as pretty JSON at a fixed path.
///
/// A missing file loads as the default state. An unreadable or malformed
/// file is an error.
#[derive(Debug, Clone)]
pub struct JsonStateStore {
    path: PathBuf,
}

impl JsonStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl StateStore for JsonStateStore {
    fn load(&self) -> Result<StrategyState, StoreError> {
        if !self.path.exists() {
            info!(path = %self.path.display(), "no state file, using defaults");
            return Ok(StrategyState::default());
        }
        let content = std::fs::read_to_string(&self.path)?;
        let state = serde_json::from_str(&content)?;
        debug!(path = %self.path.display(), "state loaded");
        Ok(state)
    }

    /// Writes to a sibling temp file and renames it over the target.
    fn save(&self, state: &StrategyState) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &self.path)?;
        debug!(path = %self.path.display(), units = state.units_held, "state saved");
        Ok(())
    }
}
