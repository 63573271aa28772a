//! TOML configuration for backtest and live runs.
//!
//! A config is a base file plus an optional local override. Both are parsed
//! into `toml::Value` trees and deep-merged (override wins key by key, tables
//! merge recursively) before deserialisation, so a local file only needs the
//! keys it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bats_core::engine::EngineConfig;
use bats_core::indicators::IndicatorSettings;
use bats_core::live::LiveSettings;
use bats_core::signals::SignalConfig;
use bats_core::sizers::RiskSizer;

use crate::data_loader::LoadOptions;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

// ─── Tables ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub symbol: String,
    pub interval: String,
    pub initial_balance: f64,
    pub max_units: usize,
    /// Inclusive lower bound on bar timestamps (epoch ms).
    pub start_time: Option<i64>,
    /// Inclusive upper bound on bar timestamps (epoch ms).
    pub end_time: Option<i64>,
    /// Keep at most this many of the newest bars.
    pub limit: Option<usize>,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            symbol: "BTCUSDT".into(),
            interval: "1h".into(),
            initial_balance: 10_000.0,
            max_units: 4,
            start_time: None,
            end_time: None,
            limit: None,
        }
    }
}

/// Breakout and exit rule parameters. `max_units` lives with the run table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategySection {
    pub use_s1: bool,
    pub use_s2: bool,
    pub use_s3: bool,
    pub adx_filter_threshold: f64,
    pub stop_n_multiplier: f64,
    pub pyramid_step_n: f64,
}

impl Default for StrategySection {
    fn default() -> Self {
        let signal = SignalConfig::default();
        Self {
            use_s1: signal.use_s1,
            use_s2: signal.use_s2,
            use_s3: signal.use_s3,
            adx_filter_threshold: signal.adx_filter_threshold,
            stop_n_multiplier: signal.stop_n_multiplier,
            pyramid_step_n: signal.pyramid_step_n,
        }
    }
}

impl StrategySection {
    pub fn to_signal_config(&self, max_units: usize) -> SignalConfig {
        SignalConfig {
            use_s1: self.use_s1,
            use_s2: self.use_s2,
            use_s3: self.use_s3,
            adx_filter_threshold: self.adx_filter_threshold,
            stop_n_multiplier: self.stop_n_multiplier,
            max_units,
            pyramid_step_n: self.pyramid_step_n,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.use_s1 || self.use_s2 || self.use_s3) {
            return Err(invalid("at least one of use_s1, use_s2, use_s3 must be enabled"));
        }
        if self.stop_n_multiplier.is_nan() || self.stop_n_multiplier <= 0.0 {
            return Err(invalid(format!(
                "stop_n_multiplier must be positive, got {}",
                self.stop_n_multiplier
            )));
        }
        if self.pyramid_step_n.is_nan() || self.pyramid_step_n <= 0.0 {
            return Err(invalid(format!(
                "pyramid_step_n must be positive, got {}",
                self.pyramid_step_n
            )));
        }
        if !self.adx_filter_threshold.is_finite() || self.adx_filter_threshold < 0.0 {
            return Err(invalid(format!(
                "adx_filter_threshold must be a non-negative number, got {}",
                self.adx_filter_threshold
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SizingSection {
    pub risk_fraction: f64,
    pub volatility_cap: bool,
    pub drawdown_scaling: bool,
    pub max_heat: Option<f64>,
}

impl Default for SizingSection {
    fn default() -> Self {
        Self {
            risk_fraction: RiskSizer::default().risk_fraction,
            volatility_cap: false,
            drawdown_scaling: false,
            max_heat: None,
        }
    }
}

impl SizingSection {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(self.risk_fraction > 0.0 && self.risk_fraction < 1.0) {
            return Err(invalid(format!(
                "risk_fraction must be in (0, 1), got {}",
                self.risk_fraction
            )));
        }
        if let Some(heat) = self.max_heat {
            validate_heat(heat)?;
        }
        Ok(())
    }
}

// ─── Backtest ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub strategy: StrategySection,
    pub sizing: SizingSection,
    pub indicators: IndicatorSettings,
}

impl BacktestConfig {
    /// Parse and validate a single TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `base`, deep-merge `local` over it when given, and validate.
    pub fn load(base: &Path, local: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = load_layered(base, local)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let run = &self.backtest;
        if run.symbol.trim().is_empty() {
            return Err(invalid("symbol must not be empty"));
        }
        if !(run.initial_balance.is_finite() && run.initial_balance > 0.0) {
            return Err(invalid(format!(
                "initial_balance must be positive, got {}",
                run.initial_balance
            )));
        }
        validate_max_units(run.max_units)?;
        if let (Some(start), Some(end)) = (run.start_time, run.end_time) {
            if start >= end {
                return Err(invalid(format!(
                    "start_time {start} must be before end_time {end}"
                )));
            }
        }
        if run.limit == Some(0) {
            return Err(invalid("limit must be at least 1"));
        }
        self.strategy.validate()?;
        self.sizing.validate()?;
        validate_indicators(&self.indicators)
    }

    /// Bar range and limit from the `[backtest]` table.
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            start_time: self.backtest.start_time,
            end_time: self.backtest.end_time,
            limit: self.backtest.limit,
        }
    }

    pub fn to_engine_config(&self) -> EngineConfig {
        EngineConfig {
            symbol: self.backtest.symbol.clone(),
            initial_balance: self.backtest.initial_balance,
            signal: self.strategy.to_signal_config(self.backtest.max_units),
            sizer: RiskSizer::new(self.sizing.risk_fraction),
            indicators: self.indicators.clone(),
            volatility_cap: self.sizing.volatility_cap,
            drawdown_scaling: self.sizing.drawdown_scaling,
            max_heat: self.sizing.max_heat,
        }
    }
}

// ─── Live ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSection {
    pub symbol: String,
    pub interval: String,
    pub polling_interval_secs: u64,
    pub fetch_limit: usize,
    pub quote_asset: String,
    pub max_units: usize,
    pub max_heat: f64,
    pub state_path: PathBuf,
}

impl Default for LiveSection {
    fn default() -> Self {
        let settings = LiveSettings::default();
        Self {
            symbol: settings.symbol,
            interval: settings.interval,
            polling_interval_secs: 60,
            fetch_limit: settings.fetch_limit,
            quote_asset: settings.quote_asset,
            max_units: settings.signal.max_units,
            max_heat: settings.max_heat,
            state_path: PathBuf::from("state.json"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub live: LiveSection,
    pub strategy: StrategySection,
    pub sizing: SizingSection,
    pub indicators: IndicatorSettings,
}

impl LiveConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(base: &Path, local: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = load_layered(base, local)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let live = &self.live;
        if live.symbol.trim().is_empty() {
            return Err(invalid("symbol must not be empty"));
        }
        if live.quote_asset.trim().is_empty() {
            return Err(invalid("quote_asset must not be empty"));
        }
        if live.fetch_limit < 2 {
            return Err(invalid(format!(
                "fetch_limit must be at least 2, got {}",
                live.fetch_limit
            )));
        }
        validate_max_units(live.max_units)?;
        validate_heat(live.max_heat)?;
        self.strategy.validate()?;
        self.sizing.validate()?;
        validate_indicators(&self.indicators)
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.live.polling_interval_secs)
    }

    pub fn to_live_settings(&self) -> LiveSettings {
        LiveSettings {
            symbol: self.live.symbol.clone(),
            interval: self.live.interval.clone(),
            fetch_limit: self.live.fetch_limit,
            quote_asset: self.live.quote_asset.clone(),
            max_heat: self.live.max_heat,
            signal: self.strategy.to_signal_config(self.live.max_units),
            sizer: RiskSizer::new(self.sizing.risk_fraction),
            indicators: self.indicators.clone(),
        }
    }
}

// ─── Loading helpers ────────────────────────────────────────────────

/// Read `base` and an optional `local` override, merge, and deserialise.
pub fn load_layered<T: DeserializeOwned>(
    base: &Path,
    local: Option<&Path>,
) -> Result<T, ConfigError> {
    let mut merged = read_value(base)?;
    if let Some(path) = local {
        let overlay = read_value(path)?;
        deep_merge(&mut merged, &overlay);
    }
    Ok(merged.try_into()?)
}

fn read_value(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Recursively merge `overlay` into `base`. Tables merge key by key; any
/// other value in `overlay` replaces the one in `base`.
pub fn deep_merge(base: &mut toml::Value, overlay: &toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                match base_table.get_mut(key) {
                    Some(base_val) => deep_merge(base_val, overlay_val),
                    None => {
                        base_table.insert(key.clone(), overlay_val.clone());
                    }
                }
            }
        }
        (base, overlay) => *base = overlay.clone(),
    }
}

/// Parse `YYYY-MM-DD` as midnight UTC in epoch milliseconds.
pub fn parse_date_ms(date: &str) -> Result<i64, ConfigError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| invalid(format!("invalid date '{date}': {e}")))?;
    day.and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .ok_or_else(|| invalid(format!("invalid date '{date}'")))
}

fn validate_max_units(max_units: usize) -> Result<(), ConfigError> {
    if max_units == 0 {
        return Err(invalid("max_units must be at least 1"));
    }
    Ok(())
}

fn validate_heat(heat: f64) -> Result<(), ConfigError> {
    if heat.is_nan() || heat <= 0.0 {
        return Err(invalid(format!("max_heat must be positive, got {heat}")));
    }
    Ok(())
}

fn validate_indicators(settings: &IndicatorSettings) -> Result<(), ConfigError> {
    if settings.n_period == 0 || settings.adx_period == 0 || settings.ema_period == 0 {
        return Err(invalid("indicator periods must be at least 1"));
    }
    Ok(())
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}
