//! Backtest report artifact: config snapshot, summary, trade log, equity curve.
//!
//! Written as pretty JSON and renderable as a plain-text table for the
//! terminal.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bats_core::domain::{EquityPoint, TradeKind, TradeRecord};
use bats_core::engine::RunResult;

use crate::config::BacktestConfig;
use crate::metrics::Summary;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("failed to access report {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("report JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub config: BacktestConfig,
    pub summary: Summary,
    pub trades: Vec<TradeRecord>,
    pub equity_curve: Vec<EquityPoint>,
}

impl BacktestReport {
    pub fn new(config: &BacktestConfig, result: &RunResult) -> Self {
        Self {
            config: config.clone(),
            summary: Summary::from_result(result),
            trades: result.trades.clone(),
            equity_curve: result.equity_curve.clone(),
        }
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        let json = self.to_json()?;
        std::fs::write(path, json).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn read(path: &Path) -> Result<Self, ReportError> {
        let content = std::fs::read_to_string(path).map_err(|source| ReportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }
}

/// `backtest_results_YYYYmmdd_HHMMSS.json` in local time.
pub fn default_report_name(now: DateTime<Local>) -> String {
    format!("backtest_results_{}.json", now.format("%Y%m%d_%H%M%S"))
}

fn format_ts(ms: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Plain-text report: configuration, summary, then one line per trade.
pub fn render_text(report: &BacktestReport) -> String {
    let cfg = &report.config;
    let s = &report.summary;
    let rule = "=".repeat(60);
    let mut out = String::new();

    // writeln! into a String cannot fail
    let _ = writeln!(out, "{rule}");
    let _ = writeln!(out, "{:^60}", " BATS BACKTEST REPORT ");
    let _ = writeln!(out, "{rule}");

    let period = match (report.equity_curve.first(), report.equity_curve.last()) {
        (Some(first), Some(last)) => {
            format!("{} ~ {}", format_ts(first.timestamp), format_ts(last.timestamp))
        }
        _ => "N/A".to_string(),
    };
    let _ = writeln!(out, "\n[CONFIGURATION]");
    let _ = writeln!(out, "  Symbol:          {}", cfg.backtest.symbol);
    let _ = writeln!(out, "  Interval:        {}", cfg.backtest.interval);
    let _ = writeln!(out, "  Period:          {period}");
    let _ = writeln!(
        out,
        "  Risk per Unit:   {:.1}%",
        cfg.sizing.risk_fraction * 100.0
    );

    let _ = writeln!(out, "\n[SUMMARY]");
    let _ = writeln!(out, "  Initial Balance: {:.2}", s.initial_balance);
    let _ = writeln!(out, "  Final Equity:    {:.2}", s.final_equity);
    let _ = writeln!(out, "  Total Return:    {:.2}%", s.total_return_pct);
    let _ = writeln!(out, "  Max Drawdown:    {:.2}%", s.max_drawdown_pct);
    let _ = writeln!(
        out,
        "  Win Rate:        {:.2}% ({} closed trades)",
        s.win_rate_pct, s.total_exits
    );
    let _ = writeln!(out, "  Total Actions:   {}", s.total_trades);

    let _ = writeln!(out, "\n[TRADES]");
    let _ = writeln!(
        out,
        "  {:<17} | {:<8} | {:>12} | {:>5} | Detail",
        "Time (UTC)", "Type", "Price", "Units"
    );
    let _ = writeln!(out, "  {}", "-".repeat(66));
    for t in &report.trades {
        let kind = match t.kind {
            TradeKind::Buy => "BUY",
            TradeKind::Pyramid => "PYRAMID",
            TradeKind::Exit => "EXIT",
        };
        let detail = match t.gain {
            Some(gain) => format!("gain {gain:+.2}"),
            None => format!("balance {:.2}", t.balance),
        };
        let _ = writeln!(
            out,
            "  {:<17} | {:<8} | {:>12.2} | {:>5} | {}",
            format_ts(t.timestamp),
            kind,
            t.price,
            t.units_held,
            detail
        );
    }
    let _ = writeln!(out, "{rule}");
    out
}
