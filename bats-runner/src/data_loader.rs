//! Bar loading for the runner.
//!
//! Bars come from a CSV file (`timestamp,open,high,low,close,volume`), a JSON
//! array of bar objects, or a seeded synthetic random walk. Loaded series
//! are validated (sane OHLC, strictly ascending timestamps) before any
//! filtering.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;
use tracing::{debug, info};

use bats_core::domain::Bar;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported bar file '{0}' (expected .csv or .json)")]
    UnsupportedFormat(PathBuf),

    #[error("bar {index} at {timestamp} is not a valid OHLC candle")]
    InvalidBar { index: usize, timestamp: i64 },

    #[error("timestamps must be strictly ascending: bar {index} at {timestamp} follows {previous}")]
    Unordered {
        index: usize,
        previous: i64,
        timestamp: i64,
    },

    #[error("no bars left after filtering")]
    Empty,
}

/// Range and size restrictions applied after validation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoadOptions {
    /// Inclusive lower bound (epoch ms).
    pub start_time: Option<i64>,
    /// Inclusive upper bound (epoch ms).
    pub end_time: Option<i64>,
    /// Keep at most this many of the newest bars.
    pub limit: Option<usize>,
}

/// Load, validate, and filter bars from a `.csv` or `.json` file.
pub fn load_bars(path: &Path, opts: &LoadOptions) -> Result<Vec<Bar>, LoadError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    let file = File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let reader = BufReader::new(file);

    let bars = match ext.as_deref() {
        Some("csv") => read_csv(reader)?,
        Some("json") => read_json(reader)?,
        _ => return Err(LoadError::UnsupportedFormat(path.to_path_buf())),
    };
    validate_bars(&bars)?;

    let total = bars.len();
    let bars = filter_bars(bars, opts);
    if bars.is_empty() {
        return Err(LoadError::Empty);
    }
    info!(path = %path.display(), total, kept = bars.len(), "loaded bars");
    Ok(bars)
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut bars = Vec::new();
    for record in rdr.deserialize::<Bar>() {
        bars.push(record?);
    }
    Ok(bars)
}

pub fn read_json<R: Read>(reader: R) -> Result<Vec<Bar>, LoadError> {
    Ok(serde_json::from_reader(reader)?)
}

/// Reject insane candles and non-ascending or duplicate timestamps.
pub fn validate_bars(bars: &[Bar]) -> Result<(), LoadError> {
    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_sane() {
            return Err(LoadError::InvalidBar {
                index,
                timestamp: bar.timestamp,
            });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(LoadError::Unordered {
                    index,
                    previous,
                    timestamp: bar.timestamp,
                });
            }
        }
    }
    Ok(())
}

/// Apply the time range, then keep the newest `limit` bars.
pub fn filter_bars(bars: Vec<Bar>, opts: &LoadOptions) -> Vec<Bar> {
    let mut kept: Vec<Bar> = bars
        .into_iter()
        .filter(|b| opts.start_time.map_or(true, |s| b.timestamp >= s))
        .filter(|b| opts.end_time.map_or(true, |e| b.timestamp <= e))
        .collect();
    if let Some(limit) = opts.limit {
        if kept.len() > limit {
            kept.drain(..kept.len() - limit);
        }
    }
    kept
}

/// Seeded random walk for offline runs.
///
/// Each bar moves the close by up to ±2% and extends the range by up to 1%
/// beyond the open/close body. The same seed always yields the same series.
pub fn synthetic_bars(
    count: usize,
    seed: u64,
    start_price: f64,
    start_time: i64,
    interval_ms: i64,
) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut price = start_price;
    let mut bars = Vec::with_capacity(count);

    for i in 0..count {
        let ret: f64 = rng.gen_range(-0.02..0.02);
        let open = price;
        let close = (price * (1.0 + ret)).max(0.01);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(10.0..1_000.0);
        bars.push(Bar::new(
            start_time + i as i64 * interval_ms,
            open,
            high,
            low,
            close,
            volume,
        ));
        price = close;
    }

    debug!(count, seed, "generated synthetic bars");
    bars
}

/// Milliseconds per bar for an exchange-style interval string (`15m`, `1h`,
/// `4h`, `1d`, `1w`).
pub fn interval_ms(interval: &str) -> Option<i64> {
    let unit_start = interval.char_indices().last()?.0;
    let (num, unit) = interval.split_at(unit_start);
    let n: i64 = num.parse().ok().filter(|n| *n > 0)?;
    let unit_ms = match unit {
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        _ => return None,
    };
    Some(n * unit_ms)
}
