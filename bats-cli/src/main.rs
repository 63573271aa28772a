//! BATS CLI: backtest, paper replay, and report commands.
//!
//! Commands:
//! - `backtest`: run a backtest from a TOML config over a bar file or synthetic bars
//! - `paper`: replay a bar file through the live single-tick driver
//! - `report`: print a saved backtest report as a text table

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use bats_runner::config::parse_date_ms;
use bats_runner::{
    default_report_name, load_bars, render_text, run_paper, run_single_backtest, BacktestConfig,
    BacktestReport, BarSource, LiveConfig, LoadOptions, PaperOptions,
};

#[derive(Parser)]
#[command(name = "bats", about = "BATS Turtle breakout trading system", version)]
struct Cli {
    /// Log level: trace, debug, info, warn, error. RUST_LOG overrides it.
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a backtest and write the JSON report.
    Backtest {
        /// Base TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Local override TOML, deep-merged over the base.
        #[arg(long)]
        local: Option<PathBuf>,

        /// Bar file (.csv or .json).
        #[arg(long, required_unless_present = "synthetic", conflicts_with = "synthetic")]
        bars: Option<PathBuf>,

        /// Use a seeded synthetic random walk instead of a bar file.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Synthetic bar count.
        #[arg(long, default_value_t = 2_000)]
        count: usize,

        /// Synthetic RNG seed.
        #[arg(long, default_value_t = 42)]
        seed: u64,

        /// Start date (YYYY-MM-DD, UTC). Overrides `backtest.start_time`.
        #[arg(long)]
        start: Option<String>,

        /// End date (YYYY-MM-DD, UTC, inclusive). Overrides `backtest.end_time`.
        #[arg(long)]
        end: Option<String>,

        /// Report path. Defaults to backtest_results_<timestamp>.json.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Replay a bar file through the live driver with a paper account.
    Paper {
        /// Base TOML config.
        #[arg(long)]
        config: PathBuf,

        /// Local override TOML, deep-merged over the base.
        #[arg(long)]
        local: Option<PathBuf>,

        /// Bar file (.csv or .json).
        #[arg(long)]
        bars: PathBuf,

        /// Stop after this many ticks. Defaults to the end of the file.
        #[arg(long)]
        ticks: Option<usize>,

        /// Sleep between ticks, in milliseconds.
        #[arg(long, default_value_t = 0)]
        interval_ms: u64,

        /// Starting quote balance of the paper account.
        #[arg(long, default_value_t = 10_000.0)]
        balance: f64,

        /// State file. Overrides `live.state_path`.
        #[arg(long)]
        state: Option<PathBuf>,
    },
    /// Print a saved backtest report.
    Report {
        /// Report JSON written by `backtest`.
        path: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level)?;

    match cli.command {
        Commands::Backtest {
            config,
            local,
            bars,
            synthetic: _,
            count,
            seed,
            start,
            end,
            output,
        } => {
            let source = match bars {
                Some(path) => BarSource::File(path),
                None => BarSource::Synthetic { count, seed },
            };
            run_backtest_cmd(config, local, source, start, end, output)
        }
        Commands::Paper {
            config,
            local,
            bars,
            ticks,
            interval_ms,
            balance,
            state,
        } => run_paper_cmd(config, local, bars, ticks, interval_ms, balance, state),
        Commands::Report { path } => {
            let report = BacktestReport::read(&path)
                .with_context(|| format!("reading report {}", path.display()))?;
            print!("{}", render_text(&report));
            Ok(())
        }
    }
}

fn init_logging(level: &str) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .with_context(|| format!("invalid log level '{level}'"))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn run_backtest_cmd(
    config_path: PathBuf,
    local: Option<PathBuf>,
    source: BarSource,
    start: Option<String>,
    end: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let mut config = BacktestConfig::load(&config_path, local.as_deref())
        .with_context(|| format!("loading config {}", config_path.display()))?;

    if let Some(date) = start {
        config.backtest.start_time = Some(parse_date_ms(&date)?);
    }
    if let Some(date) = end {
        // inclusive of the whole end day
        config.backtest.end_time = Some(parse_date_ms(&date)? + 86_400_000 - 1);
    }
    config.validate()?;

    let report = run_single_backtest(&config, &source)?;
    print!("{}", render_text(&report));

    let path = output.unwrap_or_else(|| PathBuf::from(default_report_name(chrono::Local::now())));
    report
        .write(&path)
        .with_context(|| format!("writing report {}", path.display()))?;
    info!(path = %path.display(), "report saved");
    Ok(())
}

fn run_paper_cmd(
    config_path: PathBuf,
    local: Option<PathBuf>,
    bars_path: PathBuf,
    ticks: Option<usize>,
    interval_ms: u64,
    balance: f64,
    state: Option<PathBuf>,
) -> Result<()> {
    let mut config = LiveConfig::load(&config_path, local.as_deref())
        .with_context(|| format!("loading config {}", config_path.display()))?;
    if let Some(path) = state {
        config.live.state_path = path;
    }

    let bars = load_bars(&bars_path, &LoadOptions::default())
        .with_context(|| format!("loading bars {}", bars_path.display()))?;
    let opts = PaperOptions {
        initial_balance: balance,
        ticks,
        interval: Duration::from_millis(interval_ms),
    };

    let outcome = run_paper(&config, bars, &opts)?;
    println!("{}", outcome.stats);
    info!(
        ticks = outcome.ticks,
        units = outcome.state.units_held,
        state = %config.live.state_path.display(),
        "paper replay finished"
    );
    Ok(())
}
