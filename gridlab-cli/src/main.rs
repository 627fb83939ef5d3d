//! GridLab CLI — replay and config commands.
//!
//! Commands:
//! - `run` — replay a CSV bar file through the grid engine
//! - `sample-config` — print a complete TOML config to stdout

mod config;
mod replay;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use gridlab_core::engine::GridEngine;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use config::RunConfig;
use replay::{load_bars, replay, ReplaySummary};

#[derive(Parser)]
#[command(name = "gridlab", about = "GridLab CLI — grid averaging engine replay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay a CSV bar file through the grid engine.
    Run {
        /// Path to a TOML config file (see `sample-config`).
        #[arg(long)]
        config: PathBuf,

        /// CSV bar file: timestamp,open,high,low,close,bid,ask[,signal].
        #[arg(long)]
        bars: PathBuf,

        /// Debug-level logging instead of info.
        #[arg(long, default_value_t = false)]
        verbose: bool,
    },
    /// Print a complete sample TOML config to stdout.
    SampleConfig,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            bars,
            verbose,
        } => {
            init_tracing(verbose);
            run_replay(&config, &bars)
        }
        Commands::SampleConfig => print_sample_config(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn run_replay(config_path: &Path, bars_path: &Path) -> Result<()> {
    let run_config = RunConfig::from_file(config_path)?;
    let bars = load_bars(bars_path, &run_config.instrument.symbol)?;
    if bars.is_empty() {
        bail!("no bars in {}", bars_path.display());
    }

    let mut engine = GridEngine::new(run_config.engine, run_config.instrument)?;
    let summary = replay(&mut engine, &bars, run_config.initial_equity);
    print_summary(&summary);
    Ok(())
}

fn print_sample_config() -> Result<()> {
    let text = toml::to_string_pretty(&RunConfig::sample())?;
    println!("{text}");
    Ok(())
}

fn print_summary(summary: &ReplaySummary) {
    println!();
    println!("=== Replay Result ===");
    println!("Symbol:          {}", summary.symbol);
    println!("Bars:            {}", summary.bars);
    println!(
        "Orders:          {} ({} cancels)",
        summary.orders_submitted, summary.cancels_requested
    );
    println!("Fills:           {}", summary.fills);
    println!();
    println!("--- Performance ---");
    println!("Realized P&L:    {}", summary.realized_pnl.round_dp(2));
    println!("Ending Equity:   {}", summary.ending_equity.round_dp(2));
    println!("Peak Equity:     {}", summary.peak_equity.round_dp(2));
    println!("Max Drawdown:    {}", summary.max_drawdown.round_dp(2));
    println!("Open Volume:     {}", summary.open_volume);
    if summary.suspended {
        println!();
        println!("WARNING: run ended while risk-suspended");
    }
    println!();
}
