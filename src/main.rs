use anyhow::{Context, Result};
use clap::Parser;
use nonceling_core::config::AppConfig;
use nonceling_core::metrics::init_logging;
use nonceling_lib::app::Driver;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Block nonce to grow the creature from (decimal or 0x-prefixed hex)
    #[arg(short, long, value_parser = parse_seed, default_value = "0")]
    seed: u32,

    /// Fixed steps to simulate
    #[arg(long, default_value_t = 600)]
    steps: u64,

    /// Confirmation counts to report, in order, spread across the run
    #[arg(long, value_delimiter = ',')]
    confirmations: Vec<u64>,

    /// Custom config file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the persisted state here (.json, .gz or .rkyv)
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Start from a previously saved state instead of a fresh seed
    #[arg(long, conflicts_with = "seed")]
    restore: Option<PathBuf>,
}

fn parse_seed(s: &str) -> std::result::Result<u32, String> {
    let parsed = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => s.parse::<u32>(),
    };
    parsed.map_err(|e| format!("invalid seed {s:?}: {e}"))
}

fn main() -> Result<()> {
    init_logging("info");

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Driver::load_config(path)?,
        None => AppConfig::default(),
    };

    let mut driver = match &args.restore {
        Some(path) => Driver::restore(path, config)
            .with_context(|| format!("restoring creature from {}", path.display()))?,
        None => Driver::from_seed(args.seed, config)?,
    };

    let applied = driver.run_schedule(args.steps, &args.confirmations)?;
    tracing::info!(
        steps = args.steps,
        mutations = applied.len(),
        mean_step_us = driver.metrics().mean_step_time().as_micros() as u64,
        "Run finished"
    );

    if let Some(path) = &args.snapshot {
        driver
            .save(path)
            .with_context(|| format!("saving snapshot to {}", path.display()))?;
    }

    println!("{}", serde_json::to_string_pretty(&driver.summary())?);
    Ok(())
}
