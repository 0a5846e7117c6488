//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the synthetic search pipeline or inspects a saved container
//! - prints reports

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Command, InspectArgs, SyntheticArgs};
use crate::domain::SyntheticConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `mtsearch` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Synthetic(args) => handle_synthetic(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

/// Log filter from `MTSEARCH_LOG`, then `RUST_LOG`, default `info`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("MTSEARCH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    // Ignore a second initialisation (e.g. from tests).
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_synthetic(args: SyntheticArgs) -> Result<(), AppError> {
    let config = synthetic_config_from_args(&args);
    let run = pipeline::run_synthetic(&config)?;
    println!("{}", crate::report::format_search_summary(&run, &config));
    Ok(())
}

fn handle_inspect(args: InspectArgs) -> Result<(), AppError> {
    let container = crate::io::container::load_container(&args.container)?;
    println!("{}", crate::report::format_container_summary(&container)?);
    Ok(())
}

pub fn synthetic_config_from_args(args: &SyntheticArgs) -> SyntheticConfig {
    SyntheticConfig {
        preset: args.preset,
        mw: args.mw,
        npts: args.npts,
        seed: args.seed,
        stations: args.stations,
        true_index: args.true_index,
        noise: args.noise,
        workers: args.workers,
        strategy: args.strategy,
        weights: args.weights.clone(),
        output: args.output.clone(),
    }
}
