//! Command-line parsing for `mtsearch`.
//!
//! Parsing and dispatch live apart from the search code; `app` turns these
//! arguments into a `SyntheticConfig`.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::GridPreset;
use crate::misfit::ShiftStrategy;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "mtsearch", version, about = "Moment tensor grid search")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Search a grid against data generated from one of its own points.
    Synthetic(SyntheticArgs),
    /// Summarise a saved grid/misfit container.
    Inspect(InspectArgs),
}

#[derive(Debug, Parser, Clone)]
pub struct SyntheticArgs {
    /// Grid to search.
    #[arg(short = 'g', long, value_enum, default_value_t = GridPreset::DcRegular)]
    pub preset: GridPreset,

    /// Moment magnitude fixing rho.
    #[arg(long, default_value_t = 4.5)]
    pub mw: f64,

    /// Points per axis (regular presets) or in total (random presets).
    #[arg(short = 'n', long)]
    pub npts: Option<usize>,

    /// Seed for random grids and synthetic Green's functions.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Number of synthetic stations.
    #[arg(long, default_value_t = 4)]
    pub stations: usize,

    /// Grid index used to generate the observed data.
    #[arg(long, default_value_t = 142)]
    pub true_index: usize,

    /// Relative Gaussian noise added to the observed data.
    #[arg(long, default_value_t = 0.0)]
    pub noise: f64,

    /// Worker threads; 1 runs the serial search.
    #[arg(short = 'w', long, env = "MTSEARCH_WORKERS", default_value_t = 1)]
    pub workers: usize,

    /// Time-shift selection rule.
    #[arg(long, value_enum, default_value_t = ShiftStrategy::CrossCorrelation)]
    pub strategy: ShiftStrategy,

    /// Station weight file (CAP format).
    #[arg(long, value_name = "FILE")]
    pub weights: Option<PathBuf>,

    /// Save the grid and misfit (`.npz` or JSON).
    #[arg(short = 'o', long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Parser)]
pub struct InspectArgs {
    /// Container written by `mtsearch synthetic --output`.
    #[arg(value_name = "PATH")]
    pub container: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_synthetic_defaults() {
        let cli = Cli::parse_from(["mtsearch", "synthetic"]);
        let Command::Synthetic(args) = cli.command else {
            panic!("expected synthetic subcommand");
        };
        assert_eq!(args.preset, GridPreset::DcRegular);
        assert_eq!(args.true_index, 142);
        assert_eq!(args.strategy, ShiftStrategy::CrossCorrelation);
    }

    #[test]
    fn parses_inspect_path() {
        let cli = Cli::parse_from(["mtsearch", "inspect", "out.npz"]);
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect subcommand");
        };
        assert_eq!(args.container, PathBuf::from("out.npz"));
    }

    #[test]
    fn parses_preset_and_strategy_names() {
        let cli = Cli::parse_from([
            "mtsearch",
            "synthetic",
            "--preset",
            "fmt-random",
            "--strategy",
            "residual-norm",
            "-w",
            "3",
        ]);
        let Command::Synthetic(args) = cli.command else {
            panic!("expected synthetic subcommand");
        };
        assert_eq!(args.preset, GridPreset::FmtRandom);
        assert_eq!(args.strategy, ShiftStrategy::ResidualNorm);
        assert_eq!(args.workers, 3);
    }
}
