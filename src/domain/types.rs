//! Configuration for `mtsearch` runs.
//!
//! Plain data, filled from CLI arguments (see `app::synthetic_config_from_args`)
//! and consumed by `app::pipeline`.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::{
    ParameterGrid, double_couple_grid_random, double_couple_grid_regular, double_couple_grid_regular_axes,
    full_moment_tensor_grid_random, full_moment_tensor_grid_regular,
};
use crate::misfit::ShiftStrategy;

/// Which moment-tensor grid to search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GridPreset {
    /// Regular double-couple grid; 24 x 5 x 5 (kappa, sigma, h) unless `--npts` is given.
    DcRegular,
    /// Random double-couple orientations.
    DcRandom,
    /// Regular full moment tensor grid.
    FmtRegular,
    /// Random full moment tensors.
    FmtRandom,
}

impl GridPreset {
    /// Build the grid. `npts` is per axis for regular presets and the total
    /// point count for random ones.
    pub fn build(self, mw: f64, npts: Option<usize>, seed: u64) -> Result<ParameterGrid> {
        match self {
            GridPreset::DcRegular => match npts {
                Some(n) => double_couple_grid_regular(mw, n),
                None => double_couple_grid_regular_axes(mw, 24, 5, 5),
            },
            GridPreset::DcRandom => double_couple_grid_random(mw, npts.unwrap_or(600), seed),
            GridPreset::FmtRegular => full_moment_tensor_grid_regular(mw, npts.unwrap_or(4)),
            GridPreset::FmtRandom => full_moment_tensor_grid_random(mw, npts.unwrap_or(1000), seed),
        }
    }
}

impl fmt::Display for GridPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            GridPreset::DcRegular => "dc-regular",
            GridPreset::DcRandom => "dc-random",
            GridPreset::FmtRegular => "fmt-regular",
            GridPreset::FmtRandom => "fmt-random",
        };
        f.write_str(s)
    }
}

/// Inputs of a synthetic self-test run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyntheticConfig {
    pub preset: GridPreset,
    pub mw: f64,
    pub npts: Option<usize>,
    /// Seeds both random grids and the synthetic Green's functions.
    pub seed: u64,
    pub stations: usize,
    /// Grid index whose tensor generates the observed data.
    pub true_index: usize,
    /// Gaussian noise standard deviation, relative to each trace's peak.
    pub noise: f64,
    /// 1 runs the serial search.
    pub workers: usize,
    pub strategy: ShiftStrategy,
    pub weights: Option<PathBuf>,
    pub output: Option<PathBuf>,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            preset: GridPreset::DcRegular,
            mw: 4.5,
            npts: None,
            seed: 42,
            stations: 4,
            true_index: 142,
            noise: 0.0,
            workers: 1,
            strategy: ShiftStrategy::default(),
            weights: None,
            output: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_dc_preset_has_600_points() {
        let grid = GridPreset::DcRegular.build(4.5, None, 0).unwrap();
        assert_eq!(grid.size(), 600);
        assert_eq!(GridPreset::DcRegular.build(4.5, Some(3), 0).unwrap().size(), 27);
    }

    #[test]
    fn random_presets_honour_point_count() {
        assert_eq!(GridPreset::DcRandom.build(4.5, Some(50), 1).unwrap().size(), 50);
        assert_eq!(GridPreset::FmtRandom.build(4.5, None, 1).unwrap().size(), 1000);
        assert_eq!(GridPreset::FmtRegular.build(4.5, Some(2), 1).unwrap().size(), 32);
    }
}
