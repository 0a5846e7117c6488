//! Ready-made moment-tensor grids in the Tape2015 parameterization.
//!
//! Magnitude is held fixed: `rho = √2 · 10^(1.5 Mw + 9.1)`.
//! Strike (`kappa`) is periodic, so regular grids sample it on an open interval.

use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::error::{Result, SearchError};
use crate::grid::{Axis, ParameterGrid, SharedTransform, StructuredGrid, UnstructuredGrid, random_values};
use crate::tensor::tape2015::{V_MAX, W_MAX};
use crate::tensor::{Tape2015, rho_from_mw};

fn tape2015() -> SharedTransform {
    Arc::new(Tape2015)
}

fn checked_rho(mw: f64) -> Result<f64> {
    let rho = rho_from_mw(mw);
    if !(rho.is_finite() && rho > 0.0) {
        return Err(SearchError::domain("rho", format!("magnitude Mw={mw} gives invalid rho={rho}")));
    }
    Ok(rho)
}

/// Full moment tensors, `npts` uniform random samples (reproducible from `seed`).
pub fn full_moment_tensor_grid_random(mw: f64, npts: usize, seed: u64) -> Result<ParameterGrid> {
    let rho = checked_rho(mw)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = UnstructuredGrid::new(
        vec![
            ("rho".to_string(), vec![rho; npts]),
            ("v".to_string(), random_values(-V_MAX, V_MAX, npts, &mut rng)),
            ("w".to_string(), random_values(-W_MAX, W_MAX, npts, &mut rng)),
            ("kappa".to_string(), random_values(0.0, 360.0, npts, &mut rng)),
            ("sigma".to_string(), random_values(-90.0, 90.0, npts, &mut rng)),
            ("h".to_string(), random_values(0.0, 1.0, npts, &mut rng)),
        ],
        Some(tape2015()),
    )?;
    Ok(grid.into())
}

/// Full moment tensors, `npts_per_axis` regular samples on each of the five
/// shape/orientation axes.
///
/// Every axis is sampled at cell centres: the lune poles and the `h`/`sigma`
/// edges collapse many coordinates onto one tensor.
pub fn full_moment_tensor_grid_regular(mw: f64, npts_per_axis: usize) -> Result<ParameterGrid> {
    let n = npts_per_axis;
    let grid = StructuredGrid::new(
        vec![
            Axis::fixed("rho", checked_rho(mw)?)?,
            Axis::open("v", -V_MAX, V_MAX, n)?,
            Axis::open("w", -W_MAX, W_MAX, n)?,
            Axis::open("kappa", 0.0, 360.0, n)?,
            Axis::open("sigma", -90.0, 90.0, n)?,
            Axis::open("h", 0.0, 1.0, n)?,
        ],
        Some(tape2015()),
    )?;
    Ok(grid.into())
}

/// Double couples (`v = w = 0`), `npts` uniform random orientations.
pub fn double_couple_grid_random(mw: f64, npts: usize, seed: u64) -> Result<ParameterGrid> {
    let rho = checked_rho(mw)?;
    let mut rng = StdRng::seed_from_u64(seed);
    let grid = UnstructuredGrid::new(
        vec![
            ("rho".to_string(), vec![rho; npts]),
            ("v".to_string(), vec![0.0; npts]),
            ("w".to_string(), vec![0.0; npts]),
            ("kappa".to_string(), random_values(0.0, 360.0, npts, &mut rng)),
            ("sigma".to_string(), random_values(-90.0, 90.0, npts, &mut rng)),
            ("h".to_string(), random_values(0.0, 1.0, npts, &mut rng)),
        ],
        Some(tape2015()),
    )?;
    Ok(grid.into())
}

/// Double couples on a regular grid with the same count on every axis.
pub fn double_couple_grid_regular(mw: f64, npts_per_axis: usize) -> Result<ParameterGrid> {
    double_couple_grid_regular_axes(mw, npts_per_axis, npts_per_axis, npts_per_axis)
}

/// Double couples on a regular grid with per-axis counts.
pub fn double_couple_grid_regular_axes(
    mw: f64,
    n_kappa: usize,
    n_sigma: usize,
    n_h: usize,
) -> Result<ParameterGrid> {
    let grid = StructuredGrid::new(
        vec![
            Axis::fixed("rho", checked_rho(mw)?)?,
            Axis::fixed("v", 0.0)?,
            Axis::fixed("w", 0.0)?,
            Axis::open("kappa", 0.0, 360.0, n_kappa)?,
            Axis::closed("sigma", -90.0, 90.0, n_sigma)?,
            Axis::closed("h", 0.0, 1.0, n_h)?,
        ],
        Some(tape2015()),
    )?;
    Ok(grid.into())
}

/// Origin (location/depth) grids are not available.
pub fn origin_grid() -> Result<ParameterGrid> {
    Err(SearchError::unimplemented("origin/depth grid"))
}
