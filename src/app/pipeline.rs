//! Shared self-test pipeline.
//!
//! grid preset -> true tensor -> synthetic Green's functions + observed data
//! -> (optional) weight filtering -> serial/parallel search -> best fit
//! -> (optional) container.
//!
//! The CLI only formats what this returns.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{info, warn};

use crate::data::{WaveLayout, observe, synthetic_greens};
use crate::domain::SyntheticConfig;
use crate::error::AppError;
use crate::grid::ParameterGrid;
use crate::io::weights::{WeightTable, parse_weight_file, remove_unused_stations};
use crate::misfit::{CategoryMisfit, MisfitConfig};
use crate::results::{BestFit, ResultArray, ResultStore};
use crate::search::{DataCategory, GridSearch};
use crate::tensor::MomentTensor;
use crate::waveform::{Dataset, GreensFunction};

pub const BODY_WAVES: &str = "body_waves";
pub const SURFACE_WAVES: &str = "surface_waves";

/// Everything a `mtsearch synthetic` run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub grid: ParameterGrid,
    pub misfit: ResultArray,
    pub best: BestFit,
    pub true_index: usize,
    pub truth: MomentTensor,
    /// Per-category misfit of the best point.
    pub breakdown: BTreeMap<String, CategoryMisfit>,
    /// Stations dropped by the weight file, per category.
    pub removed: BTreeMap<String, Vec<String>>,
    pub elapsed: Duration,
}

impl RunOutput {
    pub fn recovered(&self) -> bool {
        self.best.index == self.true_index
    }
}

pub fn run_synthetic(config: &SyntheticConfig) -> Result<RunOutput, AppError> {
    if config.stations == 0 {
        return Err(AppError::new(2, "At least one station is required."));
    }
    if !(config.noise.is_finite() && config.noise >= 0.0) {
        return Err(AppError::new(2, "Noise level must be finite and >= 0."));
    }

    // 1) Grid and the tensor the data come from.
    let grid = config.preset.build(config.mw, config.npts, config.seed)?;
    let truth = grid.get(config.true_index)?.moment_tensor()?.clone();
    info!(preset = %config.preset, points = grid.size(), true_index = config.true_index, "grid ready");

    // 2) Synthetic Green's functions and observed data.
    let mut rng = StdRng::seed_from_u64(config.seed);
    let weights = match &config.weights {
        Some(path) => Some(Arc::new(parse_weight_file(path)?)),
        None => None,
    };

    let mut search = GridSearch::new();
    let mut removed = BTreeMap::new();
    for (name, layout, base) in [
        (BODY_WAVES, WaveLayout::BODY_WAVES, MisfitConfig::body_waves()),
        (SURFACE_WAVES, WaveLayout::SURFACE_WAVES, MisfitConfig::surface_waves()),
    ] {
        let greens: Arc<dyn GreensFunction> = Arc::new(synthetic_greens(config.stations, layout, &mut rng)?);
        let mut observed = observe(greens.as_ref(), &truth, config.noise, &mut rng)?;

        let mut misfit_config = base.with_strategy(config.strategy);
        if let Some(table) = &weights {
            misfit_config = misfit_config.with_weights(Arc::clone(table));
            let dropped = drop_unweighted(&mut observed, table, &misfit_config);
            if !dropped.is_empty() {
                removed.insert(name.to_string(), dropped);
            }
        }
        if observed.is_empty() {
            warn!(category = name, "no stations left after weighting");
        }
        search.add_category(name, DataCategory::new(observed, greens), misfit_config);
    }

    // 3) Search.
    let start = Instant::now();
    let misfit = if config.workers == 1 {
        search.run_serial(&grid)?
    } else {
        search.run_parallel(&grid, config.workers)?
    };
    let elapsed = start.elapsed();

    // 4) Best fit and its breakdown.
    let best = misfit.best_fit(&grid)?;
    let breakdown = search.inputs().breakdown(best.point.moment_tensor()?)?;
    info!(
        best = best.index,
        misfit = best.misfit,
        recovered = best.index == config.true_index,
        elapsed_ms = elapsed.as_millis() as u64,
        "search finished"
    );

    if let Some(path) = &config.output {
        ResultStore::new(&grid, misfit.clone())?.save(path)?;
    }

    Ok(RunOutput {
        grid,
        misfit,
        best,
        true_index: config.true_index,
        truth,
        breakdown,
        removed,
        elapsed,
    })
}

/// Remove stations the weight file leaves out of this category.
///
/// A station stays if any of the category's own slots is non-zero.
fn drop_unweighted(observed: &mut Dataset, table: &WeightTable, config: &MisfitConfig) -> Vec<String> {
    let mut dropped = remove_unused_stations(observed, table);
    let idle: Vec<String> = observed
        .ids()
        .filter(|id| config.station_weights(id).is_none())
        .map(str::to_string)
        .collect();
    for id in &idle {
        observed.remove(id);
    }
    dropped.extend(idle);
    dropped
}
