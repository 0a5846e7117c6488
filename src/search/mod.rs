//! Grid-search engine.
//!
//! For every grid point: transform to a moment tensor, sum the misfit of all
//! data categories, store it at the point's index. A failure at any point
//! aborts the run; a partial `ResultArray` is never returned.
//!
//! `run_parallel` splits the grid with `ParameterGrid::decompose`, evaluates
//! the parts on a rayon pool (see `comm` for the message flow) and
//! concatenates in worker order, which reproduces the serial array exactly.

pub mod comm;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::grid::ParameterGrid;
use crate::misfit::{CategoryMisfit, MisfitConfig, evaluate_breakdown, evaluate_category};
use crate::results::ResultArray;
use crate::tensor::MomentTensor;
use crate::waveform::{Dataset, GreensFunction};

/// Observed data plus the Green's functions that model it.
#[derive(Debug, Clone)]
pub struct DataCategory {
    pub data: Arc<Dataset>,
    pub greens: Arc<dyn GreensFunction>,
}

impl DataCategory {
    pub fn new(data: impl Into<Arc<Dataset>>, greens: Arc<dyn GreensFunction>) -> Self {
        Self {
            data: data.into(),
            greens,
        }
    }
}

/// Data categories by name, e.g. `body_waves`.
pub type CategoryMap = BTreeMap<String, DataCategory>;

/// Resolved misfit settings by category name.
pub type MisfitConfigMap = BTreeMap<String, MisfitConfig>;

/// Read-only inputs every worker receives once.
#[derive(Debug, Clone)]
pub struct SearchInputs {
    pub categories: CategoryMap,
    pub configs: MisfitConfigMap,
}

impl SearchInputs {
    /// Reject configurations that would fail before any point is evaluated.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(SearchError::InvalidConfig("no data categories registered".into()));
        }
        for name in self.categories.keys() {
            let config = self.configs.get(name).ok_or_else(|| {
                SearchError::InvalidConfig(format!("category '{name}' has no misfit configuration"))
            })?;
            config.validate()?;
        }
        if let Some(orphan) = self.configs.keys().find(|n| !self.categories.contains_key(*n)) {
            return Err(SearchError::InvalidConfig(format!(
                "misfit configuration '{orphan}' has no data category"
            )));
        }
        Ok(())
    }

    /// Total misfit of one tensor across all categories.
    pub fn total_misfit(&self, mt: &MomentTensor) -> Result<f64> {
        let mut total = 0.0;
        for (name, category) in &self.categories {
            let config = self.configs.get(name).ok_or_else(|| {
                SearchError::InvalidConfig(format!("category '{name}' has no misfit configuration"))
            })?;
            total += evaluate_category(&category.data, category.greens.as_ref(), mt, config)?;
        }
        Ok(total)
    }

    /// Per-category misfit with station detail.
    pub fn breakdown(&self, mt: &MomentTensor) -> Result<BTreeMap<String, CategoryMisfit>> {
        let mut out = BTreeMap::new();
        for (name, category) in &self.categories {
            let config = self.configs.get(name).ok_or_else(|| {
                SearchError::InvalidConfig(format!("category '{name}' has no misfit configuration"))
            })?;
            out.insert(
                name.clone(),
                evaluate_breakdown(&category.data, category.greens.as_ref(), mt, config)?,
            );
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for SearchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SearchState::Idle => "idle",
            SearchState::Running => "running",
            SearchState::Completed => "completed",
            SearchState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// A single grid search: register categories, run once.
#[derive(Debug)]
pub struct GridSearch {
    inputs: SearchInputs,
    state: SearchState,
}

impl Default for GridSearch {
    fn default() -> Self {
        Self::new()
    }
}

impl GridSearch {
    pub fn new() -> Self {
        Self {
            inputs: SearchInputs {
                categories: CategoryMap::new(),
                configs: MisfitConfigMap::new(),
            },
            state: SearchState::Idle,
        }
    }

    /// Register a category with its misfit configuration.
    pub fn add_category(
        &mut self,
        name: impl Into<String>,
        category: DataCategory,
        config: MisfitConfig,
    ) -> &mut Self {
        let name = name.into();
        self.inputs.categories.insert(name.clone(), category);
        self.inputs.configs.insert(name, config);
        self
    }

    pub fn state(&self) -> SearchState {
        self.state
    }

    pub fn inputs(&self) -> &SearchInputs {
        &self.inputs
    }

    pub fn run_serial(&mut self, grid: &ParameterGrid) -> Result<ResultArray> {
        self.begin()?;
        let result = grid_search_serial(&self.inputs, grid);
        self.finish(result)
    }

    pub fn run_parallel(&mut self, grid: &ParameterGrid, workers: usize) -> Result<ResultArray> {
        self.begin()?;
        let result = grid_search_parallel(&self.inputs, grid, workers);
        self.finish(result)
    }

    fn begin(&mut self) -> Result<()> {
        if self.state != SearchState::Idle {
            return Err(SearchError::InvalidConfig(format!(
                "search cannot start from state '{}'",
                self.state
            )));
        }
        self.state = SearchState::Running;
        Ok(())
    }

    fn finish(&mut self, result: Result<ResultArray>) -> Result<ResultArray> {
        self.state = if result.is_ok() {
            SearchState::Completed
        } else {
            SearchState::Failed
        };
        result
    }
}

fn check_grid(grid: &ParameterGrid) -> Result<()> {
    if grid.transform().is_none() {
        return Err(SearchError::MissingTransform);
    }
    Ok(())
}

/// Evaluate every point of `grid` in order on the current thread.
pub fn grid_search_serial(inputs: &SearchInputs, grid: &ParameterGrid) -> Result<ResultArray> {
    inputs.validate()?;
    check_grid(grid)?;
    info!(points = grid.size(), categories = inputs.categories.len(), "serial grid search");
    evaluate_grid(inputs, grid)
}

/// Evaluate `grid` on `workers` threads; the result equals the serial one.
pub fn grid_search_parallel(inputs: &SearchInputs, grid: &ParameterGrid, workers: usize) -> Result<ResultArray> {
    inputs.validate()?;
    check_grid(grid)?;
    let parts = grid.decompose(workers)?;
    info!(
        points = grid.size(),
        workers,
        largest = parts.first().map_or(0, ParameterGrid::size),
        smallest = parts.last().map_or(0, ParameterGrid::size),
        "parallel grid search"
    );

    let threads = pool_threads(workers);
    debug!(workers, threads, "starting worker pool");
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| SearchError::InvalidConfig(format!("failed to start worker pool: {e}")))?;

    let (coordinator, group) = comm::process_group(workers, inputs.clone());
    coordinator.scatter(parts)?;

    pool.scope(|s| {
        for worker in group {
            s.spawn(move |_| {
                let result = worker
                    .receive()
                    .and_then(|part| evaluate_grid(worker.inputs(), &part));
                if let Err(err) = &result {
                    debug!(rank = worker.rank(), error = %err, "worker failed");
                }
                worker.send(result);
            });
        }
    });

    let result = coordinator.gather()?;
    if result.len() != grid.size() {
        return Err(SearchError::ShapeMismatch {
            what: "gathered misfit array".into(),
            expected: grid.size(),
            got: result.len(),
        });
    }
    Ok(result)
}

/// OS threads backing `workers` logical workers: never more than the host
/// can run at once. Workers beyond that queue in the pool.
fn pool_threads(workers: usize) -> usize {
    let available = std::thread::available_parallelism().map_or(1, |n| n.get());
    workers.clamp(1, available)
}

fn evaluate_grid(inputs: &SearchInputs, grid: &ParameterGrid) -> Result<ResultArray> {
    let size = grid.size();
    let step = (size / 10).max(1);
    let mut misfit = ResultArray::zeros(size);
    for point in grid {
        let point = point?;
        let total = inputs.total_misfit(point.moment_tensor()?)?;
        misfit.set(point.index, total);

        let done = point.index + 1;
        if done % step == 0 || done == size {
            debug!(done, total = size, offset = grid.offset(), "search progress");
        }
    }
    Ok(misfit)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grid::double_couple_grid_regular_axes;
    use crate::waveform::{Component, GreensTensor, GreensTensorSet};

    fn pulse(n: usize, at: f64, width: f64) -> Vec<f64> {
        (0..n)
            .map(|i| {
                let x = (i as f64 - at) / width;
                (-x * x).exp()
            })
            .collect()
    }

    fn greens() -> Arc<dyn GreensFunction> {
        let mut set = GreensTensorSet::new();
        let mut tensors = Vec::new();
        for (c, component) in Component::ALL.into_iter().enumerate() {
            let elementary = std::array::from_fn(|k| {
                pulse(40, 8.0 + 3.0 * k as f64 + c as f64, 1.5 + 0.25 * k as f64)
            });
            tensors.push(GreensTensor::new(component, 0.5, elementary).unwrap());
        }
        set.insert("XX.STA1.", tensors);
        Arc::new(set)
    }

    fn inputs_for(grid: &ParameterGrid, truth: usize) -> SearchInputs {
        let greens = greens();
        let mt = grid.get(truth).unwrap().tensor.unwrap();
        let data = greens.get_synthetics(&mt).unwrap();
        let mut categories = CategoryMap::new();
        categories.insert("surface_waves".into(), DataCategory::new(data, greens));
        let mut configs = MisfitConfigMap::new();
        configs.insert("surface_waves".into(), MisfitConfig::surface_waves().with_max_shift(0.0));
        SearchInputs { categories, configs }
    }

    #[test]
    fn serial_search_finds_the_generating_point() {
        let grid = double_couple_grid_regular_axes(4.5, 6, 3, 3).unwrap();
        let inputs = inputs_for(&grid, 22);
        let result = grid_search_serial(&inputs, &grid).unwrap();
        assert_eq!(result.len(), grid.size());
        assert_eq!(result.as_slice()[22], 0.0);
        assert_eq!(result.argmin(), Some(22));
        assert!(result.as_slice().iter().all(|m| *m >= 0.0));
    }

    #[test]
    fn parallel_matches_serial_for_any_worker_count() {
        let grid = double_couple_grid_regular_axes(4.5, 4, 3, 3).unwrap();
        let inputs = inputs_for(&grid, 5);
        let serial = grid_search_serial(&inputs, &grid).unwrap();
        for workers in [1, 2, 5, grid.size(), grid.size() + 3] {
            let parallel = grid_search_parallel(&inputs, &grid, workers).unwrap();
            assert_eq!(parallel, serial, "workers = {workers}");
        }
    }

    #[test]
    fn many_workers_share_a_host_sized_pool() {
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        assert_eq!(pool_threads(1), 1);
        assert_eq!(pool_threads(3000), available);
        assert!(pool_threads(2) <= 2);

        let grid = double_couple_grid_regular_axes(4.5, 2, 3, 3).unwrap();
        let inputs = inputs_for(&grid, 7);
        let serial = grid_search_serial(&inputs, &grid).unwrap();
        assert_eq!(grid_search_parallel(&inputs, &grid, 3000).unwrap(), serial);
    }

    #[test]
    fn zero_workers_is_rejected_before_evaluation() {
        let grid = double_couple_grid_regular_axes(4.5, 2, 3, 3).unwrap();
        let inputs = inputs_for(&grid, 0);
        assert!(matches!(
            grid_search_parallel(&inputs, &grid, 0),
            Err(SearchError::InvalidPartition { parts: 0, .. })
        ));
    }

    #[test]
    fn config_without_category_is_rejected() {
        let grid = double_couple_grid_regular_axes(4.5, 2, 3, 3).unwrap();
        let mut inputs = inputs_for(&grid, 0);
        inputs.configs.insert("body_waves".into(), MisfitConfig::body_waves());
        assert!(matches!(
            grid_search_serial(&inputs, &grid),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn state_machine_runs_once() {
        let grid = double_couple_grid_regular_axes(4.5, 2, 3, 3).unwrap();
        let inputs = inputs_for(&grid, 0);
        let mut search = GridSearch::new();
        for (name, category) in &inputs.categories {
            search.add_category(name.clone(), category.clone(), inputs.configs[name].clone());
        }
        assert_eq!(search.state(), SearchState::Idle);
        search.run_serial(&grid).unwrap();
        assert_eq!(search.state(), SearchState::Completed);
        assert!(search.run_parallel(&grid, 2).is_err());
    }

    #[test]
    fn synthesis_failure_aborts_the_run() {
        let grid = double_couple_grid_regular_axes(4.5, 2, 3, 3).unwrap();
        let mut inputs = inputs_for(&grid, 0);
        // Observed station that the Green's functions know nothing about.
        let extra = crate::waveform::Stream::new(
            "XX.GHOST.",
            vec![crate::waveform::Trace::new(Component::Z, 0.5, vec![0.0; 40]).unwrap()],
        );
        let category = inputs.categories.get_mut("surface_waves").unwrap();
        let mut streams: Vec<_> = category.data.iter().cloned().collect();
        streams.push(extra);
        category.data = Arc::new(Dataset::new(streams));

        let mut search = GridSearch::new();
        for (name, category) in &inputs.categories {
            search.add_category(name.clone(), category.clone(), inputs.configs[name].clone());
        }
        assert!(matches!(
            search.run_parallel(&grid, 3),
            Err(SearchError::SynthesisFailure { .. })
        ));
        assert_eq!(search.state(), SearchState::Failed);
    }
}
