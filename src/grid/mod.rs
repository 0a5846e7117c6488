//! Parameter grids.
//!
//! A grid is an ordered set of coordinate records over named axes:
//!
//! - `StructuredGrid`: Cartesian product of axes, iterated row-major (last
//!   axis fastest) in declared axis order.
//! - `UnstructuredGrid`: parallel per-axis arrays sharing one length, iterated
//!   in array order.
//!
//! Both sit behind `ParameterGrid`, which is what the search consumes.
//! Grids are immutable once built; an optional `ParameterTransform` is applied
//! on read so every `GridPoint` already carries its moment tensor.

pub mod axis;
pub mod presets;
pub mod structured;
pub mod unstructured;

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::tensor::{MomentTensor, ParameterTransform};

pub use axis::{Axis, Sampling, closed_interval, open_interval, random_values};
pub use presets::*;
pub use structured::StructuredGrid;
pub use unstructured::UnstructuredGrid;

/// Shared handle to a transform; cloned into every sub-grid.
pub type SharedTransform = Arc<dyn ParameterTransform>;

/// Raw axis values of one grid point, in the grid's axis order.
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    names: Arc<[String]>,
    values: Vec<f64>,
}

impl Coordinates {
    pub fn new(names: Arc<[String]>, values: Vec<f64>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names.iter().map(String::as_str).zip(self.values.iter().copied())
    }
}

/// One grid sample: position, raw coordinates, and (if the grid has a
/// transform) the moment tensor those coordinates map to.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub index: usize,
    pub coords: Coordinates,
    pub tensor: Option<MomentTensor>,
}

impl GridPoint {
    pub fn moment_tensor(&self) -> Result<&MomentTensor> {
        self.tensor.as_ref().ok_or(SearchError::MissingTransform)
    }
}

/// A structured or unstructured grid.
#[derive(Debug, Clone)]
pub enum ParameterGrid {
    Structured(StructuredGrid),
    Unstructured(UnstructuredGrid),
}

impl From<StructuredGrid> for ParameterGrid {
    fn from(grid: StructuredGrid) -> Self {
        ParameterGrid::Structured(grid)
    }
}

impl From<UnstructuredGrid> for ParameterGrid {
    fn from(grid: UnstructuredGrid) -> Self {
        ParameterGrid::Unstructured(grid)
    }
}

impl ParameterGrid {
    /// Total number of points.
    pub fn size(&self) -> usize {
        match self {
            ParameterGrid::Structured(g) => g.size(),
            ParameterGrid::Unstructured(g) => g.size(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }

    pub fn axis_names(&self) -> &[String] {
        match self {
            ParameterGrid::Structured(g) => g.names(),
            ParameterGrid::Unstructured(g) => g.names(),
        }
    }

    pub fn transform(&self) -> Option<&SharedTransform> {
        match self {
            ParameterGrid::Structured(g) => g.transform(),
            ParameterGrid::Unstructured(g) => g.transform(),
        }
    }

    /// Position of this grid's first point within the grid it was decomposed
    /// from (0 for top-level grids).
    pub fn offset(&self) -> usize {
        match self {
            ParameterGrid::Structured(_) => 0,
            ParameterGrid::Unstructured(g) => g.offset(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ParameterGrid::Structured(_) => "structured",
            ParameterGrid::Unstructured(_) => "unstructured",
        }
    }

    /// Raw coordinates at `index`, without the transform.
    pub fn coordinates(&self, index: usize) -> Result<Coordinates> {
        let size = self.size();
        if index >= size {
            return Err(SearchError::IndexOutOfRange { index, size });
        }
        Ok(match self {
            ParameterGrid::Structured(g) => g.coords_at(index),
            ParameterGrid::Unstructured(g) => g.coords_at(index),
        })
    }

    /// Grid point at `index`, with the transform applied.
    pub fn get(&self, index: usize) -> Result<GridPoint> {
        let coords = self.coordinates(index)?;
        self.apply_transform(index, coords)
    }

    /// Lazy, restartable iteration in grid order.
    pub fn iter(&self) -> GridIter<'_> {
        GridIter { grid: self, next: 0 }
    }

    fn apply_transform(&self, index: usize, coords: Coordinates) -> Result<GridPoint> {
        let tensor = match self.transform() {
            Some(t) => Some(t.apply(&coords)?),
            None => None,
        };
        Ok(GridPoint {
            index,
            coords,
            tensor,
        })
    }

    /// Split into `n` contiguous sub-grids whose sizes differ by at most one.
    ///
    /// The first `size % n` parts receive the extra point. When `n > size`
    /// the trailing parts are empty. Concatenating the parts in order
    /// reproduces this grid's iteration order.
    pub fn decompose(&self, n: usize) -> Result<Vec<ParameterGrid>> {
        let size = self.size();
        if n == 0 {
            return Err(SearchError::InvalidPartition { parts: n, size });
        }

        let base = size / n;
        let extra = size % n;
        let mut parts = Vec::with_capacity(n);
        let mut start = 0;
        for i in 0..n {
            let len = base + usize::from(i < extra);
            parts.push(ParameterGrid::Unstructured(UnstructuredGrid::from_range(
                self, start, len,
            )?));
            start += len;
        }
        debug_assert_eq!(start, size);
        Ok(parts)
    }

    /// Persist axis definitions plus `extra` named arrays (e.g. misfit values).
    ///
    /// `.npz` paths are written as NumPy archives, anything else as JSON.
    pub fn save(&self, path: &Path, extra: &BTreeMap<String, Vec<f64>>) -> Result<()> {
        crate::io::container::save_grid(self, path, extra)
    }
}

impl<'a> IntoIterator for &'a ParameterGrid {
    type Item = Result<GridPoint>;
    type IntoIter = GridIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over a grid's points; each call to `ParameterGrid::iter` starts over.
#[derive(Debug, Clone)]
pub struct GridIter<'a> {
    grid: &'a ParameterGrid,
    next: usize,
}

impl Iterator for GridIter<'_> {
    type Item = Result<GridPoint>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next >= self.grid.size() {
            return None;
        }
        let index = self.next;
        self.next += 1;
        Some(self.grid.get(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.grid.size().saturating_sub(self.next);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for GridIter<'_> {}

/// Check axis names against a transform: required axes present, every
/// sample inside the transform's domain.
pub(crate) fn validate_against_transform<'a>(
    transform: Option<&SharedTransform>,
    names: &[String],
    columns: impl Iterator<Item = (&'a str, &'a [f64])>,
) -> Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(SearchError::domain(name.as_str(), "duplicate axis name"));
        }
    }

    let Some(transform) = transform else {
        return Ok(());
    };

    for required in transform.required_axes() {
        if !seen.contains(required) {
            return Err(SearchError::domain(
                *required,
                format!("axis required by the {} transform is missing", transform.name()),
            ));
        }
    }

    for (name, values) in columns {
        let Some(bounds) = transform.domain(name) else {
            continue;
        };
        if let Some(bad) = values.iter().find(|v| !bounds.contains(**v)) {
            return Err(SearchError::domain(
                name,
                format!("value {bad} outside {bounds}"),
            ));
        }
    }
    Ok(())
}
