//! Misfit arrays aligned to grid order, best-fit lookup, persistence.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::grid::{GridPoint, ParameterGrid};

/// Key under which misfit values are persisted.
pub const MISFIT_KEY: &str = "misfit";

/// Total misfit per grid point; element `i` belongs to grid index `i`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultArray {
    values: Vec<f64>,
}

impl ResultArray {
    pub fn zeros(len: usize) -> Self {
        Self {
            values: vec![0.0; len],
        }
    }

    pub fn from_vec(values: Vec<f64>) -> Self {
        Self { values }
    }

    /// Concatenate per-worker arrays in worker order.
    pub fn concat(parts: impl IntoIterator<Item = ResultArray>) -> Self {
        let values = parts.into_iter().flat_map(|p| p.values).collect();
        Self { values }
    }

    pub(crate) fn set(&mut self, index: usize, value: f64) {
        self.values[index] = value;
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<f64> {
        self.values
    }

    /// Index of the smallest misfit. Ties go to the lowest index and NaN is
    /// only chosen when every entry is NaN.
    pub fn argmin(&self) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, &v) in self.values.iter().enumerate() {
            best = match best {
                None => Some((i, v)),
                Some((_, b)) if b.is_nan() && !v.is_nan() => Some((i, v)),
                Some((_, b)) if v < b => Some((i, v)),
                keep => keep,
            };
        }
        best.map(|(i, _)| i)
    }

    pub fn min(&self) -> Option<f64> {
        self.argmin().map(|i| self.values[i])
    }

    /// Best-fitting grid point.
    pub fn best_fit(&self, grid: &ParameterGrid) -> Result<BestFit> {
        if self.len() != grid.size() {
            return Err(SearchError::ShapeMismatch {
                what: "misfit array".into(),
                expected: grid.size(),
                got: self.len(),
            });
        }
        let index = self
            .argmin()
            .ok_or_else(|| SearchError::InvalidConfig("cannot select a best fit from an empty grid".into()))?;
        Ok(BestFit {
            index,
            misfit: self.values[index],
            point: grid.get(index)?,
        })
    }
}

/// Minimum-misfit grid point.
#[derive(Debug, Clone, PartialEq)]
pub struct BestFit {
    pub index: usize,
    pub misfit: f64,
    pub point: GridPoint,
}

/// A grid together with its completed misfit array.
#[derive(Debug, Clone)]
pub struct ResultStore<'g> {
    grid: &'g ParameterGrid,
    misfit: ResultArray,
}

impl<'g> ResultStore<'g> {
    pub fn new(grid: &'g ParameterGrid, misfit: ResultArray) -> Result<Self> {
        if misfit.len() != grid.size() {
            return Err(SearchError::ShapeMismatch {
                what: "misfit array".into(),
                expected: grid.size(),
                got: misfit.len(),
            });
        }
        Ok(Self { grid, misfit })
    }

    pub fn grid(&self) -> &ParameterGrid {
        self.grid
    }

    pub fn misfit(&self) -> &ResultArray {
        &self.misfit
    }

    pub fn best(&self) -> Result<BestFit> {
        self.misfit.best_fit(self.grid)
    }

    /// Save axis definitions plus the misfit array under `MISFIT_KEY`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut extra = BTreeMap::new();
        extra.insert(MISFIT_KEY.to_string(), self.misfit.as_slice().to_vec());
        self.grid.save(path, &extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::grid::{Axis, StructuredGrid};

    #[test]
    fn argmin_breaks_ties_by_lowest_index() {
        let r = ResultArray::from_vec(vec![3.0, 1.0, 2.0, 1.0]);
        assert_eq!(r.argmin(), Some(1));
        assert_eq!(r.min(), Some(1.0));
    }

    #[test]
    fn argmin_skips_nan() {
        let r = ResultArray::from_vec(vec![f64::NAN, 4.0, f64::NAN, 2.0]);
        assert_eq!(r.argmin(), Some(3));
        let all_nan = ResultArray::from_vec(vec![f64::NAN, f64::NAN]);
        assert_eq!(all_nan.argmin(), Some(0));
        assert_eq!(ResultArray::default().argmin(), None);
    }

    #[test]
    fn concat_keeps_worker_order() {
        let r = ResultArray::concat(vec![
            ResultArray::from_vec(vec![1.0, 2.0]),
            ResultArray::from_vec(vec![]),
            ResultArray::from_vec(vec![3.0]),
        ]);
        assert_eq!(r.as_slice(), &[1.0, 2.0, 3.0]);
    }

    #[test]
    fn store_requires_matching_length() {
        let grid: ParameterGrid = StructuredGrid::new(vec![Axis::closed("x", 0.0, 1.0, 3).unwrap()], None)
            .unwrap()
            .into();
        assert!(ResultStore::new(&grid, ResultArray::zeros(2)).is_err());

        let store = ResultStore::new(&grid, ResultArray::from_vec(vec![0.3, 0.1, 0.2])).unwrap();
        let best = store.best().unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.point.coords.get("x"), Some(0.5));
    }
}
