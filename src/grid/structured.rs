//! Cartesian-product grids.

use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::grid::{Axis, Coordinates, Sampling, SharedTransform, validate_against_transform};

/// Cartesian product of axes; size is the product of axis lengths.
#[derive(Debug, Clone)]
pub struct StructuredGrid {
    axes: Vec<Axis>,
    names: Arc<[String]>,
    size: usize,
    transform: Option<SharedTransform>,
}

impl StructuredGrid {
    pub fn new(axes: Vec<Axis>, transform: Option<SharedTransform>) -> Result<Self> {
        if axes.is_empty() {
            return Err(SearchError::InvalidConfig("grid needs at least one axis".into()));
        }

        let names: Arc<[String]> = axes.iter().map(|a| a.name().to_string()).collect();
        validate_against_transform(
            transform.as_ref(),
            &names,
            axes.iter().map(|a| (a.name(), a.values())),
        )?;
        if let Some(t) = &transform {
            for axis in &axes {
                let (lo, hi) = axis.interval();
                if let Some(bounds) = t.domain(axis.name()) {
                    if !(bounds.contains(lo) && (bounds.contains(hi) || axis_excludes_hi(axis))) {
                        return Err(SearchError::domain(
                            axis.name(),
                            format!("interval [{lo}, {hi}] exceeds {bounds}"),
                        ));
                    }
                }
            }
        }

        let size = axes.iter().try_fold(1usize, |acc, a| acc.checked_mul(a.len()));
        let Some(size) = size else {
            return Err(SearchError::InvalidConfig("grid size overflows usize".into()));
        };

        Ok(Self {
            axes,
            names,
            size,
            transform,
        })
    }

    pub fn axes(&self) -> &[Axis] {
        &self.axes
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub(crate) fn shared_names(&self) -> Arc<[String]> {
        self.names.clone()
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn transform(&self) -> Option<&SharedTransform> {
        self.transform.as_ref()
    }

    /// Row-major decode: the last axis varies fastest. Caller checks bounds.
    pub(crate) fn coords_at(&self, index: usize) -> Coordinates {
        let mut rem = index;
        let mut values = vec![0.0; self.axes.len()];
        for (slot, axis) in values.iter_mut().zip(self.axes.iter()).rev() {
            let n = axis.len();
            *slot = axis.values()[rem % n];
            rem /= n;
        }
        Coordinates::new(self.names.clone(), values)
    }
}

/// Open and random axes never produce their upper endpoint, so a half-open
/// domain may coincide with it.
fn axis_excludes_hi(axis: &Axis) -> bool {
    let (lo, hi) = axis.interval();
    matches!(axis.sampling(), Sampling::Open | Sampling::Random) && hi > lo
}
