//! Point-list grids: one array per axis, all of the same length.
//!
//! Index `i` of every array belongs to the same logical sample, so a random
//! full-moment-tensor grid is just six parallel arrays.

use std::sync::Arc;

use crate::error::{Result, SearchError};
use crate::grid::{Coordinates, ParameterGrid, SharedTransform, validate_against_transform};

#[derive(Debug, Clone)]
pub struct UnstructuredGrid {
    names: Arc<[String]>,
    columns: Vec<Vec<f64>>,
    len: usize,
    offset: usize,
    transform: Option<SharedTransform>,
}

impl UnstructuredGrid {
    /// Build from `(axis name, per-point values)` pairs.
    pub fn new(columns: Vec<(String, Vec<f64>)>, transform: Option<SharedTransform>) -> Result<Self> {
        let Some((_, first)) = columns.first() else {
            return Err(SearchError::InvalidConfig("grid needs at least one axis".into()));
        };
        let len = first.len();
        if len == 0 {
            return Err(SearchError::domain(columns[0].0.as_str(), "axis must have at least one point"));
        }
        for (name, values) in &columns {
            if values.len() != len {
                return Err(SearchError::ShapeMismatch {
                    what: format!("axis '{name}'"),
                    expected: len,
                    got: values.len(),
                });
            }
        }

        let names: Arc<[String]> = columns.iter().map(|(n, _)| n.clone()).collect();
        validate_against_transform(
            transform.as_ref(),
            &names,
            columns.iter().map(|(n, v)| (n.as_str(), v.as_slice())),
        )?;

        Ok(Self {
            names,
            columns: columns.into_iter().map(|(_, v)| v).collect(),
            len,
            offset: 0,
            transform,
        })
    }

    /// Materialise `len` points of `parent` starting at `start`.
    ///
    /// The parent was validated when it was built, so no domain checks here.
    pub(crate) fn from_range(parent: &ParameterGrid, start: usize, len: usize) -> Result<Self> {
        let names = match parent {
            ParameterGrid::Structured(g) => g.shared_names(),
            ParameterGrid::Unstructured(g) => g.names.clone(),
        };
        let mut columns = vec![Vec::with_capacity(len); names.len()];
        for index in start..start + len {
            let coords = parent.coordinates(index)?;
            for (column, value) in columns.iter_mut().zip(coords.values()) {
                column.push(*value);
            }
        }
        Ok(Self {
            names,
            columns,
            len,
            offset: parent.offset() + start,
            transform: parent.transform().cloned(),
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn size(&self) -> usize {
        self.len
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn transform(&self) -> Option<&SharedTransform> {
        self.transform.as_ref()
    }

    /// Per-point values of one axis.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub(crate) fn coords_at(&self, index: usize) -> Coordinates {
        let values = self.columns.iter().map(|c| c[index]).collect();
        Coordinates::new(self.names.clone(), values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_is_shared_cardinality() {
        let grid = UnstructuredGrid::new(
            vec![
                ("a".to_string(), vec![1.0, 2.0, 3.0]),
                ("b".to_string(), vec![4.0, 5.0, 6.0]),
            ],
            None,
        )
        .unwrap();
        assert_eq!(grid.size(), 3);
        assert_eq!(grid.coords_at(1).values(), &[2.0, 5.0]);
        assert_eq!(grid.column("b"), Some(&[4.0, 5.0, 6.0][..]));
    }

    #[test]
    fn mismatched_lengths_are_rejected() {
        let err = UnstructuredGrid::new(
            vec![
                ("a".to_string(), vec![1.0, 2.0, 3.0]),
                ("b".to_string(), vec![4.0, 5.0]),
            ],
            None,
        )
        .unwrap_err();
        assert!(matches!(err, SearchError::ShapeMismatch { expected: 3, got: 2, .. }));
    }
}
