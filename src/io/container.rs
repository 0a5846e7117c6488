//! Keyed array containers for saved grids and results.
//!
//! A container maps names to 1-D `f64` arrays plus a little metadata:
//!
//! - `axis/<name>`: axis samples (structured grids) or per-point values
//!   (unstructured grids)
//! - any caller-supplied key, e.g. `misfit`
//!
//! Two encodings, picked by file extension:
//! - `.npz`: NumPy archive, one `.npy` entry per key; metadata is a JSON
//!   document stored as the `u8` array `meta/header`
//! - anything else: pretty-printed JSON of `Container`

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use ndarray::Array1;
use ndarray_npy::{NpzReader, NpzWriter};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, SearchError};
use crate::grid::ParameterGrid;

pub const AXIS_PREFIX: &str = "axis/";
const META_PREFIX: &str = "meta/";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Container {
    pub tool: String,
    pub created: Option<DateTime<Utc>>,
    /// `structured` or `unstructured`.
    pub kind: String,
    /// Number of grid points.
    pub size: usize,
    /// Axis names in grid order.
    pub axes: Vec<String>,
    pub transform: Option<String>,
    pub arrays: BTreeMap<String, Vec<f64>>,
}

impl Container {
    /// Snapshot a grid and extra arrays.
    pub fn from_grid(grid: &ParameterGrid, extra: &BTreeMap<String, Vec<f64>>) -> Result<Self> {
        let mut arrays = BTreeMap::new();
        match grid {
            ParameterGrid::Structured(g) => {
                for axis in g.axes() {
                    arrays.insert(format!("{AXIS_PREFIX}{}", axis.name()), axis.values().to_vec());
                }
            }
            ParameterGrid::Unstructured(g) => {
                for name in g.names() {
                    let column = g.column(name).unwrap_or_default();
                    arrays.insert(format!("{AXIS_PREFIX}{name}"), column.to_vec());
                }
            }
        }

        for (key, values) in extra {
            if key.starts_with(AXIS_PREFIX) || key.starts_with(META_PREFIX) {
                return Err(SearchError::InvalidConfig(format!(
                    "array key '{key}' uses a reserved prefix"
                )));
            }
            arrays.insert(key.clone(), values.clone());
        }

        Ok(Self {
            tool: "mtsearch".to_string(),
            created: Some(Utc::now()),
            kind: grid.kind().to_string(),
            size: grid.size(),
            axes: grid.axis_names().to_vec(),
            transform: grid.transform().map(|t| t.name().to_string()),
            arrays,
        })
    }

    pub fn get(&self, key: &str) -> Option<&[f64]> {
        self.arrays.get(key).map(Vec::as_slice)
    }

    /// Samples (or per-point values) of one axis.
    pub fn axis(&self, name: &str) -> Option<&[f64]> {
        self.get(&format!("{AXIS_PREFIX}{name}"))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.arrays.keys().map(String::as_str)
    }

    pub fn is_structured(&self) -> bool {
        self.kind == "structured"
    }

    /// Raw coordinates of point `index`, decoded like the grid that was saved.
    pub fn coordinates(&self, index: usize) -> Result<Vec<(String, f64)>> {
        if index >= self.size {
            return Err(SearchError::IndexOutOfRange {
                index,
                size: self.size,
            });
        }
        let columns = self
            .axes
            .iter()
            .map(|name| {
                self.axis(name)
                    .ok_or_else(|| SearchError::Container(format!("axis '{name}' missing from container")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut out = vec![(String::new(), 0.0); self.axes.len()];
        if self.is_structured() {
            let mut rem = index;
            for ((slot, name), column) in out.iter_mut().zip(&self.axes).zip(&columns).rev() {
                if column.is_empty() {
                    return Err(SearchError::Container(format!("axis '{name}' is empty")));
                }
                *slot = (name.clone(), column[rem % column.len()]);
                rem /= column.len();
            }
        } else {
            for ((slot, name), column) in out.iter_mut().zip(&self.axes).zip(&columns) {
                let value = column.get(index).copied().ok_or_else(|| SearchError::ShapeMismatch {
                    what: format!("axis '{name}'"),
                    expected: self.size,
                    got: column.len(),
                })?;
                *slot = (name.clone(), value);
            }
        }
        Ok(out)
    }
}

fn is_npz(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("npz"))
}

/// Write a grid and its extra arrays to `path`.
pub fn save_grid(grid: &ParameterGrid, path: &Path, extra: &BTreeMap<String, Vec<f64>>) -> Result<()> {
    let container = Container::from_grid(grid, extra)?;
    save_container(&container, path)?;
    info!(
        path = %path.display(),
        points = container.size,
        arrays = container.arrays.len(),
        "saved grid container"
    );
    Ok(())
}

pub fn save_container(container: &Container, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| SearchError::io(path, e))?;
    if is_npz(path) {
        write_npz(container, file)
    } else {
        serde_json::to_writer_pretty(BufWriter::new(file), container)
            .map_err(|e| SearchError::Container(format!("failed to write JSON container: {e}")))
    }
}

pub fn load_container(path: &Path) -> Result<Container> {
    let file = File::open(path).map_err(|e| SearchError::io(path, e))?;
    if is_npz(path) {
        read_npz(file)
    } else {
        serde_json::from_reader(BufReader::new(file))
            .map_err(|e| SearchError::Container(format!("invalid JSON container: {e}")))
    }
}

/// Everything but the arrays; stored in NPZ files as UTF-8 JSON bytes.
#[derive(Serialize, Deserialize)]
struct Header {
    tool: String,
    created: Option<DateTime<Utc>>,
    kind: String,
    size: usize,
    axes: Vec<String>,
    transform: Option<String>,
}

const HEADER_KEY: &str = "meta/header";

fn write_npz(container: &Container, file: File) -> Result<()> {
    let npz_err = |e: ndarray_npy::WriteNpzError| SearchError::Container(format!("failed to write npz: {e}"));
    let header = Header {
        tool: container.tool.clone(),
        created: container.created,
        kind: container.kind.clone(),
        size: container.size,
        axes: container.axes.clone(),
        transform: container.transform.clone(),
    };
    let header = serde_json::to_vec(&header)
        .map_err(|e| SearchError::Container(format!("failed to encode header: {e}")))?;

    let mut npz = NpzWriter::new(file);
    npz.add_array(HEADER_KEY, &Array1::from_vec(header)).map_err(npz_err)?;
    for (key, values) in &container.arrays {
        npz.add_array(key.as_str(), &Array1::from_vec(values.clone()))
            .map_err(npz_err)?;
    }
    npz.finish().map_err(npz_err)?;
    Ok(())
}

fn read_npz(file: File) -> Result<Container> {
    let npz_err = |e: ndarray_npy::ReadNpzError| SearchError::Container(format!("failed to read npz: {e}"));
    let mut npz = NpzReader::new(file).map_err(npz_err)?;

    let header: Array1<u8> = npz.by_name(HEADER_KEY).map_err(npz_err)?;
    let header: Header = serde_json::from_slice(header.as_slice().unwrap_or_default())
        .map_err(|e| SearchError::Container(format!("invalid npz header: {e}")))?;

    let mut arrays = BTreeMap::new();
    for name in npz.names().map_err(npz_err)? {
        if name.starts_with(META_PREFIX) {
            continue;
        }
        let array: Array1<f64> = npz.by_name(&name).map_err(npz_err)?;
        arrays.insert(name, array.to_vec());
    }

    Ok(Container {
        tool: header.tool,
        created: header.created,
        kind: header.kind,
        size: header.size,
        axes: header.axes,
        transform: header.transform,
        arrays,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::tempdir;

    use crate::grid::{Axis, StructuredGrid, UnstructuredGrid};

    fn structured() -> ParameterGrid {
        StructuredGrid::new(
            vec![
                Axis::closed("a", 0.0, 1.0, 3).unwrap(),
                Axis::closed("b", 5.0, 6.0, 2).unwrap(),
            ],
            None,
        )
        .unwrap()
        .into()
    }

    fn misfit(values: Vec<f64>) -> BTreeMap<String, Vec<f64>> {
        let mut extra = BTreeMap::new();
        extra.insert("misfit".to_string(), values);
        extra
    }

    #[test]
    fn json_container_keeps_axes_and_extra_arrays() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let grid = structured();
        grid.save(&path, &misfit(vec![6.0, 5.0, 4.0, 3.0, 2.0, 1.0])).unwrap();

        let c = load_container(&path).unwrap();
        assert!(c.is_structured());
        assert_eq!(c.size, 6);
        assert_eq!(c.axes, vec!["a".to_string(), "b".to_string()]);
        assert_eq!(c.axis("a"), Some(&[0.0, 0.5, 1.0][..]));
        assert_eq!(c.get("misfit").unwrap().len(), 6);

        let expected: Vec<(String, f64)> = grid
            .coordinates(3)
            .unwrap()
            .iter()
            .map(|(n, v)| (n.to_string(), v))
            .collect();
        assert_eq!(c.coordinates(3).unwrap(), expected);
    }

    #[test]
    fn json_container_keeps_every_bit_of_a_float() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bits.json");
        let values = vec![1.1584718935516149e33, 0.1 + 0.2, 1.0 / 3.0, 5e-324, 2.2250738585072014e-308, 6.02214076e23];
        structured().save(&path, &misfit(values.clone())).unwrap();

        let c = load_container(&path).unwrap();
        let loaded = c.get("misfit").unwrap();
        for (a, b) in values.iter().zip(loaded) {
            assert_eq!(a.to_bits(), b.to_bits(), "{a:e} reloaded as {b:e}");
        }
    }

    #[test]
    fn npz_container_round_trips_unstructured_grid() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grid.npz");
        let grid: ParameterGrid = UnstructuredGrid::new(
            vec![
                ("z".to_string(), vec![1.0, 2.0]),
                ("a".to_string(), vec![3.0, 4.0]),
            ],
            None,
        )
        .unwrap()
        .into();
        grid.save(&path, &misfit(vec![0.5, 0.25])).unwrap();

        let c = load_container(&path).unwrap();
        assert!(!c.is_structured());
        assert_eq!(c.size, 2);
        assert_eq!(c.axes, vec!["z".to_string(), "a".to_string()]);
        assert_eq!(c.get("misfit"), Some(&[0.5, 0.25][..]));
        assert_eq!(c.coordinates(1).unwrap()[1], ("a".to_string(), 4.0));
        assert!(c.created.is_some());
    }

    #[test]
    fn reserved_keys_are_rejected() {
        let dir = tempdir().unwrap();
        let mut extra = BTreeMap::new();
        extra.insert("axis/a".to_string(), vec![1.0]);
        assert!(matches!(
            structured().save(&dir.path().join("x.json"), &extra),
            Err(SearchError::InvalidConfig(_))
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            load_container(&dir.path().join("absent.npz")),
            Err(SearchError::Io { .. })
        ));
    }
}
