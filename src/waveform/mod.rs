//! Waveform containers and the Green's-function interface.
//!
//! The search never reads files or filters traces; it receives already
//! processed `Dataset`s and a `GreensFunction` per data category.

pub mod greens;

use std::collections::{BTreeMap, btree_map};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::tensor::MomentTensor;

pub use greens::{GreensTensor, GreensTensorSet};

/// Seismogram component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Component {
    /// Vertical.
    Z,
    /// Radial.
    R,
    /// Transverse.
    T,
}

impl Component {
    pub const ALL: [Component; 3] = [Component::Z, Component::R, Component::T];

    /// Parse from a channel code's last letter (`BHZ` → `Z`).
    pub fn from_channel(channel: &str) -> Option<Self> {
        match channel.chars().last()?.to_ascii_uppercase() {
            'Z' => Some(Component::Z),
            'R' => Some(Component::R),
            'T' => Some(Component::T),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Component::Z => 'Z',
            Component::R => 'R',
            Component::T => 'T',
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// One evenly sampled time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    pub component: Component,
    /// Sample interval (seconds).
    pub dt: f64,
    pub samples: Vec<f64>,
}

impl Trace {
    pub fn new(component: Component, dt: f64, samples: Vec<f64>) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "trace sample interval must be > 0 (got {dt})"
            )));
        }
        Ok(Self {
            component,
            dt,
            samples,
        })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// All traces recorded at one station.
///
/// `id` is the `NETWORK.STATION.LOCATION` key shared with weight files and
/// Green's functions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    pub traces: Vec<Trace>,
}

impl Stream {
    pub fn new(id: impl Into<String>, traces: Vec<Trace>) -> Self {
        Self {
            id: id.into(),
            traces,
        }
    }

    pub fn component(&self, component: Component) -> Option<&Trace> {
        self.traces.iter().find(|t| t.component == component)
    }
}

/// Per-station waveform bundles for one data category, keyed and ordered
/// by station id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    streams: BTreeMap<String, Stream>,
}

impl Dataset {
    /// A later stream replaces an earlier one with the same id.
    pub fn new(streams: Vec<Stream>) -> Self {
        streams.into_iter().collect()
    }

    pub fn iter(&self) -> btree_map::Values<'_, String, Stream> {
        self.streams.values()
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Stream> {
        self.streams.get(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.streams.keys().map(String::as_str)
    }

    /// Apply a per-station processing function, producing a new dataset.
    pub fn map<F>(&self, mut f: F) -> Result<Dataset>
    where
        F: FnMut(&Stream) -> Result<Stream>,
    {
        self.streams.values().map(&mut f).collect()
    }

    /// Drop a station; returns it if it was present.
    pub fn remove(&mut self, id: &str) -> Option<Stream> {
        self.streams.remove(id)
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Stream;
    type IntoIter = btree_map::Values<'a, String, Stream>;

    fn into_iter(self) -> Self::IntoIter {
        self.streams.values()
    }
}

impl FromIterator<Stream> for Dataset {
    fn from_iter<I: IntoIterator<Item = Stream>>(iter: I) -> Self {
        Dataset {
            streams: iter.into_iter().map(|s| (s.id.clone(), s)).collect(),
        }
    }
}

/// Produces synthetic waveforms for a candidate source.
///
/// Returned streams must use the same station ids as the observed dataset.
/// Implementations are shared read-only across search workers.
pub trait GreensFunction: Send + Sync + fmt::Debug {
    fn get_synthetics(&self, mt: &MomentTensor) -> Result<Dataset>;
}
