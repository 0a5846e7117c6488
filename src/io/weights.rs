//! CAP-style station weight files.
//!
//! One station per line, whitespace separated:
//!
//! ```text
//! EVENT.NET.STA.LOC.CHA  [distance]  bodyZ bodyR surfZ surfR surfT  [ignored...]
//! ```
//!
//! The lookup key is segments 1..=3 of the dotted identifier (`NET.STA.LOC`).
//! Exactly five numeric fields means there is no distance column; with six or
//! more the first is the distance and anything after the sixth is ignored.
//! Blank lines and lines starting with `#` are skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use tracing::{debug, info};

use crate::error::{Result, SearchError};
use crate::waveform::Dataset;

/// Weight column positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WeightSlot {
    BodyZ = 0,
    BodyR = 1,
    SurfaceZ = 2,
    SurfaceR = 3,
    SurfaceT = 4,
}

pub const SLOT_COUNT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationWeights {
    pub distance: Option<f64>,
    pub weights: [f64; SLOT_COUNT],
}

impl StationWeights {
    pub fn get(&self, slot: WeightSlot) -> f64 {
        self.weights[slot as usize]
    }

    pub fn all_zero(&self) -> bool {
        self.weights.iter().all(|w| *w == 0.0)
    }
}

/// Parsed weight file keyed by `NET.STA.LOC`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightTable {
    entries: BTreeMap<String, StationWeights>,
}

impl WeightTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, weights: StationWeights) {
        self.entries.insert(key.into(), weights);
    }

    pub fn get(&self, station: &str) -> Option<&StationWeights> {
        self.entries.get(station)
    }

    /// Lookup that treats a missing station as an error.
    pub fn require(&self, station: &str) -> Result<&StationWeights> {
        self.get(station).ok_or_else(|| SearchError::MissingWeightEntry {
            station: station.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StationWeights)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let mut table = WeightTable::new();
        for (i, raw) in text.lines().enumerate() {
            let line = i + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            let mut fields = trimmed.split_whitespace();
            let Some(identifier) = fields.next() else {
                continue;
            };
            let key = station_key(identifier).ok_or_else(|| SearchError::WeightFileParse {
                line,
                reason: format!("identifier '{identifier}' needs at least four dot-separated segments"),
            })?;

            let numbers = fields
                .map(|f| {
                    f.parse::<f64>().map_err(|_| SearchError::WeightFileParse {
                        line,
                        reason: format!("'{f}' is not a number"),
                    })
                })
                .collect::<Result<Vec<f64>>>()?;

            let (distance, slots) = match numbers.len() {
                n if n < SLOT_COUNT => {
                    return Err(SearchError::WeightFileParse {
                        line,
                        reason: format!("expected at least {SLOT_COUNT} numeric fields, found {n}"),
                    });
                }
                SLOT_COUNT => (None, &numbers[..]),
                _ => (Some(numbers[0]), &numbers[1..=SLOT_COUNT]),
            };

            let mut weights = [0.0; SLOT_COUNT];
            for (w, v) in weights.iter_mut().zip(slots) {
                if !(v.is_finite() && *v >= 0.0) {
                    return Err(SearchError::WeightFileParse {
                        line,
                        reason: format!("weight {v} must be finite and >= 0"),
                    });
                }
                *w = *v;
            }

            table.insert(key, StationWeights { distance, weights });
        }
        Ok(table)
    }
}

/// `NET.STA.LOC` from a dotted identifier such as `EVENT.NET.STA.LOC.CHA`.
pub fn station_key(identifier: &str) -> Option<String> {
    let segments: Vec<&str> = identifier.split('.').collect();
    if segments.len() < 4 {
        return None;
    }
    Some(segments[1..4].join("."))
}

pub fn parse_weight_file(path: &Path) -> Result<WeightTable> {
    let text = fs::read_to_string(path).map_err(|e| SearchError::io(path, e))?;
    let table = WeightTable::parse_str(&text)?;
    info!(path = %path.display(), stations = table.len(), "parsed weight file");
    Ok(table)
}

/// Drop stations that are missing from `table` or whose weights are all zero.
///
/// Returns the removed station ids.
pub fn remove_unused_stations(dataset: &mut Dataset, table: &WeightTable) -> Vec<String> {
    let unused: Vec<String> = dataset
        .iter()
        .filter(|s| table.get(&s.id).is_none_or(StationWeights::all_zero))
        .map(|s| s.id.clone())
        .collect();

    for id in &unused {
        debug!(station = %id, "removing station without usable weights");
        dataset.remove(id);
    }
    unused
}
