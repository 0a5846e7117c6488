//! Waveform misfit for one data category.
//!
//! For every station with usable weights:
//!
//! 1. pair each observed component with its synthetic,
//! 2. find one time shift per component group within `±max_shift`
//!    (components outside every group are compared unshifted),
//! 3. add `weight · dt · Σ (d - s_shifted)²` per component.
//!
//! Stations absent from the weight table, or whose slots for this category
//! are all zero, are skipped. Zero-weight components are skipped entirely,
//! including from the shift search.

pub mod shift;

use std::sync::Arc;

use serde::Serialize;

use crate::error::{Result, SearchError};
use crate::io::weights::{WeightSlot, WeightTable};
use crate::tensor::MomentTensor;
use crate::waveform::{Component, Dataset, GreensFunction, Stream};

pub use shift::{ShiftPair, ShiftStrategy, best_shift, cross_correlation, residual_sq};

/// Which weight-file column feeds each component of a category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComponentSlots {
    pub z: Option<WeightSlot>,
    pub r: Option<WeightSlot>,
    pub t: Option<WeightSlot>,
}

impl ComponentSlots {
    pub const BODY_WAVES: Self = Self {
        z: Some(WeightSlot::BodyZ),
        r: Some(WeightSlot::BodyR),
        t: None,
    };

    pub const SURFACE_WAVES: Self = Self {
        z: Some(WeightSlot::SurfaceZ),
        r: Some(WeightSlot::SurfaceR),
        t: Some(WeightSlot::SurfaceT),
    };

    pub fn slot(&self, component: Component) -> Option<WeightSlot> {
        match component {
            Component::Z => self.z,
            Component::R => self.r,
            Component::T => self.t,
        }
    }
}

/// Misfit settings of one data category.
#[derive(Debug, Clone)]
pub struct MisfitConfig {
    /// Largest allowed time shift (seconds).
    pub max_shift: f64,
    /// Components sharing one time shift, e.g. `[[Z, R], [T]]`.
    pub time_shift_groups: Vec<Vec<Component>>,
    pub strategy: ShiftStrategy,
    /// `None` weights every component of every station by 1.
    pub weights: Option<Arc<WeightTable>>,
    pub slots: ComponentSlots,
}

impl MisfitConfig {
    /// Build from group strings such as `["ZR", "T"]`.
    pub fn new(max_shift: f64, groups: &[&str], slots: ComponentSlots) -> Result<Self> {
        let time_shift_groups = groups
            .iter()
            .map(|g| parse_group(g))
            .collect::<Result<Vec<_>>>()?;
        let config = Self {
            max_shift,
            time_shift_groups,
            strategy: ShiftStrategy::default(),
            weights: None,
            slots,
        };
        config.validate()?;
        Ok(config)
    }

    /// Body waves: 2 s shifts, Z and R shifted together, T unused.
    pub fn body_waves() -> Self {
        Self {
            max_shift: 2.0,
            time_shift_groups: vec![vec![Component::Z, Component::R]],
            strategy: ShiftStrategy::default(),
            weights: None,
            slots: ComponentSlots::BODY_WAVES,
        }
    }

    /// Surface waves: 10 s shifts, Z/R shifted together and T on its own.
    pub fn surface_waves() -> Self {
        Self {
            max_shift: 10.0,
            time_shift_groups: vec![vec![Component::Z, Component::R], vec![Component::T]],
            strategy: ShiftStrategy::default(),
            weights: None,
            slots: ComponentSlots::SURFACE_WAVES,
        }
    }

    pub fn with_weights(mut self, weights: Arc<WeightTable>) -> Self {
        self.weights = Some(weights);
        self
    }

    pub fn with_strategy(mut self, strategy: ShiftStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_max_shift(mut self, max_shift: f64) -> Self {
        self.max_shift = max_shift;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.max_shift.is_finite() && self.max_shift >= 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "max_shift must be finite and >= 0 (got {})",
                self.max_shift
            )));
        }
        let mut seen = Vec::new();
        for group in &self.time_shift_groups {
            for c in group {
                if seen.contains(c) {
                    return Err(SearchError::InvalidConfig(format!(
                        "component {c} appears in more than one time-shift group"
                    )));
                }
                seen.push(*c);
            }
        }
        Ok(())
    }

    /// Per-component weights of a station, indexed `[Z, R, T]`.
    ///
    /// `None` means the station does not take part in this category.
    pub fn station_weights(&self, station: &str) -> Option<[f64; 3]> {
        let entry = match &self.weights {
            Some(table) => Some(table.get(station)?),
            None => None,
        };
        let mut out = [0.0; 3];
        for (w, c) in out.iter_mut().zip(Component::ALL) {
            *w = match (self.slots.slot(c), entry) {
                (None, _) => 0.0,
                (Some(slot), Some(entry)) => entry.get(slot),
                (Some(_), None) => 1.0,
            };
        }
        if out.iter().all(|w| *w == 0.0) {
            return None;
        }
        Some(out)
    }

    /// Shift window in samples, capped at `limit`.
    fn max_shift_samples(&self, dt: f64, limit: usize) -> usize {
        let n = (self.max_shift / dt + 1e-9).floor();
        if n >= limit as f64 { limit } else { n as usize }
    }
}

fn parse_group(group: &str) -> Result<Vec<Component>> {
    let components = group
        .chars()
        .map(|ch| {
            Component::from_channel(&ch.to_string()).ok_or_else(|| {
                SearchError::InvalidConfig(format!("unknown component '{ch}' in group '{group}'"))
            })
        })
        .collect::<Result<Vec<_>>>()?;
    if components.is_empty() {
        return Err(SearchError::InvalidConfig("empty time-shift group".into()));
    }
    Ok(components)
}

/// Shift chosen for one component group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupShift {
    pub components: Vec<Component>,
    /// Seconds; positive delays the synthetic.
    pub shift: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMisfit {
    pub station: String,
    pub misfit: f64,
    pub shifts: Vec<GroupShift>,
}

/// Category total with its per-station breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryMisfit {
    pub total: f64,
    pub stations: Vec<StationMisfit>,
}

/// Misfit of one category for a candidate tensor.
pub fn evaluate_category(
    data: &Dataset,
    greens: &dyn GreensFunction,
    mt: &MomentTensor,
    config: &MisfitConfig,
) -> Result<f64> {
    let synthetics = greens.get_synthetics(mt)?;
    let mut total = 0.0;
    for stream in data {
        if let Some(station) = station_misfit(stream, &synthetics, config)? {
            total += station.misfit;
        }
    }
    Ok(total)
}

/// Same as `evaluate_category`, keeping per-station detail.
pub fn evaluate_breakdown(
    data: &Dataset,
    greens: &dyn GreensFunction,
    mt: &MomentTensor,
    config: &MisfitConfig,
) -> Result<CategoryMisfit> {
    let synthetics = greens.get_synthetics(mt)?;
    misfit_against(data, &synthetics, config)
}

/// Compare observed data with already generated synthetics.
pub fn misfit_against(data: &Dataset, synthetics: &Dataset, config: &MisfitConfig) -> Result<CategoryMisfit> {
    let mut stations = Vec::new();
    for stream in data {
        if let Some(station) = station_misfit(stream, synthetics, config)? {
            stations.push(station);
        }
    }
    let total = stations.iter().map(|s| s.misfit).sum();
    Ok(CategoryMisfit { total, stations })
}

struct Active<'a> {
    component: Component,
    weight: f64,
    observed: &'a [f64],
    synthetic: &'a [f64],
}

fn station_misfit(stream: &Stream, synthetics: &Dataset, config: &MisfitConfig) -> Result<Option<StationMisfit>> {
    let Some(weights) = config.station_weights(&stream.id) else {
        return Ok(None);
    };
    let syn = synthetics
        .get(&stream.id)
        .ok_or_else(|| SearchError::synthesis(stream.id.as_str(), "no synthetics for station"))?;

    let mut dt: Option<f64> = None;
    let mut active = Vec::new();
    for (component, weight) in Component::ALL.into_iter().zip(weights) {
        if weight == 0.0 {
            continue;
        }
        let Some(obs) = stream.component(component) else {
            continue;
        };
        let s = syn.component(component).ok_or_else(|| {
            SearchError::synthesis(stream.id.as_str(), format!("no {component} synthetic"))
        })?;
        if s.len() != obs.len() {
            return Err(SearchError::ShapeMismatch {
                what: format!("{} {component} synthetic", stream.id),
                expected: obs.len(),
                got: s.len(),
            });
        }
        let reference = *dt.get_or_insert(obs.dt);
        if (s.dt - obs.dt).abs() > 1e-9 * obs.dt || (obs.dt - reference).abs() > 1e-9 * reference {
            return Err(SearchError::synthesis(
                stream.id.as_str(),
                format!("sample interval mismatch on {component}"),
            ));
        }
        active.push(Active {
            component,
            weight,
            observed: &obs.samples,
            synthetic: &s.samples,
        });
    }

    let Some(dt) = dt else {
        return Ok(None);
    };
    // Past the trace length every shift leaves no overlap and scores the same.
    let longest = active.iter().map(|a| a.observed.len()).max().unwrap_or(0);
    let max_samples = config.max_shift_samples(dt, longest.saturating_sub(1));

    let mut shifts_by_component = [0isize; 3];
    let mut shifts = Vec::new();
    for group in &config.time_shift_groups {
        let pairs: Vec<ShiftPair<'_>> = active
            .iter()
            .filter(|a| group.contains(&a.component))
            .map(|a| ShiftPair {
                weight: a.weight,
                observed: a.observed,
                synthetic: a.synthetic,
            })
            .collect();
        if pairs.is_empty() {
            continue;
        }
        let k = best_shift(&pairs, max_samples, config.strategy);
        for c in group {
            shifts_by_component[*c as usize] = k;
        }
        shifts.push(GroupShift {
            components: group.clone(),
            shift: k as f64 * dt,
        });
    }

    let misfit = active
        .iter()
        .map(|a| {
            let k = shifts_by_component[a.component as usize];
            a.weight * dt * residual_sq(a.observed, a.synthetic, k)
        })
        .sum();

    Ok(Some(StationMisfit {
        station: stream.id.clone(),
        misfit,
        shifts,
    }))
}
