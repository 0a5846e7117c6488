//! Precomputed linear Green's tensors.
//!
//! For each station and component we hold six elementary waveforms, one per
//! moment-tensor component; synthetics are their linear combination
//! `u(t) = Σ_k M_k G_k(t)`. How the elementary waveforms were computed is
//! outside this crate.

use std::collections::BTreeMap;

use crate::error::{Result, SearchError};
use crate::tensor::MomentTensor;
use crate::waveform::{Component, Dataset, GreensFunction, Stream, Trace};

/// Elementary responses of one station component.
#[derive(Debug, Clone, PartialEq)]
pub struct GreensTensor {
    pub component: Component,
    pub dt: f64,
    /// One waveform per tensor component, in `MomentTensor` order.
    pub elementary: [Vec<f64>; 6],
}

impl GreensTensor {
    pub fn new(component: Component, dt: f64, elementary: [Vec<f64>; 6]) -> Result<Self> {
        if !(dt.is_finite() && dt > 0.0) {
            return Err(SearchError::InvalidConfig(format!(
                "Green's tensor sample interval must be > 0 (got {dt})"
            )));
        }
        let n = elementary[0].len();
        if let Some(bad) = elementary.iter().find(|e| e.len() != n) {
            return Err(SearchError::ShapeMismatch {
                what: format!("elementary {component} waveform"),
                expected: n,
                got: bad.len(),
            });
        }
        Ok(Self {
            component,
            dt,
            elementary,
        })
    }

    pub fn len(&self) -> usize {
        self.elementary[0].len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn synthesize(&self, mt: &MomentTensor) -> Vec<f64> {
        let mut out = vec![0.0; self.len()];
        for (m, g) in mt.components().iter().zip(self.elementary.iter()) {
            for (o, x) in out.iter_mut().zip(g.iter()) {
                *o += m * x;
            }
        }
        out
    }
}

/// Green's tensors for every station of one data category.
#[derive(Debug, Clone, Default)]
pub struct GreensTensorSet {
    stations: BTreeMap<String, Vec<GreensTensor>>,
}

impl GreensTensorSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the tensors of one station.
    pub fn insert(&mut self, id: impl Into<String>, tensors: Vec<GreensTensor>) {
        self.stations.insert(id.into(), tensors);
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn station(&self, id: &str) -> Option<&[GreensTensor]> {
        self.stations.get(id).map(Vec::as_slice)
    }
}

impl GreensFunction for GreensTensorSet {
    fn get_synthetics(&self, mt: &MomentTensor) -> Result<Dataset> {
        if mt.components().iter().any(|v| !v.is_finite()) {
            return Err(SearchError::synthesis("*", format!("non-finite moment tensor {mt}")));
        }
        self.stations
            .iter()
            .map(|(id, tensors)| {
                let traces = tensors
                    .iter()
                    .map(|g| Trace::new(g.component, g.dt, g.synthesize(mt)))
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| SearchError::synthesis(id.as_str(), e.to_string()))?;
                Ok(Stream::new(id.clone(), traces))
            })
            .collect::<Result<Dataset>>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_tensor(component: Component) -> GreensTensor {
        let mut elementary: [Vec<f64>; 6] = Default::default();
        for (k, e) in elementary.iter_mut().enumerate() {
            *e = vec![k as f64 + 1.0, 0.0, -(k as f64)];
        }
        GreensTensor::new(component, 0.5, elementary).unwrap()
    }

    #[test]
    fn synthetics_are_linear_in_the_tensor() {
        let mut set = GreensTensorSet::new();
        set.insert("AK.BIGB.", vec![unit_tensor(Component::Z)]);

        let mt = MomentTensor::new([1.0, 0.0, 0.0, 0.0, 0.0, 2.0]);
        let syn = set.get_synthetics(&mt).unwrap();
        let trace = &syn.get("AK.BIGB.").unwrap().traces[0];
        // 1*[1,0,0] + 2*[6,0,-5]
        assert_eq!(trace.samples, vec![13.0, 0.0, -10.0]);
        assert_eq!(trace.dt, 0.5);
    }

    #[test]
    fn ragged_elementary_waveforms_are_rejected() {
        let mut elementary: [Vec<f64>; 6] = Default::default();
        elementary[3] = vec![1.0];
        assert!(matches!(
            GreensTensor::new(Component::R, 1.0, elementary),
            Err(SearchError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn non_finite_tensor_is_a_synthesis_failure() {
        let mut set = GreensTensorSet::new();
        set.insert("AK.BIGB.", vec![unit_tensor(Component::Z)]);
        let mt = MomentTensor::new([f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0]);
        assert!(matches!(
            set.get_synthetics(&mt),
            Err(SearchError::SynthesisFailure { .. })
        ));
    }
}
