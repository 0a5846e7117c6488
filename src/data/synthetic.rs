//! Synthetic Green's functions and observed data for self-tests.
//!
//! Each elementary waveform is a sum of two Gaussian pulses with random
//! centre, width and amplitude, so the six elementary waveforms of a
//! component are linearly independent and distinct tensors give distinct
//! synthetics.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::error::{Result, SearchError};
use crate::tensor::MomentTensor;
use crate::waveform::{Component, Dataset, GreensFunction, GreensTensor, GreensTensorSet, Stream, Trace};

/// Sampling and components of one synthetic data category.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveLayout {
    pub dt: f64,
    pub samples: usize,
    pub components: &'static [Component],
}

impl WaveLayout {
    /// Short, finely sampled Z/R windows.
    pub const BODY_WAVES: Self = Self {
        dt: 0.1,
        samples: 128,
        components: &[Component::Z, Component::R],
    };

    /// Long three-component windows.
    pub const SURFACE_WAVES: Self = Self {
        dt: 0.5,
        samples: 256,
        components: &[Component::Z, Component::R, Component::T],
    };
}

/// `NET.STA.LOC` identifier of synthetic station `i`.
pub fn station_id(i: usize) -> String {
    format!("MT.S{i:02}.")
}

fn gaussian_pair<R: Rng + ?Sized>(samples: usize, rng: &mut R) -> Vec<f64> {
    let n = samples as f64;
    let pulses: [(f64, f64, f64); 2] = std::array::from_fn(|_| {
        let centre = rng.gen_range(0.2 * n..0.6 * n);
        let width = rng.gen_range(0.01 * n..0.05 * n);
        let amplitude = rng.gen_range(-1.0..1.0);
        (centre, width, amplitude)
    });
    (0..samples)
        .map(|i| {
            pulses
                .iter()
                .map(|(c, w, a)| {
                    let x = (i as f64 - c) / w;
                    a * (-x * x).exp()
                })
                .sum()
        })
        .collect()
}

/// Random linear Green's tensors for `stations` stations.
pub fn synthetic_greens(stations: usize, layout: WaveLayout, rng: &mut StdRng) -> Result<GreensTensorSet> {
    let mut set = GreensTensorSet::new();
    for i in 0..stations {
        let tensors = layout
            .components
            .iter()
            .map(|&component| {
                let elementary = std::array::from_fn(|_| gaussian_pair(layout.samples, rng));
                GreensTensor::new(component, layout.dt, elementary)
            })
            .collect::<Result<Vec<_>>>()?;
        set.insert(station_id(i), tensors);
    }
    Ok(set)
}

/// Observed data for `truth`, with optional Gaussian noise.
///
/// `noise` is the standard deviation relative to each trace's peak
/// amplitude; `0.0` returns the synthetics unchanged.
pub fn observe(greens: &dyn GreensFunction, truth: &MomentTensor, noise: f64, rng: &mut StdRng) -> Result<Dataset> {
    if !(noise.is_finite() && noise >= 0.0) {
        return Err(SearchError::InvalidConfig(format!(
            "noise level must be finite and >= 0 (got {noise})"
        )));
    }
    let clean = greens.get_synthetics(truth)?;
    if noise == 0.0 {
        return Ok(clean);
    }
    let normal = Normal::new(0.0, noise)
        .map_err(|e| SearchError::InvalidConfig(format!("noise distribution error: {e}")))?;

    clean.map(|stream| {
        let traces = stream
            .traces
            .iter()
            .map(|t| {
                let peak = t.samples.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
                let samples = t
                    .samples
                    .iter()
                    .map(|v| v + peak * normal.sample(rng))
                    .collect();
                Trace::new(t.component, t.dt, samples)
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Stream::new(stream.id.clone(), traces))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tensor() -> MomentTensor {
        MomentTensor::new([1.0, -0.5, -0.5, 0.2, 0.0, 0.3])
    }

    #[test]
    fn layout_and_ids() {
        let mut rng = StdRng::seed_from_u64(7);
        let set = synthetic_greens(3, WaveLayout::BODY_WAVES, &mut rng).unwrap();
        assert_eq!(set.len(), 3);
        let station = set.station(&station_id(2)).unwrap();
        assert_eq!(station.len(), 2);
        assert_eq!(station[0].len(), 128);
        assert_eq!(station_id(2), "MT.S02.");
    }

    #[test]
    fn seeded_generation_is_reproducible() {
        let a = synthetic_greens(2, WaveLayout::SURFACE_WAVES, &mut StdRng::seed_from_u64(3)).unwrap();
        let b = synthetic_greens(2, WaveLayout::SURFACE_WAVES, &mut StdRng::seed_from_u64(3)).unwrap();
        assert_eq!(a.station("MT.S01."), b.station("MT.S01."));
    }

    #[test]
    fn zero_noise_matches_synthetics_exactly() {
        let mut rng = StdRng::seed_from_u64(11);
        let set = synthetic_greens(2, WaveLayout::SURFACE_WAVES, &mut rng).unwrap();
        let observed = observe(&set, &tensor(), 0.0, &mut rng).unwrap();
        assert_eq!(observed, set.get_synthetics(&tensor()).unwrap());

        let noisy = observe(&set, &tensor(), 0.1, &mut rng).unwrap();
        assert_ne!(noisy, observed);
        assert_eq!(noisy.len(), observed.len());
    }

    #[test]
    fn negative_noise_is_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        let set = synthetic_greens(1, WaveLayout::BODY_WAVES, &mut rng).unwrap();
        for noise in [-1.0, f64::NAN, f64::INFINITY] {
            assert!(
                matches!(observe(&set, &tensor(), noise, &mut rng), Err(SearchError::InvalidConfig(_))),
                "noise = {noise}"
            );
        }
    }
}
