//! Axis sampling.
//!
//! Every axis is materialised at construction. Random axes are drawn once, so
//! re-iterating a grid never changes its samples.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};

/// How an axis was sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sampling {
    /// Evenly spaced, both endpoints included.
    Closed,
    /// Evenly spaced cell centres, neither endpoint included (periodic axes).
    Open,
    /// Independent uniform draws from `[lo, hi)`.
    Random,
    /// A single value held constant.
    Fixed,
}

/// One named dimension of a structured grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    name: String,
    sampling: Sampling,
    lo: f64,
    hi: f64,
    values: Vec<f64>,
}

impl Axis {
    pub fn closed(name: impl Into<String>, lo: f64, hi: f64, n: usize) -> Result<Self> {
        let name = name.into();
        validate_interval(&name, lo, hi, n)?;
        Ok(Self {
            values: closed_interval(lo, hi, n),
            name,
            sampling: Sampling::Closed,
            lo,
            hi,
        })
    }

    pub fn open(name: impl Into<String>, lo: f64, hi: f64, n: usize) -> Result<Self> {
        let name = name.into();
        validate_interval(&name, lo, hi, n)?;
        Ok(Self {
            values: open_interval(lo, hi, n),
            name,
            sampling: Sampling::Open,
            lo,
            hi,
        })
    }

    pub fn random<R: Rng + ?Sized>(
        name: impl Into<String>,
        lo: f64,
        hi: f64,
        n: usize,
        rng: &mut R,
    ) -> Result<Self> {
        let name = name.into();
        validate_interval(&name, lo, hi, n)?;
        Ok(Self {
            values: random_values(lo, hi, n, rng),
            name,
            sampling: Sampling::Random,
            lo,
            hi,
        })
    }

    pub fn fixed(name: impl Into<String>, value: f64) -> Result<Self> {
        let name = name.into();
        validate_interval(&name, value, value, 1)?;
        Ok(Self {
            name,
            sampling: Sampling::Fixed,
            lo: value,
            hi: value,
            values: vec![value],
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn sampling(&self) -> Sampling {
        self.sampling
    }

    /// Declared interval `(lo, hi)`.
    pub fn interval(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// `n` evenly spaced points from `lo` to `hi` inclusive (`n == 1` yields `lo`).
pub fn closed_interval(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    if n <= 1 {
        return vec![lo; n];
    }
    let step = (hi - lo) / (n as f64 - 1.0);
    let mut out: Vec<f64> = (0..n).map(|i| lo + step * i as f64).collect();
    // Pin the endpoint so it never lands an ulp outside the interval.
    out[n - 1] = hi;
    out
}

/// `n` cell centres of `[lo, hi]`, excluding both endpoints.
pub fn open_interval(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let step = (hi - lo) / n as f64;
    (0..n).map(|i| lo + step * (i as f64 + 0.5)).collect()
}

/// `n` uniform draws from `[lo, hi)` (all equal to `lo` when `lo == hi`).
pub fn random_values<R: Rng + ?Sized>(lo: f64, hi: f64, n: usize, rng: &mut R) -> Vec<f64> {
    if hi <= lo {
        return vec![lo; n];
    }
    (0..n).map(|_| rng.gen_range(lo..hi)).collect()
}

fn validate_interval(name: &str, lo: f64, hi: f64, n: usize) -> Result<()> {
    if n == 0 {
        return Err(SearchError::domain(name, "axis must have at least one point"));
    }
    if !(lo.is_finite() && hi.is_finite()) || hi < lo {
        return Err(SearchError::domain(
            name,
            format!("invalid interval [{lo}, {hi}] (must be finite with lo <= hi)"),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn closed_interval_includes_endpoints() {
        let v = closed_interval(-90.0, 90.0, 5);
        assert_eq!(v, vec![-90.0, -45.0, 0.0, 45.0, 90.0]);
    }

    #[test]
    fn open_interval_skips_periodic_duplicate() {
        let v = open_interval(0.0, 360.0, 24);
        assert_eq!(v.len(), 24);
        assert!((v[0] - 7.5).abs() < 1e-12);
        assert!((v[23] - 352.5).abs() < 1e-12);
        assert!(v.iter().all(|&k| k > 0.0 && k < 360.0));
    }

    #[test]
    fn random_axis_is_frozen_and_bounded() {
        let mut rng = StdRng::seed_from_u64(3);
        let axis = Axis::random("kappa", 0.0, 360.0, 100, &mut rng).unwrap();
        let first = axis.values().to_vec();
        assert_eq!(axis.values(), first.as_slice());
        assert!(first.iter().all(|&k| (0.0..360.0).contains(&k)));
    }

    #[test]
    fn rejects_empty_and_inverted_axes() {
        assert!(matches!(
            Axis::closed("h", 0.0, 1.0, 0),
            Err(SearchError::InvalidParameterDomain { .. })
        ));
        assert!(Axis::closed("h", 1.0, 0.0, 3).is_err());
        assert!(Axis::fixed("v", f64::NAN).is_err());
    }
}
