//! Moment tensors and the transforms that produce them from grid coordinates.
//!
//! All tensors use the up-south-east (`r`, `θ`, `φ`) basis and are stored as
//! the six independent components in the order:
//!
//! ```text
//! [Mrr, Mtt, Mpp, Mrt, Mrp, Mtp]
//! ```

pub mod tape2015;

use std::fmt;

use nalgebra::Matrix3;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::grid::Coordinates;

pub use tape2015::Tape2015;

/// Symmetric moment tensor in the up-south-east basis (N·m).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MomentTensor([f64; 6]);

impl MomentTensor {
    pub const COMPONENTS: [&'static str; 6] = ["Mrr", "Mtt", "Mpp", "Mrt", "Mrp", "Mtp"];

    pub fn new(components: [f64; 6]) -> Self {
        Self(components)
    }

    pub fn components(&self) -> &[f64; 6] {
        &self.0
    }

    /// Build from a full 3x3 matrix (upper triangle is read).
    pub fn from_matrix(m: &Matrix3<f64>) -> Self {
        Self([m[(0, 0)], m[(1, 1)], m[(2, 2)], m[(0, 1)], m[(0, 2)], m[(1, 2)]])
    }

    pub fn to_matrix(&self) -> Matrix3<f64> {
        let [rr, tt, pp, rt, rp, tp] = self.0;
        Matrix3::new(rr, rt, rp, rt, tt, tp, rp, tp, pp)
    }

    /// Frobenius norm `‖M‖`, equal to `ρ` in the Tape & Tape parameterization.
    pub fn norm(&self) -> f64 {
        self.to_matrix().norm()
    }

    /// Scalar seismic moment `M0 = ‖M‖ / √2`.
    pub fn scalar_moment(&self) -> f64 {
        self.norm() / std::f64::consts::SQRT_2
    }

    pub fn trace(&self) -> f64 {
        self.0[0] + self.0[1] + self.0[2]
    }

    /// Largest absolute component-wise difference.
    pub fn max_abs_diff(&self, other: &MomentTensor) -> f64 {
        self.0
            .iter()
            .zip(other.0.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }
}

impl fmt::Display for MomentTensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = Self::COMPONENTS
            .iter()
            .zip(self.0.iter())
            .map(|(name, v)| format!("{name}={v:.4e}"))
            .collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Valid range of one transform parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub lo: f64,
    pub hi: f64,
    /// `true` when `hi` itself is excluded (periodic axes such as strike).
    pub hi_open: bool,
}

impl Bounds {
    pub const fn closed(lo: f64, hi: f64) -> Self {
        Self { lo, hi, hi_open: false }
    }

    pub const fn half_open(lo: f64, hi: f64) -> Self {
        Self { lo, hi, hi_open: true }
    }

    pub fn contains(&self, value: f64) -> bool {
        if !value.is_finite() || value < self.lo {
            return false;
        }
        if self.hi_open { value < self.hi } else { value <= self.hi }
    }
}

impl fmt::Display for Bounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let close = if self.hi_open { ")" } else { "]" };
        write!(f, "[{}, {}{close}", self.lo, self.hi)
    }
}

/// Converts raw grid coordinates into a moment tensor.
///
/// Grids hold one of these and apply it on read, so every point handed out by
/// a grid already carries its tensor. Implementations must be pure.
pub trait ParameterTransform: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Axes that must be present on any grid using this transform.
    fn required_axes(&self) -> &'static [&'static str];

    /// Domain of a parameter, `None` for axes the transform ignores.
    fn domain(&self, axis: &str) -> Option<Bounds>;

    fn apply(&self, coords: &Coordinates) -> Result<MomentTensor>;
}

/// Scalar moment (N·m) from moment magnitude, `M0 = 10^(1.5 Mw + 9.1)`.
pub fn scalar_moment_from_mw(mw: f64) -> f64 {
    10f64.powf(1.5 * mw + 9.1)
}

/// `ρ = √2 M0` for a given moment magnitude.
pub fn rho_from_mw(mw: f64) -> f64 {
    scalar_moment_from_mw(mw) * std::f64::consts::SQRT_2
}

/// Moment magnitude from scalar moment (inverse of `scalar_moment_from_mw`).
pub fn mw_from_scalar_moment(m0: f64) -> f64 {
    (m0.log10() - 9.1) / 1.5
}
