//! Tape & Tape (2015) uniform moment-tensor parameterization.
//!
//! Parameters and domains:
//!
//! | name    | domain              | meaning                              |
//! |---------|---------------------|--------------------------------------|
//! | `rho`   | `(0, ∞)`            | `‖M‖ = √2 M0`                        |
//! | `v`     | `[-1/3, 1/3]`       | lune longitude, `γ = asin(3v) / 3`   |
//! | `w`     | `[-3π/8, 3π/8]`     | lune colatitude via `u = 3π/8 - w`   |
//! | `kappa` | `[0, 360)` degrees  | strike                               |
//! | `sigma` | `[-90, 90]` degrees | slip (rake)                          |
//! | `h`     | `[0, 1]`            | cosine of dip                        |
//!
//! The tensor is built as `M = ρ (λ1 t tᵀ + λ2 b bᵀ + λ3 p pᵀ)` where the unit
//! eigenvalue triple comes from the lune point `(γ, β)` and the `t`/`b`/`p`
//! axes from the fault geometry. `v = w = 0` gives the double couple.

use std::f64::consts::{FRAC_1_SQRT_2, PI};

use nalgebra::{Matrix3, Vector3};

use crate::error::{Result, SearchError};
use crate::grid::Coordinates;
use crate::tensor::{Bounds, MomentTensor, ParameterTransform};

pub const V_MAX: f64 = 1.0 / 3.0;
pub const W_MAX: f64 = 3.0 * PI / 8.0;

const AXES: [&str; 6] = ["rho", "v", "w", "kappa", "sigma", "h"];

/// The Tape2015 → `Mij` transform.
#[derive(Debug, Clone, Copy, Default)]
pub struct Tape2015;

impl Tape2015 {
    /// Convert one coordinate tuple. Angles are in degrees.
    pub fn to_tensor(rho: f64, v: f64, w: f64, kappa: f64, sigma: f64, h: f64) -> MomentTensor {
        let gamma = (3.0 * v).clamp(-1.0, 1.0).asin() / 3.0;
        let beta = beta_from_w(w);
        let [l1, l2, l3] = lune_eigenvalues(gamma, beta);

        let (t, b, p) = fault_axes(kappa.to_radians(), h.clamp(0.0, 1.0).acos(), sigma.to_radians());
        let ned: Matrix3<f64> = (t * t.transpose() * l1 + b * b.transpose() * l2 + p * p.transpose() * l3) * rho;

        ned_to_use(&ned)
    }
}

impl ParameterTransform for Tape2015 {
    fn name(&self) -> &'static str {
        "tape2015"
    }

    fn required_axes(&self) -> &'static [&'static str] {
        &AXES
    }

    fn domain(&self, axis: &str) -> Option<Bounds> {
        match axis {
            "rho" => Some(Bounds {
                lo: f64::MIN_POSITIVE,
                hi: f64::MAX,
                hi_open: false,
            }),
            "v" => Some(Bounds::closed(-V_MAX, V_MAX)),
            "w" => Some(Bounds::closed(-W_MAX, W_MAX)),
            "kappa" => Some(Bounds::half_open(0.0, 360.0)),
            "sigma" => Some(Bounds::closed(-90.0, 90.0)),
            "h" => Some(Bounds::closed(0.0, 1.0)),
            _ => None,
        }
    }

    fn apply(&self, coords: &Coordinates) -> Result<MomentTensor> {
        let get = |name: &str| {
            coords
                .get(name)
                .ok_or_else(|| SearchError::domain(name, "axis missing from grid point"))
        };
        Ok(Tape2015::to_tensor(
            get("rho")?,
            get("v")?,
            get("w")?,
            get("kappa")?,
            get("sigma")?,
            get("h")?,
        ))
    }
}

/// Invert `u(β) = 3β/4 - sin(2β)/2 + sin(4β)/16` for `u = 3π/8 - w`.
///
/// `u` is monotone on `[0, π]` (`du/dβ = 2 sin⁴β`) and `u(π - β) = 3π/4 - u(β)`,
/// so only `[0, π/2]` is bisected and the upper half is mirrored.
pub fn beta_from_w(w: f64) -> f64 {
    let u = (W_MAX - w).clamp(0.0, 0.75 * PI);
    if u > 0.375 * PI {
        return PI - lower_beta(0.75 * PI - u);
    }
    lower_beta(u)
}

/// Solve `u(β) = u` for `u ∈ [0, 3π/8]`, `β ∈ [0, π/2]`.
fn lower_beta(u: f64) -> f64 {
    if u <= 0.0 {
        return 0.0;
    }
    let (mut lo, mut hi) = (0.0, 0.5 * PI);
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if mid <= lo || mid >= hi {
            break;
        }
        if lune_u(mid) < u {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    0.5 * (lo + hi)
}

/// `u(β)`. The closed form cancels to `~0.4 β⁵` near the pole, so small
/// angles use the Taylor series instead.
fn lune_u(beta: f64) -> f64 {
    if beta >= 0.1 {
        return 0.75 * beta - 0.5 * (2.0 * beta).sin() + (4.0 * beta).sin() / 16.0;
    }
    // Coefficient of β^(2n+1) is (-1)^n (4^(2n+1)/16 - 2^(2n+1)/2) / (2n+1)!.
    let b2 = beta * beta;
    let mut power = beta * b2 * b2;
    let (mut two, mut four) = (32.0, 1024.0);
    let mut factorial = 120.0;
    let mut sign = 1.0;
    let mut sum = 0.0;
    for n in 2..10 {
        sum += sign * (four / 16.0 - two / 2.0) / factorial * power;
        let k = (2 * n + 2) as f64;
        factorial *= k * (k + 1.0);
        two *= 4.0;
        four *= 16.0;
        power *= b2;
        sign = -sign;
    }
    sum
}

/// Unit eigenvalue triple `λ1 ≥ λ2 ≥ λ3` for lune longitude `γ` and colatitude `β`.
fn lune_eigenvalues(gamma: f64, beta: f64) -> [f64; 3] {
    let x = gamma.cos() * beta.sin();
    let y = gamma.sin() * beta.sin();
    let z = beta.cos();
    let (r2, r3, r6) = (2f64.sqrt(), 3f64.sqrt(), 6f64.sqrt());
    [
        (r3 * x - y + r2 * z) / r6,
        (2.0 * y + r2 * z) / r6,
        (-r3 * x - y + r2 * z) / r6,
    ]
}

/// Tension, null and pressure axes (north-east-down) for strike `phi`,
/// dip `delta` and rake `lambda`, all in radians.
fn fault_axes(phi: f64, delta: f64, lambda: f64) -> (Vector3<f64>, Vector3<f64>, Vector3<f64>) {
    let normal = Vector3::new(-delta.sin() * phi.sin(), delta.sin() * phi.cos(), -delta.cos());
    let slip = Vector3::new(
        lambda.cos() * phi.cos() + delta.cos() * lambda.sin() * phi.sin(),
        lambda.cos() * phi.sin() - delta.cos() * lambda.sin() * phi.cos(),
        -lambda.sin() * delta.sin(),
    );
    let t = (normal + slip) * FRAC_1_SQRT_2;
    let p = (normal - slip) * FRAC_1_SQRT_2;
    let b = normal.cross(&slip);
    (t, b, p)
}

/// North-east-down → up-south-east.
fn ned_to_use(m: &Matrix3<f64>) -> MomentTensor {
    MomentTensor::new([
        m[(2, 2)],
        m[(0, 0)],
        m[(1, 1)],
        m[(0, 2)],
        -m[(1, 2)],
        -m[(0, 1)],
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::f64::consts::FRAC_PI_2;

    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn beta_from_w_hits_known_points() {
        assert!((beta_from_w(0.0) - FRAC_PI_2).abs() < 1e-12);
        assert!(beta_from_w(W_MAX).abs() < 1e-12);
        assert!((beta_from_w(-W_MAX) - PI).abs() < 1e-12);
    }

    #[test]
    fn beta_from_w_is_accurate_near_the_poles() {
        for du in [1e-15, 1e-9, 1e-5, 1e-2] {
            let w = W_MAX - du;
            let u = W_MAX - w;
            let beta = beta_from_w(w);
            assert!(beta > 0.0);
            assert!((lune_u(beta) - u).abs() <= 1e-10 * u, "u = {u}, beta = {beta}");
        }
        for du in [1e-5, 1e-2] {
            let w = W_MAX - du;
            assert!((PI - beta_from_w(-w) - beta_from_w(w)).abs() < 1e-9, "du = {du}");
        }
    }

    #[test]
    fn lower_w_bound_is_negative_isotropic() {
        let mt = Tape2015::to_tensor(3f64.sqrt(), -0.2, -W_MAX, 300.0, -60.0, 0.9);
        let expected = MomentTensor::new([-1.0, -1.0, -1.0, 0.0, 0.0, 0.0]);
        assert!(mt.max_abs_diff(&expected) < 1e-12, "{mt}");
    }

    #[test]
    fn vertical_strike_slip_is_pure_mtp() {
        let rho = 2f64.sqrt();
        let mt = Tape2015::to_tensor(rho, 0.0, 0.0, 0.0, 0.0, 0.0);
        let expected = MomentTensor::new([0.0, 0.0, 0.0, 0.0, 0.0, -1.0]);
        assert!(mt.max_abs_diff(&expected) < 1e-12, "{mt}");
    }

    #[test]
    fn double_couple_has_zero_trace_and_determinant() {
        let mt = Tape2015::to_tensor(10.0, 0.0, 0.0, 123.0, -37.0, 0.3);
        assert!(mt.trace().abs() < 1e-10);
        assert!(mt.to_matrix().determinant().abs() < 1e-8);
        assert!((mt.norm() - 10.0).abs() < 1e-10);
    }

    #[test]
    fn upper_w_bound_is_isotropic() {
        let mt = Tape2015::to_tensor(3f64.sqrt(), 0.0, W_MAX, 40.0, 10.0, 0.5);
        let expected = MomentTensor::new([1.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        assert!(mt.max_abs_diff(&expected) < 1e-9, "{mt}");
    }

    #[test]
    fn norm_equals_rho_across_the_domain() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let rho = rng.gen_range(0.5..5.0);
            let mt = Tape2015::to_tensor(
                rho,
                rng.gen_range(-V_MAX..=V_MAX),
                rng.gen_range(-W_MAX..=W_MAX),
                rng.gen_range(0.0..360.0),
                rng.gen_range(-90.0..=90.0),
                rng.gen_range(0.0..=1.0),
            );
            assert!((mt.norm() - rho).abs() < 1e-9 * rho);
        }
    }

    #[test]
    fn distinct_interior_tuples_give_distinct_tensors() {
        let mut rng = StdRng::seed_from_u64(11);
        let tuples: Vec<[f64; 5]> = (0..150)
            .map(|_| {
                [
                    rng.gen_range(-0.3..0.3),
                    rng.gen_range(-1.1..1.1),
                    rng.gen_range(1.0..359.0),
                    rng.gen_range(-89.0..89.0),
                    rng.gen_range(0.01..0.99),
                ]
            })
            .collect();
        let tensors: Vec<MomentTensor> = tuples
            .iter()
            .map(|t| Tape2015::to_tensor(1.0, t[0], t[1], t[2], t[3], t[4]))
            .collect();

        for i in 0..tensors.len() {
            for j in (i + 1)..tensors.len() {
                assert!(
                    tensors[i].max_abs_diff(&tensors[j]) > 1e-6,
                    "tuples {:?} and {:?} collide",
                    tuples[i],
                    tuples[j]
                );
            }
        }
    }

    #[test]
    fn double_couple_lattice_is_injective() {
        // Open-interval samples avoid the degenerate edges (h = 0, h = 1, |σ| = 90).
        let mut tensors = Vec::new();
        for i in 0..12 {
            for j in 0..6 {
                for k in 0..5 {
                    let kappa = (i as f64 + 0.5) * 30.0;
                    let sigma = -90.0 + (j as f64 + 0.5) * 30.0;
                    let h = (k as f64 + 0.5) / 5.0;
                    tensors.push(Tape2015::to_tensor(1.0, 0.0, 0.0, kappa, sigma, h));
                }
            }
        }
        for i in 0..tensors.len() {
            for j in (i + 1)..tensors.len() {
                assert!(tensors[i].max_abs_diff(&tensors[j]) > 1e-6);
            }
        }
    }

    #[test]
    fn apply_reports_missing_axes() {
        let coords = Coordinates::new(vec!["rho".to_string(), "v".to_string()].into(), vec![1.0, 0.0]);
        let err = Tape2015.apply(&coords).unwrap_err();
        assert!(matches!(err, SearchError::InvalidParameterDomain { ref axis, .. } if axis == "w"));
    }
}
