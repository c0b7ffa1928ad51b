//! Order-2 real spherical harmonics.
//!
//! Coefficients are ordered by band: `l = 0` first, then `l = 1` (`m = -1, 0,
//! 1`), then `l = 2` (`m = -2 ..= 2`). Directions use the engine's Y-up
//! frame, so the zonal harmonics are aligned with `+Y`.

use glam::{DVec3, Vec3};

/// Number of coefficients of an order-2 expansion.
pub const SH_COEFFS_COUNT: usize = 9;

/// Scalar order-2 expansion (e.g. occlusion).
pub type Sh = [f64; SH_COEFFS_COUNT];

/// Colored order-2 expansion, one RGB triple per coefficient.
pub type ShRgb = [DVec3; SH_COEFFS_COUNT];

const F0: f64 = 0.28209479177; // 1 / (2 sqrt(pi))
const F1: f64 = 0.4886025119; // sqrt(3 / (4 pi))
const F2: f64 = 1.0925484306; // sqrt(15 / (4 pi))
const F3: f64 = 0.3153915653; // sqrt(5 / (16 pi))

/// Evaluates all nine basis functions for given (normalized) direction.
pub fn sh_basis(dir: Vec3) -> Sh {
    let DVec3 { x, y, z } = dir.as_dvec3();

    [
        F0,
        -F1 * x,
        F1 * y,
        -F1 * z,
        F2 * x * z,
        -F2 * x * y,
        F3 * (3.0 * y * y - 1.0),
        -F2 * z * y,
        F2 * 0.5 * (z * z - x * x),
    ]
}

/// Adds `weight * basis` into `target`.
pub fn sh_accumulate(target: &mut Sh, basis: &Sh, weight: f64) {
    for (target, basis) in target.iter_mut().zip(basis) {
        *target += basis * weight;
    }
}

/// Adds `color * basis` into `target`.
pub fn sh_accumulate_rgb(target: &mut ShRgb, basis: &Sh, color: DVec3) {
    for (target, basis) in target.iter_mut().zip(basis) {
        *target += color * *basis;
    }
}

#[cfg(test)]
mod tests {
    use std::f64::consts::PI;

    use approx::assert_abs_diff_eq;
    use glam::vec3;

    use super::*;

    fn eval(coeffs: &Sh, dir: Vec3) -> f64 {
        sh_basis(dir)
            .iter()
            .zip(coeffs)
            .map(|(basis, coeff)| basis * coeff)
            .sum()
    }

    /// Integrates `f` over the unit sphere with a midpoint rule in
    /// (theta, phi).
    fn integrate(f: impl Fn(Vec3) -> f64) -> f64 {
        const THETA_STEPS: usize = 256;
        const PHI_STEPS: usize = 512;

        let d_theta = PI / THETA_STEPS as f64;
        let d_phi = 2.0 * PI / PHI_STEPS as f64;
        let mut sum = 0.0;

        for i in 0..THETA_STEPS {
            let theta = (i as f64 + 0.5) * d_theta;

            for j in 0..PHI_STEPS {
                let phi = (j as f64 + 0.5) * d_phi;

                let dir = vec3(
                    (theta.sin() * phi.cos()) as f32,
                    theta.cos() as f32,
                    (theta.sin() * phi.sin()) as f32,
                );

                sum += f(dir) * theta.sin() * d_theta * d_phi;
            }
        }

        sum
    }

    #[test]
    fn basis_is_orthonormal() {
        for i in 0..SH_COEFFS_COUNT {
            for j in i..SH_COEFFS_COUNT {
                let dot = integrate(|dir| {
                    let basis = sh_basis(dir);

                    basis[i] * basis[j]
                });

                let expected = if i == j { 1.0 } else { 0.0 };

                assert_abs_diff_eq!(expected, dot, epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn constant_function() {
        let mut coeffs = Sh::default();

        for (i, coeff) in coeffs.iter_mut().enumerate() {
            *coeff = integrate(|dir| sh_basis(dir)[i]);
        }

        assert_abs_diff_eq!(coeffs[0], 4.0 * PI * F0, epsilon = 1e-3);

        for dir in [Vec3::X, Vec3::Y, -Vec3::Z, vec3(0.6, 0.0, 0.8)] {
            assert_abs_diff_eq!(eval(&coeffs, dir), 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn accumulate_rgb() {
        let mut coeffs = ShRgb::default();
        let basis = sh_basis(Vec3::Y);

        sh_accumulate_rgb(&mut coeffs, &basis, DVec3::new(1.0, 2.0, 3.0));
        sh_accumulate_rgb(&mut coeffs, &basis, DVec3::new(1.0, 2.0, 3.0));

        for (coeff, basis) in coeffs.iter().zip(basis) {
            assert_abs_diff_eq!(coeff.x, 2.0 * basis, epsilon = 1e-12);
            assert_abs_diff_eq!(coeff.z, 6.0 * basis, epsilon = 1e-12);
        }
    }
}
