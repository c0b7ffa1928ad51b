mod f32_ext;
mod vec3_ext;

use core::ops;

pub use self::f32_ext::*;
pub use self::vec3_ext::*;

pub fn lerp<T>(a: T, b: T, t: f32) -> T
where
    T: ops::Add<Output = T>,
    T: ops::Sub<Output = T>,
    T: ops::Mul<f32, Output = T>,
    T: Copy,
{
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Returns whether two values are equal up to a relative tolerance of `1e-6`,
/// treating values that are tiny in absolute terms as equal.
///
/// Used for dirty-tracking parameters that come from user interfaces, where
/// values tend to jitter in the last bits without actually changing.
pub fn almost_eq(a: f32, b: f32) -> bool {
    const EPSILON: f32 = 1e-6;

    let diff = (a - b).abs();

    diff <= EPSILON || diff <= EPSILON * a.abs().max(b.abs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lerp_is_clamped() {
        assert_eq!(1.0, lerp(1.0, 3.0, -1.0));
        assert_eq!(2.0, lerp(1.0, 3.0, 0.5));
        assert_eq!(3.0, lerp(1.0, 3.0, 7.0));
    }

    #[test]
    fn almost_eq_ignores_jitter() {
        assert!(almost_eq(1.0, 1.0 + 1e-7));
        assert!(almost_eq(1e6, 1e6 + 0.5));
        assert!(almost_eq(0.0, 1e-8));
        assert!(!almost_eq(1.0, 1.001));
    }
}
