use glam::{vec3, Vec3};

use crate::F32Ext;

pub trait Vec3Ext
where
    Self: Sized,
{
    /// Converts this color-vector from RGB into HSL.
    ///
    /// Hue is returned in sextants, i.e. within `<0.0, 6.0)`, so that a full
    /// turn around the color wheel is `6.0`; saturation and lightness are
    /// within `<0.0, 1.0>`.
    fn to_hsl(self) -> Self;
}

impl Vec3Ext for Vec3 {
    fn to_hsl(self) -> Self {
        let max = self.max_element();
        let min = self.min_element();
        let delta = max - min;
        let lightness = 0.5 * (max + min);

        if delta <= 0.0 {
            return vec3(0.0, 0.0, lightness);
        }

        let saturation = if lightness < 0.5 {
            delta / (2.0 * lightness)
        } else {
            delta / (2.0 * (1.0 - lightness))
        };

        let hue = if max == self.x {
            (self.y - self.z) / delta
        } else if max == self.y {
            2.0 + (self.z - self.x) / delta
        } else {
            4.0 + (self.x - self.y) / delta
        };

        vec3(hue.rem_euclid(6.0), saturation.saturate(), lightness)
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn to_hsl() {
        let hsl = vec3(1.0, 0.0, 0.0).to_hsl();

        assert_relative_eq!(hsl.x, 0.0);
        assert_relative_eq!(hsl.y, 1.0);
        assert_relative_eq!(hsl.z, 0.5);

        let hsl = vec3(0.0, 1.0, 0.0).to_hsl();

        assert_relative_eq!(hsl.x, 2.0);

        let hsl = vec3(0.0, 0.0, 1.0).to_hsl();

        assert_relative_eq!(hsl.x, 4.0);

        // Magenta wraps around
        let hsl = vec3(1.0, 0.0, 1.0).to_hsl();

        assert_relative_eq!(hsl.x, 5.0);
    }

    #[test]
    fn to_hsl_gray() {
        let hsl = Vec3::splat(0.25).to_hsl();

        assert_relative_eq!(hsl.x, 0.0);
        assert_relative_eq!(hsl.y, 0.0);
        assert_relative_eq!(hsl.z, 0.25);
    }
}
