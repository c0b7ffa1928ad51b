use glam::Vec3;

use crate::gpu::{sh_basis, Sh, Vec3Ext};
use crate::{CapturedTexel, CubeTexel, EncoderConfig, NO_ID};

/// What the flood fill decided about a pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum PixelState {
    /// Not claimed by any surface (yet).
    #[default]
    Free,

    /// Part of the surface with given id; never changes afterwards.
    Surface(usize),

    /// Part of a region that was too insignificant to keep.
    Discarded,
}

/// Single texel of the captured cube map, along with everything derived from
/// it.
#[derive(Clone, Debug, PartialEq)]
pub struct Pixel {
    pub texel: CubeTexel,
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub albedo_hsl: Vec3,
    pub static_lit_color: Vec3,
    pub face_index: u32,
    pub emissive_mat_id: u32,
    pub neighbor_probe_id: u32,
    pub neighbor_probe_distance: f32,
    pub distance: f32,

    /// Whether this pixel sees the sky instead of a scene surface.
    pub infinity: bool,

    /// `max(0, -view . normal) / distance²`; favours close surfaces that
    /// face the probe.
    pub importance: f64,

    pub solid_angle: f64,

    /// Direction from the probe's center towards this pixel.
    pub view: Vec3,

    pub sh: Sh,
    pub state: PixelState,

    /// Number of steps to the border of this pixel's surface; zero for pixels
    /// that lie on the border.
    pub distance_to_border: u32,

    pub sample_index: Option<usize>,
}

impl Pixel {
    pub fn new(
        texel: CubeTexel,
        captured: &CapturedTexel,
        size: u32,
        config: &EncoderConfig,
    ) -> Self {
        let view = texel.direction(size);

        let infinity = !(captured.distance.is_finite()
            && captured.distance < config.infinity_distance);

        let importance = if infinity {
            0.0
        } else {
            let facing = (-view.dot(captured.normal)).max(0.0) as f64;
            let distance = captured.distance as f64;

            facing / (distance * distance).max(f64::EPSILON)
        };

        Self {
            texel,
            position: captured.position,
            normal: captured.normal,
            albedo: captured.albedo,
            albedo_hsl: captured.albedo.to_hsl(),
            static_lit_color: captured.static_lit_color,
            face_index: captured.face_index,
            emissive_mat_id: captured.emissive_mat_id,
            neighbor_probe_id: captured.neighbor_probe_id,
            neighbor_probe_distance: captured.neighbor_probe_distance,
            distance: captured.distance,
            infinity,
            importance,
            solid_angle: texel.solid_angle(size),
            view,
            sh: sh_basis(view),
            state: PixelState::Free,
            distance_to_border: 0,
            sample_index: None,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive_mat_id != NO_ID
    }

    /// Returns whether this pixel can still join a surface.
    pub fn is_acceptable(&self, config: &EncoderConfig) -> bool {
        self.state == PixelState::Free
            && !self.infinity
            && (self.is_emissive()
                || self.importance >= config.importance_threshold)
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            position: self.position,
            normal: self.normal,
            hue: self.albedo_hsl.x,
        }
    }
}

/// What's compared when deciding whether two pixels (or two surfaces) are
/// alike.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Descriptor {
    pub position: Vec3,
    pub normal: Vec3,
    pub hue: f32,
}

impl Descriptor {
    /// Returns a weighted sum of the spatial, angular and hue distances; the
    /// lower, the more alike both descriptors are.
    pub fn metric(&self, other: &Self, config: &EncoderConfig) -> f32 {
        let spatial = (other.position - self.position).length();
        let angular = 0.5 * (1.0 - other.normal.dot(self.normal));
        let hue = (self.hue - other.hue).abs();
        let hue = hue.min(6.0 - hue) / 6.0;

        config.spatial_distance_weight * spatial
            + config.normal_distance_weight * angular
            + config.albedo_distance_weight * hue
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use glam::vec3;

    use super::*;

    fn captured(position: Vec3, normal: Vec3) -> CapturedTexel {
        CapturedTexel {
            position,
            normal,
            albedo: Vec3::splat(0.5),
            distance: position.length(),
            face_index: 0,
            ..CapturedTexel::sky()
        }
    }

    #[test]
    fn importance() {
        let config = EncoderConfig::default();
        let texel = CubeTexel::new(4, 3, 3);
        let dir = texel.direction(8);

        let facing = Pixel::new(texel, &captured(2.0 * dir, -dir), 8, &config);

        assert!(!facing.infinity);
        assert_relative_eq!(facing.importance, 0.25, epsilon = 1e-6);
        assert!(facing.is_acceptable(&config));

        let away = Pixel::new(texel, &captured(2.0 * dir, dir), 8, &config);

        assert_eq!(0.0, away.importance);
        assert!(!away.is_acceptable(&config));

        let sky = Pixel::new(texel, &CapturedTexel::sky(), 8, &config);

        assert!(sky.infinity);
        assert!(!sky.is_acceptable(&config));
    }

    #[test]
    fn emissive_pixels_are_always_acceptable() {
        let config = EncoderConfig::default();
        let texel = CubeTexel::new(0, 0, 0);
        let dir = texel.direction(8);

        let mut pixel = Pixel::new(
            texel,
            &CapturedTexel {
                emissive_mat_id: 3,
                ..captured(1e3 * dir, dir)
            },
            8,
            &config,
        );

        assert!(pixel.is_emissive());
        assert!(pixel.is_acceptable(&config));

        pixel.state = PixelState::Surface(0);

        assert!(!pixel.is_acceptable(&config));
    }

    #[test]
    fn metric() {
        let config = EncoderConfig::default();

        let a = Descriptor {
            position: Vec3::ZERO,
            normal: Vec3::Y,
            hue: 0.5,
        };

        assert_eq!(0.0, a.metric(&a, &config));

        let b = Descriptor {
            position: vec3(0.3, 0.0, 0.4),
            normal: -Vec3::Y,
            hue: 5.5,
        };

        // 0.5 (spatial) + 2.0 (opposite normals) + 1/6 (wrapped hue)
        assert_relative_eq!(a.metric(&b, &config), 2.0 + 0.5 + 1.0 / 6.0);
        assert_relative_eq!(a.metric(&b, &config), b.metric(&a, &config));
    }
}
