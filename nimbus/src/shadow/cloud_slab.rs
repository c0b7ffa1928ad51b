use glam::{vec3, Mat4, Quat, Vec3};

use crate::{BoundingBox, CameraFrustum};

/// Box of clouds, modelled as a unit cube (`-1..=1` on each axis) placed in
/// the world through [`Self::cloud_to_world`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CloudSlab {
    pub cloud_to_world: Mat4,
    pub base_altitude_km: f32,
    pub thickness_km: f32,
}

impl CloudSlab {
    /// Horizontal extent of the slab, in kilometers.
    pub const SIZE_KM: f32 = 100.0;

    /// Creates a slab horizontally centered at `center`.
    pub fn new(center: Vec3, base_altitude_km: f32, thickness_km: f32) -> Self {
        let scale = vec3(
            0.5 * Self::SIZE_KM,
            0.5 * thickness_km,
            0.5 * Self::SIZE_KM,
        );

        let translation = vec3(
            center.x,
            base_altitude_km + 0.5 * thickness_km,
            center.z,
        );

        Self {
            cloud_to_world: Mat4::from_scale_rotation_translation(
                scale,
                Quat::IDENTITY,
                translation,
            ),
            base_altitude_km,
            thickness_km,
        }
    }

    /// Creates a slab centered a bit in front of the camera, so that most of
    /// the clouds end up in view.
    pub fn following_camera(
        camera: &CameraFrustum,
        base_altitude_km: f32,
        thickness_km: f32,
    ) -> Self {
        let center =
            camera.position() + 0.45 * Self::SIZE_KM * camera.forward();

        Self::new(center, base_altitude_km, thickness_km)
    }

    pub fn top_altitude_km(&self) -> f32 {
        self.base_altitude_km + self.thickness_km
    }

    /// Returns the slab's eight corners, in world space.
    pub fn corners(&self) -> [Vec3; 8] {
        BoundingBox::new(-Vec3::ONE, Vec3::ONE)
            .corners()
            .map(|corner| self.cloud_to_world.transform_point3(corner))
    }
}

impl Default for CloudSlab {
    fn default() -> Self {
        Self::new(Vec3::ZERO, 4.0, 2.0)
    }
}
