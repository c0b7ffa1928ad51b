use glam::{vec3, Mat4, Vec3};

/// Camera, as needed for fitting shadow maps.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraFrustum {
    /// Camera's local-to-world transform; the camera looks towards its `+Z`
    /// axis, with `+Y` being up.
    pub camera_to_world: Mat4,

    /// Tangent of half of the horizontal field of view.
    pub tan_half_fov_h: f32,

    /// Tangent of half of the vertical field of view.
    pub tan_half_fov_v: f32,
}

impl CameraFrustum {
    pub fn position(&self) -> Vec3 {
        self.camera_to_world.w_axis.truncate()
    }

    pub fn forward(&self) -> Vec3 {
        self.camera_to_world.z_axis.truncate()
    }

    /// Returns the camera's apex followed by the four corners of the frustum
    /// cut at given distance, in world space.
    ///
    /// Corners go around the far plane, so that consecutive corners (and the
    /// last one with the first one) share an edge.
    pub fn corners(&self, far_clip: f32) -> [Vec3; 5] {
        let h = self.tan_half_fov_h;
        let v = self.tan_half_fov_v;

        [
            Vec3::ZERO,
            far_clip * vec3(-h, -v, 1.0),
            far_clip * vec3(h, -v, 1.0),
            far_clip * vec3(h, v, 1.0),
            far_clip * vec3(-h, v, 1.0),
        ]
        .map(|point| self.camera_to_world.transform_point3(point))
    }

    /// Pairs of indices into [`Self::corners()`] forming the frustum's edges.
    pub const EDGES: [(usize, usize); 8] = [
        (0, 1),
        (0, 2),
        (0, 3),
        (0, 4),
        (1, 2),
        (2, 3),
        (3, 4),
        (4, 1),
    ];
}

impl Default for CameraFrustum {
    fn default() -> Self {
        Self {
            camera_to_world: Mat4::IDENTITY,
            tan_half_fov_h: 1.0,
            tan_half_fov_v: 0.5625,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn corners() {
        let target = CameraFrustum {
            camera_to_world: Mat4::from_translation(vec3(1.0, 2.0, 3.0)),
            tan_half_fov_h: 0.5,
            tan_half_fov_v: 0.25,
        };

        let corners = target.corners(10.0);

        assert_eq!(vec3(1.0, 2.0, 3.0), corners[0]);
        assert_eq!(vec3(-4.0, -0.5, 13.0), corners[1]);
        assert_eq!(vec3(6.0, 4.5, 13.0), corners[3]);

        for (a, b) in CameraFrustum::EDGES {
            assert!(a < 5 && b < 5);
        }

        assert_relative_eq!(target.forward().z, 1.0);
    }
}
