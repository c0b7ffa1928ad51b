use glam::{vec3, vec4, Mat4, Vec3};

use crate::{BoundingBox, CameraFrustum, TerrainShadowConfig};

/// Terrain's bounds, modelled as the `-1..=1` square on the `XZ` plane placed
/// in the world through [`Self::terrain_to_world`] and extruded upwards by
/// [`Self::height_km`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Terrain {
    pub terrain_to_world: Mat4,
    pub height_km: f32,
}

impl Terrain {
    /// Returns the terrain's eight corners, in world space.
    pub fn corners(&self) -> [Vec3; 8] {
        [0, 1, 2, 3, 4, 5, 6, 7].map(|i| {
            let x = if i & 1 > 0 { 1.0 } else { -1.0 };
            let z = if i & 4 > 0 { 1.0 } else { -1.0 };
            let mut point =
                self.terrain_to_world.transform_point3(vec3(x, 0.0, z));

            point.y = if i & 2 > 0 { self.height_km } else { 0.0 };
            point
        })
    }
}

impl Default for Terrain {
    fn default() -> Self {
        Self {
            terrain_to_world: Mat4::from_scale(vec3(50.0, 1.0, 50.0)),
            height_km: 10.0,
        }
    }
}

/// Returns the world-to-projection transform of the terrain shadow map; the
/// visible part of the terrain lands in `-1..=1` on `x` and `y`, and `0..=1`
/// on `z`.
pub fn terrain_shadow_transform(
    light_direction: Vec3,
    camera: &CameraFrustum,
    terrain: &Terrain,
    config: &TerrainShadowConfig,
) -> Mat4 {
    let mut z = -light_direction;

    if z.y.abs() > 1.0 - 1e-3 {
        z = vec3(1e-2, if z.y > 0.0 { 1.0 } else { -1.0 }, 0.0).normalize();
    }

    let x = Vec3::Y.cross(z).normalize();
    let y = z.cross(x);

    let light_to_world = Mat4::from_cols(
        x.extend(0.0),
        y.extend(0.0),
        z.extend(0.0),
        terrain.terrain_to_world.w_axis,
    );

    let world_to_light = light_to_world.inverse();

    let frustum_bb: BoundingBox = camera
        .corners(config.far_clip_km)
        .into_iter()
        .map(|point| world_to_light.transform_point3(point))
        .collect();

    let terrain_bb: BoundingBox = terrain
        .corners()
        .into_iter()
        .map(|point| world_to_light.transform_point3(point))
        .collect();

    let bb = frustum_bb.intersection(&terrain_bb);
    let center = bb.center();
    let scale = (0.5 * bb.extent()).max(Vec3::splat(1e-3));

    let light_to_proj = Mat4::from_cols(
        vec4(1.0 / scale.x, 0.0, 0.0, 0.0),
        vec4(0.0, 1.0 / scale.y, 0.0, 0.0),
        vec4(0.0, 0.0, 0.5 / scale.z, 0.0),
        vec4(
            -center.x / scale.x,
            -center.y / scale.y,
            -0.5 * bb.min().z / scale.z,
            1.0,
        ),
    );

    light_to_proj * world_to_light
}
