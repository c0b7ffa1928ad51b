use glam::{vec2, vec3, vec4, Mat4, Vec2, Vec3, Vec4};
use log::{debug, trace};

use crate::{gpu, CameraFrustum, CloudSlab, ShadowConfig};

/// Transforms of the cloud shadow map, fitted to what the camera sees.
///
/// Light space is a plane that's horizontal and touches the cloud slab from
/// the sun's side; points are projected on it along the light's direction,
/// with `z` being the (scaled) vertical distance to the plane.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ShadowFit {
    pub world_to_shadow: Mat4,
    pub shadow_to_world: Mat4,
    pub world_to_light: Mat4,
    pub light_to_world: Mat4,
    pub light_to_uv: Mat4,
    pub uv_to_light: Mat4,
    pub viewport_width: i32,
    pub viewport_height: i32,
    pub z_range: Vec2,
    pub quad_min: Vec2,
    pub quad_max: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,

    /// Ratio between the largest world size that fits the shadow map and the
    /// actual size; values below one mean some texels got squeezed.
    pub texel_ratio: Vec2,
}

impl ShadowFit {
    /// Fits the shadow map for given light (pointing *towards* the sun),
    /// camera and clouds.
    pub fn new(
        light_direction: Vec3,
        camera: &CameraFrustum,
        slab: &CloudSlab,
        config: &ShadowConfig,
    ) -> Self {
        let sun_above = light_direction.y > 0.0;

        let normal =
            clamp_elevation(-light_direction, config.min_light_elevation);

        let plane_center = slab.cloud_to_world.transform_point3(vec3(
            0.0,
            if sun_above { 1.0 } else { -1.0 },
            0.0,
        ));

        let world_to_light = world_to_light(normal, plane_center);
        let light_to_world = world_to_light.inverse();
        let project = |p: Vec3| world_to_light.transform_point3(p).truncate();
        let frustum = camera.corners(config.far_clip_km);
        let mut quad = Quad::default();

        if sun_above {
            // The sun shines through the clouds onto everything we see
            for point in frustum {
                quad += project(point);
            }
        } else {
            // The sun lights the clouds from below, so only the part of the
            // slab that's inside the frustum matters
            for altitude_km in [slab.base_altitude_km, slab.top_altitude_km()] {
                for (a, b) in CameraFrustum::EDGES {
                    if let Some(point) =
                        intersect_edge(frustum[a], frustum[b], altitude_km)
                    {
                        quad += project(point);
                    }
                }
            }
        }

        let cloud_quad: Quad =
            slab.corners().into_iter().map(project).collect();

        let quad = quad
            .intersection(&cloud_quad)
            .inflated(config.min_quad_size_km, &cloud_quad);

        trace!("Shadow quad: {:?} .. {:?}", quad.min, quad.max);

        // ---

        let map_size = config.map_size as f32;
        let quad_size = quad.size();
        let max_world_size = config.max_world_size_km();
        let world_size = quad_size.max(Vec2::splat(max_world_size));
        let texel_ratio = max_world_size / world_size;

        if texel_ratio.min_element() < 1.0 {
            debug!(
                "Shadow map is squeezed (texel ratio = {:?})",
                texel_ratio
            );
        }

        let world_to_texel = (map_size - 1.0) / world_size;
        let quad_min_texel = world_to_texel * quad.min;
        let quad_max_texel = world_to_texel * quad.max;
        let view_min = quad_min_texel.floor();
        let view_max = quad_max_texel.ceil();
        let viewport = (view_max - view_min).as_ivec2();

        let uv_min = (quad_min_texel - view_min) / map_size;
        let uv_max = (quad_max_texel - view_min) / map_size;

        let (light_to_uv, uv_to_light) =
            uv_transforms(quad.min, quad.max, uv_min, uv_max);

        Self {
            world_to_shadow: light_to_uv * world_to_light,
            shadow_to_world: light_to_world * uv_to_light,
            world_to_light,
            light_to_world,
            light_to_uv,
            uv_to_light,
            viewport_width: viewport.x,
            viewport_height: viewport.y,
            z_range: vec2(0.0, slab.thickness_km / normal.y.abs()),
            quad_min: quad.min,
            quad_max: quad.max,
            uv_min,
            uv_max,
            texel_ratio,
        }
    }

    pub fn uniform(&self, world_to_terrain_shadow: Mat4) -> gpu::ShadowUniform {
        gpu::ShadowUniform {
            world_to_shadow: self.world_to_shadow,
            shadow_to_world: self.shadow_to_world,
            z_min_max: vec4(
                self.z_range.x,
                self.z_range.y,
                self.viewport_width as f32,
                self.viewport_height as f32,
            ),
            world_to_terrain_shadow,
        }
    }
}

/// Keeps the direction's vertical component away from zero, since the light
/// space degenerates for horizontal lights.
fn clamp_elevation(mut dir: Vec3, min_elevation: f32) -> Vec3 {
    if dir.y >= 0.0 && dir.y < min_elevation {
        dir.y = min_elevation;
        dir = dir.normalize();
    } else if dir.y < 0.0 && dir.y > -min_elevation {
        dir.y = -min_elevation;
        dir = dir.normalize();
    }

    dir
}

/// Builds the world-to-light transform for a horizontal plane passing
/// through `center`, onto which points get projected along `normal`.
///
/// For a point `P` projected along `N` into `P'`, we have:
///
/// ```text
/// x = (P' - C).X
///   = (P - ((P - C).Y / N.y) * N - C).X
///   = P.X' - C.X'
/// ```
///
/// ... where `X' = X - (0, N.X / N.y, 0)`; same goes for `y` (with `Z`
/// playing the role of `X`), while `z` is just the vertical distance scaled
/// by `1 / N.y`.
fn world_to_light(normal: Vec3, center: Vec3) -> Mat4 {
    let scaled_z = normal / normal.y;
    let x = Vec3::X - vec3(0.0, scaled_z.dot(Vec3::X), 0.0);
    let y = Vec3::Z - vec3(0.0, scaled_z.dot(Vec3::Z), 0.0);
    let z = vec3(0.0, 1.0 / normal.y, 0.0);

    Mat4::from_cols(
        vec4(x.x, y.x, z.x, 0.0),
        vec4(x.y, y.y, z.y, 0.0),
        vec4(x.z, y.z, z.z, 0.0),
        vec4(-center.dot(x), -center.dot(y), -center.dot(z), 1.0),
    )
}

/// Intersects segment `v0 -> v1` with a horizontal plane at given altitude.
fn intersect_edge(v0: Vec3, v1: Vec3, altitude_km: f32) -> Option<Vec3> {
    let v = v1 - v0;

    if v.y == 0.0 {
        return None;
    }

    let t = (altitude_km - v0.y) / v.y;

    if (0.0..=1.0).contains(&t) {
        Some(v0 + t * v)
    } else {
        None
    }
}

/// Returns `(light_to_uv, uv_to_light)` for an affine mapping that brings
/// `quad_min ..= quad_max` (in light space) into `uv_min ..= uv_max`.
///
/// `z` passes through unchanged.
pub fn uv_transforms(
    quad_min: Vec2,
    quad_max: Vec2,
    uv_min: Vec2,
    uv_max: Vec2,
) -> (Mat4, Mat4) {
    // quad = quad_min + scale * (uv - uv_min)
    //      = offset + scale * uv
    let scale = (quad_max - quad_min) / (uv_max - uv_min);
    let offset = quad_min - scale * uv_min;

    let uv_to_light = Mat4::from_cols(
        vec4(scale.x, 0.0, 0.0, 0.0),
        vec4(0.0, scale.y, 0.0, 0.0),
        Vec4::Z,
        vec4(offset.x, offset.y, 0.0, 1.0),
    );

    let light_to_uv = Mat4::from_cols(
        vec4(1.0 / scale.x, 0.0, 0.0, 0.0),
        vec4(0.0, 1.0 / scale.y, 0.0, 0.0),
        Vec4::Z,
        vec4(-offset.x / scale.x, -offset.y / scale.y, 0.0, 1.0),
    );

    (light_to_uv, uv_to_light)
}

/// Axis-aligned rectangle in light space.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Quad {
    min: Vec2,
    max: Vec2,
}

impl Quad {
    fn size(&self) -> Vec2 {
        self.max - self.min
    }

    fn intersection(&self, other: &Self) -> Self {
        Self {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    /// Makes sure the quad is at least `min_size` wide on each axis; empty
    /// quads collapse around their center, kept within `bounds`.
    fn inflated(mut self, min_size: f32, bounds: &Self) -> Self {
        let size = self.size();
        let center =
            (0.5 * (self.min + self.max)).clamp(bounds.min, bounds.max);

        // Written this way to catch NaNs as well
        if !(size.x >= min_size) {
            self.min.x = center.x - 0.5 * min_size;
            self.max.x = center.x + 0.5 * min_size;
        }

        if !(size.y >= min_size) {
            self.min.y = center.y - 0.5 * min_size;
            self.max.y = center.y + 0.5 * min_size;
        }

        self
    }
}

impl Default for Quad {
    fn default() -> Self {
        Self {
            min: Vec2::splat(1e6),
            max: Vec2::splat(-1e6),
        }
    }
}

impl std::ops::AddAssign<Vec2> for Quad {
    fn add_assign(&mut self, rhs: Vec2) {
        self.min = self.min.min(rhs);
        self.max = self.max.max(rhs);
    }
}

impl FromIterator<Vec2> for Quad {
    fn from_iter<T>(iter: T) -> Self
    where
        T: IntoIterator<Item = Vec2>,
    {
        let mut this = Self::default();

        for item in iter {
            this += item;
        }

        this
    }
}
