use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec4};

/// Shadow-map transforms, as seen by the shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ShadowUniform {
    /// Transforms world-space kilometers into cloud-shadow space, where `x`
    /// and `y` are shadow-map UVs and `z` is the distance travelled along the
    /// light through the cloud slab.
    pub world_to_shadow: Mat4,

    /// Inverse of `world_to_shadow`.
    pub shadow_to_world: Mat4,

    /// x - lowest z of the cloud-shadow space
    /// y - highest z of the cloud-shadow space
    /// z, w - viewport's width and height, in texels
    pub z_min_max: Vec4,

    /// Transforms world-space kilometers into terrain-shadow projection space
    /// (`x`, `y` within `<-1.0, 1.0>`, `z` within `<0.0, 1.0>`).
    pub world_to_terrain_shadow: Mat4,
}
