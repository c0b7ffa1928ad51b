/// Parameters of the cloud shadow map.
#[derive(Clone, Debug, PartialEq)]
pub struct ShadowConfig {
    /// Size of the (square) shadow map, in texels.
    pub map_size: u32,

    /// Distance at which the camera frustum gets cut for the purposes of
    /// fitting the shadow map, in kilometers.
    pub far_clip_km: f32,

    /// Texel density multiplier; the higher, the smaller the world area that
    /// fits the shadow map (see [`Self::max_world_size_km()`]).
    pub scale: f32,

    /// Far-clip distance at which `reference_world_size_km` has been
    /// measured.
    pub reference_far_clip_km: f32,

    /// Largest extent of the shadow quad observed for
    /// `reference_far_clip_km`; a quad of this size covers the shadow map
    /// exactly.
    pub reference_world_size_km: f32,

    /// Lowest absolute vertical component of the light direction; grazing
    /// lights get clamped to it.
    pub min_light_elevation: f32,

    /// Shadow quads smaller than this (on either axis) get inflated to this
    /// size.
    pub min_quad_size_km: f32,
}

impl ShadowConfig {
    /// Returns the world size that fits the shadow map exactly.
    pub fn max_world_size_km(&self) -> f32 {
        self.reference_world_size_km * self.far_clip_km
            / (self.scale * self.reference_far_clip_km)
    }
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            map_size: 512,
            far_clip_km: 70.0,
            scale: 1.1,
            reference_far_clip_km: 100.0,
            reference_world_size_km: 180.0,
            min_light_elevation: 1e-2,
            min_quad_size_km: 1e-3,
        }
    }
}

/// Parameters of the terrain shadow map.
#[derive(Clone, Debug, PartialEq)]
pub struct TerrainShadowConfig {
    pub far_clip_km: f32,
}

impl Default for TerrainShadowConfig {
    fn default() -> Self {
        Self { far_clip_km: 60.0 }
    }
}
