use std::f64::consts::PI;

/// Knobs of the probe encoder.
#[derive(Clone, Debug, PartialEq)]
pub struct EncoderConfig {
    pub max_diffuse_surfaces: usize,
    pub max_emissive_surfaces: usize,
    pub max_samples_per_surface: usize,

    /// Weight of the euclidean distance between two pixels' positions.
    pub spatial_distance_weight: f32,

    /// Weight of the angular distance between two pixels' normals (mapped
    /// into `0..=1`).
    pub normal_distance_weight: f32,

    /// Weight of the (circular) distance between two pixels' albedo hues
    /// (mapped into `0..=0.5`).
    pub albedo_distance_weight: f32,

    /// A pixel joins its neighbor's surface when the metric between them is
    /// at most this value.
    pub acceptance_threshold: f32,

    /// A region that doesn't make it into a surface of its own gets merged
    /// into the closest surface when the metric between their aggregates is
    /// at most this value; otherwise it's discarded.
    pub merge_threshold: f32,

    /// Diffuse pixels less important than this can't be part of any surface.
    pub importance_threshold: f64,

    /// Regions covering a smaller solid angle than this never become surfaces
    /// on their own.
    pub min_surface_solid_angle: f64,

    /// Captured distances at or beyond this value denote the sky.
    pub infinity_distance: f32,

    /// How much farthest-point sampling favours pixels far from their
    /// surface's border.
    pub border_bias: f32,

    /// Number of Lloyd iterations applied to sample clusters.
    pub relaxation_iterations: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_diffuse_surfaces: 16,
            max_emissive_surfaces: 16,
            max_samples_per_surface: 64,
            spatial_distance_weight: 1.0,
            normal_distance_weight: 2.0,
            albedo_distance_weight: 1.0,
            acceptance_threshold: 0.5,
            merge_threshold: 2.0,
            importance_threshold: 1e-4,
            min_surface_solid_angle: 4.0 * PI * 1e-3,
            infinity_distance: 1e4,
            border_bias: 0.25,
            relaxation_iterations: 4,
        }
    }
}
