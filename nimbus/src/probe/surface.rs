use std::f64::consts::PI;

use glam::{DVec3, Vec3};

use crate::gpu::{sh_accumulate_rgb, ShRgb};
use crate::{generate_samples, EncoderConfig, Pixel, Segment, SurfaceSample};

/// Group of pixels that gets lit as a whole at runtime.
#[derive(Clone, Debug, PartialEq)]
pub struct Surface {
    pub id: u32,

    /// Emissive material of the surface; `None` for diffuse surfaces.
    pub emissive_mat_id: Option<u32>,

    /// Solid-angle-weighted centroid.
    pub position: Vec3,

    pub normal: Vec3,

    /// Major axis of the surface, scaled by its extent.
    pub tangent: Vec3,

    /// Minor axis of the surface, scaled by its extent.
    pub bitangent: Vec3,

    pub albedo: Vec3,
    pub solid_angle: f64,
    pub pixels_count: u32,

    /// For diffuse surfaces, the probe's response to a unit irradiance
    /// reaching the surface; for emissive surfaces, the (unnormalized)
    /// coverage of the surface.
    pub sh: ShRgb,

    pub samples: Vec<SurfaceSample>,
}

impl Surface {
    pub(crate) fn build(
        id: u32,
        segment: &Segment,
        pixels: &mut [Pixel],
        config: &EncoderConfig,
    ) -> Self {
        let members = &segment.pixels;
        let position = segment.position();
        let albedo = segment.albedo();

        let normal = segment
            .normal()
            .try_normalize()
            .or_else(|| {
                members
                    .first()
                    .and_then(|&idx| pixels[idx].normal.try_normalize())
            })
            .unwrap_or(Vec3::Y);

        let sh = if segment.emissive_mat_id.is_some() {
            emissive_sh(pixels, members)
        } else {
            diffuse_sh(pixels, members, normal, albedo)
        };

        let (tangent, bitangent) =
            principal_axes(pixels, members, position, normal);

        let samples = generate_samples(pixels, members, normal, config);

        Self {
            id,
            emissive_mat_id: segment.emissive_mat_id,
            position,
            normal,
            tangent,
            bitangent,
            albedo,
            solid_angle: segment.solid_angle(),
            pixels_count: members.len() as u32,
            sh,
            samples,
        }
    }

    pub fn is_emissive(&self) -> bool {
        self.emissive_mat_id.is_some()
    }
}

/// Projects the surface's pixels onto SH, assuming they all receive the same
/// irradiance as the surface's plane does.
///
/// Each pixel is weighted by its solid angle, by how well it's aligned with
/// the surface's plane and by how directly the probe sees it; that last
/// factor reduces the noise coming from pixels seen at grazing angles.
pub fn diffuse_sh(
    pixels: &[Pixel],
    members: &[usize],
    normal: Vec3,
    albedo: Vec3,
) -> ShRgb {
    let albedo = albedo.as_dvec3() / PI;
    let mut sh = ShRgb::default();

    for &idx in members {
        let pixel = &pixels[idx];

        let factor = pixel.solid_angle
            * (pixel.normal.dot(normal).max(0.0) as f64)
            * ((-pixel.view.dot(pixel.normal)).max(0.0) as f64);

        sh_accumulate_rgb(&mut sh, &pixel.sh, factor * albedo);
    }

    sh
}

/// Projects the surface's coverage onto SH; emissive surfaces radiate the
/// same way no matter the viewing angle, so there's no extra weighting here.
pub fn emissive_sh(pixels: &[Pixel], members: &[usize]) -> ShRgb {
    let mut sh = ShRgb::default();

    for &idx in members {
        let pixel = &pixels[idx];

        sh_accumulate_rgb(&mut sh, &pixel.sh, DVec3::splat(pixel.solid_angle));
    }

    sh
}

/// Approximates principal axes of the surface by sweeping a line through its
/// center (within the surface's plane) and measuring how far the pixels get
/// from it.
///
/// Returns `(tangent, bitangent)`, i.e. the major and minor axis.
pub fn principal_axes(
    pixels: &[Pixel],
    members: &[usize],
    center: Vec3,
    normal: Vec3,
) -> (Vec3, Vec3) {
    let (x, z) = match Vec3::Y.cross(normal).try_normalize() {
        Some(x) => (x, x.cross(normal)),
        None => (Vec3::X, Vec3::Z),
    };

    let mut max = (0.0, 0.0);
    let mut min = (f32::MAX, 0.0);

    for angle in (0..180).step_by(2) {
        let angle = (angle as f32).to_radians();

        // Orthogonal to the line we're rotating
        let ortho = -angle.sin() * x + angle.cos() * z;

        let distance = members
            .iter()
            .map(|&idx| (pixels[idx].position - center).dot(ortho).abs())
            .fold(0.0, f32::max);

        if distance > max.0 {
            max = (distance, angle);
        }

        if distance < min.0 {
            min = (distance, angle);
        }
    }

    let axis = |angle: f32| angle.cos() * x + angle.sin() * z;
    let tangent = max.0 * axis(min.1);
    let bitangent = min.0 * axis(max.1);

    (tangent, bitangent)
}
