use std::sync::atomic::AtomicBool;

use derivative::Derivative;
use glam::Vec3;
use log::{debug, info};

use crate::gpu::{sh_accumulate, sh_accumulate_rgb, Sh, ShRgb};
use crate::{
    collect_neighbors, flood_fill, metric, BoundingBox, CubeMapSource,
    CubeTexel, EncoderConfig, Error, NeighborProbe, Pixel, Result, Surface,
};

/// Geometric statistics of the scene surrounding a probe; only scene (i.e.
/// non-sky) pixels are taken into account.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ProbeStats {
    /// Solid-angle-weighted mean distance.
    pub mean_distance: f64,

    /// Solid-angle-weighted harmonic mean distance.
    pub mean_harmonic_distance: f64,

    pub min_distance: f64,
    pub max_distance: f64,
    pub bbox_min: Vec3,
    pub bbox_max: Vec3,
}

/// Result of encoding a single probe, ready to be saved.
#[derive(Clone, Debug, PartialEq)]
pub struct EncodedProbe {
    pub probe_id: u32,
    pub stats: ProbeStats,

    /// Statically lit environment, projected onto SH.
    pub static_sh: ShRgb,

    /// Visibility of the sky, projected onto SH.
    pub occlusion_sh: Sh,

    pub surfaces: Vec<Surface>,
    pub emissive_surfaces: Vec<Surface>,
    pub sh_sum_diffuse: ShRgb,
    pub sh_sum_emissive: ShRgb,
    pub neighbors: Vec<NeighborProbe>,
    pub nearest_neighbor_distance: f32,
    pub farthest_neighbor_distance: f32,
}

/// Turns cube maps captured around probes into surfaces that can be relit
/// at runtime.
///
/// The encoder keeps pixels of the last encoded probe around, so that they
/// can be inspected (see [`Self::save_pixels()`]).
#[derive(Derivative)]
#[derivative(Debug)]
pub struct ProbeEncoder {
    config: EncoderConfig,
    size: u32,
    #[derivative(Debug = "ignore")]
    pixels: Vec<Pixel>,
}

impl ProbeEncoder {
    pub fn new(config: EncoderConfig) -> Self {
        Self {
            config,
            size: 0,
            pixels: Vec::new(),
        }
    }

    pub fn config(&self) -> &EncoderConfig {
        &self.config
    }

    /// Returns face size of the last encoded cube map.
    pub fn face_size(&self) -> u32 {
        self.size
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    pub fn pixel(&self, texel: CubeTexel) -> Result<&Pixel> {
        let idx = texel.index(self.size);

        Error::check_index(idx, self.pixels.len())?;

        Ok(&self.pixels[idx])
    }

    /// Encodes given cube map.
    ///
    /// When `cancel` gets raised, encoding stops before the next flood-fill
    /// seed and [`Error::Cancelled`] is returned.
    pub fn encode(
        &mut self,
        source: &dyn CubeMapSource,
        probe_id: u32,
        cancel: Option<&AtomicBool>,
    ) -> Result<EncodedProbe> {
        let size = source.face_size();

        if size == 0 {
            return Err(Error::InvalidCapture("face size is zero".into()));
        }

        info!("Encoding probe {} ({}x{} faces)", probe_id, size, size);

        self.read_back(source, size);

        let stats = self.stats();
        let (static_sh, occlusion_sh) = self.environment_sh();

        let segments = metric("flood_fill", || {
            flood_fill(&mut self.pixels, size, &self.config, cancel)
        })?;

        let surfaces: Vec<_> = metric("surfaces", || {
            segments
                .iter()
                .enumerate()
                .map(|(id, segment)| {
                    Surface::build(
                        id as u32,
                        segment,
                        &mut self.pixels,
                        &self.config,
                    )
                })
                .collect()
        });

        let (emissive_surfaces, surfaces): (Vec<_>, Vec<_>) =
            surfaces.into_iter().partition(Surface::is_emissive);

        let neighbors = collect_neighbors(&self.pixels);

        let nearest_neighbor_distance = neighbors
            .iter()
            .map(|neighbor| neighbor.distance)
            .reduce(f32::min)
            .unwrap_or_default();

        let farthest_neighbor_distance = neighbors
            .iter()
            .map(|neighbor| neighbor.distance)
            .reduce(f32::max)
            .unwrap_or_default();

        debug!(
            "Probe {}: mean distance = {:.3}, {} neighbor(s)",
            probe_id,
            stats.mean_distance,
            neighbors.len()
        );

        info!(
            "Probe {} encoded: {} diffuse and {} emissive surface(s)",
            probe_id,
            surfaces.len(),
            emissive_surfaces.len()
        );

        Ok(EncodedProbe {
            probe_id,
            stats,
            static_sh,
            occlusion_sh,
            sh_sum_diffuse: sum_sh(&surfaces),
            sh_sum_emissive: sum_sh(&emissive_surfaces),
            surfaces,
            emissive_surfaces,
            neighbors,
            nearest_neighbor_distance,
            farthest_neighbor_distance,
        })
    }

    fn read_back(&mut self, source: &dyn CubeMapSource, size: u32) {
        self.size = size;
        self.pixels.clear();

        self.pixels.extend(CubeTexel::all(size).map(|texel| {
            Pixel::new(texel, &source.texel(texel), size, &self.config)
        }));
    }

    fn stats(&self) -> ProbeStats {
        let mut weight = 0.0;
        let mut distance_sum = 0.0;
        let mut harmonic_sum = 0.0;
        let mut min_distance = f64::MAX;
        let mut max_distance = 0.0f64;
        let mut bbox = BoundingBox::default();

        for pixel in self.pixels.iter().filter(|pixel| !pixel.infinity) {
            let distance = pixel.distance as f64;

            weight += pixel.solid_angle;
            distance_sum += pixel.solid_angle * distance;
            harmonic_sum += pixel.solid_angle / distance.max(f64::EPSILON);
            min_distance = min_distance.min(distance);
            max_distance = max_distance.max(distance);
            bbox += pixel.position;
        }

        if weight <= 0.0 {
            return Default::default();
        }

        ProbeStats {
            mean_distance: distance_sum / weight,
            mean_harmonic_distance: weight / harmonic_sum,
            min_distance,
            max_distance,
            bbox_min: bbox.min(),
            bbox_max: bbox.max(),
        }
    }

    /// Returns the static SH (lit scene) and the occlusion SH (sky).
    fn environment_sh(&self) -> (ShRgb, Sh) {
        let mut static_sh = ShRgb::default();
        let mut occlusion_sh = Sh::default();

        for pixel in &self.pixels {
            if pixel.infinity {
                sh_accumulate(&mut occlusion_sh, &pixel.sh, pixel.solid_angle);
            } else {
                sh_accumulate_rgb(
                    &mut static_sh,
                    &pixel.sh,
                    pixel.solid_angle * pixel.static_lit_color.as_dvec3(),
                );
            }
        }

        (static_sh, occlusion_sh)
    }
}

impl Default for ProbeEncoder {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

fn sum_sh(surfaces: &[Surface]) -> ShRgb {
    let mut sum = ShRgb::default();

    for surface in surfaces {
        for (sum, coeff) in sum.iter_mut().zip(&surface.sh) {
            *sum += *coeff;
        }
    }

    sum
}
