use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use glam::{DVec3, Vec3};
use log::{debug, trace};

use crate::gpu::Vec3Ext;
use crate::{
    Descriptor, Direction, EncoderConfig, Error, Pixel, PixelState, Result,
};

/// Group of alike pixels that becomes a single surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub(crate) struct Segment {
    /// Emissive material shared by all of the pixels; `None` for diffuse
    /// segments.
    pub emissive_mat_id: Option<u32>,

    /// Indices of the member pixels, in the order they were reached.
    pub pixels: Vec<usize>,

    solid_angle: f64,
    position: DVec3,
    normal: DVec3,
    albedo: DVec3,
}

impl Segment {
    fn new(emissive_mat_id: Option<u32>) -> Self {
        Self {
            emissive_mat_id,
            ..Default::default()
        }
    }

    fn push(&mut self, idx: usize, pixel: &Pixel) {
        let weight = pixel.solid_angle;

        self.pixels.push(idx);
        self.solid_angle += weight;
        self.position += weight * pixel.position.as_dvec3();
        self.normal += weight * pixel.normal.as_dvec3();
        self.albedo += weight * pixel.albedo.as_dvec3();
    }

    fn absorb(&mut self, other: Self) {
        self.pixels.extend(other.pixels);
        self.solid_angle += other.solid_angle;
        self.position += other.position;
        self.normal += other.normal;
        self.albedo += other.albedo;
    }

    pub fn solid_angle(&self) -> f64 {
        self.solid_angle
    }

    /// Solid-angle-weighted centroid.
    pub fn position(&self) -> Vec3 {
        self.average(self.position)
    }

    pub fn normal(&self) -> Vec3 {
        self.normal.as_vec3().normalize_or_zero()
    }

    pub fn albedo(&self) -> Vec3 {
        self.average(self.albedo)
    }

    pub fn descriptor(&self) -> Descriptor {
        Descriptor {
            position: self.position(),
            normal: self.normal(),
            hue: self.albedo().to_hsl().x,
        }
    }

    fn average(&self, sum: DVec3) -> Vec3 {
        if self.solid_angle > 0.0 {
            (sum / self.solid_angle).as_vec3()
        } else {
            Vec3::ZERO
        }
    }
}

/// Splits pixels into segments, marking each pixel's [`PixelState`] on the
/// way.
///
/// Seeds are visited in the order of decreasing importance; each seed grows
/// into a region of alike, 4-connected pixels which becomes a new segment
/// when it's significant enough and there's still room for it. Otherwise the
/// region is merged into the closest segment of the same kind or discarded.
pub(crate) fn flood_fill(
    pixels: &mut [Pixel],
    size: u32,
    config: &EncoderConfig,
    cancel: Option<&AtomicBool>,
) -> Result<Vec<Segment>> {
    let mut seeds: Vec<_> = (0..pixels.len())
        .filter(|&idx| pixels[idx].is_acceptable(config))
        .collect();

    seeds.sort_by(|&a, &b| {
        pixels[b]
            .importance
            .total_cmp(&pixels[a].importance)
            .then(a.cmp(&b))
    });

    let mut filler = Filler::new(pixels.len());
    let mut segments: Vec<Segment> = Vec::new();
    let mut merged = 0;
    let mut discarded = 0;

    for seed in seeds {
        if cancel.map_or(false, |cancel| cancel.load(Ordering::Relaxed)) {
            return Err(Error::Cancelled);
        }

        if !pixels[seed].is_acceptable(config) {
            continue;
        }

        let region = filler.grow(pixels, seed, size, config);
        let is_emissive = region.emissive_mat_id.is_some();

        trace!(
            "Region at pixel {}: {} pixels, solid angle = {:.5}{}",
            seed,
            region.pixels.len(),
            region.solid_angle,
            if is_emissive { " (emissive)" } else { "" },
        );

        let (capacity, taken) = if is_emissive {
            (
                config.max_emissive_surfaces,
                segments
                    .iter()
                    .filter(|segment| segment.emissive_mat_id.is_some())
                    .count(),
            )
        } else {
            (
                config.max_diffuse_surfaces,
                segments
                    .iter()
                    .filter(|segment| segment.emissive_mat_id.is_none())
                    .count(),
            )
        };

        if region.solid_angle >= config.min_surface_solid_angle
            && taken < capacity
        {
            assign(pixels, &region.pixels, PixelState::Surface(segments.len()));
            segments.push(region);
            continue;
        }

        let descriptor = region.descriptor();

        let nearest = segments
            .iter()
            .enumerate()
            .filter(|(_, segment)| {
                segment.emissive_mat_id == region.emissive_mat_id
            })
            .map(|(id, segment)| {
                (id, segment.descriptor().metric(&descriptor, config))
            })
            .min_by(|(_, a), (_, b)| a.total_cmp(b));

        match nearest {
            Some((id, metric)) if metric <= config.merge_threshold => {
                assign(pixels, &region.pixels, PixelState::Surface(id));
                segments[id].absorb(region);
                merged += 1;
            }

            _ => {
                assign(pixels, &region.pixels, PixelState::Discarded);
                discarded += 1;
            }
        }
    }

    debug!(
        "Flood fill done: {} segments, {} regions merged, {} discarded",
        segments.len(),
        merged,
        discarded
    );

    Ok(segments)
}

fn assign(pixels: &mut [Pixel], members: &[usize], state: PixelState) {
    for &idx in members {
        pixels[idx].state = state;
    }
}

/// Scratch buffers reused across regions; pixels stamped with the current
/// generation belong to the region being grown.
struct Filler {
    stamps: Vec<u32>,
    generation: u32,
    queue: VecDeque<usize>,
}

impl Filler {
    fn new(len: usize) -> Self {
        Self {
            stamps: vec![0; len],
            generation: 0,
            queue: VecDeque::new(),
        }
    }

    fn grow(
        &mut self,
        pixels: &mut [Pixel],
        seed: usize,
        size: u32,
        config: &EncoderConfig,
    ) -> Segment {
        self.generation += 1;

        let generation = self.generation;

        let emissive_mat_id = pixels[seed]
            .is_emissive()
            .then_some(pixels[seed].emissive_mat_id);

        let mut segment = Segment::new(emissive_mat_id);

        self.stamps[seed] = generation;
        self.queue.clear();
        self.queue.push_back(seed);

        while let Some(idx) = self.queue.pop_front() {
            let pixel = &pixels[idx];

            segment.push(idx, pixel);

            for dir in Direction::ALL {
                let next_idx = pixel.texel.adjacent(dir, size).index(size);
                let next = &pixels[next_idx];

                if self.stamps[next_idx] == generation
                    || !next.is_acceptable(config)
                {
                    continue;
                }

                let accepted = match emissive_mat_id {
                    Some(mat_id) => next.emissive_mat_id == mat_id,

                    None => {
                        !next.is_emissive()
                            && pixel
                                .descriptor()
                                .metric(&next.descriptor(), config)
                                <= config.acceptance_threshold
                    }
                };

                if accepted {
                    self.stamps[next_idx] = generation;
                    self.queue.push_back(next_idx);
                }
            }
        }

        self.measure_borders(pixels, &segment.pixels, size);

        segment
    }

    /// Fills [`Pixel::distance_to_border`] of given members, walking inwards
    /// from the pixels that touch a non-member.
    fn measure_borders(
        &mut self,
        pixels: &mut [Pixel],
        members: &[usize],
        size: u32,
    ) {
        let member = self.generation;

        self.generation += 1;

        let visited = self.generation;

        self.queue.clear();

        for &idx in members {
            let texel = pixels[idx].texel;

            let is_border = Direction::ALL.into_iter().any(|dir| {
                self.stamps[texel.adjacent(dir, size).index(size)] != member
            });

            if is_border {
                self.queue.push_back(idx);
            }
        }

        for &idx in &self.queue {
            self.stamps[idx] = visited;
            pixels[idx].distance_to_border = 0;
        }

        while let Some(idx) = self.queue.pop_front() {
            let texel = pixels[idx].texel;
            let distance = pixels[idx].distance_to_border + 1;

            for dir in Direction::ALL {
                let next_idx = texel.adjacent(dir, size).index(size);

                if self.stamps[next_idx] == member {
                    self.stamps[next_idx] = visited;
                    pixels[next_idx].distance_to_border = distance;
                    self.queue.push_back(next_idx);
                }
            }
        }
    }
}
