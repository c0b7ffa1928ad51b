use glam::{DVec3, Vec3};

use crate::{EncoderConfig, Pixel};

/// Disc standing in for a group of a surface's pixels; lighting evaluated at
/// the disc gets attributed to all of them.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,

    /// Radius of the disc encompassing all of the sample's pixels.
    pub radius: f32,

    pub pixels_count: u32,
}

/// Splits given pixels into at most `max_samples_per_surface` disjoint
/// clusters and returns a disc for each of them; every pixel gets its
/// [`Pixel::sample_index`] assigned.
///
/// Seeds are spread through farthest-point sampling biased towards the
/// surface's interior, then refined with a couple of Lloyd iterations.
pub(crate) fn generate_samples(
    pixels: &mut [Pixel],
    members: &[usize],
    fallback_normal: Vec3,
    config: &EncoderConfig,
) -> Vec<SurfaceSample> {
    let count = config.max_samples_per_surface.min(members.len());

    if count == 0 {
        return Vec::new();
    }

    let mut centers = pick_seeds(pixels, members, count, config.border_bias);
    let mut clusters = vec![0; members.len()];

    for _ in 0..config.relaxation_iterations {
        assign_clusters(pixels, members, &centers, &mut clusters);
        relax_centers(pixels, members, &clusters, &mut centers);
    }

    assign_clusters(pixels, members, &centers, &mut clusters);

    // ---

    let mut groups = vec![Vec::new(); centers.len()];

    for (&idx, &cluster) in members.iter().zip(&clusters) {
        groups[cluster].push(idx);
    }

    groups
        .into_iter()
        .filter(|group| !group.is_empty())
        .enumerate()
        .map(|(sample_idx, group)| {
            for &idx in &group {
                pixels[idx].sample_index = Some(sample_idx);
            }

            build_disc(pixels, &group, fallback_normal)
        })
        .collect()
}

fn pick_seeds(
    pixels: &[Pixel],
    members: &[usize],
    count: usize,
    border_bias: f32,
) -> Vec<Vec3> {
    let mut first = 0;

    for (k, &idx) in members.iter().enumerate() {
        if pixels[idx].distance_to_border
            > pixels[members[first]].distance_to_border
        {
            first = k;
        }
    }

    let mut chosen = vec![false; members.len()];
    let mut seeds = Vec::with_capacity(count);
    let mut nearest = vec![f32::MAX; members.len()];
    let mut next = Some(first);

    while let Some(k) = next {
        let seed = pixels[members[k]].position;

        chosen[k] = true;
        seeds.push(seed);

        if seeds.len() >= count {
            break;
        }

        next = None;

        let mut best_score = f32::MIN;

        for (j, &idx) in members.iter().enumerate() {
            nearest[j] = nearest[j].min(pixels[idx].position.distance(seed));

            if chosen[j] {
                continue;
            }

            let interior = 1.0
                + border_bias * pixels[idx].distance_to_border as f32;

            let score = nearest[j] * interior;

            if score > best_score {
                best_score = score;
                next = Some(j);
            }
        }
    }

    seeds
}

fn assign_clusters(
    pixels: &[Pixel],
    members: &[usize],
    centers: &[Vec3],
    clusters: &mut [usize],
) {
    for (&idx, cluster) in members.iter().zip(clusters.iter_mut()) {
        let position = pixels[idx].position;
        let mut best_distance = f32::MAX;

        for (center_idx, center) in centers.iter().enumerate() {
            let distance = position.distance_squared(*center);

            if distance < best_distance {
                best_distance = distance;
                *cluster = center_idx;
            }
        }
    }
}

fn relax_centers(
    pixels: &[Pixel],
    members: &[usize],
    clusters: &[usize],
    centers: &mut [Vec3],
) {
    let mut sums = vec![(DVec3::ZERO, 0.0); centers.len()];

    for (&idx, &cluster) in members.iter().zip(clusters) {
        let pixel = &pixels[idx];

        sums[cluster].0 += pixel.solid_angle * pixel.position.as_dvec3();
        sums[cluster].1 += pixel.solid_angle;
    }

    for (center, (sum, weight)) in centers.iter_mut().zip(sums) {
        // Empty clusters keep their center and get dropped at the end, if
        // they stay empty
        if weight > 0.0 {
            *center = (sum / weight).as_vec3();
        }
    }
}

fn build_disc(
    pixels: &[Pixel],
    group: &[usize],
    fallback_normal: Vec3,
) -> SurfaceSample {
    let mut position = DVec3::ZERO;
    let mut normal = DVec3::ZERO;
    let mut weight = 0.0;

    for &idx in group {
        let pixel = &pixels[idx];

        position += pixel.solid_angle * pixel.position.as_dvec3();
        normal += pixel.solid_angle * pixel.normal.as_dvec3();
        weight += pixel.solid_angle;
    }

    let position = if weight > 0.0 {
        (position / weight).as_vec3()
    } else {
        pixels[group[0]].position
    };

    let normal = normal.as_vec3().try_normalize().unwrap_or(fallback_normal);

    let radius = group
        .iter()
        .map(|&idx| pixels[idx].position.distance(position))
        .fold(0.0, f32::max);

    SurfaceSample {
        position,
        normal,
        radius,
        pixels_count: group.len() as u32,
    }
}
