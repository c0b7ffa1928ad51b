use fxhash::FxHashMap;
use glam::{DVec3, Vec3};

use crate::gpu::{sh_accumulate, Sh};
use crate::{Pixel, NO_ID};

/// Neighboring probe, as perceived through the pixels tagged with its id.
#[derive(Clone, Debug, PartialEq)]
pub struct NeighborProbe {
    pub probe_id: u32,

    /// Distance to the nearest pixel tagged with this probe.
    pub distance: f32,

    pub solid_angle: f64,

    /// Solid-angle-weighted direction towards the probe.
    pub direction: Vec3,

    /// Coverage of the probe, used to isolate its contribution.
    pub sh: Sh,

    pub pixels_count: u32,
}

/// Aggregates pixels by their neighbor-probe ids; returned probes are sorted
/// by id.
pub(crate) fn collect_neighbors(pixels: &[Pixel]) -> Vec<NeighborProbe> {
    struct Accumulator {
        distance: f32,
        solid_angle: f64,
        direction: DVec3,
        sh: Sh,
        pixels_count: u32,
    }

    let mut neighbors: FxHashMap<u32, Accumulator> = FxHashMap::default();

    for pixel in pixels {
        if pixel.neighbor_probe_id == NO_ID {
            continue;
        }

        let neighbor = neighbors
            .entry(pixel.neighbor_probe_id)
            .or_insert(Accumulator {
                distance: f32::MAX,
                solid_angle: 0.0,
                direction: DVec3::ZERO,
                sh: Sh::default(),
                pixels_count: 0,
            });

        neighbor.distance =
            neighbor.distance.min(pixel.neighbor_probe_distance);

        neighbor.solid_angle += pixel.solid_angle;
        neighbor.direction += pixel.solid_angle * pixel.view.as_dvec3();
        neighbor.pixels_count += 1;

        sh_accumulate(&mut neighbor.sh, &pixel.sh, pixel.solid_angle);
    }

    let mut neighbors: Vec<_> = neighbors
        .into_iter()
        .map(|(probe_id, neighbor)| NeighborProbe {
            probe_id,
            distance: neighbor.distance,
            solid_angle: neighbor.solid_angle,
            direction: neighbor.direction.as_vec3().normalize_or_zero(),
            sh: neighbor.sh,
            pixels_count: neighbor.pixels_count,
        })
        .collect();

    neighbors.sort_by_key(|neighbor| neighbor.probe_id);
    neighbors
}
