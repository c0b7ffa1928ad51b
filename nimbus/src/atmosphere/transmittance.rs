use std::mem;

use derivative::Derivative;
use glam::{uvec2, vec2, vec3, UVec2, Vec2, Vec3};
use log::debug;

use crate::{gpu, Error, Extinction, Result, StagingTexture};

/// Optical depth (per species) assigned to rays that hit the ground.
///
/// No light can come from there, but using infinity would overflow the
/// half-precision texture, so we settle for a value that's just "opaque".
pub const GROUND_HIT_OPTICAL_DEPTH: f32 = 1e5;

/// Rays start slightly above their nominal altitude, so that rays traced
/// exactly from the ground don't immediately hit it; near the top of the
/// atmosphere they get pulled back inside instead.
const RAY_START_OFFSET_KM: f32 = 1e-2;

/// Returns the optical depth of a single species with given reference
/// altitude, along a ray from given altitude up to the ground or the top of
/// the atmosphere (whichever comes first).
pub fn optical_depth(
    altitude_km: f32,
    cos_theta: f32,
    reference_altitude_km: f32,
    steps: u32,
) -> f32 {
    let altitude_km = (altitude_km + RAY_START_OFFSET_KM)
        .min(gpu::ATMOSPHERE_THICKNESS_KM - RAY_START_OFFSET_KM);

    let position = vec3(0.0, altitude_km, 0.0);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let view = vec3(sin_theta, cos_theta, 0.0);

    let (distance, is_ground) =
        gpu::nearest_hit(position, view, gpu::ATMOSPHERE_THICKNESS_KM);

    if is_ground {
        return GROUND_HIT_OPTICAL_DEPTH;
    }

    if !gpu::is_hit(distance) {
        return 0.0;
    }

    // Rays grazing the top of the atmosphere can get a slightly negative
    // exit distance due to rounding
    integrate_optical_depth(
        position,
        view,
        distance.max(0.0),
        reference_altitude_km,
        steps,
    )
}

/// Integrates `exp(-altitude / reference_altitude)` along given ray segment
/// using the trapezoidal rule, i.e. assuming altitude changes linearly
/// within each step.
pub fn integrate_optical_depth(
    position_km: Vec3,
    view: Vec3,
    distance_km: f32,
    reference_altitude_km: f32,
    steps: u32,
) -> f32 {
    let steps = steps.max(1);
    let step_km = distance_km / steps as f32;
    let falloff = -0.5 / reference_altitude_km;

    let mut prev_altitude_km = gpu::spherical_data(position_km).0;
    let mut sum = 0.0;

    for step in 1..=steps {
        let position_km = position_km + view * (step_km * step as f32);
        let (altitude_km, _) = gpu::spherical_data(position_km);

        sum += ((prev_altitude_km + altitude_km) * falloff).exp();
        prev_altitude_km = altitude_km;
    }

    sum * step_km
}

fn exp(val: Vec3) -> Vec3 {
    vec3(val.x.exp(), val.y.exp(), val.z.exp())
}

/// Lookup table of optical depths through the atmosphere, indexed by
/// view-angle (x) and altitude (y), both remapped non-linearly - see
/// [`gpu::transmittance_uv_to_params()`].
///
/// The table stores optical depths (extinction-weighted, summed over both
/// species) and not transmittances, so that it survives the trip through a
/// half-precision texture.
#[derive(Clone, Derivative)]
#[derivative(Debug)]
pub struct TransmittanceTable {
    size: UVec2,
    #[derivative(Debug = "ignore")]
    data: Vec<Vec3>,
}

impl TransmittanceTable {
    /// Builds the whole table at once.
    pub fn build(
        extinction: Extinction,
        size: UVec2,
        steps: u32,
    ) -> TransmittanceTable {
        let mut job = TransmittanceJob::new(extinction, size, steps);

        loop {
            if let Some(table) = job.step(u32::MAX) {
                return table;
            }
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    /// Returns optical depth stored in given texel.
    pub fn get(&self, x: u32, y: u32) -> Result<Vec3> {
        Error::check_index(x as usize, self.size.x as usize)?;
        Error::check_index(y as usize, self.size.y as usize)?;

        Ok(self.texel(x, y))
    }

    fn texel(&self, x: u32, y: u32) -> Vec3 {
        self.data[(y * self.size.x + x) as usize]
    }

    /// Returns optical depth from given altitude, looking in given direction,
    /// up to the ground or the top of the atmosphere.
    pub fn optical_depth(&self, altitude_km: f32, cos_theta: f32) -> Vec3 {
        let uv = gpu::transmittance_params_to_uv(altitude_km, cos_theta);

        self.sample(uv)
    }

    /// Returns transmittance from given altitude, looking in given direction,
    /// up to the ground or the top of the atmosphere.
    pub fn transmittance(&self, altitude_km: f32, cos_theta: f32) -> Vec3 {
        exp(-self.optical_depth(altitude_km, cos_theta))
    }

    /// Returns transmittance along a segment of given length.
    ///
    /// The segment's transmittance is the ratio of transmittances of two rays
    /// towards the atmosphere's boundary: one starting at the segment's
    /// beginning, one at its end. Rays going below the ground's tangent get
    /// evaluated backwards (from the end towards the beginning), so that we
    /// never divide by a ground-occluded value.
    pub fn transmittance_along(
        &self,
        altitude_km: f32,
        cos_theta: f32,
        distance_km: f32,
    ) -> Vec3 {
        // P0 = (0, radius), V = (sin theta, cos theta); done in doubles since
        // we're subtracting numbers on the order of the planet's radius
        let radius = (gpu::GROUND_RADIUS_KM + altitude_km) as f64;
        let cos_theta_64 = cos_theta as f64;
        let distance = distance_km as f64;

        let radius2 = (radius * radius
            + distance * distance
            + 2.0 * radius * cos_theta_64 * distance)
            .max(0.0)
            .sqrt();

        let cos_theta2 = if radius2 > 0.0 {
            ((radius * cos_theta_64 + distance) / radius2).clamp(-1.0, 1.0)
        } else {
            cos_theta_64
        };

        let altitude2_km = (radius2 - gpu::GROUND_RADIUS_KM as f64) as f32;
        let cos_theta2 = cos_theta2 as f32;

        let (depth0, depth1) =
            if cos_theta > gpu::ground_tangent_cos_theta(altitude_km) {
                (
                    self.optical_depth(altitude_km, cos_theta),
                    self.optical_depth(altitude2_km, cos_theta2),
                )
            } else {
                (
                    self.optical_depth(altitude2_km, -cos_theta2),
                    self.optical_depth(altitude_km, -cos_theta),
                )
            };

        exp(depth1 - depth0).min(Vec3::ONE)
    }

    /// Bilinearly samples the table at given normalized coordinates.
    fn sample(&self, uv: Vec2) -> Vec3 {
        let max = self.size - UVec2::ONE;
        let pos = uv.clamp(Vec2::ZERO, Vec2::ONE) * max.as_vec2();

        let x0 = (pos.x.floor() as u32).min(max.x);
        let y0 = (pos.y.floor() as u32).min(max.y);
        let x1 = (x0 + 1).min(max.x);
        let y1 = (y0 + 1).min(max.y);

        let fx = pos.x - x0 as f32;
        let fy = pos.y - y0 as f32;

        let v00 = self.texel(x0, y0);
        let v10 = self.texel(x1, y0);
        let v01 = self.texel(x0, y1);
        let v11 = self.texel(x1, y1);

        let v0 = v00.lerp(v10, fx);
        let v1 = v01.lerp(v11, fx);

        v0.lerp(v1, fy)
    }

    /// Returns the table converted into half-precision texels.
    pub fn texels(&self) -> Vec<gpu::TransmittanceTexel> {
        self.data
            .iter()
            .map(|&depth| gpu::TransmittanceTexel::new(depth))
            .collect()
    }

    /// Uploads the table into given staging texture.
    pub fn upload(&self, staging: &mut dyn StagingTexture) -> Result<()> {
        if staging.size() != self.size {
            return Err(Error::InvalidState(
                "staging texture's size doesn't match the transmittance table",
            ));
        }

        staging.write(&self.texels());

        Ok(())
    }
}

/// Builds a [`TransmittanceTable`] a couple of rows at a time, so that the
/// work can be spread over many frames.
///
/// The table gets returned only after the last row has been computed -
/// partial tables are never exposed.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct TransmittanceJob {
    extinction: Extinction,
    size: UVec2,
    steps: u32,
    #[derivative(Debug = "ignore")]
    data: Vec<Vec3>,
    next_row: u32,
}

impl TransmittanceJob {
    pub fn new(extinction: Extinction, size: UVec2, steps: u32) -> Self {
        // Each axis maps `0..=size-1` into `0.0..=1.0`, so it needs at least
        // two texels
        let size = size.max(uvec2(2, 2));

        Self {
            extinction,
            size,
            steps,
            data: Vec::with_capacity((size.x * size.y) as usize),
            next_row: 0,
        }
    }

    pub fn size(&self) -> UVec2 {
        self.size
    }

    pub fn is_done(&self) -> bool {
        self.next_row >= self.size.y
    }

    /// Returns the fraction of rows computed so far.
    pub fn progress(&self) -> f32 {
        self.next_row.min(self.size.y) as f32 / self.size.y as f32
    }

    /// Computes up to `rows` more rows, returning the table once it's
    /// complete.
    ///
    /// The table is returned exactly once; calling this function afterwards
    /// yields `None`.
    pub fn step(&mut self, rows: u32) -> Option<TransmittanceTable> {
        if self.is_done() {
            return None;
        }

        let end_row = self.next_row.saturating_add(rows).min(self.size.y);

        for y in self.next_row..end_row {
            self.compute_row(y);
        }

        self.next_row = end_row;

        if !self.is_done() {
            return None;
        }

        debug!(
            "Transmittance table completed ({}x{})",
            self.size.x, self.size.y
        );

        self.next_row = u32::MAX;

        Some(TransmittanceTable {
            size: self.size,
            data: mem::take(&mut self.data),
        })
    }

    fn compute_row(&mut self, y: u32) {
        let max = (self.size - UVec2::ONE).as_vec2();
        let v = y as f32 / max.y;

        for x in 0..self.size.x {
            let uv = vec2(x as f32 / max.x, v);
            let (altitude_km, cos_theta) = gpu::transmittance_uv_to_params(uv);

            self.data.push(self.compute_texel(altitude_km, cos_theta));
        }
    }

    fn compute_texel(&self, altitude_km: f32, cos_theta: f32) -> Vec3 {
        let rayleigh = optical_depth(
            altitude_km,
            cos_theta,
            self.extinction.rayleigh_reference_altitude_km,
            self.steps,
        );

        let mie = optical_depth(
            altitude_km,
            cos_theta,
            self.extinction.mie_reference_altitude_km,
            self.steps,
        );

        self.extinction.rayleigh * rayleigh + self.extinction.mie * mie
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    use super::*;
    use crate::{AtmosphereParams, CpuStagingTexture};

    fn extinction() -> Extinction {
        AtmosphereParams::default().extinction()
    }

    fn table() -> TransmittanceTable {
        TransmittanceTable::build(extinction(), uvec2(64, 32), 64)
    }

    #[test]
    fn optical_depth_grows_with_distance() {
        let position = vec3(0.0, 0.5, 0.0);

        for view in [Vec3::Y, vec3(1.0, 0.1, 0.0).normalize(), Vec3::X] {
            let mut prev = 0.0;

            for distance in [1.0, 2.0, 4.0, 8.0, 16.0, 32.0, 64.0] {
                let depth =
                    integrate_optical_depth(position, view, distance, 8.0, 64);

                assert!(depth > prev, "{depth} <= {prev}");

                prev = depth;
            }
        }
    }

    #[test]
    fn optical_depth_of_flat_air() {
        // With an enormous reference altitude density is ~1 everywhere, so the
        // optical depth is just the path's length
        let depth = integrate_optical_depth(Vec3::Y, Vec3::Y, 10.0, 1e9, 16);

        assert_relative_eq!(depth, 10.0, epsilon = 1e-3);
    }

    #[test]
    fn optical_depth_of_ground() {
        assert_eq!(
            GROUND_HIT_OPTICAL_DEPTH,
            optical_depth(1.0, -0.5, 8.0, 32)
        );

        // Flat-ground approximation: href / cos * exp(-altitude / href)
        assert_relative_eq!(
            optical_depth(1.0, 0.5, 8.0, 32),
            14.12,
            max_relative = 0.05
        );
    }

    #[test]
    fn table_grows_with_path_length() {
        let table = table();
        let max = (table.size() - UVec2::ONE).as_vec2();

        // For a fixed altitude, the view-angle grows with x, so the path gets
        // shorter
        for y in 0..table.size().y {
            for x in 1..table.size().x {
                let uv = vec2((x - 1) as f32, y as f32) / max;
                let (_, cos_theta) = gpu::transmittance_uv_to_params(uv);

                if cos_theta < 0.0 {
                    continue;
                }

                let lhs = table.get(x - 1, y).unwrap();
                let rhs = table.get(x, y).unwrap();

                // Paths near the top are centimeters long, where rounding
                // takes over
                assert!(
                    lhs.cmpge(rhs * (1.0 - 1e-3) - 1e-5).all(),
                    "x={x}, y={y}: {lhs} < {rhs}"
                );
            }
        }
    }

    #[test]
    fn optical_depth_at_the_top() {
        for cos_theta in [1.0, 0.5, 0.01, -0.1] {
            let depth = optical_depth(
                gpu::ATMOSPHERE_THICKNESS_KM,
                cos_theta,
                8.0,
                64,
            );

            assert!(depth >= 0.0, "cos_theta={cos_theta}: {depth}");
        }
    }

    #[test]
    fn table_is_non_negative() {
        let table = table();

        for y in 0..table.size().y {
            for x in 0..table.size().x {
                let depth = table.get(x, y).unwrap();

                assert!(depth.cmpge(Vec3::ZERO).all(), "x={x}, y={y}: {depth}");
            }
        }

        for (altitude, cos_theta) in [(60.0, 1.0), (100.0, 0.5), (59.0, 0.0)] {
            let transmittance = table.transmittance(altitude, cos_theta);

            assert!(transmittance.cmple(Vec3::ONE).all(), "{transmittance}");
        }
    }

    #[test]
    fn table_ground_hits_are_finite() {
        let table = table();
        let ground = table.get(0, 0).unwrap();

        let expected = (extinction().rayleigh + extinction().mie)
            * GROUND_HIT_OPTICAL_DEPTH;

        assert_relative_eq!(ground.x, expected.x, max_relative = 1e-5);
        assert_relative_eq!(ground.z, expected.z, max_relative = 1e-5);

        for texel in table.texels() {
            assert!(texel.optical_depth().is_finite());
        }
    }

    #[test]
    fn dense_fog_stays_finite() {
        let extinction = AtmosphereParams {
            fog_extinction: 1.0,
            ..Default::default()
        }
        .extinction();

        let table = TransmittanceTable::build(extinction, uvec2(8, 4), 16);
        let mut staging = CpuStagingTexture::new(uvec2(8, 4));

        table.upload(&mut staging).unwrap();

        for texel in staging.texels() {
            assert!(texel.optical_depth().is_finite());
        }

        // Ground hits saturate at the largest half-precision value
        assert_eq!(65504.0, table.texels()[0].optical_depth().x);
    }

    #[test]
    fn get_out_of_range() {
        let table = table();

        assert!(matches!(
            table.get(64, 0),
            Err(Error::IndexOutOfRange { index: 64, len: 64 })
        ));

        assert!(matches!(
            table.get(0, 32),
            Err(Error::IndexOutOfRange { index: 32, len: 32 })
        ));
    }

    #[test]
    fn sample_matches_texels() {
        let table = table();
        let size = table.size();

        for (x, y) in [(0, 0), (10, 3), (63, 31), (40, 20)] {
            let uv = vec2(x as f32, y as f32) / (size - UVec2::ONE).as_vec2();
            let (altitude, cos_theta) = gpu::transmittance_uv_to_params(uv);
            let expected = table.get(x, y).unwrap();
            let actual = table.optical_depth(altitude, cos_theta);

            assert_relative_eq!(expected.x, actual.x, max_relative = 1e-2);
            assert_relative_eq!(expected.z, actual.z, max_relative = 1e-2);
        }
    }

    #[test]
    fn transmittance_straight_up() {
        let table = table();
        let transmittance = table.transmittance(0.0, 1.0);

        // Blue gets scattered the most
        assert!(transmittance.x > transmittance.y);
        assert!(transmittance.y > transmittance.z);
        assert!(transmittance.cmpgt(Vec3::splat(0.5)).all());
        assert!(transmittance.cmple(Vec3::ONE).all());
    }

    #[test]
    fn transmittance_along_zero_distance() {
        let table = table();

        for (altitude, cos_theta) in
            [(0.0, 1.0), (1.5, 0.2), (10.0, -0.05), (30.0, -0.5), (0.5, -0.9)]
        {
            let transmittance =
                table.transmittance_along(altitude, cos_theta, 0.0);

            assert_abs_diff_eq!(transmittance.x, 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(transmittance.y, 1.0, epsilon = 1e-5);
            assert_abs_diff_eq!(transmittance.z, 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn transmittance_along_decreases_with_distance() {
        let table = table();
        let mut prev = Vec3::ONE;

        for distance in [1.0, 5.0, 20.0, 50.0] {
            let transmittance = table.transmittance_along(1.0, 0.3, distance);

            assert!(transmittance.cmple(prev + 1e-4).all());

            prev = transmittance;
        }

        assert!(prev.z < 1.0);
    }

    #[test]
    fn job_publishes_after_last_row() {
        let mut job = TransmittanceJob::new(extinction(), uvec2(16, 8), 16);

        assert!(job.step(3).is_none());
        assert!(job.step(3).is_none());
        assert!(!job.is_done());
        assert_relative_eq!(job.progress(), 0.75);

        let table = job.step(3).unwrap();

        assert!(job.is_done());
        assert!(job.step(3).is_none());

        let expected =
            TransmittanceTable::build(extinction(), uvec2(16, 8), 16);

        assert_eq!(expected.data, table.data);
    }

    #[test]
    fn upload() {
        let table = table();
        let mut staging = CpuStagingTexture::new(table.size());

        table.upload(&mut staging).unwrap();

        let texel = staging.texel(10, 20).unwrap();
        let expected = table.get(10, 20).unwrap();

        assert_relative_eq!(
            texel.optical_depth().y,
            expected.y,
            max_relative = 1e-3
        );

        let mut staging = CpuStagingTexture::new(uvec2(1, 1));

        assert!(matches!(
            table.upload(&mut staging),
            Err(Error::InvalidState(_))
        ));
    }
}
