use std::f32::consts::FRAC_PI_4;

use glam::{uvec2, vec3, UVec2, Vec3};

use crate::gpu;

/// Parameters of the atmosphere, as exposed to users.
///
/// Values are taken as-is (validating them is up to whoever loads them).
#[derive(Clone, Debug, PartialEq)]
pub struct AtmosphereParams {
    /// Sun's zenith angle, in radians.
    pub sun_theta: f32,

    /// Sun's azimuth, in radians.
    pub sun_phi: f32,

    pub sun_intensity: f32,

    /// Multiplier of the default Rayleigh scattering coefficients.
    pub air_amount: f32,
    pub air_reference_altitude_km: f32,

    pub fog_scattering: f32,
    pub fog_extinction: f32,
    pub fog_reference_altitude_km: f32,
    pub fog_anisotropy: f32,

    pub average_ground_reflectance: f32,
}

impl AtmosphereParams {
    /// Rayleigh scattering coefficients (1/km) for `air_amount = 1.0`.
    pub const RAYLEIGH_SCATTERING: Vec3 = vec3(0.0058, 0.0135, 0.0331);

    pub fn light_direction(&self) -> Vec3 {
        gpu::light_direction(self.sun_theta, self.sun_phi)
    }

    pub fn extinction(&self) -> Extinction {
        Extinction {
            rayleigh: self.air_amount * Self::RAYLEIGH_SCATTERING,
            rayleigh_reference_altitude_km: self.air_reference_altitude_km,
            mie: Vec3::splat(self.fog_extinction),
            mie_reference_altitude_km: self.fog_reference_altitude_km,
        }
    }

    /// Returns whether switching from `self` to `other` invalidates the
    /// transmittance table (and other tables derived from the medium).
    ///
    /// Sun's position and intensity don't affect the medium, so they are not
    /// taken into account.
    pub fn requires_rebuild(&self, other: &Self) -> bool {
        let pairs = [
            (self.air_amount, other.air_amount),
            (self.air_reference_altitude_km, other.air_reference_altitude_km),
            (self.fog_scattering, other.fog_scattering),
            (self.fog_extinction, other.fog_extinction),
            (self.fog_reference_altitude_km, other.fog_reference_altitude_km),
            (self.fog_anisotropy, other.fog_anisotropy),
            (
                self.average_ground_reflectance,
                other.average_ground_reflectance,
            ),
        ];

        pairs.into_iter().any(|(a, b)| !gpu::almost_eq(a, b))
    }
}

impl Default for AtmosphereParams {
    fn default() -> Self {
        Self {
            sun_theta: FRAC_PI_4,
            sun_phi: 0.0,
            sun_intensity: 100.0,
            air_amount: 1.0,
            air_reference_altitude_km: 8.0,
            fog_scattering: 0.004,
            fog_extinction: 0.004 / 0.9,
            fog_reference_altitude_km: 1.2,
            fog_anisotropy: 0.76,
            average_ground_reflectance: 0.1,
        }
    }
}

/// Extinction coefficients (1/km) and reference altitudes of both species
/// making up the atmosphere.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Extinction {
    pub rayleigh: Vec3,
    pub rayleigh_reference_altitude_km: f32,
    pub mie: Vec3,
    pub mie_reference_altitude_km: f32,
}

/// Resolution and quality of the transmittance table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransmittanceConfig {
    /// Number of view-angle buckets.
    pub width: u32,

    /// Number of altitude buckets.
    pub height: u32,

    /// Number of integration steps per texel.
    pub steps: u32,
}

impl TransmittanceConfig {
    /// Returns the table's size; each axis spans at least two texels.
    pub fn size(&self) -> UVec2 {
        uvec2(self.width, self.height).max(uvec2(2, 2))
    }
}

impl Default for TransmittanceConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 64,
            steps: 128,
        }
    }
}
