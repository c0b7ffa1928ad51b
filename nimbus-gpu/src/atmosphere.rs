use bytemuck::{Pod, Zeroable};
use glam::{vec2, vec3, Vec2, Vec3, Vec4};
use half::f16;

use crate::{lerp, F32Ext, ATMOSPHERE_THICKNESS_KM, GROUND_RADIUS_KM};

/// Controls the tangential remapping of the transmittance table's view-angle
/// axis; the closer to `PI / 2`, the more texels end up near the horizon.
pub const TRANSMITTANCE_TAN_MAX: f32 = 1.5;

/// Returns direction *towards* the sun, given its zenith angle (`theta`) and
/// azimuth (`phi`).
pub fn light_direction(theta: f32, phi: f32) -> Vec3 {
    vec3(phi.sin() * theta.sin(), theta.cos(), -phi.cos() * theta.sin())
}

/// Returns the lowest view-angle cosine stored in the transmittance table
/// for given altitude.
///
/// By default that's a fixed value, slightly below the ground's tangent at
/// the top of the atmosphere; with `precise-cos-theta-min` it follows the
/// actual ground tangent at each altitude.
pub fn cos_theta_min(altitude_km: f32) -> f32 {
    if cfg!(feature = "precise-cos-theta-min") {
        let radius_km = GROUND_RADIUS_KM + 1e-2 + altitude_km.max(0.0);

        -1e-2 - (1.0 - (GROUND_RADIUS_KM / radius_km).sqr()).max(0.0).sqrt()
    } else {
        -0.15
    }
}

/// Maps normalized table coordinates (`u` for the view angle, `v` for the
/// altitude, both within `<0.0, 1.0>`) into `(altitude_km, cos_theta)`.
///
/// Altitude grows quadratically (more texels near the ground), the view
/// angle tangentially (more texels near the horizon).
pub fn transmittance_uv_to_params(uv: Vec2) -> (f32, f32) {
    let altitude_km = uv.y * uv.y * ATMOSPHERE_THICKNESS_KM;

    let t = (TRANSMITTANCE_TAN_MAX * uv.x).tan() / TRANSMITTANCE_TAN_MAX.tan();
    let cos_theta = lerp(cos_theta_min(altitude_km), 1.0, t);

    (altitude_km, cos_theta)
}

/// Inverse of [`transmittance_uv_to_params()`]; out-of-table parameters are
/// clamped to the table's edges.
pub fn transmittance_params_to_uv(altitude_km: f32, cos_theta: f32) -> Vec2 {
    let altitude_km = altitude_km.clamp(0.0, ATMOSPHERE_THICKNESS_KM);
    let v = (altitude_km / ATMOSPHERE_THICKNESS_KM).sqrt();

    let cos_theta_min = cos_theta_min(altitude_km);
    let t = ((cos_theta - cos_theta_min) / (1.0 - cos_theta_min)).saturate();
    let u = (t * TRANSMITTANCE_TAN_MAX.tan()).atan() / TRANSMITTANCE_TAN_MAX;

    vec2(u.saturate(), v.saturate())
}

/// Half-precision texel of the transmittance texture: optical depth in RGB,
/// alpha unused.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TransmittanceTexel(pub [f16; 4]);

impl TransmittanceTexel {
    /// Creates a texel; depths beyond what half-precision can represent are
    /// clamped to [`f16::MAX`], which is just as opaque.
    pub fn new(optical_depth: Vec3) -> Self {
        let optical_depth = optical_depth.min(Vec3::splat(f16::MAX.to_f32()));

        Self([
            f16::from_f32(optical_depth.x),
            f16::from_f32(optical_depth.y),
            f16::from_f32(optical_depth.z),
            f16::ZERO,
        ])
    }

    pub fn optical_depth(self) -> Vec3 {
        vec3(self.0[0].to_f32(), self.0[1].to_f32(), self.0[2].to_f32())
    }
}

/// Atmosphere parameters, as seen by the shaders.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct AtmosphereUniform {
    /// x, y, z - direction towards the sun
    /// w - sun's intensity
    pub light_direction: Vec4,

    /// x, y, z - Rayleigh scattering coefficients (1/km)
    /// w - Rayleigh reference altitude (km)
    pub air: Vec4,

    /// x - Mie scattering coefficient (1/km)
    /// y - Mie extinction coefficient (1/km)
    /// z - Mie reference altitude (km)
    /// w - Mie anisotropy
    pub fog: Vec4,

    /// x - lowest view-angle cosine stored at the ground
    /// y - tangential remapping factor
    /// z - atmosphere's thickness (km)
    /// w - average ground reflectance
    pub transmittance: Vec4,
}

impl AtmosphereUniform {
    pub fn light_direction(&self) -> Vec3 {
        self.light_direction.truncate()
    }

    pub fn sun_intensity(&self) -> f32 {
        self.light_direction.w
    }
}
