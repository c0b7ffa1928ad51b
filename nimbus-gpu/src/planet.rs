//! Planet-scale geometry: ray/sphere intersections against spheres concentric
//! with the planet.
//!
//! Everything here works in kilometers, in a frame where the ground right
//! below the origin sits at `y = 0` and the planet's center lies at
//! `(0, -GROUND_RADIUS_KM, 0)`.

use glam::{vec2, vec3, Vec2, Vec3};

use crate::F32Ext;

/// Radius of the planet, in kilometers.
pub const GROUND_RADIUS_KM: f32 = 6360.0;

/// Thickness of the atmosphere shell above the ground, in kilometers.
pub const ATMOSPHERE_THICKNESS_KM: f32 = 60.0;

/// Center of the planet.
pub const PLANET_CENTER_KM: Vec3 = vec3(0.0, -GROUND_RADIUS_KM, 0.0);

/// Distance returned when a ray misses the sphere it's tested against.
///
/// This is not a valid path length - callers have to check for it (e.g. with
/// [`is_hit()`]) before integrating along the ray.
pub const NO_HIT: f32 = f32::INFINITY;

/// Returns whether given intersection distance denotes an actual hit.
pub fn is_hit(distance: f32) -> bool {
    distance.is_finite()
}

/// Returns altitude (above the ground) and the up-vector at given position.
pub fn spherical_data(position_km: Vec3) -> (f32, Vec3) {
    let center_to_position = position_km - PLANET_CENTER_KM;
    let radius_km = center_to_position.length();

    (radius_km - GROUND_RADIUS_KM, center_to_position / radius_km)
}

/// Returns the cosine of the angle, measured from the local zenith, at which a
/// ray starting at given altitude grazes the ground.
///
/// Rays whose cosine is lower than this one hit the ground.
pub fn ground_tangent_cos_theta(altitude_km: f32) -> f32 {
    let radius_km = GROUND_RADIUS_KM + altitude_km.max(0.0);

    -(1.0 - (GROUND_RADIUS_KM / radius_km).sqr()).max(0.0).sqrt()
}

/// Solves the ray/sphere quadratic, returning `(b, delta)` such that hits are
/// at `-b ± delta`, or `None` when the ray misses the sphere.
///
/// `view` must be normalized, which is what allows us to use the reduced form
/// of the quadratic (`a = 1`).
fn solve(
    position_km: Vec3,
    view: Vec3,
    sphere_altitude_km: f32,
) -> Option<(f32, f32)> {
    let radius_km = GROUND_RADIUS_KM + sphere_altitude_km;
    let d = position_km - PLANET_CENTER_KM;
    let d_len = d.length();

    // Same as `d.dot(d) - r²`, but without subtracting two huge numbers from
    // each other
    let c = (d_len - radius_km) * (d_len + radius_km);
    let b = d.dot(view);
    let delta = b * b - c;

    if delta < 0.0 {
        None
    } else {
        Some((b, delta.sqrt()))
    }
}

/// Returns the distance to the nearest intersection of the ray with a sphere
/// of given altitude, or [`NO_HIT`].
///
/// The returned distance can be negative, if the sphere lies behind the ray.
pub fn sphere_intersect_enter(
    position_km: Vec3,
    view: Vec3,
    sphere_altitude_km: f32,
) -> f32 {
    match solve(position_km, view, sphere_altitude_km) {
        Some((b, delta)) => -b - delta,
        None => NO_HIT,
    }
}

/// Returns the distance to the farthest intersection of the ray with a sphere
/// of given altitude, or [`NO_HIT`].
pub fn sphere_intersect_exit(
    position_km: Vec3,
    view: Vec3,
    sphere_altitude_km: f32,
) -> f32 {
    match solve(position_km, view, sphere_altitude_km) {
        Some((b, delta)) => -b + delta,
        None => NO_HIT,
    }
}

/// Returns both the enter and exit distances (`x` and `y`, respectively), or
/// [`NO_HIT`] for both.
pub fn sphere_intersections(
    position_km: Vec3,
    view: Vec3,
    sphere_altitude_km: f32,
) -> Vec2 {
    match solve(position_km, view, sphere_altitude_km) {
        Some((b, delta)) => vec2(-b - delta, -b + delta),
        None => Vec2::splat(NO_HIT),
    }
}

/// Returns the distance to whatever the ray hits first: the ground or the top
/// of the atmosphere; the flag is set if that's the ground.
///
/// The ground counts only if it's hit in front of the ray and before leaving
/// the outer sphere. If nothing is hit (which cannot happen for rays starting
/// inside the shell), [`NO_HIT`] is returned.
pub fn nearest_hit(
    position_km: Vec3,
    view: Vec3,
    atmosphere_altitude_km: f32,
) -> (f32, bool) {
    let ground_hits = sphere_intersections(position_km, view, 0.0);

    let sphere_hit =
        sphere_intersect_exit(position_km, view, atmosphere_altitude_km);

    if is_hit(ground_hits.x)
        && ground_hits.x >= 0.0
        && ground_hits.x <= sphere_hit
    {
        (ground_hits.x, true)
    } else {
        (sphere_hit, false)
    }
}
