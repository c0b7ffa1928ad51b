//! Encoding of light probes.
//!
//! A probe is captured as a cube map of scene attributes (positions, normals,
//! albedo etc.); the encoder segments that cube map into a bounded number of
//! surfaces, each of which gets projected onto spherical harmonics so that it
//! can be relit cheaply at runtime.

mod asset;
mod capture;
mod config;
mod cube_map;
mod debug;
mod encoder;
mod flood_fill;
mod neighbors;
mod pixel;
mod samples;
mod surface;

pub use self::capture::*;
pub use self::config::*;
pub use self::cube_map::*;
pub use self::encoder::*;
pub(crate) use self::flood_fill::*;
pub use self::neighbors::*;
pub use self::pixel::*;
pub use self::samples::*;
pub use self::surface::*;
