//! Data layouts and math kernels shared between Nimbus' host-side
//! precomputations and its shaders.
//!
//! Everything in here is plain-old-data (`#[repr(C)]` + [`bytemuck::Pod`]) or
//! pure functions, so that both sides of the pipeline agree bit-for-bit on
//! what a texel, a constant buffer or a ray/sphere hit is.

#![allow(clippy::manual_range_contains)]

mod atmosphere;
mod planet;
mod sh;
mod shadow;
mod utils;

pub use self::atmosphere::*;
pub use self::planet::*;
pub use self::sh::*;
pub use self::shadow::*;
pub use self::utils::*;

pub mod prelude {
    pub use core::f32::consts::PI;

    pub use glam::*;

    pub use crate::*;
}
