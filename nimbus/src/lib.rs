//! Host-side core of the sky renderer: precomputed atmosphere tables, shadow
//! map fitting for clouds and terrain, and the light probe encoder.
//!
//! Everything that gets shared with shaders lives in [`gpu`].

mod atmosphere;
mod error;
mod probe;
mod shadow;
mod utils;

pub use nimbus_gpu as gpu;

pub use self::atmosphere::*;
pub use self::error::*;
pub use self::probe::*;
pub use self::shadow::*;
pub use self::utils::*;
