//! Fitting of the cloud and terrain shadow maps to the camera.

mod cloud_shadow;
mod cloud_slab;
mod config;
mod frustum;
mod terrain_shadow;

pub use self::cloud_shadow::*;
pub use self::cloud_slab::*;
pub use self::config::*;
pub use self::frustum::*;
pub use self::terrain_shadow::*;
