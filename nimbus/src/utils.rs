mod bounding_box;
mod metrics;

pub use self::bounding_box::*;
pub use self::metrics::*;
