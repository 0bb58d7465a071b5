//! Regional output grid and local polar patches

pub mod polar;
pub mod regional;

pub use polar::PolarPatch;
pub use regional::{RegionalField, RegionalGrid};
