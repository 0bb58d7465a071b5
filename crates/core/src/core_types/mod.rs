//! Core types and utilities

pub mod error;
pub mod geo;
pub mod rng;
pub mod track;
pub mod units;

pub use error::{CycloneError, Result};
pub use geo::{bear2latlon, haversine_km, latlon2azi, CellGrid, GridLimit, GridSpace};
pub use rng::TrackRng;
pub use track::{Track, TrackId, TrackPoint};
pub use units::*;
