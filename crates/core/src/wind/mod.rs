//! Parametric wind fields: radial profiles, boundary-layer models, the
//! per-track hazard aggregation and gust file output

pub mod boundary_layer;
pub mod generator;
pub mod output;
pub mod profiles;

pub use boundary_layer::{WindField, WindFieldType};
pub use generator::{LocalWindField, TimeStepCallback, WindfieldGenerator};
pub use output::{gust_file_path, GlobalAttributes, GustFile};
pub use profiles::{Profile, ProfileType, VortexParams};
