//! Synthetic track generation and track files

pub mod generator;
pub mod interpolate;
pub mod io;
pub mod stepper;

pub use generator::{GenesisPoint, TrackGenerator};
pub use interpolate::{interpolate_track, Interpolation};
pub use io::{list_track_files, read_tracks, track_file_name, write_tracks, TRACK_FILE_HEADER};
pub use stepper::{TrackEnd, TrackStepper};
