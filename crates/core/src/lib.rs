//! Tropical Cyclone Hazard Simulation Core Library
//!
//! Generates synthetic tropical-cyclone tracks with an AR(1) motion model
//! driven by per-cell statistics of historical tracks, and turns them into
//! near-surface wind and pressure hazard fields with parametric vortex
//! profiles and boundary-layer wind models.
//!
//! ## Stages
//!
//! - Statistics: initial-condition CDFs and per-cell land/sea AR(1)
//!   coefficients from historical tracks
//! - Track generation: Poisson cyclone counts per simulation, reproducible
//!   random substreams, landfall decay and validity filtering
//! - Wind fields: local polar evaluation around the eye spliced into a
//!   regional grid keeping the maximum gust and minimum pressure

// Core types and utilities
pub mod core_types;

pub mod config;
pub mod environment;
pub mod pipeline;

// Statistics and track simulation
pub mod stats;
pub mod track;

// Wind hazard
pub mod grid;
pub mod wind;

// Re-export core types
pub use core_types::{CellGrid, CycloneError, GridLimit, GridSpace, Result, Track, TrackId, TrackPoint, TrackRng};

pub use config::SimulationConfig;
pub use environment::{Environment, LandfallModel, OriginSampler, PressureSampler};
pub use pipeline::{partition, run_statistics, run_track_generation, run_windfield};
pub use stats::DistributionStore;
pub use track::{GenesisPoint, TrackGenerator};
pub use wind::{ProfileType, WindFieldType, WindfieldGenerator};
