//! Historical statistics driving the track generator

pub mod cdf;
pub mod cell_stats;
pub mod store;

pub use cdf::{CdfTable, EmpiricalCdf};
pub use cell_stats::{ArCoefficients, CellStatistics, CoefficientGrid, Observation};
pub use store::{DistributionStore, InitialDistributions, ModelStatistics, Quantity, SizeDistribution};
