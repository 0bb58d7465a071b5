//! Error type shared by every stage of the pipeline
//!
//! Only fatal conditions surface here: missing distribution files, unknown
//! model names, malformed input files. Per-track anomalies (runaway
//! deepening, radius collapse, domain exit) are corrected or filtered where
//! they happen and never become errors.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort a stage of the simulation.
#[derive(Error, Debug)]
pub enum CycloneError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A required empirical distribution file is absent. Statistics must
    /// exist before generation can start.
    #[error("distribution file {} does not exist", .0.display())]
    MissingDistribution(PathBuf),

    /// A profile or boundary-layer model name that is not implemented.
    #[error("unknown {kind} model '{name}'")]
    UnknownModel { kind: &'static str, name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Two regional fields cannot be combined because their grids differ.
    #[error("grid mismatch: {0}")]
    GridMismatch(String),

    #[error("parse error in {file} at row {row}: {msg}")]
    Parse {
        file: String,
        row: usize,
        msg: String,
    },
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CycloneError>;
