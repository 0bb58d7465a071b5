//! Simulation configuration
//!
//! One JSON document drives every stage. Each section has a `Default`, so a
//! configuration file only needs the keys it changes:
//!
//! ```json
//! {
//!   "region": { "xMin": 140.0, "xMax": 160.0, "yMin": -20.0, "yMax": -10.0 },
//!   "track_generator": { "num_simulations": 100, "years_per_simulation": 1.0 },
//!   "windfield": { "profile_type": "holland", "wind_field_type": "kepert" },
//!   "output": { "path": "output" }
//! }
//! ```

use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::{GridLimit, GridSpace};
use crate::track::Interpolation;
use crate::wind::{ProfileType, WindFieldType};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Track generator settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackGeneratorConfig {
    /// Domain in which tracks are simulated and statistics are gathered
    pub grid_limit: GridLimit,

    /// Statistics cell size (degrees)
    pub grid_space: GridSpace,

    /// Search-window growth for sparse statistics cells (degrees)
    pub grid_inc: GridSpace,

    /// Model time step (hours)
    pub time_step: f64,

    /// Maximum observations per track
    pub num_time_steps: usize,

    /// Number of simulation units; one track file per unit
    pub num_simulations: usize,

    pub years_per_simulation: f64,

    /// Mean annual genesis frequency in the domain
    pub frequency: f64,

    /// Seed of the cyclone-count stream
    pub genesis_seed: u64,

    /// Seed of the track stream
    pub track_seed: u64,

    /// Log-normal fallback size distribution: mean (km) and log std dev
    pub size_mean: f64,
    pub size_std_dev: f64,

    /// Minimum observations before a statistics cell stops widening
    pub min_sample: usize,

    /// Tracks that leave this box are discarded
    pub inner_grid_limit: Option<GridLimit>,

    /// Resampling of historical tracks to `time_step` before statistics
    pub interpolation: Interpolation,
}

impl Default for TrackGeneratorConfig {
    fn default() -> Self {
        Self {
            grid_limit: GridLimit::default(),
            grid_space: GridSpace::default(),
            grid_inc: GridSpace::default(),
            time_step: 1.0,
            num_time_steps: 360,
            num_simulations: 50,
            years_per_simulation: 10.0,
            frequency: 10.0,
            genesis_seed: 1,
            track_seed: 1,
            size_mean: 57.0,
            size_std_dev: 0.6,
            min_sample: 100,
            inner_grid_limit: None,
            interpolation: Interpolation::default(),
        }
    }
}

/// Wind field settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WindfieldConfig {
    pub profile_type: ProfileType,
    pub wind_field_type: WindFieldType,

    /// Holland β
    pub beta: f64,
    /// Double-Holland inner and outer β
    pub beta1: f64,
    pub beta2: f64,
    /// Double-Holland secondary maximum radius (km)
    pub rmax2: f64,

    /// Angle from the heading to the maximum-wind azimuth (degrees)
    pub theta_max: f64,

    /// Half-width of the local patch around the eye (degrees)
    pub margin: f64,

    /// Regional grid spacing (degrees)
    pub resolution: f64,

    /// Mean-wind to 3-second gust factor
    pub gust_factor: f64,

    /// Windfield region; falls back to the top-level `region`, then to the
    /// envelope of the tracks in each file
    pub grid_limit: Option<GridLimit>,
}

impl Default for WindfieldConfig {
    fn default() -> Self {
        Self {
            profile_type: ProfileType::default(),
            wind_field_type: WindFieldType::default(),
            beta: 1.5,
            beta1: 1.5,
            beta2: 1.4,
            rmax2: crate::wind::profiles::constants::DEFAULT_RMAX2_KM,
            theta_max: crate::wind::boundary_layer::constants::DEFAULT_THETA_MAX_DEG,
            margin: 2.0,
            resolution: 0.05,
            gust_factor: 1.23,
            grid_limit: None,
        }
    }
}

/// Input data locations and environment fallbacks
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    /// Historical tracks (track file format) used to build statistics
    pub historical_tracks: Option<PathBuf>,

    /// Mean sea-level pressure grid (JSON); constant pressure when absent
    pub mslp_grid: Option<PathBuf>,

    /// Land mask (JSON); all-sea when absent
    pub land_mask: Option<PathBuf>,

    /// Environmental pressure when no grid is given (hPa)
    pub env_pressure: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("output"),
        }
    }
}

/// False for zero, negative and NaN
#[inline]
fn positive(x: f64) -> bool {
    x > 0.0
}

/// Complete configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Region of interest for the wind hazard
    pub region: Option<GridLimit>,
    pub track_generator: TrackGeneratorConfig,
    pub windfield: WindfieldConfig,
    pub input: InputConfig,
    pub output: OutputConfig,
    /// Worker threads; 0 uses every available core
    pub workers: usize,
}

impl SimulationConfig {
    /// Read and validate a JSON configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Reject settings the simulation cannot run with
    pub fn validate(&self) -> Result<()> {
        let tg = &self.track_generator;
        let wf = &self.windfield;
        let fail = |msg: String| Err(CycloneError::InvalidConfig(msg));

        if !positive(tg.time_step) {
            return fail(format!("time_step must be positive, got {}", tg.time_step));
        }
        if tg.num_time_steps == 0 {
            return fail("num_time_steps must be at least 1".into());
        }
        if !(positive(tg.grid_space.x) && positive(tg.grid_space.y)) {
            return fail(format!("grid_space must be positive, got {:?}", tg.grid_space));
        }
        if !(positive(tg.grid_inc.x) && positive(tg.grid_inc.y)) {
            return fail(format!("grid_inc must be positive, got {:?}", tg.grid_inc));
        }
        let lim = tg.grid_limit;
        if !(positive(lim.x_max - lim.x_min) && positive(lim.y_max - lim.y_min)) {
            return fail(format!("grid_limit is empty: {lim:?}"));
        }
        if tg.frequency < 0.0 || tg.years_per_simulation < 0.0 {
            return fail("frequency and years_per_simulation must be non-negative".into());
        }
        if !positive(wf.resolution) || wf.margin < 0.0 {
            return fail(format!(
                "windfield resolution {} / margin {} out of range",
                wf.resolution, wf.margin
            ));
        }
        if !positive(wf.gust_factor) {
            return fail(format!("gust_factor must be positive, got {}", wf.gust_factor));
        }
        Ok(())
    }

    /// Windfield region: windfield override, then the global region
    #[must_use]
    pub fn windfield_region(&self) -> Option<GridLimit> {
        self.windfield.grid_limit.or(self.region)
    }

    #[must_use]
    pub fn track_path(&self) -> PathBuf {
        self.output.path.join("tracks")
    }

    #[must_use]
    pub fn process_path(&self) -> PathBuf {
        self.output.path.join("process")
    }

    #[must_use]
    pub fn windfield_path(&self) -> PathBuf {
        self.output.path.join("windfield")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{
            "region": { "xMin": 140.0, "xMax": 160.0, "yMin": -20.0, "yMax": -10.0 },
            "track_generator": { "time_step": 6.0 },
            "windfield": { "profile_type": "doubleholland", "wind_field_type": "hubbert" }
        }"#;
        let config: SimulationConfig = serde_json::from_str(json).unwrap();
        config.validate().unwrap();
        assert_eq!(config.track_generator.time_step, 6.0);
        assert_eq!(config.track_generator.min_sample, 100);
        assert_eq!(config.windfield.profile_type, ProfileType::DoubleHolland);
        assert_eq!(config.windfield.wind_field_type, WindFieldType::Hubbert);
        assert_eq!(config.windfield.gust_factor, 1.23);
        assert_eq!(config.windfield_region(), config.region);
    }

    #[test]
    fn test_unknown_profile_name_fails_to_parse() {
        let json = r#"{ "windfield": { "profile_type": "lorentz" } }"#;
        assert!(serde_json::from_str::<SimulationConfig>(json).is_err());
    }

    #[test]
    fn test_validate_rejects_zero_time_step() {
        let config = SimulationConfig {
            track_generator: TrackGeneratorConfig {
                time_step: 0.0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CycloneError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let config = SimulationConfig {
            workers: 3,
            windfield: WindfieldConfig {
                profile_type: ProfileType::Willoughby,
                ..Default::default()
            },
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = SimulationConfig::load(&path).unwrap();
        assert_eq!(loaded.workers, 3);
        assert_eq!(loaded.windfield.profile_type, ProfileType::Willoughby);
        assert_eq!(loaded.track_path(), PathBuf::from("output").join("tracks"));
    }
}
