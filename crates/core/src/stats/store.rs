//! Persisted statistics: initial-condition CDFs and AR(1) cell coefficients
//!
//! Everything lives as JSON under the process directory:
//!
//! ```text
//! all_cell_cdf_init_bearing.json   CdfTable
//! all_cell_cdf_init_speed.json     CdfTable
//! all_cell_cdf_init_pressure.json  CdfTable
//! all_cell_cdf_init_rmax.json      CdfTable (optional, log-normal fallback)
//! speed_stats.json                 CellStatistics
//! bearing_stats.json               ...
//! pressure_stats.json
//! pressure_rate_stats.json
//! size_rate_stats.json             (optional)
//! ```

use super::cdf::{CdfTable, EmpiricalCdf};
use super::cell_stats::{CellStatistics, CoefficientGrid, Observation};
use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::{CellGrid, GridSpace};
use crate::core_types::track::{Track, TrackPoint};
use crate::environment::LandfallModel;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Largest radius of the log-normal fallback size distribution (km)
pub const MAX_FALLBACK_RMAX_KM: f64 = 120.0;

/// Quantities with AR(1) cell statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Quantity {
    Speed,
    Bearing,
    Pressure,
    PressureRate,
    SizeRate,
}

impl Quantity {
    pub const ALL: [Quantity; 5] = [
        Quantity::Speed,
        Quantity::Bearing,
        Quantity::Pressure,
        Quantity::PressureRate,
        Quantity::SizeRate,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Quantity::Speed => "speed",
            Quantity::Bearing => "bearing",
            Quantity::Pressure => "pressure",
            Quantity::PressureRate => "pressure_rate",
            Quantity::SizeRate => "size_rate",
        }
    }

    /// Circular statistics apply
    #[must_use]
    pub fn is_angular(self) -> bool {
        self == Quantity::Bearing
    }

    fn file_name(self) -> String {
        format!("{}_stats.json", self.name())
    }

    /// Value of this quantity at `points[i]`; rates look one step ahead
    fn value_at(self, points: &[TrackPoint], i: usize) -> Option<f64> {
        let p = &points[i];
        let rate = |f: fn(&TrackPoint) -> f64| {
            let q = points.get(i + 1)?;
            let dt = q.age - p.age;
            (dt > 0.0).then(|| (f(q) - f(p)) / dt)
        };
        let v = match self {
            Quantity::Speed => Some(p.speed),
            Quantity::Bearing => Some(p.bearing.rem_euclid(360.0)),
            Quantity::Pressure => Some(p.central_pressure),
            Quantity::PressureRate => rate(|x| x.central_pressure),
            Quantity::SizeRate if p.rmax > 0.0 => rate(|x| x.rmax).filter(|_| points[i + 1].rmax > 0.0),
            Quantity::SizeRate => None,
        };
        v.filter(|x| x.is_finite())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// AR(1) statistics of every stepped quantity
#[derive(Debug, Clone, PartialEq)]
pub struct ModelStatistics {
    pub speed: CellStatistics,
    pub bearing: CellStatistics,
    pub pressure: CellStatistics,
    pub pressure_rate: CellStatistics,
    /// Absent when the history has no radius data
    pub size_rate: Option<CellStatistics>,
}

impl ModelStatistics {
    #[must_use]
    pub fn get(&self, quantity: Quantity) -> Option<&CellStatistics> {
        match quantity {
            Quantity::Speed => Some(&self.speed),
            Quantity::Bearing => Some(&self.bearing),
            Quantity::Pressure => Some(&self.pressure),
            Quantity::PressureRate => Some(&self.pressure_rate),
            Quantity::SizeRate => self.size_rate.as_ref(),
        }
    }
}

/// Initial radius of maximum winds distribution
#[derive(Debug, Clone, PartialEq)]
pub enum SizeDistribution {
    /// Per-cell CDFs from historical genesis points
    Cells(CdfTable),
    /// Domain-wide parametric fallback
    LogNormal(EmpiricalCdf),
}

impl SizeDistribution {
    #[must_use]
    pub fn get(&self, cell: usize) -> &EmpiricalCdf {
        match self {
            SizeDistribution::Cells(table) => table.get(cell),
            SizeDistribution::LogNormal(cdf) => cdf,
        }
    }
}

/// Initial-condition CDFs sampled at genesis
#[derive(Debug, Clone, PartialEq)]
pub struct InitialDistributions {
    pub bearing: CdfTable,
    pub speed: CdfTable,
    pub pressure: CdfTable,
    pub size: SizeDistribution,
}

/// JSON statistics store rooted at the process directory
#[derive(Debug, Clone)]
pub struct DistributionStore {
    dir: PathBuf,
    grid: CellGrid,
    grid_inc: GridSpace,
    size_mean: f64,
    size_std_dev: f64,
}

impl DistributionStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>, grid: CellGrid, grid_inc: GridSpace) -> Self {
        Self {
            dir: dir.into(),
            grid,
            grid_inc,
            size_mean: 57.0,
            size_std_dev: 0.6,
        }
    }

    /// Parameters of the log-normal fallback size distribution
    #[must_use]
    pub fn with_size_fallback(mut self, mean: f64, std_dev: f64) -> Self {
        self.size_mean = mean;
        self.size_std_dev = std_dev;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn grid(&self) -> CellGrid {
        self.grid
    }

    fn cdf_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("all_cell_cdf_init_{name}.json"))
    }

    fn stats_path(&self, quantity: Quantity) -> PathBuf {
        self.dir.join(quantity.file_name())
    }

    fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
        if !path.exists() {
            return Err(CycloneError::MissingDistribution(path.to_path_buf()));
        }
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)?;
        std::fs::write(path, serde_json::to_string(value)?)?;
        debug!("Wrote {}", path.display());
        Ok(())
    }

    fn fallback_size(&self) -> EmpiricalCdf {
        EmpiricalCdf::lognormal_size(self.size_mean, self.size_std_dev, MAX_FALLBACK_RMAX_KM)
    }

    /// Load the initial-condition CDFs.
    ///
    /// Bearing, speed and pressure are required; a missing size file falls
    /// back to the log-normal distribution.
    pub fn load(&self) -> Result<InitialDistributions> {
        let bearing = Self::read_json(&self.cdf_path("bearing"))?;
        let speed = Self::read_json(&self.cdf_path("speed"))?;
        let pressure = Self::read_json(&self.cdf_path("pressure"))?;
        let size = match Self::read_json(&self.cdf_path("rmax")) {
            Ok(table) => SizeDistribution::Cells(table),
            Err(CycloneError::MissingDistribution(path)) => {
                warn!(
                    "No size distribution at {}; using log-normal (mean {} km, sigma {})",
                    path.display(),
                    self.size_mean,
                    self.size_std_dev
                );
                SizeDistribution::LogNormal(self.fallback_size())
            }
            Err(e) => return Err(e),
        };
        info!("Loaded initial distributions from {}", self.dir.display());
        Ok(InitialDistributions {
            bearing,
            speed,
            pressure,
            size,
        })
    }

    /// Per-cell initial-condition CDFs from the first observation of each
    /// historical track inside the domain
    pub fn compute_initial_cdfs(&self, history: &[Track]) -> Result<InitialDistributions> {
        let genesis: Vec<(usize, &TrackPoint)> = history
            .iter()
            .filter_map(Track::first)
            .filter(|p| self.grid.limit.contains(p.lon, p.lat))
            .map(|p| (self.grid.cell_index(p.lon, p.lat), p))
            .collect();
        debug!("{} genesis points from {} historical tracks", genesis.len(), history.len());

        let table = |f: fn(&TrackPoint) -> f64| {
            CdfTable::from_samples(genesis.iter().map(|(c, p)| (*c, f(p))).filter(|(_, v)| v.is_finite()))
        };
        let no_data = || {
            CycloneError::InvalidConfig("historical tracks have no genesis points inside grid_limit".into())
        };
        let bearing = table(|p| p.bearing.rem_euclid(360.0)).ok_or_else(no_data)?;
        let speed = table(|p| p.speed).ok_or_else(no_data)?;
        let pressure = table(|p| p.central_pressure).ok_or_else(no_data)?;
        let size = CdfTable::from_samples(
            genesis
                .iter()
                .filter(|(_, p)| p.rmax > 0.0 && p.rmax.is_finite())
                .map(|(c, p)| (*c, p.rmax)),
        )
        .map_or_else(|| SizeDistribution::LogNormal(self.fallback_size()), SizeDistribution::Cells);

        Ok(InitialDistributions {
            bearing,
            speed,
            pressure,
            size,
        })
    }

    /// Per-quantity observations from historical tracks inside the domain
    pub fn observations(
        &self,
        history: &[Track],
        quantity: Quantity,
        landfall: &dyn LandfallModel,
    ) -> Vec<Observation> {
        let limit = self.grid.limit;
        let mut obs = Vec::new();
        for track in history {
            let pts = &track.points;
            for i in 0..pts.len() {
                let p = &pts[i];
                if !limit.contains(p.lon, p.lat) {
                    continue;
                }
                let Some(value) = quantity.value_at(pts, i) else {
                    continue;
                };
                let next = (i + 1 < pts.len())
                    .then(|| quantity.value_at(pts, i + 1))
                    .flatten();
                obs.push(Observation {
                    lon: p.lon,
                    lat: p.lat,
                    value,
                    next,
                    on_land: landfall.on_land(p.lon, p.lat),
                });
            }
        }
        obs
    }

    /// Coefficients of one quantity from historical tracks; `None` when no
    /// observation of it exists
    pub fn compute_cell_statistics(
        &self,
        history: &[Track],
        quantity: Quantity,
        landfall: &dyn LandfallModel,
        min_sample: usize,
    ) -> Option<CellStatistics> {
        let obs = self.observations(history, quantity, landfall);
        if obs.is_empty() {
            return None;
        }
        info!("Computing {quantity} statistics from {} observations", obs.len());
        Some(CellStatistics::compute(
            &obs,
            self.grid,
            self.grid_inc,
            min_sample,
            quantity.is_angular(),
        ))
    }

    fn load_cell_statistics(&self, quantity: Quantity) -> Result<CellStatistics> {
        let stats: CellStatistics = Self::read_json(&self.stats_path(quantity))?;
        if stats.nx != self.grid.nx || stats.ny != self.grid.ny {
            return Err(CycloneError::GridMismatch(format!(
                "{quantity} statistics are {}x{}, grid is {}x{}",
                stats.nx, stats.ny, self.grid.nx, self.grid.ny
            )));
        }
        let cells = stats.nx * stats.ny;
        if stats.sea.len() != cells || stats.land.len() != cells {
            return Err(CycloneError::GridMismatch(format!(
                "{quantity} statistics hold {} sea and {} land cells, grid has {cells}",
                stats.sea.len(),
                stats.land.len()
            )));
        }
        Ok(stats)
    }

    /// Load persisted coefficient sets, or compute them from `history` and
    /// persist them.
    ///
    /// Without history every required file must already exist.
    pub fn load_or_compute_cell_statistics(
        &self,
        history: Option<&[Track]>,
        landfall: &dyn LandfallModel,
        min_sample: usize,
    ) -> Result<ModelStatistics> {
        let get = |quantity: Quantity| -> Result<Option<CellStatistics>> {
            match self.load_cell_statistics(quantity) {
                Ok(stats) => Ok(Some(stats)),
                Err(CycloneError::MissingDistribution(path)) => {
                    let Some(history) = history else {
                        if quantity == Quantity::SizeRate {
                            return Ok(None);
                        }
                        return Err(CycloneError::MissingDistribution(path));
                    };
                    let stats = self.compute_cell_statistics(history, quantity, landfall, min_sample);
                    match &stats {
                        Some(s) => self.write_json(&path, s)?,
                        None if quantity == Quantity::SizeRate => {
                            debug!("No radius data in history; size stays constant");
                        }
                        None => {
                            return Err(CycloneError::InvalidConfig(format!(
                                "historical tracks have no {quantity} observations inside grid_limit"
                            )))
                        }
                    }
                    Ok(stats)
                }
                Err(e) => Err(e),
            }
        };

        let required = |s: Option<CellStatistics>| {
            s.ok_or_else(|| CycloneError::InvalidConfig("missing statistics".into()))
        };
        Ok(ModelStatistics {
            speed: required(get(Quantity::Speed)?)?,
            bearing: required(get(Quantity::Bearing)?)?,
            pressure: required(get(Quantity::Pressure)?)?,
            pressure_rate: required(get(Quantity::PressureRate)?)?,
            size_rate: get(Quantity::SizeRate)?,
        })
    }

    /// Persist initial-condition CDFs and coefficient sets
    pub fn save(&self, initial: &InitialDistributions, stats: &ModelStatistics) -> Result<()> {
        self.write_json(&self.cdf_path("bearing"), &initial.bearing)?;
        self.write_json(&self.cdf_path("speed"), &initial.speed)?;
        self.write_json(&self.cdf_path("pressure"), &initial.pressure)?;
        if let SizeDistribution::Cells(table) = &initial.size {
            self.write_json(&self.cdf_path("rmax"), table)?;
        }
        for quantity in Quantity::ALL {
            if let Some(s) = stats.get(quantity) {
                self.write_json(&self.stats_path(quantity), s)?;
            }
        }
        info!("Saved statistics to {}", self.dir.display());
        Ok(())
    }

    /// Coefficients of one quantity and regime as (lat, lon) grids
    #[must_use]
    pub fn coefficient_grid(
        stats: &ModelStatistics,
        quantity: Quantity,
        on_land: bool,
    ) -> Option<CoefficientGrid> {
        stats.get(quantity).map(|s| s.grid(on_land))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::GridLimit;
    use crate::environment::AllSea;
    use approx::assert_relative_eq;

    fn history() -> Vec<Track> {
        (0..6)
            .map(|k| {
                let points = (0..10)
                    .map(|i| {
                        let t = f64::from(i) * 6.0;
                        TrackPoint {
                            age: t,
                            lon: 150.0 + 0.3 * f64::from(i),
                            lat: -15.0 + 0.1 * f64::from(k),
                            speed: 20.0 + f64::from(k),
                            bearing: 90.0,
                            central_pressure: 1000.0 - t / 3.0,
                            env_pressure: 1010.0,
                            rmax: 40.0 + t / 6.0,
                        }
                    })
                    .collect();
                Track::new(k as usize + 1, points)
            })
            .collect()
    }

    fn store(dir: &Path) -> DistributionStore {
        let grid = CellGrid::new(GridLimit::new(140.0, 160.0, -20.0, -10.0), GridSpace::default());
        DistributionStore::new(dir, grid, GridSpace::default())
    }

    #[test]
    fn test_empty_coefficient_sets_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let empty = CellStatistics {
            nx: store.grid.nx,
            ny: store.grid.ny,
            sea: Vec::new(),
            land: Vec::new(),
        };
        store.write_json(&store.stats_path(Quantity::Speed), &empty).unwrap();
        let err = store
            .load_or_compute_cell_statistics(None, &AllSea, 5)
            .unwrap_err();
        assert!(matches!(err, CycloneError::GridMismatch(_)), "{err}");
    }

    #[test]
    fn test_missing_cdf_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path()).load().unwrap_err();
        assert!(matches!(err, CycloneError::MissingDistribution(_)));
    }

    #[test]
    fn test_missing_size_falls_back_to_lognormal() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let mut tracks = history();
        for t in &mut tracks {
            for p in &mut t.points {
                p.rmax = 0.0;
            }
        }
        let initial = s.compute_initial_cdfs(&tracks).unwrap();
        assert!(matches!(initial.size, SizeDistribution::LogNormal(_)));

        let stats = s.load_or_compute_cell_statistics(Some(tracks.as_slice()), &AllSea, 5).unwrap();
        assert!(stats.size_rate.is_none());
        s.save(&initial, &stats).unwrap();

        let loaded = s.load().unwrap();
        assert!(matches!(loaded.size, SizeDistribution::LogNormal(_)));
        assert_eq!(loaded.bearing, initial.bearing);
    }

    #[test]
    fn test_statistics_are_computed_then_reloaded() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let tracks = history();
        let computed = s.load_or_compute_cell_statistics(Some(tracks.as_slice()), &AllSea, 5).unwrap();
        assert!(dir.path().join("pressure_rate_stats.json").exists());
        assert!(computed.size_rate.is_some());

        // No history now; everything comes from disk
        let reloaded = s.load_or_compute_cell_statistics(None, &AllSea, 5).unwrap();
        assert_eq!(reloaded, computed);

        let cell = s.grid().cell_index(151.0, -14.5);
        let rate = computed.pressure_rate.coeffs(cell, false);
        assert_relative_eq!(rate.mu, -1.0 / 3.0, epsilon = 1e-9);
        assert_relative_eq!(computed.bearing.coeffs(cell, false).mu, 90.0, epsilon = 1e-9);

        let g = DistributionStore::coefficient_grid(&computed, Quantity::Speed, false).unwrap();
        assert_eq!(g.mu.shape(), (10, 20));
    }

    #[test]
    fn test_statistics_without_history_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(dir.path())
            .load_or_compute_cell_statistics(None, &AllSea, 5)
            .unwrap_err();
        assert!(matches!(err, CycloneError::MissingDistribution(_)));
    }

    #[test]
    fn test_initial_cdfs_use_genesis_cells() {
        let dir = tempfile::tempdir().unwrap();
        let s = store(dir.path());
        let initial = s.compute_initial_cdfs(&history()).unwrap();
        let cell = s.grid().cell_index(150.0, -15.0);
        assert_eq!(initial.speed.get(cell).ppf(0.0), 20.0);
        assert_eq!(initial.pressure.domain.ppf(1.0), 1000.0);
        assert_eq!(initial.size.get(cell).ppf(0.5), 40.0);
    }
}
