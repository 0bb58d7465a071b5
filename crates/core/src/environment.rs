//! Environmental collaborators of the track generator
//!
//! The generator only needs three questions answered: is a position over
//! land, what is the environmental pressure there, and where does a new
//! cyclone form. Each is a small trait with a few shipped implementations
//! and a blanket impl for closures.

use crate::config::InputConfig;
use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::{CellGrid, GridLimit, GridSpace};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

/// Standard environmental pressure used when nothing else is configured (hPa)
pub const DEFAULT_ENV_PRESSURE_HPA: f64 = 1010.0;

// ============================================================================
// TRAITS
// ============================================================================

/// Land/sea classification of a position
pub trait LandfallModel: Send + Sync {
    fn on_land(&self, lon: f64, lat: f64) -> bool;
}

/// Environmental (ambient) surface pressure in hPa
pub trait PressureSampler: Send + Sync {
    fn sample(&self, lon: f64, lat: f64) -> f64;
}

/// Genesis location from two uniform deviates
pub trait OriginSampler: Send + Sync {
    fn ppf(&self, u: f64, v: f64) -> (f64, f64);
}

impl<F> LandfallModel for F
where
    F: Fn(f64, f64) -> bool + Send + Sync,
{
    fn on_land(&self, lon: f64, lat: f64) -> bool {
        self(lon, lat)
    }
}

impl<F> PressureSampler for F
where
    F: Fn(f64, f64) -> f64 + Send + Sync,
{
    fn sample(&self, lon: f64, lat: f64) -> f64 {
        self(lon, lat)
    }
}

impl<F> OriginSampler for F
where
    F: Fn(f64, f64) -> (f64, f64) + Send + Sync,
{
    fn ppf(&self, u: f64, v: f64) -> (f64, f64) {
        self(u, v)
    }
}

// ============================================================================
// LANDFALL
// ============================================================================

/// Every position is over sea
#[derive(Debug, Clone, Copy, Default)]
pub struct AllSea;

impl LandfallModel for AllSea {
    fn on_land(&self, _lon: f64, _lat: f64) -> bool {
        false
    }
}

/// Regular lon/lat land mask; rows run south to north.
///
/// Positions outside the raster are sea.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandMask {
    pub lon0: f64,
    pub lat0: f64,
    pub dlon: f64,
    pub dlat: f64,
    pub nx: usize,
    pub ny: usize,
    /// Row-major, 1 = land
    pub mask: Vec<u8>,
}

impl LandMask {
    pub fn new(lon0: f64, lat0: f64, dlon: f64, dlat: f64, nx: usize, ny: usize, mask: Vec<u8>) -> Result<Self> {
        let lm = Self {
            lon0,
            lat0,
            dlon,
            dlat,
            nx,
            ny,
            mask,
        };
        lm.check()?;
        Ok(lm)
    }

    fn check(&self) -> Result<()> {
        if self.mask.len() != self.nx * self.ny || self.dlon <= 0.0 || self.dlat <= 0.0 {
            return Err(CycloneError::InvalidConfig(format!(
                "land mask of {} cells does not match {}x{} at spacing ({}, {})",
                self.mask.len(),
                self.ny,
                self.nx,
                self.dlat,
                self.dlon
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let lm: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        lm.check()?;
        Ok(lm)
    }
}

impl LandfallModel for LandMask {
    fn on_land(&self, lon: f64, lat: f64) -> bool {
        let col = ((lon - self.lon0) / self.dlon).floor();
        let row = ((lat - self.lat0) / self.dlat).floor();
        if col < 0.0 || row < 0.0 || col >= self.nx as f64 || row >= self.ny as f64 {
            return false;
        }
        self.mask[row as usize * self.nx + col as usize] != 0
    }
}

// ============================================================================
// ENVIRONMENTAL PRESSURE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConstantPressure(pub f64);

impl Default for ConstantPressure {
    fn default() -> Self {
        Self(DEFAULT_ENV_PRESSURE_HPA)
    }
}

impl PressureSampler for ConstantPressure {
    fn sample(&self, _lon: f64, _lat: f64) -> f64 {
        self.0
    }
}

/// Gridded mean sea-level pressure (hPa) with bilinear interpolation.
///
/// Axes must be strictly increasing; positions beyond the axes are clamped
/// to the edge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PressureGrid {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    /// Row-major (lat, lon)
    pub values: Vec<f64>,
}

impl PressureGrid {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        let g = Self { lons, lats, values };
        g.check()?;
        Ok(g)
    }

    fn check(&self) -> Result<()> {
        let increasing = |v: &[f64]| v.windows(2).all(|w| w[1] > w[0]);
        if self.lons.is_empty()
            || self.lats.is_empty()
            || self.values.len() != self.lons.len() * self.lats.len()
            || !increasing(&self.lons)
            || !increasing(&self.lats)
        {
            return Err(CycloneError::InvalidConfig(format!(
                "pressure grid of {} values does not match {} lats x {} lons",
                self.values.len(),
                self.lats.len(),
                self.lons.len()
            )));
        }
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let g: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        g.check()?;
        Ok(g)
    }

    /// Lower bracketing index and weight of `x` on `axis`
    fn bracket(axis: &[f64], x: f64) -> (usize, f64) {
        if axis.len() == 1 || x <= axis[0] {
            return (0, 0.0);
        }
        let last = axis.len() - 1;
        if x >= axis[last] {
            return (last - 1, 1.0);
        }
        let hi = axis.partition_point(|&a| a <= x);
        let lo = hi - 1;
        (lo, (x - axis[lo]) / (axis[hi] - axis[lo]))
    }

    fn at(&self, row: usize, col: usize) -> f64 {
        let row = row.min(self.lats.len() - 1);
        let col = col.min(self.lons.len() - 1);
        self.values[row * self.lons.len() + col]
    }
}

impl PressureSampler for PressureGrid {
    fn sample(&self, lon: f64, lat: f64) -> f64 {
        let (c, wx) = Self::bracket(&self.lons, lon);
        let (r, wy) = Self::bracket(&self.lats, lat);
        let p00 = self.at(r, c);
        let p01 = self.at(r, c + 1);
        let p10 = self.at(r + 1, c);
        let p11 = self.at(r + 1, c + 1);
        (1.0 - wy) * ((1.0 - wx) * p00 + wx * p01) + wy * ((1.0 - wx) * p10 + wx * p11)
    }
}

// ============================================================================
// GENESIS
// ============================================================================

/// Gridded genesis probability density.
///
/// `ppf(u, v)` picks a latitude row from the marginal distribution with `u`
/// and a column within that row with `v`, returning the cell centre.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenesisPdf {
    /// Cell-centre longitudes
    pub lons: Vec<f64>,
    /// Cell-centre latitudes
    pub lats: Vec<f64>,
    /// Row-major (lat, lon) weights, need not be normalised
    pub pdf: Vec<f64>,
}

impl GenesisPdf {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, pdf: Vec<f64>) -> Result<Self> {
        let g = Self { lons, lats, pdf };
        g.check()?;
        Ok(g)
    }

    fn check(&self) -> Result<()> {
        if self.pdf.len() != self.lons.len() * self.lats.len()
            || self.pdf.iter().any(|&p| p < 0.0 || !p.is_finite())
            || self.pdf.iter().sum::<f64>() <= 0.0
        {
            return Err(CycloneError::InvalidConfig(
                "genesis pdf must be a non-empty, non-negative grid matching its axes".into(),
            ));
        }
        Ok(())
    }

    /// Histogram of genesis positions over the statistics cells
    pub fn from_points<I>(points: I, limit: GridLimit, space: GridSpace) -> Result<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let grid = CellGrid::new(limit, space);
        let mut counts = vec![0.0; grid.n_cells()];
        let mut n = 0usize;
        for (lon, lat) in points {
            if limit.contains(lon, lat) {
                counts[grid.cell_index(lon, lat)] += 1.0;
                n += 1;
            }
        }
        debug!("Genesis histogram from {n} points over {} cells", grid.n_cells());

        // Cells are numbered from the north; store rows south to north
        let lons = (0..grid.nx)
            .map(|i| limit.x_min + (i as f64 + 0.5) * space.x)
            .collect();
        let lats = (0..grid.ny)
            .rev()
            .map(|j| limit.y_max - (j as f64 + 0.5) * space.y)
            .collect();
        let pdf = (0..grid.ny)
            .rev()
            .flat_map(|row| counts[row * grid.nx..(row + 1) * grid.nx].to_vec())
            .collect();
        Self::new(lons, lats, pdf)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let g: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        g.check()?;
        Ok(g)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        Ok(())
    }

    /// First index whose running sum reaches `q` of `total`
    fn pick(weights: impl Iterator<Item = f64>, q: f64, total: f64, n: usize) -> usize {
        let target = q * total;
        let mut acc = 0.0;
        for (k, w) in weights.enumerate() {
            acc += w;
            if acc >= target && w > 0.0 {
                return k;
            }
        }
        n - 1
    }
}

impl OriginSampler for GenesisPdf {
    fn ppf(&self, u: f64, v: f64) -> (f64, f64) {
        let nx = self.lons.len();
        let row_sums: Vec<f64> = self.pdf.chunks(nx).map(|r| r.iter().sum()).collect();
        let total: f64 = row_sums.iter().sum();
        let row = Self::pick(row_sums.iter().copied(), u, total, self.lats.len());
        let cells = &self.pdf[row * nx..(row + 1) * nx];
        let col = Self::pick(cells.iter().copied(), v, row_sums[row], nx);
        (self.lons[col], self.lats[row])
    }
}

// ============================================================================
// BUNDLE
// ============================================================================

/// Landfall model and pressure sampler resolved from configuration
pub struct Environment {
    pub landfall: Box<dyn LandfallModel>,
    pub pressure: Box<dyn PressureSampler>,
}

impl Environment {
    #[must_use]
    pub fn new(landfall: Box<dyn LandfallModel>, pressure: Box<dyn PressureSampler>) -> Self {
        Self { landfall, pressure }
    }

    pub fn from_config(input: &InputConfig) -> Result<Self> {
        let landfall: Box<dyn LandfallModel> = match &input.land_mask {
            Some(path) => {
                info!("Loading land mask from {}", path.display());
                Box::new(LandMask::load(path)?)
            }
            None => Box::new(AllSea),
        };
        let pressure: Box<dyn PressureSampler> = match &input.mslp_grid {
            Some(path) => {
                info!("Loading MSLP grid from {}", path.display());
                Box::new(PressureGrid::load(path)?)
            }
            None => Box::new(ConstantPressure(
                input.env_pressure.unwrap_or(DEFAULT_ENV_PRESSURE_HPA),
            )),
        };
        Ok(Self { landfall, pressure })
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Box::new(AllSea), Box::new(ConstantPressure::default()))
    }
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment").finish_non_exhaustive()
    }
}
