//! Regional centidegree grid and the running-extreme wind/pressure field
//!
//! The region is laid out on an integer grid in hundredths of a degree so
//! that local patches around every track position line up exactly with the
//! regional nodes:
//!
//! ```text
//! min_lat = 100·yMin − margin     max_lat = 100·yMax + margin
//! min_lon = 100·xMin − margin     max_lon = 100·xMax + margin
//! lat_j   = min_lat + j·step      lon_i   = min_lon + i·step
//! ```
//!
//! A [`RegionalField`] keeps, per node, the maximum gust seen so far with
//! its bearing and components, and independently the minimum pressure.

use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::GridLimit;
use nalgebra::DMatrix;
use std::ops::Range;

/// Centidegree grid covering a region plus margin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionalGrid {
    pub min_lon: i64,
    pub max_lon: i64,
    pub min_lat: i64,
    pub max_lat: i64,
    /// Node spacing (centidegrees)
    pub step: i64,
    /// Patch half-width (centidegrees)
    pub margin: i64,
    nx: usize,
    ny: usize,
}

/// Degrees to the nearest centidegree.
///
/// Rounds rather than truncates: `100.0 * 0.29` is `28.999..` and truncation
/// would also move negative coordinates such as -15.999° a node north.
#[inline]
fn centi(deg: f64) -> i64 {
    (100.0 * deg).round() as i64
}

impl RegionalGrid {
    pub fn new(limit: GridLimit, margin_deg: f64, resolution_deg: f64) -> Result<Self> {
        let step = centi(resolution_deg);
        let margin = centi(margin_deg);
        if step <= 0 {
            return Err(CycloneError::InvalidConfig(format!(
                "windfield resolution {resolution_deg}° is below one centidegree"
            )));
        }
        if margin < 0 || limit.x_max < limit.x_min || limit.y_max < limit.y_min {
            return Err(CycloneError::InvalidConfig(format!(
                "degenerate windfield region {limit:?} with margin {margin_deg}°"
            )));
        }

        let min_lon = centi(limit.x_min) - margin;
        let max_lon = centi(limit.x_max) + margin;
        let min_lat = centi(limit.y_min) - margin;
        let max_lat = centi(limit.y_max) + margin;

        Ok(Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
            step,
            margin,
            nx: ((max_lon - min_lon) / step + 1) as usize,
            ny: ((max_lat - min_lat) / step + 1) as usize,
        })
    }

    #[must_use]
    pub fn nx(&self) -> usize {
        self.nx
    }

    #[must_use]
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// Longitude of column `i` (degrees)
    #[must_use]
    pub fn lon(&self, i: usize) -> f64 {
        (self.min_lon + i as i64 * self.step) as f64 / 100.0
    }

    /// Latitude of row `j` (degrees)
    #[must_use]
    pub fn lat(&self, j: usize) -> f64 {
        (self.min_lat + j as i64 * self.step) as f64 / 100.0
    }

    #[must_use]
    pub fn lons(&self) -> Vec<f64> {
        (0..self.nx).map(|i| self.lon(i)).collect()
    }

    #[must_use]
    pub fn lats(&self) -> Vec<f64> {
        (0..self.ny).map(|j| self.lat(j)).collect()
    }

    /// Rows and columns of the patch within ±margin of (`lon`, `lat`).
    ///
    /// The eye is snapped to its nearest node; the patch is clipped to the
    /// grid and may be empty when the eye lies far outside it.
    #[must_use]
    pub fn patch_around(&self, lon: f64, lat: f64) -> (Range<usize>, Range<usize>) {
        let half = self.margin / self.step;
        let snap = |deg: f64, origin: i64, n: usize| -> Range<usize> {
            let c = ((100.0 * deg - origin as f64) / self.step as f64).round() as i64;
            let lo = (c - half).clamp(0, n as i64);
            let hi = (c + half + 1).clamp(0, n as i64);
            lo as usize..hi.max(lo) as usize
        };
        (
            snap(lat, self.min_lat, self.ny),
            snap(lon, self.min_lon, self.nx),
        )
    }
}

/// Running extremes over a [`RegionalGrid`]; matrices are (lat, lon).
#[derive(Debug, Clone, PartialEq)]
pub struct RegionalField {
    pub grid: RegionalGrid,
    /// Maximum gust (m/s)
    pub gust: DMatrix<f64>,
    /// Direction the max gust blows from (degrees)
    pub bearing: DMatrix<f64>,
    /// Eastward component at max gust (m/s)
    pub ux: DMatrix<f64>,
    /// Northward component at max gust (m/s)
    pub vy: DMatrix<f64>,
    /// Minimum pressure (Pa)
    pub pressure: DMatrix<f64>,
}

impl RegionalField {
    /// Calm field at uniform `env_pressure` (Pa)
    #[must_use]
    pub fn new(grid: RegionalGrid, env_pressure: f64) -> Self {
        let (ny, nx) = (grid.ny(), grid.nx());
        Self {
            grid,
            gust: DMatrix::zeros(ny, nx),
            bearing: DMatrix::zeros(ny, nx),
            ux: DMatrix::zeros(ny, nx),
            vy: DMatrix::zeros(ny, nx),
            pressure: DMatrix::from_element(ny, nx, env_pressure),
        }
    }

    /// Apply the update rule at one node.
    ///
    /// Equal non-zero gusts keep the larger (bearing, ux, vy), so folding
    /// the same observations in any order gives the same node.
    #[inline]
    pub fn update(&mut self, j: usize, i: usize, gust: f64, bearing: f64, ux: f64, vy: f64, p: f64) {
        let current = self.gust[(j, i)];
        let wins = gust > current
            || (gust == current
                && gust > 0.0
                && bearing
                    .total_cmp(&self.bearing[(j, i)])
                    .then(ux.total_cmp(&self.ux[(j, i)]))
                    .then(vy.total_cmp(&self.vy[(j, i)]))
                    .is_gt());
        if wins {
            self.gust[(j, i)] = gust;
            self.bearing[(j, i)] = bearing;
            self.ux[(j, i)] = ux;
            self.vy[(j, i)] = vy;
        }
        // NaN-initialised nodes take the first real pressure
        if p < self.pressure[(j, i)] || self.pressure[(j, i)].is_nan() {
            self.pressure[(j, i)] = p;
        }
    }

    /// Fold another field over the same grid into this one
    pub fn merge(&mut self, other: &RegionalField) -> Result<()> {
        if self.grid != other.grid {
            return Err(CycloneError::GridMismatch(format!(
                "{}x{} grid at ({}, {}) cannot absorb {}x{} grid at ({}, {})",
                self.grid.ny(),
                self.grid.nx(),
                self.grid.min_lat,
                self.grid.min_lon,
                other.grid.ny(),
                other.grid.nx(),
                other.grid.min_lat,
                other.grid.min_lon,
            )));
        }
        for i in 0..self.grid.nx() {
            for j in 0..self.grid.ny() {
                self.update(
                    j,
                    i,
                    other.gust[(j, i)],
                    other.bearing[(j, i)],
                    other.ux[(j, i)],
                    other.vy[(j, i)],
                    other.pressure[(j, i)],
                );
            }
        }
        Ok(())
    }

    /// Largest gust anywhere in the field
    #[must_use]
    pub fn peak_gust(&self) -> f64 {
        self.gust.max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn grid() -> RegionalGrid {
        RegionalGrid::new(GridLimit::new(150.0, 152.0, -16.0, -14.0), 1.0, 0.1).unwrap()
    }

    #[test]
    fn test_grid_axes() {
        let g = grid();
        assert_eq!(g.min_lon, 14900);
        assert_eq!(g.max_lat, -1300);
        assert_eq!(g.nx(), 41);
        assert_eq!(g.ny(), 41);
        assert_relative_eq!(g.lon(0), 149.0);
        assert_relative_eq!(g.lat(40), -13.0);
    }

    #[test]
    fn test_rejects_sub_centidegree_resolution() {
        let err = RegionalGrid::new(GridLimit::new(0.0, 1.0, 0.0, 1.0), 1.0, 0.001);
        assert!(matches!(err, Err(CycloneError::InvalidConfig(_))));
    }

    #[test]
    fn test_patch_snaps_and_clips() {
        let g = grid();
        let (rows, cols) = g.patch_around(151.02, -15.0);
        assert_eq!(cols, 10..31);
        assert_eq!(rows, 10..31);

        let (rows, cols) = g.patch_around(149.2, -13.1);
        assert_eq!(cols.start, 0);
        assert_eq!(rows.end, g.ny());

        let (rows, _) = g.patch_around(151.0, 10.0);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_update_rule_keeps_max_gust_and_min_pressure() {
        let mut f = RegionalField::new(grid(), 101_000.0);
        f.update(0, 0, 30.0, 45.0, -1.0, -2.0, 99_000.0);
        f.update(0, 0, 20.0, 90.0, -3.0, -4.0, 98_000.0);
        assert_eq!(f.gust[(0, 0)], 30.0);
        assert_eq!(f.bearing[(0, 0)], 45.0);
        assert_eq!(f.ux[(0, 0)], -1.0);
        assert_eq!(f.pressure[(0, 0)], 98_000.0);
    }

    #[test]
    fn test_merge_is_commutative() {
        // Partition one: a tie at (0, 0), the deeper pressure at (1, 1)
        let mut a = RegionalField::new(grid(), 101_000.0);
        a.update(0, 0, 30.0, 45.0, -1.0, -2.0, 99_500.0);
        a.update(1, 1, 40.0, 10.0, -5.0, -6.0, 97_000.0);
        // Partition two: the same tied gust from another direction, the
        // stronger gust but shallower pressure at (1, 1)
        let mut b = RegionalField::new(grid(), 101_000.0);
        b.update(0, 0, 30.0, 120.0, 2.0, -1.0, 99_800.0);
        b.update(1, 1, 45.0, 200.0, 3.0, 4.0, 98_000.0);
        b.update(2, 2, 12.0, 300.0, 1.0, 1.0, 100_500.0);

        let mut ab = a.clone();
        ab.merge(&b).unwrap();
        let mut ba = b.clone();
        ba.merge(&a).unwrap();
        assert_eq!(ab, ba);

        assert_eq!(ab.gust[(0, 0)], 30.0);
        assert_eq!(ab.bearing[(0, 0)], 120.0);
        assert_eq!(ab.pressure[(0, 0)], 99_500.0);
        // Gust and pressure extremes come from different partitions
        assert_eq!(ab.gust[(1, 1)], 45.0);
        assert_eq!(ab.bearing[(1, 1)], 200.0);
        assert_eq!(ab.pressure[(1, 1)], 97_000.0);
        assert_eq!(ab.gust[(2, 2)], 12.0);
        assert_eq!(ab.bearing[(3, 3)], 0.0);
    }

    #[test]
    fn test_nearest_centidegree() {
        assert_eq!(centi(0.29), 29);
        assert_eq!(centi(-15.999), -1600);
        assert_eq!(centi(-15.994), -1599);
        let g = RegionalGrid::new(GridLimit::new(150.0, 150.29, -15.999, -15.0), 0.0, 0.01).unwrap();
        assert_eq!(g.max_lon, 15029);
        assert_eq!(g.min_lat, -1600);
    }

    #[test]
    fn test_merge_rejects_other_grid() {
        let mut a = RegionalField::new(grid(), 101_000.0);
        let other = RegionalGrid::new(GridLimit::new(150.0, 153.0, -16.0, -14.0), 1.0, 0.1).unwrap();
        let b = RegionalField::new(other, 101_000.0);
        assert!(matches!(a.merge(&b), Err(CycloneError::GridMismatch(_))));
    }
}
