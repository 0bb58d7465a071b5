//! Polar coordinates of a regional patch relative to the storm eye

use super::regional::RegionalGrid;
use crate::core_types::geo::latlon2azi;
use crate::core_types::units::Degrees;
use nalgebra::DMatrix;
use std::ops::Range;

/// Patch of regional nodes around the eye with each node's distance (km)
/// and mathematical angle (radians) from the eye.
#[derive(Debug, Clone, PartialEq)]
pub struct PolarPatch {
    pub rows: Range<usize>,
    pub cols: Range<usize>,
    pub r: DMatrix<f64>,
    pub lam: DMatrix<f64>,
}

impl PolarPatch {
    /// Build the patch within ±margin of (`lon`, `lat`)
    #[must_use]
    pub fn around(grid: &RegionalGrid, lon: f64, lat: f64) -> Self {
        let (rows, cols) = grid.patch_around(lon, lat);
        let (ny, nx) = (rows.len(), cols.len());

        let mut r = DMatrix::zeros(ny, nx);
        let mut lam = DMatrix::zeros(ny, nx);
        for (pj, j) in rows.clone().enumerate() {
            for (pi, i) in cols.clone().enumerate() {
                let (bearing, dist) = latlon2azi(lon, lat, grid.lon(i), grid.lat(j));
                r[(pj, pi)] = dist;
                lam[(pj, pi)] = Degrees::new(bearing).bearing_to_theta();
            }
        }

        Self { rows, cols, r, lam }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.cols.is_empty()
    }

    #[must_use]
    pub fn shape(&self) -> (usize, usize) {
        (self.rows.len(), self.cols.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::GridLimit;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_patch_geometry() {
        let grid = RegionalGrid::new(GridLimit::new(150.0, 152.0, -16.0, -14.0), 0.5, 0.25).unwrap();
        let patch = PolarPatch::around(&grid, 151.0, -15.0);
        assert_eq!(patch.shape(), (5, 5));

        // Centre node sits on the eye
        assert!(patch.r[(2, 2)] < 1e-6);

        // Node due north: theta pi/2, distance ~0.5° of latitude
        assert_relative_eq!(patch.lam[(4, 2)], FRAC_PI_2, epsilon = 1e-9);
        assert_relative_eq!(patch.r[(4, 2)], 55.56, epsilon = 0.1);

        // Node due east: theta ~0
        assert!(patch.lam[(2, 4)].abs() < 0.01);
    }
}
