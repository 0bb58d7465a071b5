//! Spherical geodesy and the statistics cell grid
//!
//! All positions are (longitude, latitude) in degrees on a sphere of radius
//! [`constants::EARTH_RADIUS_KM`]. Bearings are compass bearings: degrees
//! clockwise from north in [0, 360).
//!
//! # Forward projection
//!
//! ```text
//! φ₂ = asin(sin φ₁ cos δ + cos φ₁ sin δ cos θ)
//! λ₂ = λ₁ + atan2(sin θ sin δ cos φ₁, cos δ − sin φ₁ sin φ₂)
//! ```
//!
//! where θ is the bearing and δ = d/R the angular distance.

use serde::{Deserialize, Serialize};

pub mod constants {
    /// Mean earth radius used for all great-circle calculations (km)
    pub const EARTH_RADIUS_KM: f64 = 6367.0;
}

/// Rectangular lon/lat domain.
///
/// Several containment tests are provided because the simulation uses the
/// edges differently at different stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridLimit {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl GridLimit {
    #[must_use]
    pub const fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Closed-interval containment on both axes
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.x_min..=self.x_max).contains(&lon) && (self.y_min..=self.y_max).contains(&lat)
    }

    /// Open-interval containment on both axes
    #[must_use]
    pub fn contains_strict(&self, lon: f64, lat: f64) -> bool {
        lon > self.x_min && lon < self.x_max && lat > self.y_min && lat < self.y_max
    }

    /// True when a stepped position has left the track domain.
    ///
    /// The western and northern edges belong to the domain, the eastern and
    /// southern edges do not.
    #[must_use]
    pub fn has_exited(&self, lon: f64, lat: f64) -> bool {
        lon < self.x_min || lon >= self.x_max || lat <= self.y_min || lat > self.y_max
    }

    /// Smallest whole-degree box enclosing every point
    #[must_use]
    pub fn envelope<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut iter = points.into_iter();
        let (lon0, lat0) = iter.next()?;
        let mut lim = Self::new(lon0, lon0, lat0, lat0);
        for (lon, lat) in iter {
            lim.x_min = lim.x_min.min(lon);
            lim.x_max = lim.x_max.max(lon);
            lim.y_min = lim.y_min.min(lat);
            lim.y_max = lim.y_max.max(lat);
        }
        Some(Self::new(
            lim.x_min.floor(),
            lim.x_max.ceil(),
            lim.y_min.floor(),
            lim.y_max.ceil(),
        ))
    }
}

impl Default for GridLimit {
    fn default() -> Self {
        // Australian region
        Self::new(90.0, 180.0, -40.0, 0.0)
    }
}

/// Grid spacing (degrees) in longitude (`x`) and latitude (`y`)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpace {
    pub x: f64,
    pub y: f64,
}

impl Default for GridSpace {
    fn default() -> Self {
        Self { x: 1.0, y: 1.0 }
    }
}

/// Cell numbering over a [`GridLimit`] at a [`GridSpace`].
///
/// Rows count from the northern limit downward and columns from the western
/// limit eastward, so cell 0 is the north-west corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellGrid {
    pub limit: GridLimit,
    pub space: GridSpace,
    pub nx: usize,
    pub ny: usize,
}

impl CellGrid {
    #[must_use]
    pub fn new(limit: GridLimit, space: GridSpace) -> Self {
        let nx = ((limit.x_max - limit.x_min) / space.x).ceil().max(1.0) as usize;
        let ny = ((limit.y_max - limit.y_min) / space.y).ceil().max(1.0) as usize;
        Self {
            limit,
            space,
            nx,
            ny,
        }
    }

    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.nx * self.ny
    }

    /// Row and column of a position, clamped into the grid
    #[must_use]
    pub fn row_col(&self, lon: f64, lat: f64) -> (usize, usize) {
        let row = ((self.limit.y_max - lat) / self.space.y).floor();
        let col = ((lon - self.limit.x_min) / self.space.x).floor();
        let row = row.clamp(0.0, (self.ny - 1) as f64) as usize;
        let col = col.clamp(0.0, (self.nx - 1) as f64) as usize;
        (row, col)
    }

    /// `floor((yMax - lat)/dy) * nx + floor((lon - xMin)/dx)`, clamped
    #[must_use]
    pub fn cell_index(&self, lon: f64, lat: f64) -> usize {
        let (row, col) = self.row_col(lon, lat);
        row * self.nx + col
    }

    /// North-west corner of a cell
    #[must_use]
    pub fn cell_origin(&self, cell: usize) -> (f64, f64) {
        let row = cell / self.nx;
        let col = cell % self.nx;
        (
            self.limit.x_min + col as f64 * self.space.x,
            self.limit.y_max - row as f64 * self.space.y,
        )
    }
}

// ============================================================================
// GREAT-CIRCLE ROUTINES
// ============================================================================

/// Project a position along a great circle.
///
/// Returns the (lon, lat) reached after travelling `distance_km` from
/// (`lon`, `lat`) on compass bearing `bearing_deg`.
#[must_use]
pub fn bear2latlon(bearing_deg: f64, distance_km: f64, lon: f64, lat: f64) -> (f64, f64) {
    let theta = bearing_deg.to_radians();
    let delta = distance_km / constants::EARTH_RADIUS_KM;
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    (lambda2.to_degrees(), phi2.to_degrees())
}

/// Compass bearing (degrees) and great-circle distance (km) from the first
/// position to the second.
#[must_use]
pub fn latlon2azi(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> (f64, f64) {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();
    let bearing = y.atan2(x).to_degrees().rem_euclid(360.0);
    let bearing = if bearing >= 360.0 { 0.0 } else { bearing };

    (bearing, haversine_km(lon1, lat1, lon2, lat2))
}

/// Great-circle distance (km) via the haversine formula
#[must_use]
pub fn haversine_km(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = phi2 - phi1;
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * constants::EARTH_RADIUS_KM * a.sqrt().min(1.0).asin()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_cell_index_north_west_origin() {
        let grid = CellGrid::new(GridLimit::new(140.0, 160.0, -20.0, -10.0), GridSpace::default());
        assert_eq!(grid.nx, 20);
        assert_eq!(grid.ny, 10);
        assert_eq!(grid.cell_index(140.5, -10.5), 0);
        assert_eq!(grid.cell_index(141.5, -10.5), 1);
        assert_eq!(grid.cell_index(140.5, -11.5), 20);
        assert_eq!(grid.cell_index(159.5, -19.5), 199);
    }

    #[test]
    fn test_cell_index_clamped() {
        let grid = CellGrid::new(GridLimit::new(140.0, 160.0, -20.0, -10.0), GridSpace::default());
        assert_eq!(grid.cell_index(100.0, 0.0), 0);
        assert_eq!(grid.cell_index(200.0, -50.0), grid.n_cells() - 1);
    }

    #[test]
    fn test_cell_origin_inverts_index() {
        let grid = CellGrid::new(GridLimit::new(140.0, 160.0, -20.0, -10.0), GridSpace::default());
        let cell = grid.cell_index(147.3, -14.2);
        let (lon, lat) = grid.cell_origin(cell);
        assert_relative_eq!(lon, 147.0);
        assert_relative_eq!(lat, -14.0);
    }

    #[test]
    fn test_domain_exit_edges() {
        let lim = GridLimit::new(140.0, 160.0, -20.0, -10.0);
        assert!(!lim.has_exited(140.0, -15.0));
        assert!(lim.has_exited(160.0, -15.0));
        assert!(lim.has_exited(150.0, -20.0));
        assert!(!lim.has_exited(150.0, -10.0));
        assert!(lim.contains(160.0, -20.0));
        assert!(!lim.contains_strict(160.0, -15.0));
    }

    #[test]
    fn test_bear2latlon_due_east_on_equator() {
        let dist = constants::EARTH_RADIUS_KM * 10f64.to_radians();
        let (lon, lat) = bear2latlon(90.0, dist, 150.0, 0.0);
        assert_relative_eq!(lon, 160.0, epsilon = 1e-9);
        assert_relative_eq!(lat, 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_latlon2azi_inverts_projection() {
        let (lon, lat) = bear2latlon(37.0, 400.0, 150.0, -15.0);
        let (bearing, dist) = latlon2azi(150.0, -15.0, lon, lat);
        assert_relative_eq!(bearing, 37.0, epsilon = 1e-6);
        assert_relative_eq!(dist, 400.0, epsilon = 1e-6);
    }

    #[test]
    fn test_envelope_rounds_outward() {
        let lim = GridLimit::envelope([(150.2, -15.7), (152.9, -12.1)]).unwrap();
        assert_eq!(lim, GridLimit::new(150.0, 153.0, -16.0, -12.0));
        assert!(GridLimit::envelope(std::iter::empty()).is_none());
    }
}
