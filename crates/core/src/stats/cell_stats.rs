//! Per-cell AR(1) coefficients estimated from historical observations
//!
//! For every statistics cell and each regime (land, sea) the generator needs
//!
//! ```text
//! μ  mean
//! σ  standard deviation
//! α  lag-1 autocorrelation
//! φ  sqrt(1 − α²)
//! min
//! ```
//!
//! so that a standardised innovation `χ_t = α χ_{t−1} + φ N(0,1)` has unit
//! variance. Cells with fewer than `min_sample` observations grow their
//! search window by the grid increment until enough are found; a window that
//! covers the whole domain and is still short falls back to the domain-wide
//! coefficients. Angular quantities use circular mean and deviation.

use crate::core_types::geo::{CellGrid, GridSpace};
use nalgebra::DMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One historical observation of a quantity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub lon: f64,
    pub lat: f64,
    pub value: f64,
    /// Next value of the same track, for the lag-1 autocorrelation
    pub next: Option<f64>,
    pub on_land: bool,
}

/// AR(1) coefficient set of one cell and regime
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArCoefficients {
    pub mu: f64,
    pub sigma: f64,
    pub alpha: f64,
    pub phi: f64,
    pub min: f64,
}

impl Default for ArCoefficients {
    fn default() -> Self {
        Self {
            mu: 0.0,
            sigma: 0.0,
            alpha: 0.0,
            phi: 1.0,
            min: 0.0,
        }
    }
}

impl ArCoefficients {
    /// Estimate from a sample; `None` when the sample is empty
    #[must_use]
    pub fn estimate(obs: &[&Observation], angular: bool) -> Option<Self> {
        if obs.is_empty() {
            return None;
        }
        let n = obs.len() as f64;

        let (mu, sigma) = if angular {
            let (s, c) = obs.iter().fold((0.0, 0.0), |(s, c), o| {
                let (sv, cv) = o.value.to_radians().sin_cos();
                (s + sv, c + cv)
            });
            let mean = s.atan2(c).to_degrees().rem_euclid(360.0);
            let r = (s * s + c * c).sqrt() / n;
            let sigma = if r > 0.0 {
                (-2.0 * r.min(1.0).ln()).sqrt().to_degrees()
            } else {
                180.0
            };
            (mean, sigma)
        } else {
            let mean = obs.iter().map(|o| o.value).sum::<f64>() / n;
            let var = obs.iter().map(|o| (o.value - mean).powi(2)).sum::<f64>() / n;
            (mean, var.sqrt())
        };
        // Angular deviations wrap to [-180, 180)
        let deviation = |x: f64| {
            if angular {
                (x - mu + 180.0).rem_euclid(360.0) - 180.0
            } else {
                x - mu
            }
        };

        let pairs: Vec<(f64, f64)> = obs
            .iter()
            .filter_map(|o| o.next.map(|nx| (deviation(o.value), deviation(nx))))
            .collect();
        let alpha = lag_one(&pairs);

        let min = obs.iter().map(|o| o.value).fold(f64::INFINITY, f64::min);

        Some(Self {
            mu,
            sigma,
            alpha,
            phi: (1.0 - alpha * alpha).max(0.0).sqrt(),
            min,
        })
    }
}

/// Pearson correlation of (x_t, x_{t+1}) deviation pairs, clamped to [-1, 1]
fn lag_one(pairs: &[(f64, f64)]) -> f64 {
    if pairs.len() < 2 {
        return 0.0;
    }
    let n = pairs.len() as f64;
    let ma = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mb = pairs.iter().map(|p| p.1).sum::<f64>() / n;
    let (mut sab, mut saa, mut sbb) = (0.0, 0.0, 0.0);
    for &(a, b) in pairs {
        sab += (a - ma) * (b - mb);
        saa += (a - ma) * (a - ma);
        sbb += (b - mb) * (b - mb);
    }
    if saa <= 0.0 || sbb <= 0.0 {
        return 0.0;
    }
    (sab / (saa * sbb).sqrt()).clamp(-1.0, 1.0)
}

/// Land and sea coefficient grids for one quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellStatistics {
    pub nx: usize,
    pub ny: usize,
    pub sea: Vec<ArCoefficients>,
    pub land: Vec<ArCoefficients>,
}

/// Coefficient fields reshaped to (lat, lon), north row first
#[derive(Debug, Clone, PartialEq)]
pub struct CoefficientGrid {
    pub mu: DMatrix<f64>,
    pub sigma: DMatrix<f64>,
    pub alpha: DMatrix<f64>,
    pub phi: DMatrix<f64>,
    pub min: DMatrix<f64>,
}

impl CellStatistics {
    /// Same coefficients in every cell and regime
    #[must_use]
    pub fn uniform(nx: usize, ny: usize, coeffs: ArCoefficients) -> Self {
        Self {
            nx,
            ny,
            sea: vec![coeffs; nx * ny],
            land: vec![coeffs; nx * ny],
        }
    }

    /// Coefficients of `cell` for the given regime
    #[must_use]
    pub fn coeffs(&self, cell: usize, on_land: bool) -> &ArCoefficients {
        let set = if on_land { &self.land } else { &self.sea };
        &set[cell.min(set.len() - 1)]
    }

    #[must_use]
    pub fn n_cells(&self) -> usize {
        self.sea.len()
    }

    /// Estimate every cell of `grid` from `obs`
    #[must_use]
    pub fn compute(
        obs: &[Observation],
        grid: CellGrid,
        grid_inc: GridSpace,
        min_sample: usize,
        angular: bool,
    ) -> Self {
        let sea_obs: Vec<&Observation> = obs.iter().filter(|o| !o.on_land).collect();
        let land_obs: Vec<&Observation> = obs.iter().filter(|o| o.on_land).collect();

        let sea = Self::compute_regime(&sea_obs, grid, grid_inc, min_sample, angular, None);
        let land = Self::compute_regime(&land_obs, grid, grid_inc, min_sample, angular, Some(&sea));

        Self {
            nx: grid.nx,
            ny: grid.ny,
            sea,
            land,
        }
    }

    /// Coefficients for one regime. `fallback` supplies per-cell values when
    /// the regime has no observations anywhere.
    fn compute_regime(
        obs: &[&Observation],
        grid: CellGrid,
        grid_inc: GridSpace,
        min_sample: usize,
        angular: bool,
        fallback: Option<&[ArCoefficients]>,
    ) -> Vec<ArCoefficients> {
        let n_cells = grid.n_cells();
        let Some(domain) = ArCoefficients::estimate(obs, angular) else {
            debug!("No observations for regime; using fallback coefficients");
            return match fallback {
                Some(f) => f.to_vec(),
                None => vec![ArCoefficients::default(); n_cells],
            };
        };

        let mut binned: Vec<Vec<&Observation>> = vec![Vec::new(); n_cells];
        for o in obs {
            binned[grid.cell_index(o.lon, o.lat)].push(o);
        }

        // Prefix sums of counts for O(1) window totals
        let (nx, ny) = (grid.nx, grid.ny);
        let mut prefix = vec![0usize; (nx + 1) * (ny + 1)];
        for r in 0..ny {
            for c in 0..nx {
                prefix[(r + 1) * (nx + 1) + c + 1] = binned[r * nx + c].len()
                    + prefix[r * (nx + 1) + c + 1]
                    + prefix[(r + 1) * (nx + 1) + c]
                    - prefix[r * (nx + 1) + c];
            }
        }
        let window_count = |r0: usize, r1: usize, c0: usize, c1: usize| {
            prefix[(r1 + 1) * (nx + 1) + c1 + 1] + prefix[r0 * (nx + 1) + c0]
                - prefix[r0 * (nx + 1) + c1 + 1]
                - prefix[(r1 + 1) * (nx + 1) + c0]
        };

        let inc_c = (grid_inc.x / grid.space.x).ceil().max(1.0) as usize;
        let inc_r = (grid_inc.y / grid.space.y).ceil().max(1.0) as usize;

        let mut widened = 0usize;
        let mut fell_back = 0usize;
        let coeffs: Vec<(ArCoefficients, bool, bool)> = (0..n_cells)
            .into_par_iter()
            .map(|cell| {
                let (row, col) = (cell / nx, cell % nx);
                let (mut r0, mut r1, mut c0, mut c1) = (row, row, col, col);
                let mut grew = false;
                while window_count(r0, r1, c0, c1) < min_sample {
                    if r0 == 0 && c0 == 0 && r1 == ny - 1 && c1 == nx - 1 {
                        return (domain, grew, true);
                    }
                    r0 = r0.saturating_sub(inc_r);
                    c0 = c0.saturating_sub(inc_c);
                    r1 = (r1 + inc_r).min(ny - 1);
                    c1 = (c1 + inc_c).min(nx - 1);
                    grew = true;
                }
                let window: Vec<&Observation> = (r0..=r1)
                    .flat_map(|r| (c0..=c1).map(move |c| r * nx + c))
                    .flat_map(|k| binned[k].iter().copied())
                    .collect();
                let est = ArCoefficients::estimate(&window, angular).unwrap_or(domain);
                (est, grew, false)
            })
            .collect();

        let out = coeffs
            .into_iter()
            .map(|(c, grew, fb)| {
                widened += usize::from(grew);
                fell_back += usize::from(fb);
                c
            })
            .collect();
        debug!(
            "Cell statistics from {} observations: {widened} cells widened, {fell_back} on domain fallback",
            obs.len()
        );
        out
    }

    /// Reshape one regime to (lat, lon) grids
    #[must_use]
    pub fn grid(&self, on_land: bool) -> CoefficientGrid {
        let set = if on_land { &self.land } else { &self.sea };
        let field = |f: fn(&ArCoefficients) -> f64| {
            DMatrix::from_fn(self.ny, self.nx, |r, c| f(&set[r * self.nx + c]))
        };
        CoefficientGrid {
            mu: field(|a| a.mu),
            sigma: field(|a| a.sigma),
            alpha: field(|a| a.alpha),
            phi: field(|a| a.phi),
            min: field(|a| a.min),
        }
    }
}
