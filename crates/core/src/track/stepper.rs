//! AR(1) track stepping
//!
//! Each step projects the previous position along the previous heading,
//! checks the domain, then advances pressure rate, bearing, speed and (when
//! radius statistics exist) size rate with
//!
//! ```text
//! χ_t = α[c] χ_{t−1} + φ[c] N(0,1)
//! x_t = μ[c] + σ[c] χ_t          (t > 1)
//! x_1 = x_0 + σ[c] χ_1
//! ```
//!
//! using the land or sea coefficients of the cell the cyclone is in. Over
//! land the pressure deficit decays exponentially from its last offshore
//! value, `Δp(t) = Δp₀ exp(−a t)` with `a = 0.008 + 0.0008 Δp₀ + N(0, 0.001)`.

use crate::core_types::geo::{bear2latlon, CellGrid};
use crate::core_types::rng::{TrackRng, NORMALS_PER_STEP};
use crate::core_types::track::TrackPoint;
use crate::environment::Environment;
use crate::stats::{ArCoefficients, CellStatistics, ModelStatistics};
use tracing::debug;

/// Age after which a weak cyclone is terminated (h)
pub const MIN_DECAY_AGE_HOURS: f64 = 12.0;

/// Pressure deficit below which an aged cyclone is terminated (hPa)
pub const MIN_PRESSURE_DEFICIT_HPA: f64 = 5.0;

/// How a simulated track ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackEnd {
    /// Ran for the maximum number of steps
    MaxSteps,
    /// The next position left the domain
    ExitedDomain,
    /// The next step decayed below the minimum deficit
    Invalid,
}

/// Innovation state of one AR(1) quantity
#[derive(Debug, Clone, Copy, Default)]
struct Innovation {
    chi: f64,
}

impl Innovation {
    #[inline]
    fn advance(&mut self, c: &ArCoefficients, z: f64) -> f64 {
        self.chi = c.alpha * self.chi + c.phi * z;
        self.chi
    }
}

/// Steps single tracks through the AR(1) motion model
pub struct TrackStepper<'a> {
    pub stats: &'a ModelStatistics,
    pub env: &'a Environment,
    pub grid: CellGrid,
    /// Time step (h)
    pub dt: f64,
    /// Maximum observations per track
    pub max_steps: usize,
    /// Size-rate statistics; radius stays constant without them
    pub size_rate: Option<&'a CellStatistics>,
}

impl<'a> TrackStepper<'a> {
    #[must_use]
    pub fn new(stats: &'a ModelStatistics, env: &'a Environment, grid: CellGrid, dt: f64, max_steps: usize) -> Self {
        Self {
            stats,
            env,
            grid,
            dt,
            max_steps,
            size_rate: stats.size_rate.as_ref(),
        }
    }

    /// Keep the radius constant regardless of the available statistics
    #[must_use]
    pub fn without_size_change(mut self) -> Self {
        self.size_rate = None;
        self
    }

    /// Simulate one track from `init`.
    ///
    /// Every step consumes exactly [`NORMALS_PER_STEP`] normal deviates from
    /// `rng`, so the number of draws is bounded by the step count.
    pub fn run(&self, init: TrackPoint, rng: &mut TrackRng) -> (Vec<TrackPoint>, TrackEnd) {
        let dt = self.dt;
        let limit = self.grid.limit;

        let mut points = Vec::with_capacity(self.max_steps.min(1024));
        points.push(init);

        let (mut dp_chi, mut b_chi, mut v_chi, mut ds_chi) = (
            Innovation::default(),
            Innovation::default(),
            Innovation::default(),
            Innovation::default(),
        );
        let (mut dp, mut ds) = (0.0, 0.0);
        let mut offshore_pressure = init.central_pressure;
        let mut land_time = 0.0;

        for i in 1..self.max_steps {
            let prev = points[i - 1];
            let (lon, lat) = bear2latlon(prev.bearing, prev.speed * dt, prev.lon, prev.lat);
            let env_pressure = self.env.pressure.sample(lon, lat);

            if limit.has_exited(lon, lat) {
                debug!("Track left the domain at ({lon:.2}, {lat:.2}) step {i}");
                return (points, TrackEnd::ExitedDomain);
            }

            let cell = self.grid.cell_index(lon, lat);
            let on_land = self.env.landfall.on_land(lon, lat);
            let z: [f64; NORMALS_PER_STEP as usize] = std::array::from_fn(|_| rng.normal());
            let first = i == 1;

            let c = self.stats.pressure_rate.coeffs(cell, on_land);
            let chi = dp_chi.advance(c, z[0]);
            dp = if first { dp + c.sigma * chi } else { c.mu + c.sigma * chi };

            let c = self.stats.bearing.coeffs(cell, on_land);
            let chi = b_chi.advance(c, z[1]);
            let bearing = if first {
                prev.bearing + c.sigma * chi
            } else {
                c.mu + c.sigma * chi
            }
            .rem_euclid(360.0);

            let c = self.stats.speed.coeffs(cell, on_land);
            let chi = v_chi.advance(c, z[2]);
            let speed = if first {
                prev.speed + (c.sigma * chi).abs()
            } else {
                (c.mu + c.sigma * chi).abs()
            };

            let central_pressure = if on_land {
                land_time += dt;
                let deficit = env_pressure - offshore_pressure;
                let alpha = 0.008 + 0.0008 * deficit + 0.001 * z[4];
                env_pressure - deficit * (-alpha * land_time).exp()
            } else {
                let c = self.stats.pressure.coeffs(cell, false);
                let mut p = prev.central_pressure + dp * dt;
                if p < c.min - 4.0 * c.sigma {
                    debug!("Central pressure {p:.1} hPa is extremely low; raising");
                    p = prev.central_pressure + dp.abs() * dt;
                }
                offshore_pressure = p;
                p
            };

            let rmax = match self.size_rate {
                Some(stats) => {
                    let c = stats.coeffs(cell, on_land);
                    let chi = ds_chi.advance(c, z[3]);
                    ds = if first { ds + c.sigma * chi } else { c.mu + c.sigma * chi };
                    let r = prev.rmax + ds * dt;
                    if r <= 1.0 {
                        prev.rmax - ds * dt
                    } else {
                        r
                    }
                }
                None => prev.rmax,
            };

            let age = prev.age + dt;
            if age > MIN_DECAY_AGE_HOURS && (env_pressure - central_pressure).abs() < MIN_PRESSURE_DEFICIT_HPA {
                debug!(
                    "Track decayed at step {i} (penv {env_pressure:.1}, pressure {central_pressure:.1})"
                );
                return (points, TrackEnd::Invalid);
            }

            points.push(TrackPoint {
                age,
                lon,
                lat,
                speed,
                bearing,
                central_pressure,
                env_pressure,
                rmax,
            });
        }

        (points, TrackEnd::MaxSteps)
    }
}
