//! Batch track generation from a genesis point

use super::stepper::{TrackEnd, TrackStepper, MIN_DECAY_AGE_HOURS};
use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::{bear2latlon, CellGrid, GridLimit};
use crate::core_types::rng::{max_draws_per_track, TrackRng};
use crate::core_types::track::{Track, TrackId, TrackPoint};
use crate::environment::{Environment, OriginSampler};
use crate::stats::{InitialDistributions, ModelStatistics, SizeDistribution};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Genesis location and optional initial conditions; absent values are
/// sampled from the initial-condition distributions
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenesisPoint {
    pub lon: Option<f64>,
    pub lat: Option<f64>,
    /// km/h
    pub speed: Option<f64>,
    /// Degrees clockwise from north
    pub bearing: Option<f64>,
    /// hPa
    pub pressure: Option<f64>,
    /// hPa
    pub env_pressure: Option<f64>,
    /// km
    pub rmax: Option<f64>,
}

impl GenesisPoint {
    /// Genesis at a fixed position with sampled initial conditions
    #[must_use]
    pub fn at(lon: f64, lat: f64) -> Self {
        Self {
            lon: Some(lon),
            lat: Some(lat),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_motion(mut self, bearing: f64, speed: f64) -> Self {
        self.bearing = Some(bearing);
        self.speed = Some(speed);
        self
    }

    #[must_use]
    pub fn with_pressure(mut self, central: f64, env: f64) -> Self {
        self.pressure = Some(central);
        self.env_pressure = Some(env);
        self
    }

    #[must_use]
    pub fn with_rmax(mut self, rmax: f64) -> Self {
        self.rmax = Some(rmax);
        self
    }
}

/// Generates batches of tracks that share a genesis point.
///
/// The generator is read-only; each call takes the random stream of the
/// simulation unit it works for, so one generator serves every worker.
pub struct TrackGenerator {
    grid: CellGrid,
    inner_limit: Option<GridLimit>,
    dt: f64,
    max_steps: usize,
    initial: InitialDistributions,
    stats: ModelStatistics,
    env: Environment,
    origin: Option<Box<dyn OriginSampler>>,
}

impl TrackGenerator {
    #[must_use]
    pub fn new(
        grid: CellGrid,
        dt: f64,
        max_steps: usize,
        initial: InitialDistributions,
        stats: ModelStatistics,
        env: Environment,
    ) -> Self {
        Self {
            grid,
            inner_limit: None,
            dt,
            max_steps,
            initial,
            stats,
            env,
            origin: None,
        }
    }

    /// Discard tracks that do not stay strictly inside `limit`
    #[must_use]
    pub fn with_inner_limit(mut self, limit: Option<GridLimit>) -> Self {
        self.inner_limit = limit;
        self
    }

    /// Sampler used when a genesis point has no position
    #[must_use]
    pub fn with_origin(mut self, origin: Box<dyn OriginSampler>) -> Self {
        self.origin = Some(origin);
        self
    }

    #[must_use]
    pub fn grid(&self) -> CellGrid {
        self.grid
    }

    /// Random draws reserved per track
    #[must_use]
    pub fn max_draws_per_track(&self) -> u64 {
        max_draws_per_track(self.max_steps)
    }

    /// Draws a batch of `n` tracks occupies: one block for the initial
    /// conditions plus one per track
    #[must_use]
    pub fn batch_draws(&self, n: usize) -> u64 {
        (n as u64 + 1) * self.max_draws_per_track()
    }

    /// Fill in the initial conditions of `genesis` from the distributions.
    ///
    /// Consumes a handful of uniforms from `rng`.
    pub fn sample_initial(&self, genesis: GenesisPoint, rng: &mut TrackRng) -> Result<TrackPoint> {
        let (lon, lat) = match (genesis.lon, genesis.lat) {
            (Some(lon), Some(lat)) => (lon, lat),
            _ => {
                let origin = self.origin.as_ref().ok_or_else(|| {
                    CycloneError::InvalidConfig("genesis point has no position and no origin sampler is set".into())
                })?;
                debug!("Cyclone origin not given, sampling one");
                let (u, v) = (rng.uniform(), rng.uniform());
                origin.ppf(u, v)
            }
        };
        let cell = self.grid.cell_index(lon, lat);

        let bearing = match genesis.bearing {
            Some(b) => b,
            None => self.initial.bearing.get(cell).ppf(rng.uniform()),
        };
        let speed = match genesis.speed {
            Some(s) => s,
            None => self.initial.speed.get(cell).ppf(rng.uniform()),
        };
        let env_pressure = match genesis.env_pressure {
            Some(p) => p,
            None => self.env.pressure.sample(lon, lat),
        };
        let central_pressure = match genesis.pressure {
            Some(p) => p,
            None => {
                let cdf = self.initial.pressure.get(cell);
                let upper = cdf.upper_prob_below(env_pressure);
                cdf.ppf(rng.uniform_in(0.0, upper))
            }
        };
        let rmax = match genesis.rmax {
            Some(r) => r,
            None => self.initial.size.get(cell).ppf(rng.uniform()),
        };

        debug!(
            "Genesis ({lon:6.2}, {lat:6.2}) cell {cell}: bearing {bearing:.2} speed {speed:.2} \
             penv {env_pressure:.2} pressure {central_pressure:.2} rmax {rmax:.1}"
        );
        Ok(TrackPoint {
            age: 0.0,
            lon,
            lat,
            speed,
            bearing,
            central_pressure,
            env_pressure,
            rmax,
        })
    }

    /// Generate `n` tracks from one genesis point.
    ///
    /// `rng` must sit at the start of this batch's block. The batch block
    /// fixes the genesis position and a reference set of initial conditions
    /// used for the domain check. Track `j` runs on its own substream,
    /// drawing whatever `genesis` leaves unset before stepping, so its output
    /// does not depend on the other tracks. On return `rng` sits at the end
    /// of the batch block.
    ///
    /// If the first step from the genesis point already leaves the domain the
    /// whole batch is skipped.
    pub fn generate_tracks(&self, n: usize, genesis: GenesisPoint, rng: &mut TrackRng) -> Result<Vec<Track>> {
        debug!("Generating {n} tropical cyclone tracks");
        let base = rng.position();
        let block = self.max_draws_per_track();
        let init = self.sample_initial(genesis, rng)?;
        rng.reseed_at(base + self.batch_draws(n));

        let (next_lon, next_lat) = bear2latlon(init.bearing, self.dt * init.speed, init.lon, init.lat);
        if !self.grid.limit.contains(next_lon, next_lat) {
            debug!(
                "Tracks from ({:.2}, {:.2}) leave the domain immediately at ({next_lon:.2}, {next_lat:.2})",
                init.lon, init.lat
            );
            return Ok(Vec::new());
        }

        let stepper = TrackStepper::new(&self.stats, &self.env, self.grid, self.dt, self.max_steps);
        let stepper = match self.initial.size {
            SizeDistribution::Cells(_) => stepper,
            SizeDistribution::LogNormal(_) => stepper.without_size_change(),
        };

        let origin = GenesisPoint {
            lon: Some(init.lon),
            lat: Some(init.lat),
            ..genesis
        };
        let mut tracks: Vec<Track> = (0..n)
            .map(|j| {
                let mut stream = rng.substream(base + (1 + j as u64) * block);
                let start = self.sample_initial(origin, &mut stream)?;
                let (points, end) = stepper.run(start, &mut stream);
                if end != TrackEnd::MaxSteps {
                    debug!("Track {} ended early ({end:?}) after {} steps", j + 1, points.len());
                }
                Ok(Track {
                    cyclone_number: j + 1,
                    id: TrackId { index: j, count: n },
                    source: None,
                    points,
                })
            })
            .collect::<Result<_>>()?;

        self.filter(&mut tracks);
        Ok(tracks)
    }

    /// Drop structurally invalid tracks, logging how many each rule removed
    fn filter(&self, tracks: &mut Vec<Track>) {
        let mut apply = |name: &str, keep: &dyn Fn(&Track) -> bool| {
            let before = tracks.len();
            tracks.retain(keep);
            debug!("Removed {} {name} tracks", before - tracks.len());
        };
        apply("empty", &|t| !t.is_empty());
        apply("short-lived", &|t| t.duration() >= MIN_DECAY_AGE_HOURS);
        apply("invalid pressure", &|t| {
            t.points.iter().all(|p| p.central_pressure < p.env_pressure)
        });
        if let Some(inner) = self.inner_limit {
            apply("outside inner domain", &|t| {
                t.positions().all(|(lon, lat)| inner.contains_strict(lon, lat))
            });
        }
    }
}

impl std::fmt::Debug for TrackGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackGenerator")
            .field("grid", &self.grid)
            .field("dt", &self.dt)
            .field("max_steps", &self.max_steps)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::geo::GridSpace;
    use crate::stats::{ArCoefficients, CdfTable, CellStatistics, EmpiricalCdf};

    fn generator(dt: f64, max_steps: usize, speed_sigma: f64) -> TrackGenerator {
        let grid = CellGrid::new(GridLimit::new(140.0, 160.0, -20.0, -10.0), GridSpace::default());
        let u = |mu: f64, sigma: f64| {
            CellStatistics::uniform(
                grid.nx,
                grid.ny,
                ArCoefficients {
                    mu,
                    sigma,
                    alpha: 0.8,
                    phi: 0.6,
                    min: 900.0,
                },
            )
        };
        let stats = ModelStatistics {
            speed: u(20.0, speed_sigma),
            bearing: u(90.0, 5.0),
            pressure: u(980.0, 10.0),
            pressure_rate: u(0.0, 0.1),
            size_rate: None,
        };
        let table = |v: &[f64]| CdfTable::from_samples(v.iter().map(|&x| (0, x))).unwrap();
        let initial = InitialDistributions {
            bearing: table(&[80.0, 90.0, 100.0]),
            speed: table(&[15.0, 20.0]),
            pressure: table(&[960.0, 980.0, 1000.0, 1020.0]),
            size: SizeDistribution::LogNormal(EmpiricalCdf::lognormal_size(57.0, 0.6, 120.0)),
        };
        TrackGenerator::new(grid, dt, max_steps, initial, stats, Environment::default())
    }

    #[test]
    fn test_sampled_pressure_is_below_environment() {
        let g = generator(1.0, 48, 2.0);
        let mut rng = TrackRng::new(4);
        for _ in 0..50 {
            let p = g.sample_initial(GenesisPoint::at(150.0, -15.0), &mut rng).unwrap();
            assert!(p.central_pressure < p.env_pressure);
        }
    }

    #[test]
    fn test_tracks_are_reproducible_and_independent() {
        let g = generator(1.0, 48, 2.0);
        let genesis = GenesisPoint::at(150.0, -15.0);
        let a = g.generate_tracks(5, genesis, &mut TrackRng::new(11)).unwrap();
        let b = g.generate_tracks(5, genesis, &mut TrackRng::new(11)).unwrap();
        assert_eq!(a, b);
        assert!(!a.is_empty());
        assert!(a.windows(2).all(|w| w[0].cyclone_number < w[1].cyclone_number));
        if a.len() > 1 {
            assert_ne!(a[0].points, a[1].points);
        }
    }

    #[test]
    fn test_realizations_draw_their_own_initial_conditions() {
        let g = generator(1.0, 48, 2.0);
        let tracks = g
            .generate_tracks(6, GenesisPoint::at(150.0, -15.0), &mut TrackRng::new(11))
            .unwrap();
        assert!(tracks.len() > 1);
        let starts: Vec<(f64, f64, f64, f64)> = tracks
            .iter()
            .map(|t| {
                let p = t.points[0];
                (p.bearing, p.speed, p.central_pressure, p.rmax)
            })
            .collect();
        assert!(starts.windows(2).any(|w| w[0] != w[1]), "{starts:?}");
        for t in &tracks {
            assert_eq!((t.points[0].lon, t.points[0].lat), (150.0, -15.0));
        }
    }

    #[test]
    fn test_supplied_initial_conditions_are_shared() {
        let g = generator(1.0, 48, 2.0);
        let genesis = GenesisPoint::at(150.0, -15.0)
            .with_motion(95.0, 18.0)
            .with_pressure(975.0, 1010.0)
            .with_rmax(40.0);
        let tracks = g.generate_tracks(4, genesis, &mut TrackRng::new(3)).unwrap();
        assert!(!tracks.is_empty());
        for t in &tracks {
            let p = t.points[0];
            assert_eq!((p.bearing, p.speed, p.central_pressure, p.env_pressure, p.rmax), (95.0, 18.0, 975.0, 1010.0, 40.0));
        }
    }

    #[test]
    fn test_rng_ends_after_batch_block() {
        let g = generator(1.0, 48, 2.0);
        let mut rng = TrackRng::new(1);
        g.generate_tracks(3, GenesisPoint::at(150.0, -15.0), &mut rng).unwrap();
        assert_eq!(rng.position(), g.batch_draws(3));
    }

    #[test]
    fn test_missing_origin_sampler_is_an_error() {
        let g = generator(1.0, 48, 2.0);
        let result = g.generate_tracks(1, GenesisPoint::default(), &mut TrackRng::new(1));
        assert!(matches!(result, Err(CycloneError::InvalidConfig(_))));
    }

    #[test]
    fn test_kept_tracks_satisfy_filters() {
        let g = generator(1.0, 96, 4.0).with_inner_limit(Some(GridLimit::new(141.0, 159.0, -19.0, -11.0)));
        let tracks = g
            .generate_tracks(20, GenesisPoint::at(150.0, -15.0), &mut TrackRng::new(2))
            .unwrap();
        for t in &tracks {
            assert!(t.duration() >= 12.0);
            assert_eq!(t.points[0].age, 0.0);
            for p in &t.points {
                assert!(p.central_pressure < p.env_pressure);
                assert!((0.0..360.0).contains(&p.bearing));
                assert!(p.lon > 141.0 && p.lon < 159.0);
            }
        }
    }
}
