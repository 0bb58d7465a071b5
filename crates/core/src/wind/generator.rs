//! Wind hazard from tracks
//!
//! For each track position inside the region the profile and boundary-layer
//! model are evaluated on the patch of regional nodes within ±margin of the
//! eye, scaled to gusts, and folded into a [`RegionalField`] keeping the
//! maximum gust (with its bearing and components) and the minimum pressure.

use super::boundary_layer::WindField;
use super::output::{gust_file_path, GlobalAttributes, GustFile, GUST_TITLE};
use super::profiles::{Profile, VortexParams};
use crate::config::WindfieldConfig;
use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::GridLimit;
use crate::core_types::track::{Track, TrackPoint};
use crate::core_types::units::{Degrees, Hectopascals, Kilometers, KilometersPerHour};
use crate::grid::{PolarPatch, RegionalField, RegionalGrid};
use crate::track::read_tracks;
use nalgebra::DMatrix;
use rayon::prelude::*;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Gusts and pressure on the patch around the eye at one time step
#[derive(Debug, Clone, PartialEq)]
pub struct LocalWindField {
    /// Hours since genesis
    pub age: f64,
    /// Regional rows and columns covered by the patch
    pub rows: Range<usize>,
    pub cols: Range<usize>,
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    /// Gust speed (m/s)
    pub gust: DMatrix<f64>,
    /// Direction the gust blows from (degrees)
    pub bearing: DMatrix<f64>,
    /// Gust components (m/s)
    pub ux: DMatrix<f64>,
    pub vy: DMatrix<f64>,
    /// Surface pressure (Pa)
    pub pressure: DMatrix<f64>,
}

/// Per-time-step observer
pub type TimeStepCallback = Box<dyn Fn(&Track, &LocalWindField) + Send + Sync>;

/// Evaluates wind fields along tracks and aggregates their extremes
pub struct WindfieldGenerator {
    config: WindfieldConfig,
    region: Option<GridLimit>,
    callback: Option<TimeStepCallback>,
}

impl WindfieldGenerator {
    #[must_use]
    pub fn new(config: WindfieldConfig) -> Self {
        let region = config.grid_limit;
        Self {
            config,
            region,
            callback: None,
        }
    }

    /// Fixed region for every track; the envelope of the tracks otherwise
    #[must_use]
    pub fn with_region(mut self, region: Option<GridLimit>) -> Self {
        self.region = region;
        self
    }

    #[must_use]
    pub fn with_time_step_callback(mut self, callback: TimeStepCallback) -> Self {
        self.callback = Some(callback);
        self
    }

    #[must_use]
    pub fn config(&self) -> &WindfieldConfig {
        &self.config
    }

    /// Region for `tracks`: the configured one, else their whole-degree
    /// envelope
    #[must_use]
    pub fn region_for(&self, tracks: &[Track]) -> Option<GridLimit> {
        self.region
            .or_else(|| GridLimit::envelope(tracks.iter().flat_map(Track::positions)))
    }

    fn regional_grid(&self, region: GridLimit) -> Result<RegionalGrid> {
        RegionalGrid::new(region, self.config.margin, self.config.resolution)
    }

    fn profile_at(&self, p: &TrackPoint) -> Profile {
        let params = VortexParams::new(
            p.lat,
            p.lon,
            Hectopascals::new(p.env_pressure).to_pascals(),
            Hectopascals::new(p.central_pressure).to_pascals(),
            Kilometers::new(p.rmax),
        )
        .with_betas(self.config.beta, self.config.beta1, self.config.beta2)
        .with_rmax2(Kilometers::new(self.config.rmax2));
        Profile::new(self.config.profile_type, params)
    }

    /// Gusts and pressure around the eye at `p`
    #[must_use]
    pub fn local_wind_field(&self, grid: &RegionalGrid, p: &TrackPoint) -> LocalWindField {
        let patch = PolarPatch::around(grid, p.lon, p.lat);
        let (ny, nx) = patch.shape();
        let profile = self.profile_at(p);
        let wind = WindField::new(self.config.wind_field_type, self.config.theta_max);
        let v_fm = *KilometersPerHour::new(p.speed).to_meters_per_second();
        let theta_fm = Degrees::new(p.bearing).bearing_to_theta();
        let gf = self.config.gust_factor;

        let mut gust = DMatrix::zeros(ny, nx);
        let mut bearing = DMatrix::zeros(ny, nx);
        let mut ux = DMatrix::zeros(ny, nx);
        let mut vy = DMatrix::zeros(ny, nx);
        let mut pressure = DMatrix::zeros(ny, nx);
        for j in 0..ny {
            for i in 0..nx {
                let (r, lam) = (patch.r[(j, i)], patch.lam[(j, i)]);
                let (u, v) = wind.evaluate(&profile, r, lam, v_fm, theta_fm);
                let (u, v) = (gf * u, gf * v);
                gust[(j, i)] = u.hypot(v);
                bearing[(j, i)] = (-u).atan2(-v).to_degrees();
                ux[(j, i)] = u;
                vy[(j, i)] = v;
                pressure[(j, i)] = profile.pressure(r);
            }
        }

        LocalWindField {
            age: p.age,
            lons: patch.cols.clone().map(|i| grid.lon(i)).collect(),
            lats: patch.rows.clone().map(|j| grid.lat(j)).collect(),
            rows: patch.rows,
            cols: patch.cols,
            gust,
            bearing,
            ux,
            vy,
            pressure,
        }
    }

    /// Fold every in-region step of `track` into `field`
    fn accumulate(&self, field: &mut RegionalField, region: GridLimit, track: &Track) {
        let mut steps = 0usize;
        for (_, p) in track.points_in(region) {
            let local = self.local_wind_field(&field.grid, p);
            if let Some(cb) = &self.callback {
                cb(track, &local);
            }
            for (lj, j) in local.rows.clone().enumerate() {
                for (li, i) in local.cols.clone().enumerate() {
                    field.update(
                        j,
                        i,
                        local.gust[(lj, li)],
                        local.bearing[(lj, li)],
                        local.ux[(lj, li)],
                        local.vy[(lj, li)],
                        local.pressure[(lj, li)],
                    );
                }
            }
            steps += 1;
        }
        debug!("Track {}: {steps} steps inside the region", track.cyclone_number);
    }

    /// Extremes of a single track over the configured region, or over the
    /// track's own envelope. `None` for an empty track with no region.
    pub fn calculate_extremes_from_track(&self, track: &Track) -> Result<Option<RegionalField>> {
        let Some(region) = self.region_for(std::slice::from_ref(track)) else {
            return Ok(None);
        };
        let env = track.first().map_or(f64::NAN, |p| *Hectopascals::new(p.env_pressure).to_pascals());
        let mut field = RegionalField::new(self.regional_grid(region)?, env);
        self.accumulate(&mut field, region, track);
        Ok(Some(field))
    }

    /// Extremes over every track in `tracks`, sharing one region.
    ///
    /// Tracks are folded in parallel; the update rule makes the result
    /// independent of the order.
    pub fn calculate_extremes_from_tracks(&self, tracks: &[Track]) -> Result<Option<RegionalField>> {
        let Some(region) = self.region_for(tracks) else {
            return Ok(None);
        };
        let grid = self.regional_grid(region)?;
        let env = tracks
            .first()
            .and_then(Track::first)
            .map_or(f64::NAN, |p| *Hectopascals::new(p.env_pressure).to_pascals());

        let field = tracks
            .par_iter()
            .fold(
                || RegionalField::new(grid, env),
                |mut field, track| {
                    self.accumulate(&mut field, region, track);
                    field
                },
            )
            .map(Ok::<RegionalField, CycloneError>)
            .try_reduce(
                || RegionalField::new(grid, env),
                |mut a, b| {
                    a.merge(&b)?;
                    Ok(a)
                },
            )?;
        Ok(Some(field))
    }

    /// Extremes over every track in one track file
    pub fn calculate_extremes_from_trackfile(&self, path: &Path) -> Result<Option<RegionalField>> {
        let tracks = read_tracks(path)?;
        let field = self.calculate_extremes_from_tracks(&tracks)?;
        if field.is_none() {
            warn!("{} has no tracks and no region is configured; skipping", path.display());
        }
        Ok(field)
    }

    fn attributes(&self, track_file: &Path) -> GlobalAttributes {
        GlobalAttributes {
            title: GUST_TITLE.into(),
            track_file: track_file.display().to_string(),
            radial_profile: self.config.profile_type.to_string(),
            boundary_layer: self.config.wind_field_type.to_string(),
            beta: self.config.beta,
        }
    }

    /// Write one `gust.NNNN.json` per `tracks.NNNN.csv` into `output_dir`.
    ///
    /// Returns the files written; track files that produce no field are
    /// skipped.
    pub fn dump_gusts_from_trackfiles(&self, files: &[PathBuf], output_dir: &Path) -> Result<Vec<PathBuf>> {
        std::fs::create_dir_all(output_dir)?;
        let mut sorted = files.to_vec();
        sorted.sort();

        let mut written = Vec::with_capacity(sorted.len());
        for file in &sorted {
            info!("Calculating wind fields for tracks in {}", file.display());
            let Some(field) = self.calculate_extremes_from_trackfile(file)? else {
                continue;
            };
            let out = gust_file_path(file, output_dir);
            GustFile::from_field(&field, self.attributes(file)).write(&out)?;
            debug!("Peak gust {:.1} m/s in {}", field.peak_gust(), out.display());
            written.push(out);
        }
        Ok(written)
    }
}

impl std::fmt::Debug for WindfieldGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindfieldGenerator")
            .field("config", &self.config)
            .field("region", &self.region)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wind::{ProfileType, WindFieldType};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn point(age: f64, lon: f64) -> TrackPoint {
        TrackPoint {
            age,
            lon,
            lat: -15.0,
            speed: 20.0,
            bearing: 90.0,
            central_pressure: 950.0,
            env_pressure: 1010.0,
            rmax: 30.0,
        }
    }

    fn config() -> WindfieldConfig {
        WindfieldConfig {
            profile_type: ProfileType::Holland,
            wind_field_type: WindFieldType::Kepert,
            margin: 1.0,
            resolution: 0.1,
            ..Default::default()
        }
    }

    #[test]
    fn test_single_track_extremes() {
        let track = Track::new(1, vec![point(0.0, 150.0), point(6.0, 150.5)]);
        let generator = WindfieldGenerator::new(config());
        let field = generator.calculate_extremes_from_track(&track).unwrap().unwrap();

        // Envelope [150, 151] x [-15, -15] plus 1° margin at 0.1°
        assert_eq!(field.grid.nx(), 31);
        assert_eq!(field.grid.ny(), 21);
        let peak = field.peak_gust();
        assert!(peak > 30.0 && peak < 120.0, "peak gust {peak}");
        let min_p = field.pressure.min();
        assert!(min_p >= 95000.0 && min_p < 101000.0, "min pressure {min_p}");
    }

    #[test]
    fn test_gust_bearing_points_upwind() {
        let generator = WindfieldGenerator::new(config());
        let grid = RegionalGrid::new(GridLimit::new(150.0, 150.0, -15.0, -15.0), 1.0, 0.1).unwrap();
        let local = generator.local_wind_field(&grid, &point(0.0, 150.0));
        for j in 0..local.lats.len() {
            for i in 0..local.lons.len() {
                let (u, v) = (local.ux[(j, i)], local.vy[(j, i)]);
                let b = local.bearing[(j, i)].to_radians();
                // Unit vector towards the source is opposite the flow
                let g = local.gust[(j, i)];
                if g > 1.0 {
                    assert!((b.sin() * g + u).abs() < 1e-6);
                    assert!((b.cos() * g + v).abs() < 1e-6);
                }
            }
        }
    }

    #[test]
    fn test_callback_sees_each_step_in_region() {
        let count = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&count);
        let generator = WindfieldGenerator::new(config())
            .with_region(Some(GridLimit::new(149.0, 151.0, -16.0, -14.0)))
            .with_time_step_callback(Box::new(move |_, local| {
                assert!(!local.lons.is_empty());
                seen.fetch_add(1, Ordering::Relaxed);
            }));
        // Third step is outside the region
        let track = Track::new(1, vec![point(0.0, 150.0), point(6.0, 150.5), point(12.0, 152.0)]);
        generator.calculate_extremes_from_track(&track).unwrap();
        assert_eq!(count.load(Ordering::Relaxed), 2);
    }

    #[test]
    fn test_empty_track_without_region() {
        let generator = WindfieldGenerator::new(config());
        assert!(generator.calculate_extremes_from_track(&Track::default()).unwrap().is_none());
        assert!(generator.calculate_extremes_from_tracks(&[]).unwrap().is_none());
    }
}
