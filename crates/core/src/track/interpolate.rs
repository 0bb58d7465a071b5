//! Temporal interpolation of tracks to a uniform time step
//!
//! Positions follow a natural cubic spline through the observations (or
//! straight lines when asked, or when there are only two of them). Pressures
//! and radius are interpolated linearly. Speed and bearing are recomputed
//! from the interpolated positions.

use crate::core_types::error::{CycloneError, Result};
use crate::core_types::geo::latlon2azi;
use crate::core_types::track::{Track, TrackPoint};
use serde::{Deserialize, Serialize};

/// Position interpolation scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Linear,
    #[default]
    Spline,
}

/// Segment of sorted knots `xs` containing `t`, clamped to the end segments
fn segment(xs: &[f64], t: f64) -> usize {
    xs.partition_point(|&x| x <= t).saturating_sub(1).min(xs.len() - 2)
}

fn linear(xs: &[f64], ys: &[f64], t: f64) -> f64 {
    let i = segment(xs, t);
    let w = (t - xs[i]) / (xs[i + 1] - xs[i]);
    ys[i] + w * (ys[i + 1] - ys[i])
}

/// Natural cubic spline (zero second derivative at both ends)
struct NaturalSpline<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
    /// Second derivatives at the knots
    m: Vec<f64>,
}

impl<'a> NaturalSpline<'a> {
    fn new(xs: &'a [f64], ys: &'a [f64]) -> Self {
        let n = xs.len();
        let mut m = vec![0.0; n];
        if n > 2 {
            // Tridiagonal system for the interior second derivatives
            let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
            let k = n - 2;
            let mut diag = vec![0.0; k];
            let mut rhs = vec![0.0; k];
            for j in 0..k {
                let i = j + 1;
                diag[j] = 2.0 * (h[i - 1] + h[i]);
                rhs[j] = 6.0 * ((ys[i + 1] - ys[i]) / h[i] - (ys[i] - ys[i - 1]) / h[i - 1]);
            }
            // Thomas algorithm; the off-diagonals are h[1..k]
            for j in 1..k {
                let w = h[j] / diag[j - 1];
                diag[j] -= w * h[j];
                rhs[j] -= w * rhs[j - 1];
            }
            m[k] = rhs[k - 1] / diag[k - 1];
            for j in (0..k - 1).rev() {
                m[j + 1] = (rhs[j] - h[j + 1] * m[j + 2]) / diag[j];
            }
        }
        Self { xs, ys, m }
    }

    fn eval(&self, t: f64) -> f64 {
        let (xs, ys, m) = (self.xs, self.ys, &self.m);
        let i = segment(xs, t);
        let h = xs[i + 1] - xs[i];
        let a = (xs[i + 1] - t) / h;
        let b = (t - xs[i]) / h;
        a * ys[i] + b * ys[i + 1] + ((a * a * a - a) * m[i] + (b * b * b - b) * m[i + 1]) * h * h / 6.0
    }
}

/// Resample `track` every `delta` hours from its first to its last age.
///
/// The final observation time is always kept, so the last interval may be
/// shorter than `delta`.
pub fn interpolate_track(track: &Track, delta: f64, kind: Interpolation) -> Result<Track> {
    if delta.is_nan() || delta <= 0.0 {
        return Err(CycloneError::InvalidConfig(format!(
            "interpolation step must be positive, got {delta}"
        )));
    }
    let points = &track.points;
    if points.len() < 2 {
        return Ok(track.clone());
    }
    if points.windows(2).any(|w| w[1].age <= w[0].age) {
        return Err(CycloneError::InvalidConfig(format!(
            "track {} has non-increasing observation times",
            track.cyclone_number
        )));
    }

    let column = |f: fn(&TrackPoint) -> f64| points.iter().map(f).collect::<Vec<f64>>();
    let times = column(|p| p.age);
    let (t0, t_end) = (times[0], times[times.len() - 1]);

    let mut new_times: Vec<f64> = (0..)
        .map(|k| t0 + f64::from(k) * delta)
        .take_while(|&t| t < t_end - 1e-6)
        .collect();
    new_times.push(t_end);

    let lons = column(|p| p.lon);
    let lats = column(|p| p.lat);
    let (new_lons, new_lats): (Vec<f64>, Vec<f64>) = if kind == Interpolation::Linear || points.len() <= 2 {
        new_times
            .iter()
            .map(|&t| (linear(&times, &lons, t), linear(&times, &lats, t)))
            .unzip()
    } else {
        let (slon, slat) = (NaturalSpline::new(&times, &lons), NaturalSpline::new(&times, &lats));
        new_times.iter().map(|&t| (slon.eval(t), slat.eval(t))).unzip()
    };

    let pc = column(|p| p.central_pressure);
    let penv = column(|p| p.env_pressure);
    let rmax = column(|p| p.rmax);

    let n = new_times.len();
    let mut motion: Vec<(f64, f64)> = (0..n.saturating_sub(1))
        .map(|k| {
            let (bearing, dist) = latlon2azi(new_lons[k], new_lats[k], new_lons[k + 1], new_lats[k + 1]);
            (bearing, dist / (new_times[k + 1] - new_times[k]))
        })
        .collect();
    let last = motion
        .last()
        .copied()
        .unwrap_or((points[points.len() - 1].bearing, points[points.len() - 1].speed));
    motion.push(last);

    let new_points = (0..n)
        .map(|k| {
            let t = new_times[k];
            TrackPoint {
                age: t - t0,
                lon: new_lons[k],
                lat: new_lats[k],
                speed: motion[k].1,
                bearing: motion[k].0,
                central_pressure: linear(&times, &pc, t),
                env_pressure: linear(&times, &penv, t),
                rmax: linear(&times, &rmax, t),
            }
        })
        .collect();

    Ok(Track {
        points: new_points,
        ..track.clone()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn point(age: f64, lon: f64, lat: f64, pc: f64) -> TrackPoint {
        TrackPoint {
            age,
            lon,
            lat,
            speed: 0.0,
            bearing: 0.0,
            central_pressure: pc,
            env_pressure: 1010.0,
            rmax: 30.0,
        }
    }

    #[test]
    fn test_two_observations_give_one_midpoint() {
        let track = Track::new(1, vec![point(0.0, 150.0, -15.0, 990.0), point(12.0, 152.0, -16.0, 970.0)]);
        let out = interpolate_track(&track, 6.0, Interpolation::Spline).unwrap();
        assert_eq!(out.len(), 3);
        let mid = out.points[1];
        assert_relative_eq!(mid.age, 6.0);
        assert_relative_eq!(mid.lon, 151.0);
        assert_relative_eq!(mid.lat, -15.5);
        assert_relative_eq!(mid.central_pressure, 980.0);
        assert_relative_eq!(out.points[2].lon, 152.0);
        // South-east heading
        assert!(mid.bearing > 90.0 && mid.bearing < 180.0);
        assert!(mid.speed > 0.0);
    }

    #[test]
    fn test_spline_passes_through_observations() {
        let obs: Vec<TrackPoint> = (0..5)
            .map(|i| {
                let t = f64::from(i) * 6.0;
                point(t, 150.0 + 0.01 * t * t, -15.0 - 0.05 * t, 990.0)
            })
            .collect();
        let track = Track::new(1, obs.clone());
        let out = interpolate_track(&track, 1.0, Interpolation::Spline).unwrap();
        assert_eq!(out.len(), 25);
        for o in &obs {
            let p = out.points.iter().find(|p| (p.age - o.age).abs() < 1e-9).unwrap();
            assert_relative_eq!(p.lon, o.lon, epsilon = 1e-9);
            assert_relative_eq!(p.lat, o.lat, epsilon = 1e-9);
        }
        // Linear latitude is reproduced exactly between knots
        assert_relative_eq!(out.points[3].lat, -15.15, epsilon = 1e-9);
    }

    #[test]
    fn test_final_time_is_kept() {
        let track = Track::new(1, vec![point(0.0, 150.0, -15.0, 990.0), point(10.0, 151.0, -15.0, 990.0)]);
        let out = interpolate_track(&track, 6.0, Interpolation::Linear).unwrap();
        let ages: Vec<f64> = out.points.iter().map(|p| p.age).collect();
        assert_eq!(ages, vec![0.0, 6.0, 10.0]);
    }

    #[test]
    fn test_rejects_bad_step_and_times() {
        let track = Track::new(1, vec![point(0.0, 150.0, -15.0, 990.0), point(0.0, 151.0, -15.0, 990.0)]);
        assert!(interpolate_track(&track, 6.0, Interpolation::Linear).is_err());
        assert!(interpolate_track(&track, 0.0, Interpolation::Linear).is_err());
    }
}
