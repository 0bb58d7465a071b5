//! Cyclone track data model

use super::geo::GridLimit;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;

/// One observation along a track.
///
/// Units follow the track file format: hours, degrees, km/h, compass
/// degrees, hPa and km.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TrackPoint {
    /// Hours since genesis
    pub age: f64,
    pub lon: f64,
    pub lat: f64,
    /// Translation speed (km/h)
    pub speed: f64,
    /// Heading, degrees clockwise from north
    pub bearing: f64,
    /// Central pressure (hPa)
    pub central_pressure: f64,
    /// Environmental pressure (hPa)
    pub env_pressure: f64,
    /// Radius of maximum winds (km)
    pub rmax: f64,
}

impl TrackPoint {
    /// Pressure deficit (hPa)
    #[inline]
    #[must_use]
    pub fn pressure_deficit(&self) -> f64 {
        self.env_pressure - self.central_pressure
    }
}

/// Position of a track within the batch that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TrackId {
    /// Zero-based index within the batch
    pub index: usize,
    /// Number of tracks in the batch
    pub count: usize,
}

/// A cyclone track: ordered observations plus identity.
///
/// `source` only groups tracks that came from the same file; nothing is
/// read through it.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Track {
    pub cyclone_number: usize,
    pub id: TrackId,
    pub source: Option<Arc<Path>>,
    pub points: Vec<TrackPoint>,
}

impl Track {
    #[must_use]
    pub fn new(cyclone_number: usize, points: Vec<TrackPoint>) -> Self {
        Self {
            cyclone_number,
            id: TrackId::default(),
            source: None,
            points,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&TrackPoint> {
        self.points.first()
    }

    #[must_use]
    pub fn last(&self) -> Option<&TrackPoint> {
        self.points.last()
    }

    /// Age of the final observation, zero for an empty track
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.last().map_or(0.0, |p| p.age)
    }

    /// Observations inside `limit` (closed interval)
    pub fn points_in(&self, limit: GridLimit) -> impl Iterator<Item = (usize, &TrackPoint)> {
        self.points
            .iter()
            .enumerate()
            .filter(move |(_, p)| limit.contains(p.lon, p.lat))
    }

    pub fn positions(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points.iter().map(|p| (p.lon, p.lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(age: f64, lon: f64, lat: f64) -> TrackPoint {
        TrackPoint {
            age,
            lon,
            lat,
            speed: 20.0,
            bearing: 90.0,
            central_pressure: 980.0,
            env_pressure: 1008.0,
            rmax: 40.0,
        }
    }

    #[test]
    fn test_points_in_region() {
        let track = Track::new(
            1,
            vec![point(0.0, 150.0, -15.0), point(6.0, 155.0, -15.0), point(12.0, 165.0, -15.0)],
        );
        let limit = GridLimit::new(140.0, 160.0, -20.0, -10.0);
        let idx: Vec<usize> = track.points_in(limit).map(|(i, _)| i).collect();
        assert_eq!(idx, vec![0, 1]);
        assert_eq!(track.duration(), 12.0);
    }

    #[test]
    fn test_pressure_deficit() {
        assert_eq!(point(0.0, 0.0, 0.0).pressure_deficit(), 28.0);
    }
}
