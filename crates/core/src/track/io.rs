//! Track file reading and writing
//!
//! Comma-delimited text with `%` comment lines:
//!
//! ```text
//! %CycloneNumber,TimeElapsed(hr),Longitude(degree),Latitude(degree),Speed(km/hr),Bearing(degrees),CentralPressure(hPa),EnvPressure(hPa),rMax(km)
//! 1,   0.00000, 150.00000, -15.00000,  20.00000,  90.00000, 980.00000,1010.00000,  30.00000
//! ```
//!
//! Interpolated historical files carry a `Datetime` second column; it is
//! accepted on read and ignored.

use crate::core_types::error::{CycloneError, Result};
use crate::core_types::track::{Track, TrackId, TrackPoint};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

pub const TRACK_FILE_HEADER: &str = "CycloneNumber,TimeElapsed(hr),Longitude(degree),Latitude(degree),\
Speed(km/hr),Bearing(degrees),CentralPressure(hPa),EnvPressure(hPa),rMax(km)";

/// File name of simulation unit `index`
#[must_use]
pub fn track_file_name(index: usize) -> String {
    format!("tracks.{index:04}.csv")
}

/// Every `tracks.*.csv` file in `dir`, sorted by name
pub fn list_track_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(std::result::Result::ok)
        .map(|e| e.path())
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("tracks.") && n.ends_with(".csv"))
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Write `tracks` to `path`; an empty slice produces a header-only file
pub fn write_tracks(path: &Path, tracks: &[Track]) -> Result<()> {
    let mut out = BufWriter::new(File::create(path)?);
    writeln!(out, "%{TRACK_FILE_HEADER}")?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(out);
    for track in tracks {
        for p in &track.points {
            writer.write_record([
                track.cyclone_number.to_string(),
                format!("{:10.5}", p.age),
                format!("{:10.5}", p.lon),
                format!("{:10.5}", p.lat),
                format!("{:10.5}", p.speed),
                format!("{:10.5}", p.bearing),
                format!("{:10.5}", p.central_pressure),
                format!("{:10.5}", p.env_pressure),
                format!("{:10.5}", p.rmax),
            ])?;
        }
    }
    let mut out = writer.into_inner().map_err(csv::IntoInnerError::into_error)?;
    out.flush()?;
    debug!("Wrote {} tracks to {}", tracks.len(), path.display());
    Ok(())
}

/// Read every track in `path`, grouped by cyclone number in ascending order.
///
/// Each track records its position among the file's tracks and the file it
/// came from.
pub fn read_tracks(path: &Path) -> Result<Vec<Track>> {
    let file_name = path.display().to_string();
    let parse_err = |row: usize, msg: String| CycloneError::Parse {
        file: file_name.clone(),
        row,
        msg,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .comment(Some(b'%'))
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)?;

    let mut groups: BTreeMap<usize, Vec<TrackPoint>> = BTreeMap::new();
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        let offset = match record.len() {
            9 => 0,
            10 => 1,
            n => return Err(parse_err(row + 1, format!("expected 9 or 10 columns, found {n}"))),
        };
        let field = |k: usize| -> Result<f64> {
            let idx = if k == 0 { 0 } else { k + offset };
            record[idx]
                .parse::<f64>()
                .map_err(|e| parse_err(row + 1, format!("column {}: {e}", idx + 1)))
        };
        let number = field(0)?;
        if number < 0.0 || number.fract() != 0.0 {
            return Err(parse_err(row + 1, format!("invalid cyclone number {number}")));
        }
        groups.entry(number as usize).or_default().push(TrackPoint {
            age: field(1)?,
            lon: field(2)?,
            lat: field(3)?,
            speed: field(4)?,
            bearing: field(5)?,
            central_pressure: field(6)?,
            env_pressure: field(7)?,
            rmax: field(8)?,
        });
    }

    let source: Arc<Path> = Arc::from(path);
    let count = groups.len();
    let tracks: Vec<Track> = groups
        .into_iter()
        .enumerate()
        .map(|(index, (cyclone_number, points))| Track {
            cyclone_number,
            id: TrackId { index, count },
            source: Some(Arc::clone(&source)),
            points,
        })
        .collect();
    debug!("Read {} tracks from {}", tracks.len(), path.display());
    Ok(tracks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_track(number: usize, lon0: f64) -> Track {
        Track::new(
            number,
            (0..4)
                .map(|i| TrackPoint {
                    age: f64::from(i) * 6.0,
                    lon: lon0 + 0.123456789 * f64::from(i),
                    lat: -15.0 - 0.1 * f64::from(i),
                    speed: 18.5,
                    bearing: 100.25,
                    central_pressure: 975.5 + f64::from(i),
                    env_pressure: 1008.0,
                    rmax: 35.0,
                })
                .collect(),
        )
    }

    #[test]
    fn test_round_trip_within_format_precision() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(track_file_name(7));
        let tracks = vec![sample_track(1, 150.0), sample_track(2, 145.0)];
        write_tracks(&path, &tracks).unwrap();

        let read = read_tracks(&path).unwrap();
        assert_eq!(read.len(), 2);
        for (orig, back) in tracks.iter().zip(&read) {
            assert_eq!(orig.cyclone_number, back.cyclone_number);
            assert_eq!(orig.len(), back.len());
            for (a, b) in orig.points.iter().zip(&back.points) {
                assert_abs_diff_eq!(a.lon, b.lon, epsilon = 5e-6);
                assert_abs_diff_eq!(a.central_pressure, b.central_pressure, epsilon = 5e-6);
            }
        }
        assert_eq!(read[1].id, TrackId { index: 1, count: 2 });
        assert_eq!(read[0].source.as_deref(), Some(path.as_path()));
    }

    #[test]
    fn test_empty_file_has_header_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tracks.0000.csv");
        write_tracks(&path, &[]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.trim(), format!("%{TRACK_FILE_HEADER}"));
        assert!(read_tracks(&path).unwrap().is_empty());
    }

    #[test]
    fn test_reads_datetime_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        std::fs::write(
            &path,
            "%CycloneNumber,Datetime,TimeElapsed,Longitude,Latitude,Speed,Bearing,CentralPressure,EnvPressure,rMax\n\
             3,2006-03-19 00:00,0.0,147.0,-16.0,12.0,210.0,990.0,1008.0,25.0\n\
             3,2006-03-19 06:00,6.0,146.5,-16.6,12.5,215.0,985.0,1008.0,24.0\n",
        )
        .unwrap();
        let tracks = read_tracks(&path).unwrap();
        assert_eq!(tracks.len(), 1);
        assert_eq!(tracks[0].cyclone_number, 3);
        assert_eq!(tracks[0].points[1].age, 6.0);
        assert_eq!(tracks[0].points[1].rmax, 24.0);
    }

    #[test]
    fn test_bad_row_reports_position() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "1,0,150,-15,20,90,980,1010,30\n1,6,oops,-15,20,90,980,1010,30\n").unwrap();
        match read_tracks(&path) {
            Err(CycloneError::Parse { row, .. }) => assert_eq!(row, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn test_lists_track_files_in_order() {
        let dir = tempfile::tempdir().unwrap();
        for i in [2, 0, 1] {
            write_tracks(&dir.path().join(track_file_name(i)), &[]).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        let files = list_track_files(dir.path()).unwrap();
        let names: Vec<_> = files.iter().map(|p| p.file_name().unwrap().to_owned()).collect();
        assert_eq!(names, ["tracks.0000.csv", "tracks.0001.csv", "tracks.0002.csv"]);
    }
}
