//! Gridded gust output
//!
//! One JSON document per track file with (lat, lon) axes, the maximum gust
//! and its components, the minimum sea-level pressure and the settings that
//! produced them. Missing values (a region no track reached) are `null`.

use crate::core_types::error::Result;
use crate::grid::RegionalField;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const GUST_TITLE: &str = "Synthetic tropical cyclone event wind field";

/// Global attributes of a gust file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalAttributes {
    pub title: String,
    pub track_file: String,
    pub radial_profile: String,
    pub boundary_layer: String,
    pub beta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub long_name: String,
    pub standard_name: String,
    pub units: String,
    pub axis: String,
    pub values: Vec<f64>,
}

/// A (lat, lon) variable, rows south to north
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub long_name: String,
    pub standard_name: String,
    pub units: String,
    /// Range of the finite values; `None` when there are none
    pub actual_range: Option<(f64, f64)>,
    pub valid_range: (f64, f64),
    pub cell_methods: Option<String>,
    pub values: Vec<Vec<Option<f64>>>,
}

impl Variable {
    fn new(
        long_name: &str,
        standard_name: &str,
        units: &str,
        valid_range: (f64, f64),
        cell_methods: Option<&str>,
        data: &DMatrix<f64>,
    ) -> Self {
        let finite = data.iter().copied().filter(|v| v.is_finite());
        let actual_range = finite.fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        });
        let values = (0..data.nrows())
            .map(|j| {
                (0..data.ncols())
                    .map(|i| Some(data[(j, i)]).filter(|v| v.is_finite()))
                    .collect()
            })
            .collect();
        Self {
            long_name: long_name.into(),
            standard_name: standard_name.into(),
            units: units.into(),
            actual_range,
            valid_range,
            cell_methods: cell_methods.map(Into::into),
            values,
        }
    }

    /// Value at row `j`, column `i`; NaN when missing
    #[must_use]
    pub fn at(&self, j: usize, i: usize) -> f64 {
        self.values[j][i].unwrap_or(f64::NAN)
    }
}

/// Gust file contents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GustFile {
    pub attributes: GlobalAttributes,
    pub lat: Axis,
    pub lon: Axis,
    pub vmax: Variable,
    pub ua: Variable,
    pub va: Variable,
    pub slp: Variable,
}

impl GustFile {
    #[must_use]
    pub fn from_field(field: &RegionalField, attributes: GlobalAttributes) -> Self {
        let axis = |long: &str, standard: &str, units: &str, axis: &str, values: Vec<f64>| Axis {
            long_name: long.into(),
            standard_name: standard.into(),
            units: units.into(),
            axis: axis.into(),
            values,
        };
        Self {
            attributes,
            lat: axis("Latitude", "latitude", "degrees_north", "Y", field.grid.lats()),
            lon: axis("Longitude", "longitude", "degrees_east", "X", field.grid.lons()),
            vmax: Variable::new(
                "Maximum 3-second gust wind speed",
                "wind_speed_of_gust",
                "m/s",
                (0.0, 200.0),
                Some("time: maximum time: maximum (interval: 3 seconds)"),
                &field.gust,
            ),
            ua: Variable::new(
                "Eastward component of maximum wind speed",
                "eastward_wind",
                "m/s",
                (-200.0, 200.0),
                None,
                &field.ux,
            ),
            va: Variable::new(
                "Northward component of maximum wind speed",
                "northward_wind",
                "m/s",
                (-200.0, 200.0),
                None,
                &field.vy,
            ),
            slp: Variable::new(
                "Minimum air pressure at sea level",
                "air_pressure_at_sea_level",
                "Pa",
                (70000.0, 115000.0),
                Some("time: minimum"),
                &field.pressure,
            ),
        }
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string(self)?)?;
        debug!("Wrote gust file {}", path.display());
        Ok(())
    }

    pub fn read(path: &Path) -> Result<Self> {
        Ok(serde_json::from_str(&std::fs::read_to_string(path)?)?)
    }
}

/// `<dir>/gust.NNNN.json` for `.../tracks.NNNN.csv`
#[must_use]
pub fn gust_file_path(track_file: &Path, dir: &Path) -> PathBuf {
    let stem = track_file
        .file_stem()
        .map_or_else(|| "tracks".into(), |s| s.to_string_lossy().into_owned());
    dir.join(format!("{}.json", stem.replacen("tracks", "gust", 1)))
}
