//! Boundary-layer surface wind models
//!
//! Converts the gradient-level vortex of a [`Profile`] into an asymmetric
//! near-surface wind for a translating storm.
//!
//! # References
//! - Kepert, J.D. (2001). "The dynamics of boundary layer jets within the
//!   tropical cyclone core. Part I: Linear theory." J. Atmos. Sci., 58,
//!   2469-2484.
//! - Hubbert, G.D., Holland, G.J., Leslie, L.M., Manton, M.J. (1991). "A
//!   real-time system for forecasting tropical cyclone storm surges."
//!   Weather and Forecasting, 6, 86-97.
//! - McConochie, J.D., Hardy, T.A., Mason, L.B. (2004). "Modelling tropical
//!   cyclone over-water wind and pressure fields." Ocean Engineering, 31,
//!   1757-1782.
//!
//! # Coordinates
//!
//! `lam` is the mathematical angle (radians counter-clockwise from east) of
//! the evaluation point seen from the storm centre; `theta_fm` is the storm
//! heading as a mathematical angle. Radial (`u`, outward positive) and
//! tangential (`v`, counter-clockwise positive) components are rotated to
//! Cartesian with
//!
//! ```text
//! Ux = u cos λ − v sin λ
//! Vy = u sin λ + v cos λ
//! ```
//!
//! # Kepert linear boundary layer
//!
//! With constant diffusivity K and drag coefficient Cd:
//!
//! ```text
//! α = (2V/r + f) / 2K      β = (f + ζ) / 2K      γ = V / (2K r)
//! χ = Cd V / (K sqrt(sqrt(αβ)))
//! η = Cd V / (K sqrt(sqrt(αβ) + |γ|))
//! ψ = Cd V / (K sqrt(|sqrt(αβ) − |γ||))
//! ```
//!
//! The symmetric response `A0` and the two asymmetric wavenumber-one modes
//! `A−`, `A+` are complex amplitudes; the surface wind is their sum plus the
//! gradient wind and translation.

use super::profiles::Profile;
use crate::core_types::error::{CycloneError, Result};
use nalgebra::Complex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod constants {
    /// Kepert eddy diffusivity (m²/s)
    pub const KEPERT_K: f64 = 50.0;

    /// Kepert surface drag coefficient
    pub const KEPERT_CD: f64 = 0.002;

    /// Gradient-to-surface wind reduction (Hubbert, McConochie)
    pub const SURFACE_KM: f64 = 0.70;

    /// Outer inflow angle (degrees)
    pub const INFLOW_DEG: f64 = 25.0;

    /// Default angle from the heading to the maximum-wind azimuth (degrees)
    pub const DEFAULT_THETA_MAX_DEG: f64 = 70.0;
}

/// Surface wind field selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindFieldType {
    #[default]
    Kepert,
    Hubbert,
    McConochie,
}

impl WindFieldType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            WindFieldType::Kepert => "kepert",
            WindFieldType::Hubbert => "hubbert",
            WindFieldType::McConochie => "mcconochie",
        }
    }
}

impl FromStr for WindFieldType {
    type Err = CycloneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kepert" => Ok(Self::Kepert),
            "hubbert" => Ok(Self::Hubbert),
            "mcconochie" => Ok(Self::McConochie),
            _ => Err(CycloneError::UnknownModel {
                kind: "wind field",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for WindFieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Surface wind model with its angular parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindField {
    pub kind: WindFieldType,
    /// Angle from the heading to the azimuth of maximum wind (radians)
    pub theta_max: f64,
}

impl WindField {
    #[must_use]
    pub fn new(kind: WindFieldType, theta_max_deg: f64) -> Self {
        Self {
            kind,
            theta_max: theta_max_deg.to_radians(),
        }
    }

    /// Surface wind (Ux, Vy) in m/s at distance `r` km and angle `lam`.
    ///
    /// `v_fm` is the translation speed (m/s), `theta_fm` the heading as a
    /// mathematical angle (radians).
    #[must_use]
    pub fn evaluate(
        &self,
        profile: &Profile,
        r: f64,
        lam: f64,
        v_fm: f64,
        theta_fm: f64,
    ) -> (f64, f64) {
        let (u, v) = match self.kind {
            WindFieldType::Kepert => kepert(profile, r, lam, v_fm, theta_fm),
            WindFieldType::Hubbert => self.empirical(profile, r, lam, v_fm, theta_fm, false),
            WindFieldType::McConochie => self.empirical(profile, r, lam, v_fm, theta_fm, true),
        };
        to_cartesian(u, v, lam)
    }

    /// Hubbert / McConochie: reduced gradient wind plus a translation
    /// asymmetry peaking `theta_max` to the cyclonic right of the heading,
    /// turned inward by the inflow angle.
    fn empirical(
        &self,
        profile: &Profile,
        r: f64,
        lam: f64,
        v_fm: f64,
        theta_fm: f64,
        mcconochie: bool,
    ) -> (f64, f64) {
        let sign = profile.coriolis().signum();
        let rmax = *profile.params().rmax;
        let v = profile.velocity(r).abs();

        let theta_max_abs = theta_fm - sign * self.theta_max;
        let inflow_deg = if mcconochie {
            if r < rmax {
                10.0 * r / rmax
            } else if r < 1.2 * rmax {
                10.0 + 75.0 * (r / rmax - 1.0)
            } else {
                constants::INFLOW_DEG
            }
        } else if r < rmax {
            0.0
        } else {
            constants::INFLOW_DEG
        };
        let asym = if mcconochie {
            0.5 * (1.0 + (lam - theta_max_abs).cos()) * v_fm
        } else {
            v_fm * (lam - theta_max_abs).cos()
        };

        let vs = constants::SURFACE_KM * v + asym;
        let inflow = inflow_deg.to_radians();
        (-vs * inflow.sin(), sign * vs * inflow.cos())
    }
}

impl Default for WindField {
    fn default() -> Self {
        Self::new(WindFieldType::Kepert, constants::DEFAULT_THETA_MAX_DEG)
    }
}

#[inline]
fn to_cartesian(u: f64, v: f64, lam: f64) -> (f64, f64) {
    let (s, c) = lam.sin_cos();
    (u * c - v * s, u * s + v * c)
}

/// Kepert (2001) surface wind as (radial, tangential) components (m/s)
fn kepert(profile: &Profile, r: f64, lam: f64, v_fm: f64, theta_fm: f64) -> (f64, f64) {
    use constants::{KEPERT_CD as CD, KEPERT_K as K};

    let r = r.max(1e-6);
    let rm = r * 1000.0;
    let f = profile.coriolis();
    let sign = f.signum();
    let v = profile.velocity(r);
    let z = profile.vorticity(r);
    let vm = profile.v_max();
    let rmax = *profile.params().rmax;

    let umod = if v_fm > 0.0 && vm / v_fm < 5.0 {
        v_fm * (1.25 * (1.0 - v_fm / vm)).abs()
    } else {
        v_fm
    };
    let vt = if r > 2.0 * rmax {
        umod * (-((r / (2.0 * rmax)) - 1.0).powi(2)).exp()
    } else {
        umod
    };

    let al = (2.0 * v / rm + f) / (2.0 * K);
    let be = (f + z) / (2.0 * K);
    let gam = v / (2.0 * K * rm);

    let ab = al * be;
    if ab.is_nan() || ab <= 0.0 || be == 0.0 {
        // No inertially stable solution; carry the gradient wind
        let (s, c) = (lam - theta_fm).sin_cos();
        return (vt * c, v - vt * s);
    }
    let albe = (al / be).sqrt();
    let sab = ab.sqrt();

    let chi = (CD / K * v / sab.sqrt()).abs();
    let eta = (CD / K * v / (sab + gam.abs()).sqrt()).abs();
    let psi = (CD / K * v / (sab - gam.abs()).abs().sqrt()).abs();
    let regime_iii = gam.abs() > sab;

    let i = Complex::new(0.0, 1.0);
    let one = Complex::new(1.0, 0.0);

    let a0 = -(chi * (one + i * (1.0 + chi)) * v) / (2.0 * chi * chi + 3.0 * chi + 2.0);
    let u0s = a0.re * albe * sign;
    let v0s = a0.im;

    let am_num = -(psi * (one + 2.0 * albe + (one + i) * (1.0 + albe) * eta) * vt);
    let am = if regime_iii {
        am_num
            / (albe * ((2.0 - 2.0 * i) + 3.0 * (eta + psi) + (2.0 + 2.0 * i) * eta * psi))
    } else {
        am_num / (albe * ((2.0 + 2.0 * i) * (1.0 + eta * psi) + 3.0 * psi + 3.0 * i * eta))
    };
    let phase_m = (-i * (lam - theta_fm) * sign).exp();
    let ums = (am * phase_m).re * albe;
    let vms = (am * phase_m).im * sign;

    let ap = if regime_iii {
        -(eta * (one - 2.0 * albe + (one - i) * (1.0 - albe) * psi) * vt)
            / (albe * ((2.0 + 2.0 * i) + 3.0 * (eta + psi) + (2.0 - 2.0 * i) * eta * psi))
    } else {
        -(eta * (one - 2.0 * albe + (one + i) * (1.0 - albe) * psi) * vt)
            / (albe * ((2.0 + 2.0 * i) * (1.0 + eta * psi) + 3.0 * eta + 3.0 * i * psi))
    };
    let phase_p = (i * (lam - theta_fm) * sign).exp();
    let ups = (ap * phase_p).re * albe;
    let vps = (ap * phase_p).im * sign;

    let us = u0s + ups + ums;
    let vs = v0s + vps + vms + v;

    let (s, c) = (lam - theta_fm).sin_cos();
    (us + vt * c, vs - vt * s)
}
