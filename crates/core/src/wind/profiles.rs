//! Parametric radial wind and pressure profiles of a tropical cyclone vortex
//!
//! Each profile gives the gradient-level tangential wind `V(R)` and surface
//! pressure `P(R)` as pure functions of the distance `R` (km) from the storm
//! centre, parameterised by central/environmental pressure (Pa), radius of
//! maximum winds and latitude.
//!
//! # References
//! - Holland, G.J. (1980). "An analytic model of the wind and pressure profiles
//!   in hurricanes." Monthly Weather Review, 108, 1212-1218.
//! - Jelesnianski, C.P. (1965). "A numerical calculation of storm tides induced
//!   by a tropical storm impinging on a continental shelf." MWR, 93, 343-358.
//! - Schloemer, R.W. (1954). "Analysis and synthesis of hurricane wind patterns
//!   over Lake Okeechobee." Hydrometeorological Report 31.
//! - McConochie, J.D., Hardy, T.A., Mason, L.B. (2004). "Modelling tropical
//!   cyclone over-water wind and pressure fields." Ocean Engineering, 31.
//! - Willoughby, H.E., Darling, R.W.R., Rahn, M.E. (2006). "Parametric
//!   representation of the primary hurricane vortex. Part II." MWR, 134.
//! - Powell, M., Soukup, G., Cocke, S., et al. (2005). "State of Florida
//!   hurricane loss projection model." J. Wind Eng. Ind. Aerodyn., 93.
//!
//! # Holland family
//!
//! ```text
//! δ(R) = (Rmax / R)^β
//! V(R) = sqrt(β ΔP / ρ · δ e^(−δ) + (R f / 2)²) − R |f| / 2
//! P(R) = Pc + ΔP e^(−δ)
//! ```
//!
//! Inside `Rmax` the gradient wind is replaced by a cubic `V = aR³ + bR² + cR`
//! matched in value, slope and curvature at `Rmax`, so the core is solid-body
//! like and `V(0) = 0`. Powell (latitude/size-dependent β) and Schloemer
//! (β = 1) are Holland profiles with a different β.
//!
//! All velocities carry the sign of the Coriolis parameter, so rotation is
//! cyclonic in either hemisphere.

use crate::core_types::error::{CycloneError, Result};
use crate::core_types::units::{Kilometers, Pascals};
use serde::{Deserialize, Serialize};
use std::f64::consts::E;
use std::fmt;
use std::str::FromStr;

/// Vortex constants
pub mod constants {
    /// Near-surface air density (kg/m³)
    pub const RHO_AIR: f64 = 1.15;

    /// Earth's angular velocity (rad/s)
    pub const OMEGA: f64 = 7.292e-5;

    /// Holland β used to derive `v_max` for profiles without their own β
    pub const DEFAULT_BETA: f64 = 1.3;

    /// Decay exponent of the Rankine outer vortex
    pub const RANKINE_ALPHA: f64 = 0.5;

    /// Default radius of the secondary wind maximum for double-Holland (km)
    pub const DEFAULT_RMAX2_KM: f64 = 250.0;

    /// Willoughby short outer e-folding length (km)
    pub const WILLOUGHBY_X2_KM: f64 = 25.0;

    /// Width of the Willoughby inner/outer blending zone (km)
    pub const WILLOUGHBY_TRANSITION_KM: f64 = 25.0;

    /// Powell β bounds
    pub const POWELL_BETA_MIN: f64 = 0.8;
    pub const POWELL_BETA_MAX: f64 = 2.2;
}

/// Coriolis parameter (1/s)
#[inline]
#[must_use]
pub fn coriolis(lat: f64) -> f64 {
    2.0 * constants::OMEGA * lat.to_radians().sin()
}

/// Radial profile selector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileType {
    Rankine,
    Jelesnianski,
    Holland,
    Schloemer,
    #[serde(alias = "double_holland")]
    DoubleHolland,
    Willoughby,
    #[default]
    Powell,
}

impl ProfileType {
    pub const ALL: [ProfileType; 7] = [
        ProfileType::Rankine,
        ProfileType::Jelesnianski,
        ProfileType::Holland,
        ProfileType::Schloemer,
        ProfileType::DoubleHolland,
        ProfileType::Willoughby,
        ProfileType::Powell,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            ProfileType::Rankine => "rankine",
            ProfileType::Jelesnianski => "jelesnianski",
            ProfileType::Holland => "holland",
            ProfileType::Schloemer => "schloemer",
            ProfileType::DoubleHolland => "doubleholland",
            ProfileType::Willoughby => "willoughby",
            ProfileType::Powell => "powell",
        }
    }
}

impl FromStr for ProfileType {
    type Err = CycloneError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rankine" => Ok(Self::Rankine),
            "jelesnianski" => Ok(Self::Jelesnianski),
            "holland" => Ok(Self::Holland),
            "schloemer" => Ok(Self::Schloemer),
            "doubleholland" | "double_holland" => Ok(Self::DoubleHolland),
            "willoughby" => Ok(Self::Willoughby),
            "powell" => Ok(Self::Powell),
            _ => Err(CycloneError::UnknownModel {
                kind: "profile",
                name: s.to_string(),
            }),
        }
    }
}

impl fmt::Display for ProfileType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Storm parameters at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VortexParams {
    pub lat: f64,
    pub lon: f64,
    pub env_pressure: Pascals,
    pub central_pressure: Pascals,
    pub rmax: Kilometers,
    /// Holland β (Holland profile only)
    pub beta: f64,
    /// Inner β of the double-Holland profile
    pub beta1: f64,
    /// Outer β of the double-Holland profile
    pub beta2: f64,
    /// Radius of the secondary maximum (double-Holland)
    pub rmax2: Kilometers,
}

impl VortexParams {
    #[must_use]
    pub fn new(
        lat: f64,
        lon: f64,
        env_pressure: Pascals,
        central_pressure: Pascals,
        rmax: Kilometers,
    ) -> Self {
        Self {
            lat,
            lon,
            env_pressure,
            central_pressure,
            rmax,
            beta: 1.5,
            beta1: 1.5,
            beta2: 1.4,
            rmax2: Kilometers::new(constants::DEFAULT_RMAX2_KM),
        }
    }

    #[must_use]
    pub fn with_betas(mut self, beta: f64, beta1: f64, beta2: f64) -> Self {
        self.beta = beta;
        self.beta1 = beta1;
        self.beta2 = beta2;
        self
    }

    #[must_use]
    pub fn with_rmax2(mut self, rmax2: Kilometers) -> Self {
        self.rmax2 = rmax2;
        self
    }

    /// Pressure deficit (Pa)
    #[must_use]
    pub fn pressure_deficit(&self) -> f64 {
        *self.env_pressure - *self.central_pressure
    }
}

/// Inner-core cubic `V = R(R(aR + b) + c)` with R in km
#[derive(Debug, Clone, Copy, PartialEq)]
struct CubicCore {
    a: f64,
    b: f64,
    c: f64,
}

impl CubicCore {
    /// Cubic through the origin matching value, slope and curvature of
    /// `outer` at `rmax`
    fn fit(rmax: f64, outer: impl Fn(f64) -> f64) -> Self {
        let h = 1e-3 * rmax;
        let v0 = outer(rmax);
        let vp = outer(rmax + h);
        let vm = outer(rmax - h);
        let d1 = (vp - vm) / (2.0 * h);
        let d2 = (vp - 2.0 * v0 + vm) / (h * h);

        let a = (d2 / 2.0 - (d1 - v0 / rmax) / rmax) / rmax;
        let b = (d2 - 6.0 * a * rmax) / 2.0;
        let c = d1 - 3.0 * a * rmax * rmax - 2.0 * b * rmax;
        Self { a, b, c }
    }

    #[inline]
    fn eval(&self, r: f64) -> f64 {
        r * (r * (r * self.a + self.b) + self.c)
    }
}

/// A radial profile resolved for one set of storm parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    kind: ProfileType,
    params: VortexParams,
    dp: f64,
    f: f64,
    /// β entering the Holland-family formulas (pressure β for Willoughby)
    beta: f64,
    v_max: f64,
    /// Pressure split (dp1, dp2) for double-Holland
    dp_split: (f64, f64),
    core: Option<CubicCore>,
}

impl Profile {
    #[must_use]
    pub fn new(kind: ProfileType, params: VortexParams) -> Self {
        let dp = params.pressure_deficit().max(0.0);
        let f = coriolis(params.lat);
        let rmax = *params.rmax;
        let v_max_for = |beta: f64| (beta * dp / (E * constants::RHO_AIR)).sqrt();

        let mut profile = Self {
            kind,
            params,
            dp,
            f,
            beta: constants::DEFAULT_BETA,
            v_max: v_max_for(constants::DEFAULT_BETA),
            dp_split: (dp, 0.0),
            core: None,
        };

        match kind {
            ProfileType::Rankine | ProfileType::Jelesnianski => {}
            ProfileType::Holland => {
                profile.beta = params.beta;
                profile.v_max = v_max_for(params.beta);
            }
            ProfileType::Schloemer => {
                profile.beta = 1.0;
                profile.v_max = v_max_for(1.0);
            }
            ProfileType::Powell => {
                profile.beta = powell_beta(params.lat, rmax);
                profile.v_max = v_max_for(profile.beta);
            }
            ProfileType::DoubleHolland => {
                let dp2 = double_holland_dp2(dp);
                profile.dp_split = (dp - dp2, dp2);
                profile.beta = params.beta1;
                profile.v_max = v_max_for(params.beta1);
            }
            ProfileType::Willoughby => {
                profile.beta = willoughby_rahn_beta(profile.v_max, rmax, params.lat);
            }
        }

        if matches!(
            kind,
            ProfileType::Holland
                | ProfileType::Schloemer
                | ProfileType::Powell
                | ProfileType::DoubleHolland
        ) && rmax > 0.0
        {
            let core = CubicCore::fit(rmax, |r| profile.gradient_outer(r));
            profile.core = Some(core);
        }

        profile
    }

    #[must_use]
    pub fn kind(&self) -> ProfileType {
        self.kind
    }

    #[must_use]
    pub fn params(&self) -> &VortexParams {
        &self.params
    }

    /// Coriolis parameter at the storm centre (1/s)
    #[must_use]
    pub fn coriolis(&self) -> f64 {
        self.f
    }

    /// Effective Holland β of this profile
    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Maximum gradient wind magnitude (m/s)
    #[must_use]
    pub fn v_max(&self) -> f64 {
        self.v_max
    }

    #[inline]
    fn hemisphere(&self) -> f64 {
        self.f.signum()
    }

    /// Unsigned outer gradient wind of the Holland family (m/s)
    fn gradient_outer(&self, r: f64) -> f64 {
        let rmax = *self.params.rmax;
        let rf2 = r * 1000.0 * self.f.abs() / 2.0;
        let inner = match self.kind {
            ProfileType::DoubleHolland => {
                let (dp1, dp2) = self.dp_split;
                let mu = (rmax / r).powf(self.params.beta1);
                let nu = (*self.params.rmax2 / r).powf(self.params.beta2);
                self.params.beta1 * dp1 / constants::RHO_AIR * mu * (-mu).exp()
                    + self.params.beta2 * dp2 / constants::RHO_AIR * nu * (-nu).exp()
            }
            _ => {
                let delta = (rmax / r).powf(self.beta);
                self.beta * self.dp / constants::RHO_AIR * delta * (-delta).exp()
            }
        };
        (inner + rf2 * rf2).sqrt() - rf2
    }

    /// Unsigned tangential wind (m/s). The Rankine eye carries the peak
    /// velocity; every other profile is calm there.
    fn speed(&self, r: f64) -> f64 {
        if r <= 0.0 {
            return match self.kind {
                ProfileType::Rankine => self.v_max,
                _ => 0.0,
            };
        }
        let rmax = *self.params.rmax;
        let vm = self.v_max;
        match self.kind {
            ProfileType::Rankine => {
                if r <= rmax {
                    vm * r / rmax
                } else {
                    vm * (rmax / r).powf(constants::RANKINE_ALPHA)
                }
            }
            ProfileType::Jelesnianski => 2.0 * vm * rmax * r / (rmax * rmax + r * r),
            ProfileType::Willoughby => self.willoughby_speed(r),
            ProfileType::Holland
            | ProfileType::Schloemer
            | ProfileType::Powell
            | ProfileType::DoubleHolland => match self.core {
                Some(core) if r <= rmax => core.eval(r),
                _ => self.gradient_outer(r),
            },
        }
    }

    fn willoughby_speed(&self, r: f64) -> f64 {
        let rmax = *self.params.rmax;
        let vm = self.v_max;
        let alat = self.params.lat.abs();

        let n = 0.4067 + 0.0144 * vm - 0.0038 * alat;
        let x1 = 287.6 - 1.942 * vm + 7.799 * rmax.ln() + 1.819 * alat;
        let a = (0.0696 + 0.0049 * vm - 0.0064 * alat).max(0.0);
        let x2 = constants::WILLOUGHBY_X2_KM;

        let inner = |r: f64| vm * (r / rmax).powf(n);
        let outer = |r: f64| {
            vm * ((1.0 - a) * (-(r - rmax) / x1).exp() + a * (-(r - rmax) / x2).exp())
        };

        let r1 = rmax - constants::WILLOUGHBY_TRANSITION_KM / 2.0;
        let r2 = rmax + constants::WILLOUGHBY_TRANSITION_KM / 2.0;
        if r <= r1 {
            inner(r)
        } else if r >= r2 {
            outer(r)
        } else {
            let xi = (r - r1) / (r2 - r1);
            let w = 126.0 * xi.powi(5) - 420.0 * xi.powi(6) + 540.0 * xi.powi(7)
                - 315.0 * xi.powi(8)
                + 70.0 * xi.powi(9);
            inner(r) * (1.0 - w) + outer(r) * w
        }
    }

    /// Tangential gradient wind at `r` km (m/s), cyclonic sign
    #[must_use]
    pub fn velocity(&self, r: f64) -> f64 {
        self.hemisphere() * self.speed(r)
    }

    /// Surface pressure at `r` km (Pa)
    #[must_use]
    pub fn pressure(&self, r: f64) -> f64 {
        let rmax = *self.params.rmax;
        let pc = *self.params.central_pressure;
        let pe = *self.params.env_pressure;
        let dp = self.dp;
        match self.kind {
            ProfileType::Rankine => {
                if r <= rmax {
                    pc + dp / 2.0 * (r / rmax).powi(2)
                } else {
                    pe - dp / 2.0 * (rmax / r).powi(2)
                }
            }
            ProfileType::Jelesnianski => pc + dp * r * r / (rmax * rmax + r * r),
            ProfileType::DoubleHolland => {
                let (dp1, dp2) = self.dp_split;
                let mu = (rmax / r).powf(self.params.beta1);
                let nu = (*self.params.rmax2 / r).powf(self.params.beta2);
                pc + dp1 * (-mu).exp() + dp2 * (-nu).exp()
            }
            ProfileType::Holland
            | ProfileType::Schloemer
            | ProfileType::Powell
            | ProfileType::Willoughby => pc + dp * (-(rmax / r).powf(self.beta)).exp(),
        }
    }

    /// Relative vorticity `dV/dr + V/r` at `r` km (1/s), cyclonic sign
    #[must_use]
    pub fn vorticity(&self, r: f64) -> f64 {
        let r = r.max(1e-6);
        let rmax = *self.params.rmax;
        let vm = self.v_max;
        let z = match self.kind {
            ProfileType::Rankine => {
                if r <= rmax {
                    2.0 * vm / (rmax * 1000.0)
                } else {
                    (1.0 - constants::RANKINE_ALPHA) * self.speed(r) / (r * 1000.0)
                }
            }
            ProfileType::Jelesnianski => {
                let rm = rmax * 1000.0;
                let rr = r * 1000.0;
                4.0 * vm * rm.powi(3) / (rm * rm + rr * rr).powi(2)
            }
            _ => {
                let h = r * 1e-4;
                let dvdr = (self.speed(r + h) - self.speed(r - h)) / (2.0 * h);
                (dvdr + self.speed(r) / r) / 1000.0
            }
        };
        self.hemisphere() * z
    }
}

/// Powell et al. (2005) β from latitude and rMax (km), clipped
#[must_use]
pub fn powell_beta(lat: f64, rmax: f64) -> f64 {
    (1.881093 - 0.010917 * lat.abs() - 0.005567 * rmax)
        .clamp(constants::POWELL_BETA_MIN, constants::POWELL_BETA_MAX)
}

/// Willoughby & Rahn (2004) β used for the Willoughby pressure profile
#[must_use]
pub fn willoughby_rahn_beta(v_max: f64, rmax: f64, lat: f64) -> f64 {
    1.0036 + 0.0173 * v_max - 0.0313 * rmax.ln() + 0.0087 * lat.abs()
}

/// Pressure deficit (Pa) assigned to the outer vortex of the double-Holland
/// profile
#[must_use]
pub fn double_holland_dp2(dp: f64) -> f64 {
    if dp < 1500.0 {
        (dp / 1500.0) * (800.0 + (dp - 800.0) / 2000.0)
    } else {
        800.0 + (dp - 800.0) / 2000.0
    }
}
