//! Semantic unit types for the quantities that cross the track/wind boundary
//!
//! Track files carry pressures in hPa, translation speed in km/h and bearings
//! as compass degrees. The vortex models work in Pa, m/s and mathematical
//! angles (radians counter-clockwise from east). These newtypes make each
//! conversion explicit at the point where it happens.
//!
//! # Usage
//! ```
//! use cyclone_sim_core::core_types::units::{Hectopascals, KilometersPerHour};
//!
//! let p = Hectopascals::new(950.0);
//! assert!((*p.to_pascals() - 95_000.0).abs() < 1e-9);
//!
//! let v = KilometersPerHour::new(36.0);
//! assert!((*v.to_meters_per_second() - 10.0).abs() < 1e-9);
//! ```

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Deref, Sub};

/// Shared newtype plumbing: total ordering, deref to the raw value,
/// addition/subtraction within the same unit and a unit suffix for display.
macro_rules! unit_newtype {
    ($name:ident, $suffix:literal) => {
        #[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
        #[repr(transparent)]
        pub struct $name(f64);

        impl $name {
            #[inline]
            #[must_use]
            pub const fn new(value: f64) -> Self {
                $name(value)
            }

            #[inline]
            #[must_use]
            pub const fn value(self) -> f64 {
                self.0
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Deref for $name {
            type Target = f64;
            #[inline]
            fn deref(&self) -> &f64 {
                &self.0
            }
        }

        impl Add for $name {
            type Output = Self;
            fn add(self, rhs: Self) -> Self {
                $name(self.0 + rhs.0)
            }
        }

        impl Sub for $name {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self {
                $name(self.0 - rhs.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:.2} {}", self.0, $suffix)
            }
        }
    };
}

// ============================================================================
// PRESSURE
// ============================================================================

unit_newtype!(Hectopascals, "hPa");
unit_newtype!(Pascals, "Pa");

impl Hectopascals {
    #[inline]
    #[must_use]
    pub fn to_pascals(self) -> Pascals {
        Pascals(self.0 * 100.0)
    }
}

impl Pascals {
    #[inline]
    #[must_use]
    pub fn to_hectopascals(self) -> Hectopascals {
        Hectopascals(self.0 / 100.0)
    }
}

impl From<Hectopascals> for Pascals {
    fn from(p: Hectopascals) -> Self {
        p.to_pascals()
    }
}

// ============================================================================
// SPEED AND DISTANCE
// ============================================================================

unit_newtype!(KilometersPerHour, "km/h");
unit_newtype!(MetersPerSecond, "m/s");
unit_newtype!(Kilometers, "km");

impl KilometersPerHour {
    #[inline]
    #[must_use]
    pub fn to_meters_per_second(self) -> MetersPerSecond {
        MetersPerSecond(self.0 / 3.6)
    }

    /// Distance covered in `hours` at this speed
    #[inline]
    #[must_use]
    pub fn distance_over(self, hours: f64) -> Kilometers {
        Kilometers(self.0 * hours)
    }
}

impl MetersPerSecond {
    #[inline]
    #[must_use]
    pub fn to_kilometers_per_hour(self) -> KilometersPerHour {
        KilometersPerHour(self.0 * 3.6)
    }
}

impl Kilometers {
    #[inline]
    #[must_use]
    pub fn to_meters(self) -> f64 {
        self.0 * 1000.0
    }
}

// ============================================================================
// ANGLES
// ============================================================================

unit_newtype!(Degrees, "°");

impl Degrees {
    /// Wrap into [0, 360)
    #[inline]
    #[must_use]
    pub fn wrapped(self) -> Self {
        let w = self.0.rem_euclid(360.0);
        // rem_euclid can round up to exactly 360.0 for tiny negative inputs
        Degrees(if w >= 360.0 { 0.0 } else { w })
    }

    #[inline]
    #[must_use]
    pub fn to_radians(self) -> f64 {
        self.0.to_radians()
    }

    /// Convert a compass bearing (clockwise from north) into a mathematical
    /// angle in radians (counter-clockwise from east).
    #[inline]
    #[must_use]
    pub fn bearing_to_theta(self) -> f64 {
        std::f64::consts::FRAC_PI_2 - self.0.to_radians()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pressure_conversion_round_trip() {
        let p = Hectopascals::new(1005.3);
        assert_relative_eq!(*p.to_pascals().to_hectopascals(), 1005.3, epsilon = 1e-9);
    }

    #[test]
    fn test_equality_agrees_with_ordering() {
        let nan = Pascals::new(f64::NAN);
        assert_eq!(nan, nan);
        assert_eq!(nan.cmp(&nan), Ordering::Equal);
        assert_ne!(Pascals::new(0.0), Pascals::new(-0.0));
        assert_eq!(Pascals::new(-0.0).cmp(&Pascals::new(0.0)), Ordering::Less);
        assert_eq!(Kilometers::new(30.0), Kilometers::new(30.0));
    }

    #[test]
    fn test_bearing_wraps_negative_and_large() {
        assert_relative_eq!(*Degrees::new(-30.0).wrapped(), 330.0);
        assert_relative_eq!(*Degrees::new(725.0).wrapped(), 5.0);
        assert!(*Degrees::new(-1e-15).wrapped() < 360.0);
    }

    #[test]
    fn test_bearing_to_theta() {
        // East-bound storm: bearing 90° is theta 0
        assert_relative_eq!(Degrees::new(90.0).bearing_to_theta(), 0.0, epsilon = 1e-12);
        // North-bound storm: bearing 0° is theta pi/2
        assert_relative_eq!(
            Degrees::new(0.0).bearing_to_theta(),
            std::f64::consts::FRAC_PI_2,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_units_order_totally() {
        let mut v = vec![Kilometers::new(3.0), Kilometers::new(1.0), Kilometers::new(2.0)];
        v.sort();
        assert_eq!(v[0], Kilometers::new(1.0));
        assert_eq!(v.iter().max(), Some(&Kilometers::new(3.0)));
    }
}
