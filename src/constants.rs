//! # Constants and type definitions for tlefit
//!
//! Physical constants, unit conversions and the small type aliases shared by
//! the element conversions, the evaluators and the differential correction.
//!
//! Lengths are kilometers and times are seconds unless a name says otherwise,
//! which matches the units of the SGP4 model and of the TLE mean motion field
//! (revolutions per day).

use nalgebra::Vector6;

// -------------------------------------------------------------------------------------------------
// Physical constants and unit conversions
// -------------------------------------------------------------------------------------------------

/// 2π, useful for trigonometric conversions
pub const DPI: f64 = 2. * std::f64::consts::PI;

/// Number of seconds in a day
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Number of minutes in a day
pub const MINUTES_PER_DAY: f64 = 1_440.0;

/// Degrees → radians
pub const RADEG: f64 = std::f64::consts::PI / 180.0;

/// Earth gravitational parameter in km³/s²
pub const EARTH_MU: f64 = 398_600.4418;

/// Earth equatorial radius in km (WGS-84)
pub const EARTH_RADIUS: f64 = 6_378.137;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Angle in degrees
pub type Degree = f64;
/// Angle in radians
pub type Radian = f64;
/// Distance in kilometers
pub type Kilometer = f64;

/// Cartesian state `[x, y, z, vx, vy, vz]` in km and km/s.
pub type State6 = Vector6<f64>;
