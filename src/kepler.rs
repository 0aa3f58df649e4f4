//! # Kepler's equation and angle helpers
//!
//! Conversions between mean, eccentric and true anomaly for elliptic orbits,
//! and the angle normalization used by every element set of the crate.
//!
//! The eccentric anomaly is obtained with a Newton–Raphson iteration on
//! `E − e·sin(E) − M = 0` (via the `roots` crate), which converges in a
//! handful of iterations for the eccentricities found in TLE catalogs.

use roots::{find_root_newton_raphson, SimpleConvergency};
use std::f64::consts::PI;

use crate::{constants::DPI, tle_fit_errors::TleFitError};

/// Principal value of an angle in radians, in `[0, 2π)`.
///
/// `rem_euclid` can round a tiny negative input up to exactly `2π`; that case
/// folds back to `0`.
pub fn principal_angle(a: f64) -> f64 {
    let wrapped = a.rem_euclid(DPI);
    if wrapped >= DPI {
        0.0
    } else {
        wrapped
    }
}

/// Solve Kepler's equation `E − e·sin(E) = M` for the eccentric anomaly.
///
/// Arguments
/// ---------
/// * `mean_anomaly` – `M` in radians (any range).
/// * `eccentricity` – `e` in `[0, 1)`.
///
/// Return
/// ------
/// * The eccentric anomaly `E` in `[0, 2π)`, or the root finder error if the
///   iteration does not converge.
pub fn eccentric_from_mean(mean_anomaly: f64, eccentricity: f64) -> Result<f64, TleFitError> {
    let m = principal_angle(mean_anomaly);
    if eccentricity == 0.0 {
        return Ok(m);
    }

    let f = |e_anom: f64| -> f64 { e_anom - eccentricity * e_anom.sin() - m };
    let df = |e_anom: f64| -> f64 { 1.0 - eccentricity * e_anom.cos() };

    // Starting at π is safe for high eccentricities
    let x0 = if eccentricity > 0.8 {
        PI
    } else {
        m + eccentricity * m.sin()
    };

    let mut tol = SimpleConvergency {
        eps: f64::EPSILON * 1e2,
        max_iter: 50,
    };

    Ok(principal_angle(find_root_newton_raphson(
        x0, &f, &df, &mut tol,
    )?))
}

/// True anomaly from eccentric anomaly (elliptic case).
pub fn true_from_eccentric(eccentric_anomaly: f64, eccentricity: f64) -> f64 {
    let half = 0.5 * eccentric_anomaly;
    2.0 * ((1.0 + eccentricity).sqrt() * half.sin()).atan2((1.0 - eccentricity).sqrt() * half.cos())
}

/// Mean anomaly from true anomaly (elliptic case), wrapped to `[0, 2π)`.
pub fn mean_from_true(true_anomaly: f64, eccentricity: f64) -> f64 {
    let half = 0.5 * true_anomaly;
    let e_anom =
        2.0 * ((1.0 - eccentricity).sqrt() * half.sin()).atan2((1.0 + eccentricity).sqrt() * half.cos());
    principal_angle(e_anom - eccentricity * e_anom.sin())
}

/// True anomaly from mean anomaly (elliptic case), wrapped to `[0, 2π)`.
pub fn true_from_mean(mean_anomaly: f64, eccentricity: f64) -> Result<f64, TleFitError> {
    let e_anom = eccentric_from_mean(mean_anomaly, eccentricity)?;
    Ok(principal_angle(true_from_eccentric(e_anom, eccentricity)))
}
