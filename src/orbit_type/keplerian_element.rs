//! # Keplerian orbital elements
//!
//! The six classical elements of an elliptic two-body orbit:
//!
//! 1. **a** – Semi-major axis (km)
//! 2. **e** – Eccentricity (unitless)
//! 3. **i** – Inclination (radians)
//! 4. **Ω** – Longitude of ascending node (radians)
//! 5. **ω** – Argument of periapsis (radians)
//! 6. **ν** – True anomaly (radians)
//!
//! The true anomaly is stored (rather than the mean anomaly) because it is
//! what falls out of a Cartesian state directly; [`KeplerianElements::mean_anomaly`]
//! applies Kepler's relation when the mean anomaly is needed.
//!
//! ## Degeneracies
//!
//! - **Circular orbits (`e → 0`)**: the periapsis is undefined; it is placed at
//!   the ascending node (ω = 0, ν = argument of latitude).
//! - **Equatorial orbits (`i → 0`)**: the node is undefined; Ω is set to `0`.

use nalgebra::{Rotation3, Vector3};
use std::fmt;

use crate::{
    constants::State6,
    kepler::{mean_from_true, principal_angle},
    tle_fit_errors::TleFitError,
};

/// Keplerian orbital elements (osculating, two-body).
///
/// Units
/// -----
/// * `semi_major_axis`: km.
/// * `eccentricity`: unitless.
/// * `inclination`, `ascending_node_longitude`, `periapsis_argument`,
///   `true_anomaly`: radians.
#[derive(Debug, PartialEq, Clone)]
pub struct KeplerianElements {
    pub semi_major_axis: f64,
    pub eccentricity: f64,
    pub inclination: f64,
    pub ascending_node_longitude: f64,
    pub periapsis_argument: f64,
    pub true_anomaly: f64,
}

impl KeplerianElements {
    /// Build osculating elements from a Cartesian state.
    ///
    /// Arguments
    /// ---------
    /// * `state` – `[x, y, z, vx, vy, vz]` in km and km/s, any inertial frame.
    /// * `mu` – gravitational parameter of the central body (km³/s²).
    ///
    /// Return
    /// ------
    /// * The Keplerian elements, all angles in `[0, 2π)`.
    /// * `TleFitError::InvalidObservations` if the state is degenerate (zero
    ///   angular momentum) or not on an elliptic orbit.
    pub fn from_cartesian(state: &State6, mu: f64) -> Result<Self, TleFitError> {
        let position = Vector3::new(state[0], state[1], state[2]);
        let velocity = Vector3::new(state[3], state[4], state[5]);

        let r = position.norm();
        let v2 = velocity.norm_squared();

        // Angular momentum
        let elle = position.cross(&velocity);
        let elmod = elle.norm();
        if elmod == 0.0 || r == 0.0 {
            return Err(TleFitError::InvalidObservations(
                "state has zero angular momentum".into(),
            ));
        }

        // Reciprocal semi-major axis
        let reca = 2.0 / r - v2 / mu;
        if reca <= 0.0 {
            return Err(TleFitError::InvalidObservations(format!(
                "state is not on an elliptic orbit (1/a = {reca})"
            )));
        }
        let sma = 1.0 / reca;

        // Inclination and node
        let sini = (elle.x * elle.x + elle.y * elle.y).sqrt() / elmod;
        let inclination = principal_angle(sini.atan2(elle.z / elmod));
        let node = if sini == 0.0 {
            0.0
        } else {
            principal_angle(elle.x.atan2(-elle.y))
        };

        // Argument of latitude in the orbital plane
        let node_dir = Vector3::new(node.cos(), node.sin(), 0.0);
        let in_plane = (elle / elmod).cross(&node_dir);
        let arg_latitude = position.dot(&in_plane).atan2(position.dot(&node_dir));

        // e·sin(ν) and e·cos(ν)
        let rv = position.dot(&velocity);
        let esinf = elmod * rv / (mu * r);
        let ecosf = elmod * elmod / (mu * r) - 1.0;
        let ecc = (esinf * esinf + ecosf * ecosf).sqrt();
        let true_anomaly = if ecc < 1e-12 {
            0.0
        } else {
            principal_angle(esinf.atan2(ecosf))
        };

        Ok(Self {
            semi_major_axis: sma,
            eccentricity: ecc,
            inclination,
            ascending_node_longitude: node,
            periapsis_argument: principal_angle(arg_latitude - true_anomaly),
            true_anomaly,
        })
    }

    /// Mean anomaly corresponding to the stored true anomaly, in `[0, 2π)`.
    pub fn mean_anomaly(&self) -> f64 {
        mean_from_true(self.true_anomaly, self.eccentricity)
    }

    /// Cartesian state `[r, v]` (km, km/s) in the frame the elements refer to.
    pub fn to_cartesian(&self, mu: f64) -> State6 {
        let ecc = self.eccentricity;
        let semi_latus = self.semi_major_axis * (1.0 - ecc * ecc);
        let (sin_nu, cos_nu) = self.true_anomaly.sin_cos();
        let radius = semi_latus / (1.0 + ecc * cos_nu);

        let pos_pf = Vector3::new(radius * cos_nu, radius * sin_nu, 0.0);
        let vel_pf = (mu / semi_latus).sqrt() * Vector3::new(-sin_nu, ecc + cos_nu, 0.0);

        let rot = Rotation3::from_axis_angle(&Vector3::z_axis(), self.ascending_node_longitude)
            * Rotation3::from_axis_angle(&Vector3::x_axis(), self.inclination)
            * Rotation3::from_axis_angle(&Vector3::z_axis(), self.periapsis_argument);

        let pos = rot * pos_pf;
        let vel = rot * vel_pf;
        State6::new(pos.x, pos.y, pos.z, vel.x, vel.y, vel.z)
    }
}

impl fmt::Display for KeplerianElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rad_to_deg = 180.0 / std::f64::consts::PI;
        writeln!(f, "Keplerian Elements")?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(
            f,
            "  a   (semi-major axis)       = {:.6} km",
            self.semi_major_axis
        )?;
        writeln!(f, "  e   (eccentricity)          = {:.8}", self.eccentricity)?;
        writeln!(
            f,
            "  i   (inclination)           = {:.6} rad ({:.6}°)",
            self.inclination,
            self.inclination * rad_to_deg
        )?;
        writeln!(
            f,
            "  Ω   (longitude of node)     = {:.6} rad ({:.6}°)",
            self.ascending_node_longitude,
            self.ascending_node_longitude * rad_to_deg
        )?;
        writeln!(
            f,
            "  ω   (argument of periapsis) = {:.6} rad ({:.6}°)",
            self.periapsis_argument,
            self.periapsis_argument * rad_to_deg
        )?;
        writeln!(
            f,
            "  ν   (true anomaly)          = {:.6} rad ({:.6}°)",
            self.true_anomaly,
            self.true_anomaly * rad_to_deg
        )
    }
}

#[cfg(test)]
pub(crate) mod test_keplerian_element {
    use super::*;
    use crate::constants::EARTH_MU;
    use approx::assert_relative_eq;

    pub(crate) fn leo_elements() -> KeplerianElements {
        KeplerianElements {
            semi_major_axis: 7_000.0,
            eccentricity: 0.05,
            inclination: 0.9,
            ascending_node_longitude: 1.2,
            periapsis_argument: 0.7,
            true_anomaly: 2.1,
        }
    }

    #[test]
    fn test_cartesian_round_trip() {
        let kep = leo_elements();
        let state = kep.to_cartesian(EARTH_MU);
        let back = KeplerianElements::from_cartesian(&state, EARTH_MU).unwrap();

        assert_relative_eq!(back.semi_major_axis, kep.semi_major_axis, max_relative = 1e-12);
        assert_relative_eq!(back.eccentricity, kep.eccentricity, max_relative = 1e-10);
        assert_relative_eq!(back.inclination, kep.inclination, epsilon = 1e-12);
        assert_relative_eq!(
            back.ascending_node_longitude,
            kep.ascending_node_longitude,
            epsilon = 1e-12
        );
        assert_relative_eq!(back.periapsis_argument, kep.periapsis_argument, epsilon = 1e-10);
        assert_relative_eq!(back.true_anomaly, kep.true_anomaly, epsilon = 1e-10);
    }

    #[test]
    fn test_vis_viva() {
        let kep = leo_elements();
        let state = kep.to_cartesian(EARTH_MU);
        let r = state.fixed_rows::<3>(0).norm();
        let v2 = state.fixed_rows::<3>(3).norm_squared();
        assert_relative_eq!(
            v2,
            EARTH_MU * (2.0 / r - 1.0 / kep.semi_major_axis),
            max_relative = 1e-12
        );
    }

    #[test]
    fn test_hyperbolic_state_rejected() {
        let state = State6::new(7_000.0, 0.0, 0.0, 0.0, 12.0, 0.0);
        let err = KeplerianElements::from_cartesian(&state, EARTH_MU).unwrap_err();
        assert!(matches!(err, TleFitError::InvalidObservations(_)));
    }

    #[test]
    fn test_equatorial_circular_orbit() {
        let v = (EARTH_MU / 7_000.0_f64).sqrt();
        let state = State6::new(0.0, 7_000.0, 0.0, -v, 0.0, 0.0);
        let kep = KeplerianElements::from_cartesian(&state, EARTH_MU).unwrap();

        assert_relative_eq!(kep.semi_major_axis, 7_000.0, max_relative = 1e-12);
        assert!(kep.eccentricity < 1e-12);
        assert_eq!(kep.ascending_node_longitude, 0.0);
        assert_eq!(kep.true_anomaly, 0.0);
        // position is a quarter turn from the x axis
        assert_relative_eq!(kep.periapsis_argument, std::f64::consts::FRAC_PI_2, epsilon = 1e-12);
    }
}
