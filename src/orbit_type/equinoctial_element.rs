//! # Equinoctial orbital elements
//!
//! Non-singular element set `(a, h, k, p, q, L)`:
//!
//! - `h = e·sin(ϖ)`, `k = e·cos(ϖ)` with ϖ = Ω + ω the longitude of periapsis,
//! - `p = tan(i/2)·sin(Ω)`, `q = tan(i/2)·cos(Ω)`,
//! - `L = ϖ + ν` the true longitude.
//!
//! This is the intermediate representation used to seed a TLE fit from an
//! osculating Cartesian state: it stays well defined for near-circular and
//! near-equatorial orbits, and the degenerate angles are only resolved once,
//! when going back to Keplerian form.

use std::fmt;

use crate::{
    constants::State6, kepler::principal_angle,
    orbit_type::keplerian_element::KeplerianElements, tle_fit_errors::TleFitError,
};

/// Equinoctial orbital elements.
/// Units:
/// - a: km
/// - h, k: dimensionless (related to eccentricity)
/// - p, q: dimensionless (related to inclination)
/// - true_longitude: radians
#[derive(Debug, PartialEq, Clone)]
pub struct EquinoctialElements {
    pub semi_major_axis: f64,        // Semi-major axis (km)
    pub eccentricity_sin_lon: f64,   // h = e * sin(Ω + ω)
    pub eccentricity_cos_lon: f64,   // k = e * cos(Ω + ω)
    pub tan_half_incl_sin_node: f64, // p = tan(i/2) * sin(Ω)
    pub tan_half_incl_cos_node: f64, // q = tan(i/2) * cos(Ω)
    pub true_longitude: f64,         // L = Ω + ω + ν
}

impl EquinoctialElements {
    /// Osculating equinoctial elements of a Cartesian state (km, km/s).
    ///
    /// See also
    /// --------
    /// * [`KeplerianElements::from_cartesian`] – does the actual state inversion.
    pub fn from_cartesian(state: &State6, mu: f64) -> Result<Self, TleFitError> {
        Ok(Self::from(&KeplerianElements::from_cartesian(state, mu)?))
    }

    /// Eccentricity `e = sqrt(h² + k²)`.
    pub fn eccentricity(&self) -> f64 {
        self.eccentricity_sin_lon.hypot(self.eccentricity_cos_lon)
    }

    /// Convert back to Keplerian elements `(a, e, i, Ω, ω, ν)`.
    ///
    /// Degenerate cases are handled as follows:
    /// - If `e ≈ 0`, ϖ is set to `0` (periapsis undefined).
    /// - If `tan(i/2) ≈ 0`, Ω is set to `0` (node undefined).
    ///
    /// All angles are normalized to `[0, 2π)`.
    pub fn to_keplerian(&self) -> KeplerianElements {
        let eps = 1.0e-12;
        let ecc = self.eccentricity();

        // ϖ = atan2(h, k), undefined when e ~ 0
        let dig = if ecc < eps {
            0.0
        } else {
            self.eccentricity_sin_lon.atan2(self.eccentricity_cos_lon)
        };

        // t = tan(i/2) = sqrt(p^2 + q^2)
        let tgi2 = self
            .tan_half_incl_sin_node
            .hypot(self.tan_half_incl_cos_node);

        // Ω = atan2(p, q), undefined when t ~ 0
        let omega_node = if tgi2 < eps {
            0.0
        } else {
            self.tan_half_incl_sin_node
                .atan2(self.tan_half_incl_cos_node)
        };

        KeplerianElements {
            semi_major_axis: self.semi_major_axis,
            eccentricity: ecc,
            inclination: 2.0 * tgi2.atan(),
            ascending_node_longitude: principal_angle(omega_node),
            periapsis_argument: principal_angle(dig - omega_node),
            true_anomaly: principal_angle(self.true_longitude - dig),
        }
    }
}

impl From<&KeplerianElements> for EquinoctialElements {
    fn from(k: &KeplerianElements) -> Self {
        let dig = k.ascending_node_longitude + k.periapsis_argument;
        let tgi2 = (k.inclination / 2.0).tan();

        EquinoctialElements {
            semi_major_axis: k.semi_major_axis,
            eccentricity_sin_lon: k.eccentricity * dig.sin(),
            eccentricity_cos_lon: k.eccentricity * dig.cos(),
            tan_half_incl_sin_node: tgi2 * k.ascending_node_longitude.sin(),
            tan_half_incl_cos_node: tgi2 * k.ascending_node_longitude.cos(),
            true_longitude: principal_angle(dig + k.true_anomaly),
        }
    }
}

impl From<KeplerianElements> for EquinoctialElements {
    fn from(k: KeplerianElements) -> Self {
        EquinoctialElements::from(&k)
    }
}

impl fmt::Display for EquinoctialElements {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Equinoctial Elements")?;
        writeln!(f, "-------------------------------------------")?;
        writeln!(f, "  a = {:.6} km", self.semi_major_axis)?;
        writeln!(f, "  h = {:.9}", self.eccentricity_sin_lon)?;
        writeln!(f, "  k = {:.9}", self.eccentricity_cos_lon)?;
        writeln!(f, "  p = {:.9}", self.tan_half_incl_sin_node)?;
        writeln!(f, "  q = {:.9}", self.tan_half_incl_cos_node)?;
        writeln!(f, "  L = {:.9} rad", self.true_longitude)
    }
}

#[cfg(test)]
mod test_equinoctial_element {
    use super::*;
    use crate::{constants::EARTH_MU, orbit_type::keplerian_element::test_keplerian_element::leo_elements};
    use approx::assert_relative_eq;

    #[test]
    fn test_keplerian_round_trip() {
        let kep = leo_elements();
        let equ = EquinoctialElements::from(&kep);
        let back = equ.to_keplerian();

        assert_relative_eq!(back.semi_major_axis, kep.semi_major_axis);
        assert_relative_eq!(back.eccentricity, kep.eccentricity, epsilon = 1e-15);
        assert_relative_eq!(back.inclination, kep.inclination, epsilon = 1e-14);
        assert_relative_eq!(
            back.ascending_node_longitude,
            kep.ascending_node_longitude,
            epsilon = 1e-14
        );
        assert_relative_eq!(back.periapsis_argument, kep.periapsis_argument, epsilon = 1e-13);
        assert_relative_eq!(back.true_anomaly, kep.true_anomaly, epsilon = 1e-13);
    }

    #[test]
    fn test_from_cartesian_matches_keplerian_path() {
        let kep = leo_elements();
        let state = kep.to_cartesian(EARTH_MU);
        let equ = EquinoctialElements::from_cartesian(&state, EARTH_MU).unwrap();

        assert_relative_eq!(equ.eccentricity(), kep.eccentricity, max_relative = 1e-10);
        assert_relative_eq!(
            equ.true_longitude,
            principal_angle(
                kep.ascending_node_longitude + kep.periapsis_argument + kep.true_anomaly
            ),
            epsilon = 1e-10
        );
    }

    #[test]
    fn test_circular_equatorial_degeneracy() {
        let equ = EquinoctialElements {
            semi_major_axis: 42_164.0,
            eccentricity_sin_lon: 0.0,
            eccentricity_cos_lon: 0.0,
            tan_half_incl_sin_node: 0.0,
            tan_half_incl_cos_node: 0.0,
            true_longitude: 1.5,
        };
        let kep = equ.to_keplerian();
        assert_eq!(kep.eccentricity, 0.0);
        assert_eq!(kep.inclination, 0.0);
        assert_eq!(kep.ascending_node_longitude, 0.0);
        assert_eq!(kep.periapsis_argument, 0.0);
        assert_eq!(kep.true_anomaly, 1.5);
    }
}
