//! # Fit parameters
//!
//! The seven scalars adjusted by the differential correction, in this order:
//!
//! | index | parameter | unit |
//! |---|---|---|
//! | 0 | semi-major axis `a` | km |
//! | 1 | eccentricity `e` | – |
//! | 2 | inclination `i` | rad |
//! | 3 | right ascension of the ascending node Ω | rad |
//! | 4 | argument of perigee ω | rad |
//! | 5 | mean anomaly `M` | rad |
//! | 6 | drag term B* | 1/earth radii |
//!
//! The vector is deliberately raw: angles are not wrapped and the
//! eccentricity is not clipped while the solver iterates. The normalized
//! values used for the text lines live in [`TleRecord`](crate::tle::TleRecord).

use nalgebra::SVector;
use std::{fmt, ops::Index};

use crate::{
    kepler::{mean_from_true, principal_angle},
    orbit_type::equinoctial_element::EquinoctialElements,
};

/// Number of fitted parameters.
pub const N_PARAMS: usize = 7;

pub const IDX_SEMI_MAJOR_AXIS: usize = 0;
pub const IDX_ECCENTRICITY: usize = 1;
pub const IDX_INCLINATION: usize = 2;
pub const IDX_RAAN: usize = 3;
pub const IDX_ARG_PERIGEE: usize = 4;
pub const IDX_MEAN_ANOMALY: usize = 5;
pub const IDX_BSTAR: usize = 6;

/// Ordered 7-vector `[a, e, i, Ω, ω, M, B*]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitParameters(SVector<f64, N_PARAMS>);

impl FitParameters {
    pub fn new(values: [f64; N_PARAMS]) -> Self {
        Self(SVector::from(values))
    }

    pub fn from_vector(values: SVector<f64, N_PARAMS>) -> Self {
        Self(values)
    }

    /// Fit parameters from an osculating equinoctial state plus a B* seed.
    ///
    /// The eccentricity is clipped to `[0, 1]`, Ω and ω are wrapped to
    /// `[0, 2π)`, and the mean anomaly is obtained from the true anomaly with
    /// Kepler's relation, then wrapped.
    pub fn from_equinoctial(equinoctial: &EquinoctialElements, bstar: f64) -> Self {
        let kep = equinoctial.to_keplerian();
        let ecc = kep.eccentricity.clamp(0.0, 1.0);

        Self::new([
            kep.semi_major_axis,
            ecc,
            kep.inclination,
            principal_angle(kep.ascending_node_longitude),
            principal_angle(kep.periapsis_argument),
            mean_from_true(kep.true_anomaly, ecc),
            bstar,
        ])
    }

    pub fn as_vector(&self) -> &SVector<f64, N_PARAMS> {
        &self.0
    }

    pub fn into_vector(self) -> SVector<f64, N_PARAMS> {
        self.0
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.0[IDX_SEMI_MAJOR_AXIS]
    }

    pub fn eccentricity(&self) -> f64 {
        self.0[IDX_ECCENTRICITY]
    }

    pub fn inclination(&self) -> f64 {
        self.0[IDX_INCLINATION]
    }

    pub fn raan(&self) -> f64 {
        self.0[IDX_RAAN]
    }

    pub fn arg_perigee(&self) -> f64 {
        self.0[IDX_ARG_PERIGEE]
    }

    pub fn mean_anomaly(&self) -> f64 {
        self.0[IDX_MEAN_ANOMALY]
    }

    pub fn bstar(&self) -> f64 {
        self.0[IDX_BSTAR]
    }

    /// Copy of `self` with parameter `idx` replaced.
    pub fn with(&self, idx: usize, value: f64) -> Self {
        let mut values = self.0;
        values[idx] = value;
        Self(values)
    }

    /// B* limited to `[-1, 1]`.
    pub fn with_clamped_bstar(&self) -> Self {
        self.with(IDX_BSTAR, self.bstar().clamp(-1.0, 1.0))
    }

    /// Eccentricity limited to `[0, 1]` and B* limited to `[-1, 1]`.
    pub fn clipped(&self) -> Self {
        self.with_clamped_bstar()
            .with(IDX_ECCENTRICITY, self.eccentricity().clamp(0.0, 1.0))
    }
}

impl Index<usize> for FitParameters {
    type Output = f64;

    fn index(&self, idx: usize) -> &f64 {
        &self.0[idx]
    }
}

impl std::ops::Add<SVector<f64, N_PARAMS>> for FitParameters {
    type Output = FitParameters;

    fn add(self, step: SVector<f64, N_PARAMS>) -> FitParameters {
        FitParameters(self.0 + step)
    }
}

impl fmt::Display for FitParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[a={:.6} km, e={:.8}, i={:.8}, raan={:.8}, aop={:.8}, M={:.8}, B*={:.6e}]",
            self.semi_major_axis(),
            self.eccentricity(),
            self.inclination(),
            self.raan(),
            self.arg_perigee(),
            self.mean_anomaly(),
            self.bstar()
        )
    }
}

#[cfg(test)]
mod fit_parameters_test {
    use super::*;
    use crate::constants::DPI;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    #[test]
    fn test_from_equinoctial_wraps_angles() {
        let mut rng = StdRng::seed_from_u64(2024);
        for _ in 0..2_000 {
            let equ = EquinoctialElements {
                semi_major_axis: rng.random_range(6_600.0..45_000.0),
                eccentricity_sin_lon: rng.random_range(-0.5..0.5),
                eccentricity_cos_lon: rng.random_range(-0.5..0.5),
                tan_half_incl_sin_node: rng.random_range(-2.0..2.0),
                tan_half_incl_cos_node: rng.random_range(-2.0..2.0),
                true_longitude: rng.random_range(-20.0..20.0),
            };
            let params = FitParameters::from_equinoctial(&equ, 1e-4);

            for idx in [IDX_RAAN, IDX_ARG_PERIGEE, IDX_MEAN_ANOMALY] {
                assert!((0.0..DPI).contains(&params[idx]), "{params}");
            }
            assert!((0.0..=1.0).contains(&params.eccentricity()));
            assert_eq!(params.bstar(), 1e-4);
        }
    }

    #[test]
    fn test_from_equinoctial_mean_anomaly() {
        let equ = EquinoctialElements {
            semi_major_axis: 7_000.0,
            eccentricity_sin_lon: 0.0,
            eccentricity_cos_lon: 0.1,
            tan_half_incl_sin_node: 0.0,
            tan_half_incl_cos_node: 0.5,
            true_longitude: 1.0,
        };
        let params = FitParameters::from_equinoctial(&equ, 0.0);

        assert_relative_eq!(params.eccentricity(), 0.1);
        assert_relative_eq!(params.inclination(), 2.0 * 0.5_f64.atan());
        assert_relative_eq!(params.mean_anomaly(), mean_from_true(1.0, 0.1));
    }

    #[test]
    fn test_clipping() {
        let raw = FitParameters::new([7_000.0, 1.3, 0.9, 1.0, 2.0, 3.0, -4.0]);
        let clipped = raw.clipped();
        assert_eq!(clipped.eccentricity(), 1.0);
        assert_eq!(clipped.bstar(), -1.0);
        assert_eq!(clipped.semi_major_axis(), 7_000.0);

        let only_bstar = raw.with_clamped_bstar();
        assert_eq!(only_bstar.eccentricity(), 1.3);
        assert_eq!(only_bstar.bstar(), -1.0);
    }
}
