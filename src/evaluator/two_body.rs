//! Analytic two-body evaluator.
//!
//! The mean anomaly advances linearly, `M(t) = M₀ + n·(t − t₀)` with
//! `n = √(μ/a³)`, and the state is rebuilt from the Keplerian elements after
//! solving Kepler's equation. The reference epoch `t₀` is the epoch encoded
//! in line 1 ([`TleRecord::tle_epoch`]).

use hifitime::Epoch;

use super::{EphemerisPoint, StateEvaluator};
use crate::{
    constants::{State6, EARTH_MU},
    kepler::true_from_mean,
    observations::Frame,
    orbit_type::keplerian_element::KeplerianElements,
    tle::TleRecord,
    tle_fit_errors::TleFitError,
};

/// Keplerian propagation around a point mass of parameter `mu` (km³/s²).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TwoBodyEvaluator {
    pub mu: f64,
}

impl Default for TwoBodyEvaluator {
    fn default() -> Self {
        Self { mu: EARTH_MU }
    }
}

impl TwoBodyEvaluator {
    pub fn new(mu: f64) -> Self {
        Self { mu }
    }
}

/// Elements of one candidate frozen at its reference epoch.
#[derive(Debug, Clone)]
pub struct TwoBodyPoint {
    reference_epoch: Epoch,
    elements: KeplerianElements,
    mean_anomaly: f64,
    mean_motion: f64,
    mu: f64,
}

impl StateEvaluator for TwoBodyEvaluator {
    type Point = TwoBodyPoint;

    fn attach(&self, record: &TleRecord) -> Result<TwoBodyPoint, TleFitError> {
        let sma = record.semi_major_axis();
        let ecc = record.eccentricity();
        if !(sma > 0.0) || !(ecc < 1.0) {
            return Err(TleFitError::Propagator(format!(
                "two-body propagation needs an elliptic orbit (a = {sma} km, e = {ecc})"
            )));
        }

        Ok(TwoBodyPoint {
            reference_epoch: record.tle_epoch(),
            elements: KeplerianElements {
                semi_major_axis: sma,
                eccentricity: ecc,
                inclination: record.inclination(),
                ascending_node_longitude: record.raan(),
                periapsis_argument: record.arg_perigee(),
                true_anomaly: 0.0,
            },
            mean_anomaly: record.mean_anomaly(),
            mean_motion: (self.mu / sma.powi(3)).sqrt(),
            mu: self.mu,
        })
    }
}

impl EphemerisPoint for TwoBodyPoint {
    fn state(&self, epoch: Epoch, _frame: Frame) -> Result<State6, TleFitError> {
        let dt = (epoch - self.reference_epoch).to_seconds();
        let mean_anomaly = self.mean_anomaly + self.mean_motion * dt;

        let elements = KeplerianElements {
            true_anomaly: true_from_mean(mean_anomaly, self.elements.eccentricity)?,
            ..self.elements.clone()
        };
        Ok(elements.to_cartesian(self.mu))
    }
}

#[cfg(test)]
mod two_body_test {
    use super::*;
    use crate::{
        fit_parameters::FitParameters,
        tle::{CatalogMetadata, TleRecord},
    };
    use approx::assert_relative_eq;
    use hifitime::Unit;

    fn record(epoch: Epoch) -> TleRecord {
        TleRecord::new(
            epoch,
            FitParameters::new([7_000.0, 0.05, 0.9, 1.2, 0.7, 2.0, 1e-4]),
            CatalogMetadata::default(),
            EARTH_MU,
        )
    }

    #[test]
    fn test_state_at_reference_epoch() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 5, 1);
        let rec = record(epoch);
        let state = TwoBodyEvaluator::default()
            .evaluate(&rec, epoch, Frame::Icrf)
            .unwrap();

        let back = KeplerianElements::from_cartesian(&state, EARTH_MU).unwrap();
        assert_relative_eq!(back.semi_major_axis, 7_000.0, max_relative = 1e-10);
        assert_relative_eq!(back.eccentricity, 0.05, max_relative = 1e-9);
        assert_relative_eq!(back.mean_anomaly(), 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_period() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 5, 1);
        let rec = record(epoch);
        let point = TwoBodyEvaluator::default().attach(&rec).unwrap();

        let period = 2.0 * std::f64::consts::PI * (7_000.0_f64.powi(3) / EARTH_MU).sqrt();
        let s0 = point.state(epoch, Frame::Teme).unwrap();
        let s1 = point.state(epoch + Unit::Second * period, Frame::Teme).unwrap();
        for k in 0..3 {
            assert_relative_eq!(s0[k], s1[k], epsilon = 1e-5);
            assert_relative_eq!(s0[k + 3], s1[k + 3], epsilon = 1e-8);
        }
    }

    #[test]
    fn test_rejects_open_orbits() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 5, 1);
        let rec = TleRecord::new(
            epoch,
            FitParameters::new([7_000.0, 1.2, 0.9, 1.2, 0.7, 2.0, 0.0]),
            CatalogMetadata::default(),
            EARTH_MU,
        );
        assert!(matches!(
            TwoBodyEvaluator::default().attach(&rec),
            Err(TleFitError::Propagator(_))
        ));
    }
}
