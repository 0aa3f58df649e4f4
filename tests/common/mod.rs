#![allow(dead_code)]

use std::f64::consts::PI;

use approx::assert_relative_eq;
use hifitime::{Duration, Epoch, Unit};
use tlefit::{
    constants::{State6, EARTH_MU},
    evaluator::{two_body::TwoBodyEvaluator, StateEvaluator},
    observations::{EphemerisSource, Frame, Observation, ObservationSet},
    tle::{CatalogMetadata, TleRecord},
    FitParameters, TleFitError,
};

/// Reference epoch shared by the synthetic scenarios (midnight, so the
/// day-of-year field is exact).
pub fn reference_epoch() -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(2024, 5, 1)
}

/// A moderately eccentric LEO orbit.
pub fn truth_parameters() -> FitParameters {
    FitParameters::new([7_000.0, 0.05, 0.9, 1.2, 0.7, 2.0, 1e-4])
}

pub fn record(epoch: Epoch, parameters: FitParameters) -> TleRecord {
    TleRecord::new(epoch, parameters, CatalogMetadata::default(), EARTH_MU)
}

/// `count` states of `record` every `step`, starting at its TLE epoch.
pub fn observe<E: StateEvaluator>(
    evaluator: &E,
    record: &TleRecord,
    frame: Frame,
    count: i64,
    step: Duration,
) -> ObservationSet {
    let start = record.tle_epoch();
    let samples = (0..count)
        .map(|k| {
            let epoch = start + step * k;
            Observation {
                epoch,
                state: evaluator.evaluate(record, epoch, frame).unwrap(),
            }
        })
        .collect();
    ObservationSet::new(frame, samples).unwrap()
}

/// One revolution of the truth orbit, sampled every two minutes.
pub fn two_body_observations() -> ObservationSet {
    observe(
        &TwoBodyEvaluator::default(),
        &record(reference_epoch(), truth_parameters()),
        Frame::Icrf,
        46,
        Unit::Minute * 2,
    )
}

/// Keplerian trajectory exposed as an ephemeris source.
pub struct TwoBodySource {
    pub record: TleRecord,
    pub span: Duration,
}

impl EphemerisSource for TwoBodySource {
    fn frame(&self) -> Frame {
        Frame::Icrf
    }

    fn time_range(&self) -> (Epoch, Epoch) {
        let start = self.record.tle_epoch();
        (start, start + self.span)
    }

    fn state_at(&self, epoch: Epoch) -> Result<State6, TleFitError> {
        TwoBodyEvaluator::default().evaluate(&self.record, epoch, Frame::Icrf)
    }
}

#[inline]
pub fn angle_abs_diff(a: f64, b: f64) -> f64 {
    let tau = 2.0 * PI;
    let mut d = (a - b) % tau;
    if d > PI {
        d -= tau;
    }
    if d < -PI {
        d += tau;
    }
    d.abs()
}

/// Compare the six orbital parameters (B* excluded).
pub fn assert_elements_close(got: &FitParameters, exp: &FitParameters, epsilon: f64) {
    assert_relative_eq!(
        got.semi_major_axis(),
        exp.semi_major_axis(),
        max_relative = epsilon
    );
    assert_relative_eq!(got.eccentricity(), exp.eccentricity(), epsilon = epsilon);

    for (name, g, e) in [
        ("inclination", got.inclination(), exp.inclination()),
        ("raan", got.raan(), exp.raan()),
        ("arg_perigee", got.arg_perigee(), exp.arg_perigee()),
        ("mean_anomaly", got.mean_anomaly(), exp.mean_anomaly()),
    ] {
        let diff = angle_abs_diff(g, e);
        assert!(
            diff <= epsilon,
            "{name}: got {g}, expected {e} (|Δ| = {diff:e} > {epsilon:e})"
        );
    }
}
