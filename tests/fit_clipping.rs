mod common;

use approx::assert_relative_eq;
use hifitime::{Epoch, Unit};
use tlefit::{
    constants::State6,
    evaluator::{
        two_body::{TwoBodyEvaluator, TwoBodyPoint},
        EphemerisPoint, StateEvaluator,
    },
    fit_tle_from_observations,
    observations::{Frame, ObservationSet},
    tle::{CatalogMetadata, TleRecord},
    FitOptions, FitParameters, TleFitError,
};

use common::{observe, record, reference_epoch, truth_parameters};

/// Fixed trajectory shifted along x by 100 km per unit of raw eccentricity.
///
/// Only the eccentricity column of the Jacobian is non-zero, and the model
/// is linear in it, so every step lands close to the observed value even
/// when that value is negative.
struct LinearInEccentricity {
    base: TwoBodyPoint,
    fail_at_zero: bool,
}

struct ShiftedPoint {
    base: TwoBodyPoint,
    shift: f64,
}

impl EphemerisPoint for ShiftedPoint {
    fn state(&self, epoch: Epoch, frame: Frame) -> Result<State6, TleFitError> {
        let mut state = self.base.state(epoch, frame)?;
        state[0] += 100.0 * self.shift;
        Ok(state)
    }
}

impl StateEvaluator for LinearInEccentricity {
    type Point = ShiftedPoint;

    fn attach(&self, record: &TleRecord) -> Result<ShiftedPoint, TleFitError> {
        let shift = record.parameters().eccentricity();
        if self.fail_at_zero && shift == 0.0 {
            return Err(TleFitError::Propagator("circular candidate".into()));
        }
        Ok(ShiftedPoint {
            base: self.base.clone(),
            shift,
        })
    }
}

fn evaluator(fail_at_zero: bool) -> LinearInEccentricity {
    let base = TwoBodyEvaluator::default()
        .attach(&record(reference_epoch(), truth_parameters()))
        .unwrap();
    LinearInEccentricity { base, fail_at_zero }
}

/// States of the model at a raw eccentricity of -0.5.
fn observations() -> ObservationSet {
    let target = truth_parameters().with(1, -0.5);
    observe(
        &evaluator(false),
        &record(reference_epoch(), target),
        Frame::Icrf,
        30,
        Unit::Minute * 2,
    )
}

fn initial_guess() -> FitParameters {
    truth_parameters().with(1, 0.1).with(6, 0.0)
}

#[test]
fn test_clipping_keeps_eccentricity_in_range() {
    let options = FitOptions::builder().max_outer_iter(3).build().unwrap();

    let fitted = fit_tle_from_observations(
        &evaluator(false),
        &observations(),
        initial_guess(),
        reference_epoch(),
        &CatalogMetadata::default(),
        &options,
    )
    .unwrap();

    assert_eq!(fitted.outer_iterations, 3);
    assert_eq!(fitted.record.parameters().eccentricity(), 0.0);
    assert_eq!(fitted.record.eccentricity(), 0.0);
}

#[test]
fn test_without_clipping_the_raw_eccentricity_is_kept() {
    let options = FitOptions::builder()
        .max_outer_iter(3)
        .clip_elements(false)
        .build()
        .unwrap();

    let fitted = fit_tle_from_observations(
        &evaluator(false),
        &observations(),
        initial_guess(),
        reference_epoch(),
        &CatalogMetadata::default(),
        &options,
    )
    .unwrap();

    assert_relative_eq!(fitted.record.parameters().eccentricity(), -0.5, epsilon = 1e-8);
    // the record itself still writes a valid field
    assert_eq!(fitted.record.eccentricity(), 0.0);
}

#[test]
fn test_diagnostics_report_clipped_eccentricity() {
    let options = FitOptions::builder().max_outer_iter(3).build().unwrap();

    // the first accepted step is clipped to e = 0, which the model refuses
    let err = fit_tle_from_observations(
        &evaluator(true),
        &observations(),
        initial_guess(),
        reference_epoch(),
        &CatalogMetadata::default(),
        &options,
    )
    .unwrap_err();

    let diagnostics = err.diagnostics().unwrap();
    assert_eq!(diagnostics.outer_iteration, 1);
    assert_eq!(diagnostics.last_parameters.eccentricity(), 0.0);
    assert!(matches!(err, TleFitError::PropagatorEvaluation { .. }));
}
