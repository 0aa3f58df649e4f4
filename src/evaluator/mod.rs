//! # State evaluation
//!
//! The fit never propagates an orbit itself: it asks a [`StateEvaluator`] for
//! the Cartesian state that a candidate TLE predicts at a given epoch.
//!
//! ## Contract
//!
//! - Evaluation is deterministic: the same record, epoch and frame always
//!   give the same state.
//! - [`StateEvaluator::attach`] builds a fresh, owned [`EphemerisPoint`] for
//!   one candidate record. The point is dropped once the candidate has been
//!   evaluated; there is no registry shared between candidates or fits, so
//!   any number of fits may run concurrently on the same evaluator.
//! - A failure is reported as an error and is fatal for the fit; the driver
//!   does not retry.
//!
//! ## Implementations
//!
//! - [`TwoBodyEvaluator`](two_body::TwoBodyEvaluator) – analytic Keplerian
//!   motion, B* ignored, any inertial frame.
//! - [`Sgp4Evaluator`](sgp4_evaluator::Sgp4Evaluator) – the SGP4 model
//!   through the `sgp4` crate, TEME only.

pub mod sgp4_evaluator;
pub mod two_body;

use hifitime::Epoch;

use crate::{constants::State6, observations::Frame, tle::TleRecord, tle_fit_errors::TleFitError};

/// Ephemeris of a single candidate TLE.
pub trait EphemerisPoint: Send + Sync {
    /// State (km, km/s) at `epoch`, expressed in `frame`.
    fn state(&self, epoch: Epoch, frame: Frame) -> Result<State6, TleFitError>;
}

/// Factory of ephemeris points from TLE records.
pub trait StateEvaluator: Sync {
    type Point: EphemerisPoint;

    /// Create the ephemeris point of `record`.
    fn attach(&self, record: &TleRecord) -> Result<Self::Point, TleFitError>;

    /// One-shot evaluation of `record` at `epoch`.
    fn evaluate(&self, record: &TleRecord, epoch: Epoch, frame: Frame) -> Result<State6, TleFitError> {
        self.attach(record)?.state(epoch, frame)
    }
}
