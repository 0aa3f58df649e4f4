//! SGP4 evaluator.
//!
//! Each candidate record is written to its two text lines and read back by
//! the `sgp4` crate, exactly as a downstream catalog consumer would read the
//! published TLE. Positions and velocities come out in TEME (km, km/s).

use hifitime::Epoch;

use super::{EphemerisPoint, StateEvaluator};
use crate::{
    constants::State6, observations::Frame, tle::TleRecord, tle_fit_errors::TleFitError,
};

/// SGP4/SDP4 propagation of the encoded TLE.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Sgp4Evaluator;

/// Parsed elements of one candidate, with the epoch they refer to.
pub struct Sgp4Point {
    reference_epoch: Epoch,
    elements: sgp4::Elements,
}

impl Sgp4Point {
    fn constants(&self) -> Result<sgp4::Constants, TleFitError> {
        sgp4::Constants::from_elements(&self.elements)
            .map_err(|e| TleFitError::Propagator(format!("{e:?}")))
    }
}

impl StateEvaluator for Sgp4Evaluator {
    type Point = Sgp4Point;

    fn attach(&self, record: &TleRecord) -> Result<Sgp4Point, TleFitError> {
        let (line1, line2) = record.lines()?;
        let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(|e| TleFitError::Propagator(format!("{e:?}")))?;

        let point = Sgp4Point {
            reference_epoch: record.tle_epoch(),
            elements,
        };
        // surface initialization failures (decayed or hyperbolic orbits) here
        point.constants()?;
        Ok(point)
    }
}

impl EphemerisPoint for Sgp4Point {
    fn state(&self, epoch: Epoch, frame: Frame) -> Result<State6, TleFitError> {
        if frame != Frame::Teme {
            return Err(TleFitError::UnsupportedFrame(frame));
        }

        let minutes = (epoch - self.reference_epoch).to_seconds() / 60.0;
        let prediction = self
            .constants()?
            .propagate(minutes)
            .map_err(|e| TleFitError::Propagator(format!("{e:?}")))?;

        Ok(State6::new(
            prediction.position[0],
            prediction.position[1],
            prediction.position[2],
            prediction.velocity[0],
            prediction.velocity[1],
            prediction.velocity[2],
        ))
    }
}
