//! # Observed ephemeris
//!
//! An [`ObservationSet`] is the time series of Cartesian states a TLE is
//! fitted against. It is immutable once built and validated:
//!
//! * at least one sample,
//! * epochs strictly increasing,
//! * every state component finite,
//! * all states expressed in a single inertial [`Frame`].
//!
//! Sets are usually sampled on a regular grid from an [`EphemerisSource`]
//! (the orbit-management layer that owns the reference trajectory) with
//! [`ObservationSet::sample`].

use hifitime::{Duration, Epoch, TimeSeries};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{constants::State6, tle_fit_errors::TleFitError};

/// Inertial frame a state is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// True Equator Mean Equinox, the native frame of SGP4.
    Teme,
    /// International Celestial Reference Frame.
    Icrf,
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Frame::Teme => write!(f, "TEME"),
            Frame::Icrf => write!(f, "ICRF"),
        }
    }
}

/// One observed sample: an epoch and the Cartesian state at that epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub epoch: Epoch,
    pub state: State6,
}

/// Provider of a reference trajectory over a closed time range.
///
/// This is the seam to the storage/orbit-management layer: the fitting code
/// only needs the covered range and the state at arbitrary epochs within it.
pub trait EphemerisSource {
    /// Frame of the states returned by [`EphemerisSource::state_at`].
    fn frame(&self) -> Frame;

    /// First and last epoch covered by the source.
    fn time_range(&self) -> (Epoch, Epoch);

    /// State at `epoch` (km, km/s).
    fn state_at(&self, epoch: Epoch) -> Result<State6, TleFitError>;
}

/// Time-ordered, validated set of observed states.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationSet {
    frame: Frame,
    samples: Vec<Observation>,
}

impl ObservationSet {
    /// Build an observation set, validating ordering and finiteness.
    ///
    /// Errors
    /// ------
    /// * `TleFitError::InvalidObservations` when the set is empty, an epoch
    ///   does not strictly follow its predecessor, or a state component is
    ///   not finite.
    pub fn new(frame: Frame, samples: Vec<Observation>) -> Result<Self, TleFitError> {
        if samples.is_empty() {
            return Err(TleFitError::InvalidObservations(
                "at least one observation is required".into(),
            ));
        }

        if let Some((idx, _)) = samples
            .iter()
            .tuple_windows()
            .find_position(|(prev, next)| next.epoch <= prev.epoch)
        {
            return Err(TleFitError::InvalidObservations(format!(
                "epochs must be strictly increasing (sample {} at {} does not follow {})",
                idx + 1,
                samples[idx + 1].epoch,
                samples[idx].epoch
            )));
        }

        if let Some(idx) = samples
            .iter()
            .position(|obs| obs.state.iter().any(|c| !c.is_finite()))
        {
            return Err(TleFitError::InvalidObservations(format!(
                "state of sample {idx} has non-finite components"
            )));
        }

        Ok(Self { frame, samples })
    }

    /// Sample an ephemeris source on an inclusive grid of `step` over its time range.
    pub fn sample<S: EphemerisSource + ?Sized>(
        source: &S,
        step: Duration,
    ) -> Result<Self, TleFitError> {
        if step <= Duration::ZERO {
            return Err(TleFitError::InvalidObservations(format!(
                "sampling step must be positive, got {step}"
            )));
        }

        let (start, end) = source.time_range();
        let samples = TimeSeries::inclusive(start, end, step)
            .map(|epoch| {
                Ok(Observation {
                    epoch,
                    state: source.state_at(epoch)?,
                })
            })
            .collect::<Result<Vec<_>, TleFitError>>()?;

        Self::new(source.frame(), samples)
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.samples.iter()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.samples
    }

    /// First observation (the set is never empty).
    pub fn first(&self) -> &Observation {
        &self.samples[0]
    }

    /// Time covered between the first and last sample.
    pub fn span(&self) -> Duration {
        self.samples[self.samples.len() - 1].epoch - self.samples[0].epoch
    }
}

impl<'a> IntoIterator for &'a ObservationSet {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}
