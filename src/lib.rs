//! # tlefit
//!
//! Differential correction of two-line element sets (TLEs) against an
//! ephemeris of Cartesian states, and bit-exact encoding of the result in the
//! legacy two-line text format.
//!
//! ```rust,no_run
//! use hifitime::Unit;
//! use tlefit::{
//!     differential_correction::{fit_tle_from_ephemeris, FitOptions},
//!     evaluator::sgp4_evaluator::Sgp4Evaluator,
//!     observations::EphemerisSource,
//!     tle::CatalogMetadata,
//! };
//!
//! # fn source() -> Box<dyn EphemerisSource> { unimplemented!() }
//! let fitted = fit_tle_from_ephemeris(
//!     &Sgp4Evaluator,
//!     source().as_ref(),
//!     Unit::Minute * 2,
//!     &CatalogMetadata::default(),
//!     &FitOptions::default(),
//! )?;
//! let (line1, line2) = fitted.lines()?;
//! println!("{line1}\n{line2}");
//! # Ok::<(), tlefit::tle_fit_errors::TleFitError>(())
//! ```

pub mod constants;
pub mod differential_correction;
pub mod evaluator;
pub mod fit_parameters;
pub mod kepler;
pub mod observations;
pub mod orbit_type;
pub mod residuals;
pub mod tle;
pub mod tle_fit_errors;
pub mod weights;

pub use differential_correction::{
    fit_tle_from_ephemeris, fit_tle_from_observations, FitOptions, FittedTle,
};
pub use fit_parameters::FitParameters;
pub use observations::{EphemerisSource, Frame, Observation, ObservationSet};
pub use tle::{CatalogMetadata, TleRecord};
pub use tle_fit_errors::TleFitError;
