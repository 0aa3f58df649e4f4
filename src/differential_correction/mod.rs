//! # Differential correction of TLEs
//!
//! Fits the seven TLE parameters `[a, e, i, Ω, ω, M, B*]` to an observed
//! ephemeris with a damped Gauss–Newton (Levenberg–Marquardt) iteration.
//!
//! ## Overview
//!
//! ```text
//! observations ─┐
//! initial guess ├─► outer loop (max_outer_iter) ─► residuals + Jacobian
//! catalog       ┘        │                              │
//!                        │                        normal equations
//!                        │                              │
//!                        └── inner loop (max_inner_iter): damped solve,
//!                              trial cost, accept (λ/10) or reject (λ·10)
//! ```
//!
//! - The outer loop runs a fixed budget of `max_outer_iter` accepted steps.
//!   [`FitOptions::cost_tolerance`] optionally stops it earlier, once an
//!   accepted step improves the cost by less than the given relative amount.
//! - Within one outer iteration, the residuals and the Jacobian are computed
//!   once; the inner retries only re-solve the damped system and evaluate the
//!   trial candidate.
//! - A step is rejected when its cost is larger than the current one or NaN.
//!   After `max_inner_iter` rejections the fit fails with
//!   [`TleFitError::MaxIterationsExceeded`].
//! - Evaluator failures abort the fit with
//!   [`TleFitError::PropagatorEvaluation`].
//! - [`FitOptions::deadline`] bounds the wall-clock time of the whole fit
//!   ([`TleFitError::Timeout`]).
//!
//! All fatal errors carry a [`FitDiagnostics`](crate::tle_fit_errors::FitDiagnostics)
//! with the last accepted parameters and the loop counters.
//!
//! ## Entry points
//!
//! - [`fit_tle_from_observations`](driver::fit_tle_from_observations) –
//!   observed states plus an initial guess.
//! - [`fit_tle_from_ephemeris`](driver::fit_tle_from_ephemeris) – samples an
//!   [`EphemerisSource`](crate::observations::EphemerisSource) and derives the
//!   initial guess from its first state.
//!
//! ## Configuration
//!
//! [`FitOptions`] gathers every tunable of the fit. It can be built with
//! [`FitOptions::builder`], which validates the values, or deserialized with
//! `serde` (then checked with [`FitOptions::validate`]).

pub mod damping;
pub mod driver;
pub mod normal_equations;

use serde::{Deserialize, Serialize};
use std::cmp::Ordering::{Equal, Greater, Less};
use std::fmt;
use std::time::Duration;

use crate::{
    constants::{EARTH_MU, EARTH_RADIUS},
    residuals::FiniteDifference,
    tle_fit_errors::TleFitError,
    weights::WeightModel,
};

pub use driver::{fit_tle_from_ephemeris, fit_tle_from_observations, FittedTle};

/// Gravitational parameter (km³/s²) and reference radius (km) of the central body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CentralBody {
    pub mu: f64,
    pub radius: f64,
}

impl CentralBody {
    pub const EARTH: CentralBody = CentralBody {
        mu: EARTH_MU,
        radius: EARTH_RADIUS,
    };
}

impl Default for CentralBody {
    fn default() -> Self {
        Self::EARTH
    }
}

/// Tunables of the differential correction.
///
/// | field | default |
/// |---|---|
/// | `max_outer_iter` | 5 |
/// | `max_inner_iter` | 20 |
/// | `initial_damping` | 1e-3 |
/// | `clip_elements` | `true` |
/// | `weights` | σ = 1 km, 1e-3 km/s |
/// | `finite_difference` | 1e-3 relative, 1e-8 absolute below 1e-6 |
/// | `pinv_rcond` | 1e-12 |
/// | `cost_tolerance` | `None` |
/// | `deadline` | `None` |
/// | `central_body` | Earth |
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FitOptions {
    /// Number of outer iterations (accepted steps).
    pub max_outer_iter: usize,
    /// Number of rejected steps tolerated within one outer iteration.
    pub max_inner_iter: usize,
    /// Initial damping factor, also the floor of λ.
    pub initial_damping: f64,
    /// Clip `e` to `[0, 1]` and B* to `[-1, 1]` after each accepted step.
    pub clip_elements: bool,
    pub weights: WeightModel,
    pub finite_difference: FiniteDifference,
    /// Relative eigenvalue cutoff of the pseudo-inverse.
    pub pinv_rcond: f64,
    /// Stop once an accepted step improves the cost by less than this
    /// fraction of the current cost.
    pub cost_tolerance: Option<f64>,
    /// Wall-clock budget of the fit.
    #[serde(skip)]
    pub deadline: Option<Duration>,
    pub central_body: CentralBody,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_outer_iter: 5,
            max_inner_iter: 20,
            initial_damping: 1e-3,
            clip_elements: true,
            weights: WeightModel::default(),
            finite_difference: FiniteDifference::default(),
            pinv_rcond: 1e-12,
            cost_tolerance: None,
            deadline: None,
            central_body: CentralBody::EARTH,
        }
    }
}

/// Return true iff x > 0.0 and comparable (i.e., not NaN).
#[inline]
fn gt0(x: f64) -> bool {
    x.partial_cmp(&0.0) == Some(Greater)
}

/// Return true iff x >= 0.0 and comparable (i.e., not NaN).
#[inline]
fn ge0(x: f64) -> bool {
    matches!(x.partial_cmp(&0.0), Some(Greater) | Some(Equal))
}

/// Return true iff a < b and comparable (i.e., not NaN).
#[inline]
fn lt(a: f64, b: f64) -> bool {
    a.partial_cmp(&b) == Some(Less)
}

impl FitOptions {
    pub fn builder() -> FitOptionsBuilder {
        FitOptionsBuilder::new()
    }

    /// Check every field.
    ///
    /// Validation rules
    /// -----------------
    /// * `max_outer_iter ≥ 1`, `max_inner_iter ≥ 1`.
    /// * `initial_damping > 0` and finite.
    /// * both σ of `weights` finite and `> 0`.
    /// * `relative_step > 0`, `absolute_step > 0`, `small_parameter_threshold ≥ 0`.
    /// * `0 ≤ pinv_rcond < 1`.
    /// * `cost_tolerance ≥ 0` when set.
    /// * `central_body.mu > 0`, `central_body.radius > 0`.
    pub fn validate(&self) -> Result<(), TleFitError> {
        let invalid = |msg: &str| Err(TleFitError::InvalidFitParameter(msg.into()));

        if self.max_outer_iter == 0 {
            return invalid("max_outer_iter must be >= 1");
        }
        if self.max_inner_iter == 0 {
            return invalid("max_inner_iter must be >= 1");
        }
        if !(gt0(self.initial_damping) && self.initial_damping.is_finite()) {
            return invalid("initial_damping must be finite and > 0");
        }
        self.weights.validate()?;

        let fd = &self.finite_difference;
        if !gt0(fd.relative_step) || !gt0(fd.absolute_step) {
            return invalid("finite difference steps must be > 0");
        }
        if !ge0(fd.small_parameter_threshold) {
            return invalid("small_parameter_threshold must be >= 0");
        }
        if !(ge0(self.pinv_rcond) && lt(self.pinv_rcond, 1.0)) {
            return invalid("require 0 <= pinv_rcond < 1");
        }
        if let Some(tol) = self.cost_tolerance {
            if !ge0(tol) {
                return invalid("cost_tolerance must be >= 0");
            }
        }
        if !gt0(self.central_body.mu) || !gt0(self.central_body.radius) {
            return invalid("central body mu and radius must be > 0");
        }
        Ok(())
    }
}

impl fmt::Display for FitOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "TLE fit options")?;
        writeln!(f, "  max_outer_iter    = {}", self.max_outer_iter)?;
        writeln!(f, "  max_inner_iter    = {}", self.max_inner_iter)?;
        writeln!(f, "  initial_damping   = {:e}", self.initial_damping)?;
        writeln!(f, "  clip_elements     = {}", self.clip_elements)?;
        writeln!(
            f,
            "  sigma pos / vel   = {} km / {} km/s",
            self.weights.sigma_position, self.weights.sigma_velocity
        )?;
        writeln!(f, "  pinv_rcond        = {:e}", self.pinv_rcond)?;
        match self.cost_tolerance {
            Some(tol) => writeln!(f, "  cost_tolerance    = {tol:e}")?,
            None => writeln!(f, "  cost_tolerance    = none (fixed budget)")?,
        }
        match self.deadline {
            Some(deadline) => writeln!(f, "  deadline          = {deadline:?}")?,
            None => writeln!(f, "  deadline          = none")?,
        }
        write!(
            f,
            "  central body      = mu {} km^3/s^2, R {} km",
            self.central_body.mu, self.central_body.radius
        )
    }
}

/// Builder for [`FitOptions`], with validation.
#[derive(Debug, Clone, Default)]
pub struct FitOptionsBuilder {
    options: FitOptions,
}

impl FitOptionsBuilder {
    pub fn new() -> Self {
        Self {
            options: FitOptions::default(),
        }
    }

    pub fn max_outer_iter(mut self, v: usize) -> Self {
        self.options.max_outer_iter = v;
        self
    }
    pub fn max_inner_iter(mut self, v: usize) -> Self {
        self.options.max_inner_iter = v;
        self
    }
    pub fn initial_damping(mut self, v: f64) -> Self {
        self.options.initial_damping = v;
        self
    }
    pub fn clip_elements(mut self, v: bool) -> Self {
        self.options.clip_elements = v;
        self
    }
    pub fn weights(mut self, v: WeightModel) -> Self {
        self.options.weights = v;
        self
    }
    pub fn finite_difference(mut self, v: FiniteDifference) -> Self {
        self.options.finite_difference = v;
        self
    }
    pub fn pinv_rcond(mut self, v: f64) -> Self {
        self.options.pinv_rcond = v;
        self
    }
    pub fn cost_tolerance(mut self, v: f64) -> Self {
        self.options.cost_tolerance = Some(v);
        self
    }
    pub fn deadline(mut self, v: Duration) -> Self {
        self.options.deadline = Some(v);
        self
    }
    pub fn central_body(mut self, v: CentralBody) -> Self {
        self.options.central_body = v;
        self
    }

    /// Finalize the builder, see [`FitOptions::validate`] for the rules.
    pub fn build(self) -> Result<FitOptions, TleFitError> {
        self.options.validate()?;
        Ok(self.options)
    }
}
