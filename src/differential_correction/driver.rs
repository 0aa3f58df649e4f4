//! # Levenberg–Marquardt driver
//!
//! The only state carried from one iteration to the next is the pair
//! (parameters, damping), held in a small [`LmState`] value that each step
//! consumes and returns. Everything else (observations, weights, catalog
//! metadata) is shared read-only input.
//!
//! States of a fit:
//!
//! ```text
//! Initializing → Iterating(outer) ⇄ Iterating(inner retry) → Accepted → …
//!             → Converged (budget reached or cost tolerance met)
//!             | Failed(MaxIterationsExceeded) | Failed(PropagatorEvaluation) | Failed(Timeout)
//! ```

use hifitime::{Duration, Epoch};
use std::time::Instant;
use tracing::{debug, info, warn};

use super::{damping::Damping, normal_equations::NormalEquations, FitOptions};
use crate::{
    evaluator::StateEvaluator,
    fit_parameters::{FitParameters, IDX_SEMI_MAJOR_AXIS},
    observations::{EphemerisSource, ObservationSet},
    orbit_type::equinoctial_element::EquinoctialElements,
    residuals::{compute_residuals, compute_residuals_and_jacobian},
    tle::{CatalogMetadata, RecordTemplate, TleRecord},
    tle_fit_errors::{FitDiagnostics, TleFitError},
    weights::ScaledWeights,
};

/// B* given to the initial guess derived from an osculating state.
pub const INITIAL_BSTAR: f64 = 1e-3;

/// Outcome of a successful fit.
#[derive(Debug, Clone, PartialEq)]
pub struct FittedTle {
    /// Final record, built from the last accepted parameters.
    pub record: TleRecord,
    /// Cost of the initial guess.
    pub initial_cost: f64,
    /// Cost after each accepted step.
    pub costs: Vec<f64>,
    /// Damping factor at the end of the fit.
    pub final_damping: f64,
    /// Number of outer iterations performed.
    pub outer_iterations: usize,
}

impl FittedTle {
    /// The two text lines of the fitted TLE.
    pub fn lines(&self) -> Result<(String, String), TleFitError> {
        self.record.lines()
    }

    /// Reference epoch as encoded in line 1.
    pub fn tle_epoch(&self) -> Epoch {
        self.record.tle_epoch()
    }

    /// Cost of the returned record.
    pub fn final_cost(&self) -> f64 {
        self.costs.last().copied().unwrap_or(self.initial_cost)
    }
}

/// Mutable state of the iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
struct LmState {
    parameters: FitParameters,
    damping: Damping,
    /// Cost at `parameters`, NaN until first evaluated.
    cost: f64,
}

impl LmState {
    fn diagnostics(&self, outer_iteration: usize, inner_iteration: usize) -> FitDiagnostics {
        FitDiagnostics {
            last_parameters: self.parameters,
            outer_iteration,
            inner_iteration,
            damping: self.damping.value(),
            cost: self.cost,
        }
    }
}

/// Shared, read-only inputs of one fit.
struct FitContext<'a, E: StateEvaluator> {
    evaluator: &'a E,
    template: RecordTemplate<'a>,
    observations: &'a ObservationSet,
    scaled: ScaledWeights,
    options: &'a FitOptions,
    started: Instant,
}

impl<E: StateEvaluator> FitContext<'_, E> {
    fn check_deadline(
        &self,
        state: &LmState,
        outer: usize,
        inner: usize,
    ) -> Result<(), TleFitError> {
        match self.options.deadline {
            Some(deadline) if self.started.elapsed() >= deadline => {
                warn!(
                    outer_iteration = outer,
                    elapsed = ?self.started.elapsed(),
                    "TLE fit deadline reached"
                );
                Err(TleFitError::Timeout {
                    diagnostics: Box::new(state.diagnostics(outer, inner)),
                })
            }
            _ => Ok(()),
        }
    }

    /// One outer iteration: linearize at `state`, then search the damping
    /// factor until a step does not increase the cost.
    ///
    /// Returns the cost at `state` and the state after the accepted step.
    fn iterate(&self, state: LmState, outer: usize) -> Result<(f64, LmState), TleFitError> {
        let options = self.options;

        let set = compute_residuals_and_jacobian(
            self.evaluator,
            &self.template,
            state.parameters,
            self.observations,
            &self.scaled,
            &options.finite_difference,
        )
        .map_err(|e| e.during_fit(state.diagnostics(outer, 0)))?;

        let state = LmState {
            cost: set.cost(&options.weights),
            ..state
        };
        let normal = NormalEquations::assemble(&set, &self.scaled);

        let mut damping = state.damping;
        for inner in 0..options.max_inner_iter {
            self.check_deadline(&state, outer, inner)?;

            let mut dx = normal.solve(damping.value(), options.pinv_rcond);
            dx[IDX_SEMI_MAJOR_AXIS] *= self.scaled.reference_length();
            debug!(outer_iteration = outer, inner_iteration = inner, ?dx, "candidate step");

            let trial = (state.parameters + dx).with_clamped_bstar();
            let residuals =
                compute_residuals(self.evaluator, &self.template, trial, self.observations)
                    .map_err(|e| e.during_fit(state.diagnostics(outer, inner)))?;
            let trial_cost = options.weights.cost(&residuals);

            if trial_cost > state.cost || trial_cost.is_nan() {
                damping = damping.reject();
                debug!(
                    outer_iteration = outer,
                    inner_iteration = inner,
                    cost = state.cost,
                    trial_cost,
                    damping = damping.value(),
                    "step rejected"
                );
                continue;
            }

            let parameters = state.parameters + dx;
            let parameters = if options.clip_elements {
                parameters.clipped()
            } else {
                parameters
            };
            return Ok((
                state.cost,
                LmState {
                    parameters,
                    damping: damping.accept(),
                    cost: trial_cost,
                },
            ));
        }

        warn!(
            outer_iteration = outer,
            max_inner_iter = options.max_inner_iter,
            "inner loop exceeded maximum iterations"
        );
        Err(TleFitError::MaxIterationsExceeded {
            max_inner_iter: options.max_inner_iter,
            diagnostics: Box::new(
                LmState { damping, ..state }.diagnostics(outer, options.max_inner_iter - 1),
            ),
        })
    }
}

/// Fit a TLE to observed Cartesian states.
///
/// Arguments
/// ---------
/// * `evaluator` – state evaluator of the candidate TLEs.
/// * `observations` – observed states, in a frame the evaluator supports.
/// * `initial` – initial guess `[a, e, i, Ω, ω, M, B*]`.
/// * `epoch` – reference epoch of the TLE.
/// * `catalog` – identification written into the lines.
/// * `options` – loop budgets, damping, weights, see [`FitOptions`].
///
/// Return
/// ------
/// * The [`FittedTle`] after `max_outer_iter` accepted steps (or fewer when
///   `cost_tolerance` is set and met).
/// * `TleFitError::InvalidFitParameter` for invalid options or a non-positive
///   initial semi-major axis.
/// * `TleFitError::PropagatorEvaluation` if the evaluator fails.
/// * `TleFitError::MaxIterationsExceeded` if no acceptable step is found
///   within `max_inner_iter` damping increases.
/// * `TleFitError::Timeout` once `deadline` is exceeded.
pub fn fit_tle_from_observations<E: StateEvaluator>(
    evaluator: &E,
    observations: &ObservationSet,
    initial: FitParameters,
    epoch: Epoch,
    catalog: &CatalogMetadata,
    options: &FitOptions,
) -> Result<FittedTle, TleFitError> {
    options.validate()?;

    let body = options.central_body;
    let initial_sma = initial.semi_major_axis();
    if !(initial_sma > 0.0 && initial_sma.is_finite()) {
        return Err(TleFitError::InvalidFitParameter(format!(
            "initial semi-major axis must be finite and > 0, got {initial_sma}"
        )));
    }

    let context = FitContext {
        evaluator,
        template: RecordTemplate {
            epoch,
            catalog,
            mu: body.mu,
        },
        observations,
        // reference speed is the circular speed at the initial semi-major axis
        scaled: options
            .weights
            .scaled(body.radius, (body.mu / initial_sma).sqrt()),
        options,
        started: Instant::now(),
    };

    info!(
        norad_id = catalog.norad_id,
        observations = observations.len(),
        %epoch,
        "starting TLE fit"
    );

    let mut state = LmState {
        parameters: initial,
        damping: Damping::new(options.initial_damping),
        cost: f64::NAN,
    };
    let mut initial_cost = f64::NAN;
    let mut costs = Vec::with_capacity(options.max_outer_iter);

    for outer in 0..options.max_outer_iter {
        context.check_deadline(&state, outer, 0)?;

        let (previous_cost, next) = context.iterate(state, outer)?;
        if outer == 0 {
            initial_cost = previous_cost;
        }
        state = next;
        costs.push(state.cost);

        info!(
            iteration = outer + 1,
            cost = state.cost,
            damping = state.damping.value(),
            parameters = %state.parameters,
            "TLE fitting iteration"
        );

        if let Some(tol) = options.cost_tolerance {
            if previous_cost - state.cost <= tol * previous_cost {
                info!(iteration = outer + 1, "cost improvement below tolerance, stopping");
                break;
            }
        }
    }

    Ok(FittedTle {
        record: context.template.record(state.parameters.with_clamped_bstar()),
        initial_cost,
        outer_iterations: costs.len(),
        costs,
        final_damping: state.damping.value(),
    })
}

/// Fit a TLE to an ephemeris source.
///
/// The source is sampled every `step` over its whole time range (both ends
/// included). The TLE epoch is the start of the range, and the initial guess
/// comes from the osculating equinoctial elements of the first sample, with
/// B* set to [`INITIAL_BSTAR`].
pub fn fit_tle_from_ephemeris<E, S>(
    evaluator: &E,
    source: &S,
    step: Duration,
    catalog: &CatalogMetadata,
    options: &FitOptions,
) -> Result<FittedTle, TleFitError>
where
    E: StateEvaluator,
    S: EphemerisSource + ?Sized,
{
    let observations = ObservationSet::sample(source, step)?;
    let first = observations.first();

    let equinoctial = EquinoctialElements::from_cartesian(&first.state, options.central_body.mu)?;
    let initial = FitParameters::from_equinoctial(&equinoctial, INITIAL_BSTAR);
    debug!(%initial, "initial guess from osculating state");

    fit_tle_from_observations(
        evaluator,
        &observations,
        initial,
        first.epoch,
        catalog,
        options,
    )
}
