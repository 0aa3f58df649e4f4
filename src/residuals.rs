//! # Residuals and finite-difference Jacobian
//!
//! For a candidate parameter vector `x` and observations `(tⱼ, yⱼ)`:
//!
//! * the residual at `tⱼ` is `bⱼ = yⱼ − f(x, tⱼ)`, where `f` is the state
//!   predicted by the [`StateEvaluator`],
//! * the Jacobian block at `tⱼ` is the 6×7 matrix `Aⱼ = ∂f(x, tⱼ)/∂x`,
//!   approximated by one-sided finite differences and expressed in the
//!   non-dimensional units of [`ScaledWeights`].
//!
//! ## Finite differences
//!
//! Each parameter `xₖ` is perturbed by `δₖ = 1e-8` when `|xₖ| < 1e-6`, and by
//! `δₖ = 1e-3·xₖ` otherwise. The difference of the two predicted states is
//! divided by the reference length (position rows) or the reference speed
//! (velocity rows), then by `δₖ`. For the semi-major axis, which is itself a
//! length, `δ₀` is first divided by the reference length so that the column
//! is fully non-dimensional; the solved step component is multiplied back
//! by the same length.
//!
//! ## Cost
//!
//! One Jacobian build performs `7·N` extra evaluations for `N` observations.
//! The base evaluations and the seven perturbed columns are independent and
//! are spread over the `rayon` thread pool; the final collect is the join
//! point before the normal equations are assembled.

use nalgebra::SMatrix;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::{
    constants::State6,
    evaluator::{EphemerisPoint, StateEvaluator},
    fit_parameters::{FitParameters, IDX_SEMI_MAJOR_AXIS, N_PARAMS},
    observations::ObservationSet,
    tle::RecordTemplate,
    tle_fit_errors::TleFitError,
    weights::{ScaledWeights, WeightModel},
};

/// Jacobian block of one observation epoch.
pub type JacobianBlock = SMatrix<f64, 6, N_PARAMS>;

/// Perturbation rule of the finite differences.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiniteDifference {
    pub relative_step: f64,
    pub absolute_step: f64,
    pub small_parameter_threshold: f64,
}

impl Default for FiniteDifference {
    fn default() -> Self {
        Self {
            relative_step: 1e-3,
            absolute_step: 1e-8,
            small_parameter_threshold: 1e-6,
        }
    }
}

impl FiniteDifference {
    /// Perturbation applied to a parameter of value `value`.
    pub fn step(&self, value: f64) -> f64 {
        if value.abs() < self.small_parameter_threshold {
            self.absolute_step
        } else {
            value * self.relative_step
        }
    }
}

/// Residuals and Jacobian blocks of one candidate, one entry per observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSet {
    residuals: Vec<State6>,
    jacobian: Vec<JacobianBlock>,
}

impl ResidualSet {
    /// `observed − predicted` per epoch (km, km/s).
    pub fn residuals(&self) -> &[State6] {
        &self.residuals
    }

    /// Non-dimensional Jacobian blocks per epoch.
    pub fn jacobian(&self) -> &[JacobianBlock] {
        &self.jacobian
    }

    pub fn cost(&self, weights: &WeightModel) -> f64 {
        weights.cost(&self.residuals)
    }
}

/// States predicted by `point` at every observation epoch.
fn predicted_states<P: EphemerisPoint>(
    point: &P,
    observations: &ObservationSet,
) -> Result<Vec<State6>, TleFitError> {
    observations
        .as_slice()
        .par_iter()
        .map(|obs| point.state(obs.epoch, observations.frame()))
        .collect()
}

/// Residuals `observed − predicted` of the candidate `parameters`.
pub fn compute_residuals<E: StateEvaluator>(
    evaluator: &E,
    template: &RecordTemplate<'_>,
    parameters: FitParameters,
    observations: &ObservationSet,
) -> Result<Vec<State6>, TleFitError> {
    let point = evaluator.attach(&template.record(parameters))?;
    let predicted = predicted_states(&point, observations)?;

    Ok(observations
        .iter()
        .zip(predicted)
        .map(|(obs, state)| obs.state - state)
        .collect())
}

/// Residuals and finite-difference Jacobian of the candidate `parameters`.
///
/// Arguments
/// ---------
/// * `evaluator` – state evaluator of the candidates.
/// * `template` – epoch, catalog metadata and μ of the records.
/// * `parameters` – the candidate `[a, e, i, Ω, ω, M, B*]`.
/// * `observations` – observed states.
/// * `scaled` – reference length and speed of the non-dimensional problem.
/// * `finite_difference` – perturbation rule.
///
/// Return
/// ------
/// * The [`ResidualSet`], or the first evaluator error encountered.
pub fn compute_residuals_and_jacobian<E: StateEvaluator>(
    evaluator: &E,
    template: &RecordTemplate<'_>,
    parameters: FitParameters,
    observations: &ObservationSet,
    scaled: &ScaledWeights,
    finite_difference: &FiniteDifference,
) -> Result<ResidualSet, TleFitError> {
    let base_point = evaluator.attach(&template.record(parameters))?;
    let base = predicted_states(&base_point, observations)?;

    let columns = (0..N_PARAMS)
        .into_par_iter()
        .map(|idx| {
            let value = parameters[idx];
            let delta = finite_difference.step(value);
            let perturbed = evaluator.attach(&template.record(parameters.with(idx, value + delta)))?;

            let delta = if idx == IDX_SEMI_MAJOR_AXIS {
                delta / scaled.reference_length()
            } else {
                delta
            };

            observations
                .iter()
                .zip(&base)
                .map(|(obs, base_state)| {
                    let state = perturbed.state(obs.epoch, observations.frame())?;
                    Ok(scaled.scale(&(state - base_state)) / delta)
                })
                .collect::<Result<Vec<State6>, TleFitError>>()
        })
        .collect::<Result<Vec<_>, TleFitError>>()?;

    let jacobian = (0..observations.len())
        .map(|j| JacobianBlock::from_fn(|row, col| columns[col][j][row]))
        .collect();

    let residuals = observations
        .iter()
        .zip(&base)
        .map(|(obs, state)| obs.state - state)
        .collect();

    Ok(ResidualSet {
        residuals,
        jacobian,
    })
}
