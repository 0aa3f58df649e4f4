//! # Residual weighting
//!
//! Residuals are weighted with a diagonal matrix `W = diag(1/σ²)` over the six
//! state components, one σ for the three position components and one for the
//! three velocity components. The default σ are 1 km and 1 m/s.
//!
//! Position and velocity residuals differ by three orders of magnitude, and
//! the fitted parameters by even more (kilometers for `a`, radians for the
//! angles, ~1e-4 for B*). The normal equations are therefore built in
//! non-dimensional form with [`ScaledWeights`]:
//!
//! * positions are divided by a reference length `R` (the central body radius),
//! * velocities by a reference speed `V = √(μ/a₀)`, the circular speed at the
//!   semi-major axis of the initial guess,
//! * the σ are divided by the same factors.
//!
//! The cost used to accept or reject a step stays the physical
//! `½·Σ bᵀWb` computed with [`WeightModel::cost`].

use nalgebra::Vector6;
use serde::{Deserialize, Serialize};

use crate::{constants::State6, tle_fit_errors::TleFitError};

/// Standard deviations of the observed position (km) and velocity (km/s).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightModel {
    pub sigma_position: f64,
    pub sigma_velocity: f64,
}

impl Default for WeightModel {
    fn default() -> Self {
        Self {
            sigma_position: 1.0,
            sigma_velocity: 1e-3,
        }
    }
}

impl WeightModel {
    pub fn new(sigma_position: f64, sigma_velocity: f64) -> Result<Self, TleFitError> {
        let model = Self {
            sigma_position,
            sigma_velocity,
        };
        model.validate()?;
        Ok(model)
    }

    /// Both σ must be finite and strictly positive.
    pub fn validate(&self) -> Result<(), TleFitError> {
        for (name, sigma) in [
            ("sigma_position", self.sigma_position),
            ("sigma_velocity", self.sigma_velocity),
        ] {
            if !(sigma.is_finite() && sigma > 0.0) {
                return Err(TleFitError::InvalidFitParameter(format!(
                    "{name} must be finite and > 0, got {sigma}"
                )));
            }
        }
        Ok(())
    }

    /// Diagonal of `W`.
    pub fn diagonal(&self) -> Vector6<f64> {
        let wp = self.sigma_position.powi(-2);
        let wv = self.sigma_velocity.powi(-2);
        Vector6::new(wp, wp, wp, wv, wv, wv)
    }

    /// Weighted cost `½·Σ bᵀWb` of a set of residuals.
    ///
    /// NaN components propagate to the cost.
    pub fn cost<'a, I>(&self, residuals: I) -> f64
    where
        I: IntoIterator<Item = &'a State6>,
    {
        let w = self.diagonal();
        0.5 * residuals
            .into_iter()
            .map(|b| b.component_mul(b).dot(&w))
            .sum::<f64>()
    }

    /// Non-dimensional counterpart of the model.
    pub fn scaled(&self, reference_length: f64, reference_speed: f64) -> ScaledWeights {
        let scaled = WeightModel {
            sigma_position: self.sigma_position / reference_length,
            sigma_velocity: self.sigma_velocity / reference_speed,
        };
        ScaledWeights {
            reference_length,
            reference_speed,
            diagonal: scaled.diagonal(),
        }
    }
}

/// Weights and scale factors of the non-dimensional problem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledWeights {
    reference_length: f64,
    reference_speed: f64,
    diagonal: Vector6<f64>,
}

impl ScaledWeights {
    pub fn reference_length(&self) -> f64 {
        self.reference_length
    }

    pub fn reference_speed(&self) -> f64 {
        self.reference_speed
    }

    /// Diagonal of the scaled weight matrix.
    pub fn diagonal(&self) -> &Vector6<f64> {
        &self.diagonal
    }

    /// Non-dimensional version of a state-like vector.
    pub fn scale(&self, state: &State6) -> State6 {
        let mut scaled = *state;
        scaled.fixed_rows_mut::<3>(0).unscale_mut(self.reference_length);
        scaled.fixed_rows_mut::<3>(3).unscale_mut(self.reference_speed);
        scaled
    }
}

#[cfg(test)]
mod weights_test {
    use super::*;
    use crate::constants::{EARTH_MU, EARTH_RADIUS};
    use approx::assert_relative_eq;

    #[test]
    fn test_validation() {
        assert!(WeightModel::new(1.0, 1e-3).is_ok());
        assert!(WeightModel::new(0.0, 1e-3).is_err());
        assert!(WeightModel::new(1.0, -1e-3).is_err());
        assert!(WeightModel::new(f64::NAN, 1e-3).is_err());
        assert!(WeightModel::new(1.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_cost() {
        let model = WeightModel::default();
        let residuals = [
            State6::new(1.0, 0.0, 0.0, 0.0, 0.0, 1e-3),
            State6::new(0.0, 2.0, 0.0, 0.0, 0.0, 0.0),
        ];
        // ½·(1 + 1 + 4)
        assert_relative_eq!(model.cost(&residuals), 3.0, max_relative = 1e-12);

        let with_nan = [State6::new(f64::NAN, 0.0, 0.0, 0.0, 0.0, 0.0)];
        assert!(model.cost(&with_nan).is_nan());
    }

    #[test]
    fn test_scaled_weights_are_commensurate() {
        let speed = (EARTH_MU / 7_000.0).sqrt();
        let scaled = WeightModel::default().scaled(EARTH_RADIUS, speed);

        let state = State6::new(EARTH_RADIUS, 0.0, 0.0, 0.0, speed, 0.0);
        let unit = scaled.scale(&state);
        assert_relative_eq!(unit[0], 1.0);
        assert_relative_eq!(unit[4], 1.0);

        // the weighted cost is invariant under the scaling
        let residual = State6::new(0.3, -1.2, 0.5, 2e-4, 1e-3, -5e-4);
        let scaled_residual = scaled.scale(&residual);
        let scaled_cost = 0.5 * scaled_residual.component_mul(&scaled_residual).dot(scaled.diagonal());
        assert_relative_eq!(
            scaled_cost,
            WeightModel::default().cost([&residual]),
            max_relative = 1e-12
        );
    }
}
