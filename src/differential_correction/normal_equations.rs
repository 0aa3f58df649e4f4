//! # Damped normal equations
//!
//! With the non-dimensional Jacobian blocks `Aⱼ`, scaled residuals `b̃ⱼ` and
//! scaled weights `W̃`:
//!
//! ```text
//! N = Σ Aⱼᵀ W̃ Aⱼ        g = Σ Aⱼᵀ W̃ b̃ⱼ
//! (N + λ·N) dx = g
//! ```
//!
//! The damped system is solved with the pseudo-inverse of the symmetric
//! matrix `(1 + λ)·N`, built from its eigen-decomposition. Eigenvalues whose
//! magnitude is below `rcond` times the largest one are treated as zero, so
//! parameters that the observations cannot see (for instance B* against a
//! drag-free model) receive a zero step instead of an arbitrary one.

use nalgebra::{Matrix6, SMatrix, SVector, SymmetricEigen};

use crate::{
    fit_parameters::N_PARAMS,
    residuals::ResidualSet,
    weights::ScaledWeights,
};

/// Maximum number of QR sweeps of the eigen-decomposition.
const MAX_EIGEN_SWEEPS: usize = 1_000;

pub type NormalMatrix = SMatrix<f64, N_PARAMS, N_PARAMS>;
pub type ParameterVector = SVector<f64, N_PARAMS>;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalEquations {
    matrix: NormalMatrix,
    rhs: ParameterVector,
}

impl NormalEquations {
    pub fn assemble(set: &ResidualSet, scaled: &ScaledWeights) -> Self {
        let weights = Matrix6::from_diagonal(scaled.diagonal());

        let (matrix, rhs) = set.jacobian().iter().zip(set.residuals()).fold(
            (NormalMatrix::zeros(), ParameterVector::zeros()),
            |(matrix, rhs), (block, residual)| {
                let weighted = block.transpose() * weights;
                (
                    matrix + weighted * block,
                    rhs + weighted * scaled.scale(residual),
                )
            },
        );

        Self { matrix, rhs }
    }

    pub fn matrix(&self) -> &NormalMatrix {
        &self.matrix
    }

    pub fn rhs(&self) -> &ParameterVector {
        &self.rhs
    }

    /// Non-dimensional step of damping `lambda`.
    ///
    /// The step is all NaN when the system itself is not finite; the caller
    /// sees a NaN cost and rejects it.
    pub fn solve(&self, lambda: f64, rcond: f64) -> ParameterVector {
        let damped = self.matrix * (1.0 + lambda);
        match symmetric_pinv(&damped, rcond) {
            Some(pinv) if self.rhs.iter().all(|g| g.is_finite()) => pinv * self.rhs,
            _ => ParameterVector::repeat(f64::NAN),
        }
    }
}

/// Pseudo-inverse of a symmetric matrix.
///
/// Returns `None` if the matrix has non-finite entries or the
/// eigen-decomposition does not converge.
pub fn symmetric_pinv(matrix: &NormalMatrix, rcond: f64) -> Option<NormalMatrix> {
    if !matrix.iter().all(|m| m.is_finite()) {
        return None;
    }

    let eigen = SymmetricEigen::try_new(*matrix, f64::EPSILON, MAX_EIGEN_SWEEPS)?;
    let cutoff = rcond * eigen.eigenvalues.amax();
    let inverted = eigen
        .eigenvalues
        .map(|l| if l.abs() > cutoff { 1.0 / l } else { 0.0 });

    Some(eigen.eigenvectors * NormalMatrix::from_diagonal(&inverted) * eigen.eigenvectors.transpose())
}
