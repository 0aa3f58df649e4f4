use thiserror::Error;

use crate::{fit_parameters::FitParameters, observations::Frame};

/// Snapshot of the fit state at the moment a fatal error was raised.
///
/// `last_parameters` is the last accepted parameter vector (the initial guess
/// if no step was accepted yet), `outer_iteration` and `inner_iteration` are
/// zero-based loop counters.
#[derive(Debug, Clone, PartialEq)]
pub struct FitDiagnostics {
    pub last_parameters: FitParameters,
    pub outer_iteration: usize,
    pub inner_iteration: usize,
    pub damping: f64,
    pub cost: f64,
}

#[derive(Error, Debug)]
pub enum TleFitError {
    #[error("Propagator failure: {0}")]
    Propagator(String),

    #[error("Frame {0} is not supported by this evaluator")]
    UnsupportedFrame(Frame),

    #[error(
        "Propagator evaluation failed at outer iteration {}: {source}",
        diagnostics.outer_iteration
    )]
    PropagatorEvaluation {
        #[source]
        source: Box<TleFitError>,
        diagnostics: Box<FitDiagnostics>,
    },

    #[error(
        "Maximum iterations exceeded during TLE fitting ({max_inner_iter} rejected steps at outer iteration {})",
        diagnostics.outer_iteration
    )]
    MaxIterationsExceeded {
        max_inner_iter: usize,
        diagnostics: Box<FitDiagnostics>,
    },

    #[error("TLE fit deadline reached at outer iteration {}", diagnostics.outer_iteration)]
    Timeout { diagnostics: Box<FitDiagnostics> },

    #[error("B* value {0} exceeds the range of the TLE exponent field")]
    InvalidBStarMagnitude(f64),

    #[error("TLE line {line} has length {len}, expected 69")]
    InvalidTleLength { line: u8, len: usize },

    #[error("TLE line {line} does not start with its line number")]
    InvalidTleLineNumber { line: u8 },

    #[error("Unable to parse TLE field `{field}` on line {line}")]
    TleFieldParse { line: u8, field: &'static str },

    #[error("TLE line {line} checksum mismatch: expected {expected}, computed {computed}")]
    ChecksumMismatch { line: u8, expected: u8, computed: u8 },

    #[error("Value of TLE field `{field}` on line {line} does not fit its columns")]
    TleFieldOverflow { line: u8, field: &'static str },

    #[error("Invalid observation set: {0}")]
    InvalidObservations(String),

    #[error("Invalid fit parameter: {0}")]
    InvalidFitParameter(String),

    #[error("ROOTS finding error: {0}")]
    RootFindingError(#[from] roots::SearchError),
}

impl TleFitError {
    /// Diagnostics attached to a fatal fit-time error, if any.
    pub fn diagnostics(&self) -> Option<&FitDiagnostics> {
        match self {
            TleFitError::PropagatorEvaluation { diagnostics, .. }
            | TleFitError::MaxIterationsExceeded { diagnostics, .. }
            | TleFitError::Timeout { diagnostics } => Some(diagnostics),
            _ => None,
        }
    }

    /// Wrap an evaluator failure with the fit state at which it happened.
    pub(crate) fn during_fit(self, diagnostics: FitDiagnostics) -> Self {
        match self {
            // already carries its own snapshot
            err @ (TleFitError::PropagatorEvaluation { .. }
            | TleFitError::MaxIterationsExceeded { .. }
            | TleFitError::Timeout { .. }) => err,
            err => TleFitError::PropagatorEvaluation {
                source: Box::new(err),
                diagnostics: Box::new(diagnostics),
            },
        }
    }
}

impl PartialEq for TleFitError {
    fn eq(&self, other: &Self) -> bool {
        use TleFitError::*;
        match (self, other) {
            (Propagator(a), Propagator(b)) => a == b,
            (UnsupportedFrame(a), UnsupportedFrame(b)) => a == b,
            (
                PropagatorEvaluation {
                    source: a,
                    diagnostics: da,
                },
                PropagatorEvaluation {
                    source: b,
                    diagnostics: db,
                },
            ) => a == b && da == db,
            (
                MaxIterationsExceeded {
                    max_inner_iter: a,
                    diagnostics: da,
                },
                MaxIterationsExceeded {
                    max_inner_iter: b,
                    diagnostics: db,
                },
            ) => a == b && da == db,
            (Timeout { diagnostics: a }, Timeout { diagnostics: b }) => a == b,
            (InvalidBStarMagnitude(a), InvalidBStarMagnitude(b)) => a == b,
            (
                InvalidTleLength { line: la, len: a },
                InvalidTleLength { line: lb, len: b },
            ) => la == lb && a == b,
            (InvalidTleLineNumber { line: a }, InvalidTleLineNumber { line: b }) => a == b,
            (
                TleFieldParse { line: la, field: a },
                TleFieldParse { line: lb, field: b },
            ) => la == lb && a == b,
            (
                ChecksumMismatch {
                    line: la,
                    expected: ea,
                    computed: ca,
                },
                ChecksumMismatch {
                    line: lb,
                    expected: eb,
                    computed: cb,
                },
            ) => la == lb && ea == eb && ca == cb,
            (
                TleFieldOverflow { line: la, field: a },
                TleFieldOverflow { line: lb, field: b },
            ) => la == lb && a == b,
            (InvalidObservations(a), InvalidObservations(b)) => a == b,
            (InvalidFitParameter(a), InvalidFitParameter(b)) => a == b,

            // not comparable beyond the variant
            (RootFindingError(_), RootFindingError(_)) => true,

            _ => false,
        }
    }
}

#[cfg(test)]
mod tle_fit_errors_test {
    use super::*;

    fn snapshot() -> FitDiagnostics {
        FitDiagnostics {
            last_parameters: FitParameters::new([7000.0, 0.01, 0.9, 1.0, 2.0, 3.0, 1e-4]),
            outer_iteration: 2,
            inner_iteration: 4,
            damping: 1e-2,
            cost: 12.5,
        }
    }

    #[test]
    fn test_during_fit_wraps_evaluator_failures() {
        let err = TleFitError::Propagator("diverged".into()).during_fit(snapshot());

        let diag = err.diagnostics().unwrap();
        assert_eq!(diag.outer_iteration, 2);
        assert_eq!(diag.last_parameters.bstar(), 1e-4);
        assert!(err.to_string().contains("outer iteration 2"));
        assert!(err.to_string().contains("diverged"));
    }

    #[test]
    fn test_during_fit_keeps_existing_snapshot() {
        let first = TleFitError::MaxIterationsExceeded {
            max_inner_iter: 20,
            diagnostics: Box::new(snapshot()),
        };
        let mut other = snapshot();
        other.outer_iteration = 9;

        let err = first.during_fit(other);
        assert_eq!(err.diagnostics().unwrap().outer_iteration, 2);
    }

    #[test]
    fn test_plain_errors_have_no_diagnostics() {
        assert!(TleFitError::InvalidBStarMagnitude(1.5).diagnostics().is_none());
        assert_eq!(
            TleFitError::InvalidBStarMagnitude(1.5),
            TleFitError::InvalidBStarMagnitude(1.5)
        );
        assert_ne!(
            TleFitError::InvalidBStarMagnitude(1.5),
            TleFitError::Propagator("x".into())
        );
    }
}
