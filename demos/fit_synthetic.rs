//! Fit a TLE to one day of synthetic Keplerian states.
//!
//! The reference trajectory is analytic two-body motion expressed in TEME,
//! so the fitted SGP4 elements absorb the J2 and drag terms the reference
//! does not have. Set `RUST_LOG=tlefit=debug` to follow every damping step.
//!
//! ```text
//! cargo run --example fit_synthetic
//! ```

use hifitime::{Epoch, Unit};
use tlefit::{
    constants::{State6, EARTH_MU},
    differential_correction::{fit_tle_from_ephemeris, FitOptions},
    evaluator::{sgp4_evaluator::Sgp4Evaluator, two_body::TwoBodyEvaluator, StateEvaluator},
    observations::{EphemerisSource, Frame},
    tle::{CatalogMetadata, TleRecord},
    FitParameters, TleFitError,
};
use tracing_subscriber::EnvFilter;

/// Keplerian reference trajectory, labelled as TEME.
struct KeplerianEphemeris {
    reference: TleRecord,
    start: Epoch,
    end: Epoch,
}

impl EphemerisSource for KeplerianEphemeris {
    fn frame(&self) -> Frame {
        Frame::Teme
    }

    fn time_range(&self) -> (Epoch, Epoch) {
        (self.start, self.end)
    }

    fn state_at(&self, epoch: Epoch) -> Result<State6, TleFitError> {
        TwoBodyEvaluator::default().evaluate(&self.reference, epoch, Frame::Teme)
    }
}

fn main() -> Result<(), TleFitError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tlefit=info")),
        )
        .init();

    let start = Epoch::from_gregorian_utc(2024, 7, 14, 6, 30, 0, 0);
    let source = KeplerianEphemeris {
        reference: TleRecord::new(
            start,
            FitParameters::new([6_928.0, 0.001_2, 97.6_f64.to_radians(), 1.1, 0.4, 5.9, 0.0]),
            CatalogMetadata::default(),
            EARTH_MU,
        ),
        start,
        end: start + Unit::Day * 1,
    };

    let catalog = CatalogMetadata {
        norad_id: 62_001,
        launch_year: 2024,
        launch_number: 128,
        piece_of_launch: "C".into(),
        element_number: 1,
        ..CatalogMetadata::default()
    };
    let options = FitOptions::builder()
        .max_outer_iter(10)
        .cost_tolerance(1e-6)
        .build()?;
    println!("{options}");

    let fitted = fit_tle_from_ephemeris(&Sgp4Evaluator, &source, Unit::Minute * 10, &catalog, &options)?;

    let (line1, line2) = fitted.lines()?;
    println!(
        "cost {:.6e} -> {:.6e} after {} iterations",
        fitted.initial_cost,
        fitted.final_cost(),
        fitted.outer_iterations
    );
    println!("{line1}\n{line2}");
    Ok(())
}
