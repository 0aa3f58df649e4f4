//! # Two-line element records
//!
//! A [`TleRecord`] is one candidate (or final) solution of the fit: a
//! reference epoch, the seven fitted parameters and the catalog metadata of
//! the satellite, carried through unchanged from the caller.
//!
//! ## Overview
//!
//! The record keeps the raw [`FitParameters`] it was built from, and the
//! normalized quantities that actually end up in the text lines:
//!
//! - eccentricity clipped to `[0, 1]`,
//! - inclination folded into `[0, π]` (turning RAAN and argument of perigee
//!   by π when it has to be reflected),
//! - RAAN, argument of perigee and mean anomaly wrapped to `[0, 2π)`,
//! - mean motion `n = ½·86400/π·√(μ/a³)` in revolutions per day.
//!
//! The text side lives in two submodules:
//!
//! - [`encoder`] writes the two fixed-width 69-character lines
//!   ([`TleRecord::to_line1`], [`TleRecord::to_line2`]), the B* exponent field
//!   and the checksum digit,
//! - [`parser`] reads them back ([`TleRecord::parse`]).
//!
//! ## Epoch representation
//!
//! Line 1 carries the epoch as a two-digit year and a day of year with eight
//! decimals (a resolution of 0.864 ms). [`TleRecord::tle_epoch`] returns that
//! quantized epoch, which is the one an SGP4 consumer of the lines will use.

pub mod encoder;
pub mod parser;

use std::f64::consts::PI;

use hifitime::Epoch;
use serde::{Deserialize, Serialize};

use crate::{
    constants::{Radian, DPI, SECONDS_PER_DAY},
    fit_parameters::FitParameters,
    kepler::principal_angle,
};

pub use encoder::{bstar_field, checksum};
pub use parser::parse_bstar_field;

/// Catalog identification of a satellite, written verbatim into the lines.
///
/// Keys are camelCase when (de)serialized, the way the satellite records of
/// the surrounding operations system store their TLE configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogMetadata {
    pub norad_id: u32,
    pub classification: char,
    pub launch_year: i32,
    pub launch_number: u16,
    pub piece_of_launch: String,
    pub element_number: u16,
    pub revolution_number: u32,
}

impl Default for CatalogMetadata {
    /// Placeholder identification used for satellites without a catalog entry.
    fn default() -> Self {
        Self {
            norad_id: 99_999,
            classification: 'U',
            launch_year: 2000,
            launch_number: 999,
            piece_of_launch: "XXX".to_string(),
            element_number: 999,
            revolution_number: 0,
        }
    }
}

/// A fitted TLE: epoch, parameters and catalog metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct TleRecord {
    epoch: Epoch,
    parameters: FitParameters,
    catalog: CatalogMetadata,
    eccentricity: f64,
    inclination: Radian,
    raan: Radian,
    arg_perigee: Radian,
    mean_anomaly: Radian,
    mean_motion: f64,
}

impl TleRecord {
    /// Build a record from a raw parameter vector.
    ///
    /// Arguments
    /// ---------
    /// * `epoch` – reference epoch of the elements.
    /// * `parameters` – `[a, e, i, Ω, ω, M, B*]`, possibly unwrapped.
    /// * `catalog` – identification written into the lines.
    /// * `mu` – gravitational parameter used for the mean motion (km³/s²).
    pub fn new(epoch: Epoch, parameters: FitParameters, catalog: CatalogMetadata, mu: f64) -> Self {
        let ecc = parameters.eccentricity();
        // NaN stays NaN so that encoding reports it
        let eccentricity = if ecc.is_nan() {
            ecc
        } else if ecc <= 0.0 {
            0.0
        } else {
            ecc.min(1.0)
        };

        // i in (π, 2π) is the orbit of inclination 2π - i with node and
        // perigee turned by π: Rz(π)·Rx(-i)·Rz(π) = Rx(i)
        let inclination = principal_angle(parameters.inclination());
        let (inclination, half_turn) = if inclination > PI {
            (DPI - inclination, PI)
        } else {
            (inclination, 0.0)
        };

        Self {
            epoch,
            catalog,
            eccentricity,
            inclination,
            raan: principal_angle(parameters.raan() + half_turn),
            arg_perigee: principal_angle(parameters.arg_perigee() + half_turn),
            mean_anomaly: principal_angle(parameters.mean_anomaly()),
            mean_motion: mean_motion(parameters.semi_major_axis(), mu),
            parameters,
        }
    }

    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    pub fn parameters(&self) -> &FitParameters {
        &self.parameters
    }

    pub fn catalog(&self) -> &CatalogMetadata {
        &self.catalog
    }

    pub fn semi_major_axis(&self) -> f64 {
        self.parameters.semi_major_axis()
    }

    pub fn eccentricity(&self) -> f64 {
        self.eccentricity
    }

    pub fn inclination(&self) -> Radian {
        self.inclination
    }

    pub fn raan(&self) -> Radian {
        self.raan
    }

    pub fn arg_perigee(&self) -> Radian {
        self.arg_perigee
    }

    pub fn mean_anomaly(&self) -> Radian {
        self.mean_anomaly
    }

    /// Mean motion in revolutions per day.
    pub fn mean_motion(&self) -> f64 {
        self.mean_motion
    }

    pub fn bstar(&self) -> f64 {
        self.parameters.bstar()
    }

    /// Year and day of year (1-based, fractional, rounded to the eight
    /// decimals of the text field).
    ///
    /// An epoch within half a field unit of New Year rounds into day 1 of the
    /// next year, never into day 366 (367) of the current one.
    pub fn epoch_fields(&self) -> (i32, f64) {
        let (year, ..) = self.epoch.to_gregorian_utc();
        let day_of_year = 1.0 + (self.epoch.to_utc_seconds() - start_of_year(year).to_utc_seconds())
            / SECONDS_PER_DAY;
        let rounded = format!("{day_of_year:.8}")
            .parse::<f64>()
            .unwrap_or(day_of_year);

        let days_in_year = (start_of_year(year + 1).to_utc_seconds()
            - start_of_year(year).to_utc_seconds())
            / SECONDS_PER_DAY;
        if rounded >= days_in_year + 1.0 {
            (year + 1, rounded - days_in_year)
        } else {
            (year, rounded)
        }
    }

    /// Reference epoch as encoded in line 1.
    pub fn tle_epoch(&self) -> Epoch {
        let (year, day_of_year) = self.epoch_fields();
        epoch_from_day_of_year(year, day_of_year)
    }
}

/// Everything but the parameters of a candidate record.
///
/// The fit builds one [`TleRecord`] per candidate parameter vector; epoch,
/// catalog metadata and `mu` stay fixed for the whole fit.
#[derive(Debug, Clone, Copy)]
pub struct RecordTemplate<'a> {
    pub epoch: Epoch,
    pub catalog: &'a CatalogMetadata,
    pub mu: f64,
}

impl RecordTemplate<'_> {
    pub fn record(&self, parameters: FitParameters) -> TleRecord {
        TleRecord::new(self.epoch, parameters, self.catalog.clone(), self.mu)
    }
}

/// Mean motion (rev/day) of a Keplerian orbit of semi-major axis `a` (km).
pub fn mean_motion(semi_major_axis: f64, mu: f64) -> f64 {
    0.5 * SECONDS_PER_DAY / std::f64::consts::PI * (mu / semi_major_axis.powi(3)).sqrt()
}

/// Semi-major axis (km) of a Keplerian orbit with mean motion `n` (rev/day).
pub fn semi_major_axis_from_mean_motion(mean_motion: f64, mu: f64) -> f64 {
    let n = mean_motion * std::f64::consts::PI / (0.5 * SECONDS_PER_DAY);
    (mu / (n * n)).cbrt()
}

fn start_of_year(year: i32) -> Epoch {
    Epoch::from_gregorian_utc_at_midnight(year, 1, 1)
}

/// UTC epoch from a year and a 1-based fractional day of year.
pub(crate) fn epoch_from_day_of_year(year: i32, day_of_year: f64) -> Epoch {
    Epoch::from_utc_seconds(
        start_of_year(year).to_utc_seconds() + (day_of_year - 1.0) * SECONDS_PER_DAY,
    )
}

#[cfg(test)]
pub(crate) mod tle_record_test {
    use super::*;
    use crate::{
        constants::{EARTH_MU, RADEG},
        orbit_type::keplerian_element::KeplerianElements,
    };
    use approx::assert_relative_eq;
    use hifitime::Unit;

    pub(crate) fn iss_like_record(epoch: Epoch) -> TleRecord {
        let n_rev_day = 15.5;
        let catalog = CatalogMetadata {
            norad_id: 25_544,
            classification: 'U',
            launch_year: 1998,
            launch_number: 67,
            piece_of_launch: "A".into(),
            element_number: 999,
            revolution_number: 0,
        };
        let params = FitParameters::new([
            semi_major_axis_from_mean_motion(n_rev_day, EARTH_MU),
            0.000_741_7,
            51.64 * RADEG,
            200.0 * RADEG,
            50.0 * RADEG,
            310.12 * RADEG,
            1.027e-4,
        ]);
        TleRecord::new(epoch, params, catalog, EARTH_MU)
    }

    #[test]
    fn test_normalization() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 6, 1);
        let params = FitParameters::new([7_000.0, -0.0, -0.5, 7.0, -1.0, 100.0, 0.0]);
        let record = TleRecord::new(epoch, params, CatalogMetadata::default(), EARTH_MU);

        assert!(record.eccentricity().is_sign_positive());
        assert_eq!(record.eccentricity(), 0.0);
        assert_relative_eq!(record.inclination(), 0.5, epsilon = 1e-12);
        for angle in [record.raan(), record.arg_perigee(), record.mean_anomaly()] {
            assert!((0.0..DPI).contains(&angle));
        }
        // raw parameters are kept as given
        assert_eq!(record.parameters().raan(), 7.0);
        assert_eq!(record.parameters().inclination(), -0.5);
    }

    #[test]
    fn test_inclination_is_folded_into_half_turn() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 6, 1);
        let record = |i: f64| {
            let params = FitParameters::new([7_000.0, 0.01, i, 1.0, 2.0, 3.0, 0.0]);
            TleRecord::new(epoch, params, CatalogMetadata::default(), EARTH_MU)
        };

        let direct = record(0.9);
        assert_relative_eq!(direct.inclination(), 0.9);
        assert_relative_eq!(direct.raan(), 1.0);

        for reflected in [record(-0.9), record(DPI - 0.9)] {
            assert_relative_eq!(reflected.inclination(), 0.9, epsilon = 1e-12);
            assert_relative_eq!(reflected.raan(), 1.0 + PI, epsilon = 1e-12);
            assert_relative_eq!(reflected.arg_perigee(), 2.0 + PI, epsilon = 1e-12);
            assert_relative_eq!(reflected.mean_anomaly(), 3.0, epsilon = 1e-12);
        }

        // retrograde orbits below 180° are left alone
        let retrograde = record(2.5);
        assert_relative_eq!(retrograde.inclination(), 2.5);
        assert_relative_eq!(retrograde.arg_perigee(), 2.0);
    }

    #[test]
    fn test_reflected_record_is_the_same_orbit() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 6, 1);
        let params = FitParameters::new([7_000.0, 0.05, -0.3, 1.2, 0.7, 2.0, 0.0]);
        let record = TleRecord::new(epoch, params, CatalogMetadata::default(), EARTH_MU);

        // the anomaly is untouched by the fold, any value compares the frames
        let raw = KeplerianElements {
            semi_major_axis: 7_000.0,
            eccentricity: 0.05,
            inclination: -0.3,
            ascending_node_longitude: 1.2,
            periapsis_argument: 0.7,
            true_anomaly: 2.0,
        }
        .to_cartesian(EARTH_MU);
        let folded = KeplerianElements {
            semi_major_axis: 7_000.0,
            eccentricity: record.eccentricity(),
            inclination: record.inclination(),
            ascending_node_longitude: record.raan(),
            periapsis_argument: record.arg_perigee(),
            true_anomaly: 2.0,
        }
        .to_cartesian(EARTH_MU);

        for k in 0..6 {
            assert_relative_eq!(raw[k], folded[k], epsilon = 1e-6);
        }
    }

    #[test]
    fn test_nan_eccentricity_is_kept() {
        let epoch = Epoch::from_gregorian_utc_at_midnight(2024, 6, 1);
        let params = FitParameters::new([7_000.0, f64::NAN, 0.9, 1.0, 2.0, 3.0, 0.0]);
        let record = TleRecord::new(epoch, params, CatalogMetadata::default(), EARTH_MU);
        assert!(record.eccentricity().is_nan());
    }

    #[test]
    fn test_mean_motion() {
        // 7000 km LEO: period ≈ 5828.5 s
        let n = mean_motion(7_000.0, EARTH_MU);
        let period = 2.0 * std::f64::consts::PI * (7_000.0_f64.powi(3) / EARTH_MU).sqrt();
        assert_relative_eq!(n, SECONDS_PER_DAY / period, max_relative = 1e-14);
        assert_relative_eq!(
            semi_major_axis_from_mean_motion(n, EARTH_MU),
            7_000.0,
            max_relative = 1e-13
        );
    }

    #[test]
    fn test_epoch_fields() {
        let epoch = Epoch::from_gregorian_utc(2024, 2, 1, 6, 0, 0, 0);
        let record = iss_like_record(epoch);
        let (year, doy) = record.epoch_fields();
        assert_eq!(year, 2024);
        assert_relative_eq!(doy, 32.25, epsilon = 1e-9);
        assert!((record.tle_epoch() - epoch).abs() < Unit::Millisecond * 1);
    }

    #[test]
    fn test_epoch_fields_roll_over_new_year() {
        let record = iss_like_record(Epoch::from_gregorian_utc(2023, 12, 31, 23, 59, 59, 999_900_000));
        assert_eq!(record.epoch_fields(), (2024, 1.0));
        assert!(
            (record.tle_epoch() - Epoch::from_gregorian_utc_at_midnight(2024, 1, 1)).abs()
                < Unit::Microsecond * 1
        );

        // leap year, day 367 would be the invalid value
        let record = iss_like_record(Epoch::from_gregorian_utc(2024, 12, 31, 23, 59, 59, 999_900_000));
        assert_eq!(record.epoch_fields(), (2025, 1.0));

        // still inside the last field unit of the year
        let record = iss_like_record(Epoch::from_gregorian_utc(2023, 12, 31, 23, 59, 59, 999_000_000));
        let (year, doy) = record.epoch_fields();
        assert_eq!(year, 2023);
        assert_relative_eq!(doy, 365.99999999, epsilon = 1e-9);
    }

    #[test]
    fn test_tle_epoch_quantization() {
        // 1/3 s is not representable with 1e-8 day resolution
        let epoch = Epoch::from_gregorian_utc(2023, 11, 20, 17, 4, 33, 333_333_333);
        let record = iss_like_record(epoch);
        let tle_epoch = record.tle_epoch();

        assert!((tle_epoch - epoch).abs() <= Unit::Microsecond * 433);
        // the quantized epoch is a fixed point
        let again = iss_like_record(tle_epoch);
        assert!((again.tle_epoch() - tle_epoch).abs() < Unit::Microsecond * 1);
    }

    #[test]
    fn test_catalog_metadata_serde() {
        let json = r#"{"noradId":25544,"classification":"S","launchYear":1998,
            "launchNumber":67,"pieceOfLaunch":"A","elementNumber":12,"revolutionNumber":5}"#;
        let catalog: CatalogMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(catalog.norad_id, 25_544);
        assert_eq!(catalog.classification, 'S');
        assert_eq!(catalog.piece_of_launch, "A");

        let partial: CatalogMetadata = serde_json::from_str(r#"{"noradId":42}"#).unwrap();
        assert_eq!(partial.norad_id, 42);
        assert_eq!(partial.piece_of_launch, "XXX");
        assert_eq!(partial.launch_number, 999);

        let back = serde_json::to_string(&catalog).unwrap();
        assert!(back.contains("\"revolutionNumber\":5"));
    }
}
