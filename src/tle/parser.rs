//! Decoding of the two canonical lines back into a [`TleRecord`].

use hifitime::{Epoch, Unit};

use super::{
    encoder::{checksum, LINE_BODY_LEN},
    semi_major_axis_from_mean_motion, CatalogMetadata, TleRecord,
};
use crate::{constants::RADEG, fit_parameters::FitParameters, tle_fit_errors::TleFitError};

/// Decode the 8-character exponent notation (`" 10270-3"` → `1.027e-4`).
///
/// Returns `None` when the field is malformed.
pub fn parse_bstar_field(field: &str) -> Option<f64> {
    let field = field.trim();
    if field.is_empty() {
        return Some(0.0);
    }

    let (sign, rest) = match field.as_bytes()[0] {
        b'-' => (-1.0, &field[1..]),
        b'+' => (1.0, &field[1..]),
        _ => (1.0, field),
    };

    // exponent sign is the last '+' or '-'
    let pos = rest.rfind(['+', '-']).filter(|&pos| pos > 0)?;
    let (mantissa, exponent) = rest.split_at(pos);
    if !mantissa.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let mantissa: f64 = format!("0.{mantissa}").parse().ok()?;
    let exponent: i32 = exponent.parse().ok()?;
    Some(sign * mantissa * 10f64.powi(exponent))
}

fn check_line(line: &str, line_number: u8) -> Result<(), TleFitError> {
    if line.len() != LINE_BODY_LEN + 1 {
        return Err(TleFitError::InvalidTleLength {
            line: line_number,
            len: line.len(),
        });
    }
    if !line.is_ascii() || line.as_bytes()[0] != b'0' + line_number {
        return Err(TleFitError::InvalidTleLineNumber { line: line_number });
    }

    let expected = line.as_bytes()[LINE_BODY_LEN].wrapping_sub(b'0');
    let computed = checksum(line);
    if expected != computed {
        return Err(TleFitError::ChecksumMismatch {
            line: line_number,
            expected,
            computed,
        });
    }
    Ok(())
}

/// Name of the field starting at column `start` of a line.
fn field_name(line: u8, start: usize) -> &'static str {
    match (line, start) {
        (_, 2) => "norad_id",
        (1, 7) => "classification",
        (1, 9) => "launch_year",
        (1, 11) => "international_designator",
        (1, 18) => "epoch_year",
        (1, 20) => "epoch_day",
        (1, 33) => "mean_motion_dot",
        (1, 44 | 50) => "mean_motion_ddot",
        (1, 53 | 59) => "bstar",
        (1, 62) => "ephemeris_type",
        (1, 64) => "element_number",
        (2, 8) => "inclination",
        (2, 17) => "raan",
        (2, 26) => "eccentricity",
        (2, 34) => "arg_perigee",
        (2, 43) => "mean_anomaly",
        (2, 52) => "mean_motion",
        (2, 63) => "revolution_number",
        _ => "separator",
    }
}

fn decode_error(error: sgp4::Error) -> TleFitError {
    match error {
        sgp4::Error::Tle { line, start, .. } => {
            let line = match line {
                sgp4::ErrorTleLine::Line1 => 1,
                // a line mismatch is reported on the second line
                sgp4::ErrorTleLine::Line2 | sgp4::ErrorTleLine::Both => 2,
            };
            TleFitError::TleFieldParse {
                line,
                field: field_name(line, start),
            }
        }
        other => TleFitError::Propagator(format!("{other:?}")),
    }
}

/// Split `"1998-067A"` into launch year, launch number and piece.
fn designator_fields(designator: Option<&str>) -> Result<(i32, u16, String), TleFitError> {
    let Some(designator) = designator else {
        let blank = CatalogMetadata::default();
        return Ok((blank.launch_year, blank.launch_number, blank.piece_of_launch));
    };
    let invalid = |field| TleFitError::TleFieldParse { line: 1, field };

    let (year, rest) = designator.split_once('-').ok_or(invalid("launch_year"))?;
    let year = year.parse().map_err(|_| invalid("launch_year"))?;
    let number = rest
        .get(..3)
        .and_then(|text| text.trim().parse().ok())
        .ok_or(invalid("launch_number"))?;
    let piece = rest.get(3..).unwrap_or_default().trim_end().to_string();
    Ok((year, number, piece))
}

fn narrow<T: TryFrom<u64>>(value: u64, line: u8, field: &'static str) -> Result<T, TleFitError> {
    T::try_from(value).map_err(|_| TleFitError::TleFieldParse { line, field })
}

impl TleRecord {
    /// Parse two TLE lines.
    ///
    /// Both lines must be 69 ASCII characters, start with their line number
    /// and carry a valid checksum. The fields are decoded by
    /// [`sgp4::Elements::from_tle`], so whatever parses here is also accepted
    /// by the SGP4 evaluator. The semi-major axis is recovered from the mean
    /// motion with `mu`; the mean-motion derivatives are ignored.
    ///
    /// Two-digit years below 57 are in the 2000s, the others in the 1900s.
    pub fn parse(line1: &str, line2: &str, mu: f64) -> Result<TleRecord, TleFitError> {
        check_line(line1, 1)?;
        check_line(line2, 2)?;

        let elements = sgp4::Elements::from_tle(None, line1.as_bytes(), line2.as_bytes())
            .map_err(decode_error)?;

        let (launch_year, launch_number, piece_of_launch) =
            designator_fields(elements.international_designator.as_deref())?;
        let catalog = CatalogMetadata {
            norad_id: narrow(elements.norad_id, 1, "norad_id")?,
            classification: line1.as_bytes()[7] as char,
            launch_year,
            launch_number,
            piece_of_launch,
            element_number: narrow(elements.element_set_number, 1, "element_number")?,
            revolution_number: narrow(elements.revolution_number, 2, "revolution_number")?,
        };

        let timestamp = elements.datetime.and_utc();
        let epoch = Epoch::from_unix_duration(
            Unit::Second * timestamp.timestamp()
                + Unit::Nanosecond * i64::from(timestamp.timestamp_subsec_nanos()),
        );

        let parameters = FitParameters::new([
            semi_major_axis_from_mean_motion(elements.mean_motion, mu),
            elements.eccentricity,
            elements.inclination * RADEG,
            elements.right_ascension * RADEG,
            elements.argument_of_perigee * RADEG,
            elements.mean_anomaly * RADEG,
            elements.drag_term,
        ]);

        Ok(TleRecord::new(epoch, parameters, catalog, mu))
    }
}
