//! # TLE text encoding
//!
//! Fixed-width layout of the two lines (0-based columns, end exclusive):
//!
//! | line | columns | field |
//! |---|---|---|
//! | 1 | `2..7` | catalog number |
//! | 1 | `7` | classification |
//! | 1 | `9..17` | international designator (year, launch number, piece) |
//! | 1 | `18..32` | epoch `YYDDD.DDDDDDDD` |
//! | 1 | `33..43` | first derivative of mean motion (always zero) |
//! | 1 | `44..52` | second derivative of mean motion (always zero) |
//! | 1 | `53..61` | B* in exponent notation |
//! | 1 | `62` | ephemeris type (always `0`) |
//! | 1 | `64..68` | element set number |
//! | 2 | `8..16` | inclination (deg) |
//! | 2 | `17..25` | RAAN (deg) |
//! | 2 | `26..33` | eccentricity, leading `0.` omitted |
//! | 2 | `34..42` | argument of perigee (deg) |
//! | 2 | `43..51` | mean anomaly (deg) |
//! | 2 | `52..63` | mean motion (rev/day) |
//! | 2 | `63..68` | revolution number at epoch |
//!
//! Column 68 of both lines is the checksum digit.

use tracing::error;

use super::TleRecord;
use crate::{constants::RADEG, tle_fit_errors::TleFitError};

/// Length of a line without its checksum digit.
pub const LINE_BODY_LEN: usize = 68;

/// Modulo-10 checksum of a TLE line: the digits add their value and every
/// `-` adds one.
///
/// Only the first 68 characters are considered, so the function accepts the
/// line body as well as a complete line.
pub fn checksum(line: &str) -> u8 {
    let sum: u32 = line
        .bytes()
        .take(LINE_BODY_LEN)
        .map(|b| match b {
            b'0'..=b'9' => u32::from(b - b'0'),
            b'-' => 1,
            _ => 0,
        })
        .sum();
    (sum % 10) as u8
}

/// Encode B* in the 8-character exponent notation `±MMMMM±E`, meaning
/// `±0.MMMMM × 10^±E`.
///
/// Values with `|B*| < 1e-9` encode as `" 00000+0"`.
///
/// Errors
/// ------
/// * `TleFitError::InvalidBStarMagnitude` if `|B*| ≥ 1` or B* is not finite.
pub fn bstar_field(value: f64) -> Result<String, TleFitError> {
    if !value.is_finite() || value.abs() >= 1.0 {
        error!(bstar = value, "B* cannot be represented in the TLE exponent field");
        return Err(TleFitError::InvalidBStarMagnitude(value));
    }
    if value.abs() < 1e-9 {
        return Ok(" 00000+0".to_string());
    }

    let magnitude = value.abs();
    // magnitude = 0.MMMMM × 10^exponent
    let mut exponent = magnitude.log10().floor() as i32 + 1;
    let mut mantissa = scaled_mantissa(magnitude, exponent);
    if mantissa >= 100_000 {
        exponent += 1;
        mantissa = scaled_mantissa(magnitude, exponent);
    } else if mantissa < 10_000 {
        exponent -= 1;
        mantissa = scaled_mantissa(magnitude, exponent);
    }

    let sign = if value < 0.0 { '-' } else { ' ' };
    let exponent_sign = if exponent < 0 { '-' } else { '+' };
    Ok(format!(
        "{sign}{mantissa:05}{exponent_sign}{}",
        exponent.unsigned_abs()
    ))
}

fn scaled_mantissa(magnitude: f64, exponent: i32) -> i64 {
    (magnitude / 10f64.powi(exponent) * 1e5).round() as i64
}

fn append_checksum(mut line: String) -> String {
    let digit = checksum(&line);
    line.push(char::from(b'0' + digit));
    line
}

fn ensure_width(line: u8, field: &'static str, text: String, width: usize) -> Result<String, TleFitError> {
    if text.len() == width {
        Ok(text)
    } else {
        Err(TleFitError::TleFieldOverflow { line, field })
    }
}

/// Angle in degrees, `8.4` format.
///
/// Angles within half a field unit below 360° are written as `0.0000`.
fn angle_field(field: &'static str, angle: f64) -> Result<String, TleFitError> {
    let text = format!("{:8.4}", angle / RADEG);
    let text = if text == "360.0000" {
        "  0.0000".to_string()
    } else {
        text
    };
    ensure_width(2, field, text, 8)
}

impl TleRecord {
    /// First line, checksum included.
    ///
    /// Errors
    /// ------
    /// * `TleFitError::InvalidBStarMagnitude` if B* does not fit its field.
    /// * `TleFitError::TleFieldOverflow` if a catalog value exceeds its columns.
    pub fn to_line1(&self) -> Result<String, TleFitError> {
        let catalog = self.catalog();
        let (year, day_of_year) = self.epoch_fields();

        let norad = ensure_width(1, "norad_id", format!("{:05}", catalog.norad_id), 5)?;
        if !catalog.classification.is_ascii_graphic() {
            return Err(TleFitError::TleFieldOverflow {
                line: 1,
                field: "classification",
            });
        }
        let launch = ensure_width(
            1,
            "launch_number",
            format!("{:03}", catalog.launch_number),
            3,
        )?;
        let piece = ensure_width(
            1,
            "piece_of_launch",
            format!("{:<3}", catalog.piece_of_launch),
            3,
        )?;
        let day = ensure_width(1, "epoch", format!("{day_of_year:012.8}"), 12)?;
        let element_number = ensure_width(
            1,
            "element_number",
            format!("{:4}", catalog.element_number),
            4,
        )?;

        let line = format!(
            "1 {norad}{class} {launch_year:02}{launch}{piece} {epoch_year:02}{day}  .00000000  00000+0 {bstar} 0 {element_number}",
            class = catalog.classification,
            launch_year = catalog.launch_year.rem_euclid(100),
            epoch_year = year.rem_euclid(100),
            bstar = bstar_field(self.bstar())?,
        );
        Ok(append_checksum(line))
    }

    /// Second line, checksum included.
    ///
    /// Errors
    /// ------
    /// * `TleFitError::TleFieldOverflow` if a value exceeds its columns (for
    ///   instance a mean motion above 100 rev/day or an eccentricity that
    ///   rounds to one).
    /// * `TleFitError::InvalidFitParameter` if an element is NaN or infinite.
    pub fn to_line2(&self) -> Result<String, TleFitError> {
        for (field, value) in [
            ("inclination", self.inclination()),
            ("raan", self.raan()),
            ("eccentricity", self.eccentricity()),
            ("arg_perigee", self.arg_perigee()),
            ("mean_anomaly", self.mean_anomaly()),
            ("mean_motion", self.mean_motion()),
        ] {
            if !value.is_finite() {
                error!(field, value, "Non-finite element cannot be encoded");
                return Err(TleFitError::InvalidFitParameter(format!(
                    "{field} is not finite ({value})"
                )));
            }
        }

        let norad = ensure_width(2, "norad_id", format!("{:05}", self.catalog().norad_id), 5)?;

        let ecc_text = format!("{:09.7}", self.eccentricity());
        let eccentricity = match ecc_text.strip_prefix("0.") {
            Some(digits) if digits.len() == 7 => digits.to_string(),
            _ => {
                return Err(TleFitError::TleFieldOverflow {
                    line: 2,
                    field: "eccentricity",
                })
            }
        };

        let line = format!(
            "2 {norad} {inc} {raan} {eccentricity} {aop} {anomaly} {motion}{revolution}",
            inc = angle_field("inclination", self.inclination())?,
            raan = angle_field("raan", self.raan())?,
            aop = angle_field("arg_perigee", self.arg_perigee())?,
            anomaly = angle_field("mean_anomaly", self.mean_anomaly())?,
            motion = ensure_width(2, "mean_motion", format!("{:11.8}", self.mean_motion()), 11)?,
            revolution = ensure_width(
                2,
                "revolution_number",
                format!("{:5}", self.catalog().revolution_number),
                5
            )?,
        );
        Ok(append_checksum(line))
    }

    /// Both lines.
    pub fn lines(&self) -> Result<(String, String), TleFitError> {
        Ok((self.to_line1()?, self.to_line2()?))
    }
}
