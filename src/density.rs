//! Parser for the pixel-density list (`"1, 1.5, 2"`).
//!
//! Order and duplicates are preserved. How malformed entries are treated is a
//! policy choice, see [`DensityParsing`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum DensityError {
    #[error("Invalid pixel density {0:?}: expected a positive number")]
    Invalid(String),
}

/// A device pixel ratio multiplier such as `1`, `1.5` or `2`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
pub struct PixelDensity(f64);

impl PixelDensity {
    /// Density of the fallback rendition.
    pub const ONE: Self = Self(1.0);

    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for PixelDensity {
    fn from(value: f64) -> Self {
        Self(value)
    }
}

/// Shortest decimal form: `2`, `1.5`.
impl fmt::Display for PixelDensity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How entries that are not positive numbers are handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DensityParsing {
    /// Reject anything that is not a finite positive number.
    #[default]
    Strict,
    /// Loose conversion: use the leading numeric prefix. Entries that read as
    /// zero or less (including ones with no number at all) are dropped.
    Lenient,
}

/// Parse a comma-separated density list.
///
/// Empty segments are skipped, so `""` yields an empty list. Lenient parsing
/// never fails.
pub fn parse_densities(
    list: &str,
    mode: DensityParsing,
) -> Result<Vec<PixelDensity>, DensityError> {
    list.split(',')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| match mode {
            DensityParsing::Strict => Some(parse_strict(segment)),
            DensityParsing::Lenient => Some(leading_number(segment))
                .filter(|d| *d > 0.0)
                .map(|d| Ok(PixelDensity(d))),
        })
        .collect()
}

fn parse_strict(segment: &str) -> Result<PixelDensity, DensityError> {
    segment
        .parse::<f64>()
        .ok()
        .filter(|d| d.is_finite() && *d > 0.0)
        .map(PixelDensity)
        .ok_or_else(|| DensityError::Invalid(segment.to_string()))
}

/// Longest prefix of `segment` that reads as a decimal number, `0.0` if none.
fn leading_number(segment: &str) -> f64 {
    // f64::from_str also accepts "inf" and "NaN"; only digit-led input counts here.
    let numeric_start = segment
        .trim_start_matches(['+', '-'])
        .starts_with(|c: char| c.is_ascii_digit() || c == '.');
    if !numeric_start {
        return 0.0;
    }
    (1..=segment.len())
        .rev()
        .filter(|end| segment.is_char_boundary(*end))
        .find_map(|end| segment[..end].parse::<f64>().ok())
        .filter(|d| d.is_finite())
        .unwrap_or(0.0)
}
