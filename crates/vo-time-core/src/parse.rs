//! Duration parsing.
//!
//! Accepts what `Duration`'s `Display` produces, plus any sequence of
//! decimal numbers with optional fraction and a unit suffix, such as
//! "300ms", "-1.5h" or "2h45m".

use core::fmt;
use core::str::FromStr;

#[cfg(not(feature = "std"))]
use alloc::format;
#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};

use crate::duration::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseDurationError {
    /// Input was empty
    Empty,
    /// Input is not a duration
    Invalid(String),
    /// A number was not followed by a unit
    MissingUnit(String),
    /// Unit suffix is not one of ns, us, µs, ms, s, m, h
    UnknownUnit { unit: String, input: String },
    /// Value does not fit in a Duration
    Overflow(String),
}

impl ParseDurationError {
    /// Get the error message.
    pub fn message(&self) -> String {
        match self {
            ParseDurationError::Empty => "invalid duration \"\"".to_string(),
            ParseDurationError::Invalid(s) => format!("invalid duration {:?}", s),
            ParseDurationError::MissingUnit(s) => format!("missing unit in duration {:?}", s),
            ParseDurationError::UnknownUnit { unit, input } => {
                format!("unknown unit {:?} in duration {:?}", unit, input)
            }
            ParseDurationError::Overflow(s) => format!("duration out of range {:?}", s),
        }
    }
}

impl fmt::Display for ParseDurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseDurationError {}

fn unit_nanos(unit: &str) -> Option<u64> {
    let n = match unit {
        "ns" => 1,
        // U+00B5 micro sign and U+03BC Greek mu are both accepted
        "us" | "µs" | "μs" => 1_000,
        "ms" => 1_000_000,
        "s" => 1_000_000_000,
        "m" => 60 * 1_000_000_000,
        "h" => 60 * 60 * 1_000_000_000,
        _ => return None,
    };
    Some(n)
}

/// Splits the leading run of ASCII digits off `s`.
fn split_digits(s: &str) -> (&str, &str) {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s.split_at(end)
}

/// Parse a duration string like "1h30m", "100ms" or "-2.5s".
pub fn parse_duration(input: &str) -> Result<Duration, ParseDurationError> {
    let invalid = || ParseDurationError::Invalid(input.to_string());
    let overflow = || ParseDurationError::Overflow(input.to_string());

    let mut s = input;
    let mut neg = false;
    if let Some(rest) = s.strip_prefix('-') {
        neg = true;
        s = rest;
    } else if let Some(rest) = s.strip_prefix('+') {
        s = rest;
    }

    // Special case: a unitless zero is fine.
    if s == "0" {
        return Ok(Duration::ZERO);
    }
    if s.is_empty() {
        return Err(if input.is_empty() { ParseDurationError::Empty } else { invalid() });
    }

    let mut total: u64 = 0;
    while !s.is_empty() {
        // Integer part
        let (int_digits, rest) = split_digits(s);
        s = rest;
        let mut v: u64 = 0;
        for b in int_digits.bytes() {
            v = v
                .checked_mul(10)
                .and_then(|v| v.checked_add(u64::from(b - b'0')))
                .ok_or_else(overflow)?;
        }

        // Fractional part; digits past u64 precision are dropped
        let mut frac: u64 = 0;
        let mut scale: f64 = 1.0;
        let mut frac_digits = "";
        if let Some(rest) = s.strip_prefix('.') {
            let (digits, rest) = split_digits(rest);
            frac_digits = digits;
            s = rest;
            for b in digits.bytes() {
                match frac.checked_mul(10).and_then(|f| f.checked_add(u64::from(b - b'0'))) {
                    Some(f) => {
                        frac = f;
                        scale *= 10.0;
                    }
                    None => break,
                }
            }
        }
        if int_digits.is_empty() && frac_digits.is_empty() {
            return Err(invalid());
        }

        // Unit
        let unit_end = s.find(|c: char| c == '.' || c.is_ascii_digit()).unwrap_or(s.len());
        if unit_end == 0 {
            return Err(ParseDurationError::MissingUnit(input.to_string()));
        }
        let (unit, rest) = s.split_at(unit_end);
        s = rest;
        let unit_ns = unit_nanos(unit).ok_or_else(|| ParseDurationError::UnknownUnit {
            unit: unit.to_string(),
            input: input.to_string(),
        })?;

        v = v.checked_mul(unit_ns).ok_or_else(overflow)?;
        if frac > 0 {
            // float64 is needed to be nanosecond accurate for fractions of hours.
            // v >= 0 && (frac * unit / scale) <= 3.6e12 (ns/h, h is the largest unit)
            let frac_ns = (frac as f64 * (unit_ns as f64 / scale)) as u64;
            v = v.checked_add(frac_ns).ok_or_else(overflow)?;
        }
        total = total.checked_add(v).ok_or_else(overflow)?;
        if total > 1 << 63 {
            return Err(overflow());
        }
    }

    if neg {
        // 1 << 63 negates to i64::MIN
        return Ok(Duration::from_nanos((total as i64).wrapping_neg()));
    }
    if total > i64::MAX as u64 {
        return Err(overflow());
    }
    Ok(Duration::from_nanos(total as i64))
}

impl FromStr for Duration {
    type Err = ParseDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_duration(s)
    }
}
