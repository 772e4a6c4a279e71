//! Duration: the elapsed time between two instants as an int64 nanosecond
//! count. The largest representable duration is approximately 290 years.
//!
//! All arithmetic saturates at `Duration::MIN` / `Duration::MAX`.

use core::fmt;
use core::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Duration(i64);

impl Duration {
    pub const NANOSECOND: Duration = Duration(1);
    pub const MICROSECOND: Duration = Duration(1_000);
    pub const MILLISECOND: Duration = Duration(1_000_000);
    pub const SECOND: Duration = Duration(1_000_000_000);
    pub const MINUTE: Duration = Duration(60 * 1_000_000_000);
    pub const HOUR: Duration = Duration(60 * 60 * 1_000_000_000);

    pub const ZERO: Duration = Duration(0);
    pub const MIN: Duration = Duration(i64::MIN);
    pub const MAX: Duration = Duration(i64::MAX);

    #[inline]
    pub const fn from_nanos(nanos: i64) -> Self {
        Duration(nanos)
    }

    /// The duration as an integer nanosecond count.
    #[inline]
    pub const fn nanoseconds(self) -> i64 {
        self.0
    }

    /// The duration as an integer microsecond count, truncated toward zero.
    #[inline]
    pub const fn microseconds(self) -> i64 {
        self.0 / 1_000
    }

    /// The duration as an integer millisecond count, truncated toward zero.
    #[inline]
    pub const fn milliseconds(self) -> i64 {
        self.0 / 1_000_000
    }

    /// The duration as a floating point number of seconds.
    pub fn seconds(self) -> f64 {
        let sec = self.0 / Self::SECOND.0;
        let nsec = self.0 % Self::SECOND.0;
        sec as f64 + nsec as f64 / 1e9
    }

    /// The duration as a floating point number of minutes.
    pub fn minutes(self) -> f64 {
        let min = self.0 / Self::MINUTE.0;
        let nsec = self.0 % Self::MINUTE.0;
        min as f64 + nsec as f64 / (60.0 * 1e9)
    }

    /// The duration as a floating point number of hours.
    pub fn hours(self) -> f64 {
        let hour = self.0 / Self::HOUR.0;
        let nsec = self.0 % Self::HOUR.0;
        hour as f64 + nsec as f64 / (60.0 * 60.0 * 1e9)
    }

    /// Rounds toward zero to a multiple of `m`.
    /// Returns `self` unchanged if `m <= 0`.
    pub fn truncate(self, m: Duration) -> Duration {
        if m.0 <= 0 {
            return self;
        }
        Duration(self.0 - self.0 % m.0)
    }

    /// Rounds to the nearest multiple of `m`, halfway values away from zero.
    ///
    /// Results that do not fit saturate at `MIN` / `MAX`.
    /// Returns `self` unchanged if `m <= 0`.
    pub fn round(self, m: Duration) -> Duration {
        if m.0 <= 0 {
            return self;
        }
        let mut r = self.0 % m.0;
        if self.0 < 0 {
            r = -r;
            if less_than_half(r, m.0) {
                return Duration(self.0 + r);
            }
            return match self.0.checked_sub(m.0 - r) {
                Some(d) => Duration(d),
                None => Self::MIN,
            };
        }
        if less_than_half(r, m.0) {
            return Duration(self.0 - r);
        }
        match self.0.checked_add(m.0 - r) {
            Some(d) => Duration(d),
            None => Self::MAX,
        }
    }

    /// Absolute value; `MIN` maps to `MAX`.
    pub fn abs(self) -> Duration {
        match self.0 {
            d if d >= 0 => self,
            i64::MIN => Self::MAX,
            d => Duration(-d),
        }
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }
}

/// Reports whether `x + x < y` without overflowing, for `0 <= x < y`.
#[inline]
fn less_than_half(x: i64, y: i64) -> bool {
    (x as u64).wrapping_add(x as u64) < y as u64
}

// ==================== Arithmetic ====================

impl Add for Duration {
    type Output = Duration;

    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Duration {
    type Output = Duration;

    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0.saturating_sub(rhs.0))
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        *self = *self + rhs;
    }
}

impl SubAssign for Duration {
    fn sub_assign(&mut self, rhs: Duration) {
        *self = *self - rhs;
    }
}

impl Mul<i64> for Duration {
    type Output = Duration;

    fn mul(self, rhs: i64) -> Duration {
        Duration(self.0.saturating_mul(rhs))
    }
}

impl Mul<Duration> for i64 {
    type Output = Duration;

    fn mul(self, rhs: Duration) -> Duration {
        rhs * self
    }
}

impl Div<i64> for Duration {
    type Output = Duration;

    /// Panics if `rhs` is zero, like integer division.
    fn div(self, rhs: i64) -> Duration {
        Duration(self.0.saturating_div(rhs))
    }
}

impl Neg for Duration {
    type Output = Duration;

    fn neg(self) -> Duration {
        Duration(self.0.saturating_neg())
    }
}

// ==================== Conversions ====================

impl From<i64> for Duration {
    fn from(nanos: i64) -> Self {
        Duration(nanos)
    }
}

impl From<Duration> for i64 {
    fn from(d: Duration) -> Self {
        d.0
    }
}

impl TryFrom<core::time::Duration> for Duration {
    type Error = core::num::TryFromIntError;

    fn try_from(d: core::time::Duration) -> Result<Self, Self::Error> {
        i64::try_from(d.as_nanos()).map(Duration)
    }
}

impl TryFrom<Duration> for core::time::Duration {
    type Error = core::num::TryFromIntError;

    fn try_from(d: Duration) -> Result<Self, Self::Error> {
        u64::try_from(d.0).map(core::time::Duration::from_nanos)
    }
}

// ==================== Text ====================

/// Renders the duration as `72h3m0.5s`: leading zero units omitted,
/// sub-second durations in `ms`, `µs` or `ns` so the leading digit is
/// non-zero, and the zero duration as `0s`.
impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Largest value is "-2562047h47m16.854775808s".
        let mut buf = [0u8; 32];
        let mut w = buf.len();

        let neg = self.0 < 0;
        let mut u = self.0.unsigned_abs();

        if u < Self::SECOND.0 as u64 {
            // Special case: if duration is smaller than a second,
            // use smaller units, like 1.2ms
            let prec;
            w -= 1;
            buf[w] = b's';
            w -= 1;
            if u == 0 {
                return f.pad("0s");
            } else if u < Self::MICROSECOND.0 as u64 {
                prec = 0;
                buf[w] = b'n';
            } else if u < Self::MILLISECOND.0 as u64 {
                // U+00B5 'µ' micro sign is two bytes in UTF-8
                prec = 3;
                w -= 1;
                buf[w..w + 2].copy_from_slice("µ".as_bytes());
            } else {
                prec = 6;
                buf[w] = b'm';
            }
            let (nw, nu) = fmt_frac(&mut buf[..w], u, prec);
            w = fmt_int(&mut buf[..nw], nu);
        } else {
            w -= 1;
            buf[w] = b's';

            let (nw, nu) = fmt_frac(&mut buf[..w], u, 9);
            u = nu;

            // u is now integer seconds
            w = fmt_int(&mut buf[..nw], u % 60);
            u /= 60;

            if u > 0 {
                w -= 1;
                buf[w] = b'm';
                w = fmt_int(&mut buf[..w], u % 60);
                u /= 60;

                // Stop at hours because days can be different lengths.
                if u > 0 {
                    w -= 1;
                    buf[w] = b'h';
                    w = fmt_int(&mut buf[..w], u);
                }
            }
        }

        if neg {
            w -= 1;
            buf[w] = b'-';
        }

        let s = core::str::from_utf8(&buf[w..]).map_err(|_| fmt::Error)?;
        f.pad(s)
    }
}

/// Writes the fraction of `v / 10^prec` to the tail of `buf`, omitting
/// trailing zeros and the decimal point when the fraction is zero.
/// Returns the index where output begins and `v / 10^prec`.
fn fmt_frac(buf: &mut [u8], mut v: u64, prec: usize) -> (usize, u64) {
    let mut w = buf.len();
    let mut print = false;
    for _ in 0..prec {
        let digit = v % 10;
        print = print || digit != 0;
        if print {
            w -= 1;
            buf[w] = digit as u8 + b'0';
        }
        v /= 10;
    }
    if print {
        w -= 1;
        buf[w] = b'.';
    }
    (w, v)
}

/// Writes the decimal form of `v` to the tail of `buf`.
/// Returns the index where output begins.
fn fmt_int(buf: &mut [u8], mut v: u64) -> usize {
    let mut w = buf.len();
    if v == 0 {
        w -= 1;
        buf[w] = b'0';
    } else {
        while v > 0 {
            w -= 1;
            buf[w] = (v % 10) as u8 + b'0';
            v /= 10;
        }
    }
    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(not(feature = "std"))]
    use alloc::string::ToString;

    #[test]
    fn test_display() {
        let cases: &[(Duration, &str)] = &[
            (Duration(0), "0s"),
            (Duration(1), "1ns"),
            (Duration(1100), "1.1µs"),
            (Duration(2_200_000), "2.2ms"),
            (Duration(3_300_000_000), "3.3s"),
            (Duration::MINUTE * 4 + Duration::SECOND * 5, "4m5s"),
            (Duration::MINUTE * 4 + Duration::MILLISECOND * 5001, "4m5.001s"),
            (Duration::HOUR * 5 + Duration::MINUTE * 6 + Duration::MILLISECOND * 7001, "5h6m7.001s"),
            (Duration::MINUTE * 8 + Duration(1), "8m0.000000001s"),
            (Duration::MINUTE * 90, "1h30m0s"),
            (Duration::MILLISECOND * -1500, "-1.5s"),
            (Duration::MAX, "2562047h47m16.854775807s"),
            (Duration::MIN, "-2562047h47m16.854775808s"),
        ];
        for (d, want) in cases {
            assert_eq!(d.to_string(), *want, "{:?}", d);
        }
    }

    #[test]
    fn test_float_conversions() {
        assert_eq!(Duration(-60_000_000_000 - 3).minutes(), -1.0 - 3.0 / 60e9);
        assert_eq!(Duration(3).seconds(), 3e-9);
        assert_eq!(Duration::MAX.seconds(), 9223372036.854775807);
        assert_eq!(Duration(36 * 60 * 1_000_000_000).hours(), 0.6);
        assert_eq!(Duration(-36 * 60 * 1_000_000_000).hours(), -0.6);
    }

    #[test]
    fn test_integer_conversions() {
        assert_eq!(Duration(1_999_999).milliseconds(), 1);
        assert_eq!(Duration(-1_999).microseconds(), -1);
        assert_eq!(Duration(42).nanoseconds(), 42);
    }

    #[test]
    fn test_truncate() {
        let d = Duration::HOUR + Duration::MINUTE * 30 + Duration::SECOND * 5;
        assert_eq!(d.truncate(Duration::MINUTE), Duration::HOUR + Duration::MINUTE * 30);
        assert_eq!(d.truncate(Duration::HOUR), Duration::HOUR);
        assert_eq!(d.truncate(Duration(0)), d);
        assert_eq!(d.truncate(Duration(-7)), d);
        assert_eq!(Duration(-7).truncate(Duration(2)), Duration(-6));
    }

    #[test]
    fn test_round() {
        assert_eq!(Duration(5).round(Duration(10)), Duration(10));
        assert_eq!(Duration(-5).round(Duration(10)), Duration(-10));
        assert_eq!(Duration(4).round(Duration(10)), Duration(0));
        assert_eq!(Duration(-14).round(Duration(10)), Duration(-10));
        assert_eq!(Duration(15).round(Duration(0)), Duration(15));
        assert_eq!(Duration::MAX.round(Duration::HOUR), Duration::MAX);
        assert_eq!(Duration::MIN.round(Duration::HOUR), Duration::MIN);
        assert_eq!(Duration::MAX.round(Duration::SECOND), Duration::MAX);
        assert_eq!(
            (Duration::MAX - Duration::SECOND).round(Duration::SECOND),
            Duration::MAX.truncate(Duration::SECOND)
        );
    }

    #[test]
    fn test_abs() {
        assert_eq!(Duration(-3).abs(), Duration(3));
        assert_eq!(Duration(3).abs(), Duration(3));
        assert_eq!(Duration::MIN.abs(), Duration::MAX);
    }

    #[test]
    fn test_saturating_ops() {
        assert_eq!(Duration::MAX + Duration(1), Duration::MAX);
        assert_eq!(Duration::MIN - Duration(1), Duration::MIN);
        assert_eq!(Duration::HOUR * i64::MAX, Duration::MAX);
        assert_eq!(-Duration::MIN, Duration::MAX);
        assert_eq!(Duration::SECOND / 4, Duration::MILLISECOND * 250);
    }

    #[test]
    fn test_std_conversions() {
        let std_d = core::time::Duration::from_millis(1500);
        assert_eq!(Duration::try_from(std_d), Ok(Duration::MILLISECOND * 1500));
        assert!(core::time::Duration::try_from(Duration(-1)).is_err());
        assert!(Duration::try_from(core::time::Duration::from_secs(u64::MAX)).is_err());
    }
}
