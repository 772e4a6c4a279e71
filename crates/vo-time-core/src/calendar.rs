//! Proleptic Gregorian calendar math.
//!
//! Computations work on "absolute" seconds: seconds since a zero year far
//! enough in the past that every representable date is non-negative, so
//! division and remainder never round the wrong way. All arithmetic on
//! absolute values wraps like unsigned integers, and no function here fails.

use core::fmt;

use num_enum::TryFromPrimitive;

pub const SECONDS_PER_MINUTE: u64 = 60;
pub const SECONDS_PER_HOUR: u64 = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: u64 = 24 * SECONDS_PER_HOUR;
pub const SECONDS_PER_WEEK: u64 = 7 * SECONDS_PER_DAY;
pub const DAYS_PER_400_YEARS: u64 = 365 * 400 + 97;
pub const DAYS_PER_100_YEARS: u64 = 365 * 100 + 24;
pub const DAYS_PER_4_YEARS: u64 = 365 * 4 + 1;

/// The unsigned zero year for internal calculations.
/// Must be 1 mod 400; times before it will not compute correctly.
pub const ABSOLUTE_ZERO_YEAR: i64 = -292_277_022_399;

/// The year of the zero instant.
pub const INTERNAL_YEAR: i64 = 1;

/// Offsets between absolute seconds, internal seconds (since January 1,
/// year 1), Unix seconds and packed wall seconds (since January 1, 1885).
pub const ABSOLUTE_TO_INTERNAL: i64 =
    (ABSOLUTE_ZERO_YEAR - INTERNAL_YEAR) * 3_652_425 / 10_000 * SECONDS_PER_DAY as i64;
pub const INTERNAL_TO_ABSOLUTE: i64 = -ABSOLUTE_TO_INTERNAL;

pub const UNIX_TO_INTERNAL: i64 =
    (1969 * 365 + 1969 / 4 - 1969 / 100 + 1969 / 400) * SECONDS_PER_DAY as i64;
pub const INTERNAL_TO_UNIX: i64 = -UNIX_TO_INTERNAL;

pub const WALL_TO_INTERNAL: i64 =
    (1884 * 365 + 1884 / 4 - 1884 / 100 + 1884 / 400) * SECONDS_PER_DAY as i64;
pub const INTERNAL_TO_WALL: i64 = -WALL_TO_INTERNAL;

/// Days before the start of each month in a non-leap year.
/// `DAYS_BEFORE[m]` counts the days in months `1..=m`.
pub const DAYS_BEFORE: [u32; 13] = [
    0,
    31,
    31 + 28,
    31 + 28 + 31,
    31 + 28 + 31 + 30,
    31 + 28 + 31 + 30 + 31,
    31 + 28 + 31 + 30 + 31 + 30,
    31 + 28 + 31 + 30 + 31 + 30 + 31,
    31 + 28 + 31 + 30 + 31 + 30 + 31 + 31,
    31 + 28 + 31 + 30 + 31 + 30 + 31 + 31 + 30,
    31 + 28 + 31 + 30 + 31 + 30 + 31 + 31 + 30 + 31,
    31 + 28 + 31 + 30 + 31 + 30 + 31 + 31 + 30 + 31 + 30,
    31 + 28 + 31 + 30 + 31 + 30 + 31 + 31 + 30 + 31 + 30 + 31,
];

// ==================== Month / Weekday ====================

/// A month of the year (January = 1, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Month {
    January = 1,
    February = 2,
    March = 3,
    April = 4,
    May = 5,
    June = 6,
    July = 7,
    August = 8,
    September = 9,
    October = 10,
    November = 11,
    December = 12,
}

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

impl Month {
    /// Month from a 1-based number, wrapping out-of-range values into 1..=12.
    pub fn from_number(n: i64) -> Month {
        let m = (n - 1).rem_euclid(12) as u8 + 1;
        Month::try_from(m).unwrap_or(Month::January)
    }

    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        MONTH_NAMES[self as usize - 1]
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl From<Month> for i64 {
    fn from(m: Month) -> Self {
        m as i64
    }
}

/// A day of the week (Sunday = 0, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, TryFromPrimitive)]
#[repr(u8)]
pub enum Weekday {
    Sunday = 0,
    Monday = 1,
    Tuesday = 2,
    Wednesday = 3,
    Thursday = 4,
    Friday = 5,
    Saturday = 6,
}

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

impl Weekday {
    #[inline]
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        WEEKDAY_NAMES[self as usize]
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

// ==================== Leap years / normalization ====================

#[inline]
pub fn is_leap(year: i64) -> bool {
    year % 4 == 0 && (year % 100 != 0 || year % 400 == 0)
}

/// Number of days in `month` of `year`.
pub fn days_in(month: Month, year: i64) -> u32 {
    if month == Month::February && is_leap(year) {
        return 29;
    }
    let m = month as usize;
    DAYS_BEFORE[m] - DAYS_BEFORE[m - 1]
}

/// Returns `(nhi, nlo)` such that `hi * base + lo == nhi * base + nlo`
/// and `0 <= nlo < base`.
pub fn norm(mut hi: i64, mut lo: i64, base: i64) -> (i64, i64) {
    // The carry into hi wraps; the new lo is always exact.
    if lo < 0 {
        let n = !lo / base + 1;
        hi = hi.wrapping_sub(n);
        lo = lo.wrapping_add(n.wrapping_mul(base));
    }
    if lo >= base {
        let n = lo / base;
        hi = hi.wrapping_add(n);
        lo -= n * base;
    }
    (hi, lo)
}

// ==================== Absolute seconds ====================

/// Year and zero-based day of year for an absolute time.
pub fn abs_year_day(abs: u64) -> (i64, u32) {
    // Split into time and day.
    let mut d = abs / SECONDS_PER_DAY;

    // Account for 400 year cycles.
    let mut n = d / DAYS_PER_400_YEARS;
    let mut y = 400 * n;
    d -= DAYS_PER_400_YEARS * n;

    // Cut off 100-year cycles.
    // The last cycle has one extra leap year, so on the last day
    // of that year, day / DAYS_PER_100_YEARS will be 4 instead of 3.
    // Cut it back down to 3 by subtracting n >> 2.
    n = d / DAYS_PER_100_YEARS;
    n -= n >> 2;
    y += 100 * n;
    d -= DAYS_PER_100_YEARS * n;

    // Cut off 4-year cycles.
    // The last cycle has a missing leap year, which does not
    // affect the computation.
    n = d / DAYS_PER_4_YEARS;
    y += 4 * n;
    d -= DAYS_PER_4_YEARS * n;

    // Cut off years within a 4-year cycle.
    // The last year is a leap year, so on the last day of that year,
    // day / 365 will be 4 instead of 3. Cut it back down to 3
    // by subtracting n >> 2.
    n = d / 365;
    n -= n >> 2;
    y += n;
    d -= 365 * n;

    ((y as i64).wrapping_add(ABSOLUTE_ZERO_YEAR), d as u32)
}

/// Full calendar date for an absolute time:
/// `(year, month, day of month, zero-based day of year)`.
pub fn abs_date(abs: u64) -> (i64, Month, u32, u32) {
    let (year, yday) = abs_year_day(abs);

    let mut day = yday;
    if is_leap(year) {
        // Leap year
        if day > 31 + 29 - 1 {
            // After leap day; pretend it wasn't there.
            day -= 1;
        } else if day == 31 + 29 - 1 {
            // Leap day.
            return (year, Month::February, 29, yday);
        }
    }

    // Estimate month on assumption that every month has 31 days.
    // The estimate may be too low by at most one month, so adjust.
    let mut month = (day / 31) as usize;
    let end = DAYS_BEFORE[month + 1];
    let begin = if day >= end {
        month += 1;
        end
    } else {
        DAYS_BEFORE[month]
    };

    month += 1; // because January is 1
    let month = Month::try_from(month as u8).unwrap_or(Month::January);
    (year, month, day - begin + 1, yday)
}

/// Day of the week for an absolute time.
pub fn abs_weekday(abs: u64) -> Weekday {
    // January 1 of the absolute year, like January 1 of 2001, was a Monday.
    let sec = abs.wrapping_add(Weekday::Monday as u64 * SECONDS_PER_DAY) % SECONDS_PER_WEEK;
    Weekday::try_from((sec / SECONDS_PER_DAY) as u8).unwrap_or(Weekday::Sunday)
}

/// Hour, minute and second within the day for an absolute time.
pub fn abs_clock(abs: u64) -> (u32, u32, u32) {
    let mut sec = (abs % SECONDS_PER_DAY) as u32;
    let hour = sec / SECONDS_PER_HOUR as u32;
    sec -= hour * SECONDS_PER_HOUR as u32;
    let min = sec / SECONDS_PER_MINUTE as u32;
    sec -= min * SECONDS_PER_MINUTE as u32;
    (hour, min, sec)
}

/// ISO 8601 year and week number for an absolute time.
///
/// The first week of a year is the one containing its first Thursday, so
/// Jan 1-3 may belong to week 52 or 53 of the previous year and Dec 29-31
/// to week 1 of the next.
pub fn abs_iso_week(abs: u64) -> (i64, u32) {
    // Weeks start on Monday; shift to the Thursday of the same week.
    // Mon Tue Wed Thu Fri Sat Sun
    //  +3  +2  +1   0  -1  -2  -3
    let mut d = Weekday::Thursday as i64 - abs_weekday(abs) as i64;
    if d == 4 {
        // Sunday
        d = -3;
    }
    let thursday = abs.wrapping_add_signed(d * SECONDS_PER_DAY as i64);
    let (year, yday) = abs_year_day(thursday);
    (year, yday / 7 + 1)
}

/// Days from the absolute zero year to January 1 of `year`.
pub fn days_since_epoch(year: i64) -> u64 {
    let mut y = year.wrapping_sub(ABSOLUTE_ZERO_YEAR) as u64;

    // Add in days from 400-year cycles.
    let mut n = y / 400;
    y -= 400 * n;
    let mut d = DAYS_PER_400_YEARS.wrapping_mul(n);

    // Add in 100-year cycles.
    n = y / 100;
    y -= 100 * n;
    d = d.wrapping_add(DAYS_PER_100_YEARS * n);

    // Add in 4-year cycles.
    n = y / 4;
    y -= 4 * n;
    d = d.wrapping_add(DAYS_PER_4_YEARS * n);

    // Add in non-leap years.
    d.wrapping_add(365 * y)
}

/// Absolute seconds at midnight starting `day` of `month` in `year`.
/// `day` may fall outside the month; it is counted from the first.
pub fn abs_from_date(year: i64, month: Month, day: i64) -> u64 {
    let mut d = days_since_epoch(year);
    d = d.wrapping_add(u64::from(DAYS_BEFORE[month as usize - 1]));
    if is_leap(year) && month >= Month::March {
        d = d.wrapping_add(1); // February 29
    }
    d = d.wrapping_add(day.wrapping_sub(1) as u64);
    d.wrapping_mul(SECONDS_PER_DAY)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[cfg(not(feature = "std"))]
    use alloc::string::ToString;

    fn unix_to_abs(unix: i64) -> u64 {
        unix.wrapping_add(UNIX_TO_INTERNAL + INTERNAL_TO_ABSOLUTE) as u64
    }

    #[test]
    fn test_offsets() {
        assert_eq!(UNIX_TO_INTERNAL, 62_135_596_800);
        assert_eq!(WALL_TO_INTERNAL, 59_453_308_800);
        assert_eq!(ABSOLUTE_TO_INTERNAL, -9_223_371_966_579_724_800);
    }

    #[test]
    fn test_is_leap() {
        assert!(!is_leap(2019)); // ordinary
        assert!(is_leap(2020)); // divisible by 4
        assert!(!is_leap(1900)); // divisible by 100, not 400
        assert!(is_leap(2000)); // divisible by 400
        assert!(is_leap(-4));
        assert!(is_leap(0));
        assert!(!is_leap(-100));
    }

    #[test]
    fn test_days_in() {
        assert_eq!(days_in(Month::February, 2011), 28);
        assert_eq!(days_in(Month::February, 2012), 29);
        assert_eq!(days_in(Month::February, 2100), 28);
        assert_eq!(days_in(Month::December, 2011), 31);
        assert_eq!(days_in(Month::April, 2011), 30);
    }

    #[test]
    fn test_norm() {
        assert_eq!(norm(2011, 12, 12), (2012, 0));
        assert_eq!(norm(2011, -1, 12), (2010, 11));
        assert_eq!(norm(0, -12, 12), (-1, 0));
        assert_eq!(norm(5, 59, 60), (5, 59));
        assert_eq!(norm(0, 125, 60), (2, 5));
    }

    #[test]
    fn test_norm_extremes() {
        let (hi, lo) = norm(0, i64::MIN, 1_000_000_000);
        assert_eq!((hi, lo), (-9_223_372_037, 145_224_192));
        assert_eq!(norm(0, i64::MIN, 12), (i64::MIN / 12 - 1, 4));
        assert_eq!(norm(0, i64::MAX, 60), (i64::MAX / 60, i64::MAX % 60));
        // The carry wraps rather than failing.
        assert_eq!(norm(i64::MIN, -1, 60), (i64::MAX, 59));
        assert_eq!(norm(i64::MAX, 60, 60), (i64::MIN, 0));
    }

    #[test]
    fn test_abs_from_date_extremes() {
        for year in [i64::MIN, -1, i64::MAX] {
            for day in [i64::MIN, 1, i64::MAX] {
                assert_eq!(
                    abs_from_date(year, Month::December, day),
                    abs_from_date(year, Month::December, day),
                );
            }
        }
    }

    #[test]
    fn test_unix_epoch() {
        let abs = unix_to_abs(0);
        assert_eq!(abs_date(abs), (1970, Month::January, 1, 0));
        assert_eq!(abs_weekday(abs), Weekday::Thursday);
        assert_eq!(abs_clock(abs), (0, 0, 0));
    }

    #[test]
    fn test_known_dates() {
        // 2009-11-10 23:00:00 UTC
        let abs = unix_to_abs(1_257_894_000);
        assert_eq!(abs_date(abs), (2009, Month::November, 10, 313));
        assert_eq!(abs_clock(abs), (23, 0, 0));
        assert_eq!(abs_weekday(abs), Weekday::Tuesday);

        // 2012-02-29 12:34:56 UTC
        let abs = unix_to_abs(1_330_518_896);
        assert_eq!(abs_date(abs), (2012, Month::February, 29, 59));
        assert_eq!(abs_clock(abs), (12, 34, 56));

        // 2012-03-01
        let abs = unix_to_abs(1_330_560_000);
        assert_eq!(abs_date(abs), (2012, Month::March, 1, 60));

        // 1969-12-31 23:59:59 UTC
        let abs = unix_to_abs(-1);
        assert_eq!(abs_date(abs), (1969, Month::December, 31, 364));
        assert_eq!(abs_clock(abs), (23, 59, 59));
        assert_eq!(abs_weekday(abs), Weekday::Wednesday);
    }

    #[test]
    fn test_iso_week() {
        let cases: &[(i64, Month, i64, i64, u32)] = &[
            (1981, Month::January, 1, 1981, 1),
            (1982, Month::January, 1, 1981, 53),
            (1983, Month::January, 1, 1982, 52),
            (1984, Month::January, 1, 1983, 52),
            (1985, Month::January, 1, 1985, 1),
            (2000, Month::January, 1, 1999, 52),
            (2004, Month::December, 27, 2004, 53),
            (2005, Month::January, 2, 2004, 53),
            (2008, Month::December, 29, 2009, 1),
            (2010, Month::January, 3, 2009, 53),
            (2010, Month::January, 4, 2010, 1),
        ];
        for &(year, month, day, want_year, want_week) in cases {
            let abs = abs_from_date(year, month, day);
            assert_eq!(abs_iso_week(abs), (want_year, want_week), "{}-{}-{}", year, month, day);
        }
    }

    #[test]
    fn test_abs_from_date_roundtrip() {
        for &(year, month, day) in &[
            (1, Month::January, 1),
            (1885, Month::January, 1),
            (2157, Month::December, 31),
            (-1, Month::March, 1),
            (-400, Month::February, 29),
            (0, Month::December, 31),
            (292_277_026_596, Month::December, 4),
        ] {
            let (y, m, d, _) = abs_date(abs_from_date(year, month, day));
            assert_eq!((y, m, d as i64), (year, month, day));
        }
    }

    #[test]
    fn test_day_overflow_rolls_forward() {
        assert_eq!(
            abs_from_date(2011, Month::October, 32),
            abs_from_date(2011, Month::November, 1)
        );
        assert_eq!(
            abs_from_date(2012, Month::March, 0),
            abs_from_date(2012, Month::February, 29)
        );
    }

    #[test]
    fn test_month_weekday_names() {
        assert_eq!(Month::March.to_string(), "March");
        assert_eq!(Weekday::Saturday.to_string(), "Saturday");
        assert_eq!(Month::from_number(13), Month::January);
        assert_eq!(Month::from_number(0), Month::December);
        assert_eq!(Month::try_from(13u8).ok(), None);
        assert_eq!(Weekday::try_from(3u8).ok(), Some(Weekday::Wednesday));
    }
}
