//! Time: an instant with nanosecond precision.
//!
//! A `Time` always has wall-clock seconds and nanoseconds. Values read from
//! the clock (`Time::now`) also carry a monotonic reading; while both
//! operands of a comparison or subtraction carry one, only the monotonic
//! readings are used, which makes elapsed-time measurement immune to wall
//! clock steps. Operations that reinterpret the instant (changing location,
//! rounding, building from calendar fields) drop the monotonic reading.
//!
//! `==` compares location, clock kind and every field; use
//! [`Time::equal`] to compare instants.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use vo_time_core::calendar::{
    abs_clock, abs_date, abs_from_date, abs_iso_week, abs_weekday, abs_year_day, norm,
    ABSOLUTE_TO_INTERNAL, INTERNAL_TO_UNIX, SECONDS_PER_DAY, SECONDS_PER_HOUR,
    SECONDS_PER_MINUTE, UNIX_TO_INTERNAL, WALL_TO_INTERNAL,
};
use vo_time_core::{Duration, Month, Weekday};

use crate::clock::TimeContext;
use crate::zone::{Location, ZoneSpan};

/// Internal seconds of January 1, 1885, the zero of the packed wall field.
const MIN_WALL: i64 = WALL_TO_INTERNAL;
/// Largest packed wall value (33 bits), in year 2157.
const MAX_WALL_SEC: u64 = (1 << 33) - 1;

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// Wall seconds, with or without a monotonic reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reading {
    /// Seconds since January 1, year 1.
    Wall { sec: i64 },
    /// Seconds since January 1, 1885 (fits 33 bits) and monotonic
    /// nanoseconds since process start.
    Monotonic { wall: u64, mono: i64 },
}

#[derive(Clone, PartialEq, Eq)]
pub struct Time {
    reading: Reading,
    /// Always in [0, 999999999].
    nsec: u32,
    /// `None` means UTC. UTC is never stored as `Some`.
    loc: Option<Location>,
}

impl Default for Time {
    /// January 1, year 1, 00:00:00 UTC.
    fn default() -> Self {
        Time {
            reading: Reading::Wall { sec: 0 },
            nsec: 0,
            loc: None,
        }
    }
}

// ==================== Representation ====================

impl Time {
    pub(crate) fn from_internal(sec: i64, nsec: u32, loc: Option<Location>) -> Time {
        Time {
            reading: Reading::Wall { sec },
            nsec,
            loc: loc.filter(|l| !l.is_utc()),
        }
    }

    /// Packs wall seconds and a monotonic reading, or returns `None` if the
    /// wall seconds fall outside years 1885..=2157.
    pub(crate) fn with_monotonic(sec: i64, nsec: u32, mono: i64, loc: Location) -> Option<Time> {
        let wall = sec.wrapping_sub(MIN_WALL) as u64;
        if wall > MAX_WALL_SEC {
            return None;
        }
        Some(Time {
            reading: Reading::Monotonic { wall, mono },
            nsec,
            loc: Some(loc).filter(|l| !l.is_utc()),
        })
    }

    /// A value carrying only a monotonic reading, for measuring against.
    pub(crate) fn monotonic_only(mono: i64) -> Time {
        Time {
            reading: Reading::Monotonic { wall: 0, mono },
            nsec: 0,
            loc: None,
        }
    }

    /// Seconds since January 1, year 1.
    pub(crate) fn sec(&self) -> i64 {
        match self.reading {
            Reading::Wall { sec } => sec,
            Reading::Monotonic { wall, .. } => MIN_WALL + wall as i64,
        }
    }

    pub(crate) fn nsec(&self) -> u32 {
        self.nsec
    }

    /// Seconds since January 1, 1970.
    pub(crate) fn unix_sec(&self) -> i64 {
        self.sec().wrapping_add(INTERNAL_TO_UNIX)
    }

    fn add_sec(&mut self, d: i64) {
        if let Reading::Monotonic { wall, mono } = self.reading {
            let dsec = wall as i64 + d;
            if (0..=MAX_WALL_SEC as i64).contains(&dsec) {
                self.reading = Reading::Monotonic { wall: dsec as u64, mono };
                return;
            }
            // Wall second now out of range for packed field.
            self.strip_mono();
        }
        if let Reading::Wall { sec } = &mut self.reading {
            *sec = sec.wrapping_add(d);
        }
    }

    fn set_loc(&mut self, loc: &Location) {
        self.strip_mono();
        self.loc = Some(loc.clone()).filter(|l| !l.is_utc());
    }

    fn strip_mono(&mut self) {
        if let Reading::Monotonic { .. } = self.reading {
            self.reading = Reading::Wall { sec: self.sec() };
        }
    }

    pub fn has_monotonic(&self) -> bool {
        matches!(self.reading, Reading::Monotonic { .. })
    }

    /// The monotonic reading, nanoseconds since process start.
    pub fn monotonic(&self) -> Option<i64> {
        match self.reading {
            Reading::Monotonic { mono, .. } => Some(mono),
            Reading::Wall { .. } => None,
        }
    }

    fn both_monotonic(&self, u: &Time) -> Option<(i64, i64)> {
        match (self.reading, u.reading) {
            (Reading::Monotonic { mono: t, .. }, Reading::Monotonic { mono: u, .. }) => Some((t, u)),
            _ => None,
        }
    }
}

// ==================== Construction ====================

impl Time {
    /// The current local time, from the global context.
    pub fn now() -> Time {
        TimeContext::global().now()
    }

    /// The local time corresponding to the given Unix time. `nsec` outside
    /// [0, 999999999] is carried into `sec`.
    pub fn from_unix(mut sec: i64, mut nsec: i64) -> Time {
        if !(0..NANOS_PER_SEC).contains(&nsec) {
            sec += nsec.div_euclid(NANOS_PER_SEC);
            nsec = nsec.rem_euclid(NANOS_PER_SEC);
        }
        Time::from_internal(
            sec.wrapping_add(UNIX_TO_INTERNAL),
            nsec as u32,
            Some(Location::local()),
        )
    }

    /// The local time corresponding to the given Unix time in milliseconds.
    pub fn from_unix_milli(msec: i64) -> Time {
        Time::from_unix(msec / 1_000, (msec % 1_000) * 1_000_000)
    }

    /// The time corresponding to `yyyy-mm-dd hh:mm:ss + nsec` in `loc`.
    ///
    /// Every field may be outside its usual range and is normalized by
    /// carrying into the next larger unit: October 32 is November 1 and
    /// day 0 is the last day of the previous month.
    ///
    /// A local time that is skipped or repeated by a zone transition has
    /// two candidate offsets; the result uses one of them, the same one for
    /// every call with the same `Location`.
    #[allow(clippy::too_many_arguments)]
    pub fn from_date(
        year: i64,
        month: impl Into<i64>,
        day: i64,
        hour: i64,
        min: i64,
        sec: i64,
        nsec: i64,
        loc: &Location,
    ) -> Time {
        // Normalize month, overflowing into year.
        let (year, m) = norm(year, month.into().wrapping_sub(1), 12);
        let month = Month::from_number(m + 1);

        // Normalize nsec, sec, min, hour, overflowing into day.
        let (sec, nsec) = norm(sec, nsec, NANOS_PER_SEC);
        let (min, sec) = norm(min, sec, 60);
        let (hour, min) = norm(hour, min, 60);
        let (day, hour) = norm(day, hour, 24);

        let abs = abs_from_date(year, month, day).wrapping_add(
            (hour as u64) * SECONDS_PER_HOUR + (min as u64) * SECONDS_PER_MINUTE + sec as u64,
        );
        let mut unix = (abs as i64).wrapping_add(ABSOLUTE_TO_INTERNAL + INTERNAL_TO_UNIX);

        // Look for zone offset for expected time, so we can adjust to UTC.
        // The lookup function expects UTC, so first we pass unix in the
        // hope that it will not be too close to a zone transition,
        // and then adjust if it is.
        let span = loc.lookup(unix);
        let mut offset = span.offset;
        if offset != 0 {
            let utc = unix.wrapping_sub(i64::from(offset));
            // If utc is valid for the span we found, then we have the right offset.
            // If not, we get the correct offset by looking up utc in the location.
            if utc < span.start {
                offset = loc.lookup(span.start - 1).offset;
            } else if utc >= span.end {
                offset = loc.lookup(span.end).offset;
            }
            unix = unix.wrapping_sub(i64::from(offset));
        }

        let mut t = Time::from_internal(unix.wrapping_add(UNIX_TO_INTERNAL), nsec as u32, None);
        t.set_loc(loc);
        t
    }
}

// ==================== Comparison ====================

impl Time {
    /// Reports whether `self` is after `u`.
    pub fn after(&self, u: &Time) -> bool {
        self.compare(u) == Ordering::Greater
    }

    /// Reports whether `self` is before `u`.
    pub fn before(&self, u: &Time) -> bool {
        self.compare(u) == Ordering::Less
    }

    /// Reports whether `self` and `u` are the same instant, regardless of
    /// location. 6:00 +0200 and 4:00 UTC are equal.
    pub fn equal(&self, u: &Time) -> bool {
        self.compare(u) == Ordering::Equal
    }

    /// Orders instants: by monotonic reading when both carry one,
    /// otherwise by wall seconds then nanoseconds.
    pub fn compare(&self, u: &Time) -> Ordering {
        if let Some((tm, um)) = self.both_monotonic(u) {
            return tm.cmp(&um);
        }
        (self.sec(), self.nsec).cmp(&(u.sec(), u.nsec))
    }

    /// Reports whether this is January 1, year 1, 00:00:00 UTC.
    pub fn is_zero(&self) -> bool {
        self.sec() == 0 && self.nsec == 0
    }
}

// ==================== Arithmetic ====================

impl Time {
    /// `self + d`.
    pub fn add(&self, d: Duration) -> Time {
        let d = d.nanoseconds();
        let mut dsec = d / NANOS_PER_SEC;
        let mut nsec = self.nsec as i64 + d % NANOS_PER_SEC;
        if nsec >= NANOS_PER_SEC {
            dsec += 1;
            nsec -= NANOS_PER_SEC;
        } else if nsec < 0 {
            dsec -= 1;
            nsec += NANOS_PER_SEC;
        }

        let mut t = self.clone();
        t.nsec = nsec as u32;
        t.add_sec(dsec);
        if let Reading::Monotonic { wall, mono } = t.reading {
            let te = mono.wrapping_add(d);
            if d < 0 && te > mono || d > 0 && te < mono {
                t.strip_mono();
            } else {
                t.reading = Reading::Monotonic { wall, mono: te };
            }
        }
        t
    }

    /// `self - u`. Results that do not fit in a `Duration` saturate at
    /// `Duration::MIN` / `Duration::MAX`.
    pub fn sub(&self, u: &Time) -> Duration {
        if let Some((te, ue)) = self.both_monotonic(u) {
            let d = te.wrapping_sub(ue);
            if d < 0 && te > ue {
                return Duration::MAX; // self - u is positive out of range
            }
            if d > 0 && te < ue {
                return Duration::MIN; // self - u is negative out of range
            }
            return Duration::from_nanos(d);
        }

        let d = Duration::from_nanos(
            (self.sec().wrapping_sub(u.sec()))
                .wrapping_mul(NANOS_PER_SEC)
                .wrapping_add(self.nsec as i64 - u.nsec as i64),
        );
        // Check for overflow or underflow.
        if u.add(d).equal(self) {
            d
        } else if self.before(u) {
            Duration::MIN
        } else {
            Duration::MAX
        }
    }

    /// Adds the given numbers of years, months and days, normalizing like
    /// [`Time::from_date`]: October 31 plus one month is December 1.
    pub fn add_date(&self, years: i64, months: i64, days: i64) -> Time {
        let (year, month, day) = self.date();
        let (hour, min, sec) = self.clock();
        Time::from_date(
            year.wrapping_add(years),
            i64::from(month).wrapping_add(months),
            i64::from(day).wrapping_add(days),
            i64::from(hour),
            i64::from(min),
            i64::from(sec),
            i64::from(self.nsec),
            &self.location(),
        )
    }

    /// Rounds down to a multiple of `d` since the zero time. The monotonic
    /// reading is dropped; `d <= 0` only drops it.
    ///
    /// This works on absolute elapsed time, not on the presentation: in a
    /// zone with a non-whole-hour offset, truncating to an hour does not
    /// zero the displayed minutes.
    pub fn truncate(&self, d: Duration) -> Time {
        let mut t = self.clone();
        t.strip_mono();
        if d.nanoseconds() <= 0 {
            return t;
        }
        let r = rem(&t, d);
        t.add(Duration::from_nanos(-r))
    }

    /// Rounds to the nearest multiple of `d` since the zero time; halfway
    /// values round up. The monotonic reading is dropped; `d <= 0` only
    /// drops it.
    pub fn round(&self, d: Duration) -> Time {
        let mut t = self.clone();
        t.strip_mono();
        if d.nanoseconds() <= 0 {
            return t;
        }
        let r = rem(&t, d);
        if less_than_half(r, d.nanoseconds()) {
            return t.add(Duration::from_nanos(-r));
        }
        t.add(Duration::from_nanos(d.nanoseconds() - r))
    }
}

#[inline]
fn less_than_half(x: i64, y: i64) -> bool {
    (x as u64).wrapping_add(x as u64) < y as u64
}

/// Remainder of `t` (since the zero time) divided by `d`, in [0, d).
fn rem(t: &Time, d: Duration) -> i64 {
    let d = d.nanoseconds();
    let sec = t.sec();
    let mut nsec = t.nsec as i64;
    let neg = sec < 0;
    let mut usec = sec.unsigned_abs();
    if neg {
        // Operate on absolute value.
        nsec = -nsec;
        if nsec < 0 {
            nsec += NANOS_PER_SEC;
            usec -= 1; // usec >= 1 before the -= so safe
        }
    }

    let r = if d < NANOS_PER_SEC && NANOS_PER_SEC % (d + d) == 0 {
        // Special case: d divides 1 second.
        nsec % d
    } else if d % NANOS_PER_SEC == 0 {
        // Special case: d is a multiple of 1 second.
        let d1 = (d / NANOS_PER_SEC) as u64;
        ((usec % d1) as i64) * NANOS_PER_SEC + nsec
    } else {
        // General case: 128-bit nanosecond count.
        let total = u128::from(usec) * NANOS_PER_SEC as u128 + nsec as u128;
        (total % d as u128) as i64
    };

    if neg && r != 0 {
        d - r
    } else {
        r
    }
}

// ==================== Location ====================

impl Time {
    /// The same instant in UTC.
    pub fn utc(&self) -> Time {
        self.in_location(&Location::utc())
    }

    /// The same instant in the Local location.
    pub fn local(&self) -> Time {
        self.in_location(&Location::local())
    }

    /// The same instant with `loc` for display.
    pub fn in_location(&self, loc: &Location) -> Time {
        let mut t = self.clone();
        t.set_loc(loc);
        t
    }

    pub fn location(&self) -> Location {
        self.loc.clone().unwrap_or_else(Location::utc)
    }

    pub(crate) fn zone_span(&self) -> ZoneSpan {
        match &self.loc {
            Some(loc) => loc.lookup(self.unix_sec()),
            None => Location::utc().lookup(self.unix_sec()),
        }
    }

    /// Zone abbreviation and offset in seconds east of UTC in effect at
    /// this instant.
    pub fn zone(&self) -> (Arc<str>, i32) {
        let span = self.zone_span();
        (span.name, span.offset)
    }

    /// Absolute seconds, adjusted by the zone offset.
    fn abs(&self) -> u64 {
        let unix = self.unix_sec();
        let offset = match &self.loc {
            Some(loc) => i64::from(loc.lookup(unix).offset),
            None => 0,
        };
        to_abs(unix.wrapping_add(offset))
    }

    /// Zone span and absolute seconds from a single lookup.
    pub(crate) fn locabs(&self) -> (ZoneSpan, u64) {
        let span = self.zone_span();
        let abs = to_abs(self.unix_sec().wrapping_add(i64::from(span.offset)));
        (span, abs)
    }
}

#[inline]
fn to_abs(local_unix: i64) -> u64 {
    local_unix.wrapping_add(UNIX_TO_INTERNAL - ABSOLUTE_TO_INTERNAL) as u64
}

// ==================== Presentation ====================

impl Time {
    pub fn date(&self) -> (i64, Month, u32) {
        let (year, month, day, _) = abs_date(self.abs());
        (year, month, day)
    }

    pub fn year(&self) -> i64 {
        abs_year_day(self.abs()).0
    }

    pub fn month(&self) -> Month {
        self.date().1
    }

    pub fn day(&self) -> u32 {
        self.date().2
    }

    pub fn weekday(&self) -> Weekday {
        abs_weekday(self.abs())
    }

    /// ISO 8601 year and week number (1 to 53).
    pub fn iso_week(&self) -> (i64, u32) {
        abs_iso_week(self.abs())
    }

    /// Hour, minute and second within the day.
    pub fn clock(&self) -> (u32, u32, u32) {
        abs_clock(self.abs())
    }

    /// In [0, 23].
    pub fn hour(&self) -> u32 {
        ((self.abs() % SECONDS_PER_DAY) / SECONDS_PER_HOUR) as u32
    }

    /// In [0, 59].
    pub fn minute(&self) -> u32 {
        ((self.abs() % SECONDS_PER_HOUR) / SECONDS_PER_MINUTE) as u32
    }

    /// In [0, 59].
    pub fn second(&self) -> u32 {
        (self.abs() % SECONDS_PER_MINUTE) as u32
    }

    /// In [0, 999999999].
    pub fn nanosecond(&self) -> u32 {
        self.nsec
    }

    /// Day of the year, in [1, 365] or [1, 366] in leap years.
    pub fn year_day(&self) -> u32 {
        abs_year_day(self.abs()).1 + 1
    }

    /// Seconds since January 1, 1970 UTC.
    pub fn unix(&self) -> i64 {
        self.unix_sec()
    }

    /// Milliseconds since January 1, 1970 UTC.
    pub fn unix_milli(&self) -> i64 {
        self.unix_sec()
            .wrapping_mul(1_000)
            .wrapping_add(i64::from(self.nsec / 1_000_000))
    }

    /// Nanoseconds since January 1, 1970 UTC. Undefined (wraps) outside
    /// years 1678 to 2262.
    pub fn unix_nano(&self) -> i64 {
        self.unix_sec()
            .wrapping_mul(NANOS_PER_SEC)
            .wrapping_add(i64::from(self.nsec))
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Time")
            .field("sec", &self.sec())
            .field("nsec", &self.nsec)
            .field("mono", &self.monotonic())
            .field("loc", &self.loc.as_ref().map(Location::name))
            .finish()
    }
}
