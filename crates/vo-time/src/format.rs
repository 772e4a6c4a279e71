//! RFC 3339 text layouts, and the default `Display` form of `Time`.

use std::fmt::{self, Write};

use vo_time_core::calendar::{abs_clock, abs_date, days_in};
use vo_time_core::{Duration, Month};

use crate::error::TimeError;
use crate::time::Time;
use crate::zone::Location;

/// A text layout that can render and read back a `Time`.
pub trait TextLayout {
    /// Appends `t` rendered in this layout.
    fn append_format(&self, buf: &mut String, t: &Time);

    /// Parses `text`. A numeric offset that equals the offset of `local` at
    /// the parsed instant yields a time in `local`.
    fn parse(&self, text: &str, local: &Location) -> Result<Time, TimeError>;

    fn format(&self, t: &Time) -> String {
        let mut buf = String::with_capacity(35);
        self.append_format(&mut buf, t);
        buf
    }
}

/// `2006-01-02T15:04:05Z07:00`. Parsing accepts a fractional second.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339;

/// `2006-01-02T15:04:05.999999999Z07:00`, trailing zeros of the fraction
/// removed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rfc3339Nano;

impl TextLayout for Rfc3339 {
    fn append_format(&self, buf: &mut String, t: &Time) {
        append_rfc3339(buf, t, false);
    }

    fn parse(&self, text: &str, local: &Location) -> Result<Time, TimeError> {
        parse_rfc3339_in(text, local)
    }
}

impl TextLayout for Rfc3339Nano {
    fn append_format(&self, buf: &mut String, t: &Time) {
        append_rfc3339(buf, t, true);
    }

    fn parse(&self, text: &str, local: &Location) -> Result<Time, TimeError> {
        parse_rfc3339_in(text, local)
    }
}

impl Time {
    pub fn format(&self, layout: &impl TextLayout) -> String {
        layout.format(self)
    }
}

pub fn format_rfc3339(t: &Time) -> String {
    Rfc3339.format(t)
}

pub fn format_rfc3339_nano(t: &Time) -> String {
    Rfc3339Nano.format(t)
}

/// Parses an RFC 3339 timestamp, resolving numeric offsets against the
/// Local location.
pub fn parse_rfc3339(text: &str) -> Result<Time, TimeError> {
    parse_rfc3339_in(text, &Location::local())
}

// ==================== Formatting ====================

/// Appends `v` zero-padded to `width` digits, sign first.
fn push_int(buf: &mut String, v: i64, width: usize) {
    if v < 0 {
        buf.push('-');
    }
    let _ = write!(buf, "{:0width$}", v.unsigned_abs(), width = width);
}

/// Appends `.nnnnnnnnn` with trailing zeros removed; nothing for zero.
fn push_frac(buf: &mut String, nsec: u32) {
    if nsec == 0 {
        return;
    }
    let _ = write!(buf, ".{:09}", nsec);
    while buf.ends_with('0') {
        buf.pop();
    }
}

/// Appends `±hhmm` or `±hh:mm`. Seconds of the offset are not shown.
fn push_offset(buf: &mut String, offset: i32, colon: bool) {
    let mut zone = offset / 60;
    if zone < 0 {
        buf.push('-');
        zone = -zone;
    } else {
        buf.push('+');
    }
    push_int(buf, i64::from(zone / 60), 2);
    if colon {
        buf.push(':');
    }
    push_int(buf, i64::from(zone % 60), 2);
}

fn push_date_clock(buf: &mut String, abs: u64, sep: char) {
    let (year, month, day, _) = abs_date(abs);
    let (hour, min, sec) = abs_clock(abs);
    push_int(buf, year, 4);
    buf.push('-');
    push_int(buf, i64::from(month.number()), 2);
    buf.push('-');
    push_int(buf, i64::from(day), 2);
    buf.push(sep);
    push_int(buf, i64::from(hour), 2);
    buf.push(':');
    push_int(buf, i64::from(min), 2);
    buf.push(':');
    push_int(buf, i64::from(sec), 2);
}

fn append_rfc3339(buf: &mut String, t: &Time, nanos: bool) {
    let (span, abs) = t.locabs();
    push_date_clock(buf, abs, 'T');
    if nanos {
        push_frac(buf, t.nanosecond());
    }
    if span.offset == 0 {
        buf.push('Z');
    } else {
        push_offset(buf, span.offset, true);
    }
}

/// `2006-01-02 15:04:05.999999999 -0700 MST`, followed by
/// ` m=±sss.nnnnnnnnn` when a monotonic reading is present.
impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = String::with_capacity(64);
        let (span, abs) = self.locabs();
        push_date_clock(&mut buf, abs, ' ');
        push_frac(&mut buf, self.nanosecond());
        buf.push(' ');
        push_offset(&mut buf, span.offset, false);
        buf.push(' ');
        if span.name.is_empty() {
            push_offset(&mut buf, span.offset, false);
        } else {
            buf.push_str(&span.name);
        }

        if let Some(mono) = self.monotonic() {
            let sign = if mono < 0 { '-' } else { '+' };
            let m = mono.unsigned_abs();
            let _ = write!(buf, " m={}{}.{:09}", sign, m / 1_000_000_000, m % 1_000_000_000);
        }
        f.pad(&buf)
    }
}

// ==================== Parsing ====================

struct Scanner<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
        }
    }

    fn error(&self, reason: impl Into<String>) -> TimeError {
        TimeError::parse(self.text, reason)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn expect(&mut self, c: u8) -> Result<(), TimeError> {
        match self.peek() {
            Some(b) if b == c => {
                self.pos += 1;
                Ok(())
            }
            Some(b) => Err(self.error(format!(
                "expected {:?} at offset {}, found {:?}",
                c as char, self.pos, b as char
            ))),
            None => Err(self.error(format!("expected {:?}, found end of text", c as char))),
        }
    }

    /// Exactly `n` decimal digits.
    fn digits(&mut self, n: usize, what: &str) -> Result<i64, TimeError> {
        let bytes = self.bytes;
        let end = self.pos + n;
        let field = bytes
            .get(self.pos..end)
            .filter(|s| s.iter().all(u8::is_ascii_digit))
            .ok_or_else(|| self.error(format!("bad {} at offset {}", what, self.pos)))?;
        self.pos = end;
        Ok(field.iter().fold(0, |acc, &b| acc * 10 + i64::from(b - b'0')))
    }

    fn ranged(&mut self, n: usize, what: &str, max: i64) -> Result<i64, TimeError> {
        let v = self.digits(n, what)?;
        if v > max {
            return Err(self.error(format!("{} out of range", what)));
        }
        Ok(v)
    }
}

/// `YYYY-MM-DDTHH:MM:SS[.fffffffff](Z|±hh:mm)`.
fn parse_rfc3339_in(text: &str, local: &Location) -> Result<Time, TimeError> {
    let mut s = Scanner::new(text);

    let year = s.digits(4, "year")?;
    s.expect(b'-')?;
    let month = s.digits(2, "month")?;
    if !(1..=12).contains(&month) {
        return Err(s.error("month out of range"));
    }
    let month = Month::from_number(month);
    s.expect(b'-')?;
    let day = s.digits(2, "day")?;
    if day < 1 || day > i64::from(days_in(month, year)) {
        return Err(s.error("day out of range"));
    }
    s.expect(b'T')?;
    let hour = s.ranged(2, "hour", 23)?;
    s.expect(b':')?;
    let min = s.ranged(2, "minute", 59)?;
    s.expect(b':')?;
    let sec = s.ranged(2, "second", 59)?;

    let mut nsec = 0;
    if s.peek() == Some(b'.') {
        s.pos += 1;
        let start = s.pos;
        while s.peek().map_or(false, |b| b.is_ascii_digit()) {
            s.pos += 1;
        }
        let n = s.pos - start;
        if n == 0 || n > 9 {
            return Err(s.error("fractional second must have 1 to 9 digits"));
        }
        s.pos = start;
        nsec = s.digits(n, "fractional second")? * 10i64.pow((9 - n) as u32);
    }

    let offset = match s.peek() {
        Some(b'Z') => {
            s.pos += 1;
            None
        }
        Some(sign @ (b'+' | b'-')) => {
            s.pos += 1;
            let hh = s.ranged(2, "zone offset hour", 23)?;
            s.expect(b':')?;
            let mm = s.ranged(2, "zone offset minute", 59)?;
            let offset = ((hh * 60 + mm) * 60) as i32;
            Some(if sign == b'-' { -offset } else { offset })
        }
        _ => return Err(s.error("missing zone offset")),
    };
    if s.pos != s.bytes.len() {
        return Err(s.error(format!("extra text {:?}", &text[s.pos..])));
    }

    let t = Time::from_date(year, month, day, hour, min, sec, nsec, &Location::utc());
    let offset = match offset {
        None => return Ok(t),
        Some(offset) => offset,
    };
    let t = t.add(Duration::SECOND * -i64::from(offset));
    if local.lookup(t.unix()).offset == offset {
        return Ok(t.in_location(local));
    }
    Ok(t.in_location(&Location::fixed_zone("", offset)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(year: i64, month: Month, day: i64, hour: i64, min: i64, sec: i64, nsec: i64, loc: &Location) -> Time {
        Time::from_date(year, month, day, hour, min, sec, nsec, loc)
    }

    #[test]
    fn test_format_rfc3339() {
        let t = date(2006, Month::January, 2, 15, 4, 5, 120_000_000, &Location::utc());
        assert_eq!(format_rfc3339(&t), "2006-01-02T15:04:05Z");
        assert_eq!(format_rfc3339_nano(&t), "2006-01-02T15:04:05.12Z");

        let mst = Location::fixed_zone("MST", -7 * 3600);
        let t = date(2006, Month::January, 2, 15, 4, 5, 0, &mst);
        assert_eq!(format_rfc3339_nano(&t), "2006-01-02T15:04:05-07:00");

        let t = date(2006, Month::January, 2, 15, 4, 5, 1, &Location::fixed_zone("", 5 * 3600 + 45 * 60));
        assert_eq!(t.format(&Rfc3339Nano), "2006-01-02T15:04:05.000000001+05:45");
    }

    #[test]
    fn test_format_unusual_years() {
        let t = date(-1, Month::March, 4, 0, 0, 0, 0, &Location::utc());
        assert_eq!(format_rfc3339(&t), "-0001-03-04T00:00:00Z");
        let t = date(12345, Month::March, 4, 0, 0, 0, 0, &Location::utc());
        assert_eq!(format_rfc3339(&t), "12345-03-04T00:00:00Z");
        let t = date(7, Month::March, 4, 0, 0, 0, 0, &Location::utc());
        assert_eq!(format_rfc3339(&t), "0007-03-04T00:00:00Z");
    }

    #[test]
    fn test_display() {
        let mst = Location::fixed_zone("MST", -7 * 3600);
        let t = date(2006, Month::January, 2, 15, 4, 5, 999_000_000, &mst);
        assert_eq!(t.to_string(), "2006-01-02 15:04:05.999 -0700 MST");
        assert_eq!(Time::default().to_string(), "0001-01-01 00:00:00 +0000 UTC");
        let unnamed = Location::fixed_zone("", 90 * 60);
        let t = date(2006, Month::January, 2, 15, 4, 5, 0, &unnamed);
        assert_eq!(t.to_string(), "2006-01-02 15:04:05 +0130 +0130");
    }

    #[test]
    fn test_display_monotonic() {
        let clock = std::sync::Arc::new(crate::clock::ManualClock::new(1_136_214_245, 0, 0));
        let ctx = crate::clock::TimeContext::new(clock.clone(), Location::utc());
        clock.advance(Duration::from_nanos(1_500_000_000));
        let t = ctx.now();
        assert_eq!(t.to_string(), "2006-01-02 15:04:06.5 +0000 UTC m=+1.500000001");
    }

    #[test]
    fn test_parse_rfc3339() {
        let utc = Location::utc();
        let t = Rfc3339.parse("2006-01-02T15:04:05Z", &utc).unwrap();
        assert!(t.equal(&date(2006, Month::January, 2, 15, 4, 5, 0, &utc)));
        assert_eq!(t.location(), utc);

        let t = Rfc3339.parse("2006-01-02T15:04:05.5-07:00", &utc).unwrap();
        assert!(t.equal(&date(2006, Month::January, 2, 22, 4, 5, 500_000_000, &utc)));
        assert_eq!(t.zone().1, -7 * 3600);
        assert_eq!(t.location().name(), "");
        assert_eq!(t.clock(), (15, 4, 5));

        let t = Rfc3339Nano.parse("2006-01-02T15:04:05.123456789+00:00", &utc).unwrap();
        assert_eq!(t.nanosecond(), 123_456_789);
    }

    #[test]
    fn test_parse_resolves_local_offset() {
        let local = Location::fixed_zone("CET", 3600);
        let t = Rfc3339.parse("2020-06-01T12:00:00+01:00", &local).unwrap();
        assert_eq!(t.location(), local);
        let t = Rfc3339.parse("2020-06-01T12:00:00+02:00", &local).unwrap();
        assert_ne!(t.location(), local);
        assert_eq!(t.zone().1, 7200);
    }

    #[test]
    fn test_parse_rejects() {
        let utc = Location::utc();
        for text in [
            "",
            "2006-01-02",
            "2006-01-02T15:04:05",
            "2006-1-02T15:04:05Z",
            "2006-13-02T15:04:05Z",
            "2006-00-02T15:04:05Z",
            "2006-02-29T15:04:05Z",
            "2006-01-32T15:04:05Z",
            "2006-01-02 15:04:05Z",
            "2006-01-02T24:04:05Z",
            "2006-01-02T15:60:05Z",
            "2006-01-02T15:04:60Z",
            "2006-01-02T15:04:05.Z",
            "2006-01-02T15:04:05.1234567890Z",
            "2006-01-02T15:04:05+0700",
            "2006-01-02T15:04:05+24:00",
            "2006-01-02T15:04:05Zjunk",
            "+2006-01-02T15:04:05Z",
        ] {
            assert!(
                matches!(Rfc3339.parse(text, &utc), Err(TimeError::Parse { .. })),
                "{:?} should not parse",
                text
            );
        }
        assert!(Rfc3339.parse("2004-02-29T00:00:00Z", &utc).is_ok());
    }

    #[test]
    fn test_format_parse_round_trip() {
        let loc = Location::fixed_zone("", -(3 * 3600 + 30 * 60));
        let t = date(1999, Month::December, 31, 23, 59, 59, 10, &loc);
        let text = format_rfc3339_nano(&t);
        assert_eq!(text, "1999-12-31T23:59:59.00000001-03:30");
        let back = Rfc3339Nano.parse(&text, &Location::utc()).unwrap();
        assert!(back.equal(&t));
        assert_eq!(format_rfc3339_nano(&back), text);
    }
}
