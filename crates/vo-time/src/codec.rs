//! Binary, text and JSON encodings of `Time`.
//!
//! Binary layout, big-endian, 15 bytes:
//!
//! ```text
//! 0       version (1)
//! 1..9    seconds since January 1, year 1 (i64)
//! 9..13   nanoseconds (i32, 0..=999999999)
//! 13..15  zone offset in minutes east of UTC (i16), -1 for UTC
//! ```
//!
//! The monotonic reading is never encoded.

use tracing::trace;

use crate::error::TimeError;
use crate::format::{Rfc3339, Rfc3339Nano, TextLayout};
use crate::time::Time;
use crate::zone::Location;

const BINARY_VERSION: u8 = 1;
const BINARY_LEN: usize = 1 + 8 + 4 + 2;
const UTC_SENTINEL: i16 = -1;

impl Time {
    pub fn marshal_binary(&self) -> Result<Vec<u8>, TimeError> {
        let offset_min = if self.location().is_utc() {
            UTC_SENTINEL
        } else {
            let (_, offset) = self.zone();
            if offset % 60 != 0 {
                return Err(TimeError::FractionalMinuteOffset);
            }
            let minutes = offset / 60;
            if !(-32767..=32767).contains(&minutes) || minutes == i32::from(UTC_SENTINEL) {
                return Err(TimeError::OffsetOutOfRange(minutes));
            }
            minutes as i16
        };

        let mut enc = Vec::with_capacity(BINARY_LEN);
        enc.push(BINARY_VERSION);
        enc.extend_from_slice(&self.sec().to_be_bytes());
        enc.extend_from_slice(&(self.nsec() as i32).to_be_bytes());
        enc.extend_from_slice(&offset_min.to_be_bytes());
        Ok(enc)
    }

    /// Decodes the binary form, resolving the offset against the Local
    /// location of the global context.
    pub fn unmarshal_binary(data: &[u8]) -> Result<Time, TimeError> {
        Time::from_binary(data, &Location::local())
    }

    /// Decodes the binary form. The result is in UTC for the UTC sentinel,
    /// in `local` when the offset matches `local` at that instant, and in an
    /// unnamed fixed zone otherwise.
    pub fn from_binary(data: &[u8], local: &Location) -> Result<Time, TimeError> {
        let version = *data.first().ok_or(TimeError::NoData)?;
        if version != BINARY_VERSION {
            return Err(TimeError::UnsupportedVersion(version));
        }
        if data.len() != BINARY_LEN {
            return Err(TimeError::InvalidLength(data.len()));
        }

        let mut sec = [0u8; 8];
        sec.copy_from_slice(&data[1..9]);
        let mut nsec = [0u8; 4];
        nsec.copy_from_slice(&data[9..13]);
        let sec = i64::from_be_bytes(sec);
        let nsec = i32::from_be_bytes(nsec);
        let offset_min = i16::from_be_bytes([data[13], data[14]]);

        if !(0..1_000_000_000).contains(&nsec) {
            return Err(TimeError::InvalidNanoseconds(nsec));
        }

        let t = Time::from_internal(sec, nsec as u32, None);
        if offset_min == UTC_SENTINEL {
            return Ok(t);
        }
        let offset = i32::from(offset_min) * 60;
        if local.lookup(t.unix()).offset == offset {
            return Ok(t.in_location(local));
        }
        trace!(offset, "decoded offset does not match Local, using a fixed zone");
        Ok(t.in_location(&Location::fixed_zone("", offset)))
    }

    /// RFC 3339 with as many fractional digits as needed.
    pub fn marshal_text(&self) -> Result<String, TimeError> {
        self.check_text_range()?;
        Ok(Rfc3339Nano.format(self))
    }

    pub fn unmarshal_text(text: &str) -> Result<Time, TimeError> {
        Rfc3339.parse(text, &Location::local())
    }

    /// The text form as a JSON string.
    pub fn marshal_json(&self) -> Result<String, TimeError> {
        self.check_text_range()?;
        let mut buf = String::with_capacity(37);
        buf.push('"');
        Rfc3339Nano.append_format(&mut buf, self);
        buf.push('"');
        Ok(buf)
    }

    /// Replaces `self` with the decoded JSON string. The literal `null`
    /// leaves `self` unchanged.
    pub fn unmarshal_json(&mut self, data: &str) -> Result<(), TimeError> {
        if data == "null" {
            return Ok(());
        }
        let text = data
            .strip_prefix('"')
            .and_then(|s| s.strip_suffix('"'))
            .ok_or_else(|| TimeError::parse(data, "expected a quoted RFC 3339 string"))?;
        *self = Rfc3339.parse(text, &Location::local())?;
        Ok(())
    }

    fn check_text_range(&self) -> Result<(), TimeError> {
        let year = self.year();
        if !(0..=9999).contains(&year) {
            return Err(TimeError::YearOutOfRange(year));
        }
        let (_, offset) = self.zone();
        if offset % 60 != 0 || offset.unsigned_abs() >= 24 * 3600 {
            return Err(TimeError::TextOffset(offset));
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Time {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let text = self.marshal_text().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Time {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Time, D::Error> {
        use serde::de;

        struct TimeVisitor;

        impl<'de> de::Visitor<'de> for TimeVisitor {
            type Value = Time;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("an RFC 3339 timestamp string")
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Time, E> {
                Time::unmarshal_text(value).map_err(de::Error::custom)
            }
        }

        deserializer.deserialize_str(TimeVisitor)
    }
}
