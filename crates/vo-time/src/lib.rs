//! # vo-time
//!
//! Time instants with an optional monotonic clock reading, time zone
//! locations, encodings and tickers.
//!
//! This crate provides:
//! - `Time` - wall-clock instant with nanosecond precision; values read
//!   from the clock also carry a monotonic reading used for comparisons
//!   and subtraction
//! - `Location` - named zone rules behind a pluggable `ZoneSource`, with
//!   `FixedZone` and `TransitionTable` sources
//! - `TimeContext` - the clock source, process-start monotonic offset and
//!   Local location, installed once per process
//! - binary, RFC 3339 text and JSON encodings of `Time`
//! - `Ticker` - periodic ticks over a single-slot channel
//!
//! Calendar math and `Duration` live in `vo-time-core` and are re-exported
//! here.

mod codec;
pub mod clock;
pub mod error;
pub mod format;
pub mod ticker;
pub mod time;
pub mod zone;

pub use clock::{set_local, ClockReading, ClockSource, ManualClock, SystemClock, TimeContext};
pub use error::TimeError;
pub use format::{format_rfc3339, format_rfc3339_nano, parse_rfc3339, Rfc3339, Rfc3339Nano, TextLayout};
pub use ticker::{tick, Ticker};
pub use time::Time;
pub use vo_time_core::{calendar, parse_duration, Duration, Month, ParseDurationError, Weekday};
pub use zone::{FixedZone, Location, Transition, TransitionTable, Zone, ZoneSource, ZoneSpan, ALPHA, OMEGA};

/// The current local time.
pub fn now() -> Time {
    Time::now()
}

/// Time elapsed since `t`.
pub fn since(t: &Time) -> Duration {
    TimeContext::global().since(t)
}

/// Time until `t`.
pub fn until(t: &Time) -> Duration {
    TimeContext::global().until(t)
}
