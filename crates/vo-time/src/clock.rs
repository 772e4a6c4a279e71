//! Clock sources and the process-scoped time context.
//!
//! A `TimeContext` bundles everything "read the current time" needs: the
//! clock source, the monotonic reading taken when the context was built
//! (so monotonic readings count from process start), and the resolved
//! Local location. One context is installed globally on first use;
//! tests and embedders can build their own.

use std::fmt;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use once_cell::sync::{Lazy, OnceCell};
use parking_lot::Mutex;
use tracing::debug;
use vo_time_core::calendar::UNIX_TO_INTERNAL;
use vo_time_core::Duration;

use crate::error::TimeError;
use crate::time::Time;
use crate::zone::{self, Location};

/// One reading of the wall and monotonic clocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockReading {
    /// Wall seconds since the Unix epoch.
    pub unix_sec: i64,
    /// Wall nanoseconds within the second, in [0, 999999999].
    pub nsec: u32,
    /// Monotonic clock, nanoseconds from an arbitrary origin.
    pub mono: i64,
}

pub trait ClockSource: Send + Sync + fmt::Debug {
    /// Current wall and monotonic readings.
    fn read(&self) -> ClockReading;

    /// Current monotonic reading alone.
    fn monotonic(&self) -> i64 {
        self.read().mono
    }
}

// ==================== System clock ====================

static MONO_ORIGIN: Lazy<Instant> = Lazy::new(Instant::now);

/// The operating system's clocks.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl ClockSource for SystemClock {
    fn read(&self) -> ClockReading {
        let (unix_sec, nsec) = match SystemTime::now().duration_since(UNIX_EPOCH) {
            Ok(d) => (d.as_secs() as i64, d.subsec_nanos()),
            Err(e) => {
                // Wall clock is before 1970.
                let d = e.duration();
                let mut sec = -(d.as_secs() as i64);
                let mut nsec = d.subsec_nanos();
                if nsec > 0 {
                    sec -= 1;
                    nsec = 1_000_000_000 - nsec;
                }
                (sec, nsec)
            }
        };
        ClockReading {
            unix_sec,
            nsec,
            mono: self.monotonic(),
        }
    }

    fn monotonic(&self) -> i64 {
        i64::try_from(MONO_ORIGIN.elapsed().as_nanos()).unwrap_or(i64::MAX)
    }
}

// ==================== Manual clock ====================

/// A clock that only moves when told to. For deterministic tests.
#[derive(Debug)]
pub struct ManualClock {
    reading: Mutex<ClockReading>,
}

impl ManualClock {
    pub fn new(unix_sec: i64, nsec: u32, mono: i64) -> Self {
        Self {
            reading: Mutex::new(ClockReading { unix_sec, nsec, mono }),
        }
    }

    pub fn set(&self, reading: ClockReading) {
        *self.reading.lock() = reading;
    }

    /// Moves the wall clock only, like an NTP step.
    pub fn step_wall(&self, d: Duration) {
        let mut r = self.reading.lock();
        let total = i64::from(r.nsec) + d.nanoseconds() % 1_000_000_000;
        r.unix_sec += d.nanoseconds() / 1_000_000_000 + total.div_euclid(1_000_000_000);
        r.nsec = total.rem_euclid(1_000_000_000) as u32;
    }

    /// Moves both clocks forward by `d`.
    pub fn advance(&self, d: Duration) {
        self.step_wall(d);
        let mut r = self.reading.lock();
        r.mono = r.mono.saturating_add(d.nanoseconds());
    }
}

impl ClockSource for ManualClock {
    fn read(&self) -> ClockReading {
        *self.reading.lock()
    }
}

// ==================== Context ====================

/// Process-scoped time state.
#[derive(Debug, Clone)]
pub struct TimeContext {
    clock: Arc<dyn ClockSource>,
    /// Monotonic reading just before the context was created.
    start_nano: i64,
    local: Location,
}

static GLOBAL: OnceCell<TimeContext> = OnceCell::new();

impl TimeContext {
    pub fn new(clock: Arc<dyn ClockSource>, local: Location) -> Self {
        // Subtract one so monotonic readings are never zero.
        let start_nano = clock.monotonic().wrapping_sub(1);
        Self {
            clock,
            start_nano,
            local,
        }
    }

    /// OS clocks and Local from the environment.
    pub fn system() -> Self {
        Self::new(Arc::new(SystemClock), zone::local_from_env())
    }

    /// The installed context, creating the system one on first use.
    pub fn global() -> &'static TimeContext {
        GLOBAL.get_or_init(TimeContext::system)
    }

    /// Installs this context as the global one. Fails once any global
    /// context exists, including one created implicitly by `global()`.
    pub fn install(self) -> Result<(), TimeError> {
        GLOBAL.set(self).map_err(|_| TimeError::ContextInstalled)
    }

    pub fn local(&self) -> &Location {
        &self.local
    }

    pub fn clock(&self) -> &Arc<dyn ClockSource> {
        &self.clock
    }

    /// Monotonic nanoseconds since the context was created.
    pub fn monotonic(&self) -> i64 {
        self.clock.monotonic().wrapping_sub(self.start_nano)
    }

    /// The current local time, carrying a monotonic reading when the wall
    /// clock is within the packed range (years 1885 to 2157).
    pub fn now(&self) -> Time {
        let r = self.clock.read();
        let mono = r.mono.wrapping_sub(self.start_nano);
        let internal = r.unix_sec.wrapping_add(UNIX_TO_INTERNAL);
        match Time::with_monotonic(internal, r.nsec, mono, self.local.clone()) {
            Some(t) => t,
            None => {
                debug!(unix_sec = r.unix_sec, "wall clock outside packed range, dropping monotonic reading");
                Time::from_internal(internal, r.nsec, Some(self.local.clone()))
            }
        }
    }

    /// Time elapsed since `t`. Uses only the monotonic clock when `t`
    /// carries a monotonic reading.
    pub fn since(&self, t: &Time) -> Duration {
        if t.has_monotonic() {
            return Time::monotonic_only(self.monotonic()).sub(t);
        }
        self.now().sub(t)
    }

    /// Time until `t`. Uses only the monotonic clock when `t` carries a
    /// monotonic reading.
    pub fn until(&self, t: &Time) -> Duration {
        if t.has_monotonic() {
            return t.sub(&Time::monotonic_only(self.monotonic()));
        }
        t.sub(&self.now())
    }
}

/// Installs a global context that uses the OS clocks and `loc` as Local.
pub fn set_local(loc: Location) -> Result<(), TimeError> {
    TimeContext::new(Arc::new(SystemClock), loc).install()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_monotonic() {
        let clock = SystemClock;
        let a = clock.monotonic();
        let b = clock.monotonic();
        assert!(b >= a);
        let r = clock.read();
        assert!(r.nsec < 1_000_000_000);
        // Sometime after 2001.
        assert!(r.unix_sec > 1_000_000_000);
    }

    #[test]
    fn test_manual_clock() {
        let clock = ManualClock::new(100, 900_000_000, 5);
        clock.advance(Duration::MILLISECOND * 200);
        assert_eq!(
            clock.read(),
            ClockReading { unix_sec: 101, nsec: 100_000_000, mono: 200_000_005 }
        );
        clock.step_wall(Duration::MILLISECOND * -300);
        assert_eq!(
            clock.read(),
            ClockReading { unix_sec: 100, nsec: 800_000_000, mono: 200_000_005 }
        );
    }

    #[test]
    fn test_context_monotonic_starts_at_one() {
        let clock = Arc::new(ManualClock::new(0, 0, 1_000));
        let ctx = TimeContext::new(clock.clone(), Location::utc());
        assert_eq!(ctx.monotonic(), 1);
        clock.advance(Duration::SECOND);
        assert_eq!(ctx.monotonic(), 1_000_000_001);
    }
}
