//! Locations and the zone-source capability.
//!
//! A `Location` maps an instant (Unix seconds) to the zone in effect: its
//! abbreviation, offset east of UTC, and the interval over which that zone
//! applies. Where the zone rules come from is a `ZoneSource`; this crate
//! ships a fixed-offset source and a caller-built transition table but does
//! not read any time-zone database.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::error::TimeError;

/// Start of time for zone intervals.
pub const ALPHA: i64 = i64::MIN;
/// End of time for zone intervals.
pub const OMEGA: i64 = i64::MAX;

/// The zone in effect at an instant, and the interval `[start, end)` in
/// Unix seconds over which it applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZoneSpan {
    pub name: Arc<str>,
    /// Seconds east of UTC.
    pub offset: i32,
    pub start: i64,
    pub end: i64,
}

/// Source of zone rules behind a `Location`.
pub trait ZoneSource: Send + Sync + fmt::Debug {
    /// The zone in effect at `unix_sec`. The returned interval must contain
    /// `unix_sec`.
    fn lookup(&self, unix_sec: i64) -> ZoneSpan;
}

// ==================== Fixed offset ====================

/// A zone with the same name and offset at every instant.
#[derive(Debug, Clone)]
pub struct FixedZone {
    name: Arc<str>,
    offset: i32,
}

impl FixedZone {
    pub fn new(name: &str, offset: i32) -> Self {
        Self {
            name: Arc::from(name),
            offset,
        }
    }
}

impl ZoneSource for FixedZone {
    fn lookup(&self, _unix_sec: i64) -> ZoneSpan {
        ZoneSpan {
            name: self.name.clone(),
            offset: self.offset,
            start: ALPHA,
            end: OMEGA,
        }
    }
}

// ==================== Transition table ====================

/// One zone of a transition table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Zone {
    pub name: Arc<str>,
    pub offset: i32,
    pub is_dst: bool,
}

impl Zone {
    pub fn new(name: &str, offset: i32, is_dst: bool) -> Self {
        Self {
            name: Arc::from(name),
            offset,
            is_dst,
        }
    }
}

/// The instant (Unix seconds) from which `zone` applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub at: i64,
    pub zone: usize,
}

/// Zone rules given as a list of zones and the instants at which each
/// takes effect.
#[derive(Debug, Clone)]
pub struct TransitionTable {
    zones: Vec<Zone>,
    transitions: Vec<Transition>,
    /// Zone used before the first transition.
    first: usize,
}

impl TransitionTable {
    /// Builds a table. Transitions must be strictly increasing and refer to
    /// zones by index.
    pub fn new(zones: Vec<Zone>, transitions: Vec<Transition>) -> Result<Self, TimeError> {
        if zones.is_empty() {
            return Err(TimeError::InvalidZoneTable("no zones".to_string()));
        }
        if let Some(tx) = transitions.iter().find(|tx| tx.zone >= zones.len()) {
            return Err(TimeError::InvalidZoneTable(format!(
                "transition at {} refers to zone {}",
                tx.at, tx.zone
            )));
        }
        if let Some(pair) = transitions.windows(2).find(|w| w[0].at >= w[1].at) {
            return Err(TimeError::InvalidZoneTable(format!(
                "transition at {} is not before {}",
                pair[0].at, pair[1].at
            )));
        }
        // Before any transition, the first standard-time zone applies.
        let first = zones.iter().position(|z| !z.is_dst).unwrap_or(0);
        Ok(Self {
            zones,
            transitions,
            first,
        })
    }

    fn span(&self, zone: usize, start: i64, end: i64) -> ZoneSpan {
        let z = &self.zones[zone];
        ZoneSpan {
            name: z.name.clone(),
            offset: z.offset,
            start,
            end,
        }
    }
}

impl ZoneSource for TransitionTable {
    fn lookup(&self, unix_sec: i64) -> ZoneSpan {
        // Index of the first transition after unix_sec.
        let next = self.transitions.partition_point(|tx| tx.at <= unix_sec);
        let end = self.transitions.get(next).map_or(OMEGA, |tx| tx.at);
        match next.checked_sub(1) {
            None => self.span(self.first, ALPHA, end),
            Some(i) => {
                let tx = self.transitions[i];
                self.span(tx.zone, tx.at, end)
            }
        }
    }
}

// ==================== Location ====================

struct LocationData {
    name: String,
    source: Box<dyn ZoneSource>,
    /// Most recent lookup. Advisory only: a hit must contain the query
    /// instant, and a lost update just costs another lookup.
    cache: RwLock<Option<ZoneSpan>>,
}

/// A named set of zone rules. Cheap to clone; clones share identity and
/// the zone cache.
#[derive(Clone)]
pub struct Location(Arc<LocationData>);

static UTC: Lazy<Location> = Lazy::new(|| Location::new("UTC", FixedZone::new("UTC", 0)));

impl Location {
    pub fn new(name: impl Into<String>, source: impl ZoneSource + 'static) -> Self {
        Location(Arc::new(LocationData {
            name: name.into(),
            source: Box::new(source),
            cache: RwLock::new(None),
        }))
    }

    /// A location that always uses the given name and offset (seconds east
    /// of UTC).
    pub fn fixed_zone(name: &str, offset: i32) -> Self {
        Location::new(name, FixedZone::new(name, offset))
    }

    /// Coordinated Universal Time.
    pub fn utc() -> Location {
        UTC.clone()
    }

    /// The process's local location, from the global `TimeContext`.
    pub fn local() -> Location {
        crate::clock::TimeContext::global().local().clone()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn is_utc(&self) -> bool {
        Arc::ptr_eq(&self.0, &UTC.0)
    }

    /// Zone in effect at `unix_sec`.
    pub fn lookup(&self, unix_sec: i64) -> ZoneSpan {
        if let Some(span) = self.0.cache.read().as_ref() {
            if span.start <= unix_sec && unix_sec < span.end {
                return span.clone();
            }
        }
        let span = self.0.source.lookup(unix_sec);
        trace!(location = %self.0.name, unix_sec, zone = %span.name, "zone cache miss");
        *self.0.cache.write() = Some(span.clone());
        span
    }

    /// Identity comparison.
    pub fn same(&self, other: &Location) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Location {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Location {}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Location").field(&self.0.name).finish()
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(&self.0.name)
    }
}

// ==================== Local from environment ====================

/// Resolves the Local location from the `TZ` environment variable.
///
/// Only UTC and POSIX standard-time strings without DST rules are
/// understood; anything else falls back to UTC.
pub(crate) fn local_from_env() -> Location {
    let tz = match std::env::var("TZ") {
        Ok(tz) => tz,
        Err(_) => {
            debug!("TZ not set, local time is UTC");
            return Location::new("Local", FixedZone::new("UTC", 0));
        }
    };
    match parse_posix_tz(&tz) {
        Some((abbr, offset)) => {
            debug!(tz = %tz, zone = %abbr, offset, "local time from TZ");
            Location::new("Local", FixedZone::new(&abbr, offset))
        }
        None => {
            warn!(tz = %tz, "unsupported TZ value, local time is UTC");
            Location::new("Local", FixedZone::new("UTC", 0))
        }
    }
}

/// Parses `NAME[+|-]hh[:mm[:ss]]` (POSIX sign: positive is west of
/// Greenwich). Returns the abbreviation and the offset east of UTC.
pub(crate) fn parse_posix_tz(tz: &str) -> Option<(String, i32)> {
    let tz = tz.strip_prefix(':').unwrap_or(tz);
    if tz.is_empty() || tz == "UTC" {
        return Some(("UTC".to_string(), 0));
    }

    let (name, rest) = match tz.strip_prefix('<') {
        Some(quoted) => {
            let end = quoted.find('>')?;
            (&quoted[..end], &quoted[end + 1..])
        }
        None => {
            let end = tz.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(tz.len());
            tz.split_at(end)
        }
    };
    if name.len() < 3 {
        return None;
    }

    let (sign, rest) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => (1, rest),
    };

    let mut parts = [0i32; 3];
    let mut count = 0;
    for field in rest.split(':') {
        if count == 3 || field.is_empty() || field.len() > 2 {
            return None;
        }
        if !field.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        parts[count] = field.parse().ok()?;
        count += 1;
    }
    let [hh, mm, ss] = parts;
    if hh > 24 || mm > 59 || ss > 59 {
        return None;
    }

    let west = sign * (hh * 3600 + mm * 60 + ss);
    Some((name.to_string(), -west))
}
