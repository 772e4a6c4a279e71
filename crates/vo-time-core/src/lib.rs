//! # vo-time-core
//!
//! Leaf types for the time package that are `no_std` compatible.
//!
//! This crate provides:
//! - `Duration` - signed nanosecond count with saturating arithmetic,
//!   rounding and canonical text rendering
//! - `parse` - the inverse of `Duration`'s text rendering
//! - `calendar` - proleptic Gregorian math over epoch-shifted
//!   "absolute" seconds, plus `Month` and `Weekday`

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(not(feature = "std"))]
extern crate alloc;

pub mod calendar;
pub mod duration;
pub mod parse;

pub use calendar::{Month, Weekday};
pub use duration::Duration;
pub use parse::{parse_duration, ParseDurationError};
